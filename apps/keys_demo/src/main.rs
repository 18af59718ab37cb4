mod console;
mod simulator;

use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use keys_core::{
    load_settings_from, settings::DEFAULT_SETTINGS_FILE, DefaultConfigurationLoader, KeyAction,
    KeysPresenter, Session,
};
use shared::{domain::TagHandle, error::Reason};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{
    console::ChannelView,
    simulator::{InjectedFailure, InteractorKind, SimulatedToolkit},
};

/// Taps a simulated NFC key once per selected action.
#[derive(Parser, Debug)]
struct Args {
    /// Action to run on the next tap; repeat to run several taps in order.
    #[arg(long = "action", value_parser = parse_action)]
    actions: Vec<KeyAction>,
    /// `name:value` records, separated by newlines or a literal `\n`.
    #[arg(long)]
    input: Option<String>,
    /// Tag uid as hex.
    #[arg(long, default_value = "04A1B2C3D4E5F6")]
    uid: String,
    #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
    config: PathBuf,
    /// Bytes the simulated key can hold.
    #[arg(long, default_value_t = 8 * 1024)]
    capacity: usize,
    /// Make one interactor fail, e.g. `write_payload` or `reset:tag_lost`.
    #[arg(long, value_parser = parse_failure)]
    fail: Option<InjectedFailure>,
    /// Refuse payload writes on keys that already hold data.
    #[arg(long)]
    require_empty: bool,
    /// Print key data as JSON.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let settings = load_settings_from(&args.config);
    let session = Arc::new(Session::new());
    let toolkit = Arc::new(
        SimulatedToolkit::new(Arc::clone(&session), settings.pin.clone(), args.capacity)
            .with_failure(args.fail),
    );

    let (ui_tx, ui_rx) = crossbeam_channel::unbounded();
    let input = args.input.as_deref().map(|raw| raw.replace("\\n", "\n"));
    let view = Arc::new(ChannelView::new(ui_tx, input));
    let loader = Arc::new(DefaultConfigurationLoader::new(Arc::clone(&session)));
    let presenter = Arc::new(KeysPresenter::new(
        view,
        session,
        loader,
        toolkit.interactors(),
        settings,
    ));

    let tag = TagHandle::new(parse_uid(&args.uid)?);
    info!(tag = %tag, capacity = args.capacity, "simulated key ready");

    if args.actions.is_empty() {
        presenter.handle_tag_presented(tag.clone()).await?;
        console::drain(&ui_rx, args.json)?;
    }

    for action in args.actions {
        println!("== {}", action.label());
        presenter.on_action_changed(action);
        let writes_payload = matches!(
            action,
            KeyAction::WritePayload | KeyAction::WriteOversizedPayload
        );
        if args.require_empty && writes_payload && !toolkit.is_empty(&tag) {
            presenter.on_tag_not_empty();
        } else {
            presenter
                .spawn_tag_presented(tag.clone())
                .await
                .context("tap task panicked")??;
        }
        console::drain(&ui_rx, args.json)?;
    }

    presenter.cancel_operations();
    Ok(())
}

fn parse_action(raw: &str) -> Result<KeyAction, String> {
    raw.parse().map_err(|err| format!("{err}"))
}

fn parse_failure(raw: &str) -> Result<InjectedFailure, String> {
    let (name, reason) = match raw.split_once(':') {
        Some((name, reason)) => (name, Some(reason)),
        None => (raw, None),
    };
    let kind = InteractorKind::ALL
        .into_iter()
        .find(|kind| kind.name() == name.trim())
        .ok_or_else(|| format!("unknown interactor '{name}'"))?;
    let reason = reason
        .map(|reason| {
            serde_json::from_value::<Reason>(serde_json::Value::String(reason.trim().to_owned()))
                .map_err(|_| format!("unknown reason '{reason}'"))
        })
        .transpose()?;
    Ok(InjectedFailure { kind, reason })
}

fn parse_uid(raw: &str) -> Result<Vec<u8>> {
    let raw = raw.trim();
    if raw.is_empty() || raw.len() % 2 != 0 {
        bail!("tag uid must be an even number of hex digits, got '{raw}'");
    }
    (0..raw.len())
        .step_by(2)
        .map(|i| {
            raw.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| anyhow!("invalid hex in tag uid '{raw}'"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_accepts_optional_reason() {
        let failure = parse_failure("reset:tag_lost").expect("failure");
        assert_eq!(failure.kind, InteractorKind::Reset);
        assert_eq!(failure.reason, Some(Reason::TagLost));

        let failure = parse_failure("write_file").expect("failure");
        assert_eq!(failure.reason, None);

        assert!(parse_failure("format").is_err());
        assert!(parse_failure("reset:melted").is_err());
    }

    #[test]
    fn uid_is_parsed_as_hex_pairs() {
        assert_eq!(parse_uid("04a1FF").expect("uid"), vec![0x04, 0xA1, 0xFF]);
        assert!(parse_uid("04a").is_err());
        assert!(parse_uid("zz").is_err());
    }

    #[test]
    fn cli_collects_repeated_actions() {
        let args = Args::try_parse_from([
            "keys_demo",
            "--action",
            "reset",
            "--action",
            "write-payload",
            "--json",
        ])
        .expect("args");
        assert_eq!(args.actions, vec![KeyAction::Reset, KeyAction::WritePayload]);
        assert!(args.json);
    }
}
