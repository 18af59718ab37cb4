use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

pub const DEFAULT_SETTINGS_FILE: &str = "keys.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeysSettings {
    pub pin: String,
    pub version_value: String,
    pub chip: String,
    pub require_pin_auth: bool,
    pub write_file_value: String,
    pub oversize_copies: usize,
    pub picture_path: Option<PathBuf>,
    pub generated_picture_size: u32,
}

impl Default for KeysSettings {
    fn default() -> Self {
        Self {
            pin: "1234".into(),
            version_value: "1.0".into(),
            chip: "EV2".into(),
            require_pin_auth: true,
            write_file_value: "New Version A bit longer".into(),
            oversize_copies: 5,
            picture_path: None,
            generated_picture_size: 512,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    pin: Option<String>,
    version_value: Option<String>,
    chip: Option<String>,
    require_pin_auth: Option<bool>,
    write_file_value: Option<String>,
    oversize_copies: Option<usize>,
    picture_path: Option<PathBuf>,
    generated_picture_size: Option<u32>,
}

pub fn load_settings() -> KeysSettings {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE))
}

/// Reads `path` when it exists and parses, then applies `KEYS_*` overrides.
pub fn load_settings_from(path: &Path) -> KeysSettings {
    let mut settings = KeysSettings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<FileSettings>(&raw) {
            Ok(file_cfg) => apply_file_settings(&mut settings, file_cfg),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "ignoring unreadable settings file")
            }
        }
    }

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file_settings(settings: &mut KeysSettings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.pin {
        settings.pin = v;
    }
    if let Some(v) = file_cfg.version_value {
        settings.version_value = v;
    }
    if let Some(v) = file_cfg.chip {
        settings.chip = v;
    }
    if let Some(v) = file_cfg.require_pin_auth {
        settings.require_pin_auth = v;
    }
    if let Some(v) = file_cfg.write_file_value {
        settings.write_file_value = v;
    }
    if let Some(v) = file_cfg.oversize_copies {
        settings.oversize_copies = v;
    }
    if let Some(v) = file_cfg.picture_path {
        settings.picture_path = Some(v);
    }
    if let Some(v) = file_cfg.generated_picture_size {
        settings.generated_picture_size = v;
    }
}

fn apply_env_overrides(settings: &mut KeysSettings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("KEYS_PIN") {
        settings.pin = v;
    }
    if let Some(v) = var("KEYS_VERSION_VALUE") {
        settings.version_value = v;
    }
    if let Some(v) = var("KEYS_CHIP") {
        settings.chip = v;
    }
    if let Some(v) = var("KEYS_PICTURE_PATH") {
        settings.picture_path = Some(PathBuf::from(v));
    }
    if let Some(v) = var("KEYS_OVERSIZE_COPIES") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.oversize_copies = parsed;
        }
    }
}
