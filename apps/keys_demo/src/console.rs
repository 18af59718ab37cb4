//! Console rendering of presenter output.
//!
//! The presenter runs on tokio workers; it only pushes [`UiEvent`]s into a
//! channel and the main loop drains and prints them.

use anyhow::Result;
use crossbeam_channel::{Receiver, Sender};
use keys_core::KeysView;
use shared::{
    domain::{DataFile, KeyData},
    error::Reason,
};
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Toast(String),
    KeyData(KeyData),
    KeyFile(DataFile),
    Error(Reason),
    InProgress,
    Finished,
}

pub struct ChannelView {
    ui_tx: Sender<UiEvent>,
    input: Option<String>,
}

impl ChannelView {
    pub fn new(ui_tx: Sender<UiEvent>, input: Option<String>) -> Self {
        Self { ui_tx, input }
    }

    fn emit(&self, event: UiEvent) {
        if self.ui_tx.send(event).is_err() {
            warn!("console receiver dropped; discarding view event");
        }
    }
}

impl KeysView for ChannelView {
    fn show_toast_message(&self, message: &str) {
        self.emit(UiEvent::Toast(message.to_owned()));
    }

    fn show_key_data(&self, data: &KeyData) {
        self.emit(UiEvent::KeyData(data.clone()));
    }

    fn show_key_file_data(&self, file: &DataFile) {
        self.emit(UiEvent::KeyFile(file.clone()));
    }

    fn show_exception_reason(&self, reason: Reason) {
        self.emit(UiEvent::Error(reason));
    }

    fn notify_operation_in_progress(&self) {
        self.emit(UiEvent::InProgress);
    }

    fn notify_operation_finished(&self) {
        self.emit(UiEvent::Finished);
    }

    fn user_input(&self) -> Option<String> {
        self.input.clone()
    }
}

pub fn render(event: &UiEvent, json: bool) -> Result<String> {
    let line = match event {
        UiEvent::Toast(message) => message.clone(),
        UiEvent::KeyData(data) if json => serde_json::to_string_pretty(data)?,
        UiEvent::KeyData(data) => format!("key data:\n{data}"),
        UiEvent::KeyFile(file) if json => serde_json::to_string_pretty(file)?,
        UiEvent::KeyFile(file) => format!("file: {file}"),
        UiEvent::Error(reason) => format!("error: {}", reason.message()),
        UiEvent::InProgress => "... operation in progress".to_owned(),
        UiEvent::Finished => "... operation finished".to_owned(),
    };
    Ok(line)
}

/// Prints everything queued so far.
pub fn drain(ui_rx: &Receiver<UiEvent>, json: bool) -> Result<Vec<UiEvent>> {
    let events: Vec<UiEvent> = ui_rx.try_iter().collect();
    for event in &events {
        println!("{}", render(event, json)?);
    }
    Ok(events)
}
