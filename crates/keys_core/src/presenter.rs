//! Tag-tap orchestration: configuration load, action dispatch and result
//! reporting.

use std::sync::{Arc, Mutex};

use shared::{
    domain::{AttributeType, ChipInfo, DataFile, FileDescriptor, KeyData, TagHandle},
    error::TagError,
    protocol::{OperationRequest, OperationResponse},
};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::{
    action::KeyAction,
    cancel::CancelScope,
    composite::CompositeOperation,
    config_loader::{load_tag_configuration, ConfigurationLoader},
    error::{reason_for, OperationError},
    interactor::Interactors,
    payload::PayloadFactory,
    session::Session,
    settings::KeysSettings,
    view::KeysView,
};

pub const SELECT_ACTION_MESSAGE: &str = "Select an action before";
pub const KEY_NOT_EMPTY_MESSAGE: &str = "Key Not empty";

pub struct KeysPresenter {
    view: Arc<dyn KeysView>,
    session: Arc<Session>,
    loader: Arc<dyn ConfigurationLoader>,
    interactors: Interactors,
    settings: KeysSettings,
    payloads: PayloadFactory,
    current_action: Mutex<Option<KeyAction>>,
    tap_gate: tokio::sync::Mutex<()>,
    scope: CancelScope,
}

impl KeysPresenter {
    pub fn new(
        view: Arc<dyn KeysView>,
        session: Arc<Session>,
        loader: Arc<dyn ConfigurationLoader>,
        interactors: Interactors,
        settings: KeysSettings,
    ) -> Self {
        let payloads = PayloadFactory::new(&settings);
        Self {
            view,
            session,
            loader,
            interactors,
            settings,
            payloads,
            current_action: Mutex::new(None),
            tap_gate: tokio::sync::Mutex::new(()),
            scope: CancelScope::new(),
        }
    }

    pub fn with_payload_factory(mut self, payloads: PayloadFactory) -> Self {
        self.payloads = payloads;
        self
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn on_action_changed(&self, action: KeyAction) {
        debug!(action = %action, "action selected");
        *self.action_slot() = Some(action);
    }

    pub fn current_action(&self) -> Option<KeyAction> {
        *self.action_slot()
    }

    pub fn on_tag_not_empty(&self) {
        self.view.show_toast_message(KEY_NOT_EMPTY_MESSAGE);
    }

    /// Stops every sequence at its next step boundary. Calls already handed
    /// to an interactor run to completion.
    pub fn cancel_operations(&self) {
        info!("cancelling tag operations");
        self.scope.cancel();
    }

    pub fn on_process_tag_error(&self, error: Option<&TagError>) {
        self.view.show_exception_reason(reason_for(error));
    }

    pub fn spawn_tag_presented(
        self: &Arc<Self>,
        tag: TagHandle,
    ) -> JoinHandle<Result<(), OperationError>> {
        let presenter = Arc::clone(self);
        tokio::spawn(async move { presenter.handle_tag_presented(tag).await })
    }

    /// Handles one tap. Tag errors are reported to the view; only defects are
    /// returned as `Err`.
    pub async fn handle_tag_presented(&self, tag: TagHandle) -> Result<(), OperationError> {
        if self.scope.is_cancelled() {
            debug!(tag = %tag, "tap ignored, presenter cancelled");
            return Ok(());
        }
        let Some(action) = self.current_action() else {
            self.view.show_toast_message(SELECT_ACTION_MESSAGE);
            return Ok(());
        };

        let _tap = tokio::select! {
            guard = self.tap_gate.lock() => guard,
            _ = self.scope.cancelled() => {
                debug!(tag = %tag, "tap dropped, presenter cancelled");
                return Ok(());
            }
        };

        match self.run_sequence(action, &tag).await {
            Err(OperationError::Cancelled { stage }) => {
                debug!(tag = %tag, action = %action, stage, "tap sequence cancelled");
                Ok(())
            }
            other => other,
        }
    }

    /// Clears the session's previous declaration and declares the layout
    /// built from the current user input.
    pub async fn load_configuration(&self, tag: &TagHandle) -> Result<(), OperationError> {
        let input = self.view.user_input();
        let files = load_tag_configuration(
            self.loader.as_ref(),
            &self.session,
            input.as_deref(),
            &self.settings.chip,
            self.settings.require_pin_auth,
        )
        .await?;
        debug!(tag = %tag, files = files.len(), "tag configuration loaded");
        Ok(())
    }

    async fn run_sequence(&self, action: KeyAction, tag: &TagHandle) -> Result<(), OperationError> {
        self.ensure_active("configuration load")?;
        if let Err(err) = self.load_configuration(tag).await {
            return self.handle_failure("configuration load", err);
        }

        self.ensure_active(action.name())?;
        info!(
            tag = %tag,
            action = %action,
            composite = action.is_composite(),
            "running tag action"
        );
        self.view.notify_operation_in_progress();

        let outcome = match action {
            KeyAction::ReadChipInfo => self.read_chip_info(tag).await,
            KeyAction::ReadPayload => self.read(tag).await,
            KeyAction::Reset => self.reset(tag).await,
            KeyAction::WritePayload => self.write(tag, false).await,
            KeyAction::ReadReset => self.multi_operation(tag).await,
            KeyAction::ReadFile => self.read_file(tag).await,
            KeyAction::WriteFile => self.write_file(tag).await,
            KeyAction::WriteOversizedPayload => self.write(tag, true).await,
            KeyAction::MultiWriteSameFile => self.multi_write_same_file(tag).await,
        };

        if !matches!(outcome, Err(OperationError::Cancelled { .. })) {
            self.view.notify_operation_finished();
        }
        outcome
    }

    async fn read_chip_info(&self, tag: &TagHandle) -> Result<(), OperationError> {
        let request = OperationRequest::Tag { tag: tag.clone() };
        match self
            .interactors
            .read_chip_info
            .run(request)
            .await
            .and_then(expect_chip_info)
        {
            Ok(chip_info) => {
                let message = format!("Chip info: {chip_info}");
                info!("{message}");
                self.view.show_toast_message(&message);
                Ok(())
            }
            Err(err) => self.handle_failure("read chip info", err),
        }
    }

    async fn reset(&self, tag: &TagHandle) -> Result<(), OperationError> {
        let request = OperationRequest::Tag { tag: tag.clone() };
        match self.interactors.reset.run(request).await {
            Ok(_) => {
                info!(tag = %tag, "tag factory reset completed");
                self.view.show_toast_message("Chip has been reset");
                Ok(())
            }
            Err(err) => self.handle_failure("tag factory reset", err),
        }
    }

    async fn read(&self, tag: &TagHandle) -> Result<(), OperationError> {
        let request = OperationRequest::ReadPayload {
            tag: tag.clone(),
            pin: Some(self.settings.pin.clone()),
        };
        match self
            .interactors
            .read_payload
            .run(request)
            .await
            .and_then(expect_key_data)
        {
            Ok(key_data) => {
                info!(files = key_data.files.len(), "read tag operation completed");
                self.view.show_key_data(&key_data);
                Ok(())
            }
            Err(err) => self.handle_failure("read tag operation", err),
        }
    }

    async fn write(&self, tag: &TagHandle, oversized: bool) -> Result<(), OperationError> {
        let input = self.view.user_input();
        let outcome = async {
            let payload = self.payloads.create(input, oversized).await?;
            self.ensure_active("write payload")?;
            debug!(
                entries = payload.len(),
                bytes = payload.total_size(),
                oversized,
                "writing key payload"
            );
            self.interactors
                .write_payload
                .run(OperationRequest::WritePayload {
                    tag: tag.clone(),
                    payload,
                    pin: Some(self.settings.pin.clone()),
                })
                .await
        }
        .await;

        match outcome {
            Ok(_) => {
                info!(tag = %tag, "write operation completed");
                self.view.show_toast_message("The key has been written");
                Ok(())
            }
            Err(err) => self.handle_failure("write operation", err),
        }
    }

    async fn read_file(&self, tag: &TagHandle) -> Result<(), OperationError> {
        let request = OperationRequest::ReadFile {
            tag: tag.clone(),
            file: FileDescriptor::version(),
            pin: Some(self.settings.pin.clone()),
        };
        match self
            .interactors
            .read_file
            .run(request)
            .await
            .and_then(expect_file)
        {
            Ok(file) => {
                info!(file = %file, "read file operation completed");
                self.view.show_key_file_data(&file);
                Ok(())
            }
            Err(err) => self.handle_failure("read file operation", err),
        }
    }

    async fn write_file(&self, tag: &TagHandle) -> Result<(), OperationError> {
        let request = OperationRequest::WriteFile {
            tag: tag.clone(),
            file: self.version_file_update(),
            pin: Some(self.settings.pin.clone()),
        };
        match self.interactors.write_file.run(request).await {
            Ok(_) => {
                info!(tag = %tag, "write file operation completed");
                self.view.show_toast_message("The file has been written");
                Ok(())
            }
            Err(err) => self.handle_failure("write file operation", err),
        }
    }

    /// Reset, write the payload from user input, then read it back.
    async fn multi_operation(&self, tag: &TagHandle) -> Result<(), OperationError> {
        let input = self.view.user_input();
        let outcome = async {
            let payload = self.payloads.create(input, false).await?;
            let responses = CompositeOperation::new()
                .add_operation(
                    Arc::clone(&self.interactors.reset),
                    OperationRequest::Tag { tag: tag.clone() },
                )
                .add_operation(
                    Arc::clone(&self.interactors.write_payload),
                    OperationRequest::WritePayload {
                        tag: tag.clone(),
                        payload,
                        pin: None,
                    },
                )
                .add_operation(
                    Arc::clone(&self.interactors.read_payload),
                    OperationRequest::ReadPayload {
                        tag: tag.clone(),
                        pin: None,
                    },
                )
                .execute_all(&self.settings.pin, &self.scope)
                .await?;
            last_response(responses).and_then(expect_key_data)
        }
        .await;

        match outcome {
            Ok(key_data) => {
                info!("reset, write, read operation completed");
                self.view
                    .show_toast_message("The key has been reset, written and read");
                self.view.show_key_data(&key_data);
                Ok(())
            }
            Err(err) => self.handle_failure("reset, write, read operation", err),
        }
    }

    async fn multi_write_same_file(&self, tag: &TagHandle) -> Result<(), OperationError> {
        let file = self.version_file_update();
        let mut plan = CompositeOperation::new();
        for _ in 0..5 {
            plan = plan.add_operation(
                Arc::clone(&self.interactors.write_file),
                OperationRequest::WriteFile {
                    tag: tag.clone(),
                    file: file.clone(),
                    pin: None,
                },
            );
        }
        plan = plan.add_operation(
            Arc::clone(&self.interactors.read_file),
            OperationRequest::ReadFile {
                tag: tag.clone(),
                file: FileDescriptor::version(),
                pin: None,
            },
        );

        let outcome = match plan.execute_all(&self.settings.pin, &self.scope).await {
            Ok(responses) => last_response(responses).and_then(expect_file),
            Err(err) => Err(err),
        };

        match outcome {
            Ok(file) => {
                info!("multiple write operations completed");
                self.view
                    .show_toast_message("The key has been read and written multiple times");
                self.view.show_key_file_data(&file);
                Ok(())
            }
            Err(err) => self.handle_failure("multiple write operations", err),
        }
    }

    fn version_file_update(&self) -> DataFile {
        let version = FileDescriptor::version();
        DataFile::new(
            version.name(),
            AttributeType::String,
            self.settings.write_file_value.as_bytes(),
        )
    }

    /// Reports tag errors to the view; everything else goes back to the caller.
    fn handle_failure(&self, operation: &str, err: OperationError) -> Result<(), OperationError> {
        match err {
            OperationError::Tag(err) => {
                error!(operation, reason = ?err.reason, error = %err, "tag operation failed");
                self.on_process_tag_error(Some(&err));
                Ok(())
            }
            other => Err(other),
        }
    }

    fn ensure_active(&self, stage: &'static str) -> Result<(), OperationError> {
        if self.scope.is_cancelled() {
            return Err(OperationError::cancelled(stage));
        }
        Ok(())
    }

    fn action_slot(&self) -> std::sync::MutexGuard<'_, Option<KeyAction>> {
        self.current_action
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn last_response(responses: Vec<OperationResponse>) -> Result<OperationResponse, OperationError> {
    responses
        .into_iter()
        .last()
        .ok_or_else(|| anyhow::anyhow!("composite operation produced no response").into())
}

fn unexpected_response(expected: &str, response: &OperationResponse) -> OperationError {
    anyhow::anyhow!(
        "expected {expected} response, interactor returned {}",
        response.kind()
    )
    .into()
}

fn expect_chip_info(response: OperationResponse) -> Result<ChipInfo, OperationError> {
    match response {
        OperationResponse::ChipInfo(info) => Ok(info),
        other => Err(unexpected_response("chip_info", &other)),
    }
}

fn expect_key_data(response: OperationResponse) -> Result<KeyData, OperationError> {
    match response {
        OperationResponse::KeyData(data) => Ok(data),
        other => Err(unexpected_response("key_data", &other)),
    }
}

fn expect_file(response: OperationResponse) -> Result<DataFile, OperationError> {
    match response {
        OperationResponse::File(file) => Ok(file),
        other => Err(unexpected_response("file", &other)),
    }
}

#[cfg(test)]
#[path = "tests/presenter_tests.rs"]
mod tests;
