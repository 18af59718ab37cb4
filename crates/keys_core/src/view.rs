use shared::{
    domain::{DataFile, KeyData},
    error::Reason,
};

/// Display surface driven by the presenter.
pub trait KeysView: Send + Sync {
    fn show_toast_message(&self, message: &str);
    fn show_key_data(&self, data: &KeyData);
    fn show_key_file_data(&self, file: &DataFile);
    fn show_exception_reason(&self, reason: Reason);
    fn notify_operation_in_progress(&self);
    fn notify_operation_finished(&self);
    /// Free-form `name:value` lines typed by the user.
    fn user_input(&self) -> Option<String>;
}
