use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a tag operation failed, as reported by the tag toolkit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    TagLost,
    AuthenticationFailed,
    WrongPin,
    PayloadTooBig,
    FileNotFound,
    InvalidConfiguration,
    ChipNotSupported,
    TagNotEmpty,
    UnexpectedError,
}

impl Reason {
    pub fn message(self) -> &'static str {
        match self {
            Self::TagLost => "The key was moved away from the reader; keep it still and retry.",
            Self::AuthenticationFailed => "The key could not be authenticated.",
            Self::WrongPin => "The PIN was rejected by the key.",
            Self::PayloadTooBig => "The data does not fit on the key.",
            Self::FileNotFound => "The requested file does not exist on the key.",
            Self::InvalidConfiguration => "The key configuration is invalid.",
            Self::ChipNotSupported => "This chip is not supported.",
            Self::TagNotEmpty => "The key already holds data.",
            Self::UnexpectedError => "An unexpected error occurred.",
        }
    }
}

/// Domain failure raised by the tag toolkit and its interactors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TagError {
    pub reason: Option<Reason>,
    pub message: String,
}

impl TagError {
    pub fn new(reason: Reason, message: impl Into<String>) -> Self {
        Self {
            reason: Some(reason),
            message: message.into(),
        }
    }

    /// A failure whose cause the toolkit could not classify.
    pub fn unclassified(message: impl Into<String>) -> Self {
        Self {
            reason: None,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("file descriptor is missing a name")]
    MissingName,
    #[error("invalid file name {name:?}: {detail}")]
    InvalidName { name: String, detail: &'static str },
}

impl From<DescriptorError> for TagError {
    fn from(value: DescriptorError) -> Self {
        Self::new(Reason::InvalidConfiguration, value.to_string())
    }
}
