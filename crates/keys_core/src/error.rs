//! Orchestration errors and their translation into user-facing reasons.

use shared::error::{Reason, TagError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OperationError {
    /// Failure reported by the tag toolkit; always shown to the user.
    #[error(transparent)]
    Tag(#[from] TagError),
    #[error("operation cancelled before {stage}")]
    Cancelled { stage: &'static str },
    /// Programming or environment defect; never translated for display.
    #[error("unexpected failure: {0:#}")]
    Unexpected(#[from] anyhow::Error),
}

impl OperationError {
    pub fn cancelled(stage: &'static str) -> Self {
        Self::Cancelled { stage }
    }

    pub fn as_tag_error(&self) -> Option<&TagError> {
        match self {
            Self::Tag(err) => Some(err),
            _ => None,
        }
    }
}

/// Reason shown for a caught tag error, falling back to `UnexpectedError`.
pub fn reason_for(error: Option<&TagError>) -> Reason {
    error
        .and_then(|err| err.reason)
        .unwrap_or(Reason::UnexpectedError)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_reason_is_kept() {
        let err = TagError::new(Reason::WrongPin, "pin rejected");
        assert_eq!(reason_for(Some(&err)), Reason::WrongPin);
    }

    #[test]
    fn missing_error_or_reason_falls_back_to_unexpected() {
        assert_eq!(reason_for(None), Reason::UnexpectedError);
        let err = TagError::unclassified("transceive failed");
        assert_eq!(reason_for(Some(&err)), Reason::UnexpectedError);
    }

    #[test]
    fn only_tag_errors_expose_a_domain_error() {
        let tag = OperationError::from(TagError::new(Reason::TagLost, "lost"));
        assert!(tag.as_tag_error().is_some());
        let defect = OperationError::from(anyhow::anyhow!("bad response"));
        assert!(defect.as_tag_error().is_none());
        assert!(OperationError::cancelled("read").as_tag_error().is_none());
    }
}
