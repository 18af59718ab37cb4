use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Operations a user can select before presenting a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyAction {
    ReadChipInfo,
    ReadPayload,
    Reset,
    WritePayload,
    /// Reset, write and read back in one composite run.
    ReadReset,
    ReadFile,
    WriteFile,
    WriteOversizedPayload,
    MultiWriteSameFile,
}

impl KeyAction {
    pub const ALL: [KeyAction; 9] = [
        KeyAction::ReadChipInfo,
        KeyAction::ReadPayload,
        KeyAction::Reset,
        KeyAction::WritePayload,
        KeyAction::ReadReset,
        KeyAction::ReadFile,
        KeyAction::WriteFile,
        KeyAction::WriteOversizedPayload,
        KeyAction::MultiWriteSameFile,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::ReadChipInfo => "read-chip-info",
            Self::ReadPayload => "read-payload",
            Self::Reset => "reset",
            Self::WritePayload => "write-payload",
            Self::ReadReset => "read-reset",
            Self::ReadFile => "read-file",
            Self::WriteFile => "write-file",
            Self::WriteOversizedPayload => "write-oversized-payload",
            Self::MultiWriteSameFile => "multi-write-same-file",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::ReadChipInfo => "Read chip info",
            Self::ReadPayload => "Read key",
            Self::Reset => "Reset key",
            Self::WritePayload => "Write key",
            Self::ReadReset => "Reset, write and read key",
            Self::ReadFile => "Read version file",
            Self::WriteFile => "Write version file",
            Self::WriteOversizedPayload => "Write too big key",
            Self::MultiWriteSameFile => "Write same file multiple times",
        }
    }

    pub fn is_composite(self) -> bool {
        matches!(self, Self::ReadReset | Self::MultiWriteSameFile)
    }
}

impl fmt::Display for KeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown key action {0:?}")]
pub struct UnknownAction(pub String);

impl FromStr for KeyAction {
    type Err = UnknownAction;

    /// Accepts either the action name or its display label.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|action| {
                action.name().eq_ignore_ascii_case(value) || action.label().eq_ignore_ascii_case(value)
            })
            .ok_or_else(|| UnknownAction(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_action_parses_from_its_name_and_label() {
        for action in KeyAction::ALL {
            assert_eq!(action.name().parse::<KeyAction>(), Ok(action));
            assert_eq!(action.label().parse::<KeyAction>(), Ok(action));
        }
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert_eq!(
            "format-key".parse::<KeyAction>(),
            Err(UnknownAction("format-key".into()))
        );
    }

    #[test]
    fn only_chained_actions_are_composite() {
        let composite: Vec<_> = KeyAction::ALL
            .into_iter()
            .filter(|action| action.is_composite())
            .collect();
        assert_eq!(
            composite,
            vec![KeyAction::ReadReset, KeyAction::MultiWriteSameFile]
        );
    }
}
