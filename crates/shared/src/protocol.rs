use serde::{Deserialize, Serialize};

use crate::domain::{ChipInfo, DataFile, FileDescriptor, KeyData, KeyPayload, TagHandle};

/// Input handed to an interactor for one tag operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum OperationRequest {
    /// Operations needing nothing but the tag (reset, chip info).
    Tag { tag: TagHandle },
    ReadPayload {
        tag: TagHandle,
        pin: Option<String>,
    },
    WritePayload {
        tag: TagHandle,
        payload: KeyPayload,
        pin: Option<String>,
    },
    ReadFile {
        tag: TagHandle,
        file: FileDescriptor,
        pin: Option<String>,
    },
    WriteFile {
        tag: TagHandle,
        file: DataFile,
        pin: Option<String>,
    },
}

impl OperationRequest {
    pub fn tag(&self) -> &TagHandle {
        match self {
            Self::Tag { tag }
            | Self::ReadPayload { tag, .. }
            | Self::WritePayload { tag, .. }
            | Self::ReadFile { tag, .. }
            | Self::WriteFile { tag, .. } => tag,
        }
    }

    pub fn pin(&self) -> Option<&str> {
        match self {
            Self::Tag { .. } => None,
            Self::ReadPayload { pin, .. }
            | Self::WritePayload { pin, .. }
            | Self::ReadFile { pin, .. }
            | Self::WriteFile { pin, .. } => pin.as_deref(),
        }
    }

    /// Fills in `pin` when the request does not already carry one.
    pub fn with_default_pin(self, default_pin: &str) -> Self {
        let fill = |pin: Option<String>| pin.or_else(|| Some(default_pin.to_string()));
        match self {
            Self::Tag { tag } => Self::Tag { tag },
            Self::ReadPayload { tag, pin } => Self::ReadPayload {
                tag,
                pin: fill(pin),
            },
            Self::WritePayload { tag, payload, pin } => Self::WritePayload {
                tag,
                payload,
                pin: fill(pin),
            },
            Self::ReadFile { tag, file, pin } => Self::ReadFile {
                tag,
                file,
                pin: fill(pin),
            },
            Self::WriteFile { tag, file, pin } => Self::WriteFile {
                tag,
                file,
                pin: fill(pin),
            },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Tag { .. } => "tag",
            Self::ReadPayload { .. } => "read_payload",
            Self::WritePayload { .. } => "write_payload",
            Self::ReadFile { .. } => "read_file",
            Self::WriteFile { .. } => "write_file",
        }
    }
}

/// Successful outcome of one tag operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum OperationResponse {
    Done,
    ChipInfo(ChipInfo),
    KeyData(KeyData),
    File(DataFile),
}

impl OperationResponse {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Done => "done",
            Self::ChipInfo(_) => "chip_info",
            Self::KeyData(_) => "key_data",
            Self::File(_) => "file",
        }
    }
}
