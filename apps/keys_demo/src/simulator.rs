//! In-memory stand-in for the tag toolkit, used to drive the presenter
//! without hardware.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use anyhow::anyhow;
use async_trait::async_trait;
use keys_core::{Interactors, NfcInteractor, OperationError, Session, TagConfiguration};
use shared::{
    domain::{ChipInfo, DataFile, KeyData, TagHandle},
    error::{Reason, TagError},
    protocol::{OperationRequest, OperationResponse},
};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractorKind {
    ReadChipInfo,
    ReadPayload,
    WritePayload,
    Reset,
    ReadFile,
    WriteFile,
}

impl InteractorKind {
    pub const ALL: [InteractorKind; 6] = [
        InteractorKind::ReadChipInfo,
        InteractorKind::ReadPayload,
        InteractorKind::WritePayload,
        InteractorKind::Reset,
        InteractorKind::ReadFile,
        InteractorKind::WriteFile,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::ReadChipInfo => "read_chip_info",
            Self::ReadPayload => "read_payload",
            Self::WritePayload => "write_payload",
            Self::Reset => "reset",
            Self::ReadFile => "read_file",
            Self::WriteFile => "write_file",
        }
    }

    fn needs_pin(self) -> bool {
        !matches!(self, Self::ReadChipInfo | Self::Reset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjectedFailure {
    pub kind: InteractorKind,
    pub reason: Option<Reason>,
}

#[derive(Debug, Default)]
struct StoredTag {
    files: Vec<DataFile>,
}

impl StoredTag {
    fn used(&self) -> usize {
        self.files.iter().map(|file| file.data.len()).sum()
    }
}

/// Tags the simulator has seen, keyed by uid.
pub struct SimulatedToolkit {
    session: Arc<Session>,
    pin: String,
    capacity: usize,
    failure: Option<InjectedFailure>,
    tags: Mutex<HashMap<Vec<u8>, StoredTag>>,
}

impl SimulatedToolkit {
    pub fn new(session: Arc<Session>, pin: impl Into<String>, capacity: usize) -> Self {
        Self {
            session,
            pin: pin.into(),
            capacity,
            failure: None,
            tags: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_failure(mut self, failure: Option<InjectedFailure>) -> Self {
        self.failure = failure;
        self
    }

    pub fn interactors(self: &Arc<Self>) -> Interactors {
        let interactor = |kind| -> Arc<dyn NfcInteractor> {
            Arc::new(SimulatedInteractor {
                kind,
                toolkit: Arc::clone(self),
            })
        };
        Interactors {
            read_chip_info: interactor(InteractorKind::ReadChipInfo),
            read_payload: interactor(InteractorKind::ReadPayload),
            write_payload: interactor(InteractorKind::WritePayload),
            reset: interactor(InteractorKind::Reset),
            read_file: interactor(InteractorKind::ReadFile),
            write_file: interactor(InteractorKind::WriteFile),
        }
    }

    pub fn is_empty(&self, tag: &TagHandle) -> bool {
        self.tags()
            .get(tag.uid())
            .map_or(true, |stored| stored.files.is_empty())
    }

    fn tags(&self) -> MutexGuard<'_, HashMap<Vec<u8>, StoredTag>> {
        self.tags.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn run(
        &self,
        kind: InteractorKind,
        request: OperationRequest,
    ) -> Result<OperationResponse, OperationError> {
        if let Some(failure) = self.failure.filter(|failure| failure.kind == kind) {
            let message = format!("injected {} failure", kind.name());
            return Err(match failure.reason {
                Some(reason) => TagError::new(reason, message),
                None => TagError::unclassified(message),
            }
            .into());
        }

        let configuration = self.session.configuration().ok_or_else(|| {
            TagError::new(Reason::InvalidConfiguration, "no tag configuration declared")
        })?;
        if configuration.require_pin_auth && kind.needs_pin() && request.pin() != Some(self.pin.as_str()) {
            return Err(TagError::new(Reason::WrongPin, "PIN authentication failed").into());
        }

        let uid = request.tag().uid().to_vec();
        let mut tags = self.tags();
        let stored = tags.entry(uid.clone()).or_default();

        match (kind, request) {
            (InteractorKind::ReadChipInfo, OperationRequest::Tag { .. }) => {
                Ok(OperationResponse::ChipInfo(ChipInfo {
                    chip: configuration.chip,
                    uid,
                    hardware_version: "1.0".into(),
                    software_version: "1.1".into(),
                    free_memory: self.capacity.saturating_sub(stored.used()),
                }))
            }
            (InteractorKind::Reset, OperationRequest::Tag { .. }) => {
                stored.files.clear();
                Ok(OperationResponse::Done)
            }
            (InteractorKind::WritePayload, OperationRequest::WritePayload { payload, .. }) => {
                if payload.total_size() > self.capacity {
                    return Err(too_big(payload.total_size(), self.capacity));
                }
                for entry in payload.entries() {
                    ensure_declared(&configuration, entry.descriptor.name())?;
                }
                stored.files = payload.to_key_data().files;
                debug!(files = stored.files.len(), "simulated payload written");
                Ok(OperationResponse::Done)
            }
            (InteractorKind::ReadPayload, OperationRequest::ReadPayload { .. }) => {
                let authenticity = configuration.authenticity_file.name();
                if !stored.files.iter().any(|file| file.name == authenticity) {
                    return Err(TagError::new(
                        Reason::AuthenticationFailed,
                        format!("authenticity file {authenticity} missing"),
                    )
                    .into());
                }
                let files = configuration
                    .files
                    .iter()
                    .filter_map(|declared| {
                        stored
                            .files
                            .iter()
                            .find(|file| file.name == declared.name())
                            .cloned()
                    })
                    .collect();
                Ok(OperationResponse::KeyData(KeyData::new(files)))
            }
            (InteractorKind::ReadFile, OperationRequest::ReadFile { file, .. }) => stored
                .files
                .iter()
                .find(|stored_file| stored_file.name == file.name())
                .cloned()
                .map(OperationResponse::File)
                .ok_or_else(|| {
                    OperationError::from(TagError::new(
                        Reason::FileNotFound,
                        format!("file {} not found", file.name()),
                    ))
                }),
            (InteractorKind::WriteFile, OperationRequest::WriteFile { file, .. }) => {
                ensure_declared(&configuration, &file.name)?;
                let others: usize = stored
                    .files
                    .iter()
                    .filter(|stored_file| stored_file.name != file.name)
                    .map(|stored_file| stored_file.data.len())
                    .sum();
                if others + file.data.len() > self.capacity {
                    return Err(too_big(others + file.data.len(), self.capacity));
                }
                match stored
                    .files
                    .iter_mut()
                    .find(|stored_file| stored_file.name == file.name)
                {
                    Some(existing) => *existing = file,
                    None => stored.files.push(file),
                }
                Ok(OperationResponse::Done)
            }
            (kind, request) => Err(OperationError::from(anyhow!(
                "{} interactor cannot handle {} requests",
                kind.name(),
                request.kind()
            ))),
        }
    }
}

fn ensure_declared(configuration: &TagConfiguration, name: &str) -> Result<(), OperationError> {
    if configuration.declares(name) {
        return Ok(());
    }
    Err(TagError::new(
        Reason::InvalidConfiguration,
        format!("file {name} is not part of the declared configuration"),
    )
    .into())
}

fn too_big(size: usize, capacity: usize) -> OperationError {
    TagError::new(
        Reason::PayloadTooBig,
        format!("{size} bytes exceed the {capacity} byte capacity"),
    )
    .into()
}

struct SimulatedInteractor {
    kind: InteractorKind,
    toolkit: Arc<SimulatedToolkit>,
}

#[async_trait]
impl NfcInteractor for SimulatedInteractor {
    fn name(&self) -> &'static str {
        self.kind.name()
    }

    async fn run(&self, request: OperationRequest) -> Result<OperationResponse, OperationError> {
        self.toolkit.run(self.kind, request)
    }
}
