//! Declares the expected key layout before any tag operation runs.

use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;
use shared::{
    domain::FileDescriptor,
    error::{Reason, TagError},
};
use tracing::{debug, info};

use crate::{
    error::OperationError,
    session::{Session, TagConfiguration},
    user_input::file_list_from_input,
};

#[derive(Debug, Clone)]
pub struct TagConfigRequest {
    pub files: Vec<FileDescriptor>,
    pub authenticity_file: FileDescriptor,
    pub session: Arc<Session>,
    pub require_pin_auth: bool,
    pub chip: String,
}

#[async_trait]
pub trait ConfigurationLoader: Send + Sync {
    /// Drops whatever configuration was declared for a previous tap.
    fn reset_tag_configurations(&self);

    async fn load(&self, request: TagConfigRequest) -> Result<(), OperationError>;
}

/// Clears the previous declaration, rebuilds the file list from `user_input`
/// and hands it to `loader`. Returns the declared file list.
pub async fn load_tag_configuration(
    loader: &dyn ConfigurationLoader,
    session: &Arc<Session>,
    user_input: Option<&str>,
    chip: &str,
    require_pin_auth: bool,
) -> Result<Vec<FileDescriptor>, OperationError> {
    loader.reset_tag_configurations();

    let files = file_list_from_input(user_input).map_err(TagError::from)?;
    let authenticity_file = files[0].clone();
    debug!(files = files.len(), chip, "loading tag configuration");

    loader
        .load(TagConfigRequest {
            files: files.clone(),
            authenticity_file,
            session: Arc::clone(session),
            require_pin_auth,
            chip: chip.to_string(),
        })
        .await?;

    Ok(files)
}

/// Validates a configuration request and declares it on the session.
#[derive(Debug)]
pub struct DefaultConfigurationLoader {
    session: Arc<Session>,
}

impl DefaultConfigurationLoader {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    fn validate(request: &TagConfigRequest) -> Result<(), TagError> {
        if request.files.is_empty() {
            return Err(invalid("no files declared"));
        }
        if request.chip.trim().is_empty() {
            return Err(invalid("chip identifier is empty"));
        }
        if !request.files.contains(&request.authenticity_file) {
            return Err(invalid(format!(
                "authenticity file {} is not part of the declared files",
                request.authenticity_file.name()
            )));
        }

        let mut seen = HashSet::new();
        for file in &request.files {
            if !seen.insert(file.name()) {
                return Err(invalid(format!("file {} declared twice", file.name())));
            }
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> TagError {
    TagError::new(Reason::InvalidConfiguration, message)
}

#[async_trait]
impl ConfigurationLoader for DefaultConfigurationLoader {
    fn reset_tag_configurations(&self) {
        self.session.clear();
    }

    async fn load(&self, request: TagConfigRequest) -> Result<(), OperationError> {
        Self::validate(&request)?;

        info!(
            files = request.files.len(),
            authenticity_file = request.authenticity_file.name(),
            chip = %request.chip,
            "tag configuration declared"
        );
        request.session.declare(TagConfiguration {
            files: request.files,
            authenticity_file: request.authenticity_file,
            require_pin_auth: request.require_pin_auth,
            chip: request.chip,
        });
        Ok(())
    }
}
