use std::sync::RwLock;

use shared::domain::FileDescriptor;

/// Key layout declared by the configuration loader for the current tap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagConfiguration {
    pub files: Vec<FileDescriptor>,
    pub authenticity_file: FileDescriptor,
    pub require_pin_auth: bool,
    pub chip: String,
}

impl TagConfiguration {
    pub fn declares(&self, name: &str) -> bool {
        self.files.iter().any(|file| file.name() == name)
    }
}

/// Shared handle to the tag-interaction session.
///
/// One instance is created per presenter and handed to every collaborator
/// that needs to see the declared configuration.
#[derive(Debug, Default)]
pub struct Session {
    configuration: RwLock<Option<TagConfiguration>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&self, configuration: TagConfiguration) {
        *self.write() = Some(configuration);
    }

    pub fn clear(&self) {
        *self.write() = None;
    }

    pub fn configuration(&self) -> Option<TagConfiguration> {
        self.configuration
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<TagConfiguration>> {
        self.configuration
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
