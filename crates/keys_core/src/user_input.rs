//! Parsing of the free-form `name:value` text typed by the user.

use shared::domain::{AttributeType, FileDescriptor};
use shared::error::DescriptorError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub name: String,
    pub value: String,
}

impl UserRecord {
    pub fn descriptor(&self) -> Result<FileDescriptor, DescriptorError> {
        FileDescriptor::builder()
            .name(self.name.as_str())
            .attribute_type(AttributeType::String)
            .build()
    }
}

/// Splits user input into records, one per non-blank line.
///
/// The name runs up to the first colon and the value starts after the last
/// one, so `a:b:c` yields name `a` and value `c`. A line without a colon is
/// used as both name and value.
pub fn parse_user_input(input: Option<&str>) -> Vec<UserRecord> {
    let Some(input) = input else {
        return Vec::new();
    };

    input
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let name = line.split(':').next().unwrap_or(line);
            let value = line.rsplit(':').next().unwrap_or(line);
            UserRecord {
                name: name.to_string(),
                value: value.to_string(),
            }
        })
        .collect()
}

/// The version descriptor followed by one descriptor per user record.
pub fn file_list_from_input(input: Option<&str>) -> Result<Vec<FileDescriptor>, DescriptorError> {
    let mut files = vec![FileDescriptor::version()];
    for record in parse_user_input(input) {
        files.push(record.descriptor()?);
    }
    tracing::debug!(count = files.len(), "file list built from user input");
    Ok(files)
}
