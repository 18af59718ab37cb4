use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::error::DescriptorError;

/// Name of the file every key carries and that proves its authenticity.
pub const VERSION_FILE_NAME: &str = "VERSION";

/// Opaque reference to the tag presented for the current tap.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagHandle {
    uid: Vec<u8>,
}

impl TagHandle {
    pub fn new(uid: impl Into<Vec<u8>>) -> Self {
        Self { uid: uid.into() }
    }

    pub fn uid(&self) -> &[u8] {
        &self.uid
    }
}

impl fmt::Display for TagHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.uid {
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    String,
    Png,
    Jpeg,
    Binary,
}

impl AttributeType {
    fn is_text(self) -> bool {
        matches!(self, Self::String)
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Binary => "binary",
        };
        f.write_str(name)
    }
}

/// Describes one logical file slot on a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileDescriptor {
    name: String,
    attribute_type: AttributeType,
    encrypted_individually: bool,
}

impl FileDescriptor {
    pub fn builder() -> FileDescriptorBuilder {
        FileDescriptorBuilder::default()
    }

    /// The fixed version descriptor, always first in a key's layout.
    pub fn version() -> Self {
        Self {
            name: VERSION_FILE_NAME.to_string(),
            attribute_type: AttributeType::String,
            encrypted_individually: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attribute_type(&self) -> AttributeType {
        self.attribute_type
    }

    pub fn encrypted_individually(&self) -> bool {
        self.encrypted_individually
    }
}

impl fmt::Display for FileDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.attribute_type)?;
        if self.encrypted_individually {
            f.write_str(" [encrypted]")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct FileDescriptorBuilder {
    name: Option<String>,
    attribute_type: Option<AttributeType>,
    encrypted_individually: bool,
}

impl FileDescriptorBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn attribute_type(mut self, attribute_type: AttributeType) -> Self {
        self.attribute_type = Some(attribute_type);
        self
    }

    pub fn encrypted_individually(mut self, encrypted: bool) -> Self {
        self.encrypted_individually = encrypted;
        self
    }

    /// Untyped descriptors default to `String`.
    pub fn build(self) -> Result<FileDescriptor, DescriptorError> {
        let name = self.name.ok_or(DescriptorError::MissingName)?;
        if name.trim().is_empty() {
            return Err(DescriptorError::MissingName);
        }
        if name.contains(':') || name.contains('\n') {
            return Err(DescriptorError::InvalidName {
                name,
                detail: "names cannot contain ':' or line breaks",
            });
        }

        Ok(FileDescriptor {
            name,
            attribute_type: self.attribute_type.unwrap_or(AttributeType::String),
            encrypted_individually: self.encrypted_individually,
        })
    }
}

/// A named, typed value stored in one file slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataFile {
    pub name: String,
    pub attribute_type: AttributeType,
    pub data: Vec<u8>,
}

impl DataFile {
    pub fn new(name: impl Into<String>, attribute_type: AttributeType, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            attribute_type,
            data: data.into(),
        }
    }

    pub fn text(&self) -> Option<&str> {
        if !self.attribute_type.is_text() {
            return None;
        }
        std::str::from_utf8(&self.data).ok()
    }
}

impl fmt::Display for DataFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.text() {
            Some(text) => write!(f, "{} ({}): {text}", self.name, self.attribute_type),
            None => {
                let encoded = STANDARD.encode(&self.data);
                let preview: String = encoded.chars().take(24).collect();
                write!(
                    f,
                    "{} ({}): {} bytes, base64 {preview}",
                    self.name,
                    self.attribute_type,
                    self.data.len()
                )?;
                if encoded.len() > preview.len() {
                    f.write_str("...")?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadEntry {
    pub descriptor: FileDescriptor,
    pub data: Vec<u8>,
}

/// The full set of files written to a key in one write operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPayload {
    entries: Vec<PayloadEntry>,
}

impl KeyPayload {
    pub fn builder() -> KeyPayloadBuilder {
        KeyPayloadBuilder::default()
    }

    pub fn entries(&self) -> &[PayloadEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_size(&self) -> usize {
        self.entries.iter().map(|entry| entry.data.len()).sum()
    }

    pub fn entry(&self, name: &str) -> Option<&PayloadEntry> {
        self.entries
            .iter()
            .find(|entry| entry.descriptor.name() == name)
    }

    pub fn to_key_data(&self) -> KeyData {
        KeyData::new(
            self.entries
                .iter()
                .map(|entry| {
                    DataFile::new(
                        entry.descriptor.name(),
                        entry.descriptor.attribute_type(),
                        entry.data.clone(),
                    )
                })
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct KeyPayloadBuilder {
    entries: Vec<PayloadEntry>,
}

impl KeyPayloadBuilder {
    /// Adding a file whose name is already present replaces its data in place.
    pub fn add_file(&mut self, descriptor: FileDescriptor, data: impl Into<Vec<u8>>) -> &mut Self {
        let data = data.into();
        match self
            .entries
            .iter_mut()
            .find(|entry| entry.descriptor.name() == descriptor.name())
        {
            Some(existing) => {
                existing.descriptor = descriptor;
                existing.data = data;
            }
            None => self.entries.push(PayloadEntry { descriptor, data }),
        }
        self
    }

    pub fn build(self) -> KeyPayload {
        KeyPayload {
            entries: self.entries,
        }
    }
}

/// Decoded contents of a key, as returned by a payload read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyData {
    pub files: Vec<DataFile>,
}

impl KeyData {
    pub fn new(files: Vec<DataFile>) -> Self {
        Self { files }
    }

    pub fn file(&self, name: &str) -> Option<&DataFile> {
        self.files.iter().find(|file| file.name == name)
    }
}

impl fmt::Display for KeyData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.files.is_empty() {
            return f.write_str("<empty key>");
        }
        for (index, file) in self.files.iter().enumerate() {
            if index > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{file}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChipInfo {
    pub chip: String,
    pub uid: Vec<u8>,
    pub hardware_version: String,
    pub software_version: String,
    pub free_memory: usize,
}

impl fmt::Display for ChipInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} uid={} hw={} sw={} free={} bytes",
            self.chip,
            TagHandle::new(self.uid.clone()),
            self.hardware_version,
            self.software_version,
            self.free_memory
        )
    }
}
