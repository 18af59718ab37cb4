//! Assembly of key payloads from user input, off the async executor.

use std::{fs, io::Cursor, path::PathBuf};

use anyhow::{anyhow, Context};
use shared::{
    domain::{AttributeType, FileDescriptor, KeyPayload},
    error::TagError,
};
use tracing::debug;

use crate::{error::OperationError, settings::KeysSettings, user_input::parse_user_input};

/// Where the picture used to inflate oversized payloads comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PictureSource {
    File(PathBuf),
    Generated { size: u32 },
}

#[derive(Debug, Clone)]
pub struct PayloadFactory {
    version_value: String,
    oversize_copies: usize,
    picture: PictureSource,
}

impl PayloadFactory {
    pub fn new(settings: &KeysSettings) -> Self {
        let picture = match &settings.picture_path {
            Some(path) => PictureSource::File(path.clone()),
            None => PictureSource::Generated {
                size: settings.generated_picture_size,
            },
        };
        Self {
            version_value: settings.version_value.clone(),
            oversize_copies: settings.oversize_copies,
            picture,
        }
    }

    pub fn with_picture(mut self, picture: PictureSource) -> Self {
        self.picture = picture;
        self
    }

    /// Builds the payload on a blocking worker and waits for it.
    ///
    /// With `oversized`, the payload also carries several copies of a PNG
    /// picture so the write exceeds what a key can hold.
    pub async fn create(
        &self,
        user_input: Option<String>,
        oversized: bool,
    ) -> Result<KeyPayload, OperationError> {
        let factory = self.clone();
        tokio::task::spawn_blocking(move || factory.build(user_input.as_deref(), oversized))
            .await
            .map_err(|err| anyhow!("payload assembly task failed: {err}"))?
    }

    fn build(&self, user_input: Option<&str>, oversized: bool) -> Result<KeyPayload, OperationError> {
        let mut builder = KeyPayload::builder();
        builder.add_file(FileDescriptor::version(), self.version_value.as_bytes());

        for record in parse_user_input(user_input) {
            let descriptor = record.descriptor().map_err(TagError::from)?;
            debug!(file = %descriptor, "adding file to payload");
            builder.add_file(descriptor, record.value.into_bytes());
        }

        if oversized {
            let picture = picture_png(&self.picture)?;
            for index in 1..=self.oversize_copies {
                let descriptor = FileDescriptor::builder()
                    .name(format!("PictureStream_{index}"))
                    .attribute_type(AttributeType::Png)
                    .build()
                    .map_err(TagError::from)?;
                builder.add_file(descriptor, picture.clone());
            }
        }

        let payload = builder.build();
        debug!(
            entries = payload.len(),
            bytes = payload.total_size(),
            "key payload assembled"
        );
        Ok(payload)
    }
}

/// Decodes the picture and re-encodes it as PNG.
fn picture_png(source: &PictureSource) -> anyhow::Result<Vec<u8>> {
    let image = match source {
        PictureSource::File(path) => {
            let bytes = fs::read(path)
                .with_context(|| format!("failed to read picture '{}'", path.display()))?;
            image::load_from_memory(&bytes)
                .with_context(|| format!("failed to decode picture '{}'", path.display()))?
        }
        PictureSource::Generated { size } => {
            image::DynamicImage::ImageRgba8(generated_picture(*size))
        }
    };

    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, image::ImageFormat::Png)
        .context("failed to encode picture as PNG")?;
    Ok(out.into_inner())
}

// Noise keeps the PNG from compressing down to a few bytes.
fn generated_picture(size: u32) -> image::RgbaImage {
    let size = size.max(1);
    image::RgbaImage::from_fn(size, size, |x, y| {
        let mut seed = x.wrapping_mul(0x9E37_79B1) ^ y.wrapping_mul(0x85EB_CA77) ^ 0xC2B2_AE3D;
        seed ^= seed >> 15;
        seed = seed.wrapping_mul(0x2C1B_3C6D);
        seed ^= seed >> 12;
        let [r, g, b, _] = seed.to_le_bytes();
        image::Rgba([r, g, b, 0xFF])
    })
}
