//! Screenshot payloads.

use std::path::Path;

use image::{DynamicImage, ImageFormat};

use crate::error::Result;

/// Raw image bytes returned by a screenshot route.
///
/// Device screenshots are PNG; element screenshots are usually JPEG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screenshot {
    bytes: Vec<u8>,
}

impl Screenshot {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// The image format sniffed from the leading bytes.
    pub fn format(&self) -> Result<ImageFormat> {
        Ok(image::guess_format(&self.bytes)?)
    }

    /// Decodes the image and reports its format.
    pub fn decode(&self) -> Result<(DynamicImage, ImageFormat)> {
        let format = self.format()?;
        let img = image::load_from_memory_with_format(&self.bytes, format)?;
        Ok((img, format))
    }

    /// Writes the raw bytes to `path` unchanged.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, &self.bytes)?;
        Ok(())
    }
}
