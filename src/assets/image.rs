use crate::errors::{Result, VitrineError};

/// Tightly packed RGBA8 pixels ready for upload.
#[derive(Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl std::fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedImage")
            .field("label", &self.label)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl DecodedImage {
    /// Wraps raw RGBA8 pixels, checking the buffer length.
    pub fn from_rgba8(label: impl Into<String>, width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let label = label.into();
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(VitrineError::ImageDecode(format!(
                "'{label}': expected {expected} bytes for {width}x{height}, got {}",
                pixels.len()
            )));
        }
        Ok(Self {
            label,
            width,
            height,
            pixels,
        })
    }

    /// Decodes PNG, JPEG or WebP bytes.
    pub fn decode(label: impl Into<String>, bytes: &[u8]) -> Result<Self> {
        let label = label.into();
        let rgba = image::load_from_memory(bytes)
            .map_err(|e| VitrineError::ImageDecode(format!("'{label}': {e}")))?
            .to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Self {
            label,
            width,
            height,
            pixels: rgba.into_raw(),
        })
    }

    /// A 1×1 image of one colour.
    #[must_use]
    pub fn solid(label: impl Into<String>, rgba: [u8; 4]) -> Self {
        Self {
            label: label.into(),
            width: 1,
            height: 1,
            pixels: rgba.to_vec(),
        }
    }

    /// Row-swapped copy, for sources stored bottom-up.
    #[must_use]
    pub fn flipped_y(&self) -> Self {
        let row = self.width as usize * 4;
        let mut pixels = Vec::with_capacity(self.pixels.len());
        for chunk in self.pixels.chunks_exact(row.max(1)).rev() {
            pixels.extend_from_slice(chunk);
        }
        Self {
            label: self.label.clone(),
            width: self.width,
            height: self.height,
            pixels,
        }
    }
}
