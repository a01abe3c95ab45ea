//! Document source and raster surface types

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine;
use image::DynamicImage;

use super::error::{RenderError, RenderResult};

/// Where a document's bytes come from
#[derive(Debug, Clone)]
pub enum DocumentSource {
    /// Document downloaded or read into memory
    Bytes(Arc<Vec<u8>>),
    /// Document on the local filesystem
    Path(PathBuf),
}

impl DocumentSource {
    /// Create source from bytes
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self::Bytes(Arc::new(data))
    }

    /// Create source from path
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        Self::Path(path.as_ref().to_path_buf())
    }
}

/// A rendered page: RGBA pixels plus the size they were rendered at
#[derive(Clone, PartialEq, Eq)]
pub struct RasterSurface {
    /// Surface width in pixels
    pub width: u32,
    /// Surface height in pixels
    pub height: u32,
    /// Raw RGBA pixel data (4 bytes per pixel)
    pub pixels: Arc<[u8]>,
}

impl RasterSurface {
    /// Wrap RGBA pixel data, checking it matches the dimensions
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> RenderResult<Self> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(RenderError::ImageError(format!(
                "Expected {} bytes for {}x{} RGBA, got {}",
                expected,
                width,
                height,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels: pixels.into(),
        })
    }

    /// A surface filled with one colour
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels: Vec<u8> = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            pixels: pixels.into(),
        }
    }

    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }

    /// Encode as PNG
    pub fn to_png(&self) -> RenderResult<Vec<u8>> {
        let img = image::RgbaImage::from_raw(self.width, self.height, self.pixels.to_vec())
            .ok_or_else(|| RenderError::ImageError("Failed to create image buffer".to_string()))?;

        let mut output = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut output), image::ImageFormat::Png)
            .map_err(|e| RenderError::ImageError(e.to_string()))?;

        Ok(output)
    }

    /// Encode as a `data:image/png;base64,...` URL for web shells
    pub fn to_data_url(&self) -> RenderResult<String> {
        let png = self.to_png()?;
        Ok(format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(png)
        ))
    }
}

impl std::fmt::Debug for RasterSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterSurface")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}
