use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use thiserror::Error;

/// JPEG quality used for project preview thumbnails. Working snapshots are
/// lossless PNG; previews only need to be recognizable.
const THUMBNAIL_QUALITY: u8 = 60;

/// Errors that can occur while encoding or decoding layer snapshots
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to encode snapshot: {0}")]
    Encode(#[source] image::ImageError),

    #[error("failed to decode snapshot: {0}")]
    Decode(#[source] image::ImageError),
}

/// An encoded raster image capturing one layer surface's pixel content at
/// one history point. Immutable once captured.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    data: Vec<u8>,
}

impl Snapshot {
    /// Encode a surface's pixels as a full-quality working snapshot (PNG).
    pub fn encode(image: &RgbaImage) -> Result<Self, SnapshotError> {
        let mut buf = Cursor::new(Vec::new());
        image
            .write_to(&mut buf, ImageFormat::Png)
            .map_err(SnapshotError::Encode)?;
        Ok(Self {
            data: buf.into_inner(),
        })
    }

    /// Encode a lower-quality compressed thumbnail, scaled so the longest
    /// edge is at most `max_dim` pixels. Used for project previews.
    pub fn thumbnail(image: &RgbaImage, max_dim: u32) -> Result<Self, SnapshotError> {
        let (w, h) = image.dimensions();
        let longest = w.max(h).max(1);
        let scale = (max_dim as f32 / longest as f32).min(1.0);
        let tw = ((w as f32 * scale) as u32).max(1);
        let th = ((h as f32 * scale) as u32).max(1);

        let scaled = image::imageops::resize(image, tw, th, FilterType::Triangle);
        // JPEG has no alpha channel; flatten onto opaque before encoding.
        let rgb = DynamicImage::ImageRgba8(scaled).to_rgb8();

        let mut buf = Cursor::new(Vec::new());
        JpegEncoder::new_with_quality(&mut buf, THUMBNAIL_QUALITY)
            .encode_image(&rgb)
            .map_err(SnapshotError::Encode)?;
        Ok(Self {
            data: buf.into_inner(),
        })
    }

    /// Decode back to a pixel buffer. Callers treat failure as a soft
    /// condition: log it and leave the target surface unchanged.
    pub fn decode(&self) -> Result<RgbaImage, SnapshotError> {
        image::load_from_memory(&self.data)
            .map(|img| img.to_rgba8())
            .map_err(SnapshotError::Decode)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("bytes", &self.data.len())
            .finish()
    }
}
