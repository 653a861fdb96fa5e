//! High-level crop operations.
//!
//! These functions combine calculations with backend execution. They take
//! user input (a source-pixel region, or a display-space box plus the
//! preview size it was drawn on), validate it, and hand a [`BandParams`]
//! to the backend.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::{plan_band_removal, preset_rect};
use super::params::{BandParams, DisplayRect, DisplaySize, Preset, Rectangle};
use crate::types::{LocalKind, MediaKind, NewEntry, RecordKind, SelectedMedia};
use rand::Rng;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CropError {
    #[error("Invalid region: {0}")]
    InvalidRegion(String),
    #[error("Failed to decode source image: {0}")]
    DecodeFailure(String),
    #[error("Failed to write result: {0}")]
    EncodeFailure(String),
    #[error("Unsupported media: {0}")]
    UnsupportedMedia(String),
}

impl From<BackendError> for CropError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::Decode(msg) => CropError::DecodeFailure(msg),
            BackendError::Encode(msg) => CropError::EncodeFailure(msg),
            // Reading the source happens before any write; a missing source
            // surfaces from identify as a decode failure, so IO here is the write.
            BackendError::Io(err) => CropError::EncodeFailure(err.to_string()),
        }
    }
}

/// A written crop result.
#[derive(Debug, Clone, PartialEq)]
pub struct BandOutput {
    pub path: PathBuf,
    pub source: Dimensions,
    pub output: Dimensions,
    pub region: Rectangle,
}

impl BandOutput {
    /// History record for this result.
    pub fn to_new_entry(&self) -> NewEntry {
        let path = self.path.to_string_lossy().to_string();
        NewEntry {
            kind: RecordKind::FromImage,
            media_type: MediaKind::Image,
            source_url: None,
            platform: None,
            title: Some("本地图片去水印".to_string()),
            author: None,
            result_urls: vec![path.clone()],
            cover_url: Some(path),
            saved_to_album: false,
        }
    }
}

/// How the user described the region to remove.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegionInput {
    /// Already in source pixels.
    Source(Rectangle),
    /// Drawn on a preview of the given size.
    Display(DisplayRect, DisplaySize),
    /// A quick-select preset on a preview of the given size, with the
    /// preset's band height in display units.
    Preset(Preset, DisplaySize, f64),
}

/// Resolve any [`RegionInput`] to a source-pixel rectangle.
pub fn resolve_region(input: RegionInput, image: Dimensions) -> Result<Rectangle, CropError> {
    match input {
        RegionInput::Source(rect) => Ok(rect),
        RegionInput::Display(rect, display) => Ok(rect.to_source(display, image)),
        RegionInput::Preset(preset, display, band_height) => preset_rect(preset, display, band_height)
            .map(|rect| rect.to_source(display, image))
            .ok_or_else(|| {
                CropError::InvalidRegion(format!(
                    "{preset:?} preset selects a vertical strip; only top and bottom bands can be removed"
                ))
            }),
    }
}

/// Unique output file name inside `output_dir`.
fn output_path(output_dir: &Path) -> PathBuf {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000);
    output_dir.join(format!("unmark-{millis}-{suffix:06}.png"))
}

/// Remove the band described by `region` from `source`, writing a PNG into `output_dir`.
pub fn remove_band(
    backend: &impl ImageBackend,
    source: &Path,
    region: RegionInput,
    output_dir: &Path,
) -> Result<BandOutput, CropError> {
    let source_dims = backend.identify(source).map_err(|e| match e {
        BackendError::Io(err) => CropError::DecodeFailure(format!("{}: {}", source.display(), err)),
        other => CropError::from(other),
    })?;
    let rect = resolve_region(region, source_dims)?;
    let plan = plan_band_removal(source_dims, rect)
        .map_err(|problem| CropError::InvalidRegion(problem.to_string()))?;

    std::fs::create_dir_all(output_dir).map_err(|e| {
        CropError::EncodeFailure(format!("{}: {}", output_dir.display(), e))
    })?;
    let params = BandParams {
        source: source.to_path_buf(),
        output: output_path(output_dir),
        plan,
    };
    tracing::debug!(source = %source.display(), ?plan, "removing band");

    let written = backend.remove_band(&params)?;
    tracing::info!(
        output = %params.output.display(),
        width = written.width,
        height = written.height,
        "band removed"
    );
    Ok(BandOutput {
        path: params.output,
        source: source_dims,
        output: written,
        region: rect,
    })
}

/// Process a picked file. Only still images can be cropped locally.
pub fn process_selected(
    backend: &impl ImageBackend,
    media: &SelectedMedia,
    region: RegionInput,
    output_dir: &Path,
) -> Result<BandOutput, CropError> {
    match media.kind {
        LocalKind::Image => remove_band(backend, &media.path, region, output_dir),
        LocalKind::Video => Err(CropError::UnsupportedMedia(format!(
            "{} is a video; video watermark removal needs server-side processing",
            media.path.display()
        ))),
    }
}
