//! Parameter types for band removal.
//!
//! These structs describe *what* to cut, not *how*. The
//! [`operations`](super::operations) module turns user input into a
//! [`BandParams`]; the [`backend`](super::backend) does the pixel work.
//!
//! ## Coordinate spaces
//!
//! - [`Rectangle`] is in **source pixels** of the decoded image.
//! - [`DisplayRect`] is in **display units** of a scaled-down preview. It
//!   may transiently fall outside the image; [`DisplayRect::to_source`]
//!   clamps it back in.

use super::backend::Dimensions;
use super::calculations::BandPlan;
use std::path::PathBuf;
use std::str::FromStr;

/// Axis-aligned region in source-pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rectangle {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rectangle {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A band spanning the full image width.
    pub fn band(y: u32, height: u32, image_width: u32) -> Self {
        Self::new(0, y, image_width, height)
    }

    /// Whether the rectangle lies entirely within `bounds`.
    pub fn fits_within(&self, bounds: Dimensions) -> bool {
        u64::from(self.x) + u64::from(self.width) <= u64::from(bounds.width)
            && u64::from(self.y) + u64::from(self.height) <= u64::from(bounds.height)
    }
}

/// Size of the on-screen preview an editor shows the image at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplaySize {
    pub width: f64,
    pub height: f64,
}

impl FromStr for DisplaySize {
    type Err = String;

    /// Parse `"WIDTHxHEIGHT"`, e.g. `"327x400"` or `"327.5x400"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
        let width: f64 = w.trim().parse().map_err(|_| format!("bad width in {s:?}"))?;
        let height: f64 = h.trim().parse().map_err(|_| format!("bad height in {s:?}"))?;
        if !(width > 0.0 && height > 0.0) {
            return Err(format!("display size must be positive, got {s:?}"));
        }
        Ok(Self { width, height })
    }
}

/// Region in display space, as held by an interactive editor.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DisplayRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl DisplayRect {
    /// Scale into source pixels, each axis by its own `image / display` ratio.
    ///
    /// Edges are rounded, not sizes, so a box touching the preview's bottom
    /// edge ends exactly on the image's last row. Parts of the box outside
    /// the image clamp to its edges.
    pub fn to_source(&self, display: DisplaySize, image: Dimensions) -> Rectangle {
        let scale_x = f64::from(image.width) / display.width;
        let scale_y = f64::from(image.height) / display.height;
        let span = |start: f64, len: f64, scale: f64, limit: u32| {
            let edge = |v: f64| (v * scale).round().clamp(0.0, f64::from(limit)) as u32;
            let from = edge(start);
            (from, edge(start + len).saturating_sub(from))
        };
        let (x, width) = span(self.x, self.width, scale_x, image.width);
        let (y, height) = span(self.y, self.height, scale_y, image.height);
        Rectangle {
            x,
            y,
            width,
            height,
        }
    }
}

/// Quick-select regions offered by the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Top,
    Bottom,
    Left,
    Right,
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "top" => Ok(Preset::Top),
            "bottom" => Ok(Preset::Bottom),
            "left" => Ok(Preset::Left),
            "right" => Ok(Preset::Right),
            other => Err(format!("unknown preset {other:?} (expected top or bottom)")),
        }
    }
}

/// Full specification of one band removal.
#[derive(Debug, Clone, PartialEq)]
pub struct BandParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub plan: BandPlan,
}
