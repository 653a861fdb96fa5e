//! Pure calculation functions for band removal.
//!
//! All functions here are pure and testable without any I/O or images.

use super::backend::Dimensions;
use super::params::{DisplayRect, DisplaySize, Preset, Rectangle};

/// A run of consecutive source rows copied into the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSpan {
    /// First source row.
    pub from: u32,
    /// Number of rows.
    pub rows: u32,
}

/// How the remaining rows are stitched together once a band is cut out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandPlan {
    /// Band touches the top edge: keep rows `[keep_from, height)`.
    Top { keep_from: u32, height: u32 },
    /// Band touches the bottom edge: keep rows `[0, keep_rows)`.
    Bottom { keep_rows: u32 },
    /// Band is interior: rows `[0, top_rows)` directly above `[bottom_from, height)`.
    Interior {
        top_rows: u32,
        bottom_from: u32,
        height: u32,
    },
}

impl BandPlan {
    /// Source row spans in output order.
    pub fn segments(&self) -> Vec<RowSpan> {
        match *self {
            BandPlan::Top { keep_from, height } => vec![RowSpan {
                from: keep_from,
                rows: height - keep_from,
            }],
            BandPlan::Bottom { keep_rows } => vec![RowSpan {
                from: 0,
                rows: keep_rows,
            }],
            BandPlan::Interior {
                top_rows,
                bottom_from,
                height,
            } => vec![
                RowSpan {
                    from: 0,
                    rows: top_rows,
                },
                RowSpan {
                    from: bottom_from,
                    rows: height - bottom_from,
                },
            ],
        }
    }

    /// Height of the composed output.
    pub fn output_height(&self) -> u32 {
        self.segments().iter().map(|s| s.rows).sum()
    }
}

/// Why a region cannot be removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionProblem {
    Empty,
    OutOfBounds { region: Rectangle, image: Dimensions },
    RemovesWholeImage { band: u32, image_height: u32 },
}

impl std::fmt::Display for RegionProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegionProblem::Empty => write!(f, "region height is zero"),
            RegionProblem::OutOfBounds { region, image } => write!(
                f,
                "region {}x{}+{}+{} exceeds image {}x{}",
                region.width, region.height, region.x, region.y, image.width, image.height
            ),
            RegionProblem::RemovesWholeImage { band, image_height } => write!(
                f,
                "band of {band} rows leaves nothing of a {image_height}-row image"
            ),
        }
    }
}

/// Decide which rows survive removing `region` from an image of size `image`.
///
/// Only `region.y` and `region.height` select the cut; `x` and `width` are
/// bounds-checked but otherwise ignored, so the whole row width is always
/// removed.
pub fn plan_band_removal(image: Dimensions, region: Rectangle) -> Result<BandPlan, RegionProblem> {
    if region.height >= image.height {
        return Err(RegionProblem::RemovesWholeImage {
            band: region.height,
            image_height: image.height,
        });
    }
    if region.height == 0 {
        return Err(RegionProblem::Empty);
    }
    if !region.fits_within(image) {
        return Err(RegionProblem::OutOfBounds { region, image });
    }

    let band_end = region.y + region.height;
    let plan = if region.y == 0 {
        BandPlan::Top {
            keep_from: region.height,
            height: image.height,
        }
    } else if band_end >= image.height {
        BandPlan::Bottom {
            keep_rows: image.height - region.height,
        }
    } else {
        BandPlan::Interior {
            top_rows: region.y,
            bottom_from: band_end,
            height: image.height,
        }
    };
    Ok(plan)
}

/// Preview size for an image shown within `max_width` x `max_height`.
///
/// Fits width first, then height, preserving aspect ratio. Images already
/// smaller than the box are shown at natural size.
pub fn fit_display_size(image: Dimensions, max_width: f64, max_height: f64) -> DisplaySize {
    let mut width = f64::from(image.width);
    let mut height = f64::from(image.height);

    if width > max_width {
        let ratio = max_width / width;
        width = max_width;
        height *= ratio;
    }
    if height > max_height {
        let ratio = max_height / height;
        height = max_height;
        width *= ratio;
    }
    DisplaySize { width, height }
}

/// Display-space rectangle for a quick-select preset.
///
/// Returns `None` for the side presets: a vertical strip cannot be removed
/// by a full-width band cut.
pub fn preset_rect(preset: Preset, display: DisplaySize, band_height: f64) -> Option<DisplayRect> {
    let band_height = band_height.min(display.height);
    match preset {
        Preset::Top => Some(DisplayRect {
            x: 0.0,
            y: 0.0,
            width: display.width,
            height: band_height,
        }),
        Preset::Bottom => Some(DisplayRect {
            x: 0.0,
            y: display.height - band_height,
            width: display.width,
            height: band_height,
        }),
        Preset::Left | Preset::Right => None,
    }
}
