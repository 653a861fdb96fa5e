//! Local watermark removal by band cropping.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **Plan** | [`plan_band_removal`] (pure) |
//! | **Stitch → PNG** | RGBA8 row copies + PNG encoder |
//!
//! "Removal" is a hard crop: a full-width horizontal band is deleted and the
//! rows above and below are joined with no gap. The output is
//! `source_height - band_height` rows tall and keeps the full width.
//!
//! The module is split into:
//! - **Calculations**: band planning, preview sizing, presets (unit testable)
//! - **Parameters**: source-space and display-space regions
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: high-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{
    BandPlan, RegionProblem, RowSpan, fit_display_size, plan_band_removal, preset_rect,
};
pub use operations::{BandOutput, CropError, RegionInput, process_selected, remove_band, resolve_region};
pub use params::{BandParams, DisplayRect, DisplaySize, Preset, Rectangle};
pub use rust_backend::RustBackend;
