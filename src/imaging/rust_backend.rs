//! Pure Rust image backend built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP) | `image::ImageReader` with format sniffing |
//! | Dimensions | `image::image_dimensions` |
//! | Band stitch | row copies over an RGBA8 buffer |
//! | Encode → PNG | `image::codecs::png::PngEncoder` (lossless) |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::BandPlan;
use super::params::BandParams;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ImageReader, RgbaImage};
use std::path::Path;

/// Production backend. See the [module docs](self) for the crate mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image from disk.
///
/// The format is sniffed from content, not trusted from the extension:
/// picked files often arrive under temp names.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| BackendError::Decode(format!("{}: {}", path.display(), e)))
}

/// Copy the surviving rows of `source` into a new, shorter image.
pub(crate) fn compose(source: &RgbaImage, plan: &BandPlan) -> Result<RgbaImage, BackendError> {
    let width = source.width();
    let row_bytes = width as usize * 4;
    let raw = source.as_raw();
    let out_height = plan.output_height();

    let mut buf = Vec::with_capacity(row_bytes * out_height as usize);
    for span in plan.segments() {
        let start = span.from as usize * row_bytes;
        let end = start + span.rows as usize * row_bytes;
        let rows = raw.get(start..end).ok_or_else(|| {
            BackendError::Decode(format!(
                "rows {}..{} outside a {}-row image",
                span.from,
                span.from + span.rows,
                source.height()
            ))
        })?;
        buf.extend_from_slice(rows);
    }

    RgbaImage::from_raw(width, out_height, buf)
        .ok_or_else(|| BackendError::Encode("composed buffer has the wrong size".into()))
}

/// Encode as PNG at `path`.
fn save_png(img: RgbaImage, path: &Path) -> Result<(), BackendError> {
    let file = std::fs::File::create(path).map_err(BackendError::Io)?;
    let writer = std::io::BufWriter::new(file);
    DynamicImage::ImageRgba8(img)
        .write_with_encoder(PngEncoder::new(writer))
        .map_err(|e| BackendError::Encode(format!("PNG encode failed: {}", e)))
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = image::image_dimensions(path)
            .map_err(|e| BackendError::Decode(format!("Failed to read dimensions: {}", e)))?;
        Ok(Dimensions { width, height })
    }

    fn remove_band(&self, params: &BandParams) -> Result<Dimensions, BackendError> {
        let source = load_image(&params.source)?.to_rgba8();
        let composed = compose(&source, &params.plan)?;
        let dims = Dimensions {
            width: composed.width(),
            height: composed.height(),
        };
        save_png(composed, &params.output)?;
        Ok(dims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{row_color, striped_image, write_striped_jpeg, write_striped_png};

    #[test]
    fn compose_top_band_shifts_rows_up() {
        let src = striped_image(4, 10);
        let out = compose(
            &src,
            &BandPlan::Top {
                keep_from: 3,
                height: 10,
            },
        )
        .unwrap();
        assert_eq!(out.dimensions(), (4, 7));
        assert_eq!(*out.get_pixel(0, 0), row_color(3));
        assert_eq!(*out.get_pixel(3, 6), row_color(9));
    }

    #[test]
    fn compose_bottom_band_keeps_upper_rows_unchanged() {
        let src = striped_image(5, 300);
        let out = compose(&src, &BandPlan::Bottom { keep_rows: 260 }).unwrap();
        assert_eq!(out.dimensions(), (5, 260));
        for y in [0, 1, 130, 258, 259] {
            for x in [0, 4] {
                assert_eq!(*out.get_pixel(x, y), row_color(y), "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn compose_interior_band_joins_segments() {
        let src = striped_image(4, 10);
        let out = compose(
            &src,
            &BandPlan::Interior {
                top_rows: 4,
                bottom_from: 6,
                height: 10,
            },
        )
        .unwrap();
        assert_eq!(out.height(), 8);
        assert_eq!(*out.get_pixel(1, 3), row_color(3));
        assert_eq!(*out.get_pixel(1, 4), row_color(6));
    }

    #[test]
    fn compose_rejects_plan_beyond_image() {
        let src = striped_image(2, 5);
        let result = compose(
            &src,
            &BandPlan::Top {
                keep_from: 2,
                height: 9,
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn identify_synthetic_png() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("test.png");
        write_striped_png(&path, 20, 15);

        let dims = RustBackend::new().identify(&path).unwrap();
        assert_eq!((dims.width, dims.height), (20, 15));
    }

    #[test]
    fn identify_nonexistent_file_errors() {
        let result = RustBackend::new().identify(Path::new("/nonexistent/image.png"));
        assert!(result.is_err());
    }

    #[test]
    fn remove_band_from_jpeg_writes_png() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        write_striped_jpeg(&source, 32, 40);
        let output = tmp.path().join("out.png");

        let dims = RustBackend::new()
            .remove_band(&BandParams {
                source,
                output: output.clone(),
                plan: BandPlan::Bottom { keep_rows: 30 },
            })
            .unwrap();

        assert_eq!((dims.width, dims.height), (32, 30));
        assert_eq!(image::image_dimensions(&output).unwrap(), (32, 30));
    }

    #[test]
    fn remove_band_garbage_input_is_decode_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("broken.png");
        std::fs::write(&source, b"definitely not an image").unwrap();

        let result = RustBackend::new().remove_band(&BandParams {
            source,
            output: tmp.path().join("out.png"),
            plan: BandPlan::Bottom { keep_rows: 1 },
        });
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn remove_band_unwritable_output_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.png");
        write_striped_png(&source, 8, 8);

        let result = RustBackend::new().remove_band(&BandParams {
            source,
            output: tmp.path().join("missing-dir/out.png"),
            plan: BandPlan::Bottom { keep_rows: 4 },
        });
        assert!(matches!(result, Err(BackendError::Io(_))));
    }
}
