//! Optional re-encoding of legacy image formats into baseline JPEG.

use std::collections::HashSet;
use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use tracing::{debug, warn};

/// Extensions re-encoded when legacy conversion is enabled.
pub const LEGACY_FORMATS: &[&str] = &["heic", "heif", "bmp", "tif", "tiff"];

/// JPEG quality used for every conversion.
const JPEG_QUALITY: u8 = 90;

/// Extension carried by converted images.
const CANONICAL_EXT: &str = "jpg";

/// A photo's bytes after the (possibly skipped) conversion step.
#[derive(Debug)]
pub struct NormalizedImage {
    pub data: Vec<u8>,
    pub ext: String,
    pub converted: bool,
}

/// Whether files with this extension are candidates for conversion.
pub fn is_legacy(ext: &str) -> bool {
    LEGACY_FORMATS.contains(&ext.to_ascii_lowercase().as_str())
}

/// Converts legacy-format images to JPEG. Decoder availability is probed once
/// at construction; formats without a decoder pass through untouched for the
/// lifetime of the normalizer.
pub struct Normalizer {
    convert: bool,
    decodable: HashSet<&'static str>,
}

impl Normalizer {
    pub fn new(convert_legacy: bool) -> Self {
        let mut decodable = HashSet::new();
        if convert_legacy {
            for ext in LEGACY_FORMATS {
                match ImageFormat::from_extension(ext) {
                    Some(format) if format.reading_enabled() => {
                        decodable.insert(*ext);
                    }
                    _ => warn!(
                        ext = %ext,
                        "no decoder available, files of this format pass through unconverted"
                    ),
                }
            }
        }
        Self {
            convert: convert_legacy,
            decodable,
        }
    }

    /// Whether `normalize` would attempt a conversion for this extension.
    pub fn wants_conversion(&self, ext: &str) -> bool {
        self.convert && is_legacy(ext)
    }

    /// Re-encode `data` as RGB JPEG when its extension is a convertible
    /// legacy format. Any decode or encode failure downgrades to a
    /// pass-through: a single unreadable image never aborts the batch.
    pub fn normalize(&self, data: Vec<u8>, ext: &str) -> NormalizedImage {
        let ext = ext.to_ascii_lowercase();
        if !self.wants_conversion(&ext) {
            return NormalizedImage {
                data,
                ext,
                converted: false,
            };
        }
        if !self.decodable.contains(ext.as_str()) {
            debug!(ext = %ext, "skipping conversion, no decoder for format");
            return NormalizedImage {
                data,
                ext,
                converted: false,
            };
        }

        let decoded = match image::load_from_memory(&data) {
            Ok(img) => img,
            Err(e) => {
                warn!(error = %e, ext = %ext, "failed to decode image, keeping original bytes");
                return NormalizedImage {
                    data,
                    ext,
                    converted: false,
                };
            }
        };

        let rgb = DynamicImage::ImageRgb8(decoded.to_rgb8());
        let mut out = Cursor::new(Vec::new());
        let encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
        match rgb.write_with_encoder(encoder) {
            Ok(()) => {
                debug!(ext = %ext, bytes = out.get_ref().len(), "converted image to jpeg");
                NormalizedImage {
                    data: out.into_inner(),
                    ext: CANONICAL_EXT.to_string(),
                    converted: true,
                }
            }
            Err(e) => {
                warn!(error = %e, ext = %ext, "failed to re-encode image, keeping original bytes");
                NormalizedImage {
                    data,
                    ext,
                    converted: false,
                }
            }
        }
    }
}
