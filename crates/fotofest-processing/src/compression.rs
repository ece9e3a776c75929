use anyhow::Result;
use fotofest_core::{CompressionClass, Config};
use image::{DynamicImage, GenericImageView, ImageReader};
use std::io::Cursor;

/// Quality and dimension bound for one compression class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionProfile {
    /// JPEG quality (1-100)
    pub quality: u8,
    /// Longest-edge bound in pixels; images under it are never upscaled
    pub max_dimension: u32,
}

/// The class -> profile table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionProfiles {
    pub premium: CompressionProfile,
    pub standard: CompressionProfile,
    pub thumbnail: CompressionProfile,
}

impl Default for CompressionProfiles {
    fn default() -> Self {
        CompressionProfiles {
            premium: CompressionProfile {
                quality: 92,
                max_dimension: 4096,
            },
            standard: CompressionProfile {
                quality: 80,
                max_dimension: 2048,
            },
            thumbnail: CompressionProfile {
                quality: 60,
                max_dimension: 400,
            },
        }
    }
}

impl CompressionProfiles {
    pub fn from_config(config: &Config) -> Self {
        let profile = |class| CompressionProfile {
            quality: config.compression_quality(class),
            max_dimension: config.compression_max_dimension(class),
        };
        CompressionProfiles {
            premium: profile(CompressionClass::Premium),
            standard: profile(CompressionClass::Standard),
            thumbnail: profile(CompressionClass::Thumbnail),
        }
    }

    pub fn for_class(&self, class: CompressionClass) -> CompressionProfile {
        match class {
            CompressionClass::Premium => self.premium,
            CompressionClass::Standard => self.standard,
            CompressionClass::Thumbnail => self.thumbnail,
        }
    }
}

/// Result of a compression attempt.
///
/// `passthrough` is set when the input could not be decoded or re-encoded
/// and was returned unchanged; the upload proceeds with the original bytes
/// rather than failing.
#[derive(Debug, Clone)]
pub struct CompressionOutcome {
    pub data: Vec<u8>,
    pub passthrough: bool,
}

/// Re-encodes image buffers to a class profile.
#[derive(Debug, Clone, Copy)]
pub struct CompressionEngine {
    profiles: CompressionProfiles,
}

impl CompressionEngine {
    pub fn new(profiles: CompressionProfiles) -> Self {
        CompressionEngine { profiles }
    }

    /// Content type of every successfully compressed output.
    pub fn output_content_type() -> &'static str {
        "image/jpeg"
    }

    pub fn profiles(&self) -> CompressionProfiles {
        self.profiles
    }

    /// Re-encode `data` for the given class: decode, bound the longest edge
    /// to the profile's max dimension (aspect preserved, no upscaling), and
    /// encode as JPEG at the profile quality.
    ///
    /// Decode or encode failure degrades to a passthrough of the input,
    /// trading optimization for availability.
    pub fn compress(&self, data: &[u8], class: CompressionClass) -> CompressionOutcome {
        let profile = self.profiles.for_class(class);

        let img = match Self::decode(data) {
            Ok(img) => img,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    class = %class,
                    size_bytes = data.len(),
                    "Image decode failed, storing original bytes"
                );
                return CompressionOutcome {
                    data: data.to_vec(),
                    passthrough: true,
                };
            }
        };

        let bounded = Self::shrink_to_fit(img, profile.max_dimension);

        match Self::encode_jpeg(&bounded, profile.quality) {
            Ok(encoded) => {
                tracing::debug!(
                    class = %class,
                    input_bytes = data.len(),
                    output_bytes = encoded.len(),
                    "Image re-encoded"
                );
                CompressionOutcome {
                    data: encoded,
                    passthrough: false,
                }
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    class = %class,
                    "JPEG encode failed, storing original bytes"
                );
                CompressionOutcome {
                    data: data.to_vec(),
                    passthrough: true,
                }
            }
        }
    }

    fn decode(data: &[u8]) -> Result<DynamicImage> {
        let reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;
        Ok(reader.decode()?)
    }

    /// Downscale so the longest edge fits `max_dimension`. Images already
    /// within the bound are returned unchanged.
    fn shrink_to_fit(img: DynamicImage, max_dimension: u32) -> DynamicImage {
        let (width, height) = img.dimensions();
        if width.max(height) <= max_dimension {
            return img;
        }
        let filter = Self::select_filter(width.max(height), max_dimension);
        // `resize` fits within the bounds and preserves aspect ratio.
        img.resize(max_dimension, max_dimension, filter)
    }

    /// Pick a filter by downscale ratio: cheaper filters for aggressive
    /// reductions, Lanczos for near-1:1 resizes.
    fn select_filter(orig_edge: u32, new_edge: u32) -> image::imageops::FilterType {
        let ratio = orig_edge as f32 / new_edge as f32;
        if ratio > 2.0 {
            image::imageops::FilterType::Triangle
        } else if ratio > 1.5 {
            image::imageops::FilterType::CatmullRom
        } else {
            image::imageops::FilterType::Lanczos3
        }
    }

    /// Encode to JPEG using mozjpeg
    fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
        let rgb_img = img.to_rgb8();
        let (width, height) = rgb_img.dimensions();

        let mut comp = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
        comp.set_size(width as usize, height as usize);
        comp.set_quality(quality as f32);
        comp.set_progressive_mode();
        comp.set_optimize_coding(true);

        let mut comp = comp.start_compress(Vec::new())?;
        comp.write_scanlines(&rgb_img)?;
        let jpeg_data = comp.finish()?;

        Ok(jpeg_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 30, 30, 255]));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    fn dimensions_of(data: &[u8]) -> (u32, u32) {
        ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .unwrap()
            .decode()
            .unwrap()
            .dimensions()
    }

    #[test]
    fn test_thumbnail_bounds_longest_edge() {
        let engine = CompressionEngine::new(CompressionProfiles::default());
        let outcome = engine.compress(&png_bytes(1000, 500), CompressionClass::Thumbnail);

        assert!(!outcome.passthrough);
        assert_eq!(dimensions_of(&outcome.data), (400, 200));
    }

    #[test]
    fn test_never_upscales() {
        let engine = CompressionEngine::new(CompressionProfiles::default());
        let outcome = engine.compress(&png_bytes(120, 80), CompressionClass::Premium);

        assert!(!outcome.passthrough);
        assert_eq!(dimensions_of(&outcome.data), (120, 80));
    }

    #[test]
    fn test_output_is_jpeg() {
        let engine = CompressionEngine::new(CompressionProfiles::default());
        let outcome = engine.compress(&png_bytes(64, 64), CompressionClass::Standard);

        let format = ImageReader::new(Cursor::new(&outcome.data))
            .with_guessed_format()
            .unwrap()
            .format();
        assert_eq!(format, Some(ImageFormat::Jpeg));
    }

    #[test]
    fn test_undecodable_input_passes_through() {
        let engine = CompressionEngine::new(CompressionProfiles::default());
        let garbage = b"definitely not an image".to_vec();
        let outcome = engine.compress(&garbage, CompressionClass::Standard);

        assert!(outcome.passthrough);
        assert_eq!(outcome.data, garbage);
    }

    #[test]
    fn test_profile_lookup() {
        let profiles = CompressionProfiles::default();
        assert_eq!(profiles.for_class(CompressionClass::Premium).quality, 92);
        assert_eq!(
            profiles.for_class(CompressionClass::Thumbnail).max_dimension,
            400
        );
    }

    #[test]
    fn test_filter_selection_by_ratio() {
        assert_eq!(
            CompressionEngine::select_filter(4000, 400),
            image::imageops::FilterType::Triangle
        );
        assert_eq!(
            CompressionEngine::select_filter(3000, 2000),
            image::imageops::FilterType::CatmullRom
        );
        assert_eq!(
            CompressionEngine::select_filter(2100, 2000),
            image::imageops::FilterType::Lanczos3
        );
    }
}
