// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image normaliser — grayscale, hard binary threshold, sharpen, and bounded
// resize. Produces a standardised PNG buffer for the OCR backend using the
// `image` and `imageproc` crates.

use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use imageproc::filter::sharpen3x3;
use idverify_core::config::NormalizerConfig;
use idverify_core::error::{IdVerifyError, Result};
use tracing::{debug, info, instrument, warn};

/// Output of [`ImageNormalizer::normalize_or_original`].
///
/// The caller decides what to do with each branch; both carry bytes the OCR
/// backend can attempt to decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    /// The full pipeline ran; PNG-encoded single-channel image.
    Processed(Vec<u8>),
    /// The pipeline failed; the input is handed back untouched.
    Original(Vec<u8>),
}

impl Normalized {
    pub fn is_processed(&self) -> bool {
        matches!(self, Self::Processed(_))
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Processed(bytes) | Self::Original(bytes) => bytes,
        }
    }
}

/// Fixed-order normalisation applied to every photographed document.
///
/// Pipeline: grayscale → binary threshold → 3x3 sharpen → downscale so the
/// longer side is at most `max_dimension`. The threshold is a hard global
/// cut rather than adaptive binarisation; printed ID fonts are small and
/// respond better to maximum contrast.
#[derive(Debug, Clone)]
pub struct ImageNormalizer {
    threshold: u8,
    max_dimension: u32,
}

impl Default for ImageNormalizer {
    fn default() -> Self {
        Self::new(&NormalizerConfig::default())
    }
}

impl ImageNormalizer {
    pub fn new(config: &NormalizerConfig) -> Self {
        Self {
            threshold: config.threshold,
            max_dimension: config.max_dimension,
        }
    }

    /// Run the pipeline on encoded image bytes (JPEG, PNG, ...).
    ///
    /// # Errors
    ///
    /// Returns [`IdVerifyError::Preprocessing`] if the bytes cannot be decoded
    /// or the result cannot be re-encoded.
    #[instrument(skip(self, data), fields(data_len = data.len()))]
    pub fn normalize(&self, data: &[u8]) -> Result<Vec<u8>> {
        let pipeline = NormalizerPipeline::from_bytes(data)?
            .grayscale()
            .binarize(self.threshold)
            .sharpen()
            .fit_within(self.max_dimension);
        pipeline.to_png_bytes()
    }

    /// Run the pipeline, falling back to the untouched input on failure.
    ///
    /// A failed pre-processing step lowers OCR quality but must not abort
    /// verification; the fallback is logged and the raw bytes returned.
    pub fn normalize_or_original(&self, data: &[u8]) -> Normalized {
        match self.normalize(data) {
            Ok(bytes) => Normalized::Processed(bytes),
            Err(err) => {
                warn!(error = %err, "image normalisation degraded; using original bytes");
                Normalized::Original(data.to_vec())
            }
        }
    }
}

/// Working image for the normalisation steps.
///
/// Each step consumes `self` and returns the transformed pipeline, enabling
/// method chaining in the fixed order used by [`ImageNormalizer`].
pub struct NormalizerPipeline {
    image: DynamicImage,
}

impl NormalizerPipeline {
    // -- Construction ---------------------------------------------------------

    /// Decode raw encoded bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(data).map_err(|err| {
            IdVerifyError::Preprocessing(format!("failed to decode image: {}", err))
        })?;
        debug!(
            width = image.width(),
            height = image.height(),
            "Image decoded for normalisation"
        );
        Ok(Self { image })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Steps ----------------------------------------------------------------

    /// Collapse to a single luma channel.
    pub fn grayscale(self) -> Self {
        Self {
            image: DynamicImage::ImageLuma8(self.image.to_luma8()),
        }
    }

    /// Hard global threshold: darker than `threshold` becomes black, the rest
    /// white.
    pub fn binarize(self, threshold: u8) -> Self {
        let gray = self.image.to_luma8();
        let (width, height) = gray.dimensions();
        let mut output = GrayImage::new(width, height);

        for (x, y, pixel) in gray.enumerate_pixels() {
            let binary = if pixel.0[0] < threshold { 0u8 } else { 255u8 };
            output.put_pixel(x, y, Luma([binary]));
        }

        debug!(threshold, "Binary threshold applied");
        Self {
            image: DynamicImage::ImageLuma8(output),
        }
    }

    /// Crispen character edges with a 3x3 sharpening kernel.
    pub fn sharpen(self) -> Self {
        let gray = self.image.to_luma8();
        Self {
            image: DynamicImage::ImageLuma8(sharpen3x3(&gray)),
        }
    }

    /// Downscale so the longer side is at most `max_dimension`, preserving
    /// aspect ratio. Smaller images are left as they are.
    pub fn fit_within(self, max_dimension: u32) -> Self {
        let longer = self.image.width().max(self.image.height());
        if longer <= max_dimension {
            return self;
        }

        info!(
            from_w = self.image.width(),
            from_h = self.image.height(),
            max_dimension,
            "Downscaling image"
        );
        let resized = self.image.resize(
            max_dimension,
            max_dimension,
            image::imageops::FilterType::Lanczos3,
        );
        Self { image: resized }
    }

    // -- Output ---------------------------------------------------------------

    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        self.image.write_to(&mut cursor, ImageFormat::Png).map_err(|err| {
            IdVerifyError::Preprocessing(format!("PNG encoding failed: {}", err))
        })?;
        Ok(buffer)
    }
}
