// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text extraction — dispatches a document to the PDF text layer or to the
// normaliser + OCR backend, and collapses whitespace in the result.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use idverify_core::config::{ExtractionConfig, NormalizerConfig};
use idverify_core::error::{IdVerifyError, Result};
use idverify_core::types::ExtractionResult;
use tracing::{debug, info, instrument, warn};

use crate::image::normalizer::ImageNormalizer;
use crate::pdf::reader::PdfReader;
use crate::scan::backend::{OcrBackend, OcrParams};

/// A submitted document, tagged by how its text must be obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    /// A photo or scan; goes through the normaliser and OCR.
    Image { name: String, bytes: Vec<u8> },
    /// A PDF; its text layer is read directly.
    Pdf { name: String, bytes: Vec<u8> },
}

impl DocumentSource {
    /// Classify by file extension, falling back to the `%PDF-` header for
    /// names without a recognised extension.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let extension = Path::new(&name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        let is_pdf = match extension.as_deref() {
            Some("pdf") => true,
            Some("jpg" | "jpeg" | "png" | "tif" | "tiff" | "bmp" | "webp" | "gif") => false,
            _ => bytes.starts_with(b"%PDF-"),
        };

        if is_pdf {
            Self::Pdf { name, bytes }
        } else {
            Self::Image { name, bytes }
        }
    }

    /// Read a document from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::from_bytes(name, bytes))
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Image { name, .. } | Self::Pdf { name, .. } => name,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            Self::Image { bytes, .. } | Self::Pdf { bytes, .. } => bytes,
        }
    }

    pub fn is_pdf(&self) -> bool {
        matches!(self, Self::Pdf { .. })
    }
}

/// Collapse every whitespace run to a single space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Produces text plus a confidence score from any [`DocumentSource`].
///
/// Image pre-processing failures are absorbed (the raw bytes go to OCR);
/// decoder, engine, and PDF failures are returned as errors.
pub struct TextExtractor {
    normalizer: ImageNormalizer,
    backend: Arc<dyn OcrBackend>,
    pdf_confidence: f32,
    timeout: Duration,
}

impl TextExtractor {
    pub fn new(
        backend: Arc<dyn OcrBackend>,
        normalizer: &NormalizerConfig,
        extraction: &ExtractionConfig,
    ) -> Self {
        Self {
            normalizer: ImageNormalizer::new(normalizer),
            backend,
            pdf_confidence: extraction.pdf_confidence,
            timeout: extraction.timeout(),
        }
    }

    /// Extractor with default normaliser and extraction settings.
    pub fn with_backend(backend: Arc<dyn OcrBackend>) -> Self {
        Self::new(backend, &NormalizerConfig::default(), &ExtractionConfig::default())
    }

    /// Override the extraction timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Extract on the current thread.
    #[instrument(skip(self, source), fields(name = source.name(), pdf = source.is_pdf()))]
    pub fn extract_blocking(
        &self,
        source: &DocumentSource,
        language_hint: &str,
    ) -> Result<ExtractionResult> {
        match source {
            DocumentSource::Pdf { bytes, .. } => self.extract_pdf(bytes),
            DocumentSource::Image { name, bytes } => {
                if image::guess_format(bytes).is_err() {
                    return Err(IdVerifyError::UnsupportedDocument(name.clone()));
                }
                self.extract_image(bytes, language_hint)
            }
        }
    }

    /// Extract on a blocking worker, bounded by the configured timeout.
    ///
    /// # Errors
    ///
    /// [`IdVerifyError::ExtractionTimeout`] when the timer fires first; the
    /// worker is abandoned and its result discarded.
    pub async fn extract(
        self: &Arc<Self>,
        source: DocumentSource,
        language_hint: &str,
    ) -> Result<ExtractionResult> {
        let extractor = Arc::clone(self);
        let hint = language_hint.to_owned();
        let timeout = self.timeout;
        let task = tokio::task::spawn_blocking(move || extractor.extract_blocking(&source, &hint));

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(IdVerifyError::Extraction(format!(
                "extraction worker failed: {}",
                join_err
            ))),
            Err(_) => {
                warn!(?timeout, "text extraction timed out");
                Err(IdVerifyError::ExtractionTimeout(timeout))
            }
        }
    }

    fn extract_pdf(&self, bytes: &[u8]) -> Result<ExtractionResult> {
        let reader = PdfReader::from_bytes(bytes)?;
        let text = collapse_whitespace(&reader.extract_text()?);
        info!(chars = text.chars().count(), "PDF text extracted");
        Ok(ExtractionResult {
            text,
            confidence: self.pdf_confidence,
            is_digital_source: true,
            words: None,
        })
    }

    fn extract_image(&self, bytes: &[u8], language_hint: &str) -> Result<ExtractionResult> {
        let normalized = self.normalizer.normalize_or_original(bytes);
        debug!(processed = normalized.is_processed(), "image normalised");

        let image = image::load_from_memory(&normalized.into_bytes())
            .map_err(|err| IdVerifyError::Image(format!("failed to decode image: {}", err)))?;

        let params = OcrParams::thai_latin(language_hint);
        let output = self.backend.recognize(&image, &params)?;
        let text = collapse_whitespace(&output.text);
        let confidence = output.confidence.unwrap_or(0.0).clamp(0.0, 100.0);

        info!(
            backend = self.backend.name(),
            chars = text.chars().count(),
            confidence,
            "OCR text extracted"
        );
        Ok(ExtractionResult {
            text,
            confidence,
            is_digital_source: false,
            words: output.words,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::pdf::reader::sample_pdf;
    use crate::scan::backend::{OcrOutput, UnavailableOcrBackend};
    use ::image::{DynamicImage, GrayImage, Luma};
    use std::sync::Mutex;

    /// Backend returning fixed text, recording the image sizes it saw.
    pub(crate) struct ScriptedBackend {
        pub text: String,
        pub seen: Mutex<Vec<(u32, u32)>>,
    }

    impl ScriptedBackend {
        pub fn new(text: &str) -> Self {
            Self {
                text: text.to_owned(),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl OcrBackend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        fn recognize(&self, image: &DynamicImage, params: &OcrParams) -> Result<OcrOutput> {
            assert!(params.allowed_chars.is_some());
            self.seen.lock().unwrap().push((image.width(), image.height()));
            Ok(OcrOutput {
                text: self.text.clone(),
                confidence: Some(87.5),
                words: None,
            })
        }
    }

    struct SlowBackend;

    impl OcrBackend for SlowBackend {
        fn name(&self) -> &str {
            "slow"
        }

        fn recognize(&self, _image: &DynamicImage, _params: &OcrParams) -> Result<OcrOutput> {
            std::thread::sleep(Duration::from_millis(500));
            Ok(OcrOutput::default())
        }
    }

    pub(crate) fn white_png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(width, height, Luma([255])));
        let mut buffer = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut buffer), ::image::ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn dispatch_by_extension_and_magic() {
        assert!(DocumentSource::from_bytes("id.PDF", vec![]).is_pdf());
        assert!(!DocumentSource::from_bytes("id.jpg", b"%PDF-1.4".to_vec()).is_pdf());
        assert!(DocumentSource::from_bytes("upload", b"%PDF-1.4".to_vec()).is_pdf());
        assert!(!DocumentSource::from_bytes("upload", vec![0xFF, 0xD8]).is_pdf());
    }

    #[test]
    fn whitespace_is_collapsed() {
        assert_eq!(collapse_whitespace("  a \n\t b   c  "), "a b c");
        assert_eq!(collapse_whitespace("\n\n"), "");
    }

    #[test]
    fn pdf_text_gets_fixed_confidence() {
        let extractor = TextExtractor::with_backend(Arc::new(UnavailableOcrBackend));
        let source = DocumentSource::from_bytes("statement.pdf", sample_pdf("Account   Balance"));
        let result = extractor.extract_blocking(&source, "tha+eng").unwrap();
        assert!(result.is_digital_source);
        assert_eq!(result.confidence, 95.0);
        assert!(result.text.contains("Account Balance"), "got {:?}", result.text);
    }

    #[test]
    fn image_goes_through_normaliser_then_backend() {
        let backend = Arc::new(ScriptedBackend::new("เลขประจำตัวประชาชน\n 1-1037-02071-81-1 "));
        let extractor = TextExtractor::with_backend(backend.clone());
        let source = DocumentSource::from_bytes("card.png", white_png(1600, 1000));

        let result = extractor.extract_blocking(&source, "tha+eng").unwrap();
        assert_eq!(result.text, "เลขประจำตัวประชาชน 1-1037-02071-81-1");
        assert_eq!(result.confidence, 87.5);
        assert!(!result.is_digital_source);
        assert_eq!(backend.seen.lock().unwrap().as_slice(), &[(1000, 625)]);
    }

    #[test]
    fn undecodable_image_is_an_extraction_error() {
        let extractor = TextExtractor::with_backend(Arc::new(ScriptedBackend::new("x")));
        let source = DocumentSource::from_bytes("card.png", b"\x89PNG\r\n\x1a\ntruncated".to_vec());
        let err = extractor.extract_blocking(&source, "tha").unwrap_err();
        assert!(matches!(err, IdVerifyError::Image(_)));
        assert!(err.is_extraction_failure());
    }

    #[test]
    fn unrecognised_format_is_unsupported() {
        let backend = Arc::new(ScriptedBackend::new("x"));
        let extractor = TextExtractor::with_backend(backend.clone());
        let source = DocumentSource::from_bytes("notes.txt", b"plain words".to_vec());
        let err = extractor.extract_blocking(&source, "tha").unwrap_err();
        assert!(matches!(&err, IdVerifyError::UnsupportedDocument(name) if name == "notes.txt"));
        assert!(err.is_extraction_failure());
        assert!(backend.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn engine_failure_propagates() {
        let extractor = TextExtractor::with_backend(Arc::new(UnavailableOcrBackend));
        let source = DocumentSource::from_bytes("card.png", white_png(10, 10));
        let err = extractor.extract_blocking(&source, "tha").unwrap_err();
        assert!(matches!(err, IdVerifyError::Ocr(_)));
    }

    #[tokio::test]
    async fn async_extract_runs_on_worker() {
        let extractor = Arc::new(TextExtractor::with_backend(Arc::new(ScriptedBackend::new("hello"))));
        let source = DocumentSource::from_bytes("card.png", white_png(20, 20));
        let result = extractor.extract(source, "eng").await.unwrap();
        assert_eq!(result.text, "hello");
    }

    #[tokio::test]
    async fn slow_backend_times_out() {
        let extractor = Arc::new(
            TextExtractor::with_backend(Arc::new(SlowBackend)).with_timeout(Duration::from_millis(20)),
        );
        let source = DocumentSource::from_bytes("card.png", white_png(20, 20));
        let err = extractor.extract(source, "eng").await.unwrap_err();
        assert!(matches!(err, IdVerifyError::ExtractionTimeout(d) if d == Duration::from_millis(20)));
    }
}
