// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service wiring for the CLI: loads the configuration once and builds the
// extractor, classifier, stores, and controller the subcommands need.

use std::path::Path;
use std::sync::Arc;

use idverify_core::config::VerifierConfig;
use idverify_core::error::Result;
use idverify_document::{
    DocumentCatalog, DocumentClassifier, OcrBackend, TextExtractor, UnavailableOcrBackend,
};
use idverify_identity::{
    DocumentBlobStore, SqliteRecordStore, VerificationAudit, VerificationController,
};
use tracing::{info, warn};

/// Everything a subcommand may need, built from one configuration.
pub struct Services {
    config: VerifierConfig,
    extractor: Arc<TextExtractor>,
    classifier: DocumentClassifier,
}

impl Services {
    /// Load `config_path` (or defaults) and prepare the OCR backend.
    pub fn init(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => {
                info!(path = %path.display(), "loading configuration");
                VerifierConfig::from_json_file(path)?
            }
            None => VerifierConfig::default(),
        };

        let backend = ocr_backend(&config);
        info!(backend = backend.name(), "OCR backend selected");
        let extractor = Arc::new(TextExtractor::new(
            backend,
            &config.normalizer,
            &config.extraction,
        ));
        let classifier = DocumentClassifier::new(Arc::new(DocumentCatalog::builtin()?));

        Ok(Self {
            config,
            extractor,
            classifier,
        })
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    pub fn extractor(&self) -> &Arc<TextExtractor> {
        &self.extractor
    }

    pub fn classifier(&self) -> &DocumentClassifier {
        &self.classifier
    }

    /// A controller over the record database at `db`, optionally auditing
    /// to `audit`.
    pub fn controller(
        &self,
        db: &Path,
        blobs: Arc<dyn DocumentBlobStore>,
        audit: Option<&Path>,
    ) -> Result<VerificationController> {
        let records = Arc::new(SqliteRecordStore::open(db)?);
        let controller = VerificationController::new(
            &self.config,
            Arc::clone(&self.extractor),
            records,
            blobs,
        );
        Ok(match audit {
            Some(path) => controller.with_audit(Arc::new(VerificationAudit::open(path)?)),
            None => controller,
        })
    }
}

#[cfg(feature = "ocr")]
fn ocr_backend(config: &VerifierConfig) -> Arc<dyn OcrBackend> {
    use idverify_document::{OcrConfig, OcrsBackend};

    let ocr_config = match &config.extraction.model_dir {
        Some(dir) => OcrConfig::from_dir(dir),
        None => OcrConfig::default(),
    };
    match OcrsBackend::new(ocr_config) {
        Ok(backend) => Arc::new(backend),
        Err(err) => {
            warn!(error = %err, "OCR engine unavailable; only PDFs with a text layer can be read");
            Arc::new(UnavailableOcrBackend)
        }
    }
}

#[cfg(not(feature = "ocr"))]
fn ocr_backend(config: &VerifierConfig) -> Arc<dyn OcrBackend> {
    if config.extraction.model_dir.is_some() {
        warn!("extraction.model_dir is set but this build has no OCR engine (enable the `ocr` feature)");
    }
    Arc::new(UnavailableOcrBackend)
}
