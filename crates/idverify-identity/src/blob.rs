// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document blob stores — resolve an upload reference to document bytes.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

use idverify_core::error::{IdVerifyError, Result};
use idverify_core::types::DocumentRef;
use idverify_document::DocumentSource;
use tracing::{debug, instrument};

/// Turns an uploaded file reference into a [`DocumentSource`].
pub trait DocumentBlobStore: Send + Sync {
    /// # Errors
    ///
    /// [`IdVerifyError::InvalidDocumentReference`] for unknown or malformed
    /// references.
    fn load(&self, reference: &DocumentRef) -> Result<DocumentSource>;
}

/// Documents held in memory, keyed by reference.
#[derive(Default)]
pub struct MemoryBlobStore {
    documents: Mutex<HashMap<DocumentRef, DocumentSource>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `bytes` under `reference`; the reference doubles as the file
    /// name used for PDF/image dispatch.
    pub fn insert(&self, reference: &DocumentRef, bytes: Vec<u8>) -> Result<()> {
        let source = DocumentSource::from_bytes(reference.as_str(), bytes);
        self.documents
            .lock()
            .map_err(|_| IdVerifyError::Database("blob store mutex poisoned".into()))?
            .insert(reference.clone(), source);
        Ok(())
    }
}

impl DocumentBlobStore for MemoryBlobStore {
    fn load(&self, reference: &DocumentRef) -> Result<DocumentSource> {
        self.documents
            .lock()
            .map_err(|_| IdVerifyError::Database("blob store mutex poisoned".into()))?
            .get(reference)
            .cloned()
            .ok_or_else(|| IdVerifyError::InvalidDocumentReference(reference.to_string()))
    }
}

/// Documents stored as files under a root directory.
///
/// References are relative paths; absolute paths and `..` components are
/// rejected so a reference can never escape the root.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, reference: &DocumentRef) -> Result<PathBuf> {
        let relative = Path::new(reference.as_str());
        let well_formed = !reference.as_str().is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !well_formed {
            return Err(IdVerifyError::InvalidDocumentReference(reference.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl DocumentBlobStore for FsBlobStore {
    #[instrument(skip(self), fields(reference = %reference))]
    fn load(&self, reference: &DocumentRef) -> Result<DocumentSource> {
        let path = self.resolve(reference)?;
        let bytes = std::fs::read(&path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => IdVerifyError::InvalidDocumentReference(reference.to_string()),
            _ => IdVerifyError::Io(err),
        })?;
        debug!(bytes = bytes.len(), "document loaded");
        Ok(DocumentSource::from_bytes(reference.as_str(), bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_dispatches_by_reference_name() {
        let store = MemoryBlobStore::new();
        let card = DocumentRef::new("u1/card.png");
        store.insert(&card, vec![1, 2, 3]).unwrap();

        let source = store.load(&card).unwrap();
        assert!(!source.is_pdf());
        assert_eq!(source.bytes(), &[1, 2, 3]);
        assert!(matches!(
            store.load(&DocumentRef::new("u1/other.png")),
            Err(IdVerifyError::InvalidDocumentReference(_))
        ));
    }

    #[test]
    fn fs_store_reads_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("u1")).unwrap();
        std::fs::write(dir.path().join("u1/statement.pdf"), b"%PDF-1.4").unwrap();

        let store = FsBlobStore::new(dir.path());
        let source = store.load(&DocumentRef::new("u1/statement.pdf")).unwrap();
        assert!(source.is_pdf());
        assert_eq!(source.name(), "u1/statement.pdf");
    }

    #[test]
    fn fs_store_rejects_escapes() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        for bad in ["../secret.png", "/etc/passwd", "u1/../../x.png", "", "./card.png"] {
            let err = store.load(&DocumentRef::new(bad)).unwrap_err();
            assert!(
                matches!(err, IdVerifyError::InvalidDocumentReference(_)),
                "{bad:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn fs_store_missing_file_is_invalid_reference() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        let err = store.load(&DocumentRef::new("nope.jpg")).unwrap_err();
        assert!(matches!(err, IdVerifyError::InvalidDocumentReference(_)));
    }
}
