// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document classification — a static catalog of document archetypes and a
// point-based scorer over extracted text.

pub mod catalog;
pub mod classifier;

pub use catalog::{DocumentCatalog, DocumentTypeDefinition};
pub use classifier::DocumentClassifier;
