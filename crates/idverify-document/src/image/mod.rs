// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — deterministic normalisation of document photos ahead of OCR.

pub mod normalizer;

pub use normalizer::{ImageNormalizer, Normalized, NormalizerPipeline};
