// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — text-layer extraction from digitally produced PDFs.

pub mod reader;

pub use reader::PdfReader;
