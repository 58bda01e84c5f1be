// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Test fixtures shared by the matcher, controller, and blob store tests.

use std::io::Cursor;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use idverify_core::error::Result;
use idverify_document::{OcrBackend, OcrOutput, OcrParams};
use image::{DynamicImage, GrayImage, ImageFormat, Luma};

/// OCR backend that "reads" whatever text it was scripted with and counts
/// how often it was invoked.
pub(crate) struct ScriptedOcr {
    text: Mutex<String>,
    calls: AtomicUsize,
}

impl ScriptedOcr {
    pub(crate) fn new(text: &str) -> Self {
        Self {
            text: Mutex::new(text.to_owned()),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn set_text(&self, text: &str) {
        *self.text.lock().unwrap() = text.to_owned();
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl OcrBackend for ScriptedOcr {
    fn name(&self) -> &str {
        "scripted"
    }

    fn recognize(&self, _image: &DynamicImage, _params: &OcrParams) -> Result<OcrOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(OcrOutput {
            text: self.text.lock().unwrap().clone(),
            confidence: Some(90.0),
            words: None,
        })
    }
}

/// OCR backend that takes longer than any test timeout.
pub(crate) struct SlowOcr;

impl OcrBackend for SlowOcr {
    fn name(&self) -> &str {
        "slow"
    }

    fn recognize(&self, _image: &DynamicImage, _params: &OcrParams) -> Result<OcrOutput> {
        std::thread::sleep(std::time::Duration::from_millis(300));
        Ok(OcrOutput {
            text: String::new(),
            confidence: None,
            words: None,
        })
    }
}

/// A black-on-white PNG of the given size.
pub(crate) fn png(width: u32, height: u32) -> Vec<u8> {
    let img = GrayImage::from_fn(width, height, |x, _| {
        if x % 7 == 0 { Luma([0]) } else { Luma([255]) }
    });
    let mut buffer = Vec::new();
    DynamicImage::ImageLuma8(img)
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .unwrap();
    buffer
}
