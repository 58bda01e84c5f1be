// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the idverify-document crate: the image
// normaliser on a phone-camera-sized synthetic photo, and classification of
// a typical ID card transcript.

use std::io::Cursor;
use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, GrayImage, ImageFormat, Luma};

use idverify_core::types::DocumentTypeId;
use idverify_document::{DocumentCatalog, DocumentClassifier, ImageNormalizer};

const ID_CARD_TEXT: &str = "บัตรประจำตัวประชาชน Thai National ID Card เลขประจำตัวประชาชน \
    Identification Number 1 1037 02071 81 1 ชื่อตัวและชื่อสกุล นาย สมชาย ใจดี \
    เกิดวันที่ 12 ม.ค. 2530 Date of Birth 12 Jan. 1987 วันบัตรหมดอายุ 11 ม.ค. 2570";

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Normalise a 2000x1500 grey gradient, encoded as PNG like an upload.
///
/// The gradient straddles the binarisation threshold so the sharpen and
/// resize steps see a realistic mix of black and white.
fn bench_normalize(c: &mut Criterion) {
    let (width, height) = (2000u32, 1500u32);
    let img = GrayImage::from_fn(width, height, |x, y| Luma([((x + y) % 256) as u8]));
    let mut png = Vec::new();
    DynamicImage::ImageLuma8(img)
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .unwrap();

    let normalizer = ImageNormalizer::default();
    c.bench_function("normalize (2000x1500 png)", |b| {
        b.iter(|| black_box(normalizer.normalize(black_box(&png)).unwrap()));
    });
}

/// Classify an ID card transcript against its own type and rank it against
/// the whole catalog.
fn bench_classify(c: &mut Criterion) {
    let classifier = DocumentClassifier::new(Arc::new(DocumentCatalog::builtin().unwrap()));

    c.bench_function("classify ID_CARD", |b| {
        b.iter(|| black_box(classifier.classify(black_box(ID_CARD_TEXT), DocumentTypeId::IdCard)));
    });
    c.bench_function("identify (full catalog)", |b| {
        b.iter(|| black_box(classifier.identify(black_box(ID_CARD_TEXT))));
    });
}

criterion_group!(benches, bench_normalize, bench_classify);
criterion_main!(benches);
