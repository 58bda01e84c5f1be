// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Character allow-list for OCR on Thai government documents.

/// Characters the OCR engine may emit for mixed Thai+Latin identity
/// documents: digits, ASCII letters, Thai consonants, vowels and tone marks,
/// plus `.` `-` `:` `/` and space. Unconstrained vocabularies misread far
/// more often on noisy form scans.
pub const THAI_LATIN_ALLOWED_CHARS: &str = concat!(
    "0123456789",
    "ABCDEFGHIJKLMNOPQRSTUVWXYZ",
    "abcdefghijklmnopqrstuvwxyz",
    // consonants
    "กขฃคฅฆงจฉชซฌญฎฏฐฑฒณดตถทธนบปผฝพฟภมยรฤลฦวศษสหฬอฮ",
    // vowels
    "ะัาำิีึืุูเแโใไๅ็",
    // tone marks and thanthakhat
    "่้๊๋์",
    ".-:/ ",
);
