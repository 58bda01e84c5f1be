// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Field extractor — type-specific regex parsers over extracted text.
//
// Every parser is independent and total: a pattern that does not match
// leaves its field out of the map, it never produces an error.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use idverify_core::types::DocumentTypeId;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static ID_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d-\d{4}-\d{5}-\d{2}-\d").expect("ID number regex pattern is valid and should compile")
});
static LAND_AREA_FULL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([0-9]+)\s*ไร่(?:\s*([0-9]+)\s*งาน)?(?:\s*([0-9]+(?:\.[0-9]+)?)\s*ตารางวา)?")
        .expect("Land area regex pattern is valid and should compile")
});
static LAND_AREA_COMPACT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^0-9.-])([0-9]{1,5})-([0-3])-([0-9]{1,2}(?:\.[0-9]+)?)(?:$|[^0-9-])")
        .expect("Compact land area regex pattern is valid and should compile")
});
static DATE_LIKE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{1,2}[/-]\d{1,2}[/-]\d{2,4}").expect("Date regex pattern is valid and should compile")
});
static DAY_MONTH_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})[/.-](\d{1,2})[/.-](\d{4})$")
        .expect("Day-month-year regex pattern is valid and should compile")
});
static BIRTH_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:เกิดวันที่|เกิด|date of birth|birth)[:.\s]*(\d{1,2}[/.-]\d{1,2}[/.-]\d{4})")
        .expect("Birth date regex pattern is valid and should compile")
});
static EXPIRY_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:วันบัตรหมดอายุ|หมดอายุ|วันที่สิ้นสุด|date of expiry|expires?)[:.\s]*(\d{1,2}[/.-]\d{1,2}[/.-]\d{4})",
    )
    .expect("Expiry date regex pattern is valid and should compile")
});
static LICENSE_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:ใบอนุญาตเลขที่|เลขที่ใบอนุญาต|license\s*no\.?)[:.\s]*([A-Z0-9][A-Z0-9./-]*)")
        .expect("License number regex pattern is valid and should compile")
});

const ISSUING_AUTHORITIES: [&str; 4] = ["กรมวิชาการเกษตร", "กระทรวงเกษตร", "เกษตรจังหวัด", "DOA"];

/// Buddhist-era years are at least this large; Gregorian years never are.
const BUDDHIST_ERA_THRESHOLD: i32 = 2500;
const BUDDHIST_ERA_OFFSET: i32 = 543;

/// Area on a Thai land title: 1 rai = 4 ngan = 400 square wa.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LandArea {
    pub rai: u32,
    pub ngan: u32,
    pub sq_wa: f64,
}

impl LandArea {
    pub fn total_sq_wa(&self) -> f64 {
        f64::from(self.rai) * 400.0 + f64::from(self.ngan) * 100.0 + self.sq_wa
    }
}

/// A single extracted field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Bool(bool),
    List(Vec<String>),
    Area(LandArea),
}

/// Run the parsers for `document_type` over `text`.
///
/// | type | fields |
/// |---|---|
/// | ID card | `id_number`, `id_checksum_valid`, `birth_date`, `expiry_date` |
/// | land title | `land_area` |
/// | farm license | `license_number`, `issuing_authority`, `dates`, `dates_iso` |
/// | anything else | `dates`, `dates_iso` |
pub fn extract_fields(text: &str, document_type: DocumentTypeId) -> BTreeMap<String, FieldValue> {
    let mut fields = BTreeMap::new();

    match document_type {
        DocumentTypeId::IdCard => {
            if let Some(found) = ID_NUMBER.find(text) {
                let digits: String = found.as_str().chars().filter(char::is_ascii_digit).collect();
                fields.insert(
                    "id_checksum_valid".to_owned(),
                    FieldValue::Bool(thai_id_checksum_valid(&digits)),
                );
                fields.insert("id_number".to_owned(), FieldValue::Text(found.as_str().to_owned()));
            }
            insert_labelled_date(&mut fields, "birth_date", &BIRTH_DATE, text);
            insert_labelled_date(&mut fields, "expiry_date", &EXPIRY_DATE, text);
        }
        DocumentTypeId::LandTitle => {
            if let Some(area) = parse_land_area(text) {
                fields.insert("land_area".to_owned(), FieldValue::Area(area));
            }
        }
        other => {
            if other == DocumentTypeId::FarmLicense {
                if let Some(caps) = LICENSE_NUMBER.captures(text) {
                    fields.insert(
                        "license_number".to_owned(),
                        FieldValue::Text(caps[1].to_owned()),
                    );
                }
                let lowered = text.to_lowercase();
                if let Some(authority) = ISSUING_AUTHORITIES
                    .iter()
                    .find(|a| lowered.contains(&a.to_lowercase()))
                {
                    fields.insert(
                        "issuing_authority".to_owned(),
                        FieldValue::Text((*authority).to_owned()),
                    );
                }
            }
            insert_dates(&mut fields, text);
        }
    }

    fields
}

fn insert_dates(fields: &mut BTreeMap<String, FieldValue>, text: &str) {
    let dates: Vec<String> = DATE_LIKE
        .find_iter(text)
        .map(|m| m.as_str().to_owned())
        .collect();
    if dates.is_empty() {
        return;
    }
    let iso: Vec<String> = dates
        .iter()
        .filter_map(|d| parse_thai_date(d))
        .map(|d| d.format("%Y-%m-%d").to_string())
        .collect();
    if !iso.is_empty() {
        fields.insert("dates_iso".to_owned(), FieldValue::List(iso));
    }
    fields.insert("dates".to_owned(), FieldValue::List(dates));
}

fn insert_labelled_date(
    fields: &mut BTreeMap<String, FieldValue>,
    name: &str,
    label: &Regex,
    text: &str,
) {
    if let Some(date) = label
        .captures(text)
        .and_then(|caps| parse_thai_date(&caps[1]))
    {
        fields.insert(name.to_owned(), FieldValue::Text(date.format("%Y-%m-%d").to_string()));
    }
}

/// Parse a land area in full-word form (`5 ไร่ 2 งาน 30 ตารางวา`, later
/// units optional) or compact dashed form (`5-2-30.5`). The full form wins
/// when both are present. Missing units are zero. Only ASCII digits count.
///
/// The compact form needs ngan in 0..=3 and square wa below 100, so dashed
/// dates and ID numbers are not taken for an area.
pub fn parse_land_area(text: &str) -> Option<LandArea> {
    parse_full_land_area(text).or_else(|| parse_compact_land_area(text))
}

fn parse_full_land_area(text: &str) -> Option<LandArea> {
    let caps = LAND_AREA_FULL.captures(text)?;
    Some(LandArea {
        rai: caps[1].parse().ok()?,
        ngan: match caps.get(2) {
            Some(m) => m.as_str().parse().ok()?,
            None => 0,
        },
        sq_wa: match caps.get(3) {
            Some(m) => m.as_str().parse().ok()?,
            None => 0.0,
        },
    })
}

fn parse_compact_land_area(text: &str) -> Option<LandArea> {
    let caps = LAND_AREA_COMPACT.captures(text)?;
    Some(LandArea {
        rai: caps[1].parse().ok()?,
        ngan: caps[2].parse().ok()?,
        sq_wa: caps[3].parse().ok()?,
    })
}

/// Validate the mod-11 check digit of a 13-digit Thai national ID number.
pub fn thai_id_checksum_valid(digits: &str) -> bool {
    let values: Vec<u32> = digits.chars().filter_map(|c| c.to_digit(10)).collect();
    if values.len() != 13 || digits.chars().count() != 13 {
        return false;
    }
    let sum: u32 = values[..12]
        .iter()
        .zip((2..=13).rev())
        .map(|(digit, weight)| digit * weight)
        .sum();
    (11 - sum % 11) % 10 == values[12]
}

/// Parse `d/m/yyyy`, `d-m-yyyy` or `d.m.yyyy`, converting Buddhist-era years
/// to Gregorian.
pub fn parse_thai_date(raw: &str) -> Option<NaiveDate> {
    let caps = DAY_MONTH_YEAR.captures(raw.trim())?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let mut year: i32 = caps[3].parse().ok()?;
    if year > BUDDHIST_ERA_THRESHOLD {
        year -= BUDDHIST_ERA_OFFSET;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}
