// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Catalog of document archetypes. Built once at startup, then shared
// read-only (usually behind an `Arc`) by every classifier.

use std::collections::BTreeMap;

use idverify_core::error::{IdVerifyError, Result};
use idverify_core::types::DocumentTypeId;
use regex::Regex;

/// What a document of one type is expected to contain.
#[derive(Debug, Clone)]
pub struct DocumentTypeDefinition {
    pub type_id: DocumentTypeId,
    pub name_th: String,
    pub name_en: String,
    /// Scored in order; each is worth 30 points.
    pub required_patterns: Vec<Regex>,
    /// Matched case-insensitively as substrings.
    pub keywords: Vec<String>,
    /// Threshold on the normalised 0–1 confidence.
    pub min_confidence: f64,
}

impl DocumentTypeDefinition {
    /// Compile a definition from pattern sources.
    ///
    /// # Errors
    ///
    /// [`IdVerifyError::Config`] if a pattern does not compile or the
    /// threshold lies outside 0–1.
    pub fn new(
        type_id: DocumentTypeId,
        name_th: &str,
        name_en: &str,
        patterns: &[&str],
        keywords: &[&str],
        min_confidence: f64,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&min_confidence) {
            return Err(IdVerifyError::Config(format!(
                "{type_id}: min_confidence {min_confidence} outside 0..=1"
            )));
        }
        let required_patterns = patterns
            .iter()
            .map(|source| {
                Regex::new(source).map_err(|err| {
                    IdVerifyError::Config(format!("{type_id}: bad pattern {source:?}: {err}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            type_id,
            name_th: name_th.to_owned(),
            name_en: name_en.to_owned(),
            required_patterns,
            keywords: keywords.iter().map(|k| (*k).to_owned()).collect(),
            min_confidence,
        })
    }
}

/// Immutable map from type id to definition.
#[derive(Debug, Clone)]
pub struct DocumentCatalog {
    definitions: BTreeMap<DocumentTypeId, DocumentTypeDefinition>,
}

impl DocumentCatalog {
    /// The catalog of Thai government and supporting documents.
    pub fn builtin() -> Result<Self> {
        Self::with_definitions(vec![
            DocumentTypeDefinition::new(
                DocumentTypeId::IdCard,
                "บัตรประจำตัวประชาชน",
                "National ID Card",
                &[r"\d[\s-]?\d{4}[\s-]?\d{5}[\s-]?\d{2}[\s-]?\d"],
                &[
                    "บัตรประจำตัวประชาชน",
                    "Thai National ID Card",
                    "เลขประจำตัวประชาชน",
                    "Identification Number",
                    "ชื่อตัวและชื่อสกุล",
                    "เกิดวันที่",
                    "Date of Birth",
                ],
                0.6,
            )?,
            DocumentTypeDefinition::new(
                DocumentTypeId::HouseRegistration,
                "ทะเบียนบ้าน",
                "House Registration",
                &[r"\d{4}[\s-]?\d{6}[\s-]?\d"],
                &["ทะเบียนบ้าน", "เลขรหัสประจำบ้าน", "ที่อยู่", "ตำบล", "อำเภอ", "จังหวัด"],
                0.5,
            )?,
            DocumentTypeDefinition::new(
                DocumentTypeId::LandTitle,
                "เอกสารสิทธิ์ที่ดิน",
                "Land Title Deed",
                &[
                    r"โฉนด|น\.ส\.\s?3|ส\.ป\.ก",
                    r"\d+\s*ไร่|\d+-\d+-\d+(?:\.\d+)?",
                ],
                &["โฉนดที่ดิน", "เลขที่ดิน", "ระวาง", "เนื้อที่", "ไร่", "งาน", "ตารางวา"],
                0.5,
            )?,
            DocumentTypeDefinition::new(
                DocumentTypeId::FarmLicense,
                "ใบอนุญาตเพาะปลูก",
                "Cultivation License",
                &[r"(?i)ใบอนุญาต|licen[cs]e"],
                &["ใบอนุญาต", "เพาะปลูก", "กัญชา", "กรมวิชาการเกษตร", "เกษตร", "cannabis", "hemp"],
                0.5,
            )?,
            DocumentTypeDefinition::new(
                DocumentTypeId::MedicalCertificate,
                "ใบรับรองแพทย์",
                "Medical Certificate",
                &[r"(?i)ใบรับรองแพทย์|medical\s+certificate"],
                &["แพทย์", "โรงพยาบาล", "ตรวจร่างกาย", "ใบอนุญาตประกอบวิชาชีพเวชกรรม", "สุขภาพ"],
                0.5,
            )?,
            DocumentTypeDefinition::new(
                DocumentTypeId::BankStatement,
                "รายการเดินบัญชี",
                "Bank Statement",
                &[r"\d{3}-?\d-?\d{5}-?\d"],
                &["ธนาคาร", "บัญชี", "ยอดคงเหลือ", "Bank", "Statement", "Balance"],
                0.5,
            )?,
            DocumentTypeDefinition::new(DocumentTypeId::Photo, "รูปถ่าย", "Photo", &[], &[], 0.0)?,
        ])
    }

    /// Build a catalog from explicit definitions. Later entries replace
    /// earlier ones with the same type id.
    pub fn with_definitions(definitions: Vec<DocumentTypeDefinition>) -> Result<Self> {
        let definitions = definitions
            .into_iter()
            .map(|definition| (definition.type_id, definition))
            .collect();
        Ok(Self { definitions })
    }

    pub fn get(&self, type_id: DocumentTypeId) -> Option<&DocumentTypeDefinition> {
        self.definitions.get(&type_id)
    }

    /// Definitions in type-id order.
    pub fn iter(&self) -> impl Iterator<Item = &DocumentTypeDefinition> {
        self.definitions.values()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
