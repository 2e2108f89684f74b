use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Structured fields recovered from one receipt's OCR text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrAnalysisResult {
    pub raw_text: String,
    pub merchant_name: Option<String>,
    /// Always positive when present.
    pub amount_cents: Option<i64>,
    pub date: Option<NaiveDate>,
    /// Category ids suggested by merchant keywords and OCR patterns.
    pub category_hints: BTreeSet<String>,
    /// Aggregate extraction confidence (0.0–0.95).
    pub confidence: f32,
}

impl OcrAnalysisResult {
    /// Whether the extraction is good enough to pre-fill without human review.
    pub fn needs_review(&self) -> bool {
        self.confidence < 0.7
    }

    pub fn is_empty(&self) -> bool {
        self.merchant_name.is_none()
            && self.amount_cents.is_none()
            && self.date.is_none()
            && self.category_hints.is_empty()
    }
}
