use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::expense::PropertyId;

/// A (category, subcategory) pair. Suggestions are de-duplicated on this key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CategoryKey {
    pub category_id: String,
    pub subcategory_id: Option<String>,
}

impl CategoryKey {
    pub fn new(category_id: &str, subcategory_id: Option<&str>) -> Self {
        Self {
            category_id: category_id.to_string(),
            subcategory_id: subcategory_id.map(str::to_string),
        }
    }
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subcategory_id {
            Some(sub) => write!(f, "{}/{}", self.category_id, sub),
            None => write!(f, "{}", self.category_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionReason {
    Merchant,
    Ocr,
    Pattern,
    Manual,
    Ml,
}

impl fmt::Display for SuggestionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuggestionReason::Merchant => write!(f, "merchant"),
            SuggestionReason::Ocr => write!(f, "ocr"),
            SuggestionReason::Pattern => write!(f, "pattern"),
            SuggestionReason::Manual => write!(f, "manual"),
            SuggestionReason::Ml => write!(f, "ml"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySuggestion {
    pub category_id: String,
    pub subcategory_id: Option<String>,
    /// Ranking heuristic in [0, 1]; not a calibrated probability.
    pub confidence: f32,
    pub reason: SuggestionReason,
    pub supporting_terms: Vec<String>,
}

impl CategorySuggestion {
    pub fn new(
        category_id: &str,
        subcategory_id: Option<&str>,
        confidence: f32,
        reason: SuggestionReason,
    ) -> Self {
        let confidence = if confidence.is_finite() { confidence.clamp(0.0, 1.0) } else { 0.0 };
        Self {
            category_id: category_id.to_string(),
            subcategory_id: subcategory_id.map(str::to_string),
            confidence,
            reason,
            supporting_terms: vec![],
        }
    }

    pub fn with_terms<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supporting_terms = terms.into_iter().map(Into::into).collect();
        self
    }

    pub fn key(&self) -> CategoryKey {
        CategoryKey {
            category_id: self.category_id.clone(),
            subcategory_id: self.subcategory_id.clone(),
        }
    }

    pub fn matches(&self, key: &CategoryKey) -> bool {
        self.category_id == key.category_id && self.subcategory_id == key.subcategory_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackSignal {
    /// The top suggestion was what the user picked.
    Accepted,
    Rejected,
    /// There was nothing to accept or reject.
    NoSuggestion,
}

impl fmt::Display for FeedbackSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedbackSignal::Accepted => write!(f, "accepted"),
            FeedbackSignal::Rejected => write!(f, "rejected"),
            FeedbackSignal::NoSuggestion => write!(f, "no_suggestion"),
        }
    }
}

/// One accept/reject observation, kept for future learning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorizationFeedback {
    pub property_id: PropertyId,
    pub text: String,
    pub top_suggestion: Option<CategoryKey>,
    pub top_confidence: Option<f32>,
    pub chosen: CategoryKey,
    pub signal: FeedbackSignal,
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggestion_clamps_confidence() {
        let s = CategorySuggestion::new("utilities", None, 1.7, SuggestionReason::Merchant);
        assert_eq!(s.confidence, 1.0);
        let s = CategorySuggestion::new("utilities", None, f32::NAN, SuggestionReason::Merchant);
        assert_eq!(s.confidence, 0.0);
    }

    #[test]
    fn suggestion_key_matches() {
        let s = CategorySuggestion::new("utilities", Some("water"), 0.5, SuggestionReason::Pattern)
            .with_terms(["water"]);
        assert!(s.matches(&CategoryKey::new("utilities", Some("water"))));
        assert!(!s.matches(&CategoryKey::new("utilities", None)));
        assert_eq!(s.supporting_terms, vec!["water".to_string()]);
    }

    #[test]
    fn category_key_display() {
        assert_eq!(CategoryKey::new("utilities", Some("water")).to_string(), "utilities/water");
        assert_eq!(CategoryKey::new("insurance", None).to_string(), "insurance");
    }

    #[test]
    fn reason_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&SuggestionReason::Ocr).unwrap(), "\"ocr\"");
        assert_eq!(SuggestionReason::Merchant.to_string(), "merchant");
    }
}
