pub mod classify;
pub mod irs;
pub mod rules;
pub mod summary;

pub use classify::{TaxClassification, TaxClassifier};
pub use irs::IrsCategory;
pub use rules::{TaxRule, TaxRuleTable};
pub use summary::{summarize, summarize_year, TaxYearSummary};

use hearth_core::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaxError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Invalid tax rule table: {0}")]
    RuleConfig(String),
}
