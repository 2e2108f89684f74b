pub mod category;
pub mod config;
pub mod dictionary;
pub mod expense;
pub mod money;
pub mod period;
pub mod store;

pub use category::{CategorizationFeedback, CategoryKey, CategorySuggestion, FeedbackSignal, SuggestionReason};
pub use config::{
    AllocationConfig, CategorizationConfig, ConfigError, EngineConfig, InsightsConfig, OcrConfig,
};
pub use dictionary::{DictionaryConfig, DictionaryError, KeywordMatch, PatternDictionary, RegexHint};
pub use expense::{AllocationBasis, AllocationRecord, CategorySelection, Expense, ExpenseId, PropertyId};
pub use money::{share_of_cents, Money};
pub use period::{DateRange, FiscalYear, MonthKey};
pub use store::{ExpenseFilter, ExpenseStore, FeedbackSink, MemoryStore, StoreError};
