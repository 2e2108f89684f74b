use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

use crate::category::CategorizationFeedback;
use crate::expense::{Expense, ExpenseId, PropertyId};
use crate::period::DateRange;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(String),
    #[error("Malformed record {id}: {reason}")]
    Malformed { id: String, reason: String },
    #[error("Store unavailable")]
    Unavailable,
}

/// Selection criteria for [`ExpenseStore::get_expenses`]. Unset fields match
/// everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseFilter {
    pub property_id: Option<PropertyId>,
    pub date_range: Option<DateRange>,
    pub category_id: Option<String>,
    /// Skip expenses whose category was auto-suggested and never confirmed.
    pub manual_only: bool,
}

impl ExpenseFilter {
    pub fn for_property(property_id: &PropertyId) -> Self {
        ExpenseFilter { property_id: Some(property_id.clone()), ..Default::default() }
    }

    pub fn within(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    pub fn in_category(mut self, category_id: &str) -> Self {
        self.category_id = Some(category_id.to_string());
        self
    }

    pub fn manual_only(mut self) -> Self {
        self.manual_only = true;
        self
    }

    pub fn matches(&self, expense: &Expense) -> bool {
        if let Some(property_id) = &self.property_id {
            if &expense.property_id != property_id {
                return false;
            }
        }
        if let Some(range) = self.date_range {
            if !range.contains(expense.expense_date) {
                return false;
            }
        }
        if let Some(category_id) = &self.category_id {
            if expense.category_id() != category_id {
                return false;
            }
        }
        !(self.manual_only && expense.category.is_auto_suggested)
    }
}

/// Read access to the historical expense corpus.
pub trait ExpenseStore: Send + Sync {
    fn get_expenses(
        &self,
        filter: &ExpenseFilter,
    ) -> impl Future<Output = Result<Vec<Expense>, StoreError>> + Send;

    fn get_expense(
        &self,
        id: &ExpenseId,
    ) -> impl Future<Output = Result<Option<Expense>, StoreError>> + Send;
}

/// Destination for categorization accept/reject signals.
pub trait FeedbackSink: Send + Sync {
    fn record_feedback(
        &self,
        feedback: &CategorizationFeedback,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

impl<T: ExpenseStore> ExpenseStore for &T {
    fn get_expenses(
        &self,
        filter: &ExpenseFilter,
    ) -> impl Future<Output = Result<Vec<Expense>, StoreError>> + Send {
        (**self).get_expenses(filter)
    }

    fn get_expense(
        &self,
        id: &ExpenseId,
    ) -> impl Future<Output = Result<Option<Expense>, StoreError>> + Send {
        (**self).get_expense(id)
    }
}

impl<T: ExpenseStore> ExpenseStore for Arc<T> {
    fn get_expenses(
        &self,
        filter: &ExpenseFilter,
    ) -> impl Future<Output = Result<Vec<Expense>, StoreError>> + Send {
        (**self).get_expenses(filter)
    }

    fn get_expense(
        &self,
        id: &ExpenseId,
    ) -> impl Future<Output = Result<Option<Expense>, StoreError>> + Send {
        (**self).get_expense(id)
    }
}

impl<T: FeedbackSink> FeedbackSink for &T {
    fn record_feedback(
        &self,
        feedback: &CategorizationFeedback,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).record_feedback(feedback)
    }
}

impl<T: FeedbackSink> FeedbackSink for Arc<T> {
    fn record_feedback(
        &self,
        feedback: &CategorizationFeedback,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).record_feedback(feedback)
    }
}

// ── In-memory store ──────────────────────────────────────────────────────────

/// Vector-backed store for tests and embedding without a database.
/// `set_failing(true)` makes every call return [`StoreError::Unavailable`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    expenses: Vec<Expense>,
    feedback: RwLock<Vec<CategorizationFeedback>>,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new(expenses: Vec<Expense>) -> Self {
        MemoryStore { expenses, ..Default::default() }
    }

    pub fn feedback(&self) -> Vec<CategorizationFeedback> {
        self.feedback
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable)
        } else {
            Ok(())
        }
    }
}

impl ExpenseStore for MemoryStore {
    async fn get_expenses(&self, filter: &ExpenseFilter) -> Result<Vec<Expense>, StoreError> {
        self.check()?;
        Ok(self.expenses.iter().filter(|e| filter.matches(e)).cloned().collect())
    }

    async fn get_expense(&self, id: &ExpenseId) -> Result<Option<Expense>, StoreError> {
        self.check()?;
        Ok(self.expenses.iter().find(|e| &e.id == id).cloned())
    }
}

impl FeedbackSink for MemoryStore {
    async fn record_feedback(&self, feedback: &CategorizationFeedback) -> Result<(), StoreError> {
        self.check()?;
        self.feedback
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(feedback.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expense::CategorySelection;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> Vec<Expense> {
        vec![
            Expense::new("e1", "p1", 1000, "Plumber", date(2024, 1, 5), CategorySelection::manual("maintenance", Some("plumbing"))),
            Expense::new("e2", "p1", 2000, "Water bill", date(2024, 2, 5), CategorySelection::suggested("utilities", Some("water"), 0.6)),
            Expense::new("e3", "p2", 3000, "Insurance", date(2024, 2, 9), CategorySelection::manual("insurance", None)),
        ]
    }

    #[tokio::test]
    async fn filter_by_property_and_manual_only() {
        let store = MemoryStore::new(sample());
        let filter = ExpenseFilter::for_property(&PropertyId::from("p1")).manual_only();
        let found = store.get_expenses(&filter).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, ExpenseId::from("e1"));
    }

    #[tokio::test]
    async fn filter_by_date_range_and_category() {
        let store = MemoryStore::new(sample());
        let filter = ExpenseFilter::default()
            .within(DateRange::new(date(2024, 2, 1), date(2024, 2, 28)))
            .in_category("insurance");
        let found = store.get_expenses(&filter).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, ExpenseId::from("e3"));
    }

    #[tokio::test]
    async fn get_expense_by_id() {
        let store = MemoryStore::new(sample());
        assert!(store.get_expense(&ExpenseId::from("e2")).await.unwrap().is_some());
        assert!(store.get_expense(&ExpenseId::from("nope")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failing_store_errors() {
        let store = MemoryStore::new(sample());
        store.set_failing(true);
        assert!(matches!(
            store.get_expenses(&ExpenseFilter::default()).await,
            Err(StoreError::Unavailable)
        ));
    }

    #[tokio::test]
    async fn reference_and_arc_delegate() {
        let store = Arc::new(MemoryStore::new(sample()));
        let all = store.get_expenses(&ExpenseFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        let by_ref = &*store;
        assert_eq!(by_ref.get_expenses(&ExpenseFilter::default()).await.unwrap().len(), 3);
    }
}
