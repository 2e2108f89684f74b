pub mod db;

pub use db::{
    create_db, create_memory_db, get_expense, get_expenses, get_feedback, insert_expense,
    insert_feedback, DbPool,
};

use hearth_core::{
    CategorizationFeedback, Expense, ExpenseFilter, ExpenseId, ExpenseStore, FeedbackSink, StoreError,
};

/// SQLite-backed expense store and feedback sink.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

impl ExpenseStore for SqliteStore {
    async fn get_expenses(&self, filter: &ExpenseFilter) -> Result<Vec<Expense>, StoreError> {
        let expenses = db::get_expenses(&self.pool, filter).await?;
        tracing::debug!(count = expenses.len(), "loaded expenses");
        Ok(expenses)
    }

    async fn get_expense(&self, id: &ExpenseId) -> Result<Option<Expense>, StoreError> {
        db::get_expense(&self.pool, id).await
    }
}

impl FeedbackSink for SqliteStore {
    async fn record_feedback(&self, feedback: &CategorizationFeedback) -> Result<(), StoreError> {
        db::insert_feedback(&self.pool, feedback).await
    }
}
