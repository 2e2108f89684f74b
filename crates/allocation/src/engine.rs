use hearth_core::{AllocationBasis, AllocationConfig, Expense, ExpenseId, ExpenseStore};
use serde::Serialize;

use crate::error::AllocationError;
use crate::shared::{PropertyAllocation, SharedExpense};

#[derive(Debug, Clone)]
pub struct BulkAllocationRequest {
    pub expense_id: ExpenseId,
    pub allocations: Vec<PropertyAllocation>,
    pub method: AllocationBasis,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkAllocationFailure {
    pub expense_id: ExpenseId,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct BulkAllocationOutcome {
    pub created: Vec<SharedExpense>,
    pub failed: Vec<BulkAllocationFailure>,
}

/// Shared-expense operations that need the original expense from the store.
pub struct AllocationEngine<S: ExpenseStore> {
    store: S,
    config: AllocationConfig,
}

impl<S: ExpenseStore> AllocationEngine<S> {
    pub fn new(store: S, config: AllocationConfig) -> Self {
        Self { store, config }
    }

    async fn original(&self, id: &ExpenseId) -> Result<Expense, AllocationError> {
        self.store
            .get_expense(id)
            .await?
            .ok_or_else(|| AllocationError::NotFound(id.to_string()))
    }

    pub async fn create_shared_expense(
        &self,
        expense_id: &ExpenseId,
        allocations: Vec<PropertyAllocation>,
        method: AllocationBasis,
        created_by: &str,
    ) -> Result<SharedExpense, AllocationError> {
        let expense = self.original(expense_id).await?;
        SharedExpense::create(&expense, allocations, method, created_by, self.config.tolerance)
    }

    /// Apply `shared`, returning the per-property expenses for the caller to
    /// persist.
    pub async fn apply_allocation(
        &self,
        shared: &mut SharedExpense,
        approved_by: &str,
    ) -> Result<Vec<Expense>, AllocationError> {
        let original = self.original(&shared.original_expense_id).await?;
        shared.apply_allocation(&original, approved_by)
    }

    /// Create shared expenses one request at a time. A failing request is
    /// recorded in `failed` and the rest still run.
    pub async fn process_bulk_allocations(
        &self,
        requests: Vec<BulkAllocationRequest>,
        created_by: &str,
    ) -> BulkAllocationOutcome {
        let mut outcome = BulkAllocationOutcome::default();
        for request in requests {
            match self
                .create_shared_expense(&request.expense_id, request.allocations, request.method, created_by)
                .await
            {
                Ok(shared) => outcome.created.push(shared),
                Err(e) => {
                    tracing::warn!(expense = %request.expense_id, error = %e, "bulk allocation failed");
                    outcome.failed.push(BulkAllocationFailure {
                        expense_id: request.expense_id,
                        error: e.to_string(),
                    });
                }
            }
        }
        tracing::info!(
            created = outcome.created.len(),
            failed = outcome.failed.len(),
            "bulk allocation finished"
        );
        outcome
    }
}
