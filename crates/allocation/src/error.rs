use hearth_core::StoreError;
use thiserror::Error;

use crate::shared::AllocationStatus;

#[derive(Debug, Error)]
pub enum AllocationError {
    #[error("Invalid allocation: {0}")]
    Validation(String),
    #[error("Expense not found: {0}")]
    NotFound(String),
    #[error("Cannot {action} a shared expense that is {status}")]
    InvalidTransition {
        status: AllocationStatus,
        action: &'static str,
    },
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
