pub mod defaults;
pub mod engine;
pub mod error;
pub mod shared;
pub mod validate;

pub use defaults::{generate_default_allocations, DefaultAllocationMethod, PropertyMetrics};
pub use engine::{AllocationEngine, BulkAllocationFailure, BulkAllocationOutcome, BulkAllocationRequest};
pub use error::AllocationError;
pub use shared::{AllocationStatus, PropertyAllocation, SharedExpense};
pub use validate::{validate_allocation, AllocationValidation};
