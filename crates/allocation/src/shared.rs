use chrono::{DateTime, Utc};
use hearth_core::{share_of_cents, AllocationBasis, AllocationRecord, Expense, ExpenseId, PropertyId};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AllocationError;

/// One property's share of a shared expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyAllocation {
    pub property_id: PropertyId,
    /// 0 to 100.
    pub percentage: f64,
    pub amount_cents: i64,
    pub method: AllocationBasis,
    pub justification: Option<String>,
}

impl PropertyAllocation {
    pub fn new(property_id: &str, percentage: f64, method: AllocationBasis) -> Self {
        Self {
            property_id: PropertyId::from(property_id),
            percentage,
            amount_cents: 0,
            method,
            justification: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStatus {
    Pending,
    Approved,
    Allocated,
    Rejected,
}

impl fmt::Display for AllocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationStatus::Pending => write!(f, "pending"),
            AllocationStatus::Approved => write!(f, "approved"),
            AllocationStatus::Allocated => write!(f, "allocated"),
            AllocationStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// An expense split across several properties.
///
/// Lifecycle: `pending` → `approved` (optional) → `allocated`, or
/// `rejected` from either of the first two. `allocated` and `rejected` are
/// terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedExpense {
    pub id: String,
    pub original_expense_id: ExpenseId,
    pub original_amount_cents: i64,
    pub allocations: Vec<PropertyAllocation>,
    pub method: AllocationBasis,
    pub total_allocated_cents: i64,
    /// Rounding drift: original minus the sum of allocated amounts. Kept as
    /// an audit figure and never redistributed.
    pub remaining_amount_cents: i64,
    pub status: AllocationStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub approved_by: Option<String>,
    pub allocated_at: Option<DateTime<Utc>>,
}

impl SharedExpense {
    /// Split `expense` by `allocations`. Percentages must be non-negative and
    /// sum to 100 within `tolerance`; each share is rounded to the cent.
    pub fn create(
        expense: &Expense,
        allocations: Vec<PropertyAllocation>,
        method: AllocationBasis,
        created_by: &str,
        tolerance: f64,
    ) -> Result<Self, AllocationError> {
        if allocations.is_empty() {
            return Err(AllocationError::Validation("no allocations given".to_string()));
        }
        if let Some(bad) = allocations
            .iter()
            .find(|a| !a.percentage.is_finite() || a.percentage < 0.0)
        {
            return Err(AllocationError::Validation(format!(
                "percentage for {} must be between 0 and 100, got {}",
                bad.property_id, bad.percentage
            )));
        }
        let sum: f64 = allocations.iter().map(|a| a.percentage).sum();
        if (sum - 100.0).abs() > tolerance {
            return Err(AllocationError::Validation(format!(
                "percentages sum to {sum:.2}, expected 100"
            )));
        }

        let allocations: Vec<PropertyAllocation> = allocations
            .into_iter()
            .map(|a| PropertyAllocation {
                amount_cents: share_of_cents(expense.amount_cents, a.percentage),
                ..a
            })
            .collect();
        let total_allocated_cents: i64 = allocations.iter().map(|a| a.amount_cents).sum();

        let shared = SharedExpense {
            id: uuid::Uuid::new_v4().to_string(),
            original_expense_id: expense.id.clone(),
            original_amount_cents: expense.amount_cents,
            allocations,
            method,
            total_allocated_cents,
            remaining_amount_cents: expense.amount_cents - total_allocated_cents,
            status: AllocationStatus::Pending,
            created_by: created_by.to_string(),
            created_at: Utc::now(),
            approved_by: None,
            allocated_at: None,
        };
        tracing::debug!(
            shared_expense = %shared.id,
            expense = %expense.id,
            properties = shared.allocations.len(),
            remaining_cents = shared.remaining_amount_cents,
            "shared expense created"
        );
        Ok(shared)
    }

    pub fn approve(&mut self, approved_by: &str) -> Result<(), AllocationError> {
        if self.status != AllocationStatus::Pending {
            return Err(AllocationError::InvalidTransition { status: self.status, action: "approve" });
        }
        self.status = AllocationStatus::Approved;
        self.approved_by = Some(approved_by.to_string());
        tracing::info!(shared_expense = %self.id, approved_by, "shared expense approved");
        Ok(())
    }

    pub fn reject(&mut self) -> Result<(), AllocationError> {
        if !matches!(self.status, AllocationStatus::Pending | AllocationStatus::Approved) {
            return Err(AllocationError::InvalidTransition { status: self.status, action: "reject" });
        }
        self.status = AllocationStatus::Rejected;
        tracing::info!(shared_expense = %self.id, "shared expense rejected");
        Ok(())
    }

    /// Create one expense per property with a non-zero share and mark this
    /// shared expense allocated. Refused once allocated or rejected.
    pub fn apply_allocation(
        &mut self,
        original: &Expense,
        approved_by: &str,
    ) -> Result<Vec<Expense>, AllocationError> {
        if !matches!(self.status, AllocationStatus::Pending | AllocationStatus::Approved) {
            return Err(AllocationError::InvalidTransition { status: self.status, action: "apply" });
        }
        if original.id != self.original_expense_id {
            return Err(AllocationError::Validation(format!(
                "expense {} is not the original of shared expense {}",
                original.id, self.id
            )));
        }

        let created: Vec<Expense> = self
            .allocations
            .iter()
            .filter(|a| a.amount_cents > 0)
            .map(|a| Expense {
                id: ExpenseId(uuid::Uuid::new_v4().to_string()),
                property_id: a.property_id.clone(),
                amount_cents: a.amount_cents,
                description: format!(
                    "{} (allocated {:.2}% of shared expense)",
                    original.description, a.percentage
                ),
                merchant_name: original.merchant_name.clone(),
                category: original.category.clone(),
                receipt_photos: original.receipt_photos.clone(),
                expense_date: original.expense_date,
                is_tax_deductible: true,
                property_allocation: Some(AllocationRecord {
                    shared_expense_id: self.id.clone(),
                    original_expense_id: original.id.clone(),
                    percentage: a.percentage,
                    basis: a.method,
                }),
            })
            .collect();

        self.status = AllocationStatus::Allocated;
        self.approved_by = Some(approved_by.to_string());
        self.allocated_at = Some(Utc::now());
        tracing::info!(
            shared_expense = %self.id,
            expenses = created.len(),
            approved_by,
            "shared expense allocated"
        );
        Ok(created)
    }
}
