use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyId(pub String);

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PropertyId {
    fn from(s: &str) -> Self {
        PropertyId(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpenseId(pub String);

impl fmt::Display for ExpenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ExpenseId {
    fn from(s: &str) -> Self {
        ExpenseId(s.to_string())
    }
}

/// The category an expense was filed under, and how it got there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySelection {
    pub category_id: String,
    pub subcategory_id: Option<String>,
    pub confidence: Option<f32>,
    /// Set when the category came from a suggestion the user never confirmed.
    pub is_auto_suggested: bool,
}

impl CategorySelection {
    pub fn manual(category_id: &str, subcategory_id: Option<&str>) -> Self {
        Self {
            category_id: category_id.to_string(),
            subcategory_id: subcategory_id.map(str::to_string),
            confidence: None,
            is_auto_suggested: false,
        }
    }

    pub fn suggested(category_id: &str, subcategory_id: Option<&str>, confidence: f32) -> Self {
        Self {
            category_id: category_id.to_string(),
            subcategory_id: subcategory_id.map(str::to_string),
            confidence: Some(confidence),
            is_auto_suggested: true,
        }
    }
}

/// How a share of a shared expense was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AllocationBasis {
    Percentage,
    Fixed,
    UsageBased,
    SquareFootage,
}

impl fmt::Display for AllocationBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationBasis::Percentage => write!(f, "percentage"),
            AllocationBasis::Fixed => write!(f, "fixed"),
            AllocationBasis::UsageBased => write!(f, "usage-based"),
            AllocationBasis::SquareFootage => write!(f, "square-footage"),
        }
    }
}

/// Stamped on an expense that was synthesized from a shared expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationRecord {
    pub shared_expense_id: String,
    pub original_expense_id: ExpenseId,
    pub percentage: f64,
    pub basis: AllocationBasis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub property_id: PropertyId,
    pub amount_cents: i64,
    pub description: String,
    pub merchant_name: Option<String>,
    pub category: CategorySelection,
    pub receipt_photos: Vec<String>,
    pub expense_date: NaiveDate,
    pub is_tax_deductible: bool,
    pub property_allocation: Option<AllocationRecord>,
}

impl Expense {
    pub fn new(
        id: &str,
        property_id: &str,
        amount_cents: i64,
        description: &str,
        expense_date: NaiveDate,
        category: CategorySelection,
    ) -> Self {
        Expense {
            id: ExpenseId::from(id),
            property_id: PropertyId::from(property_id),
            amount_cents,
            description: description.to_string(),
            merchant_name: None,
            category,
            receipt_photos: vec![],
            expense_date,
            is_tax_deductible: false,
            property_allocation: None,
        }
    }

    pub fn category_id(&self) -> &str {
        &self.category.category_id
    }

    pub fn subcategory_id(&self) -> Option<&str> {
        self.category.subcategory_id.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = ExpenseId::from("exp-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"exp-1\"");
        assert_eq!(PropertyId::from("prop-9").to_string(), "prop-9");
    }

    #[test]
    fn allocation_basis_kebab_case() {
        assert_eq!(
            serde_json::to_string(&AllocationBasis::SquareFootage).unwrap(),
            "\"square-footage\""
        );
        assert_eq!(AllocationBasis::UsageBased.to_string(), "usage-based");
    }

    #[test]
    fn selection_constructors_mark_origin() {
        assert!(!CategorySelection::manual("utilities", None).is_auto_suggested);
        let s = CategorySelection::suggested("utilities", Some("water"), 0.7);
        assert!(s.is_auto_suggested);
        assert_eq!(s.subcategory_id.as_deref(), Some("water"));
    }

    #[test]
    fn new_expense_defaults() {
        let e = Expense::new(
            "e1",
            "p1",
            1200,
            "Plumber visit",
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            CategorySelection::manual("maintenance", Some("plumbing")),
        );
        assert_eq!(e.category_id(), "maintenance");
        assert_eq!(e.subcategory_id(), Some("plumbing"));
        assert!(e.receipt_photos.is_empty());
        assert!(e.property_allocation.is_none());
    }
}
