use serde::{Deserialize, Serialize};
use std::fmt;

/// Rental expense lines of IRS Schedule E.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IrsCategory {
    Advertising,
    AutoAndTravel,
    CleaningAndMaintenance,
    Commissions,
    Insurance,
    LegalAndProfessionalFees,
    ManagementFees,
    MortgageInterest,
    OtherInterest,
    Repairs,
    Supplies,
    Taxes,
    Utilities,
    Depreciation,
    OtherExpenses,
}

impl IrsCategory {
    pub fn label(self) -> &'static str {
        match self {
            IrsCategory::Advertising => "Advertising",
            IrsCategory::AutoAndTravel => "Auto and Travel",
            IrsCategory::CleaningAndMaintenance => "Cleaning and Maintenance",
            IrsCategory::Commissions => "Commissions",
            IrsCategory::Insurance => "Insurance",
            IrsCategory::LegalAndProfessionalFees => "Legal and Professional Fees",
            IrsCategory::ManagementFees => "Management Fees",
            IrsCategory::MortgageInterest => "Mortgage Interest",
            IrsCategory::OtherInterest => "Other Interest",
            IrsCategory::Repairs => "Repairs",
            IrsCategory::Supplies => "Supplies",
            IrsCategory::Taxes => "Taxes",
            IrsCategory::Utilities => "Utilities",
            IrsCategory::Depreciation => "Depreciation",
            IrsCategory::OtherExpenses => "Other Expenses",
        }
    }
}

impl fmt::Display for IrsCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_form_labels() {
        assert_eq!(IrsCategory::OtherExpenses.to_string(), "Other Expenses");
        assert_eq!(IrsCategory::LegalAndProfessionalFees.to_string(), "Legal and Professional Fees");
    }
}
