use hearth_core::{share_of_cents, Expense, ExpenseId};
use serde::{Deserialize, Serialize};

use crate::irs::IrsCategory;
use crate::rules::TaxRuleTable;

const BASE_CONFIDENCE: f64 = 0.5;
const RULE_MATCH_BOOST: f64 = 0.3;
const MAX_CONFIDENCE: f64 = 0.9;
const DEFAULT_RULE_CONFIDENCE: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxClassification {
    pub expense_id: ExpenseId,
    pub is_deductible: bool,
    /// 0 to 100.
    pub deduction_percentage: u8,
    pub irs_category: IrsCategory,
    pub confidence: f64,
    /// Empty when no rule applied and the default was used.
    pub applied_rule_ids: Vec<String>,
    pub documentation: Vec<String>,
    pub warnings: Vec<String>,
}

impl TaxClassification {
    /// True when no rule applied and the conservative default was used.
    pub fn needs_review(&self) -> bool {
        self.applied_rule_ids.is_empty()
    }

    /// Deductible share of `amount_cents`, rounded to the cent.
    pub fn deductible_cents(&self, amount_cents: i64) -> i64 {
        if self.is_deductible {
            share_of_cents(amount_cents, f64::from(self.deduction_percentage))
        } else {
            0
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TaxClassifier {
    table: TaxRuleTable,
}

impl TaxClassifier {
    pub fn new(table: TaxRuleTable) -> Self {
        Self { table }
    }

    pub fn classify(&self, expense: &Expense) -> TaxClassification {
        match self.table.find_matching_rule(expense) {
            Some(rule) => TaxClassification {
                expense_id: expense.id.clone(),
                is_deductible: rule.is_deductible,
                deduction_percentage: rule.deduction_percentage,
                irs_category: rule.tax_category,
                confidence: (BASE_CONFIDENCE + RULE_MATCH_BOOST).min(MAX_CONFIDENCE),
                applied_rule_ids: vec![rule.id.clone()],
                documentation: rule.documentation.clone(),
                warnings: rule.limitations.clone(),
            },
            None => {
                tracing::debug!(expense = %expense.id, category = expense.category_id(), "no tax rule matched");
                TaxClassification {
                    expense_id: expense.id.clone(),
                    is_deductible: true,
                    deduction_percentage: 100,
                    irs_category: IrsCategory::OtherExpenses,
                    confidence: DEFAULT_RULE_CONFIDENCE,
                    applied_rule_ids: vec![],
                    documentation: vec![],
                    warnings: vec![
                        "No tax rule matched; classified as Other Expenses. Review manually.".to_string(),
                    ],
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use hearth_core::CategorySelection;

    fn expense(desc: &str, cat: &str, sub: Option<&str>) -> Expense {
        Expense::new(
            "e9",
            "p1",
            12_345,
            desc,
            NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
            CategorySelection::manual(cat, sub),
        )
    }

    #[test]
    fn matched_rule_is_copied() {
        let c = TaxClassifier::default().classify(&expense("Landlord policy", "insurance", Some("property")));
        assert!(c.is_deductible);
        assert_eq!(c.irs_category, IrsCategory::Insurance);
        assert_eq!(c.applied_rule_ids, vec!["insurance"]);
        assert!((c.confidence - 0.8).abs() < 1e-12);
        assert_eq!(c.documentation, vec!["Policy declarations page"]);
        assert_eq!(c.warnings.len(), 1);
        assert!(!c.needs_review());
    }

    #[test]
    fn unmatched_expense_gets_conservative_default() {
        let c = TaxClassifier::default().classify(&expense("Misc", "other", None));
        assert!(c.is_deductible);
        assert_eq!(c.deduction_percentage, 100);
        assert_eq!(c.irs_category.to_string(), "Other Expenses");
        assert_eq!(c.confidence, 0.3);
        assert_eq!(c.warnings.len(), 1);
        assert!(c.needs_review());
    }

    #[test]
    fn deductible_share() {
        let table = TaxRuleTable::from_toml(
            r#"
            [[rules]]
            id = "meals"
            name = "Meals"
            keywords = ["lunch"]
            deduction_percentage = 50
            tax_category = "other_expenses"
            "#,
        )
        .unwrap();
        let classifier = TaxClassifier::new(table);
        let c = classifier.classify(&expense("Lunch with plumber", "other", None));
        assert_eq!(c.deductible_cents(12_345), 6173);

        let capital = TaxClassifier::default().classify(&expense("Bathroom remodel", "maintenance", None));
        assert_eq!(capital.deductible_cents(12_345), 0);
        assert_eq!(capital.irs_category, IrsCategory::Depreciation);
    }
}
