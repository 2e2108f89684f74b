use hearth_core::Expense;
use serde::{Deserialize, Serialize};

use crate::irs::IrsCategory;
use crate::TaxError;

fn default_true() -> bool {
    true
}

fn default_percentage() -> u8 {
    100
}

/// A rule applies when the expense's category or subcategory is listed, or
/// when one of its keywords appears in the description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxRule {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category_ids: Vec<String>,
    #[serde(default)]
    pub subcategory_ids: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default = "default_true")]
    pub is_deductible: bool,
    #[serde(default = "default_percentage")]
    pub deduction_percentage: u8,
    pub tax_category: IrsCategory,
    #[serde(default)]
    pub documentation: Vec<String>,
    #[serde(default)]
    pub limitations: Vec<String>,
}

impl TaxRule {
    pub fn applies_to(&self, expense: &Expense) -> bool {
        if self.category_ids.iter().any(|c| c == expense.category_id()) {
            return true;
        }
        if let Some(sub) = expense.subcategory_id() {
            if self.subcategory_ids.iter().any(|s| s == sub) {
                return true;
            }
        }
        let description = expense.description.to_lowercase();
        self.keywords
            .iter()
            .any(|k| description.contains(&k.to_lowercase()))
    }
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    rules: Vec<TaxRule>,
}

/// Ordered rule list; the first rule that applies wins.
#[derive(Debug, Clone)]
pub struct TaxRuleTable {
    rules: Vec<TaxRule>,
}

impl TaxRuleTable {
    pub fn new(rules: Vec<TaxRule>) -> Result<Self, TaxError> {
        for rule in &rules {
            if rule.deduction_percentage > 100 {
                return Err(TaxError::RuleConfig(format!(
                    "rule '{}' deducts {}%",
                    rule.id, rule.deduction_percentage
                )));
            }
            if rule.category_ids.is_empty() && rule.subcategory_ids.is_empty() && rule.keywords.is_empty() {
                return Err(TaxError::RuleConfig(format!("rule '{}' can never match", rule.id)));
            }
        }
        Ok(Self { rules })
    }

    /// Rules from a TOML document with a `[[rules]]` array.
    pub fn from_toml(content: &str) -> Result<Self, TaxError> {
        let file: RuleFile = toml::from_str(content)
            .map_err(|e| TaxError::RuleConfig(format!("Failed to parse TOML: {e}")))?;
        Self::new(file.rules)
    }

    pub fn find_matching_rule(&self, expense: &Expense) -> Option<&TaxRule> {
        self.rules.iter().find(|rule| rule.applies_to(expense))
    }

    /// Schedule E oriented defaults for residential rentals.
    pub fn builtin() -> Self {
        let rule = |id: &str,
                    name: &str,
                    categories: &[&str],
                    subcategories: &[&str],
                    keywords: &[&str],
                    tax_category: IrsCategory| TaxRule {
            id: id.to_string(),
            name: name.to_string(),
            category_ids: categories.iter().map(|s| s.to_string()).collect(),
            subcategory_ids: subcategories.iter().map(|s| s.to_string()).collect(),
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            is_deductible: true,
            deduction_percentage: 100,
            tax_category,
            documentation: vec!["Receipt or invoice".to_string()],
            limitations: vec![],
        };

        let rules = vec![
            TaxRule {
                is_deductible: false,
                deduction_percentage: 0,
                documentation: vec!["Contract and invoices".into(), "Placed-in-service date".into()],
                limitations: vec!["Capital improvements are recovered through depreciation over 27.5 years".into()],
                ..rule(
                    "capital-improvement",
                    "Capital improvement",
                    &[],
                    &[],
                    &["renovation", "remodel", "new roof", "capital improvement"],
                    IrsCategory::Depreciation,
                )
            },
            TaxRule {
                documentation: vec!["Form 1098".into()],
                limitations: vec!["Only the interest portion of a mortgage payment is deductible".into()],
                ..rule("mortgage-interest", "Mortgage interest", &["mortgage"], &["interest"], &["mortgage interest"], IrsCategory::MortgageInterest)
            },
            TaxRule {
                documentation: vec!["County tax bill".into(), "Proof of payment".into()],
                ..rule("property-tax", "Property tax", &["taxes"], &["property_tax"], &["property tax"], IrsCategory::Taxes)
            },
            TaxRule {
                documentation: vec!["Policy declarations page".into()],
                limitations: vec!["Premiums covering future years are deducted in the year they apply to".into()],
                ..rule("insurance", "Insurance premiums", &["insurance"], &[], &[], IrsCategory::Insurance)
            },
            rule(
                "cleaning-maintenance",
                "Cleaning and maintenance",
                &[],
                &["cleaning", "landscaping", "pest_control"],
                &[],
                IrsCategory::CleaningAndMaintenance,
            ),
            TaxRule {
                limitations: vec!["Repairs must restore, not improve, the property".into()],
                ..rule("repairs", "Repairs", &["maintenance"], &[], &["repair"], IrsCategory::Repairs)
            },
            rule("utilities", "Utilities", &["utilities"], &[], &[], IrsCategory::Utilities),
            rule("supplies", "Supplies", &["supplies"], &[], &[], IrsCategory::Supplies),
            TaxRule {
                documentation: vec!["Management agreement".into(), "Monthly owner statements".into()],
                ..rule("management-fees", "Management fees", &[], &["property_management"], &["management fee"], IrsCategory::ManagementFees)
            },
            rule(
                "professional-fees",
                "Legal and professional fees",
                &["professional_services"],
                &["legal", "accounting"],
                &[],
                IrsCategory::LegalAndProfessionalFees,
            ),
            rule("advertising", "Advertising", &["marketing"], &["advertising"], &[], IrsCategory::Advertising),
            TaxRule {
                documentation: vec!["Mileage log with dates, destinations and purpose".into()],
                limitations: vec!["Use either the standard mileage rate or actual costs, not both".into()],
                ..rule("travel", "Auto and travel", &["travel"], &["mileage", "fuel"], &[], IrsCategory::AutoAndTravel)
            },
            TaxRule {
                documentation: vec!["HOA statement".into()],
                ..rule("hoa-dues", "HOA dues", &["hoa"], &["dues"], &[], IrsCategory::OtherExpenses)
            },
        ];
        Self { rules }
    }
}

impl Default for TaxRuleTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use hearth_core::CategorySelection;

    fn expense(desc: &str, cat: &str, sub: Option<&str>) -> Expense {
        Expense::new(
            "e1",
            "p1",
            10_000,
            desc,
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            CategorySelection::manual(cat, sub),
        )
    }

    #[test]
    fn category_match() {
        let table = TaxRuleTable::builtin();
        let rule = table.find_matching_rule(&expense("Monthly bill", "utilities", Some("water"))).unwrap();
        assert_eq!(rule.id, "utilities");
    }

    #[test]
    fn first_matching_rule_wins() {
        let table = TaxRuleTable::builtin();
        // Both capital-improvement (keyword) and repairs (category) apply.
        let rule = table
            .find_matching_rule(&expense("Kitchen remodel", "maintenance", Some("general")))
            .unwrap();
        assert_eq!(rule.id, "capital-improvement");
        assert!(!rule.is_deductible);

        let rule = table
            .find_matching_rule(&expense("Gutter cleaning", "maintenance", Some("cleaning")))
            .unwrap();
        assert_eq!(rule.id, "cleaning-maintenance");
    }

    #[test]
    fn keyword_match_is_case_insensitive() {
        let table = TaxRuleTable::builtin();
        let rule = table
            .find_matching_rule(&expense("Annual PROPERTY TAX installment", "other", None))
            .unwrap();
        assert_eq!(rule.tax_category, IrsCategory::Taxes);
    }

    #[test]
    fn unknown_expense_has_no_rule() {
        let table = TaxRuleTable::builtin();
        assert!(table.find_matching_rule(&expense("Misc", "other", None)).is_none());
    }

    #[test]
    fn loads_rules_from_toml() {
        let table = TaxRuleTable::from_toml(
            r#"
            [[rules]]
            id = "meals"
            name = "Business meals"
            keywords = ["lunch", "dinner"]
            deduction_percentage = 50
            tax_category = "other_expenses"
            limitations = ["Only 50% of business meals is deductible"]
            "#,
        )
        .unwrap();
        let rule = table.find_matching_rule(&expense("Dinner with contractor", "other", None)).unwrap();
        assert_eq!(rule.deduction_percentage, 50);
        assert!(rule.is_deductible);
        assert!(rule.documentation.is_empty());
    }

    #[test]
    fn rejects_invalid_rules() {
        let over = r#"
            [[rules]]
            id = "x"
            name = "x"
            keywords = ["x"]
            deduction_percentage = 150
            tax_category = "supplies"
        "#;
        assert!(matches!(TaxRuleTable::from_toml(over), Err(TaxError::RuleConfig(_))));

        let unmatchable = r#"
            [[rules]]
            id = "x"
            name = "x"
            tax_category = "supplies"
        "#;
        assert!(matches!(TaxRuleTable::from_toml(unmatchable), Err(TaxError::RuleConfig(_))));
        assert!(matches!(TaxRuleTable::from_toml("rules = 3"), Err(TaxError::RuleConfig(_))));
    }
}
