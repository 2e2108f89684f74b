use std::collections::BTreeMap;

use hearth_core::{Expense, ExpenseFilter, ExpenseStore, FiscalYear, Money, PropertyId};
use serde::Serialize;

use crate::classify::TaxClassifier;
use crate::irs::IrsCategory;
use crate::TaxError;

/// Below this deductible share of total spending a review is recommended.
const LOW_DEDUCTIBLE_RATIO: f64 = 0.7;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaxYearSummary {
    pub property_id: PropertyId,
    pub tax_year: FiscalYear,
    pub expense_count: usize,
    pub total_cents: i64,
    pub deductible_cents: i64,
    pub non_deductible_cents: i64,
    /// Deductible cents per Schedule E line.
    pub by_irs_category: BTreeMap<IrsCategory, i64>,
    pub needs_review: usize,
    pub recommendations: Vec<String>,
}

impl TaxYearSummary {
    pub fn deductible_ratio(&self) -> Option<f64> {
        (self.total_cents > 0).then(|| self.deductible_cents as f64 / self.total_cents as f64)
    }
}

/// Classify `expenses` and total them for one property and year.
pub fn summarize(
    classifier: &TaxClassifier,
    property_id: &PropertyId,
    tax_year: FiscalYear,
    expenses: &[Expense],
) -> TaxYearSummary {
    let mut summary = TaxYearSummary {
        property_id: property_id.clone(),
        tax_year,
        expense_count: expenses.len(),
        total_cents: 0,
        deductible_cents: 0,
        non_deductible_cents: 0,
        by_irs_category: BTreeMap::new(),
        needs_review: 0,
        recommendations: vec![],
    };
    let mut missing_receipts = 0;

    for expense in expenses {
        let classification = classifier.classify(expense);
        let deductible = classification.deductible_cents(expense.amount_cents);

        summary.total_cents += expense.amount_cents;
        summary.deductible_cents += deductible;
        summary.non_deductible_cents += expense.amount_cents - deductible;
        if deductible != 0 {
            *summary
                .by_irs_category
                .entry(classification.irs_category)
                .or_default() += deductible;
        }
        if classification.needs_review() {
            summary.needs_review += 1;
        }
        if classification.is_deductible && expense.receipt_photos.is_empty() {
            missing_receipts += 1;
        }
    }

    if let Some(ratio) = summary.deductible_ratio() {
        if ratio < LOW_DEDUCTIBLE_RATIO {
            summary.recommendations.push(format!(
                "Only {:.0}% of spending ({} of {}) is deductible; review non-deductible expenses for missed deductions",
                ratio * 100.0,
                Money::from_cents(summary.deductible_cents),
                Money::from_cents(summary.total_cents),
            ));
        }
    }
    if summary.needs_review > 0 {
        summary.recommendations.push(format!(
            "{} expense(s) matched no tax rule and were filed under Other Expenses; confirm their treatment",
            summary.needs_review
        ));
    }
    if missing_receipts > 0 {
        summary.recommendations.push(format!(
            "{missing_receipts} deductible expense(s) have no receipt on file"
        ));
    }
    summary
}

/// Summarize every expense of `property_id` dated in `tax_year`. Store
/// failures are returned, since a partial tax summary would be misleading.
pub async fn summarize_year<S: ExpenseStore>(
    store: &S,
    classifier: &TaxClassifier,
    property_id: &PropertyId,
    tax_year: FiscalYear,
) -> Result<TaxYearSummary, TaxError> {
    let filter = ExpenseFilter::for_property(property_id).within(tax_year.date_range());
    let expenses = store.get_expenses(&filter).await?;
    let summary = summarize(classifier, property_id, tax_year, &expenses);
    tracing::info!(
        property = %property_id,
        year = %tax_year,
        expenses = summary.expense_count,
        deductible_cents = summary.deductible_cents,
        "tax year summarized"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use hearth_core::{CategorySelection, MemoryStore};

    fn expense(id: &str, cents: i64, desc: &str, cat: &str, on: NaiveDate) -> Expense {
        let mut e = Expense::new(id, "p1", cents, desc, on, CategorySelection::manual(cat, None));
        e.receipt_photos = vec![format!("https://receipts.example/{id}.jpg")];
        e
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn totals_by_irs_category() {
        let expenses = vec![
            expense("u1", 10_000, "Water", "utilities", date(2024, 1, 5)),
            expense("u2", 5_000, "Power", "utilities", date(2024, 2, 5)),
            expense("i1", 20_000, "Premium", "insurance", date(2024, 3, 5)),
        ];
        let s = summarize(&TaxClassifier::default(), &PropertyId::from("p1"), FiscalYear::new(2024), &expenses);

        assert_eq!(s.total_cents, 35_000);
        assert_eq!(s.deductible_cents, 35_000);
        assert_eq!(s.non_deductible_cents, 0);
        assert_eq!(s.by_irs_category[&IrsCategory::Utilities], 15_000);
        assert_eq!(s.by_irs_category[&IrsCategory::Insurance], 20_000);
        assert_eq!(s.needs_review, 0);
        assert!(s.recommendations.is_empty());
    }

    #[test]
    fn low_ratio_default_rule_and_missing_receipts_are_flagged() {
        let mut unreceipted = expense("m1", 1_000, "Misc", "other", date(2024, 6, 1));
        unreceipted.receipt_photos.clear();
        let expenses = vec![
            expense("c1", 90_000, "Kitchen remodel", "maintenance", date(2024, 5, 1)),
            unreceipted,
        ];
        let s = summarize(&TaxClassifier::default(), &PropertyId::from("p1"), FiscalYear::new(2024), &expenses);

        assert_eq!(s.deductible_cents, 1_000);
        assert_eq!(s.non_deductible_cents, 90_000);
        assert_eq!(s.by_irs_category.get(&IrsCategory::Depreciation), None);
        assert_eq!(s.needs_review, 1);
        assert_eq!(s.recommendations.len(), 3);
        assert!(s.recommendations[0].starts_with("Only 1% of spending ($10.00 of $910.00)"));
    }

    #[tokio::test]
    async fn summarize_year_reads_only_that_year() {
        let store = MemoryStore::new(vec![
            expense("a", 10_000, "Water", "utilities", date(2023, 12, 31)),
            expense("b", 20_000, "Water", "utilities", date(2024, 1, 1)),
            expense("c", 30_000, "Water", "utilities", date(2024, 12, 31)),
            expense("d", 40_000, "Water", "utilities", date(2025, 1, 1)),
        ]);
        let s = summarize_year(&store, &TaxClassifier::default(), &PropertyId::from("p1"), FiscalYear::new(2024))
            .await
            .unwrap();
        assert_eq!(s.expense_count, 2);
        assert_eq!(s.total_cents, 50_000);
    }

    #[tokio::test]
    async fn summarize_year_propagates_store_errors() {
        let store = MemoryStore::new(vec![]);
        store.set_failing(true);
        let result =
            summarize_year(&store, &TaxClassifier::default(), &PropertyId::from("p1"), FiscalYear::new(2024)).await;
        assert!(matches!(result, Err(TaxError::Store(_))));
    }
}
