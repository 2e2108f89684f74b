use std::collections::BTreeMap;

use chrono::NaiveDate;
use hearth_core::{DateRange, Expense, ExpenseFilter, ExpenseStore, InsightsConfig, MonthKey, PropertyId};

use crate::anomaly::{amount_anomalies, ExpenseAnomaly};
use crate::trend::{classify_series, MonthlyTotal, SpendingPattern};

/// Per-category monthly totals over `months`, zero-filled so every category
/// has one entry per month.
pub fn monthly_totals(expenses: &[Expense], months: &[MonthKey]) -> BTreeMap<String, Vec<MonthlyTotal>> {
    let mut sums: BTreeMap<String, BTreeMap<MonthKey, i64>> = BTreeMap::new();
    for expense in expenses {
        let month = MonthKey::of(expense.expense_date);
        if !months.contains(&month) {
            continue;
        }
        *sums
            .entry(expense.category_id().to_string())
            .or_default()
            .entry(month)
            .or_default() += expense.amount_cents;
    }

    sums.into_iter()
        .map(|(category, by_month)| {
            let series = months
                .iter()
                .map(|&month| MonthlyTotal {
                    month,
                    total_cents: by_month.get(&month).copied().unwrap_or(0),
                })
                .collect();
            (category, series)
        })
        .collect()
}

/// Trend and anomaly reports over a property's stored expenses. Store
/// failures are logged and reported as "no insights".
pub struct SpendingAnalyzer<S: ExpenseStore> {
    store: S,
    config: InsightsConfig,
}

impl<S: ExpenseStore> SpendingAnalyzer<S> {
    pub fn new(store: S, config: InsightsConfig) -> Self {
        Self { store, config }
    }

    async fn load(&self, property_id: &PropertyId, range: DateRange) -> Option<Vec<Expense>> {
        let filter = ExpenseFilter::for_property(property_id).within(range);
        match self.store.get_expenses(&filter).await {
            Ok(expenses) => Some(expenses),
            Err(e) => {
                tracing::warn!(property = %property_id, %range, error = %e, "expense history unavailable");
                None
            }
        }
    }

    /// One pattern per category over the `months` months ending with the
    /// month of `as_of`.
    pub async fn spending_patterns(
        &self,
        property_id: &PropertyId,
        as_of: NaiveDate,
        months: usize,
    ) -> Vec<SpendingPattern> {
        let window = MonthKey::of(as_of).trailing(months);
        let (Some(&first), Some(&last)) = (window.first(), window.last()) else {
            return Vec::new();
        };
        let Some(expenses) = self.load(property_id, DateRange::months(first, last)).await else {
            return Vec::new();
        };

        let patterns: Vec<SpendingPattern> = monthly_totals(&expenses, &window)
            .iter()
            .map(|(category, series)| {
                classify_series(category, series, self.config.trend_slope_threshold_cents)
            })
            .collect();
        tracing::debug!(property = %property_id, categories = patterns.len(), "spending patterns computed");
        patterns
    }

    /// Amount anomalies among the expenses dated in the month of `as_of`,
    /// judged per category against the preceding `lookback_months`.
    ///
    /// Only baseline months with spending in the category count, so a
    /// category needs `min_baseline_months` active months to be checked.
    pub async fn detect_anomalies(&self, property_id: &PropertyId, as_of: NaiveDate) -> Vec<ExpenseAnomaly> {
        let current = MonthKey::of(as_of);
        let baseline_months = current.prev().trailing(self.config.lookback_months);
        let first = baseline_months.first().copied().unwrap_or(current);
        let Some(expenses) = self.load(property_id, DateRange::months(first, current)).await else {
            return Vec::new();
        };

        let (recent, history): (Vec<Expense>, Vec<Expense>) = expenses
            .into_iter()
            .partition(|e| MonthKey::of(e.expense_date) == current);
        let baselines = monthly_totals(&history, &baseline_months);

        let mut by_category: BTreeMap<&str, Vec<Expense>> = BTreeMap::new();
        for expense in &recent {
            by_category.entry(expense.category_id()).or_default().push(expense.clone());
        }

        let mut anomalies = Vec::new();
        for (category, current_expenses) in by_category {
            let baseline: Vec<f64> = baselines
                .get(category)
                .map(|series| {
                    series
                        .iter()
                        .filter(|m| m.total_cents != 0)
                        .map(|m| m.total_cents as f64)
                        .collect()
                })
                .unwrap_or_default();
            if baseline.len() < self.config.min_baseline_months {
                tracing::debug!(category, months = baseline.len(), "baseline too short, skipped");
                continue;
            }
            anomalies.extend(amount_anomalies(
                &baseline,
                &current_expenses,
                self.config.min_baseline_months,
                self.config.z_threshold,
            ));
        }

        if !anomalies.is_empty() {
            tracing::info!(property = %property_id, month = %current, count = anomalies.len(), "expense anomalies found");
        }
        anomalies
    }
}
