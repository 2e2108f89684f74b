use hearth_core::{Expense, ExpenseId};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::stats::{mean, population_std_dev};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyType {
    Amount,
    Frequency,
    Timing,
    Category,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn from_z_score(z: f64) -> Self {
        if z > 3.0 {
            Severity::High
        } else if z > 2.5 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseAnomaly {
    pub expense_id: ExpenseId,
    pub category_id: String,
    pub anomaly_type: AnomalyType,
    pub severity: Severity,
    /// Baseline mean, in cents.
    pub expected_value: f64,
    pub actual_value: f64,
    /// Absolute z-score against the baseline.
    pub deviation: f64,
    pub confidence: f64,
}

/// Flag `expenses` whose amount lies more than `z_threshold` standard
/// deviations from the mean of `baseline` (monthly totals in cents).
///
/// Nothing is flagged when the baseline has fewer than `min_baseline`
/// points or no spread.
pub fn amount_anomalies(
    baseline: &[f64],
    expenses: &[Expense],
    min_baseline: usize,
    z_threshold: f64,
) -> Vec<ExpenseAnomaly> {
    if baseline.len() < min_baseline.max(1) {
        return Vec::new();
    }
    let (Some(expected), Some(std_dev)) = (mean(baseline), population_std_dev(baseline)) else {
        return Vec::new();
    };
    if std_dev == 0.0 {
        return Vec::new();
    }

    expenses
        .iter()
        .filter_map(|expense| {
            let actual = expense.amount_cents as f64;
            let z = (actual - expected).abs() / std_dev;
            (z > z_threshold).then(|| ExpenseAnomaly {
                expense_id: expense.id.clone(),
                category_id: expense.category_id().to_string(),
                anomaly_type: AnomalyType::Amount,
                severity: Severity::from_z_score(z),
                expected_value: expected,
                actual_value: actual,
                deviation: z,
                confidence: (z / 4.0).min(0.95),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use hearth_core::CategorySelection;

    fn expense(id: &str, cents: i64) -> Expense {
        Expense::new(
            id,
            "p1",
            cents,
            "Water bill",
            NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            CategorySelection::manual("utilities", Some("water")),
        )
    }

    const BASELINE: [f64; 4] = [1000.0, 1050.0, 980.0, 1020.0];

    #[test]
    fn large_expense_against_tight_baseline_is_high() {
        let found = amount_anomalies(&BASELINE, &[expense("e1", 5000)], 3, 2.0);
        assert_eq!(found.len(), 1);
        let a = &found[0];
        assert!(a.deviation > 2.0);
        assert_eq!(a.severity, Severity::High);
        assert_eq!(a.confidence, 0.95);
        assert_eq!(a.expected_value, 1012.5);
        assert_eq!(a.category_id, "utilities");
    }

    #[test]
    fn in_range_expense_is_not_flagged() {
        assert!(amount_anomalies(&BASELINE, &[expense("e1", 1030)], 3, 2.0).is_empty());
    }

    #[test]
    fn severity_bands() {
        // mean 100, population std dev 10.
        let baseline = [90.0, 110.0, 90.0, 110.0];
        let found = amount_anomalies(
            &baseline,
            &[expense("low", 122), expense("medium", 128), expense("high", 135)],
            3,
            2.0,
        );
        let severities: Vec<Severity> = found.iter().map(|a| a.severity).collect();
        assert_eq!(severities, vec![Severity::Low, Severity::Medium, Severity::High]);
        assert!((found[0].confidence - 2.2 / 4.0).abs() < 1e-9);
    }

    #[test]
    fn short_baseline_never_flags() {
        for baseline in [&[][..], &[1000.0][..], &[1000.0, 1010.0][..]] {
            assert!(amount_anomalies(baseline, &[expense("e1", 1_000_000)], 3, 2.0).is_empty());
        }
    }

    #[test]
    fn flat_baseline_never_flags() {
        let baseline = [500.0, 500.0, 500.0];
        assert!(amount_anomalies(&baseline, &[expense("e1", 9000)], 3, 2.0).is_empty());
    }
}
