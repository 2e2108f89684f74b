use hearth_core::MonthKey;
use serde::{Deserialize, Serialize};

use crate::stats::{mean, pearson_correlation, slope};

/// Seasonality needs at least a year of data.
const MIN_SEASONAL_POINTS: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyTotal {
    pub month: MonthKey,
    pub total_cents: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    Increasing,
    Decreasing,
    Stable,
    Seasonal,
    Irregular,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Up,
    Down,
    Flat,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    pub direction: TrendDirection,
    /// Cents per month.
    pub slope: f64,
    /// Absolute Pearson correlation; 0 for a flat series.
    pub correlation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seasonality {
    pub detected: bool,
    /// Months (`YYYY-MM`) that stand out above their neighbours.
    pub peaks: Vec<String>,
    pub valleys: Vec<String>,
    pub strength: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendingPattern {
    pub category_id: String,
    pub pattern: PatternKind,
    pub confidence: f64,
    pub trend: Trend,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seasonality: Option<Seasonality>,
}

/// Peaks and valleys of a series of at least 12 months. A peak is above
/// both neighbours and 120% of the mean, a valley below both neighbours and
/// 80% of the mean.
pub fn detect_seasonality(series: &[MonthlyTotal]) -> Option<Seasonality> {
    if series.len() < MIN_SEASONAL_POINTS {
        return None;
    }
    let values: Vec<f64> = series.iter().map(|m| m.total_cents as f64).collect();
    let avg = mean(&values)?;

    let mut peaks = Vec::new();
    let mut valleys = Vec::new();
    for i in 1..values.len() - 1 {
        let (prev, cur, next) = (values[i - 1], values[i], values[i + 1]);
        if cur > prev && cur > next && cur > avg * 1.2 {
            peaks.push(series[i].month.to_string());
        } else if cur < prev && cur < next && cur < avg * 0.8 {
            valleys.push(series[i].month.to_string());
        }
    }

    let turning_points = (peaks.len() + valleys.len()) as f64;
    let strength = (turning_points / (values.len() as f64 * 0.3)).min(1.0);
    Some(Seasonality { detected: strength > 0.3, peaks, valleys, strength })
}

/// Classify one category's monthly series (oldest first).
///
/// A slope steeper than `slope_threshold_cents` per month is a trend; then
/// seasonality is checked, then a weak correlation (< 0.3) reads as
/// irregular, and anything else is stable.
pub fn classify_series(
    category_id: &str,
    series: &[MonthlyTotal],
    slope_threshold_cents: f64,
) -> SpendingPattern {
    let values: Vec<f64> = series.iter().map(|m| m.total_cents as f64).collect();
    let slope = slope(&values);
    let correlation = pearson_correlation(&values);

    let direction = if slope > slope_threshold_cents {
        TrendDirection::Up
    } else if slope < -slope_threshold_cents {
        TrendDirection::Down
    } else {
        TrendDirection::Flat
    };
    let trend = Trend { direction, slope, correlation: correlation.unwrap_or(0.0) };
    let seasonality = detect_seasonality(series);

    let (pattern, confidence) = match (direction, &seasonality, correlation) {
        (TrendDirection::Up, _, c) => (PatternKind::Increasing, c.unwrap_or(0.0).min(0.9)),
        (TrendDirection::Down, _, c) => (PatternKind::Decreasing, c.unwrap_or(0.0).min(0.9)),
        (_, Some(s), _) if s.detected => (PatternKind::Seasonal, s.strength),
        // No variance at all: the series is as stable as it gets.
        (_, _, None) => (PatternKind::Stable, 0.5),
        (_, _, Some(c)) if c < 0.3 => (PatternKind::Irregular, 1.0 - c),
        _ => (PatternKind::Stable, 0.5),
    };

    SpendingPattern {
        category_id: category_id.to_string(),
        pattern,
        confidence,
        trend,
        seasonality,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(start: MonthKey, totals: &[i64]) -> Vec<MonthlyTotal> {
        let mut month = start;
        totals
            .iter()
            .map(|&total_cents| {
                let entry = MonthlyTotal { month, total_cents };
                month = month.next();
                entry
            })
            .collect()
    }

    fn jan_2023() -> MonthKey {
        MonthKey::new(2023, 1).unwrap()
    }

    #[test]
    fn steady_growth_is_increasing() {
        let s = series(jan_2023(), &[10_000, 12_000, 14_000, 16_000, 18_000, 20_000]);
        let p = classify_series("utilities", &s, 1000.0);
        assert_eq!(p.pattern, PatternKind::Increasing);
        assert_eq!(p.trend.direction, TrendDirection::Up);
        assert!((p.trend.slope - 2000.0).abs() < 1e-9);
        assert!((p.confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn steady_decline_is_decreasing() {
        let s = series(jan_2023(), &[50_000, 45_000, 40_000, 35_000]);
        let p = classify_series("maintenance", &s, 1000.0);
        assert_eq!(p.pattern, PatternKind::Decreasing);
        assert_eq!(p.trend.direction, TrendDirection::Down);
    }

    #[test]
    fn flat_series_is_stable() {
        let s = series(jan_2023(), &[8_000; 6]);
        let p = classify_series("hoa", &s, 1000.0);
        assert_eq!(p.pattern, PatternKind::Stable);
        assert_eq!(p.confidence, 0.5);
        assert_eq!(p.trend.correlation, 0.0);
        assert!(p.seasonality.is_none());
    }

    #[test]
    fn noisy_series_is_irregular() {
        let s = series(jan_2023(), &[1000, 1400, 900, 1500, 1000, 1300, 1100]);
        let p = classify_series("supplies", &s, 1000.0);
        assert_eq!(p.trend.direction, TrendDirection::Flat);
        assert!(p.trend.correlation < 0.3);
        assert_eq!(p.pattern, PatternKind::Irregular);
        assert!((p.confidence - (1.0 - p.trend.correlation)).abs() < 1e-12);
    }

    #[test]
    fn alternating_year_is_seasonal() {
        let totals = [1000, 3000, 1000, 3000, 1000, 3000, 1000, 3000, 1000, 3000, 1000, 3000];
        let s = series(jan_2023(), &totals);
        let seasonality = detect_seasonality(&s).unwrap();
        // Interior points: 5 peaks (Feb..Oct) and 5 valleys (Mar..Nov).
        assert_eq!(seasonality.peaks.len(), 5);
        assert_eq!(seasonality.valleys.len(), 5);
        assert_eq!(seasonality.peaks[0], "2023-02");
        assert_eq!(seasonality.strength, 1.0);
        assert!(seasonality.detected);

        let p = classify_series("utilities", &s, 1000.0);
        assert_eq!(p.pattern, PatternKind::Seasonal);
        assert_eq!(p.confidence, 1.0);
    }

    #[test]
    fn pattern_serializes_for_reports() {
        let s = series(jan_2023(), &[10_000, 12_000, 14_000]);
        let json = serde_json::to_value(classify_series("utilities", &s, 1000.0)).unwrap();
        assert_eq!(json["pattern"], "increasing");
        assert_eq!(json["trend"]["direction"], "up");
        assert!(json.get("seasonality").is_none());
    }

    #[test]
    fn short_series_has_no_seasonality() {
        let s = series(jan_2023(), &[1000, 3000, 1000, 3000]);
        assert!(detect_seasonality(&s).is_none());
    }
}
