pub mod analyzer;
pub mod anomaly;
pub mod stats;
pub mod trend;

pub use analyzer::{monthly_totals, SpendingAnalyzer};
pub use anomaly::{amount_anomalies, AnomalyType, ExpenseAnomaly, Severity};
pub use stats::{mean, pearson_correlation, population_std_dev, slope};
pub use trend::{
    classify_series, detect_seasonality, MonthlyTotal, PatternKind, Seasonality, SpendingPattern,
    Trend, TrendDirection,
};
