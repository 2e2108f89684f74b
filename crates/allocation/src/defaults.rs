use hearth_core::{AllocationBasis, PropertyId};
use serde::{Deserialize, Serialize};

use crate::shared::PropertyAllocation;

/// Weighting scheme for splitting a shared expense across properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DefaultAllocationMethod {
    Equal,
    SquareFootage,
    /// Occupied units: unit count times occupancy rate.
    UsageBased,
    /// Share of monthly revenue.
    Revenue,
}

impl DefaultAllocationMethod {
    pub fn basis(self) -> AllocationBasis {
        match self {
            DefaultAllocationMethod::Equal | DefaultAllocationMethod::Revenue => AllocationBasis::Percentage,
            DefaultAllocationMethod::SquareFootage => AllocationBasis::SquareFootage,
            DefaultAllocationMethod::UsageBased => AllocationBasis::UsageBased,
        }
    }
}

/// Per-property figures supplied by the property collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyMetrics {
    pub property_id: PropertyId,
    pub square_footage: f64,
    pub unit_count: u32,
    /// Fraction of units occupied, 0.0 to 1.0.
    pub occupancy_rate: f64,
    pub monthly_revenue_cents: i64,
}

impl PropertyMetrics {
    fn weight(&self, method: DefaultAllocationMethod) -> f64 {
        match method {
            DefaultAllocationMethod::Equal => 1.0,
            DefaultAllocationMethod::SquareFootage => self.square_footage,
            DefaultAllocationMethod::UsageBased => self.unit_count as f64 * self.occupancy_rate,
            DefaultAllocationMethod::Revenue => self.monthly_revenue_cents as f64,
        }
    }
}

/// Suggested percentages for `properties`, proportional to the metric the
/// method weighs by. Amounts are left at zero; they are computed when the
/// shared expense is created.
///
/// Returns an empty list when the metric sums to zero, which callers must
/// treat as "cannot allocate".
pub fn generate_default_allocations(
    method: DefaultAllocationMethod,
    properties: &[PropertyMetrics],
) -> Vec<PropertyAllocation> {
    let weights: Vec<f64> = properties
        .iter()
        .map(|p| p.weight(method).max(0.0))
        .collect();
    let total: f64 = weights.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        tracing::debug!(?method, properties = properties.len(), "no weight to allocate by");
        return Vec::new();
    }

    properties
        .iter()
        .zip(&weights)
        .map(|(property, weight)| {
            let justification = match method {
                DefaultAllocationMethod::Equal => {
                    format!("Equal split across {} properties", properties.len())
                }
                DefaultAllocationMethod::SquareFootage => {
                    format!("{} of {} sq ft", property.square_footage, total)
                }
                DefaultAllocationMethod::UsageBased => {
                    format!("{weight:.1} of {total:.1} occupied units")
                }
                DefaultAllocationMethod::Revenue => "Share of monthly revenue".to_string(),
            };
            PropertyAllocation {
                property_id: property.property_id.clone(),
                percentage: weight / total * 100.0,
                amount_cents: 0,
                method: method.basis(),
                justification: Some(justification),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(id: &str, sq_ft: f64, units: u32, occupancy: f64, revenue: i64) -> PropertyMetrics {
        PropertyMetrics {
            property_id: PropertyId::from(id),
            square_footage: sq_ft,
            unit_count: units,
            occupancy_rate: occupancy,
            monthly_revenue_cents: revenue,
        }
    }

    fn portfolio() -> Vec<PropertyMetrics> {
        vec![
            metrics("a", 1500.0, 4, 1.0, 600_000),
            metrics("b", 500.0, 4, 0.5, 200_000),
        ]
    }

    fn percentages(allocations: &[PropertyAllocation]) -> Vec<f64> {
        allocations.iter().map(|a| a.percentage).collect()
    }

    #[test]
    fn equal_split() {
        let allocations = generate_default_allocations(DefaultAllocationMethod::Equal, &portfolio());
        assert_eq!(percentages(&allocations), vec![50.0, 50.0]);
        assert_eq!(allocations[0].method, AllocationBasis::Percentage);
    }

    #[test]
    fn square_footage_weighting() {
        let allocations =
            generate_default_allocations(DefaultAllocationMethod::SquareFootage, &portfolio());
        assert_eq!(percentages(&allocations), vec![75.0, 25.0]);
        assert_eq!(allocations[1].method, AllocationBasis::SquareFootage);
        assert_eq!(allocations[1].justification.as_deref(), Some("500 of 2000 sq ft"));
    }

    #[test]
    fn usage_weighting_uses_occupied_units() {
        let allocations =
            generate_default_allocations(DefaultAllocationMethod::UsageBased, &portfolio());
        let pcts = percentages(&allocations);
        assert!((pcts[0] - 200.0 / 3.0).abs() < 1e-9);
        assert!((pcts[1] - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn revenue_weighting() {
        let allocations = generate_default_allocations(DefaultAllocationMethod::Revenue, &portfolio());
        assert_eq!(percentages(&allocations), vec![75.0, 25.0]);
    }

    #[test]
    fn zero_metric_cannot_allocate() {
        let vacant = vec![metrics("a", 0.0, 2, 0.0, 0), metrics("b", 0.0, 3, 0.0, 0)];
        assert!(generate_default_allocations(DefaultAllocationMethod::SquareFootage, &vacant).is_empty());
        assert!(generate_default_allocations(DefaultAllocationMethod::UsageBased, &vacant).is_empty());
        assert!(generate_default_allocations(DefaultAllocationMethod::Equal, &[]).is_empty());
    }
}
