use serde::Serialize;

use crate::shared::PropertyAllocation;

/// Advisory check result. Errors block allocation, warnings do not.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AllocationValidation {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl AllocationValidation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check `allocations` without failing: the percentage sum must be 100
/// within `tolerance` and nothing may be negative. Zero and sub-1% shares
/// are flagged as warnings.
pub fn validate_allocation(allocations: &[PropertyAllocation], tolerance: f64) -> AllocationValidation {
    let mut result = AllocationValidation::default();

    let sum: f64 = allocations.iter().map(|a| a.percentage).sum();
    if (sum - 100.0).abs() > tolerance {
        result
            .errors
            .push(format!("Allocation percentages must sum to 100%, got {sum:.2}%"));
    }

    for a in allocations {
        if a.percentage < 0.0 {
            result
                .errors
                .push(format!("Negative percentage for property {}: {}%", a.property_id, a.percentage));
        }
        if a.amount_cents < 0 {
            result
                .errors
                .push(format!("Negative amount for property {}: {} cents", a.property_id, a.amount_cents));
        }
        if a.percentage == 0.0 {
            result
                .warnings
                .push(format!("Property {} has a 0% allocation", a.property_id));
        } else if a.percentage > 0.0 && a.percentage < 1.0 {
            result
                .warnings
                .push(format!("Property {} has a very small allocation ({}%)", a.property_id, a.percentage));
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_core::AllocationBasis;

    fn alloc(property: &str, pct: f64) -> PropertyAllocation {
        PropertyAllocation::new(property, pct, AllocationBasis::Percentage)
    }

    #[test]
    fn clean_allocation_passes() {
        let v = validate_allocation(&[alloc("a", 60.0), alloc("b", 40.0)], 0.01);
        assert!(v.is_valid());
        assert!(v.warnings.is_empty());
    }

    #[test]
    fn bad_sum_and_negative_are_errors() {
        let v = validate_allocation(&[alloc("a", 80.0), alloc("b", -5.0)], 0.01);
        assert_eq!(v.errors.len(), 2);
        assert!(v.errors[0].contains("75.00"));
        assert!(!v.is_valid());
    }

    #[test]
    fn tiny_and_zero_shares_are_warnings() {
        let v = validate_allocation(&[alloc("a", 99.5), alloc("b", 0.5), alloc("c", 0.0)], 0.01);
        assert!(v.is_valid());
        assert_eq!(v.warnings.len(), 2);
        assert!(v.warnings[0].contains("very small"));
        assert!(v.warnings[1].contains("0%"));
    }

    #[test]
    fn negative_amount_is_an_error() {
        let mut a = alloc("a", 100.0);
        a.amount_cents = -1;
        assert_eq!(validate_allocation(&[a], 0.01).errors.len(), 1);
    }
}
