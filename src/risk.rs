//! Presentation-neutral classification of a [`RiskLevel`].

use serde::Serialize;

use crate::models::RiskLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskCategory {
    pub label: &'static str,
    /// 0 (low) ..= 2 (high).
    pub severity_rank: u8,
}

pub fn classify(level: RiskLevel) -> RiskCategory {
    // ---
    let (label, severity_rank) = match level {
        RiskLevel::Low => ("Low", 0),
        RiskLevel::Medium => ("Medium", 1),
        RiskLevel::High => ("High", 2),
    };
    RiskCategory {
        label,
        severity_rank,
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_severity_is_strictly_ordered() {
        // ---
        let low = classify(RiskLevel::Low).severity_rank;
        let medium = classify(RiskLevel::Medium).severity_rank;
        let high = classify(RiskLevel::High).severity_rank;

        assert!(high > medium && medium > low);
        assert_eq!((low, medium, high), (0, 1, 2));
    }

    #[test]
    fn test_rank_agrees_with_level_order() {
        // ---
        let levels = [RiskLevel::High, RiskLevel::Low, RiskLevel::Medium];
        for a in levels {
            for b in levels {
                assert_eq!(
                    a.cmp(&b),
                    classify(a).severity_rank.cmp(&classify(b).severity_rank)
                );
            }
        }
    }

    #[test]
    fn test_labels() {
        // ---
        assert_eq!(classify(RiskLevel::High).label, "High");
        assert_eq!(classify(RiskLevel::Low).label, "Low");
    }
}
