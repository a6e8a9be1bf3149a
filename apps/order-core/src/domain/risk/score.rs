//! Composite risk score and level.

use std::fmt;

/// Risk level derived from a composite 0-100 score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RiskLevel {
    /// score < 20
    Low,
    /// score < 40
    Medium,
    /// score < 60
    High,
    /// score < 80
    VeryHigh,
    /// score >= 80
    ExtremelyHigh,
}

impl RiskLevel {
    /// Maps a composite 0-100 score to its level.
    #[must_use]
    pub const fn from_score(score: u8) -> Self {
        if score < 20 {
            Self::Low
        } else if score < 40 {
            Self::Medium
        } else if score < 60 {
            Self::High
        } else if score < 80 {
            Self::VeryHigh
        } else {
            Self::ExtremelyHigh
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
            Self::VeryHigh => write!(f, "VERY_HIGH"),
            Self::ExtremelyHigh => write!(f, "EXTREMELY_HIGH"),
        }
    }
}

/// Result of scoring an order for risk.
#[derive(Debug, Clone)]
pub struct RiskAssessment {
    /// Composite score, 0-100.
    pub score: u8,
    /// Level derived from the score.
    pub level: RiskLevel,
    /// Whether manual approval is required before execution.
    pub requires_manual_approval: bool,
}

impl RiskAssessment {
    fn manual_approval_required(score: u8, level: RiskLevel, has_critical_factor: bool) -> bool {
        score >= 70 || has_critical_factor || level >= RiskLevel::VeryHigh
    }

    pub(super) fn new(score: u8, has_critical_factor: bool) -> Self {
        let level = RiskLevel::from_score(score);
        Self {
            score,
            level,
            requires_manual_approval: Self::manual_approval_required(
                score,
                level,
                has_critical_factor,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_thresholds() {
        assert_eq!(RiskLevel::from_score(0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(19), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(20), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(39), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(40), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(59), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(60), RiskLevel::VeryHigh);
        assert_eq!(RiskLevel::from_score(79), RiskLevel::VeryHigh);
        assert_eq!(RiskLevel::from_score(80), RiskLevel::ExtremelyHigh);
        assert_eq!(RiskLevel::from_score(100), RiskLevel::ExtremelyHigh);
    }

    #[test]
    fn manual_approval_triggered_by_score_threshold() {
        let assessment = RiskAssessment::new(70, false);
        assert!(assessment.requires_manual_approval);
    }

    #[test]
    fn manual_approval_triggered_by_critical_factor() {
        let assessment = RiskAssessment::new(10, true);
        assert!(assessment.requires_manual_approval);
    }

    #[test]
    fn manual_approval_triggered_by_very_high_level() {
        let assessment = RiskAssessment::new(60, false);
        assert!(assessment.requires_manual_approval);
    }

    #[test]
    fn low_score_no_critical_factor_does_not_require_approval() {
        let assessment = RiskAssessment::new(10, false);
        assert!(!assessment.requires_manual_approval);
    }
}
