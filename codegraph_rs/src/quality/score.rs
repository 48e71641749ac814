//! Composite quality scoring.

use serde::{Deserialize, Serialize};

/// Score breakdown for one entity or file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    pub complexity_score: f64,
    pub coverage_score: f64,
    pub maintainability: f64,
    pub overall: f64,
}

/// `max(0, 100 - 2 * cyclomatic)`.
pub fn complexity_score(cyclomatic: usize) -> f64 {
    (100.0 - 2.0 * cyclomatic as f64).max(0.0)
}

/// Combine complexity, coverage, and documentation into the composite score.
pub fn quality_score(
    cyclomatic: usize,
    coverage_percent: f64,
    is_well_documented: bool,
) -> QualityScore {
    let complexity = complexity_score(cyclomatic);
    let coverage = coverage_percent.clamp(0.0, 100.0);
    let documentation_bonus = if is_well_documented { 20.0 } else { 0.0 };
    let maintainability = 0.4 * complexity + 0.3 * coverage + documentation_bonus + 10.0;
    let overall = 0.3 * complexity + 0.4 * coverage + 0.3 * maintainability;
    QualityScore {
        complexity_score: complexity,
        coverage_score: coverage,
        maintainability,
        overall,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complexity_score_floors_at_zero() {
        assert_eq!(complexity_score(1), 98.0);
        assert_eq!(complexity_score(50), 0.0);
        assert_eq!(complexity_score(200), 0.0);
    }

    #[test]
    fn simple_covered_documented_code_scores_high() {
        let score = quality_score(1, 100.0, true);
        assert_eq!(score.complexity_score, 98.0);
        assert_eq!(score.coverage_score, 100.0);
        // 0.4*98 + 0.3*100 + 20 + 10 = 99.2
        assert!((score.maintainability - 99.2).abs() < 1e-9);
        // 0.3*98 + 0.4*100 + 0.3*99.2 = 99.16
        assert!((score.overall - 99.16).abs() < 1e-9);
    }

    #[test]
    fn complex_untested_code_scores_low() {
        let score = quality_score(40, 0.0, false);
        assert_eq!(score.complexity_score, 20.0);
        // 0.4*20 + 0 + 0 + 10 = 18
        assert!((score.maintainability - 18.0).abs() < 1e-9);
        assert!(score.overall < 15.0);
    }

    #[test]
    fn coverage_is_clamped() {
        let score = quality_score(1, 150.0, false);
        assert_eq!(score.coverage_score, 100.0);
        let score = quality_score(1, -5.0, false);
        assert_eq!(score.coverage_score, 0.0);
    }
}
