use rand::Rng;

/// Supplies the confidence annotation attached to a new complaint.
///
/// The engine treats the value as opaque; it only guarantees it is stored
/// within `[0, 1]`.
pub trait ConfidenceScorer: Send + Sync {
    fn score(&self, title: &str, description: &str) -> f64;
}

/// Placeholder scorer: a uniform random value in `[0, 1)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomScorer;

impl ConfidenceScorer for RandomScorer {
    fn score(&self, _title: &str, _description: &str) -> f64 {
        rand::rng().random::<f64>()
    }
}

/// Always returns the same score. Useful for seeding and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedScorer(pub f64);

impl ConfidenceScorer for FixedScorer {
    fn score(&self, _title: &str, _description: &str) -> f64 {
        self.0
    }
}

/// Clamp a collaborator-provided score into `[0, 1]`. NaN becomes 0.
pub fn normalize_score(raw: f64) -> f64 {
    if raw.is_nan() {
        0.0
    } else {
        raw.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_scorer_stays_in_unit_interval() {
        let scorer = RandomScorer;
        for _ in 0..200 {
            let s = scorer.score("t", "d");
            assert!((0.0..=1.0).contains(&s));
        }
    }

    #[test]
    fn test_normalize_score() {
        assert_eq!(normalize_score(1.7), 1.0);
        assert_eq!(normalize_score(-0.2), 0.0);
        assert_eq!(normalize_score(f64::NAN), 0.0);
        assert_eq!(normalize_score(0.42), 0.42);
    }
}
