//! Confidence-tiered retry policy for downstream consumers.
//!
//! A text recogniser that rejects its first attempt needs to know which
//! rotations to try next. The policy maps a [`CombinedResult`] to an ordered
//! list of candidates:
//! - **Confident**: trust the detected angle alone.
//! - **Ambiguous**: the axis is likely right, the direction may be flipped.
//! - **Unknown**: try every rotation.

use crate::combiner::CombinedResult;
use crate::rotation::Rotation;

/// How much a detection can be trusted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RetryTier {
    /// Confidence above the high threshold.
    Confident,
    /// Confidence between the thresholds, inclusive.
    Ambiguous,
    /// Confidence below the low threshold.
    Unknown,
}

/// Thresholds splitting detections into [`RetryTier`]s.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RetryPolicy {
    /// Strictly above this is confident (default: 70).
    pub high_confidence: f64,
    /// Strictly below this is unknown (default: 40).
    pub low_confidence: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            high_confidence: 70.0,
            low_confidence: 40.0,
        }
    }
}

impl RetryPolicy {
    /// Tier of a confidence value.
    #[must_use]
    pub fn tier(&self, confidence: f64) -> RetryTier {
        if confidence > self.high_confidence {
            RetryTier::Confident
        } else if confidence >= self.low_confidence {
            RetryTier::Ambiguous
        } else {
            RetryTier::Unknown
        }
    }

    /// Rotations worth trying for `detected` at `confidence`, best first.
    #[must_use]
    pub fn candidates(&self, detected: Rotation, confidence: f64) -> Vec<Rotation> {
        match self.tier(confidence) {
            RetryTier::Confident => vec![detected],
            RetryTier::Ambiguous => vec![detected, detected.complement()],
            RetryTier::Unknown => Rotation::ALL.to_vec(),
        }
    }

    /// All four rotations: the candidates first, then the rest in canonical order.
    #[must_use]
    pub fn attempt_order(&self, detected: Rotation, confidence: f64) -> Vec<Rotation> {
        let mut order = self.candidates(detected, confidence);
        for r in Rotation::ALL {
            if !order.contains(&r) {
                order.push(r);
            }
        }
        order
    }

    /// [`Self::candidates`] for a combined detection.
    #[must_use]
    pub fn candidates_for(&self, result: &CombinedResult) -> Vec<Rotation> {
        self.candidates(result.angle, result.confidence)
    }

    /// [`Self::attempt_order`] for a combined detection.
    #[must_use]
    pub fn attempt_order_for(&self, result: &CombinedResult) -> Vec<Rotation> {
        self.attempt_order(result.angle, result.confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_tier_boundaries() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.tier(100.0), RetryTier::Confident);
        assert_eq!(policy.tier(70.1), RetryTier::Confident);
        assert_eq!(policy.tier(70.0), RetryTier::Ambiguous);
        assert_eq!(policy.tier(40.0), RetryTier::Ambiguous);
        assert_eq!(policy.tier(39.9), RetryTier::Unknown);
        assert_eq!(policy.tier(0.0), RetryTier::Unknown);
    }

    #[test]
    fn test_candidates() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.candidates(Rotation::Deg90, 85.0), vec![Rotation::Deg90]);
        assert_eq!(
            policy.candidates(Rotation::Deg90, 55.0),
            vec![Rotation::Deg90, Rotation::Deg270]
        );
        assert_eq!(policy.candidates(Rotation::Deg180, 10.0), Rotation::ALL.to_vec());
    }

    #[test]
    fn test_attempt_order() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.attempt_order(Rotation::Deg270, 50.0),
            vec![Rotation::Deg270, Rotation::Deg90, Rotation::Deg0, Rotation::Deg180]
        );
    }

    proptest! {
        #[test]
        fn prop_attempt_order_is_permutation(turns in 0..4i64, confidence in 0.0..=100.0f64) {
            let detected = Rotation::from_quarter_turns(turns);
            let order = RetryPolicy::default().attempt_order(detected, confidence);
            prop_assert_eq!(order.len(), 4);
            prop_assert_eq!(order[0], if confidence < 40.0 { Rotation::Deg0 } else { detected });
            let mut sorted = order.clone();
            sorted.sort();
            prop_assert_eq!(sorted, Rotation::ALL.to_vec());
        }
    }
}
