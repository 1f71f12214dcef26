//! Weighted vote aggregation across estimators.
//!
//! Only estimators that produced evidence (confidence > 0, weight > 0) vote.
//! Their static weights are rescaled to sum to one over that active set, so a
//! single surviving estimator can still carry the decision. The outcome does
//! not depend on the order in which results arrive.

use crate::config::MethodWeights;
use crate::estimator::{EstimatorResult, Method};
use crate::rotation::Rotation;
use std::collections::BTreeMap;

/// Accumulated vote per canonical angle, indexed by [`Rotation::index`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AngleVotes(pub [f64; 4]);

impl AngleVotes {
    /// Vote for `rotation`.
    #[must_use]
    pub fn get(&self, rotation: Rotation) -> f64 {
        self.0[rotation.index()]
    }

    /// Sum of all votes.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.0.iter().sum()
    }

    /// `(rotation, vote)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Rotation, f64)> + '_ {
        Rotation::ALL.iter().map(move |&r| (r, self.get(r)))
    }

    fn add(&mut self, rotation: Rotation, vote: f64) {
        self.0[rotation.index()] += vote;
    }
}

/// Final orientation decision.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CombinedResult {
    /// Winning rotation.
    pub angle: Rotation,
    /// Share of the total vote held by the winner, in `[0, 100]`.
    pub confidence: f64,
    /// Largest contributor to the winning angle, `None` when nobody voted.
    pub winning_method: Option<Method>,
    /// Vote mass per angle.
    pub per_angle_votes: AngleVotes,
    /// Every estimator's individual result.
    pub per_method_details: BTreeMap<Method, EstimatorResult>,
}

impl CombinedResult {
    /// Rotation that turns the image upright.
    #[must_use]
    pub fn correction(&self) -> Rotation {
        self.angle.inverse()
    }
}

/// Merge per-estimator results into one decision.
#[must_use]
pub fn combine(
    results: BTreeMap<Method, EstimatorResult>,
    weights: &MethodWeights,
) -> CombinedResult {
    let active: Vec<(Method, &EstimatorResult, f64)> = results
        .iter()
        .map(|(&m, r)| (m, r, weights.get(m)))
        .filter(|&(_, r, w)| r.confidence > 0.0 && w > 0.0 && w.is_finite())
        .collect();
    let active_weight: f64 = active.iter().map(|&(_, _, w)| w).sum();

    if active.is_empty() || active_weight <= 0.0 {
        return CombinedResult {
            angle: Rotation::Deg0,
            confidence: 0.0,
            winning_method: None,
            per_angle_votes: AngleVotes::default(),
            per_method_details: results,
        };
    }

    let mut votes = AngleVotes::default();
    let mut strongest_backer = [0.0f64; 4];
    for &(_, r, w) in &active {
        votes.add(r.angle, r.confidence / 100.0 * (w / active_weight));
        let slot = &mut strongest_backer[r.angle.index()];
        *slot = slot.max(w);
    }

    // Ascending scan, replacing only on strict improvement, keeps the smaller
    // angle on a full tie.
    let mut angle = Rotation::Deg0;
    for candidate in Rotation::ALL {
        let key = (votes.get(candidate), strongest_backer[candidate.index()]);
        let best = (votes.get(angle), strongest_backer[angle.index()]);
        if key.0 > best.0 || (key.0 == best.0 && key.1 > best.1) {
            angle = candidate;
        }
    }

    let total = votes.total();
    let confidence = if total > 0.0 {
        (100.0 * votes.get(angle) / total).clamp(0.0, 100.0)
    } else {
        0.0
    };

    let mut winning_method: Option<(Method, f64, f64)> = None;
    for &(m, r, w) in active.iter().filter(|(_, r, _)| r.angle == angle) {
        let contribution = r.confidence * w;
        let better = winning_method.map_or(true, |(_, best_c, best_w)| {
            contribution > best_c || (contribution == best_c && w > best_w)
        });
        if better {
            winning_method = Some((m, contribution, w));
        }
    }

    CombinedResult {
        angle,
        confidence,
        winning_method: winning_method.map(|(m, _, _)| m),
        per_angle_votes: votes,
        per_method_details: results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::{AbstainReason, Diagnostics};
    use proptest::prelude::*;

    fn vote(angle: Rotation, confidence: f64) -> EstimatorResult {
        EstimatorResult::new(angle, confidence, Diagnostics::Abstained(AbstainReason::NoEdges))
    }

    fn results(entries: &[(Method, EstimatorResult)]) -> BTreeMap<Method, EstimatorResult> {
        entries.iter().copied().collect()
    }

    #[test]
    fn test_weighted_majority() {
        let r = combine(
            results(&[
                (Method::EdgeLines, vote(Rotation::Deg90, 80.0)),
                (Method::BoundaryContour, vote(Rotation::Deg90, 90.0)),
                (Method::GradientDirection, vote(Rotation::Deg270, 100.0)),
                (Method::TextLines, vote(Rotation::Deg90, 60.0)),
            ]),
            &MethodWeights::default(),
        );
        assert_eq!(r.angle, Rotation::Deg90);
        assert_eq!(r.winning_method, Some(Method::BoundaryContour));
        let expected_90 = 0.8 * 0.25 + 0.9 * 0.35 + 0.6 * 0.25;
        assert!((r.per_angle_votes.get(Rotation::Deg90) - expected_90).abs() < 1e-12);
        assert!((r.per_angle_votes.get(Rotation::Deg270) - 0.15).abs() < 1e-12);
        let expected_conf = 100.0 * expected_90 / (expected_90 + 0.15);
        assert!((r.confidence - expected_conf).abs() < 1e-9);
        assert_eq!(r.correction(), Rotation::Deg270);
    }

    #[test]
    fn test_renormalises_over_active_estimators() {
        let r = combine(
            results(&[
                (Method::EdgeLines, EstimatorResult::abstain(AbstainReason::TooFewSegments)),
                (Method::BoundaryContour, EstimatorResult::abstain(AbstainReason::NoContour)),
                (Method::GradientDirection, vote(Rotation::Deg180, 40.0)),
                (Method::TextLines, EstimatorResult::abstain(AbstainReason::NoTextBlobs)),
            ]),
            &MethodWeights::default(),
        );
        assert_eq!(r.angle, Rotation::Deg180);
        // A lone voter gets the full weight.
        assert!((r.per_angle_votes.get(Rotation::Deg180) - 0.4).abs() < 1e-12);
        assert_eq!(r.confidence, 100.0);
        assert_eq!(r.winning_method, Some(Method::GradientDirection));
        assert_eq!(r.per_method_details.len(), 4);
    }

    #[test]
    fn test_no_active_estimators() {
        let r = combine(
            results(&[
                (Method::EdgeLines, EstimatorResult::abstain(AbstainReason::TooSmall)),
                (Method::TextLines, vote(Rotation::Deg90, 0.0)),
            ]),
            &MethodWeights::default(),
        );
        assert_eq!(r.angle, Rotation::Deg0);
        assert_eq!(r.confidence, 0.0);
        assert_eq!(r.winning_method, None);
        assert_eq!(r.per_angle_votes, AngleVotes([0.0; 4]));
        assert_eq!(r.per_method_details.len(), 2);
    }

    #[test]
    fn test_zero_weight_does_not_vote() {
        let weights = MethodWeights {
            gradient_direction: 0.0,
            ..MethodWeights::default()
        };
        let r = combine(
            results(&[(Method::GradientDirection, vote(Rotation::Deg90, 100.0))]),
            &weights,
        );
        assert_eq!(r.angle, Rotation::Deg0);
        assert_eq!(r.winning_method, None);
    }

    #[test]
    fn test_tie_prefers_heavier_backer_then_smaller_angle() {
        // Equal votes: 0.25 * 100 vs 0.25 * 100 for edge lines and text lines,
        // so the static weights tie too and the smaller angle wins.
        let r = combine(
            results(&[
                (Method::EdgeLines, vote(Rotation::Deg270, 100.0)),
                (Method::TextLines, vote(Rotation::Deg90, 100.0)),
            ]),
            &MethodWeights::default(),
        );
        assert_eq!(r.angle, Rotation::Deg90);
        assert_eq!(r.confidence, 50.0);

        // Equal votes with different backers: the heavier backer wins.
        let weights = MethodWeights {
            edge_lines: 0.2,
            boundary_contour: 0.4,
            gradient_direction: 0.0,
            text_lines: 0.0,
        };
        let r = combine(
            results(&[
                (Method::EdgeLines, vote(Rotation::Deg0, 100.0)),
                (Method::BoundaryContour, vote(Rotation::Deg180, 50.0)),
            ]),
            &weights,
        );
        assert_eq!(r.per_angle_votes.get(Rotation::Deg0), r.per_angle_votes.get(Rotation::Deg180));
        assert_eq!(r.angle, Rotation::Deg180);
        assert_eq!(r.winning_method, Some(Method::BoundaryContour));
    }

    fn arb_rotation() -> impl Strategy<Value = Rotation> {
        (0..4i64).prop_map(Rotation::from_quarter_turns)
    }

    fn arb_results() -> impl Strategy<Value = Vec<(Method, Rotation, f64)>> {
        prop::collection::vec(
            (0..4usize, arb_rotation(), prop_oneof![Just(0.0), 0.0..=100.0f64]),
            0..4,
        )
        .prop_map(|entries| {
            entries
                .into_iter()
                .map(|(m, r, c)| (Method::ALL[m], r, c))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_combiner_invariants(entries in arb_results()) {
            let map: BTreeMap<Method, EstimatorResult> = entries
                .iter()
                .map(|&(m, r, c)| (m, vote(r, c)))
                .collect();
            let result = combine(map.clone(), &MethodWeights::default());

            prop_assert!((0.0..=100.0).contains(&result.confidence));
            prop_assert!(result.per_angle_votes.iter().all(|(_, v)| v >= 0.0));
            let total = result.per_angle_votes.total();
            prop_assert!(total >= 0.0);
            let best = result.per_angle_votes.iter().map(|(_, v)| v).fold(0.0, f64::max);
            prop_assert_eq!(result.per_angle_votes.get(result.angle), best);
            if total > 0.0 {
                let expected = 100.0 * best / total;
                prop_assert!((result.confidence - expected).abs() < 1e-9);
                prop_assert!(result.winning_method.is_some());
            } else {
                prop_assert_eq!(result.angle, Rotation::Deg0);
                prop_assert_eq!(result.confidence, 0.0);
            }
            prop_assert_eq!(result.per_method_details, map);
        }

        #[test]
        fn prop_order_independent(entries in arb_results()) {
            let forward: BTreeMap<_, _> = entries.iter().map(|&(m, r, c)| (m, vote(r, c))).collect();
            let backward: BTreeMap<_, _> = entries.iter().rev().map(|&(m, r, c)| (m, vote(r, c))).collect();
            // Later duplicates overwrite earlier ones, so only compare when keys are unique.
            prop_assume!(forward.len() == entries.len());
            let a = combine(forward, &MethodWeights::default());
            let b = combine(backward, &MethodWeights::default());
            prop_assert_eq!(a, b);
        }
    }
}
