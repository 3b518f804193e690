//! Turning a score matrix (or, for the brute-force variant, the raw graph
//! structure) into a disjoint, compatibility-preserving matching between
//! left and right states (§4.2).

mod brute_force;
mod dynamic;
mod kuhn_munkres;
mod walkinshaw;

pub use brute_force::{BruteForceMatcher, ObjectiveHook, PlainObjective};
pub use dynamic::DynamicMatcher;
pub use kuhn_munkres::KuhnMunkresMatcher;
pub use walkinshaw::{FallbackHook, LtsInitialFallback, NoFallback, WalkinshawMatcher};

use std::collections::HashMap;

use bimap::BiMap;

use crate::combiner::Combiners;
use crate::error::Result;
use crate::graph::{Graph, StateId};
use crate::scorer::{ScoreMatrix, Scores};

/// A disjoint, injective partial map from left states to right states.
/// Built via a [`bimap::BiMap`] so the injectivity invariant is enforced at
/// construction; frozen into a plain lookup once complete.
#[derive(Debug, Clone, Default)]
pub struct Matching {
    pairs: HashMap<StateId, StateId>,
}

impl Matching {
    pub(crate) fn from_bimap(map: BiMap<StateId, StateId>) -> Self {
        Self {
            pairs: map.into_iter().collect(),
        }
    }

    pub fn get(&self, left: StateId) -> Option<StateId> {
        self.pairs.get(&left).copied()
    }

    pub fn contains_left(&self, left: StateId) -> bool {
        self.pairs.contains_key(&left)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StateId, StateId)> + '_ {
        self.pairs.iter().map(|(&l, &r)| (l, r))
    }
}

/// Contract shared by every matcher variant (§4.2): `compute` returns a
/// [`Matching`] whose pairs are state-combinable and injective on both
/// sides. Score-based matchers (Kuhn-Munkres, Walkinshaw) read `scores`;
/// the brute-force matcher ignores it and searches the graph directly.
pub trait Matcher<S, T> {
    fn compute(
        &self,
        left: &Graph<S, T>,
        right: &Graph<S, T>,
        scores: &Scores,
        combiners: &Combiners<S, T>,
    ) -> Result<Matching>;
}

/// Score-matrix normalization (§4.2.4): rescale finite entries into
/// `[0, 1]`, leaving `-inf` untouched. A no-op if already in range, or if
/// the matrix is empty.
pub fn normalize(matrix: &ScoreMatrix) -> ScoreMatrix {
    let (rows, cols) = (matrix.rows(), matrix.cols());
    if rows == 0 || cols == 0 {
        return ScoreMatrix::new(rows, cols);
    }

    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut any_finite = false;
    for r in 0..rows {
        for c in 0..cols {
            let v = matrix.get(r, c);
            if v.is_finite() {
                any_finite = true;
                min = min.min(v);
                max = max.max(v);
            }
        }
    }
    if !any_finite {
        return matrix.clone();
    }
    if min >= 0.0 && max <= 1.0 {
        return matrix.clone();
    }

    let mut out = ScoreMatrix::new(rows, cols);
    for r in 0..rows {
        for c in 0..cols {
            let v = matrix.get(r, c);
            if !v.is_finite() {
                out.set(r, c, v);
                continue;
            }
            let scaled = if min == max { 1.0 } else { (v - min) / (max - min) };
            out.set(r, c, scaled);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_is_noop_when_already_unit_range() {
        let mut m = ScoreMatrix::new(1, 2);
        m.set(0, 0, 0.2);
        m.set(0, 1, f64::NEG_INFINITY);
        let n = normalize(&m);
        assert_eq!(n.get(0, 0), 0.2);
        assert!(n.get(0, 1).is_infinite());
    }

    #[test]
    fn normalize_rescales_min_max() {
        let mut m = ScoreMatrix::new(1, 3);
        m.set(0, 0, -2.0);
        m.set(0, 1, 2.0);
        m.set(0, 2, f64::NEG_INFINITY);
        let n = normalize(&m);
        assert_eq!(n.get(0, 0), 0.0);
        assert_eq!(n.get(0, 1), 1.0);
        assert!(n.get(0, 2).is_infinite());
    }

    #[test]
    fn normalize_maps_constant_finite_to_one() {
        let mut m = ScoreMatrix::new(1, 2);
        m.set(0, 0, 3.0);
        m.set(0, 1, 3.0);
        let n = normalize(&m);
        assert_eq!(n.get(0, 0), 1.0);
        assert_eq!(n.get(0, 1), 1.0);
    }

    #[test]
    fn normalize_empty_is_noop() {
        let m = ScoreMatrix::new(0, 0);
        let n = normalize(&m);
        assert_eq!(n.rows(), 0);
        assert_eq!(n.cols(), 0);
    }
}
