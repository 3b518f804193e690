//! Kuhn-Munkres matcher (§4.2.1): maximum-weight bipartite assignment over
//! a normalized score matrix, computed with the classic O(n^3) primal-dual
//! (Hungarian) algorithm.

use bimap::BiMap;

use crate::combiner::Combiners;
use crate::error::Result;
use crate::graph::Graph;
use crate::matcher::{normalize, Matcher, Matching};
use crate::scorer::Scores;

#[derive(Debug, Default, Clone, Copy)]
pub struct KuhnMunkresMatcher;

impl<S, T> Matcher<S, T> for KuhnMunkresMatcher {
    fn compute(&self, _left: &Graph<S, T>, _right: &Graph<S, T>, scores: &Scores, _combiners: &Combiners<S, T>) -> Result<Matching> {
        let start = std::time::Instant::now();
        let normalized = normalize(&scores.matrix);
        let rows = normalized.rows();
        let cols = normalized.cols();
        let mut map = BiMap::new();
        if rows == 0 || cols == 0 {
            return Ok(Matching::from_bimap(map));
        }

        // The classic algorithm assigns every row to a distinct column and
        // needs rows <= cols; transpose the problem when the graphs are the
        // other way around.
        let (n, m, transposed) = if rows <= cols { (rows, cols, false) } else { (cols, rows, true) };
        let cost = |i: usize, j: usize| -> f64 {
            let (r, c) = if transposed { (j, i) } else { (i, j) };
            let v = normalized.get(r, c);
            if v.is_finite() {
                1.0 - v
            } else {
                1e6
            }
        };

        let assignment = hungarian_min(n, m, &cost);

        for (row, col) in assignment {
            let (r, c) = if transposed { (col, row) } else { (row, col) };
            if scores.matrix.is_finite_at(r, c) {
                let _ = map.insert(scores.left_states[r], scores.right_states[c]);
            }
        }
        tracing::debug!("kuhn-munkres over {}x{} scores took {} microseconds", rows, cols, start.elapsed().as_micros());
        Ok(Matching::from_bimap(map))
    }
}

/// Assigns each of `n` rows to a distinct column among `m` (n <= m),
/// minimizing total cost. Returns `(row, col)` pairs for every row.
fn hungarian_min(n: usize, m: usize, cost: &impl Fn(usize, usize) -> f64) -> Vec<(usize, usize)> {
    const INF: f64 = f64::INFINITY;
    let mut u = vec![0.0_f64; n + 1];
    let mut v = vec![0.0_f64; m + 1];
    let mut p = vec![0usize; m + 1]; // p[j] = 1-based row assigned to column j
    let mut way = vec![0usize; m + 1];

    for i in 1..=n {
        p[0] = i;
        let mut j0 = 0usize;
        let mut minv = vec![INF; m + 1];
        let mut used = vec![false; m + 1];
        loop {
            used[j0] = true;
            let i0 = p[j0];
            let mut delta = INF;
            let mut j1 = 0usize;
            for j in 1..=m {
                if !used[j] {
                    let cur = cost(i0 - 1, j - 1) - u[i0] - v[j];
                    if cur < minv[j] {
                        minv[j] = cur;
                        way[j] = j0;
                    }
                    if minv[j] < delta {
                        delta = minv[j];
                        j1 = j;
                    }
                }
            }
            for j in 0..=m {
                if used[j] {
                    u[p[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }
            j0 = j1;
            if p[j0] == 0 {
                break;
            }
        }
        loop {
            let j1 = way[j0];
            p[j0] = p[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut result = Vec::with_capacity(n);
    for j in 1..=m {
        if p[j] != 0 {
            result.push((p[j] - 1, j - 1));
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combiner::Combiner;
    use crate::graph::GraphBuilder;

    struct Eq;
    impl<X: PartialEq + Clone> Combiner<X> for Eq {
        fn are_combinable(&self, a: &X, b: &X) -> bool {
            a == b
        }
        fn combine(&self, a: &X, _b: &X) -> X {
            a.clone()
        }
    }

    #[test]
    fn picks_maximum_weight_assignment_and_drops_forbidden() {
        // 2x2 matrix where the diagonal is forbidden and the off-diagonal
        // is the only legal, and best, assignment.
        let mut m = crate::scorer::ScoreMatrix::new(2, 2);
        m.set(0, 0, f64::NEG_INFINITY);
        m.set(0, 1, 0.9);
        m.set(1, 0, 0.8);
        m.set(1, 1, f64::NEG_INFINITY);

        let left: Graph<(), ()> = GraphBuilder::new().with_state_properties([(), ()]).build();
        let right: Graph<(), ()> = GraphBuilder::new().with_state_properties([(), ()]).build();
        let scores = Scores {
            matrix: m,
            left_states: left.states().collect(),
            right_states: right.states().collect(),
        };

        let state_c = Eq;
        let trans_c = Eq;
        let combiners = Combiners::new(&state_c, &trans_c);

        let matching = KuhnMunkresMatcher.compute(&left, &right, &scores, &combiners).unwrap();
        assert_eq!(matching.len(), 2);
        assert_eq!(matching.get(scores.left_states[0]), Some(scores.right_states[1]));
        assert_eq!(matching.get(scores.left_states[1]), Some(scores.right_states[0]));
    }
}
