//! State similarity scoring (§4.1): affinity matrices between the states of
//! two graphs, produced either by a finite local refinement or by solving
//! the refinement's fixed point directly as a linear system.
//!
//! Every scorer variant implements the same [`Scorer`] trait and shares the
//! directional-formula machinery in this module; `local`, `global` and
//! `dynamic` only differ in how they drive that formula to a fixed point.

mod directional;
mod local;
mod global;
mod dynamic;

pub use directional::{DirectionalContext, LtsContext, PlainContext};
pub use local::LocalScorer;
pub use global::GlobalScorer;
pub use dynamic::DynamicScorer;

use crate::combiner::Combiners;
use crate::error::{DiffError, Result};
use crate::graph::{Graph, StateId};

/// Which side of a transition a pair's neighbors are drawn from: outgoing
/// transitions (forward) or incoming transitions (backward).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// A dense left×right affinity matrix. Entries are either finite in
/// `[0, 1]` or `f64::NEG_INFINITY` marking an incompatible pair.
#[derive(Debug, Clone)]
pub struct ScoreMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl ScoreMatrix {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.cols + col] = value;
    }

    pub fn is_finite_at(&self, row: usize, col: usize) -> bool {
        self.get(row, col).is_finite()
    }
}

impl std::fmt::Display for ScoreMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use tabled::{builder::Builder, settings::Style};
        let mut builder = Builder::default();
        for row in 0..self.rows {
            let mut record = Vec::with_capacity(self.cols);
            for col in 0..self.cols {
                let v = self.get(row, col);
                record.push(if v.is_finite() {
                    format!("{v:.3}")
                } else {
                    "-inf".to_string()
                });
            }
            builder.push_record(record);
        }
        let mut table = builder.build();
        table.with(Style::rounded());
        write!(f, "{table}")
    }
}

/// A score matrix together with the row/column state ids it was computed
/// over, so callers can translate matrix indices back into graph states.
#[derive(Debug, Clone)]
pub struct Scores {
    pub matrix: ScoreMatrix,
    pub left_states: Vec<StateId>,
    pub right_states: Vec<StateId>,
}

/// Produces a [`Scores`] for a pair of graphs. Implemented by the local,
/// global and dynamic scorers.
pub trait Scorer<S, T> {
    fn score(&self, left: &Graph<S, T>, right: &Graph<S, T>, combiners: &Combiners<S, T>) -> Result<Scores>;
}

fn require_nonempty<S, T>(left: &Graph<S, T>, right: &Graph<S, T>) -> Result<()> {
    if left.is_empty() || right.is_empty() {
        return Err(DiffError::Precondition(
            "scorer requires both graphs to have at least one state".to_string(),
        ));
    }
    Ok(())
}

fn check_alpha(alpha: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&alpha) {
        return Err(DiffError::Precondition(format!(
            "attenuation factor {alpha} outside [0,1]"
        )));
    }
    Ok(())
}

/// Combines the independently computed forward and backward matrices into
/// the final score matrix (§4.1 "Final conversion"): `-inf` if either
/// direction is negative, else the average.
fn finalize(fwd: &[f64], bwd: &[f64], rows: usize, cols: usize) -> ScoreMatrix {
    let mut out = ScoreMatrix::new(rows, cols);
    for i in 0..fwd.len() {
        let f = fwd[i];
        let b = bwd[i];
        let value = if f < 0.0 || b < 0.0 {
            f64::NEG_INFINITY
        } else {
            (f + b) / 2.0
        };
        out.data[i] = value;
    }
    out
}
