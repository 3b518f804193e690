//! Structural comparison and merge engine for labelled transition systems
//! and automata.
//!
//! The pipeline, leaves first: a [`graph::Graph`] data model, pluggable
//! [`combiner::Combiner`]s and [`hider::Hider`]s over user property types, a
//! [`scorer`] producing left×right affinity scores, a [`matcher`] turning
//! scores into a disjoint matching, a [`merger`] folding the two inputs
//! along that matching, and a set of [`rewrite`] passes that clean up the
//! merge into a readable difference artifact. [`orchestrator::compare`]
//! drives the whole pipeline.

pub mod combiner;
pub mod error;
pub mod graph;
pub mod hider;
pub mod matcher;
pub mod merger;
pub mod orchestrator;
pub mod rewrite;
pub mod scorer;

pub use combiner::{Combiner, DiffAutomatonStateProperty, DiffKind, DiffProperty};
pub use error::{DiffError, Result};
pub use graph::{Graph, GraphBuilder, GraphMetrics, StateId, TransitionId};
pub use hider::Hider;
pub use orchestrator::{compare, compare_and_rewrite, DiffConfig};

#[cfg(test)]
pub(crate) mod test_support;
