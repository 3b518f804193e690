//! Error types surfaced by every fallible public operation.
//!
//! Every failure kind from the design is reported synchronously and never
//! retried internally: callers decide whether to retry with different
//! configuration (e.g. a different scorer after a [`DiffError::Numerical`]).

/// An error produced by the scoring, matching, merging or rewriting stages
/// of the comparison pipeline.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// A programmer-visible precondition was violated: an empty graph was
    /// passed to a non-trivial scorer, a tunable was out of range, a score
    /// escaped `[-1, 1]`, or similar.
    #[error("precondition violation: {0}")]
    Precondition(String),

    /// The global scorer's linear system was singular and could not be
    /// solved uniquely.
    #[error("numerical failure solving global score system: {0}")]
    Numerical(String),

    /// A rewriter left the graph in a state that violates one of its own
    /// invariants (e.g. entanglement left residual transitions on the
    /// original state). The graph must not be used further.
    #[error("structural invariant violated during rewriting: {0}")]
    Invariant(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DiffError>;
