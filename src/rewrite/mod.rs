//! Post-processing rewriters (§4.4): passes over a merged
//! `DiffAutomatonStateProperty`/`DiffProperty<T>` graph that fold away
//! artifacts of the merge into a more readable difference.
//!
//! Every rewriter reports whether it changed anything; [`run_to_fixed_point`]
//! drives the registered set round-robin until none do.

mod disentanglement;
mod entanglement;
mod local_redundancy;
mod skip_fork;
mod skip_join;
mod skippable;

pub use disentanglement::DisentanglementRewriter;
pub use entanglement::EntanglementRewriter;
pub use local_redundancy::LocalRedundancyRewriter;
pub use skip_fork::{InclusionPredicate, KindInclusion, SkipForkRewriter};
pub use skip_join::SkipJoinRewriter;
pub use skippable::has_skippable_structure;

use crate::combiner::{DiffAutomatonStateProperty, DiffProperty};
use crate::error::Result;
use crate::graph::Graph;

/// A single post-processing pass over the merged graph.
pub trait Rewriter<T> {
    fn rewrite(&self, g: &mut Graph<DiffAutomatonStateProperty, DiffProperty<T>>) -> Result<bool>;
}

/// Runs every rewriter once each, repeating the whole round as long as any
/// of them reported a change, until a full round changes nothing (§4.4
/// intro).
pub fn run_to_fixed_point<T>(
    rewriters: &[Box<dyn Rewriter<T> + '_>],
    g: &mut Graph<DiffAutomatonStateProperty, DiffProperty<T>>,
) -> Result<()> {
    let start = std::time::Instant::now();
    let mut round = 0usize;
    loop {
        round += 1;
        let mut changed = false;
        for rewriter in rewriters {
            if rewriter.rewrite(g)? {
                changed = true;
            }
        }
        tracing::trace!("rewrite round {round} changed={changed}");
        if !changed {
            tracing::debug!("rewrite fixed point reached after {round} round(s), {} microseconds", start.elapsed().as_micros());
            return Ok(());
        }
    }
}
