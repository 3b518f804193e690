//! Skip-fork rewriter (§4.4.4): turns a fork where one branch's behaviour is
//! wholly contained in the other's into a single transition plus an explicit
//! "skip" edge back onto the absorbed branch.

use std::collections::HashSet;

use crate::combiner::{Combiner, DiffAutomatonStateProperty, DiffProperty};
use crate::error::Result;
use crate::graph::{Graph, StateId, TransitionId};
use crate::hider::Hider;
use crate::rewrite::skippable::has_skippable_structure;
use crate::rewrite::Rewriter;

/// "All combinable information in `a` is contained in `b`" (§4.4.4 guard 5).
pub trait InclusionPredicate<X> {
    fn is_included_in(&self, a: &X, b: &X) -> bool;
}

/// An inclusion predicate over [`DiffProperty`] that compares inner values
/// only, ignoring `.kind` entirely. Callers apply this post-[`Hider`], where
/// both sides' kinds have already been neutralized to `Unchanged`, so the
/// diff kind carries no distinguishing information left to compare.
#[derive(Debug, Default, Clone, Copy)]
pub struct KindInclusion;

impl<T: PartialEq> InclusionPredicate<DiffProperty<T>> for KindInclusion {
    fn is_included_in(&self, a: &DiffProperty<T>, b: &DiffProperty<T>) -> bool {
        a.inner == b.inner
    }
}

pub struct SkipForkRewriter<'a, CS, CT, H, I> {
    pub state_combiner: &'a CS,
    pub transition_combiner: &'a CT,
    pub hider: &'a H,
    pub inclusion: &'a I,
}

impl<'a, CS, CT, H, I> SkipForkRewriter<'a, CS, CT, H, I> {
    pub fn new(state_combiner: &'a CS, transition_combiner: &'a CT, hider: &'a H, inclusion: &'a I) -> Self {
        Self {
            state_combiner,
            transition_combiner,
            hider,
            inclusion,
        }
    }
}

impl<'a, T, CS, CT, H, I> Rewriter<T> for SkipForkRewriter<'a, CS, CT, H, I>
where
    T: Clone,
    CS: Combiner<DiffAutomatonStateProperty>,
    CT: Combiner<DiffProperty<T>>,
    H: Hider<DiffProperty<T>>,
    I: InclusionPredicate<DiffProperty<T>>,
{
    fn rewrite(&self, g: &mut Graph<DiffAutomatonStateProperty, DiffProperty<T>>) -> Result<bool> {
        let start = std::time::Instant::now();
        let mut changed = false;
        while try_rewrite_one(g, self.state_combiner, self.transition_combiner, self.hider, self.inclusion)? {
            changed = true;
        }
        tracing::debug!("skip-fork rewriter took {} microseconds, changed={changed}", start.elapsed().as_micros());
        Ok(changed)
    }
}

fn try_rewrite_one<T, CS, CT, H, I>(
    g: &mut Graph<DiffAutomatonStateProperty, DiffProperty<T>>,
    state_combiner: &CS,
    transition_combiner: &CT,
    hider: &H,
    inclusion: &I,
) -> Result<bool>
where
    T: Clone,
    CS: Combiner<DiffAutomatonStateProperty>,
    CT: Combiner<DiffProperty<T>>,
    H: Hider<DiffProperty<T>>,
    I: InclusionPredicate<DiffProperty<T>>,
{
    let sources: Vec<StateId> = g.states().collect();
    for source in sources {
        let outgoing: Vec<TransitionId> = g.transitions_from(source).collect();
        for &left in &outgoing {
            for &right in &outgoing {
                if left == right {
                    continue;
                }
                if matches(g, source, left, right, state_combiner, transition_combiner, hider, inclusion) {
                    apply(g, source, left, right, state_combiner, transition_combiner, hider);
                    return Ok(true);
                }
            }
        }
    }
    Ok(false)
}

#[allow(clippy::too_many_arguments)]
fn matches<T, CS, CT, H, I>(
    g: &Graph<DiffAutomatonStateProperty, DiffProperty<T>>,
    source: StateId,
    left: TransitionId,
    right: TransitionId,
    state_combiner: &CS,
    transition_combiner: &CT,
    hider: &H,
    inclusion: &I,
) -> bool
where
    CS: Combiner<DiffAutomatonStateProperty>,
    CT: Combiner<DiffProperty<T>>,
    H: Hider<DiffProperty<T>>,
    I: InclusionPredicate<DiffProperty<T>>,
{
    let (_, left_prop, left_target) = g.transition(left).unwrap();
    let (_, right_prop, right_target) = g.transition(right).unwrap();

    if !transition_combiner.are_combinable(left_prop, right_prop) {
        return false;
    }
    // Guard 1: source, leftTarget, rightTarget pairwise distinct.
    if left_target == right_target || left_target == source || right_target == source {
        return false;
    }
    // Guard 2: rightTarget is not initial.
    if g.is_initial(right_target) {
        return false;
    }
    // Guard 3: leftTarget.prop, rightTarget.prop are state-combinable.
    let left_target_prop = g.state_property(left_target).unwrap();
    let right_target_prop = g.state_property(right_target).unwrap();
    if !state_combiner.are_combinable(left_target_prop, right_target_prop) {
        return false;
    }
    // Guard 4: rightTarget has no incoming transitions other than `right`.
    if g.transitions_to(right_target).any(|t| t != right) {
        return false;
    }
    // Guard 5: every outgoing transition of rightTarget is included in `right` once hidden.
    let hidden_right = hider.hide(right_prop);
    for t in g.transitions_from(right_target) {
        let (_, tp, _) = g.transition(t).unwrap();
        let hidden_t = hider.hide(tp);
        if !inclusion.is_included_in(&hidden_t, &hidden_right) {
            return false;
        }
    }
    // Guard 6: skippable structure between rightTarget and leftTarget, barred at source.
    let forbidden: HashSet<StateId> = [source].into_iter().collect();
    if !has_skippable_structure(g, right_target, left_target, &forbidden) {
        return false;
    }
    true
}

fn apply<T, CS, CT, H>(g: &mut Graph<DiffAutomatonStateProperty, DiffProperty<T>>, source: StateId, left: TransitionId, right: TransitionId, state_combiner: &CS, transition_combiner: &CT, hider: &H)
where
    T: Clone,
    CS: Combiner<DiffAutomatonStateProperty>,
    CT: Combiner<DiffProperty<T>>,
    H: Hider<DiffProperty<T>>,
{
    let (_, left_prop, left_target) = g.transition(left).unwrap();
    let (_, right_prop, right_target) = g.transition(right).unwrap();
    let left_prop = left_prop.clone();
    let right_prop = right_prop.clone();

    let right_target_prop = *g.state_property(right_target).unwrap();
    let synthetic = DiffAutomatonStateProperty::new(right_target_prop.accepting, left_prop.kind, None).expect("None init_kind is always consistent");
    let combined_state = state_combiner.combine(&right_target_prop, &synthetic);
    g.set_state_property(right_target, combined_state);

    g.remove_transition(right);
    let combined_transition = transition_combiner.combine(&left_prop, &right_prop);
    g.add_transition(source, combined_transition, right_target);

    let hidden_left = hider.hide(&left_prop);
    g.add_transition(right_target, hidden_left, left_target);

    g.remove_transition(left);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combiner::{DiffAutomatonStatePropertyCombiner, DiffKind, DiffPropertyCombiner};
    use crate::graph::GraphBuilder;
    use crate::hider::DiffPropertyHider;

    struct CharEq;
    impl Combiner<char> for CharEq {
        fn are_combinable(&self, a: &char, b: &char) -> bool {
            a == b
        }
        fn combine(&self, a: &char, _b: &char) -> char {
            *a
        }
    }

    #[test]
    fn absorbs_a_branch_whose_behaviour_is_contained_in_the_other() {
        let u = DiffAutomatonStateProperty::new(false, DiffKind::Unchanged, None).unwrap();
        let u_init = DiffAutomatonStateProperty::new(false, DiffKind::Unchanged, Some(DiffKind::Unchanged)).unwrap();
        // source --left(removed 'a')--> leftTarget
        // source --right(removed 'a')--> rightTarget --tail(removed 'b')--> somewhere
        let mut g: Graph<DiffAutomatonStateProperty, DiffProperty<char>> = GraphBuilder::new()
            .with_state_properties([u_init, u, u, u])
            .with_edge(0, DiffProperty::new('a', DiffKind::Removed), 1)
            .with_edge(0, DiffProperty::new('a', DiffKind::Removed), 2)
            .with_edge(2, DiffProperty::new('a', DiffKind::Removed), 3)
            .with_edge(2, DiffProperty::new('a', DiffKind::Removed), 1)
            .build();

        let state_c = DiffAutomatonStatePropertyCombiner;
        let transition_c = DiffPropertyCombiner::new(CharEq);
        let hider = DiffPropertyHider;
        let inclusion = KindInclusion;
        let rewriter = SkipForkRewriter::new(&state_c, &transition_c, &hider, &inclusion);

        let changed = rewriter.rewrite(&mut g).unwrap();
        assert!(changed);
        // leftTarget (1) is now only reachable via the skip edge from rightTarget (2).
        let source = g.states().next().unwrap();
        let outgoing: Vec<_> = g.transitions_from(source).collect();
        assert_eq!(outgoing.len(), 1);
    }
}
