//! Skip-join rewriter (§4.4.5): dual of the skip-fork rewriter, operating on
//! pairs of *incoming* transitions to a shared target rather than pairs of
//! outgoing transitions from a shared source.

use std::collections::HashSet;

use crate::combiner::{Combiner, DiffAutomatonStateProperty, DiffProperty};
use crate::error::Result;
use crate::graph::{Graph, StateId, TransitionId};
use crate::hider::Hider;
use crate::rewrite::skip_fork::InclusionPredicate;
use crate::rewrite::skippable::has_skippable_structure_with;
use crate::rewrite::Rewriter;

pub struct SkipJoinRewriter<'a, CS, CT, H, I> {
    pub state_combiner: &'a CS,
    pub transition_combiner: &'a CT,
    pub hider: &'a H,
    pub inclusion: &'a I,
}

impl<'a, CS, CT, H, I> SkipJoinRewriter<'a, CS, CT, H, I> {
    pub fn new(state_combiner: &'a CS, transition_combiner: &'a CT, hider: &'a H, inclusion: &'a I) -> Self {
        Self {
            state_combiner,
            transition_combiner,
            hider,
            inclusion,
        }
    }
}

impl<'a, T, CS, CT, H, I> Rewriter<T> for SkipJoinRewriter<'a, CS, CT, H, I>
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
        tracing::debug!("skip-join rewriter took {} microseconds, changed={changed}", start.elapsed().as_micros());
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
    let targets: Vec<StateId> = g.states().collect();
    for target in targets {
        let incoming: Vec<TransitionId> = g.transitions_to(target).collect();
        for &left in &incoming {
            for &right in &incoming {
                if left == right {
                    continue;
                }
                if matches(g, target, left, right, state_combiner, transition_combiner, hider, inclusion) {
                    apply(g, target, left, right, state_combiner, transition_combiner, hider);
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
    target: StateId,
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
    let (left_source, left_prop, _) = g.transition(left).unwrap();
    let (right_source, right_prop, _) = g.transition(right).unwrap();

    if !transition_combiner.are_combinable(left_prop, right_prop) {
        return false;
    }
    // Guard 1 (dual): target, leftSource, rightSource pairwise distinct.
    if left_source == right_source || left_source == target || right_source == target {
        return false;
    }
    // Guard 2 (dual): rightSource is not accepting (the join-side analogue of "not initial").
    if g.is_accepting(right_source) {
        return false;
    }
    // Guard 3: leftSource.prop, rightSource.prop are state-combinable.
    let left_source_prop = g.state_property(left_source).unwrap();
    let right_source_prop = g.state_property(right_source).unwrap();
    if !state_combiner.are_combinable(left_source_prop, right_source_prop) {
        return false;
    }
    // Guard 4 (dual): rightSource has no outgoing transitions other than `right`.
    if g.transitions_from(right_source).any(|t| t != right) {
        return false;
    }
    // Guard 5 (dual): every incoming transition of rightSource is included in `right` once hidden.
    let hidden_right = hider.hide(right_prop);
    for t in g.transitions_to(right_source) {
        let (_, tp, _) = g.transition(t).unwrap();
        let hidden_t = hider.hide(tp);
        if !inclusion.is_included_in(&hidden_t, &hidden_right) {
            return false;
        }
    }
    // Guard 6: skippable structure between rightSource and leftSource, barred at target,
    // traversed against the edge direction (successors/predecessors swapped).
    let forbidden: HashSet<StateId> = [target].into_iter().collect();
    let ok = has_skippable_structure_with(
        right_source,
        left_source,
        &forbidden,
        |s| g.transitions_to(s).map(|t| g.transition(t).unwrap().0).collect(),
        |s| g.transitions_from(s).map(|t| g.transition(t).unwrap().2).collect(),
    );
    if !ok {
        return false;
    }
    true
}

fn apply<T, CS, CT, H>(
    g: &mut Graph<DiffAutomatonStateProperty, DiffProperty<T>>,
    target: StateId,
    left: TransitionId,
    right: TransitionId,
    state_combiner: &CS,
    transition_combiner: &CT,
    hider: &H,
) where
    T: Clone,
    CS: Combiner<DiffAutomatonStateProperty>,
    CT: Combiner<DiffProperty<T>>,
    H: Hider<DiffProperty<T>>,
{
    let (left_source, left_prop, _) = g.transition(left).unwrap();
    let (right_source, right_prop, _) = g.transition(right).unwrap();
    let left_prop = left_prop.clone();
    let right_prop = right_prop.clone();

    let right_source_prop = *g.state_property(right_source).unwrap();
    let synthetic = DiffAutomatonStateProperty::new(right_source_prop.accepting, left_prop.kind, None).expect("None init_kind is always consistent");
    let combined_state = state_combiner.combine(&right_source_prop, &synthetic);
    g.set_state_property(right_source, combined_state);

    g.remove_transition(right);
    let combined_transition = transition_combiner.combine(&left_prop, &right_prop);
    g.add_transition(right_source, combined_transition, target);

    let hidden_left = hider.hide(&left_prop);
    g.add_transition(left_source, hidden_left, right_source);

    g.remove_transition(left);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combiner::{DiffAutomatonStatePropertyCombiner, DiffKind, DiffPropertyCombiner};
    use crate::graph::GraphBuilder;
    use crate::hider::DiffPropertyHider;
    use crate::rewrite::KindInclusion;

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
        // leftSource(1) --left--> target(0)
        // rightSource(2) --right--> target(0)
        // somewhere(3) --tail--> rightSource(2)
        // rightSource(2) --precondition--> leftSource(1)
        let mut g: Graph<DiffAutomatonStateProperty, DiffProperty<char>> = GraphBuilder::new()
            .with_state_properties([u, u, u, u])
            .with_edge(1, DiffProperty::new('a', DiffKind::Removed), 0)
            .with_edge(2, DiffProperty::new('a', DiffKind::Removed), 0)
            .with_edge(3, DiffProperty::new('a', DiffKind::Removed), 2)
            .with_edge(1, DiffProperty::new('a', DiffKind::Removed), 2)
            .build();

        let state_c = DiffAutomatonStatePropertyCombiner;
        let transition_c = DiffPropertyCombiner::new(CharEq);
        let hider = DiffPropertyHider;
        let inclusion = KindInclusion;
        let rewriter = SkipJoinRewriter::new(&state_c, &transition_c, &hider, &inclusion);

        let changed = rewriter.rewrite(&mut g).unwrap();
        assert!(changed);
        let target = g.states().next().unwrap();
        assert_eq!(g.transitions_to(target).count(), 1);
    }
}
