//! The "existence of skippable structure" oracle (§4.4.6), shared by the
//! skip-fork and skip-join rewriters.

use std::collections::HashSet;

use crate::graph::{Graph, StateId};

/// Returns whether skippable structure exists between `source` and `target`
/// in `g`, with `forbidden` barred from the interior (§4.4.6). `forbidden`
/// must be disjoint from `{source, target}`.
pub fn has_skippable_structure<S, T>(g: &Graph<S, T>, source: StateId, target: StateId, forbidden: &HashSet<StateId>) -> bool {
    has_skippable_structure_with(
        source,
        target,
        forbidden,
        |s| g.transitions_from(s).map(|t| g.transition(t).unwrap().2).collect(),
        |s| g.transitions_to(s).map(|t| g.transition(t).unwrap().0).collect(),
    )
}

/// Direction-generic core: `succ`/`pred` abstract over which edge direction
/// counts as "forward" from `source`, so the skip-join rewriter can reuse
/// this unchanged by swapping the two closures.
pub(crate) fn has_skippable_structure_with<FS, FP>(source: StateId, target: StateId, forbidden: &HashSet<StateId>, succ: FS, pred: FP) -> bool
where
    FS: Fn(StateId) -> Vec<StateId>,
    FP: Fn(StateId) -> Vec<StateId>,
{
    let mut forward_barrier = forbidden.clone();
    forward_barrier.insert(target);
    let reach = collect(source, &forward_barrier, &succ);

    let mut backward_barrier = forbidden.clone();
    backward_barrier.insert(source);
    let coreach = collect(target, &backward_barrier, &pred);

    let trim: HashSet<StateId> = reach.intersection(&coreach).copied().collect();

    if !trim.contains(&source) || !trim.contains(&target) {
        return false;
    }
    if trim.len() == 2 {
        return true;
    }

    let x: HashSet<StateId> = trim.iter().copied().filter(|s| !forbidden.contains(s) && *s != source && *s != target).collect();
    if x.is_empty() {
        return false;
    }
    for &s in &x {
        if !pred(s).iter().all(|p| x.contains(p) || *p == source) {
            return false;
        }
        if !succ(s).iter().all(|n| x.contains(n) || *n == target) {
            return false;
        }
    }
    true
}

fn collect<F: Fn(StateId) -> Vec<StateId>>(start: StateId, barrier: &HashSet<StateId>, neighbors: &F) -> HashSet<StateId> {
    let mut visited = HashSet::new();
    visited.insert(start);
    let mut stack = vec![start];
    while let Some(s) = stack.pop() {
        if barrier.contains(&s) {
            continue;
        }
        for n in neighbors(s) {
            if visited.insert(n) {
                stack.push(n);
            }
        }
    }
    visited
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;

    #[test]
    fn direct_edge_is_skippable() {
        let g: Graph<(), ()> = GraphBuilder::new().with_state_properties([(), ()]).with_edge(0, (), 1).build();
        let source = g.states().next().unwrap();
        let target = g.states().nth(1).unwrap();
        assert!(has_skippable_structure(&g, source, target, &HashSet::new()));
    }

    #[test]
    fn unreachable_target_is_not_skippable() {
        let g: Graph<(), ()> = GraphBuilder::new().with_state_properties([(), ()]).build();
        let source = g.states().next().unwrap();
        let target = g.states().nth(1).unwrap();
        assert!(!has_skippable_structure(&g, source, target, &HashSet::new()));
    }

    #[test]
    fn diamond_with_clean_interior_is_skippable() {
        let g: Graph<(), ()> = GraphBuilder::new()
            .with_state_properties([(), (), (), ()])
            .with_edge(0, (), 1)
            .with_edge(1, (), 3)
            .with_edge(0, (), 2)
            .with_edge(2, (), 3)
            .build();
        let states: Vec<_> = g.states().collect();
        assert!(has_skippable_structure(&g, states[0], states[3], &HashSet::new()));
    }

    #[test]
    fn interior_state_with_foreign_predecessor_is_not_skippable() {
        let g: Graph<(), ()> = GraphBuilder::new()
            .with_state_properties([(), (), (), (), ()])
            .with_edge(0, (), 1)
            .with_edge(1, (), 3)
            .with_edge(4, (), 1)
            .build();
        let states: Vec<_> = g.states().collect();
        assert!(!has_skippable_structure(&g, states[0], states[3], &HashSet::new()));
    }
}
