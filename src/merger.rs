//! The merger (§4.3): folds two graphs into one fresh graph along a
//! matching, combining matched states/transitions and projecting unmatched
//! ones through unchanged.

use std::collections::{HashMap, HashSet};

use crate::combiner::Combiners;
use crate::graph::{Graph, StateId};
use crate::matcher::Matching;

/// The merged graph plus the two projections from source states to their
/// image in the merge, needed by the rewriters' bookkeeping.
pub struct MergeResult<S, T> {
    pub graph: Graph<S, T>,
    pub left_projection: HashMap<StateId, StateId>,
    pub right_projection: HashMap<StateId, StateId>,
}

/// Builds the merged graph for a matching `m: left -> right` (§4.3).
pub fn merge<S: Clone, T: Clone>(left: &Graph<S, T>, right: &Graph<S, T>, matching: &Matching, combiners: &Combiners<S, T>) -> MergeResult<S, T> {
    let start = std::time::Instant::now();
    let mut graph = Graph::new();
    let mut left_projection = HashMap::new();
    let mut right_projection = HashMap::new();

    let mut matched: Vec<(StateId, StateId)> = matching.iter().collect();
    matched.sort_by(|&(l1, r1), &(l2, r2)| {
        left.is_initial(l2)
            .cmp(&left.is_initial(l1))
            .then_with(|| right.is_initial(r2).cmp(&right.is_initial(r1)))
            .then_with(|| l1.cmp(&l2))
            .then_with(|| r1.cmp(&r2))
    });
    let matched_right: HashSet<StateId> = matched.iter().map(|&(_, r)| r).collect();

    for &(l, r) in &matched {
        let lp = left.state_property(l).expect("matched left state exists");
        let rp = right.state_property(r).expect("matched right state exists");
        let combined = combiners.state.combine(lp, rp);
        let new_id = graph.add_state(combined);
        left_projection.insert(l, new_id);
        right_projection.insert(r, new_id);
        if left.is_initial(l) || right.is_initial(r) {
            graph.mark_initial(new_id);
        }
        if left.is_accepting(l) || right.is_accepting(r) {
            graph.mark_accepting(new_id);
        }
    }

    for l in left.states() {
        if matching.contains_left(l) {
            continue;
        }
        let prop = left.state_property(l).expect("live state").clone();
        let new_id = graph.add_state(prop);
        left_projection.insert(l, new_id);
        if left.is_initial(l) {
            graph.mark_initial(new_id);
        }
        if left.is_accepting(l) {
            graph.mark_accepting(new_id);
        }
    }

    for r in right.states() {
        if matched_right.contains(&r) {
            continue;
        }
        let prop = right.state_property(r).expect("live state").clone();
        let new_id = graph.add_state(prop);
        right_projection.insert(r, new_id);
        if right.is_initial(r) {
            graph.mark_initial(new_id);
        }
        if right.is_accepting(r) {
            graph.mark_accepting(new_id);
        }
    }

    for &(l, r) in &matched {
        let l_transitions: Vec<_> = left.transitions_from(l).collect();
        let r_transitions: Vec<_> = right.transitions_from(r).collect();
        let mut r_available: Vec<bool> = vec![true; r_transitions.len()];

        for lt in l_transitions {
            let (_, l_prop, l_target) = left.transition(lt).expect("live transition");
            let mut picked = None;
            for (idx, &rt) in r_transitions.iter().enumerate() {
                if !r_available[idx] {
                    continue;
                }
                let (_, r_prop, r_target) = right.transition(rt).expect("live transition");
                if !combiners.transition.are_combinable(l_prop, r_prop) {
                    continue;
                }
                if right_projection.get(&r_target) != left_projection.get(&l_target) {
                    continue;
                }
                picked = Some((idx, r_prop.clone(), r_target));
                break;
            }
            if let Some((idx, r_prop, _)) = picked {
                r_available[idx] = false;
                let combined = combiners.transition.combine(l_prop, &r_prop);
                graph.add_transition(left_projection[&l], combined, left_projection[&l_target]);
            } else {
                graph.add_transition(left_projection[&l], l_prop.clone(), left_projection[&l_target]);
            }
        }

        for (idx, &rt) in r_transitions.iter().enumerate() {
            if !r_available[idx] {
                continue;
            }
            let (_, r_prop, r_target) = right.transition(rt).expect("live transition");
            graph.add_transition(right_projection[&r], r_prop.clone(), right_projection[&r_target]);
        }
    }

    for l in left.states() {
        if matching.contains_left(l) {
            continue;
        }
        for lt in left.transitions_from(l) {
            let (_, l_prop, l_target) = left.transition(lt).expect("live transition");
            graph.add_transition(left_projection[&l], l_prop.clone(), left_projection[&l_target]);
        }
    }

    for r in right.states() {
        if matched_right.contains(&r) {
            continue;
        }
        for rt in right.transitions_from(r) {
            let (_, r_prop, r_target) = right.transition(rt).expect("live transition");
            graph.add_transition(right_projection[&r], r_prop.clone(), right_projection[&r_target]);
        }
    }

    tracing::debug!(
        "merge of {} matched pairs into {} states took {} microseconds",
        matching.len(),
        graph.len(),
        start.elapsed().as_micros()
    );
    MergeResult {
        graph,
        left_projection,
        right_projection,
    }
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
    fn merging_identical_graph_with_itself_is_size_preserving() {
        let g: Graph<bool, char> = GraphBuilder::new()
            .with_state_properties([true, false])
            .with_edge(0, 'a', 1)
            .with_initial(0)
            .build();

        let mut bimap = bimap::BiMap::new();
        for s in g.states() {
            let _ = bimap.insert(s, s);
        }
        let matching = Matching::from_bimap(bimap);

        let state_c = Eq;
        let trans_c = Eq;
        let combiners = Combiners::new(&state_c, &trans_c);
        let result = merge(&g, &g, &matching, &combiners);

        assert_eq!(result.graph.len(), 2);
        assert_eq!(result.graph.transition_count(), 1);
        assert_eq!(result.graph.metrics().initial_states, 1);
    }

    #[test]
    fn unmatched_states_are_projected_unchanged() {
        let left: Graph<char, ()> = GraphBuilder::new().with_state_properties(['a']).build();
        let right: Graph<char, ()> = GraphBuilder::new().with_state_properties(['b']).build();
        let matching = Matching::default();

        let state_c = Eq;
        let trans_c = Eq;
        let combiners = Combiners::new(&state_c, &trans_c);
        let result = merge(&left, &right, &matching, &combiners);

        assert_eq!(result.graph.len(), 2);
    }
}
