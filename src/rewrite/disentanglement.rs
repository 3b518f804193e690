//! Disentanglement rewriter (§4.4.3): a stricter alternative to
//! [`super::EntanglementRewriter`]. A *tangle* is an unchanged state every
//! incident transition of which is added or removed (no unchanged ones at
//! all, unlike entanglement which only forbids the mix while requiring
//! evidence of both). It is split into a fresh added copy and the original
//! state re-labeled removed, rather than two fresh copies.

use crate::combiner::{DiffAutomatonStateProperty, DiffKind, DiffProperty};
use crate::error::Result;
use crate::graph::{Graph, StateId};
use crate::rewrite::Rewriter;

#[derive(Debug, Default, Clone, Copy)]
pub struct DisentanglementRewriter;

fn is_tangle<T>(g: &Graph<DiffAutomatonStateProperty, DiffProperty<T>>, s: StateId) -> bool {
    let Some(prop) = g.state_property(s) else { return false };
    if prop.state_kind != DiffKind::Unchanged {
        return false;
    }
    let mut any_incident = false;
    for t in g.transitions_from(s).chain(g.transitions_to(s)) {
        any_incident = true;
        let (_, p, _) = g.transition(t).unwrap();
        if p.kind == DiffKind::Unchanged {
            return false;
        }
    }
    any_incident
}

impl<T> Rewriter<T> for DisentanglementRewriter {
    fn rewrite(&self, g: &mut Graph<DiffAutomatonStateProperty, DiffProperty<T>>) -> Result<bool> {
        let start = std::time::Instant::now();
        let mut changed = false;
        let candidates: Vec<StateId> = g.states().filter(|&s| is_tangle(g, s)).collect();

        for s in candidates {
            let prop = *g.state_property(s).expect("candidate state exists");
            let init_kind = prop.init_kind;

            let added_init = matches!(init_kind, Some(k) if k != DiffKind::Removed);
            let removed_init = matches!(init_kind, Some(k) if k != DiffKind::Added);

            let added_prop = DiffAutomatonStateProperty::new(prop.accepting, DiffKind::Added, added_init.then_some(DiffKind::Added)).expect("consistent by construction");
            let s_a = g.add_state(added_prop);
            if added_init {
                g.mark_initial(s_a);
            }

            let outgoing: Vec<_> = g.transitions_from(s).filter(|&t| g.transition(t).unwrap().1.kind == DiffKind::Added).collect();
            for t in outgoing {
                let (_, _, target) = g.transition(t).unwrap();
                let transition_prop = g.remove_transition(t).expect("transition exists");
                let target = if target == s { s_a } else { target };
                g.add_transition(s_a, transition_prop, target);
            }
            let incoming: Vec<_> = g.transitions_to(s).filter(|&t| g.transition(t).unwrap().1.kind == DiffKind::Added).collect();
            for t in incoming {
                let (source, _, _) = g.transition(t).unwrap();
                let transition_prop = g.remove_transition(t).expect("transition exists");
                let source = if source == s { s_a } else { source };
                g.add_transition(source, transition_prop, s_a);
            }

            let removed_prop = DiffAutomatonStateProperty::new(prop.accepting, DiffKind::Removed, removed_init.then_some(DiffKind::Removed)).expect("consistent by construction");
            g.set_state_property(s, removed_prop);
            if removed_init {
                g.mark_initial(s);
            } else {
                g.unmark_initial(s);
            }
            changed = true;
        }
        tracing::debug!("disentanglement rewriter took {} microseconds, changed={changed}", start.elapsed().as_micros());
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;

    #[test]
    fn splits_tangle_into_added_copy_and_relabels_original_removed() {
        let unchanged = DiffAutomatonStateProperty::new(false, DiffKind::Unchanged, None).unwrap();
        // Only state 0 is a tangle: every transition touching it is added or
        // removed. States 1 and 2 are kept out of the candidate set by the
        // unchanged edge between them, so only one split happens.
        let mut g: Graph<DiffAutomatonStateProperty, DiffProperty<()>> = GraphBuilder::new()
            .with_state_properties([unchanged, unchanged, unchanged])
            .with_edge(0, DiffProperty::new((), DiffKind::Added), 1)
            .with_edge(2, DiffProperty::new((), DiffKind::Removed), 0)
            .with_edge(1, DiffProperty::new((), DiffKind::Unchanged), 2)
            .build();

        let rewriter = DisentanglementRewriter;
        let changed = rewriter.rewrite(&mut g).unwrap();
        assert!(changed);
        assert_eq!(g.len(), 4);
        assert_eq!(g.transition_count(), 3);

        let original = g.states().find(|&s| g.state_property(s).unwrap().state_kind == DiffKind::Removed).unwrap();
        assert!(g.transitions_from(original).next().is_none());
    }

    #[test]
    fn self_loop_on_a_tangle_becomes_a_self_loop_on_the_added_copy() {
        // State 0 is a tangle via an Added self-loop alone. The self-loop
        // must end up on the fresh Added copy pointing at itself, not
        // dangling back at the relabeled-Removed original.
        let unchanged = DiffAutomatonStateProperty::new(false, DiffKind::Unchanged, None).unwrap();
        let mut g: Graph<DiffAutomatonStateProperty, DiffProperty<()>> = GraphBuilder::new()
            .with_state_properties([unchanged])
            .with_edge(0, DiffProperty::new((), DiffKind::Added), 0)
            .build();

        let rewriter = DisentanglementRewriter;
        let changed = rewriter.rewrite(&mut g).unwrap();
        assert!(changed);
        assert_eq!(g.transition_count(), 1);

        let added_copy = g
            .states()
            .find(|&s| g.state_property(s).unwrap().state_kind == DiffKind::Added)
            .expect("added copy exists");
        let loop_targets: Vec<_> = g.transitions_from(added_copy).map(|t| g.transition(t).unwrap().2).collect();
        assert_eq!(loop_targets, vec![added_copy]);
    }
}
