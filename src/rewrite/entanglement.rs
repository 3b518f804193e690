//! Entanglement rewriter (§4.4.2): splits an unchanged state that has both
//! added and removed incident transitions (but no unchanged ones) into a
//! pure-added and a pure-removed copy.

use crate::combiner::{DiffAutomatonStateProperty, DiffKind, DiffProperty};
use crate::error::{DiffError, Result};
use crate::graph::{Graph, StateId};
use crate::rewrite::Rewriter;

#[derive(Debug, Default, Clone, Copy)]
pub struct EntanglementRewriter;

fn is_entangled<T>(g: &Graph<DiffAutomatonStateProperty, DiffProperty<T>>, s: StateId) -> bool {
    let Some(prop) = g.state_property(s) else { return false };
    if prop.state_kind != DiffKind::Unchanged {
        return false;
    }
    let mut has_unchanged = false;
    let mut has_added = false;
    let mut has_removed = false;
    for t in g.transitions_from(s).chain(g.transitions_to(s)) {
        let (_, p, _) = g.transition(t).unwrap();
        match p.kind {
            DiffKind::Unchanged => has_unchanged = true,
            DiffKind::Added => has_added = true,
            DiffKind::Removed => has_removed = true,
        }
    }
    !has_unchanged && has_added && has_removed
}

impl<T> Rewriter<T> for EntanglementRewriter {
    fn rewrite(&self, g: &mut Graph<DiffAutomatonStateProperty, DiffProperty<T>>) -> Result<bool> {
        let start = std::time::Instant::now();
        let mut changed = false;
        let candidates: Vec<StateId> = g.states().filter(|&s| is_entangled(g, s)).collect();

        for s in candidates {
            let prop = *g.state_property(s).expect("candidate state exists");
            let init_kind = prop.init_kind;
            let is_initial = g.is_initial(s);

            let added_init = is_initial && matches!(init_kind, Some(DiffKind::Unchanged) | Some(DiffKind::Added));
            let removed_init = is_initial && matches!(init_kind, Some(DiffKind::Unchanged) | Some(DiffKind::Removed));

            let added_prop = DiffAutomatonStateProperty::new(prop.accepting, DiffKind::Added, added_init.then_some(DiffKind::Added)).expect("consistent by construction");
            let removed_prop = DiffAutomatonStateProperty::new(prop.accepting, DiffKind::Removed, removed_init.then_some(DiffKind::Removed)).expect("consistent by construction");

            let s_a = g.add_state(added_prop);
            let s_r = g.add_state(removed_prop);
            if added_init {
                g.mark_initial(s_a);
            }
            if removed_init {
                g.mark_initial(s_r);
            }

            move_incident(g, s, s_a, DiffKind::Added);
            move_incident(g, s, s_r, DiffKind::Removed);

            if g.transitions_from(s).next().is_some() || g.transitions_to(s).next().is_some() {
                return Err(DiffError::Invariant(format!(
                    "entanglement rewrite left residual transitions on state {s}"
                )));
            }
            g.remove_state(s);
            changed = true;
        }
        tracing::debug!("entanglement rewriter took {} microseconds, changed={changed}", start.elapsed().as_micros());
        Ok(changed)
    }
}

fn move_incident<T>(g: &mut Graph<DiffAutomatonStateProperty, DiffProperty<T>>, from: StateId, to: StateId, kind: DiffKind) {
    let outgoing: Vec<_> = g.transitions_from(from).filter(|&t| g.transition(t).unwrap().1.kind == kind).collect();
    for t in outgoing {
        let (_, _, target) = g.transition(t).unwrap();
        let prop = g.remove_transition(t).expect("transition exists");
        let target = if target == from { to } else { target };
        g.add_transition(to, prop, target);
    }
    let incoming: Vec<_> = g.transitions_to(from).filter(|&t| g.transition(t).unwrap().1.kind == kind).collect();
    for t in incoming {
        let (source, _, _) = g.transition(t).unwrap();
        let prop = g.remove_transition(t).expect("transition exists");
        let source = if source == from { to } else { source };
        g.add_transition(source, prop, to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;

    #[test]
    fn splits_entangled_state_into_added_and_removed_copies() {
        let unchanged = DiffAutomatonStateProperty::new(false, DiffKind::Unchanged, None).unwrap();
        let mut g: Graph<DiffAutomatonStateProperty, DiffProperty<()>> = GraphBuilder::new()
            .with_state_properties([unchanged, unchanged, unchanged])
            .with_edge(0, DiffProperty::new((), DiffKind::Added), 1)
            .with_edge(2, DiffProperty::new((), DiffKind::Removed), 0)
            .build();
        // state 0 has one Added outgoing and one Removed incoming, no Unchanged: entangled.

        let rewriter = EntanglementRewriter;
        let changed = rewriter.rewrite(&mut g).unwrap();
        assert!(changed);
        assert_eq!(g.len(), 4); // states 1,2 survive, plus 2 new copies of state 0
        assert_eq!(g.transition_count(), 2);
    }

    #[test]
    fn self_loop_on_entangled_state_becomes_a_self_loop_on_its_copy() {
        // State 0 carries an Added self-loop plus a Removed incoming edge
        // from state 1, so it's entangled with no Unchanged transitions.
        // The Added self-loop must land as a self-loop on the fresh Added
        // copy, not as a dangling edge into the (removed) original.
        let unchanged = DiffAutomatonStateProperty::new(false, DiffKind::Unchanged, None).unwrap();
        let mut g: Graph<DiffAutomatonStateProperty, DiffProperty<()>> = GraphBuilder::new()
            .with_state_properties([unchanged, unchanged])
            .with_edge(0, DiffProperty::new((), DiffKind::Added), 0)
            .with_edge(1, DiffProperty::new((), DiffKind::Removed), 0)
            .build();

        let rewriter = EntanglementRewriter;
        let changed = rewriter.rewrite(&mut g).unwrap();
        assert!(changed);
        assert_eq!(g.transition_count(), 2);

        let added_copy = g
            .states()
            .find(|&s| g.state_property(s).unwrap().state_kind == DiffKind::Added)
            .expect("added copy exists");
        let loop_targets: Vec<_> = g.transitions_from(added_copy).map(|t| g.transition(t).unwrap().2).collect();
        assert_eq!(loop_targets, vec![added_copy]);
    }
}
