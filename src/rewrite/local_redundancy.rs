//! Local-redundancy rewriter (§4.4.1): folds parallel transitions between
//! the same source/target with combinable properties into one.

use crate::combiner::{Combiner, DiffAutomatonStateProperty, DiffProperty};
use crate::error::Result;
use crate::graph::{Graph, StateId};
use crate::rewrite::Rewriter;

pub struct LocalRedundancyRewriter<'a, C> {
    pub combiner: &'a C,
}

impl<'a, C> LocalRedundancyRewriter<'a, C> {
    pub fn new(combiner: &'a C) -> Self {
        Self { combiner }
    }
}

impl<'a, T, C: Combiner<DiffProperty<T>>> Rewriter<T> for LocalRedundancyRewriter<'a, C> {
    fn rewrite(&self, g: &mut Graph<DiffAutomatonStateProperty, DiffProperty<T>>) -> Result<bool> {
        let start = std::time::Instant::now();
        let mut changed = false;
        let states: Vec<StateId> = g.states().collect();
        for s in states {
            loop {
                let transitions: Vec<_> = g.transitions_from(s).collect();
                let mut fold = None;
                'search: for i in 0..transitions.len() {
                    let (_, pi, ti) = g.transition(transitions[i]).unwrap();
                    for j in (i + 1)..transitions.len() {
                        let (_, pj, tj) = g.transition(transitions[j]).unwrap();
                        if ti == tj && self.combiner.are_combinable(pi, pj) {
                            fold = Some((transitions[i], transitions[j], ti));
                            break 'search;
                        }
                    }
                }
                let Some((a, b, target)) = fold else { break };
                let (_, pa, _) = g.transition(a).unwrap();
                let (_, pb, _) = g.transition(b).unwrap();
                let combined = self.combiner.combine(pa, pb);
                g.remove_transition(a);
                g.remove_transition(b);
                g.add_transition(s, combined, target);
                changed = true;
            }
        }
        tracing::debug!("local-redundancy rewriter took {} microseconds, changed={changed}", start.elapsed().as_micros());
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combiner::{DiffKind, DiffPropertyCombiner};
    use crate::graph::GraphBuilder;

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
    fn folds_parallel_combinable_edges() {
        let prop = |kind| DiffAutomatonStateProperty::new(false, kind, None).unwrap();
        let mut g: Graph<DiffAutomatonStateProperty, DiffProperty<char>> = GraphBuilder::new()
            .with_state_properties([prop(DiffKind::Unchanged), prop(DiffKind::Unchanged)])
            .with_edge(0, DiffProperty::new('a', DiffKind::Unchanged), 1)
            .with_edge(0, DiffProperty::new('a', DiffKind::Added), 1)
            .build();

        let inner = CharEq;
        let combiner = DiffPropertyCombiner::new(inner);
        let rewriter = LocalRedundancyRewriter::new(&combiner);
        let changed = rewriter.rewrite(&mut g).unwrap();
        assert!(changed);
        assert_eq!(g.transition_count(), 1);
        let source = g.states().next().unwrap();
        let (_, prop, _) = g.transition(g.transitions_from(source).next().unwrap()).unwrap();
        assert_eq!(prop.kind, DiffKind::Unchanged);
    }
}
