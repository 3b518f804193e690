//! The shared graph abstraction: a directed multigraph of typed states and
//! typed transitions, with optional "initial" and "accepting" markers.
//!
//! States and transitions are identified by dense, monotonically increasing
//! ids assigned at insertion (mirroring `automata`'s `StateIndex` /
//! `DefaultIdType` discipline). Deleted slots are tombstoned rather than
//! reused, so an id is stable for the lifetime of the graph and is never
//! resurrected by a later insertion.

use std::collections::HashSet;

/// Identifier of a state within a single [`Graph`]. Ids from different
/// graphs are never comparable to each other, even if numerically equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateId(u32);

impl StateId {
    fn new(raw: u32) -> Self {
        Self(raw)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for StateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Identifier of a transition within a single [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransitionId(u32);

impl TransitionId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

struct StateSlot<S> {
    property: S,
}

struct TransitionSlot<T> {
    source: StateId,
    target: StateId,
    property: T,
}

/// A directed multigraph with typed state properties `S` and typed
/// transition properties `T`, plus "initial" and "accepting" markers.
///
/// The LTS variant of the data model only ever populates `initial`; the
/// automaton variant additionally populates `accepting`. Both marker sets
/// always exist on `Graph` itself (empty if unused) since the rewriters
/// operate on a single merged graph that may need either.
pub struct Graph<S, T> {
    states: Vec<Option<StateSlot<S>>>,
    out_edges: Vec<Vec<TransitionId>>,
    in_edges: Vec<Vec<TransitionId>>,
    transitions: Vec<Option<TransitionSlot<T>>>,
    initial: Vec<StateId>,
    initial_set: HashSet<StateId>,
    accepting: HashSet<StateId>,
    live_states: usize,
}

impl<S, T> Default for Graph<S, T> {
    fn default() -> Self {
        Self {
            states: Vec::new(),
            out_edges: Vec::new(),
            in_edges: Vec::new(),
            transitions: Vec::new(),
            initial: Vec::new(),
            initial_set: HashSet::new(),
            accepting: HashSet::new(),
            live_states: 0,
        }
    }
}

impl<S, T> Graph<S, T> {
    /// Creates a fresh, empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a new state with the given property, returning its fresh id.
    pub fn add_state(&mut self, property: S) -> StateId {
        let id = StateId::new(self.states.len() as u32);
        self.states.push(Some(StateSlot { property }));
        self.out_edges.push(Vec::new());
        self.in_edges.push(Vec::new());
        self.live_states += 1;
        id
    }

    /// Removes a state and every transition incident to it (incoming or
    /// outgoing). Returns the removed state's property, or `None` if the
    /// state does not exist (already removed, or never existed).
    pub fn remove_state(&mut self, id: StateId) -> Option<S> {
        let slot = self.states.get_mut(id.index())?.take()?;
        self.live_states -= 1;

        let outgoing = std::mem::take(&mut self.out_edges[id.index()]);
        for t in outgoing {
            self.remove_transition_slot(t);
        }
        let incoming = std::mem::take(&mut self.in_edges[id.index()]);
        for t in incoming {
            self.remove_transition_slot(t);
        }

        self.initial_set.remove(&id);
        self.initial.retain(|&s| s != id);
        self.accepting.remove(&id);

        Some(slot.property)
    }

    fn remove_transition_slot(&mut self, id: TransitionId) {
        let Some(slot) = self.transitions[id.index()].take() else {
            return;
        };
        if self.states[slot.source.index()].is_some() {
            self.out_edges[slot.source.index()].retain(|&t| t != id);
        }
        if self.states[slot.target.index()].is_some() {
            self.in_edges[slot.target.index()].retain(|&t| t != id);
        }
    }

    /// Returns `true` iff the given state still exists in the graph.
    pub fn contains_state(&self, id: StateId) -> bool {
        self.states.get(id.index()).is_some_and(Option::is_some)
    }

    /// Returns a reference to a state's property, or `None` if it does not
    /// exist.
    pub fn state_property(&self, id: StateId) -> Option<&S> {
        self.states.get(id.index())?.as_ref().map(|s| &s.property)
    }

    /// Overwrites a state's property in place.
    pub fn set_state_property(&mut self, id: StateId, property: S) {
        if let Some(Some(slot)) = self.states.get_mut(id.index()) {
            slot.property = property;
        }
    }

    /// Adds a transition `source -> target` carrying `property`, returning
    /// its fresh id. Self-loops and parallel transitions are permitted.
    pub fn add_transition(&mut self, source: StateId, property: T, target: StateId) -> TransitionId {
        debug_assert!(self.contains_state(source), "source state does not exist");
        debug_assert!(self.contains_state(target), "target state does not exist");
        let id = TransitionId(self.transitions.len() as u32);
        self.transitions.push(Some(TransitionSlot {
            source,
            target,
            property,
        }));
        self.out_edges[source.index()].push(id);
        self.in_edges[target.index()].push(id);
        id
    }

    /// Removes a transition by id. Returns its property, or `None` if it
    /// does not exist.
    pub fn remove_transition(&mut self, id: TransitionId) -> Option<T> {
        let slot = self.transitions.get_mut(id.index())?.take()?;
        if self.states[slot.source.index()].is_some() {
            self.out_edges[slot.source.index()].retain(|&t| t != id);
        }
        if self.states[slot.target.index()].is_some() {
            self.in_edges[slot.target.index()].retain(|&t| t != id);
        }
        Some(slot.property)
    }

    /// Returns the source, property and target of a transition.
    pub fn transition(&self, id: TransitionId) -> Option<(StateId, &T, StateId)> {
        let slot = self.transitions.get(id.index())?.as_ref()?;
        Some((slot.source, &slot.property, slot.target))
    }

    /// Marks a state as initial (LTS variant). No-op if already marked.
    pub fn mark_initial(&mut self, id: StateId) {
        if self.initial_set.insert(id) {
            self.initial.push(id);
        }
    }

    /// Removes the initial marker from a state, if present.
    pub fn unmark_initial(&mut self, id: StateId) {
        if self.initial_set.remove(&id) {
            self.initial.retain(|&s| s != id);
        }
    }

    /// Returns `true` iff the state is marked initial.
    pub fn is_initial(&self, id: StateId) -> bool {
        self.initial_set.contains(&id)
    }

    /// Marks a state as accepting (automaton variant).
    pub fn mark_accepting(&mut self, id: StateId) {
        self.accepting.insert(id);
    }

    /// Removes the accepting marker from a state, if present.
    pub fn unmark_accepting(&mut self, id: StateId) {
        self.accepting.remove(&id);
    }

    /// Returns `true` iff the state is marked accepting.
    pub fn is_accepting(&self, id: StateId) -> bool {
        self.accepting.contains(&id)
    }

    /// Iterates over every live state, in insertion order.
    pub fn states(&self) -> impl Iterator<Item = StateId> + '_ {
        self.states
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|_| StateId::new(i as u32)))
    }

    /// Iterates over every initial state, in the order they were marked.
    pub fn initial_states(&self) -> impl Iterator<Item = StateId> + '_ {
        self.initial.iter().copied()
    }

    /// Iterates over the outgoing transitions of a state, in insertion
    /// order. Empty iterator (not an error) if the state has none or does
    /// not exist.
    pub fn transitions_from(&self, id: StateId) -> impl Iterator<Item = TransitionId> + '_ {
        self.out_edges
            .get(id.index())
            .into_iter()
            .flatten()
            .copied()
    }

    /// Iterates over the incoming transitions of a state, in insertion
    /// order.
    pub fn transitions_to(&self, id: StateId) -> impl Iterator<Item = TransitionId> + '_ {
        self.in_edges
            .get(id.index())
            .into_iter()
            .flatten()
            .copied()
    }

    /// Number of live states.
    pub fn len(&self) -> usize {
        self.live_states
    }

    /// Returns `true` iff the graph has no live states.
    pub fn is_empty(&self) -> bool {
        self.live_states == 0
    }

    /// Number of live transitions.
    pub fn transition_count(&self) -> usize {
        self.transitions.iter().filter(|t| t.is_some()).count()
    }
}

/// Summary counters over a graph, grounded on `merc_lts::LtsMetrics`: a
/// lightweight, read-only companion type for diagnostics and logging. Not
/// a substitute for DOT serialization (out of scope, §1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphMetrics {
    pub states: usize,
    pub transitions: usize,
    pub initial_states: usize,
    pub accepting_states: usize,
}

impl<S, T> Graph<S, T> {
    /// Computes summary metrics over the current graph.
    pub fn metrics(&self) -> GraphMetrics {
        GraphMetrics {
            states: self.len(),
            transitions: self.transition_count(),
            initial_states: self.initial.len(),
            accepting_states: self.accepting.len(),
        }
    }
}

impl std::fmt::Display for GraphMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} states, {} transitions, {} initial, {} accepting",
            self.states, self.transitions, self.initial_states, self.accepting_states
        )
    }
}

/// Accumulate-then-finalize builder for [`Graph`], grounded on
/// `automata::ts::builder::TSBuilder`'s shape: collect state properties and
/// edges first, then materialize the graph in one pass.
#[derive(Default)]
pub struct GraphBuilder<S, T> {
    state_properties: Vec<S>,
    edges: Vec<(usize, T, usize)>,
    initial: Vec<usize>,
    accepting: Vec<usize>,
}

impl<S, T> GraphBuilder<S, T> {
    pub fn new() -> Self {
        Self {
            state_properties: Vec::new(),
            edges: Vec::new(),
            initial: Vec::new(),
            accepting: Vec::new(),
        }
    }

    /// Appends a list of state properties, assigned state indices `0..n` in
    /// the order given, continuing from however many states already exist.
    pub fn with_state_properties<I: IntoIterator<Item = S>>(mut self, iter: I) -> Self {
        self.state_properties.extend(iter);
        self
    }

    /// Adds an edge between the given 0-based state indices.
    pub fn with_edge(mut self, source: usize, property: T, target: usize) -> Self {
        self.edges.push((source, property, target));
        self
    }

    /// Marks the given 0-based state index as initial.
    pub fn with_initial(mut self, index: usize) -> Self {
        self.initial.push(index);
        self
    }

    /// Marks the given 0-based state index as accepting.
    pub fn with_accepting(mut self, index: usize) -> Self {
        self.accepting.push(index);
        self
    }

    /// Materializes the accumulated state properties and edges into a fresh
    /// [`Graph`]. Panics if an edge or marker references an index beyond
    /// the number of state properties given — this is a test-construction
    /// helper, not a runtime API, so it fails loudly rather than returning
    /// a `Result`.
    pub fn build(self) -> Graph<S, T> {
        let mut g = Graph::new();
        let mut ids = Vec::with_capacity(self.state_properties.len());
        for prop in self.state_properties {
            ids.push(g.add_state(prop));
        }
        for (source, property, target) in self.edges {
            let s = ids[source];
            let t = ids[target];
            g.add_transition(s, property, t);
        }
        for i in self.initial {
            g.mark_initial(ids[i]);
        }
        for i in self.accepting {
            g.mark_accepting(ids[i]);
        }
        g
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_remove_state_cascades_transitions() {
        let mut g: Graph<(), char> = Graph::new();
        let a = g.add_state(());
        let b = g.add_state(());
        g.add_transition(a, 'x', b);
        assert_eq!(g.len(), 2);
        assert_eq!(g.transition_count(), 1);

        g.remove_state(a);
        assert_eq!(g.len(), 1);
        assert_eq!(g.transition_count(), 0);
        assert!(g.transitions_to(b).next().is_none());
    }

    #[test]
    fn ids_are_never_recycled() {
        let mut g: Graph<(), ()> = Graph::new();
        let a = g.add_state(());
        g.remove_state(a);
        let b = g.add_state(());
        assert_ne!(a, b);
    }

    #[test]
    fn builder_round_trip() {
        let g: Graph<bool, char> = GraphBuilder::new()
            .with_state_properties([true, false])
            .with_edge(0, 'a', 1)
            .with_initial(0)
            .build();
        assert_eq!(g.len(), 2);
        assert_eq!(g.metrics().initial_states, 1);
    }
}
