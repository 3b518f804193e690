//! Combiners: pluggable operators that decide whether two property values
//! are *combinable* and, when they are, produce their combined value.
//!
//! Every [`Combiner`] implementation must satisfy the laws from the design:
//! `are_combinable` is reflexive and symmetric, `combine` is defined exactly
//! where `are_combinable` holds, and `combine` is commutative (and, over
//! combinable triples, associative). These laws are documented rather than
//! mechanically enforced, the same contract-by-doc-comment style the
//! teacher uses for `Semantics`.

/// An operator pair deciding combinability of, and combining, values of
/// type `X`.
pub trait Combiner<X> {
    /// Returns whether `a` and `b` may be combined into a single value.
    fn are_combinable(&self, a: &X, b: &X) -> bool;

    /// Combines `a` and `b`. Only meaningful when `are_combinable(a, b)`
    /// holds; implementations may panic otherwise since callers are
    /// expected to check first.
    fn combine(&self, a: &X, b: &X) -> X;
}

/// A pair of combiners bundled together: one over state properties, one over
/// transition properties. The scorer, matcher and merger all take the same
/// pair, so callers assemble it once and hand out references.
pub struct Combiners<'a, S, T> {
    pub state: &'a dyn Combiner<S>,
    pub transition: &'a dyn Combiner<T>,
}

impl<'a, S, T> Combiners<'a, S, T> {
    pub fn new(state: &'a dyn Combiner<S>, transition: &'a dyn Combiner<T>) -> Self {
        Self { state, transition }
    }
}

/// The kind of a difference-tagged property: whether it only exists on one
/// side of the comparison, or on both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiffKind {
    /// Present only on the right (new) input.
    Added,
    /// Present only on the left (old) input.
    Removed,
    /// Present, and combinable, on both inputs.
    Unchanged,
}

impl DiffKind {
    /// Combines two diff kinds per the design's combination table:
    /// `Added` with `Added` stays `Added`, `Removed` with `Removed` stays
    /// `Removed`, anything combined with `Unchanged` becomes `Unchanged`,
    /// and `Added` with `Removed` is not combinable.
    pub fn combine(self, other: Self) -> Option<Self> {
        use DiffKind::*;
        match (self, other) {
            (Added, Added) => Some(Added),
            (Removed, Removed) => Some(Removed),
            (Unchanged, _) | (_, Unchanged) => Some(Unchanged),
            (Added, Removed) | (Removed, Added) => None,
        }
    }

    /// Returns whether `self` and `other` are combinable under
    /// [`DiffKind::combine`].
    pub fn are_combinable(self, other: Self) -> bool {
        self.combine(other).is_some()
    }
}

/// A combiner over bare [`DiffKind`] tags.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiffKindCombiner;

impl Combiner<DiffKind> for DiffKindCombiner {
    fn are_combinable(&self, a: &DiffKind, b: &DiffKind) -> bool {
        a.are_combinable(*b)
    }

    fn combine(&self, a: &DiffKind, b: &DiffKind) -> DiffKind {
        a.combine(*b)
            .expect("caller must check are_combinable before combine")
    }
}

/// A tagged pair of an inner property value and the [`DiffKind`] recording
/// whether it was added, removed, or is unchanged between the two inputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DiffProperty<T> {
    pub inner: T,
    pub kind: DiffKind,
}

impl<T> DiffProperty<T> {
    pub fn new(inner: T, kind: DiffKind) -> Self {
        Self { inner, kind }
    }
}

/// Lifts an inner [`Combiner<T>`] to operate on [`DiffProperty<T>`] by
/// combining the diff kind and the inner value independently; the pair is
/// combinable only if both sub-combines are.
pub struct DiffPropertyCombiner<C> {
    inner: C,
}

impl<C> DiffPropertyCombiner<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

impl<T, C: Combiner<T>> Combiner<DiffProperty<T>> for DiffPropertyCombiner<C> {
    fn are_combinable(&self, a: &DiffProperty<T>, b: &DiffProperty<T>) -> bool {
        a.kind.are_combinable(b.kind) && self.inner.are_combinable(&a.inner, &b.inner)
    }

    fn combine(&self, a: &DiffProperty<T>, b: &DiffProperty<T>) -> DiffProperty<T> {
        DiffProperty::new(
            self.inner.combine(&a.inner, &b.inner),
            a.kind
                .combine(b.kind)
                .expect("caller must check are_combinable before combine"),
        )
    }
}

/// The automaton-variant state property used by the rewriters (§3,
/// `DiffAutomatonStateProperty`): whether the state is accepting, its diff
/// kind, and — if it is initial — the diff kind of that initial marker.
///
/// Invariant: `init_kind` is `None` iff the state is not initial, and when
/// present must be compatible with `state_kind` (e.g. an `Added` state
/// cannot carry a `Removed` init marker). Constructors enforce this; there
/// is no public way to build an inconsistent instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiffAutomatonStateProperty {
    pub accepting: bool,
    pub state_kind: DiffKind,
    pub init_kind: Option<DiffKind>,
}

impl DiffAutomatonStateProperty {
    /// Creates a new property. Returns `None` if `init_kind` is
    /// incompatible with `state_kind` (the two cannot be combined per
    /// [`DiffKind::are_combinable`]).
    pub fn new(accepting: bool, state_kind: DiffKind, init_kind: Option<DiffKind>) -> Option<Self> {
        if let Some(k) = init_kind {
            if !state_kind.are_combinable(k) {
                return None;
            }
        }
        Some(Self {
            accepting,
            state_kind,
            init_kind,
        })
    }

    pub fn is_initial(&self) -> bool {
        self.init_kind.is_some()
    }
}

/// Combiner over [`DiffAutomatonStateProperty`]: `accepting` must agree,
/// diff kinds must combine, and init kinds combine when both present (a
/// state marked initial only on one side keeps that marker).
#[derive(Debug, Default, Clone, Copy)]
pub struct DiffAutomatonStatePropertyCombiner;

impl Combiner<DiffAutomatonStateProperty> for DiffAutomatonStatePropertyCombiner {
    fn are_combinable(
        &self,
        a: &DiffAutomatonStateProperty,
        b: &DiffAutomatonStateProperty,
    ) -> bool {
        if a.accepting != b.accepting {
            return false;
        }
        if !a.state_kind.are_combinable(b.state_kind) {
            return false;
        }
        match (a.init_kind, b.init_kind) {
            (Some(x), Some(y)) => x.are_combinable(y),
            _ => true,
        }
    }

    fn combine(
        &self,
        a: &DiffAutomatonStateProperty,
        b: &DiffAutomatonStateProperty,
    ) -> DiffAutomatonStateProperty {
        let state_kind = a
            .state_kind
            .combine(b.state_kind)
            .expect("caller must check are_combinable before combine");
        let init_kind = match (a.init_kind, b.init_kind) {
            (Some(x), Some(y)) => Some(x.combine(y).expect("checked above")),
            (Some(x), None) | (None, Some(x)) => Some(x),
            (None, None) => None,
        };
        DiffAutomatonStateProperty {
            accepting: a.accepting,
            state_kind,
            init_kind,
        }
    }
}
