//! Hiders: idempotent maps that neutralize a property's diff tag while
//! preserving combinability, used by the skip rewriters to compare edge
//! "content" while ignoring whether it was added or removed.

use crate::combiner::{DiffKind, DiffProperty};

/// An idempotent map `H: X -> X` such that for all combinable `x, y`:
/// `H(x)` is combinable with `H(y)`, and `H(combine(H(x), H(y))) ==
/// combine(H(x), H(y))`. Idempotence is a documented contract, not
/// mechanically checked.
pub trait Hider<X> {
    fn hide(&self, x: &X) -> X;
}

/// Neutralizes a [`DiffProperty<T>`]'s [`DiffKind`] to `Unchanged` while
/// preserving the inner value.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiffPropertyHider;

impl<T: Clone> Hider<DiffProperty<T>> for DiffPropertyHider {
    fn hide(&self, x: &DiffProperty<T>) -> DiffProperty<T> {
        DiffProperty::new(x.inner.clone(), DiffKind::Unchanged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hide_neutralizes_kind_but_keeps_inner() {
        let hider = DiffPropertyHider;
        let p = DiffProperty::new('a', DiffKind::Added);
        let hidden = hider.hide(&p);
        assert_eq!(hidden.kind, DiffKind::Unchanged);
        assert_eq!(hidden.inner, 'a');
    }

    #[test]
    fn hide_is_idempotent() {
        let hider = DiffPropertyHider;
        let p = DiffProperty::new(3, DiffKind::Removed);
        let once = hider.hide(&p);
        let twice = hider.hide(&once);
        assert_eq!(once.kind, twice.kind);
        assert_eq!(once.inner, twice.inner);
    }
}
