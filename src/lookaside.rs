//! The lookaside/callback registry (C4): controls which callables get
//! interpreted, substituted, or called opaquely.
//!
//! Grounded on `original_source/thunder/core/jit_ext.py`'s `lit_lookaside`:
//! the three-step resolution order below — primitive-translation lookaside,
//! then explicit registry entries, then falling through to host-recursion
//! or opaque handling — reproduces that function's branching exactly.

use indexmap::IndexMap;

use crate::primitive::{Primitive, TranslationKey, TranslationTable};
use crate::value::Value;

/// What the interpreter should do instead of descending into a callable's
/// bytecode (spec.md §4.4).
#[derive(Debug, Clone)]
#[allow(clippy::enum_variant_names)]
pub enum LookasideAction {
    /// Replace the call with a single bound symbol for this primitive; the
    /// callable is never interpreted or called.
    Substitute(Primitive),
    /// Call a different, interpreter-registered callable in its place.
    Redirect(Value),
}

/// Explicit, user-installed lookaside entries, keyed by a stable callable
/// identity string (spec.md §3 "explicit lookaside map"). Insertion order is
/// preserved for the same reason as [`TranslationTable`]: deterministic
/// diagnostics when dumping the active registry.
#[derive(Debug, Clone, Default)]
pub struct CallbackRegistry {
    entries: IndexMap<String, LookasideAction>,
}

impl CallbackRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, callee_key: impl Into<String>, action: LookasideAction) -> &mut Self {
        self.entries.insert(callee_key.into(), action);
        self
    }

    #[must_use]
    pub fn lookup(&self, callee_key: &str) -> Option<&LookasideAction> {
        self.entries.get(callee_key)
    }
}

/// Resolves a call's disposition, mirroring `lit_lookaside`'s three-step
/// order: (1) the primitive translation table, (2) explicit callback
/// registry entries, (3) no lookaside applies — the caller falls through to
/// host-function recursion or the opaque-call path (spec.md §4.4).
#[must_use]
pub fn resolve_lookaside(
    callee_key: &str,
    translations: &TranslationTable,
    callbacks: &CallbackRegistry,
) -> Option<LookasideAction> {
    if let Some(primitive) = translations.lookup(&TranslationKey::new(callee_key)) {
        return Some(LookasideAction::Substitute(primitive));
    }
    callbacks.lookup(callee_key).cloned()
}

#[cfg(test)]
mod tests {
    use super::{CallbackRegistry, LookasideAction, resolve_lookaside};
    use crate::op::BinOp;
    use crate::primitive::{Primitive, TranslationTable};

    #[test]
    fn translation_table_wins_over_callback_registry() {
        let translations = TranslationTable::with_defaults();
        let mut callbacks = CallbackRegistry::new();
        callbacks.register("tensor.add", LookasideAction::Substitute(Primitive::Sum));
        let action = resolve_lookaside("tensor.add", &translations, &callbacks).unwrap();
        assert!(matches!(action, LookasideAction::Substitute(Primitive::BinaryArith(BinOp::Add))));
    }

    #[test]
    fn unregistered_callee_has_no_lookaside() {
        let translations = TranslationTable::with_defaults();
        let callbacks = CallbackRegistry::new();
        assert!(resolve_lookaside("some.unrelated.fn", &translations, &callbacks).is_none());
    }
}
