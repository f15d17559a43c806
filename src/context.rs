//! The ambient compilation context (C1 support): a monotonic proxy-name
//! counter plus a scoped LIFO stack of active traces.
//!
//! Grounded on the grounding codebase's scoped-context pattern (an RAII
//! guard that pushes on construction and pops on drop) rather than a global
//! mutable singleton, matching spec.md §5's "no background work, no shared
//! mutable state across compilations" concurrency model.

use std::cell::RefCell;

use crate::config::CompileOptions;
use crate::proxy::ProxyName;
use crate::trace::{Constraint, TraceCtx};

/// Which trace is currently being built: the computation trace records
/// symbolic ops as the host function runs; the prologue trace is
/// synthesized afterward from the recorded provenance (spec.md §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceKind {
    Computation,
    Prologue,
}

/// Per-compilation mutable state: the active trace, the options in effect,
/// and the proxy-name counter. One `CompileContext` lives for exactly one
/// call to [`crate::trace_function`] (spec.md §5).
pub struct CompileContext {
    pub options: CompileOptions,
    next_proxy_name: u64,
    active_kind: Option<TraceKind>,
    /// Guard constraints recorded while wrapping string/number values
    /// (spec.md §3 Constraint, §4.8 "replayed into the prologue after all
    /// inputs have been unpacked").
    pub constraints: Vec<Constraint>,
}

impl CompileContext {
    #[must_use]
    pub fn new(options: CompileOptions) -> Self {
        Self { options, next_proxy_name: 0, active_kind: None, constraints: Vec::new() }
    }

    /// Mints a fresh, globally-unique-within-this-compilation proxy name.
    pub fn fresh_proxy_name(&mut self) -> ProxyName {
        let name = ProxyName::new(self.next_proxy_name);
        self.next_proxy_name += 1;
        name
    }

    #[must_use]
    pub fn active_trace_kind(&self) -> Option<TraceKind> {
        self.active_kind
    }
}

thread_local! {
    static ACTIVE: RefCell<Vec<TraceKind>> = const { RefCell::new(Vec::new()) };
}

/// An RAII guard marking one [`TraceKind`] active for its lifetime, pushed
/// on construction and popped on drop — a scoped LIFO stack rather than a
/// single global, so nested re-entry (spec.md §5: "re-entrant via explicit
/// frame stack, not via host recursion") cannot corrupt an outer scope's
/// notion of which trace is active.
pub struct TraceCtxGuard {
    kind: TraceKind,
}

impl TraceCtxGuard {
    #[must_use]
    pub fn enter(ctx: &mut CompileContext, kind: TraceKind) -> Self {
        ctx.active_kind = Some(kind);
        ACTIVE.with(|active| active.borrow_mut().push(kind));
        Self { kind }
    }

    #[must_use]
    pub fn current() -> Option<TraceKind> {
        ACTIVE.with(|active| active.borrow().last().copied())
    }
}

impl Drop for TraceCtxGuard {
    fn drop(&mut self) {
        ACTIVE.with(|active| {
            let mut stack = active.borrow_mut();
            if stack.last() == Some(&self.kind) {
                stack.pop();
            }
        });
    }
}

/// A freshly constructed pair of empty traces for one compilation, grounded
/// on `meso_thunder_interpreter`'s `prologue_trace`/`computation_trace` setup.
#[must_use]
pub fn new_trace_pair() -> (TraceCtx, TraceCtx) {
    (TraceCtx::new("prologue"), TraceCtx::new("computation"))
}

#[cfg(test)]
mod tests {
    use super::{CompileContext, TraceCtxGuard, TraceKind};
    use crate::config::CompileOptions;

    #[test]
    fn fresh_proxy_names_are_monotonic_and_distinct() {
        let mut ctx = CompileContext::new(CompileOptions::new());
        let a = ctx.fresh_proxy_name();
        let b = ctx.fresh_proxy_name();
        assert_ne!(a, b);
    }

    #[test]
    fn guard_restores_previous_scope_on_drop() {
        let mut ctx = CompileContext::new(CompileOptions::new());
        assert_eq!(TraceCtxGuard::current(), None);
        {
            let _outer = TraceCtxGuard::enter(&mut ctx, TraceKind::Computation);
            assert_eq!(TraceCtxGuard::current(), Some(TraceKind::Computation));
            {
                let _inner = TraceCtxGuard::enter(&mut ctx, TraceKind::Prologue);
                assert_eq!(TraceCtxGuard::current(), Some(TraceKind::Prologue));
            }
            assert_eq!(TraceCtxGuard::current(), Some(TraceKind::Computation));
        }
        assert_eq!(TraceCtxGuard::current(), None);
    }
}
