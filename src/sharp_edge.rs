//! The sharp-edge policy (C7): a tri-state classification of unsupported
//! constructs encountered while wrapping a value for interpretation.
//!
//! Grounded on `original_source/thunder/core/jit_ext.py`'s `_lit_wrap_callback`
//! and `_sharp_edge`/`_meso_sharp_edge`: the exact trigger conditions below
//! (safe provenance tags, known-container passthrough, constant passthrough)
//! reproduce that function's branching.

use std::fmt;

use crate::provenance::{ProvenanceInst, ProvenanceRecord};
use crate::value::Value;

/// How the compiler should react to an unsupported construct (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum SharpEdgeLevel {
    Allow,
    Warn,
    Error,
}

/// A single sharp-edge trigger, carrying enough context to report and (if
/// the level is `Warn`) to log without aborting (spec.md §4.7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharpEdgeEvent {
    pub reason: SharpEdgeReason,
    pub detail: String,
}

impl fmt::Display for SharpEdgeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.reason, self.detail)
    }
}

/// Why a value was flagged (spec.md §4.7 edge cases).
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum SharpEdgeReason {
    /// A value with no provenance rooted entirely in the safe set reached a
    /// proxy-or-reject decision point (the `_lit_wrap_callback` default case).
    UnsafeProvenance,
    /// An opaque callable outside the safe-call allow-set was about to be
    /// invoked without interpretation (spec.md §4.4).
    UnsafeOpaqueCall,
    /// A host opcode outside the supported subset was reached (spec.md §4.2).
    UnsupportedOpcode,
}

/// Per-compilation sharp-edge configuration (spec.md §3, `CompileOptions`).
#[derive(Debug, Clone, Copy)]
pub struct SharpEdgePolicy {
    pub level: SharpEdgeLevel,
}

impl Default for SharpEdgePolicy {
    fn default() -> Self {
        Self { level: SharpEdgeLevel::Error }
    }
}

impl SharpEdgePolicy {
    #[must_use]
    pub fn new(level: SharpEdgeLevel) -> Self {
        Self { level }
    }

    /// Decides whether a value reached during wrapping (spec.md §4.3) may
    /// be proxied and guarded, or must trip the sharp-edge policy.
    ///
    /// Known container/callable/module-shaped values always pass through
    /// unproxied. Everything else, `CONSTANT` provenance included, is
    /// proxied and guarded as long as its provenance chain is fully
    /// safe-for-guarding (spec.md §8 scenario 3: a literal operand becomes
    /// a `NumberProxy` with a `check_number_type_and_value` guard recorded
    /// against its known value, rather than being silently inlined).
    #[must_use]
    pub fn classify(&self, value: &Value, provenance: &ProvenanceRecord) -> WrapDecision {
        if value.is_known_safe_shape() {
            return WrapDecision::Pass;
        }
        if provenance.safe_for_guarding() {
            return WrapDecision::ProxyAndGuard;
        }
        WrapDecision::SharpEdge(SharpEdgeEvent {
            reason: SharpEdgeReason::UnsafeProvenance,
            detail: format!("value of type `{}` has no safe-for-guarding provenance", value.type_name()),
        })
    }

    /// Applies the configured sharp-edge level to an event, mirroring
    /// `_sharp_edge`'s three-way dispatch (pass through / log / raise).
    #[must_use]
    pub fn resolve(&self, event: SharpEdgeEvent) -> SharpEdgeOutcome {
        match self.level {
            SharpEdgeLevel::Allow => SharpEdgeOutcome::Allowed,
            SharpEdgeLevel::Warn => SharpEdgeOutcome::Warned(event),
            SharpEdgeLevel::Error => SharpEdgeOutcome::Rejected(event),
        }
    }
}

/// What wrapping a value should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WrapDecision {
    /// Pass the concrete value through unwrapped (constants, containers,
    /// callables, modules).
    Pass,
    /// Mint a proxy and record a guard constraint for it.
    ProxyAndGuard,
    /// Neither is safe; consult the configured [`SharpEdgePolicy`].
    SharpEdge(SharpEdgeEvent),
}

/// The resolved outcome of a sharp-edge event after applying policy level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SharpEdgeOutcome {
    Allowed,
    Warned(SharpEdgeEvent),
    Rejected(SharpEdgeEvent),
}

#[cfg(test)]
mod tests {
    use super::{SharpEdgeLevel, SharpEdgePolicy, WrapDecision};
    use crate::provenance::{ProvenanceInst, ProvenanceRecord};
    use crate::value::{Literal, Value};

    #[test]
    fn constant_number_is_proxied_and_guarded() {
        let policy = SharpEdgePolicy::new(SharpEdgeLevel::Error);
        let provenance = ProvenanceRecord::constant(Literal::Int(1));
        assert_eq!(policy.classify(&Value::Int(1), &provenance), WrapDecision::ProxyAndGuard);
    }

    #[test]
    fn known_safe_shape_always_passes_even_with_unsafe_provenance() {
        let policy = SharpEdgePolicy::new(SharpEdgeLevel::Error);
        let provenance = ProvenanceRecord::leaf(ProvenanceInst::Opaque);
        assert_eq!(policy.classify(&Value::Tuple(std::sync::Arc::new(vec![])), &provenance), WrapDecision::Pass);
    }

    #[test]
    fn safe_chain_is_proxy_and_guard() {
        let policy = SharpEdgePolicy::new(SharpEdgeLevel::Error);
        let args = ProvenanceRecord::leaf(ProvenanceInst::InputArgs);
        let idx = ProvenanceRecord::binary_subscr(args, Literal::Int(0));
        assert_eq!(policy.classify(&Value::Int(7), &idx), WrapDecision::ProxyAndGuard);
    }

    #[test]
    fn opaque_chain_is_a_sharp_edge() {
        let policy = SharpEdgePolicy::new(SharpEdgeLevel::Error);
        let opaque = ProvenanceRecord::node(ProvenanceInst::Opaque, vec![]);
        assert!(matches!(policy.classify(&Value::Int(7), &opaque), WrapDecision::SharpEdge(_)));
    }
}
