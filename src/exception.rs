//! Error and control-signal types (C2/C7 support).
//!
//! Grounded on `exception_private.rs`'s `RunError`/`ExcType` split: a closed,
//! hand-rolled enum of user-facing error categories (no `thiserror`), plus a
//! separate signal type for in-interpreter control flow (exceptions raised
//! by the host code under interpretation, as opposed to compiler errors).

use std::fmt;

use crate::provenance::ProvenanceInst;
use crate::sharp_edge::SharpEdgeEvent;

/// A category of user-facing compilation failure (spec.md §7).
#[derive(Debug, Clone, PartialEq, Eq, strum::Display, strum::IntoStaticStr)]
pub enum ExcType {
    UnsupportedOpcode,
    UnsupportedProvenance,
    SharpEdge,
    GuardViolation,
    TraceInvariant,
    Internal,
}

/// The top-level error type returned by [`crate::trace_function`] and by
/// fallible interpreter/prologue operations (spec.md §7).
#[derive(Debug, Clone)]
pub enum CompileError {
    /// The function under interpretation executed an opcode outside the
    /// supported subset (spec.md §4.2, §9 host bytecode selection).
    UnsupportedOpcode { name: String, loc: CodeLoc },
    /// Prologue synthesis reached a provenance shape it has no unpack rule
    /// for (spec.md §4.8 `from_provenance`, `NotImplementedError` cases).
    UnsupportedProvenance { inst: ProvenanceInst },
    /// A value reached the sharp-edge policy and the policy's verdict was
    /// `Error` (spec.md §4.7).
    SharpEdge(SharpEdgeEvent),
    /// A constraint recorded during interpretation could not be satisfied
    /// against a concrete value supplied at prologue-synthesis time; in
    /// practice this means the host function computed one result while
    /// believing it branched on an input later shown inconsistent with it.
    GuardViolation { detail: String },
    /// A trace-internal invariant failed: always a compiler bug.
    TraceInvariant(crate::trace::TraceError),
    /// A recursion, allocation, or step budget (spec.md §5 Resource limits)
    /// was exceeded.
    ResourceExhausted(ResourceError),
    /// An opaque-call bubbled up a host-level failure that compilation
    /// cannot recover from (spec.md §4.4's opaque-call escape hatch).
    HostCallFailed { callee: String, detail: String },
}

impl CompileError {
    #[must_use]
    pub fn exc_type(&self) -> ExcType {
        match self {
            Self::UnsupportedOpcode { .. } => ExcType::UnsupportedOpcode,
            Self::UnsupportedProvenance { .. } => ExcType::UnsupportedProvenance,
            Self::SharpEdge(_) => ExcType::SharpEdge,
            Self::GuardViolation { .. } => ExcType::GuardViolation,
            Self::TraceInvariant(_) => ExcType::TraceInvariant,
            Self::ResourceExhausted(_) | Self::HostCallFailed { .. } => ExcType::Internal,
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedOpcode { name, loc } => write!(f, "unsupported opcode `{name}` at {loc}"),
            Self::UnsupportedProvenance { inst } => write!(f, "no unpack rule for provenance `{inst}`"),
            Self::SharpEdge(event) => write!(f, "sharp edge: {event}"),
            Self::GuardViolation { detail } => write!(f, "guard violated: {detail}"),
            Self::TraceInvariant(err) => write!(f, "trace invariant violated: {err}"),
            Self::ResourceExhausted(err) => write!(f, "resource exhausted: {err}"),
            Self::HostCallFailed { callee, detail } => write!(f, "call to `{callee}` failed: {detail}"),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<crate::trace::TraceError> for CompileError {
    fn from(err: crate::trace::TraceError) -> Self {
        Self::TraceInvariant(err)
    }
}

impl From<ResourceError> for CompileError {
    fn from(err: ResourceError) -> Self {
        Self::ResourceExhausted(err)
    }
}

/// A location within the function under interpretation, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeLoc {
    pub instr_index: u32,
    pub frame_depth: u16,
}

impl fmt::Display for CodeLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instr {} (depth {})", self.instr_index, self.frame_depth)
    }
}

/// A limit configured via [`crate::config::CompileOptions`] was exceeded
/// (spec.md §5 Resource limits), grounded on `resource.rs`'s `ResourceError`.
#[derive(Debug, Clone, PartialEq, Eq, strum::Display)]
pub enum ResourceError {
    #[strum(to_string = "frame recursion depth {depth} exceeds limit {limit}")]
    Recursion { depth: u32, limit: u32 },
    #[strum(to_string = "interpreter step count {steps} exceeds limit {limit}")]
    StepBudget { steps: u64, limit: u64 },
}

impl std::error::Error for ResourceError {}

/// A signal propagated up the frame stack by the dispatch loop: either the
/// function returned normally, or an exception is unwinding (spec.md §4.2
/// "an exception-as-signal model, not host unwinding").
#[derive(Debug, Clone)]
pub enum InterpSignal {
    Return(crate::trace::Arg),
    Raise(CompileError),
}
