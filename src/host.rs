//! The host-call escape hatch: the embedder-supplied evaluator invoked for
//! opaque calls that pass the safe-call check (spec.md §4.4 step 4).
//!
//! `tracekit` has no binding to any concrete host language runtime (that
//! binding is the out-of-scope "downstream executor", spec.md §1); an
//! embedder wires one up via [`HostEvaluator`].

use std::rc::Rc;

use crate::value::Value;

/// Executes an opaque callable concretely, outside of interpretation.
pub trait HostEvaluator {
    /// Calls the opaque callable named `callee` with already-concrete
    /// `args`, returning its concrete result.
    ///
    /// # Errors
    /// Returns a human-readable message if the host call cannot be carried
    /// out; this surfaces to the caller as [`crate::exception::CompileError::HostCallFailed`].
    fn call(&self, callee: &str, args: &[Value]) -> Result<Value, String>;
}

/// Refuses every opaque call. The default when an embedder registers no
/// evaluator: every opaque call outside the lookaside/translation table is
/// then necessarily a sharp edge, never a silent no-op.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHostEvaluator;

impl HostEvaluator for NoHostEvaluator {
    fn call(&self, callee: &str, _args: &[Value]) -> Result<Value, String> {
        Err(format!("no host evaluator registered for `{callee}`"))
    }
}

#[must_use]
pub fn default_evaluator() -> Rc<dyn HostEvaluator> {
    Rc::new(NoHostEvaluator)
}
