//! The safe-call allow-set (C4 support).
//!
//! Grounded directly on the grounding codebase's `capability.rs`: a small
//! closed enum plus a set wrapper, used here to decide which opaque
//! callables may be invoked directly without tripping the sharp-edge policy
//! (spec.md §3 "safe-function allow-list", §4.4).

use ahash::AHashSet;

/// A single permission an opaque call may require (spec.md §3).
///
/// ```
/// use tracekit::capability::{Capability, SafeCallSet};
///
/// let mut set = SafeCallSet::new();
/// set.allow(Capability::CallFunction("len".to_string()));
/// assert!(set.permits(&Capability::CallFunction("len".to_string())));
/// assert!(!set.permits(&Capability::CallFunction("eval".to_string())));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Calling a specific, named, opaque function is permitted.
    CallFunction(String),
    /// Calling any opaque function is permitted, bypassing the sharp-edge
    /// check entirely. Intended for embedders that trust the host fully.
    CallAnyFunction,
}

/// The set of opaque calls the interpreter may make without treating them
/// as a sharp edge (spec.md §3 Safe-function allow-list).
#[derive(Debug, Clone, Default)]
pub struct SafeCallSet {
    entries: AHashSet<Capability>,
}

impl SafeCallSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow(&mut self, capability: Capability) -> &mut Self {
        self.entries.insert(capability);
        self
    }

    #[must_use]
    pub fn permits(&self, capability: &Capability) -> bool {
        self.entries.contains(&Capability::CallAnyFunction) || self.entries.contains(capability)
    }

    #[must_use]
    pub fn permits_call(&self, callee_name: &str) -> bool {
        self.permits(&Capability::CallFunction(callee_name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::{Capability, SafeCallSet};

    #[test]
    fn call_any_function_overrides_specific_checks() {
        let mut set = SafeCallSet::new();
        set.allow(Capability::CallAnyFunction);
        assert!(set.permits_call("anything"));
    }

    #[test]
    fn unlisted_call_is_not_permitted() {
        let set = SafeCallSet::new();
        assert!(!set.permits_call("len"));
    }
}
