//! Wrapped values and the provenance DAG (C3).
//!
//! Grounded on `thunder/core/jit_ext.py`'s `ProvenanceRecord`/`WrappedValue`
//! (original_source) and on the grounding codebase's preference for owned,
//! `Rc`-shared graphs over index-based arenas for per-compilation state.

use std::cell::RefCell;
use std::rc::Rc;

use crate::op::OpName;
use crate::proxy::Proxy;
use crate::value::{Literal, Value};

/// The tag naming how a value was reached, per spec.md §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum ProvenanceInst {
    InputArgs,
    InputKwargs,
    InputFn,
    LoadAttr,
    BinarySubscr,
    Constant,
    Opaque,
    /// A value's provenance traced back to a specific host opcode, for
    /// derived values that are neither primitive-proxy SSA outputs nor one
    /// of the named input/attribute/subscript/constant shapes (spec.md §3:
    /// "*host-opcode-tag*").
    HostOpcode(OpName),
}

/// A rooted DAG node recording how a value was derived.
///
/// Equality is structural (`inst` + `inputs` + `value`), per spec.md §3;
/// the `proxy` back-reference is excluded from equality since it is filled
/// in later, during prologue synthesis, purely as a memoization cache
/// (mirrors `thunder`'s `provenance.proxy = res` memoization in
/// `unpack_inputs`). Records never reference themselves transitively
/// through `inputs` — the DAG is constructed bottom-up and is acyclic by
/// construction.
#[derive(Debug)]
pub struct ProvenanceRecord {
    pub inst: ProvenanceInst,
    pub inputs: Vec<Rc<ProvenanceRecord>>,
    pub value: Option<Literal>,
    /// Memoization slot used by prologue synthesis (§4.8) to avoid emitting
    /// duplicate unpacks for the same record. Note: once populated for a
    /// used-input proxy whose `history` points back at this same record,
    /// this forms an intentional `Rc` cycle (record → proxy → record). That
    /// is acceptable here: a compilation is a short-lived, single-threaded,
    /// one-shot process-local structure (spec.md §5), not a long-running
    /// service, so the bounded per-compilation leak this cycle causes is
    /// no different in practice from arena allocation.
    pub proxy: RefCell<Option<Proxy>>,
}

impl PartialEq for ProvenanceRecord {
    fn eq(&self, other: &Self) -> bool {
        self.inst == other.inst && self.value == other.value && self.inputs.len() == other.inputs.len() && {
            self.inputs.iter().zip(&other.inputs).all(|(a, b)| a == b)
        }
    }
}

impl ProvenanceRecord {
    #[must_use]
    pub fn leaf(inst: ProvenanceInst) -> Rc<Self> {
        Rc::new(Self {
            inst,
            inputs: Vec::new(),
            value: None,
            proxy: RefCell::new(None),
        })
    }

    #[must_use]
    pub fn constant(value: Literal) -> Rc<Self> {
        Rc::new(Self {
            inst: ProvenanceInst::Constant,
            inputs: Vec::new(),
            value: Some(value),
            proxy: RefCell::new(None),
        })
    }

    #[must_use]
    pub fn node(inst: ProvenanceInst, inputs: Vec<Rc<Self>>) -> Rc<Self> {
        Rc::new(Self {
            inst,
            inputs,
            value: None,
            proxy: RefCell::new(None),
        })
    }

    /// `obj.name_const` — a `LOAD_ATTR` provenance node.
    #[must_use]
    pub fn load_attr(obj: Rc<Self>, name: &str) -> Rc<Self> {
        Self::node(ProvenanceInst::LoadAttr, vec![obj, Self::constant(Literal::Str(name.to_string()))])
    }

    /// `obj[idx_const]` — a `BINARY_SUBSCR` provenance node.
    #[must_use]
    pub fn binary_subscr(obj: Rc<Self>, idx: Literal) -> Rc<Self> {
        Self::node(ProvenanceInst::BinarySubscr, vec![obj, Self::constant(idx)])
    }

    /// Returns true iff every tag in this record's transitive closure lies
    /// in the safe-for-guarding set (spec.md §3): `{INPUT_ARGS, INPUT_KWARGS,
    /// INPUT_FN, LOAD_ATTR, CONSTANT, BINARY_SUBSCR}`.
    #[must_use]
    pub fn safe_for_guarding(&self) -> bool {
        let safe = matches!(
            self.inst,
            ProvenanceInst::InputArgs
                | ProvenanceInst::InputKwargs
                | ProvenanceInst::InputFn
                | ProvenanceInst::LoadAttr
                | ProvenanceInst::Constant
                | ProvenanceInst::BinarySubscr
        );
        safe && self.inputs.iter().all(|i| i.safe_for_guarding())
    }
}

/// `(concrete_value, provenance)`, with an optional bound proxy (spec.md §3).
#[derive(Debug, Clone)]
pub struct WrappedValue {
    pub value: Value,
    pub provenance: Rc<ProvenanceRecord>,
    proxy: RefCell<Option<Proxy>>,
}

impl WrappedValue {
    #[must_use]
    pub fn new(value: Value, provenance: Rc<ProvenanceRecord>) -> Self {
        Self {
            value,
            provenance,
            proxy: RefCell::new(None),
        }
    }

    #[must_use]
    pub fn proxy(&self) -> Option<Proxy> {
        self.proxy.borrow().clone()
    }

    /// Attaches a proxy to this wrapped value. Idempotent and monotonic: a
    /// bound proxy, once set, is never overwritten (spec.md §4.3).
    pub fn register_proxy(&self, proxy: Proxy) {
        let mut slot = self.proxy.borrow_mut();
        if slot.is_none() {
            *slot = Some(proxy);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ProvenanceInst, ProvenanceRecord};
    use crate::value::Literal;

    #[test]
    fn structural_equality_ignores_proxy_memo() {
        let a = ProvenanceRecord::leaf(ProvenanceInst::InputArgs);
        let b = ProvenanceRecord::leaf(ProvenanceInst::InputArgs);
        assert_eq!(a, b);
    }

    #[test]
    fn load_attr_chain_is_safe_for_guarding() {
        let args = ProvenanceRecord::leaf(ProvenanceInst::InputArgs);
        let idx = ProvenanceRecord::binary_subscr(args, Literal::Int(0));
        let attr = ProvenanceRecord::load_attr(idx, "weight");
        assert!(attr.safe_for_guarding());
    }

    #[test]
    fn opaque_provenance_is_not_safe_for_guarding() {
        let opaque = ProvenanceRecord::node(ProvenanceInst::Opaque, vec![]);
        assert!(!opaque.safe_for_guarding());
    }
}
