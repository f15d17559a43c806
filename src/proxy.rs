//! The proxy layer (C5): symbolic stand-ins for tensors, numbers, and strings.
//!
//! Grounded on the shape of the grounding codebase's small immediate-value
//! identifiers (`proxy.rs`'s `ProxyId`), generalized here to the richer
//! tagged-variant `Proxy` spec.md §3 describes. Each variant shares identity
//! via `Rc` so the same proxy can appear, by reference, in both the
//! prologue and computation traces (spec.md §5 Memory).

use std::fmt;
use std::rc::Rc;

use crate::provenance::ProvenanceRecord;
use crate::tensor::TensorMeta;

/// A globally-unique (within one compilation) proxy identifier, minted from
/// a monotonic counter held by [`crate::context::CompileContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProxyName(u64);

impl ProxyName {
    #[must_use]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProxyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// The primitive numeric type a [`NumberProxy`] stands in for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum NumberType {
    Bool,
    Int,
    Float,
    Complex,
}

/// A known scalar value a [`NumberProxy`] may carry, for constant-value
/// specialization (§4.9 `CacheOption::ConstantValues`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KnownNumber {
    Bool(bool),
    Int(i64),
    Float(f64),
}

struct TensorProxyInner {
    name: ProxyName,
    history: Option<Rc<ProvenanceRecord>>,
    meta: TensorMeta,
}

struct NumberProxyInner {
    name: ProxyName,
    history: Option<Rc<ProvenanceRecord>>,
    number_type: NumberType,
    known_value: Option<KnownNumber>,
}

struct StringProxyInner {
    name: ProxyName,
    history: Option<Rc<ProvenanceRecord>>,
    known_value: Option<String>,
}

/// A symbolic stand-in for a runtime value (spec.md §3 Proxy).
///
/// Proxies are immutable after creation: `history` is fixed at construction
/// time (unlike `ProvenanceRecord::proxy`, which is a later-filled memo
/// slot, `Proxy::history` is never mutated). Cloning a `Proxy` clones the
/// `Rc`, preserving identity.
#[derive(Clone)]
pub enum Proxy {
    Tensor(Rc<TensorProxyInner>),
    Number(Rc<NumberProxyInner>),
    String(Rc<StringProxyInner>),
}

impl Proxy {
    #[must_use]
    pub fn tensor(name: ProxyName, history: Option<Rc<ProvenanceRecord>>, meta: TensorMeta) -> Self {
        Self::Tensor(Rc::new(TensorProxyInner { name, history, meta }))
    }

    #[must_use]
    pub fn number(
        name: ProxyName,
        history: Option<Rc<ProvenanceRecord>>,
        number_type: NumberType,
        known_value: Option<KnownNumber>,
    ) -> Self {
        Self::Number(Rc::new(NumberProxyInner {
            name,
            history,
            number_type,
            known_value,
        }))
    }

    #[must_use]
    pub fn string(name: ProxyName, history: Option<Rc<ProvenanceRecord>>, known_value: Option<String>) -> Self {
        Self::String(Rc::new(StringProxyInner {
            name,
            history,
            known_value,
        }))
    }

    #[must_use]
    pub fn name(&self) -> ProxyName {
        match self {
            Self::Tensor(t) => t.name,
            Self::Number(n) => n.name,
            Self::String(s) => s.name,
        }
    }

    #[must_use]
    pub fn history(&self) -> Option<&Rc<ProvenanceRecord>> {
        match self {
            Self::Tensor(t) => t.history.as_ref(),
            Self::Number(n) => n.history.as_ref(),
            Self::String(s) => s.history.as_ref(),
        }
    }

    #[must_use]
    pub fn tensor_meta(&self) -> Option<&TensorMeta> {
        match self {
            Self::Tensor(t) => Some(&t.meta),
            _ => None,
        }
    }

    #[must_use]
    pub fn known_number(&self) -> Option<KnownNumber> {
        match self {
            Self::Number(n) => n.known_value,
            _ => None,
        }
    }

    #[must_use]
    pub fn known_string(&self) -> Option<&str> {
        match self {
            Self::String(s) => s.known_value.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tensor(t) => write!(f, "TensorProxy({}, shape={:?})", t.name, t.meta.shape),
            Self::Number(n) => write!(f, "NumberProxy({}, {})", n.name, n.number_type),
            Self::String(s) => write!(f, "StringProxy({})", s.name),
        }
    }
}

impl PartialEq for Proxy {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}
impl Eq for Proxy {}

impl std::hash::Hash for Proxy {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::{KnownNumber, NumberType, Proxy, ProxyName};

    #[test]
    fn clone_preserves_identity() {
        let p = Proxy::number(ProxyName::new(1), None, NumberType::Int, Some(KnownNumber::Int(1)));
        let q = p.clone();
        assert_eq!(p, q);
        assert_eq!(p.name(), q.name());
    }

    #[test]
    fn distinct_names_are_distinct_proxies() {
        let p = Proxy::number(ProxyName::new(1), None, NumberType::Int, None);
        let q = Proxy::number(ProxyName::new(2), None, NumberType::Int, None);
        assert_ne!(p, q);
    }
}
