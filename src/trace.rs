//! The symbolic trace builder (C6): `BoundSymbol`, `TraceCtx`, `Constraint`.

use ahash::AHashSet;
use serde::Serialize;

use crate::primitive::Primitive;
use crate::proxy::{Proxy, ProxyName};
use crate::value::Literal;

/// Either a proxy or an inlined literal argument/output (spec.md §3 BoundSymbol).
#[derive(Debug, Clone)]
pub enum Arg {
    Proxy(Proxy),
    Literal(Literal),
}

impl Arg {
    #[must_use]
    pub fn as_proxy(&self) -> Option<&Proxy> {
        match self {
            Self::Proxy(p) => Some(p),
            Self::Literal(_) => None,
        }
    }
}

impl From<Proxy> for Arg {
    fn from(p: Proxy) -> Self {
        Self::Proxy(p)
    }
}

impl From<Literal> for Arg {
    fn from(l: Literal) -> Self {
        Self::Literal(l)
    }
}

/// An invocation record: a primitive applied to positional/keyword
/// arguments, producing zero or more proxy outputs (spec.md §3 BoundSymbol).
#[derive(Debug, Clone)]
pub struct BoundSymbol {
    pub primitive: Primitive,
    pub args: Vec<Arg>,
    pub kwargs: Vec<(String, Arg)>,
    pub outputs: Vec<Proxy>,
}

impl BoundSymbol {
    #[must_use]
    pub fn new(primitive: Primitive, args: Vec<Arg>, outputs: Vec<Proxy>) -> Self {
        Self {
            primitive,
            args,
            kwargs: Vec::new(),
            outputs,
        }
    }

    #[must_use]
    pub fn with_kwargs(mut self, kwargs: Vec<(String, Arg)>) -> Self {
        self.kwargs = kwargs;
        self
    }

    /// All proxy arguments, positional then keyword, in order — the set
    /// prologue synthesis's used-input discovery walks (spec.md §4.8).
    pub fn proxy_args(&self) -> impl Iterator<Item = &Proxy> {
        self.args
            .iter()
            .filter_map(Arg::as_proxy)
            .chain(self.kwargs.iter().filter_map(|(_, a)| a.as_proxy()))
    }
}

/// A function signature descriptor: named positional params plus optional
/// varargs/kwargs names (spec.md §3 TraceCtx).
#[derive(Debug, Clone, Default)]
pub struct SignatureDescriptor {
    pub positional: Vec<String>,
    pub varargs: Option<String>,
    pub varkwargs: Option<String>,
}

/// A `(guard_primitive, proxy_or_literal_args)` pair accumulated during
/// interpretation and replayed into the prologue (spec.md §3 Constraint).
#[derive(Debug, Clone)]
pub struct Constraint {
    pub guard: Primitive,
    pub args: Vec<Arg>,
}

impl Constraint {
    #[must_use]
    pub fn new(guard: Primitive, args: Vec<Arg>) -> Self {
        debug_assert!(guard.is_guard(), "constraint primitive must be a guard: {guard}");
        Self { guard, args }
    }
}

/// An ordered list of bound symbols plus signature and output descriptors
/// (spec.md §3 TraceCtx). Two instances exist per compilation: prologue and
/// computation (spec.md §3 "Two trace contexts exist during compilation").
#[derive(Debug, Clone, Default)]
pub struct TraceCtx {
    pub name: String,
    bound_symbols: Vec<BoundSymbol>,
    /// Names that have had an output symbol actually bound, checked by
    /// [`Self::bind`] to reject re-bindings.
    bound_names: AHashSet<ProxyName>,
    /// Names reserved via [`Self::add_name`] ahead of constructing their
    /// unpack chain. Tracked separately from `bound_names` so that the
    /// reservation itself doesn't trip [`Self::bind`]'s duplicate check
    /// when the chain's own symbol is bound afterward.
    declared_names: AHashSet<ProxyName>,
    pub signature: SignatureDescriptor,
    pub outputs: Vec<Arg>,
}

/// Trace-internal invariant violations: always a compiler bug, never a
/// user-code error (spec.md §7 Trace-invariant-violation).
#[derive(Debug, Clone, PartialEq, Eq, strum::Display)]
pub enum TraceError {
    #[strum(to_string = "duplicate binding of proxy {0}")]
    DuplicateBinding(ProxyName),
}

impl std::error::Error for TraceError {}

impl TraceCtx {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bound_symbols: Vec::new(),
            bound_names: AHashSet::new(),
            declared_names: AHashSet::new(),
            signature: SignatureDescriptor::default(),
            outputs: Vec::new(),
        }
    }

    #[must_use]
    pub fn bound_symbols(&self) -> &[BoundSymbol] {
        &self.bound_symbols
    }

    #[must_use]
    pub fn has_name(&self, name: ProxyName) -> bool {
        self.declared_names.contains(&name)
    }

    /// Reserves a proxy name ahead of constructing its unpack chain (used by
    /// prologue synthesis before it binds that chain's own symbol, mirroring
    /// `thunder`'s `prologue_trace.add_name`). Distinct from the output
    /// tracking [`Self::bind`] performs: reserving a name here does not
    /// count as binding it.
    pub fn add_name(&mut self, name: ProxyName) {
        self.declared_names.insert(name);
    }

    /// Appends a bound symbol, rejecting re-bindings of any output proxy
    /// (spec.md §4.6: "emission rejects re-bindings").
    pub fn bind(&mut self, symbol: BoundSymbol) -> Result<(), TraceError> {
        for output in &symbol.outputs {
            if !self.bound_names.insert(output.name()) {
                return Err(TraceError::DuplicateBinding(output.name()));
            }
        }
        self.bound_symbols.push(symbol);
        Ok(())
    }

    /// Rotates the trailing `count` symbols (the computation trace's
    /// appended `unpack_trivial` calls, §4.8 Computation hoist) to the
    /// front, so the trace reads: unpack → work → return.
    pub fn hoist_trailing(&mut self, count: usize) {
        let len = self.bound_symbols.len();
        assert!(count <= len, "cannot hoist more symbols ({count}) than the trace holds ({len})");
        let mut rotated = self.bound_symbols.split_off(len - count);
        rotated.extend(std::mem::take(&mut self.bound_symbols));
        self.bound_symbols = rotated;
    }

    /// Renders the trace to a pretty-printed JSON snapshot for external
    /// tooling (a debug dump, not a re-loadable serialization: `Arg` only
    /// round-trips to its display string).
    ///
    /// # Errors
    /// Returns a `serde_json::Error` if the snapshot cannot be formatted
    /// (unreachable in practice, since every field is a plain string or
    /// `String` vector).
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&TraceSnapshot::from(self))
    }
}

fn arg_to_string(arg: &Arg) -> String {
    match arg {
        Arg::Proxy(p) => p.name().to_string(),
        Arg::Literal(l) => l.to_string(),
    }
}

/// A JSON-serializable snapshot of a [`TraceCtx`] (spec.md §4.9 diagnostics
/// surface). Each proxy/literal argument is flattened to its display string;
/// this is a debugging artifact, not a format the compiler reads back.
#[derive(Debug, Serialize)]
pub struct TraceSnapshot {
    pub name: String,
    pub symbols: Vec<BoundSymbolSnapshot>,
    pub outputs: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BoundSymbolSnapshot {
    pub primitive: String,
    pub args: Vec<String>,
    pub kwargs: Vec<(String, String)>,
    pub outputs: Vec<String>,
}

impl From<&TraceCtx> for TraceSnapshot {
    fn from(trace: &TraceCtx) -> Self {
        Self {
            name: trace.name.clone(),
            symbols: trace.bound_symbols.iter().map(BoundSymbolSnapshot::from).collect(),
            outputs: trace.outputs.iter().map(arg_to_string).collect(),
        }
    }
}

impl From<&BoundSymbol> for BoundSymbolSnapshot {
    fn from(symbol: &BoundSymbol) -> Self {
        Self {
            primitive: symbol.primitive.to_string(),
            args: symbol.args.iter().map(arg_to_string).collect(),
            kwargs: symbol.kwargs.iter().map(|(k, v)| (k.clone(), arg_to_string(v))).collect(),
            outputs: symbol.outputs.iter().map(|p| p.name().to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{Arg, BoundSymbol, TraceCtx};
    use crate::primitive::Primitive;
    use crate::proxy::{NumberType, Proxy, ProxyName};

    fn number(id: u64) -> Proxy {
        Proxy::number(ProxyName::new(id), None, NumberType::Int, None)
    }

    #[test]
    fn duplicate_binding_is_rejected() {
        let mut trace = TraceCtx::new("computation");
        let p = number(1);
        trace
            .bind(BoundSymbol::new(Primitive::UnpackTrivial, vec![], vec![p.clone()]))
            .unwrap();
        let err = trace
            .bind(BoundSymbol::new(Primitive::UnpackTrivial, vec![], vec![p]))
            .unwrap_err();
        assert_eq!(err.to_string(), "duplicate binding of proxy t1");
    }

    #[test]
    fn hoist_moves_trailing_symbols_to_front() {
        let mut trace = TraceCtx::new("computation");
        let a = number(1);
        let b = number(2);
        trace.bind(BoundSymbol::new(Primitive::Return, vec![Arg::Proxy(a.clone())], vec![])).unwrap();
        trace
            .bind(BoundSymbol::new(Primitive::UnpackTrivial, vec![], vec![b.clone()]))
            .unwrap();
        trace.hoist_trailing(1);
        assert_eq!(trace.bound_symbols()[0].primitive, Primitive::UnpackTrivial);
        assert_eq!(trace.bound_symbols()[1].primitive, Primitive::Return);
    }

    #[test]
    fn to_json_snapshots_symbols_and_outputs() {
        let mut trace = TraceCtx::new("computation");
        let p = number(1);
        trace
            .bind(BoundSymbol::new(Primitive::UnpackTrivial, vec![], vec![p.clone()]))
            .unwrap();
        trace.outputs = vec![Arg::Proxy(p)];
        let json = trace.to_json().unwrap();
        assert!(json.contains("\"name\": \"computation\""));
        assert!(json.contains("\"UnpackTrivial\""));
        assert!(json.contains("\"t1\""));
    }
}
