//! Concrete runtime values the interpreter operates over.
//!
//! Deliberately far smaller than the grounding codebase's `value.rs` (a full
//! Python object model): `tracekit` never mutates container state or runs
//! real tensor kernels, so `Value` only needs enough shape to drive
//! provenance propagation and sharp-edge classification (§4.7 of spec.md:
//! "wrapping a non-constant value whose type is none of {tensor, number,
//! string, known container, callable, module}").

use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::code::Code;
use crate::tensor::TensorMeta;

/// A literal constant, as stored in a [`crate::code::Code`]'s constant pool
/// or inlined directly into prologue unpacking (spec.md §4.8: "`CONSTANT(v)`
/// with `v: int|str`").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    None,
    Bool(bool),
    Int(i64),
    Float(u64), // bits of an f64, so Literal can derive Eq/Hash for trace dedup
    Str(String),
    /// A tuple of strings, used only as the `kwnames` operand of `CallFunctionKw`.
    StrTuple(Vec<String>),
}

impl Literal {
    #[must_use]
    pub fn float(v: f64) -> Self {
        Self::Float(v.to_bits())
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(bits) => Some(f64::from_bits(*bits)),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(bits) => write!(f, "{}", f64::from_bits(*bits)),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::StrTuple(names) => write!(f, "{names:?}"),
        }
    }
}

/// A plain host object carrying named attributes, standing in for arbitrary
/// user-defined container instances (spec.md scenario 2: "`m` is a
/// container with `weight` a float tensor").
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostObject {
    pub attrs: AHashMap<String, Value>,
}

/// Identity of a host callable the interpreter cannot descend into (no
/// `Code` available), used for opaque-call classification (§4.2 step 4).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OpaqueCallable(pub String);

/// A concrete value flowing through the interpreter, always paired with a
/// [`crate::provenance::Provenance`] inside a [`crate::provenance::WrappedValue`].
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    /// Metadata-only tensor handle: this crate never touches tensor data,
    /// only shape/device/dtype/requires-grad/strides (spec.md §3 Proxy).
    Tensor(Arc<TensorMeta>),
    Tuple(Arc<Vec<Value>>),
    Object(Arc<HostObject>),
    /// A user-defined function whose code is available for interpretation
    /// (§4.2 step 3: "if `fn` is a host function whose code is available").
    Function(Arc<Code>),
    /// A callable with no available code (§4.2 step 4: opaque).
    Opaque(OpaqueCallable),
    Module(Arc<str>),
}

impl Value {
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "NoneType",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Tensor(_) => "Tensor",
            Self::Tuple(_) => "tuple",
            Self::Object(_) => "object",
            Self::Function(_) => "function",
            Self::Opaque(_) => "builtin_function",
            Self::Module(_) => "module",
        }
    }

    #[must_use]
    pub fn truthy(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::Str(s) => !s.is_empty(),
            Self::Tuple(t) => !t.is_empty(),
            Self::Tensor(_) | Self::Object(_) | Self::Function(_) | Self::Opaque(_) | Self::Module(_) => true,
        }
    }

    /// Classifies this value for the sharp-edge "known container/callable/module" check.
    #[must_use]
    pub fn is_known_safe_shape(&self) -> bool {
        matches!(
            self,
            Self::Tuple(_) | Self::Function(_) | Self::Opaque(_) | Self::Module(_) | Self::Object(_)
        )
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Tensor(t) => write!(f, "Tensor(shape={:?})", t.shape),
            Self::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
            Self::Object(_) => write!(f, "<object>"),
            Self::Function(c) => write!(f, "<function {}>", c.name),
            Self::Opaque(c) => write!(f, "<builtin {}>", c.0),
            Self::Module(name) => write!(f, "<module {name}>"),
        }
    }
}
