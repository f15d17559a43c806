//! The `Code` object: a decoded, traceable unit of host-language bytecode.
//!
//! Unlike the grounding codebase (which decodes raw Python bytecode bytes
//! lazily, see `bytecode/vm/mod.rs`'s `fetch_u8!`/`fetch_u16!` macros),
//! `Code` here stores already-decoded [`Instr`]s directly — spec.md's frame
//! model explicitly allows "code object (or equivalent decoded form)", and
//! since parsing host source text is out of scope for this crate (§2.2 of
//! SPEC_FULL.md), there is no raw byte stream to decode lazily from.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::op::Instr;
use crate::value::Literal;

/// A compiled function body: its instructions plus the metadata needed to
/// resolve `LoadConst`/`LoadGlobal`/`LoadAttr`/`LoadFast` operands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Code {
    /// Human-readable name, used in diagnostics and `INPUT_FN` provenance.
    pub name: String,
    /// Decoded instruction sequence. Jump targets are indices into this vec.
    pub instrs: Vec<Instr>,
    /// Constant pool referenced by `LoadConst` and by `CallFunctionKw`'s
    /// `kwnames` tuple.
    pub consts: Vec<Literal>,
    /// Names referenced by `LoadGlobal`/`LoadAttr`/`StoreAttr`/`LoadMethod`.
    pub names: Vec<String>,
    /// Local variable names, indexed by `LoadFast`/`StoreFast`. The first
    /// `arg_count` slots are the function's positional parameters.
    pub varnames: Vec<String>,
    /// Number of positional parameters occupying the first slots of `varnames`.
    pub arg_count: usize,
}

impl Code {
    /// Wraps this code object for cheap sharing across frames and `Value::Function`.
    #[must_use]
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// The tuple-of-strings constant at `idx`, as used by `CallFunctionKw`'s `kwnames`.
    ///
    /// # Panics
    /// Panics if `idx` is out of range or the constant isn't a string tuple;
    /// both are compiler bugs (the only producer of `Code` in this crate is
    /// [`crate::builder::CodeBuilder`], which only ever emits well-formed
    /// `kwnames` references).
    #[must_use]
    pub fn kwnames(&self, idx: u32) -> &[String] {
        match &self.consts[idx as usize] {
            Literal::StrTuple(names) => names,
            other => panic!("kwnames const at {idx} is not a string tuple: {other:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Code;
    use crate::value::Literal;

    #[test]
    fn kwnames_reads_string_tuple_const() {
        let code = Code {
            name: "f".into(),
            instrs: vec![],
            consts: vec![Literal::StrTuple(vec!["y".into()])],
            names: vec![],
            varnames: vec!["x".into(), "y".into()],
            arg_count: 2,
        };
        assert_eq!(code.kwnames(0), ["y".to_string()]);
    }
}
