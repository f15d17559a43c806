//! The interpreter frame model (C2 support).
//!
//! Grounded on the grounding codebase's frame/block-stack shape
//! (`bytecode::vm`'s `ClassBodyInfo`/block handling) generalized to this
//! crate's operand type: a [`crate::provenance::WrappedValue`] rather than a
//! full object-model value, since nothing here needs attribute dispatch on
//! the operand stack itself.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::code::Code;
use crate::provenance::WrappedValue;

/// An active exception-handler scope pushed by `SETUP_FINALLY` (spec.md §4.2
/// try/finally model).
#[derive(Debug, Clone, Copy)]
pub struct BlockEntry {
    pub handler_ip: u32,
    pub stack_depth: u16,
}

/// One activation record on the interpreter's explicit frame stack (spec.md
/// §4.2: "re-entrant via an explicit frame stack, not host recursion").
pub struct Frame {
    pub code: Arc<Code>,
    pub ip: u32,
    pub locals: Vec<Option<WrappedValue>>,
    pub stack: SmallVec<[WrappedValue; 8]>,
    pub blocks: Vec<BlockEntry>,
    pub depth: u16,
}

impl Frame {
    #[must_use]
    pub fn new(code: Arc<Code>, args: Vec<WrappedValue>, depth: u16) -> Self {
        let mut locals = vec![None; code.varnames.len()];
        for (slot, arg) in locals.iter_mut().zip(args) {
            *slot = Some(arg);
        }
        Self {
            code,
            ip: 0,
            locals,
            stack: SmallVec::new(),
            blocks: Vec::new(),
            depth,
        }
    }

    pub fn push(&mut self, value: WrappedValue) {
        self.stack.push(value);
    }

    pub fn pop(&mut self) -> Option<WrappedValue> {
        self.stack.pop()
    }

    #[must_use]
    pub fn peek(&self) -> Option<&WrappedValue> {
        self.stack.last()
    }

    pub fn jump_to(&mut self, target: u32) {
        self.ip = target;
    }

    pub fn advance(&mut self) {
        self.ip += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::Frame;
    use crate::code::Code;
    use crate::provenance::{ProvenanceInst, ProvenanceRecord, WrappedValue};
    use crate::value::{Literal, Value};

    #[test]
    fn new_frame_seeds_locals_from_args() {
        let code = Code {
            name: "f".to_string(),
            instrs: vec![],
            consts: vec![],
            names: vec![],
            varnames: vec!["x".to_string(), "y".to_string()],
            arg_count: 2,
        }
        .into_shared();
        let arg = WrappedValue::new(Value::Int(1), ProvenanceRecord::leaf(ProvenanceInst::InputArgs));
        let frame = Frame::new(code, vec![arg], 0);
        assert!(frame.locals[0].is_some());
        assert!(frame.locals[1].is_none());
    }

    #[test]
    fn stack_push_pop_roundtrips() {
        let code = Code {
            name: "f".to_string(),
            instrs: vec![],
            consts: vec![],
            names: vec![],
            varnames: vec![],
            arg_count: 0,
        }
        .into_shared();
        let mut frame = Frame::new(code, vec![], 0);
        let value = WrappedValue::new(Value::Int(7), ProvenanceRecord::constant(Literal::Int(7)));
        frame.push(value);
        assert!(frame.pop().is_some());
        assert!(frame.pop().is_none());
    }
}
