//! Opcode table and stack-effect model for the interpreted bytecode subset.
//!
//! `tracekit` models a CPython-3.11-shaped stack bytecode, restricted to the
//! subset needed to trace numeric/tensor functions: arithmetic, comparisons,
//! branches, loops, attribute/subscript access, plain and keyword calls, and
//! a minimal try/finally block model. Decoding a byte stream into [`Instr`]
//! values is out of scope for this crate (see [`crate::builder`]); [`Instr`]
//! is itself the "decoded form" spec.md allows the frame model to hold.

use serde::{Deserialize, Serialize};

/// Binary arithmetic/bitwise operators carried by [`Instr::BinaryOp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    TrueDiv,
    FloorDiv,
    Mod,
    Pow,
    MatMul,
    BitAnd,
    BitOr,
    BitXor,
    LShift,
    RShift,
}

/// Unary operators carried by [`Instr::UnaryOp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
    Invert,
}

/// Comparison kinds carried by [`Instr::CompareOp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// The opcode name, independent of any operand.
///
/// Used to index the stack-effect table (§4.1: "a static table keyed by
/// opcode name"). [`Instr`] carries the operand; `OpName` is what a tracer
/// or profiler groups by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, Serialize, Deserialize)]
pub enum OpName {
    LoadConst,
    LoadFast,
    StoreFast,
    LoadGlobal,
    LoadAttr,
    StoreAttr,
    BinarySubscr,
    StoreSubscr,
    BinaryOp,
    UnaryOp,
    CompareOp,
    PopJumpIfFalse,
    PopJumpIfTrue,
    JumpForward,
    JumpBackward,
    CallFunction,
    CallFunctionKw,
    LoadMethod,
    CallMethod,
    PopTop,
    DupTop,
    BuildTuple,
    GetIter,
    ForIter,
    SetupFinally,
    PopBlock,
    RaiseVarargs,
    ReturnValue,
}

/// A single decoded instruction: opcode name plus whatever operand it needs.
///
/// Jump targets are instruction indices into the owning [`crate::code::Code`]'s
/// instruction vector, not byte offsets — see [`crate::code::Code`] docs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instr {
    /// Push `consts[idx]`.
    LoadConst(u32),
    /// Push the local/argument slot `idx`.
    LoadFast(u16),
    /// Pop TOS, store into local slot `idx`.
    StoreFast(u16),
    /// Push the global named `names[idx]`, consulting the global callback.
    LoadGlobal(u16),
    /// Pop an object, push its attribute `names[idx]`.
    LoadAttr(u16),
    /// Pop a value and an object, store the value as the object's attribute `names[idx]`.
    StoreAttr(u16),
    /// Pop an index and an object, push `object[index]`.
    BinarySubscr,
    /// Pop an index, an object, and a value; store `object[index] = value`.
    StoreSubscr,
    /// Pop two operands, push the result of the binary operator.
    BinaryOp(BinOp),
    /// Pop one operand, push the result of the unary operator.
    UnaryOp(UnaryOp),
    /// Pop two operands, push the boolean (or symbolic) comparison result.
    CompareOp(CompareOp),
    /// Pop TOS; if falsy, jump to the instruction index.
    PopJumpIfFalse(u32),
    /// Pop TOS; if truthy, jump to the instruction index.
    PopJumpIfTrue(u32),
    /// Unconditional forward jump to the instruction index.
    JumpForward(u32),
    /// Unconditional backward jump to the instruction index (loop back-edge).
    JumpBackward(u32),
    /// Pop `argc` positional args and a callable, push the call result.
    CallFunction(u8),
    /// Pop `argc` positional args, a tuple-of-names const at `kwnames`, and a
    /// callable; push the call result. The trailing `argc - kwnames.len()`
    /// args are positional, the rest keyword, matching CPython's convention.
    CallFunctionKw { argc: u8, kwnames: u32 },
    /// Pop an object, push `(bound_method_or_null, self_or_method)` for a
    /// subsequent `CallMethod`.
    LoadMethod(u16),
    /// Pop `argc` positional args plus the two values pushed by `LoadMethod`,
    /// push the call result.
    CallMethod(u8),
    /// Discard TOS.
    PopTop,
    /// Duplicate TOS.
    DupTop,
    /// Pop `count` values, push a tuple of them (bottom-to-top order).
    BuildTuple(u16),
    /// Pop an iterable, push an iterator over it.
    GetIter,
    /// Peek the iterator on TOS; push the next item, or jump to the
    /// instruction index and pop the iterator when exhausted.
    ForIter(u32),
    /// Push an exception handler block whose handler starts at the
    /// instruction index, recording the current stack depth.
    SetupFinally(u32),
    /// Pop the innermost exception handler block.
    PopBlock,
    /// Raise: `argc == 0` re-raises the active exception, `argc == 1` raises TOS.
    RaiseVarargs(u8),
    /// Pop TOS and return it from the current frame.
    ReturnValue,
}

impl Instr {
    /// The opcode name, independent of operand.
    #[must_use]
    pub fn op_name(&self) -> OpName {
        match self {
            Self::LoadConst(_) => OpName::LoadConst,
            Self::LoadFast(_) => OpName::LoadFast,
            Self::StoreFast(_) => OpName::StoreFast,
            Self::LoadGlobal(_) => OpName::LoadGlobal,
            Self::LoadAttr(_) => OpName::LoadAttr,
            Self::StoreAttr(_) => OpName::StoreAttr,
            Self::BinarySubscr => OpName::BinarySubscr,
            Self::StoreSubscr => OpName::StoreSubscr,
            Self::BinaryOp(_) => OpName::BinaryOp,
            Self::UnaryOp(_) => OpName::UnaryOp,
            Self::CompareOp(_) => OpName::CompareOp,
            Self::PopJumpIfFalse(_) => OpName::PopJumpIfFalse,
            Self::PopJumpIfTrue(_) => OpName::PopJumpIfTrue,
            Self::JumpForward(_) => OpName::JumpForward,
            Self::JumpBackward(_) => OpName::JumpBackward,
            Self::CallFunction(_) => OpName::CallFunction,
            Self::CallFunctionKw { .. } => OpName::CallFunctionKw,
            Self::LoadMethod(_) => OpName::LoadMethod,
            Self::CallMethod(_) => OpName::CallMethod,
            Self::PopTop => OpName::PopTop,
            Self::DupTop => OpName::DupTop,
            Self::BuildTuple(_) => OpName::BuildTuple,
            Self::GetIter => OpName::GetIter,
            Self::ForIter(_) => OpName::ForIter,
            Self::SetupFinally(_) => OpName::SetupFinally,
            Self::PopBlock => OpName::PopBlock,
            Self::RaiseVarargs(_) => OpName::RaiseVarargs,
            Self::ReturnValue => OpName::ReturnValue,
        }
    }

    /// Whether this instruction's jump target is to be taken, given the
    /// dynamic condition observed this dispatch. For non-branching
    /// instructions this is always `false`.
    #[must_use]
    pub fn jump_target(&self, condition_truthy: bool, iterator_exhausted: bool) -> Option<u32> {
        match *self {
            Self::PopJumpIfFalse(t) if !condition_truthy => Some(t),
            Self::PopJumpIfTrue(t) if condition_truthy => Some(t),
            Self::JumpForward(t) | Self::JumpBackward(t) => Some(t),
            Self::ForIter(t) if iterator_exhausted => Some(t),
            _ => None,
        }
    }
}

/// Net operand-stack effect of dispatching one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackEffect {
    pub pops: u16,
    pub pushes: u16,
}

impl StackEffect {
    #[must_use]
    pub const fn new(pops: u16, pushes: u16) -> Self {
        Self { pops, pushes }
    }
}

/// Computes the stack effect of dispatching `instr`, given whether any jump
/// it carries is taken and (for `ForIter`) whether the iterator was
/// exhausted.
///
/// Matches spec.md §4.1: "a function that takes `(opname, oparg, jump_taken)`
/// and returns effects" — generalized here to take the instruction directly
/// since `Instr` already carries its operand.
#[must_use]
pub fn stack_effect(instr: &Instr, jump_taken: bool) -> StackEffect {
    match instr {
        Instr::LoadConst(_) | Instr::LoadFast(_) | Instr::LoadGlobal(_) => StackEffect::new(0, 1),
        Instr::StoreFast(_) | Instr::PopTop => StackEffect::new(1, 0),
        Instr::LoadAttr(_) | Instr::UnaryOp(_) => StackEffect::new(1, 1),
        Instr::StoreAttr(_) => StackEffect::new(2, 0),
        Instr::BinarySubscr | Instr::BinaryOp(_) | Instr::CompareOp(_) => StackEffect::new(2, 1),
        Instr::StoreSubscr => StackEffect::new(3, 0),
        Instr::PopJumpIfFalse(_) | Instr::PopJumpIfTrue(_) => StackEffect::new(1, 0),
        Instr::JumpForward(_) | Instr::JumpBackward(_) | Instr::PopBlock => StackEffect::new(0, 0),
        Instr::CallFunction(argc) => StackEffect::new(u16::from(*argc) + 1, 1),
        Instr::CallFunctionKw { argc, .. } => StackEffect::new(u16::from(*argc) + 2, 1),
        Instr::LoadMethod(_) => StackEffect::new(1, 2),
        Instr::CallMethod(argc) => StackEffect::new(u16::from(*argc) + 2, 1),
        Instr::DupTop => StackEffect::new(0, 1),
        Instr::BuildTuple(count) => StackEffect::new(*count, 1),
        Instr::GetIter => StackEffect::new(1, 1),
        Instr::ForIter(_) => {
            if jump_taken {
                StackEffect::new(1, 0)
            } else {
                StackEffect::new(0, 1)
            }
        }
        Instr::SetupFinally(_) => StackEffect::new(0, 0),
        Instr::RaiseVarargs(argc) => StackEffect::new(u16::from(*argc), 0),
        Instr::ReturnValue => StackEffect::new(1, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::{BinOp, Instr, OpName, stack_effect};

    #[test]
    fn op_name_matches_instr_shape() {
        assert_eq!(Instr::LoadConst(0).op_name(), OpName::LoadConst);
        assert_eq!(Instr::BinaryOp(BinOp::Add).op_name(), OpName::BinaryOp);
    }

    #[test]
    fn for_iter_effect_depends_on_exhaustion() {
        let instr = Instr::ForIter(10);
        assert_eq!(stack_effect(&instr, false).pushes, 1);
        assert_eq!(stack_effect(&instr, true).pops, 1);
    }

    #[test]
    fn call_function_pops_callee_and_args() {
        let instr = Instr::CallFunction(3);
        let eff = stack_effect(&instr, false);
        assert_eq!(eff.pops, 4);
        assert_eq!(eff.pushes, 1);
    }
}
