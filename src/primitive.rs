//! The symbolic primitive library (C5 support) and the translation table
//! that maps host-ecosystem tensor functions onto it (§6 of spec.md).
//!
//! Modeled as a tagged sum type per spec.md §9 ("model primitives as tagged
//! variants of a single `Primitive` sum type ... dispatch by (primitive
//! tag, operand tag) rather than virtual methods"), mirroring how the
//! grounding codebase models its opcode and exception-type enums
//! (`bytecode::Opcode`, `exception_private::ExcType`) as closed, exhaustively
//! matched sums rather than trait objects.

use indexmap::IndexMap;

use crate::op::{BinOp, CompareOp, UnaryOp};

/// A symbolic operation recognized by the interpreter's primitive dispatch
/// (§4.5: "the interpreter recognizes primitives via a flag and does not
/// descend into them").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum Primitive {
    // --- arithmetic / comparison ---
    BinaryArith(BinOp),
    UnaryArith(UnaryOp),
    Compare(CompareOp),

    // --- shape ---
    BroadcastInDim,
    Reshape,

    // --- reductions ---
    Sum,
    Mean,

    // --- casts ---
    ConvertElementType,

    // --- unpack family (§4.8) ---
    UnpackTrivial,
    UnpackFunctionObj,
    UnpackAttr,
    UnpackGetItem,

    // --- guard family (§4.7/§4.8) ---
    AssertTensorMetadata,
    CheckTensorShapeAndMetadata,
    CheckStringValue,
    CheckNumberTypeAndValue,

    // --- control ---
    Return,
}

impl Primitive {
    /// Whether this primitive is one of the guard-family primitives emitted
    /// while replaying recorded [`crate::trace::Constraint`]s.
    #[must_use]
    pub fn is_guard(self) -> bool {
        matches!(
            self,
            Self::AssertTensorMetadata | Self::CheckTensorShapeAndMetadata | Self::CheckStringValue | Self::CheckNumberTypeAndValue
        )
    }

    /// Whether this primitive is one of the unpack-family primitives emitted
    /// by prologue synthesis.
    #[must_use]
    pub fn is_unpack(self) -> bool {
        matches!(
            self,
            Self::UnpackTrivial | Self::UnpackFunctionObj | Self::UnpackAttr | Self::UnpackGetItem
        )
    }
}

/// Identifies a host-ecosystem tensor/number function by a stable string key
/// (e.g. `"tensor.add"`), the unit the translation table maps from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TranslationKey(pub String);

impl TranslationKey {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }
}

/// The consumed "translation table" (spec.md §6): a mapping from
/// host-ecosystem tensor functions to symbolic primitives. The interpreter
/// installs one lookaside entry per translation (§4.4). Insertion order is
/// preserved so [`Self::iter`] reports translations in registration order,
/// which matters for diagnostics that dump the active table.
#[derive(Debug, Default, Clone)]
pub struct TranslationTable {
    entries: IndexMap<TranslationKey, Primitive>,
}

impl TranslationTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: TranslationKey, primitive: Primitive) -> &mut Self {
        self.entries.insert(key, primitive);
        self
    }

    #[must_use]
    pub fn lookup(&self, key: &TranslationKey) -> Option<Primitive> {
        self.entries.get(key).copied()
    }

    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = (&TranslationKey, &Primitive)> {
        self.entries.iter()
    }

    /// A small default table covering the host-ecosystem arithmetic names
    /// used by the spec.md §8 scenarios (`tensor.add`, `tensor.sub`, ...).
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        table
            .insert(TranslationKey::new("tensor.add"), Primitive::BinaryArith(BinOp::Add))
            .insert(TranslationKey::new("tensor.sub"), Primitive::BinaryArith(BinOp::Sub))
            .insert(TranslationKey::new("tensor.mul"), Primitive::BinaryArith(BinOp::Mul))
            .insert(TranslationKey::new("tensor.truediv"), Primitive::BinaryArith(BinOp::TrueDiv))
            .insert(TranslationKey::new("tensor.neg"), Primitive::UnaryArith(UnaryOp::Neg))
            .insert(TranslationKey::new("tensor.sum"), Primitive::Sum)
            .insert(TranslationKey::new("tensor.mean"), Primitive::Mean)
            .insert(TranslationKey::new("tensor.reshape"), Primitive::Reshape)
            .insert(TranslationKey::new("tensor.broadcast_in_dim"), Primitive::BroadcastInDim)
            .insert(TranslationKey::new("tensor.to"), Primitive::ConvertElementType);
        table
    }
}

#[cfg(test)]
mod tests {
    use super::{Primitive, TranslationKey, TranslationTable};
    use crate::op::BinOp;

    #[test]
    fn default_table_maps_add() {
        let table = TranslationTable::with_defaults();
        assert_eq!(table.lookup(&TranslationKey::new("tensor.add")), Some(Primitive::BinaryArith(BinOp::Add)));
    }

    #[test]
    fn unknown_key_is_not_translated() {
        let table = TranslationTable::with_defaults();
        assert_eq!(table.lookup(&TranslationKey::new("tensor.frobnicate")), None);
    }
}
