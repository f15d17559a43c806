//! Tensor metadata: the only tensor-shaped state this crate ever touches.
//!
//! The actual numerical primitive library is an external collaborator
//! (spec.md §1 Out of scope); `tracekit` only needs enough metadata to
//! guard against (§4.8: `assert_tensor_metadata`) and to report on.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Where a tensor's data lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Device {
    Cpu,
    Cuda(u8),
}

/// Element type of a tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, Serialize, Deserialize)]
pub enum DType {
    Bool,
    Int32,
    Int64,
    Float32,
    Float64,
    BFloat16,
}

/// Shape/device/dtype/strides metadata for one tensor value.
///
/// Two `TensorMeta`s are compared structurally by [`assert_tensor_metadata`]
/// style guards (§4.8); this struct itself only records what a guard needs
/// to check, never tensor contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorMeta {
    pub shape: SmallVec<[i64; 4]>,
    pub strides: SmallVec<[i64; 4]>,
    pub device: Device,
    pub dtype: DType,
    pub requires_grad: bool,
}

impl TensorMeta {
    /// Builds metadata for a freshly described tensor with default (row-major,
    /// contiguous) strides.
    #[must_use]
    pub fn contiguous(shape: &[i64], device: Device, dtype: DType, requires_grad: bool) -> Self {
        let mut strides = SmallVec::<[i64; 4]>::with_capacity(shape.len());
        let mut acc: i64 = 1;
        for &dim in shape.iter().rev() {
            strides.push(acc);
            acc *= dim;
        }
        strides.reverse();
        Self {
            shape: shape.iter().copied().collect(),
            strides,
            device,
            dtype,
            requires_grad,
        }
    }

    #[must_use]
    pub fn rank(&self) -> usize {
        self.shape.len()
    }
}

#[cfg(test)]
mod tests {
    use super::{Device, DType, TensorMeta};

    #[test]
    fn contiguous_strides_for_2d() {
        let meta = TensorMeta::contiguous(&[4, 4], Device::Cpu, DType::Float32, false);
        assert_eq!(&meta.strides[..], &[4, 1]);
    }
}
