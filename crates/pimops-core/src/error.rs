use thiserror::Error;

use crate::TensorShape;

/// Failure status returned by a shape-inference callback.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShapeError {
    #[error("{op}: input '{arg}' must be rank {expected}, got rank {actual} (shape {shape})")]
    InvalidRank {
        op: String,
        arg: String,
        expected: String,
        actual: usize,
        shape: TensorShape,
    },

    #[error("{op}: dimension mismatch, '{lhs}' {lhs_shape} has {left} but '{rhs}' {rhs_shape} has {right}")]
    DimensionMismatch {
        op: String,
        lhs: String,
        lhs_shape: TensorShape,
        rhs: String,
        rhs_shape: TensorShape,
        left: usize,
        right: usize,
    },

    #[error("{op}: input index {index} out of range, op has {count} inputs")]
    InvalidInputIndex {
        op: String,
        index: usize,
        count: usize,
    },

    #[error("invalid constant tensor: {0}")]
    InvalidConstant(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("op '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("op '{0}' is not registered")]
    UnknownOp(String),

    #[error("op '{op}' expects {expected} inputs, got {actual}")]
    ArityMismatch {
        op: String,
        expected: usize,
        actual: usize,
    },

    #[error(transparent)]
    Shape(#[from] ShapeError),
}
