use pimops_core::{DType, RegistryError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("value '{0}' is defined more than once")]
    DuplicateName(String),

    #[error("node '{node}' consumes '{value}', which is not defined before it")]
    UnknownValue { node: String, value: String },

    #[error("malformed value reference '{0}', expected NAME or NAME:INDEX")]
    InvalidValueRef(String),

    #[error("node '{node}' uses op '{op}', which is not registered")]
    UnknownOp { node: String, op: String },

    #[error("node '{node}' reads output {index} of '{value}', which has {available} outputs")]
    OutputOutOfRange {
        node: String,
        value: String,
        index: usize,
        available: usize,
    },

    #[error("node '{node}' ({op}): input '{arg}' must be {expected}, got {actual}")]
    DTypeMismatch {
        node: String,
        op: String,
        arg: String,
        expected: DType,
        actual: DType,
    },

    #[error("constant '{name}': {reason}")]
    InvalidConstant { name: String, reason: String },

    #[error("shape inference failed at node '{node}' ({op}) with input shapes {shapes}: {source}")]
    Inference {
        node: String,
        op: String,
        shapes: String,
        #[source]
        source: RegistryError,
    },
}
