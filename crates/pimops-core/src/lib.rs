//! Core types for registering custom ops and inferring their output shapes
//! before a graph runs.

pub mod context;
pub mod error;
pub mod op;
pub mod registry;
pub mod spec;
pub mod tensor;

pub use context::*;
pub use error::*;
pub use op::*;
pub use registry::*;
pub use spec::*;
pub use tensor::*;
