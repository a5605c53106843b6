//! Graph-level shape propagation over registered ops.

pub mod def;
pub mod error;
pub mod graph;
pub mod pass;

pub use def::*;
pub use error::*;
pub use graph::*;
pub use pass::*;
