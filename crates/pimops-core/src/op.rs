use std::fmt;
use std::sync::Arc;

use crate::{ArgName, ArgSpec, DType, InferenceContext, OpSignature, ShapeError};

/// Shape-inference callback. Returns a failure status instead of panicking;
/// unset outputs are left unknown.
pub type ShapeFn = Arc<dyn Fn(&mut InferenceContext<'_>) -> Result<(), ShapeError> + Send + Sync>;

/// Immutable registration record: the op's signature and its shape function.
#[derive(Clone)]
pub struct OpDef {
    signature: OpSignature,
    shape_fn: ShapeFn,
}

impl OpDef {
    pub fn builder(name: impl Into<String>) -> OpDefBuilder {
        OpDefBuilder {
            signature: OpSignature {
                name: name.into(),
                inputs: Vec::new(),
                outputs: Vec::new(),
            },
            shape_fn: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.signature.name
    }

    pub fn signature(&self) -> &OpSignature {
        &self.signature
    }

    pub fn shape_fn(&self) -> &ShapeFn {
        &self.shape_fn
    }
}

impl fmt::Debug for OpDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpDef")
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

pub struct OpDefBuilder {
    signature: OpSignature,
    shape_fn: Option<ShapeFn>,
}

impl OpDefBuilder {
    pub fn input(mut self, name: &str, dtype: DType) -> Self {
        self.signature.inputs.push(ArgSpec {
            name: ArgName(name.to_string()),
            dtype,
        });
        self
    }

    pub fn output(mut self, name: &str, dtype: DType) -> Self {
        self.signature.outputs.push(ArgSpec {
            name: ArgName(name.to_string()),
            dtype,
        });
        self
    }

    pub fn shape_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut InferenceContext<'_>) -> Result<(), ShapeError> + Send + Sync + 'static,
    {
        let f: ShapeFn = Arc::new(f);
        self.shape_fn = Some(f);
        self
    }

    /// Without a shape function every output is inferred as unknown.
    pub fn build(self) -> OpDef {
        let shape_fn: ShapeFn = match self.shape_fn {
            Some(f) => f,
            None => Arc::new(unknown_outputs),
        };
        OpDef {
            signature: self.signature,
            shape_fn,
        }
    }
}

fn unknown_outputs(_: &mut InferenceContext<'_>) -> Result<(), ShapeError> {
    Ok(())
}
