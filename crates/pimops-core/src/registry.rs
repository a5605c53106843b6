use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::{ConstTensor, InferenceContext, OpDef, RegistryError, TensorShape};

/// Named ops, filled once during initialization and read-only afterwards.
#[derive(Default, Debug)]
pub struct OpRegistry {
    ops: HashMap<String, Arc<OpDef>>,
}

impl OpRegistry {
    pub fn new() -> Self {
        Self {
            ops: HashMap::new(),
        }
    }

    pub fn register(&mut self, def: OpDef) -> Result<(), RegistryError> {
        let name = def.name().to_string();
        if self.ops.contains_key(&name) {
            return Err(RegistryError::AlreadyRegistered(name));
        }
        debug!(op = %name, signature = %def.signature(), "registered op");
        self.ops.insert(name, Arc::new(def));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<OpDef>> {
        self.ops.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ops.contains_key(name)
    }

    pub fn op_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.ops.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Runs the shape function of `op` for one op instance and returns its
    /// output shapes.
    pub fn infer(
        &self,
        op: &str,
        inputs: &[TensorShape],
        input_tensors: &[Option<ConstTensor>],
    ) -> Result<Vec<TensorShape>, RegistryError> {
        let def = self
            .ops
            .get(op)
            .ok_or_else(|| RegistryError::UnknownOp(op.to_string()))?;
        let signature = def.signature();
        if inputs.len() != signature.inputs.len() {
            return Err(RegistryError::ArityMismatch {
                op: op.to_string(),
                expected: signature.inputs.len(),
                actual: inputs.len(),
            });
        }

        let mut ctx = InferenceContext::new(signature, inputs, input_tensors);
        (def.shape_fn())(&mut ctx)?;

        for (idx, out) in signature.outputs.iter().enumerate() {
            if ctx.output(idx).is_none() {
                warn!(op, output = %out.name, "shape function left output unset, using unknown shape");
            }
        }
        let outputs = ctx.into_outputs();
        debug!(op, ?outputs, "inferred output shapes");
        Ok(outputs)
    }
}
