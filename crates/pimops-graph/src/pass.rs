use std::collections::HashMap;

use pimops_core::{ConstTensor, DType, OpRegistry, TensorShape};
use tracing::{debug, info};

use crate::{EntryKind, Graph, GraphError, ValueRef};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InferredValue {
    pub dtype: DType,
    pub shape: TensorShape,
}

/// Inferred outputs of every graph entry, in graph order.
#[derive(Clone, Debug, Default)]
pub struct ShapeMap {
    order: Vec<String>,
    values: HashMap<String, Vec<InferredValue>>,
}

impl ShapeMap {
    pub fn outputs(&self, name: &str) -> Option<&[InferredValue]> {
        self.values.get(name).map(Vec::as_slice)
    }

    pub fn get(&self, value: &ValueRef) -> Option<&InferredValue> {
        self.values.get(&value.source)?.get(value.index)
    }

    pub fn shape(&self, value: &ValueRef) -> Option<&TensorShape> {
        self.get(value).map(|v| &v.shape)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[InferredValue])> {
        self.order
            .iter()
            .map(|name| (name.as_str(), self.values[name].as_slice()))
    }

    fn insert(&mut self, name: &str, outputs: Vec<InferredValue>) {
        self.order.push(name.to_string());
        self.values.insert(name.to_string(), outputs);
    }
}

/// Propagates shapes through a graph ahead of execution, calling each node's
/// shape function exactly once. The first failure aborts the pass.
pub struct ShapePass;

impl ShapePass {
    pub fn run(graph: &Graph, registry: &OpRegistry) -> Result<ShapeMap, GraphError> {
        let mut shapes = ShapeMap::default();

        for entry in graph.entries() {
            let outputs = match &entry.kind {
                EntryKind::Placeholder { dtype, shape } => vec![InferredValue {
                    dtype: *dtype,
                    shape: shape.clone(),
                }],
                EntryKind::Constant(value) => vec![InferredValue {
                    dtype: value.dtype,
                    shape: value.tensor_shape(),
                }],
                EntryKind::Node { op, inputs } => {
                    Self::infer_node(graph, registry, &shapes, &entry.name, op, inputs)?
                }
            };
            shapes.insert(&entry.name, outputs);
        }

        info!(
            entries = graph.len(),
            nodes = graph.node_count(),
            "shape inference complete"
        );
        Ok(shapes)
    }

    fn infer_node(
        graph: &Graph,
        registry: &OpRegistry,
        shapes: &ShapeMap,
        node: &str,
        op: &str,
        inputs: &[ValueRef],
    ) -> Result<Vec<InferredValue>, GraphError> {
        let def = registry.get(op).ok_or_else(|| GraphError::UnknownOp {
            node: node.to_string(),
            op: op.to_string(),
        })?;
        let signature = def.signature();

        let mut in_shapes = Vec::with_capacity(inputs.len());
        let mut in_values: Vec<Option<ConstTensor>> = Vec::with_capacity(inputs.len());
        for (pos, input) in inputs.iter().enumerate() {
            let available = shapes.outputs(&input.source).map_or(0, <[_]>::len);
            let value = shapes.get(input).ok_or_else(|| GraphError::OutputOutOfRange {
                node: node.to_string(),
                value: input.source.clone(),
                index: input.index,
                available,
            })?;

            if let Some(arg) = signature.inputs.get(pos) {
                if arg.dtype != value.dtype {
                    return Err(GraphError::DTypeMismatch {
                        node: node.to_string(),
                        op: op.to_string(),
                        arg: arg.name.0.clone(),
                        expected: arg.dtype,
                        actual: value.dtype,
                    });
                }
            }

            in_shapes.push(value.shape.clone());
            in_values.push(constant_value(graph, input));
        }

        let out_shapes = registry
            .infer(op, &in_shapes, &in_values)
            .map_err(|source| GraphError::Inference {
                node: node.to_string(),
                op: op.to_string(),
                shapes: format_shapes(&in_shapes),
                source,
            })?;
        debug!(node, op, inputs = %format_shapes(&in_shapes), outputs = %format_shapes(&out_shapes), "inferred node");

        Ok(signature
            .outputs
            .iter()
            .zip(out_shapes)
            .map(|(arg, shape)| InferredValue {
                dtype: arg.dtype,
                shape,
            })
            .collect())
    }
}

fn constant_value(graph: &Graph, input: &ValueRef) -> Option<ConstTensor> {
    match graph.get(&input.source).map(|e| &e.kind) {
        Some(EntryKind::Constant(value)) if input.index == 0 => Some(value.clone()),
        _ => None,
    }
}

fn format_shapes(shapes: &[TensorShape]) -> String {
    let parts: Vec<String> = shapes.iter().map(ToString::to_string).collect();
    format!("({})", parts.join(", "))
}
