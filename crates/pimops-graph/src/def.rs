//! Serializable graph description, as read from a JSON file.
//!
//! ```json
//! {
//!   "placeholders": [{ "name": "x", "dtype": "float16", "shape": [null, 784] }],
//!   "constants": [{ "name": "flag", "dtype": "int32", "shape": [1], "values": [1] }],
//!   "nodes": [{ "name": "fc1", "op": "PimDense", "inputs": ["x", "w", "b", "flag"] }]
//! }
//! ```
//!
//! A `null` shape is an unknown rank; a `null` dim is an unknown dim.

use half::f16;
use pimops_core::{ConstTensor, DType, Dim, TensorShape};
use serde::{Deserialize, Serialize};

use crate::{Graph, GraphError, ValueRef};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DTypeDef {
    #[serde(rename = "float32")]
    F32,
    #[serde(rename = "float16")]
    F16,
    #[serde(rename = "int64")]
    I64,
    #[serde(rename = "int32")]
    I32,
    #[serde(rename = "uint8")]
    U8,
}

impl From<DTypeDef> for DType {
    fn from(d: DTypeDef) -> Self {
        match d {
            DTypeDef::F32 => DType::F32,
            DTypeDef::F16 => DType::F16,
            DTypeDef::I64 => DType::I64,
            DTypeDef::I32 => DType::I32,
            DTypeDef::U8 => DType::U8,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlaceholderDef {
    pub name: String,
    pub dtype: DTypeDef,
    #[serde(default)]
    pub shape: Option<Vec<Option<usize>>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConstantDef {
    pub name: String,
    pub dtype: DTypeDef,
    /// Omitted for scalars.
    #[serde(default)]
    pub shape: Vec<usize>,
    pub values: Vec<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeDef {
    pub name: String,
    pub op: String,
    pub inputs: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GraphDef {
    #[serde(default)]
    pub placeholders: Vec<PlaceholderDef>,
    #[serde(default)]
    pub constants: Vec<ConstantDef>,
    #[serde(default)]
    pub nodes: Vec<NodeDef>,
}

impl GraphDef {
    /// Builds the graph: placeholders, then constants, then nodes in order.
    pub fn build(&self) -> Result<Graph, GraphError> {
        let mut graph = Graph::new();
        for p in &self.placeholders {
            let shape = match &p.shape {
                None => TensorShape::unknown(),
                Some(dims) => TensorShape::from_dims(dims.iter().map(|d| Dim::from(*d))),
            };
            graph.add_placeholder(&p.name, p.dtype.into(), shape)?;
        }
        for c in &self.constants {
            graph.add_constant(&c.name, c.to_tensor()?)?;
        }
        for n in &self.nodes {
            let inputs = n
                .inputs
                .iter()
                .map(|s| s.parse::<ValueRef>())
                .collect::<Result<Vec<_>, _>>()?;
            graph.add_node(&n.name, &n.op, inputs)?;
        }
        Ok(graph)
    }
}

impl ConstantDef {
    pub fn to_tensor(&self) -> Result<ConstTensor, GraphError> {
        let invalid = |reason: String| GraphError::InvalidConstant {
            name: self.name.clone(),
            reason,
        };
        let dtype = DType::from(self.dtype);
        let bytes = encode(dtype, &self.values).map_err(invalid)?;
        ConstTensor::from_bytes(dtype, &self.shape, bytes.into())
            .map_err(|e| invalid(e.to_string()))
    }
}

/// Little-endian payload for `values`. Integer dtypes reject fractional or
/// out-of-range values.
fn encode(dtype: DType, values: &[f64]) -> Result<Vec<u8>, String> {
    fn int<T: TryFrom<i64>>(v: f64) -> Result<T, String> {
        if v.fract() != 0.0 {
            return Err(format!("{v} is not an integer"));
        }
        // `as` saturates; 2^63 itself is already past i64::MAX.
        const LIMIT: f64 = 9_223_372_036_854_775_808.0;
        if !(-LIMIT..LIMIT).contains(&v) {
            return Err(format!("{v} is out of range"));
        }
        T::try_from(v as i64).map_err(|_| format!("{v} is out of range"))
    }

    let mut out = Vec::with_capacity(values.len() * dtype.byte_size());
    for &v in values {
        match dtype {
            DType::F32 => out.extend_from_slice(&(v as f32).to_le_bytes()),
            DType::I64 => out.extend_from_slice(&int::<i64>(v)?.to_le_bytes()),
            DType::I32 => out.extend_from_slice(&int::<i32>(v)?.to_le_bytes()),
            DType::U8 => out.push(int::<u8>(v)?),
            DType::F16 => out.extend_from_slice(&f16::from_f64(v).to_le_bytes()),
        }
    }
    Ok(out)
}
