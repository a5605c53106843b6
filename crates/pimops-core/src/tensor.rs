use std::fmt;

use bytes::Bytes;
use smallvec::SmallVec;

use crate::ShapeError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DType {
    F32,
    F16,
    I64,
    I32,
    U8,
}

impl DType {
    pub fn byte_size(self) -> usize {
        match self {
            DType::F32 => 4,
            DType::F16 => 2,
            DType::I64 => 8,
            DType::I32 => 4,
            DType::U8 => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DType::F32 => "float32",
            DType::F16 => "float16",
            DType::I64 => "int64",
            DType::I32 => "int32",
            DType::U8 => "uint8",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single dimension, possibly not known until execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dim {
    Known(usize),
    Unknown,
}

impl Dim {
    pub fn value(self) -> Option<usize> {
        match self {
            Dim::Known(v) => Some(v),
            Dim::Unknown => None,
        }
    }

    pub fn is_known(self) -> bool {
        matches!(self, Dim::Known(_))
    }
}

impl From<usize> for Dim {
    fn from(v: usize) -> Self {
        Dim::Known(v)
    }
}

impl From<Option<usize>> for Dim {
    fn from(v: Option<usize>) -> Self {
        v.map_or(Dim::Unknown, Dim::Known)
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dim::Known(v) => write!(f, "{v}"),
            Dim::Unknown => f.write_str("?"),
        }
    }
}

pub type Dims = SmallVec<[Dim; 6]>;

/// Shape of a tensor at graph-construction time.
///
/// `dims == None` means the rank itself is unknown. Individual dims may still be
/// unknown when the rank is known.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TensorShape {
    dims: Option<Dims>,
}

impl TensorShape {
    pub fn unknown() -> Self {
        Self { dims: None }
    }

    pub fn unknown_of_rank(rank: usize) -> Self {
        Self {
            dims: Some(std::iter::repeat(Dim::Unknown).take(rank).collect()),
        }
    }

    pub fn scalar() -> Self {
        Self {
            dims: Some(Dims::new()),
        }
    }

    pub fn from_dims<I>(dims: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Dim>,
    {
        Self {
            dims: Some(dims.into_iter().map(Into::into).collect()),
        }
    }

    pub fn from_slice(d: &[usize]) -> Self {
        Self::from_dims(d.iter().copied())
    }

    pub fn rank(&self) -> Option<usize> {
        self.dims.as_ref().map(|d| d.len())
    }

    pub fn dims(&self) -> Option<&[Dim]> {
        self.dims.as_deref()
    }

    pub fn dim(&self, axis: usize) -> Option<Dim> {
        self.dims.as_ref().and_then(|d| d.get(axis).copied())
    }

    pub fn is_fully_defined(&self) -> bool {
        self.dims
            .as_ref()
            .is_some_and(|d| d.iter().all(|dim| dim.is_known()))
    }

    /// Element count, when every dim is known and the product fits in a
    /// `usize`. A scalar holds one element.
    pub fn num_elements(&self) -> Option<usize> {
        self.dims
            .as_ref()?
            .iter()
            .try_fold(1usize, |acc, d| acc.checked_mul(d.value()?))
    }

    /// Concrete dims, when the shape is fully defined.
    pub fn to_concrete(&self) -> Option<Vec<usize>> {
        self.dims.as_ref()?.iter().map(|d| d.value()).collect()
    }
}

impl fmt::Display for TensorShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(dims) = &self.dims else {
            return f.write_str("<unknown>");
        };
        f.write_str("[")?;
        for (i, d) in dims.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{d}")?;
        }
        f.write_str("]")
    }
}

/// A tensor whose value is known while the graph is being built, such as a
/// folded constant. Payload is little-endian.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConstTensor {
    pub dtype: DType,
    pub shape: SmallVec<[usize; 6]>,
    pub bytes: Bytes,
}

impl ConstTensor {
    pub fn from_bytes(dtype: DType, shape: &[usize], bytes: Bytes) -> Result<Self, ShapeError> {
        let expected = checked_numel(shape)
            .and_then(|n| n.checked_mul(dtype.byte_size()))
            .ok_or_else(|| {
                ShapeError::InvalidConstant(format!(
                    "{dtype} tensor of shape {shape:?} is too large"
                ))
            })?;
        if bytes.len() != expected {
            return Err(ShapeError::InvalidConstant(format!(
                "{dtype} tensor of shape {shape:?} needs {expected} bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self {
            dtype,
            shape: shape.iter().copied().collect(),
            bytes,
        })
    }

    pub fn from_i32(shape: &[usize], values: &[i32]) -> Result<Self, ShapeError> {
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Self::from_bytes(DType::I32, shape, Bytes::from(bytes))
    }

    pub fn scalar_i32(value: i32) -> Self {
        Self {
            dtype: DType::I32,
            shape: SmallVec::new(),
            bytes: Bytes::copy_from_slice(&value.to_le_bytes()),
        }
    }

    pub fn tensor_shape(&self) -> TensorShape {
        TensorShape::from_slice(&self.shape)
    }

    /// Element count; `from_bytes` guarantees it does not overflow.
    pub fn numel(&self) -> usize {
        self.bytes.len() / self.dtype.byte_size()
    }

    pub fn to_i32_vec(&self) -> Result<Vec<i32>, ShapeError> {
        if self.dtype != DType::I32 {
            return Err(ShapeError::InvalidConstant(format!(
                "expected int32 constant, got {}",
                self.dtype
            )));
        }
        Ok(self
            .bytes
            .chunks_exact(4)
            .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }

    /// Reads a single int32 value from a scalar or one-element tensor.
    pub fn as_scalar_i32(&self) -> Result<i32, ShapeError> {
        let values = self.to_i32_vec()?;
        match values.as_slice() {
            [v] => Ok(*v),
            _ => Err(ShapeError::InvalidConstant(format!(
                "expected a single int32 value, got {} elements",
                values.len()
            ))),
        }
    }
}

fn checked_numel(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}
