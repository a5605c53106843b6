//! The view of one op instance that a shape function works against.

use crate::{ConstTensor, Dim, Dims, OpSignature, ShapeError, TensorShape};

pub struct InferenceContext<'a> {
    signature: &'a OpSignature,
    inputs: &'a [TensorShape],
    input_tensors: &'a [Option<ConstTensor>],
    outputs: Vec<Option<TensorShape>>,
}

impl<'a> InferenceContext<'a> {
    /// `input_tensors` may be shorter than `inputs`; missing entries are
    /// treated as values not known statically.
    pub fn new(
        signature: &'a OpSignature,
        inputs: &'a [TensorShape],
        input_tensors: &'a [Option<ConstTensor>],
    ) -> Self {
        Self {
            signature,
            inputs,
            input_tensors,
            outputs: vec![None; signature.outputs.len()],
        }
    }

    pub fn op_name(&self) -> &str {
        &self.signature.name
    }

    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }

    pub fn input_name(&self, idx: usize) -> String {
        self.signature
            .inputs
            .get(idx)
            .map(|a| a.name.0.clone())
            .unwrap_or_else(|| format!("input{idx}"))
    }

    pub fn input(&self, idx: usize) -> Result<&TensorShape, ShapeError> {
        self.inputs
            .get(idx)
            .ok_or_else(|| ShapeError::InvalidInputIndex {
                op: self.op_name().to_string(),
                index: idx,
                count: self.inputs.len(),
            })
    }

    /// Statically known value of an input, if the caller folded one.
    pub fn input_tensor(&self, idx: usize) -> Option<&ConstTensor> {
        self.input_tensors.get(idx).and_then(Option::as_ref)
    }

    pub fn make_shape<I>(&self, dims: I) -> TensorShape
    where
        I: IntoIterator,
        I::Item: Into<Dim>,
    {
        TensorShape::from_dims(dims)
    }

    pub fn unknown_shape(&self) -> TensorShape {
        TensorShape::unknown()
    }

    pub fn unknown_shape_of_rank(&self, rank: usize) -> TensorShape {
        TensorShape::unknown_of_rank(rank)
    }

    /// Dim at `axis`; negative axes count from the end. Anything that cannot be
    /// resolved statically is `Dim::Unknown`.
    pub fn dim(&self, shape: &TensorShape, axis: isize) -> Dim {
        let Some(rank) = shape.rank() else {
            return Dim::Unknown;
        };
        normalize_axis(axis, rank)
            .and_then(|a| shape.dim(a))
            .unwrap_or(Dim::Unknown)
    }

    /// Dims in `[start, end)`, `end == None` meaning through the last dim.
    /// Negative bounds count from the end. Unknown rank stays unknown.
    pub fn subshape(&self, shape: &TensorShape, start: isize, end: Option<isize>) -> TensorShape {
        let Some(dims) = shape.dims() else {
            return TensorShape::unknown();
        };
        let rank = dims.len() as isize;
        let clamp = |i: isize| {
            let i = if i < 0 { i + rank } else { i };
            i.clamp(0, rank) as usize
        };
        let start = clamp(start);
        let end = end.map_or(dims.len(), clamp);
        if start >= end {
            return TensorShape::scalar();
        }
        TensorShape::from_dims(dims[start..end].iter().copied())
    }

    pub fn concatenate(&self, lhs: &TensorShape, rhs: &TensorShape) -> TensorShape {
        match (lhs.dims(), rhs.dims()) {
            (Some(l), Some(r)) => {
                let dims: Dims = l.iter().chain(r.iter()).copied().collect();
                TensorShape::from_dims(dims)
            }
            _ => TensorShape::unknown(),
        }
    }

    /// Input `idx` constrained to exactly `rank` dims.
    pub fn with_rank(&self, idx: usize, rank: usize) -> Result<TensorShape, ShapeError> {
        let shape = self.input(idx)?;
        match shape.rank() {
            None => Ok(TensorShape::unknown_of_rank(rank)),
            Some(r) if r == rank => Ok(shape.clone()),
            Some(r) => Err(self.invalid_rank(idx, rank.to_string(), r)),
        }
    }

    pub fn with_rank_at_least(&self, idx: usize, rank: usize) -> Result<TensorShape, ShapeError> {
        let shape = self.input(idx)?;
        match shape.rank() {
            Some(r) if r < rank => Err(self.invalid_rank(idx, format!("at least {rank}"), r)),
            _ => Ok(shape.clone()),
        }
    }

    pub fn with_rank_at_most(&self, idx: usize, rank: usize) -> Result<TensorShape, ShapeError> {
        let shape = self.input(idx)?;
        match shape.rank() {
            Some(r) if r > rank => Err(self.invalid_rank(idx, format!("at most {rank}"), r)),
            _ => Ok(shape.clone()),
        }
    }

    /// Unifies two dims that must agree. Both known and unequal is a
    /// `DimensionMismatch`; otherwise the more specific dim wins.
    pub fn merge_input_dims(
        &self,
        (lhs, lhs_axis): (usize, isize),
        (rhs, rhs_axis): (usize, isize),
    ) -> Result<Dim, ShapeError> {
        let lhs_shape = self.input(lhs)?;
        let rhs_shape = self.input(rhs)?;
        match (self.dim(lhs_shape, lhs_axis), self.dim(rhs_shape, rhs_axis)) {
            (Dim::Known(l), Dim::Known(r)) if l != r => Err(ShapeError::DimensionMismatch {
                op: self.op_name().to_string(),
                lhs: self.input_name(lhs),
                lhs_shape: lhs_shape.clone(),
                rhs: self.input_name(rhs),
                rhs_shape: rhs_shape.clone(),
                left: l,
                right: r,
            }),
            (Dim::Known(v), _) | (_, Dim::Known(v)) => Ok(Dim::Known(v)),
            _ => Ok(Dim::Unknown),
        }
    }

    pub fn set_output(&mut self, idx: usize, shape: TensorShape) {
        if let Some(slot) = self.outputs.get_mut(idx) {
            *slot = Some(shape);
        }
    }

    pub fn output(&self, idx: usize) -> Option<&TensorShape> {
        self.outputs.get(idx).and_then(Option::as_ref)
    }

    /// Output shapes; slots the shape function never set are unknown.
    pub fn into_outputs(self) -> Vec<TensorShape> {
        self.outputs
            .into_iter()
            .map(|s| s.unwrap_or_else(TensorShape::unknown))
            .collect()
    }

    pub fn invalid_rank(&self, idx: usize, expected: String, actual: usize) -> ShapeError {
        ShapeError::InvalidRank {
            op: self.op_name().to_string(),
            arg: self.input_name(idx),
            expected,
            actual,
            shape: self.inputs.get(idx).cloned().unwrap_or_else(TensorShape::unknown),
        }
    }
}

fn normalize_axis(axis: isize, rank: usize) -> Option<usize> {
    let rank = rank as isize;
    let a = if axis < 0 { axis + rank } else { axis };
    (0..rank).contains(&a).then_some(a as usize)
}
