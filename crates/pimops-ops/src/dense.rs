//! `PimDense`: a fully connected layer executed on a processing-in-memory
//! device. Only the signature and shape function live here.

use pimops_core::{DType, Dim, InferenceContext, OpDef, ShapeError, TensorShape};
use tracing::debug;

pub const PIM_DENSE: &str = "PimDense";

pub const INPUT: usize = 0;
pub const WEIGHT: usize = 1;
pub const BIAS: usize = 2;
pub const HAS_BIAS: usize = 3;

/// What shape inference knows about the `has_bias` flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BiasMode {
    Enabled,
    Disabled,
    /// Only decided at run time.
    Unknown,
}

pub fn pim_dense_op() -> OpDef {
    OpDef::builder(PIM_DENSE)
        .input("input", DType::F16)
        .input("weight", DType::F16)
        .input("bias", DType::F16)
        .input("has_bias", DType::I32)
        .output("ans", DType::F16)
        .shape_fn(infer_dense_shape)
        .build()
}

/// `[batch..., in] x [in, out] (+ [out]) -> [batch..., out]`
pub fn infer_dense_shape(c: &mut InferenceContext<'_>) -> Result<(), ShapeError> {
    let input = c.with_rank_at_least(INPUT, 1)?;
    let weight = c.with_rank(WEIGHT, 2)?;

    let batch_dims = c.subshape(&input, 0, Some(-1));
    let out_features = c.dim(&weight, 1);
    c.merge_input_dims((INPUT, -1), (WEIGHT, 0))?;

    let mode = bias_mode(c)?;
    check_bias(c, mode, out_features)?;

    let out = c.concatenate(&batch_dims, &c.make_shape([out_features]));
    debug!(op = c.op_name(), ?mode, output = %out, "dense shape");
    c.set_output(0, out);
    Ok(())
}

/// Reads `has_bias` when its value was folded into a constant. The flag is a
/// scalar or a one-element vector.
pub fn bias_mode(c: &InferenceContext<'_>) -> Result<BiasMode, ShapeError> {
    let flag_shape = c.with_rank_at_most(HAS_BIAS, 1)?;
    if let Some(n) = flag_shape.num_elements() {
        if n != 1 {
            return Err(ShapeError::DimensionMismatch {
                op: c.op_name().to_string(),
                lhs: c.input_name(HAS_BIAS),
                lhs_shape: flag_shape,
                rhs: "scalar flag".to_string(),
                rhs_shape: TensorShape::from_slice(&[1]),
                left: n,
                right: 1,
            });
        }
    }

    let Some(value) = c.input_tensor(HAS_BIAS) else {
        return Ok(BiasMode::Unknown);
    };
    Ok(if value.as_scalar_i32()? != 0 {
        BiasMode::Enabled
    } else {
        BiasMode::Disabled
    })
}

fn check_bias(
    c: &InferenceContext<'_>,
    mode: BiasMode,
    out_features: Dim,
) -> Result<(), ShapeError> {
    if mode == BiasMode::Disabled {
        return Ok(());
    }
    let bias = c.with_rank(BIAS, 1)?;
    let (Dim::Known(len), Dim::Known(out)) = (c.dim(&bias, 0), out_features) else {
        return Ok(());
    };
    // A length-1 bias is how callers pass "no bias" when the flag is not a
    // constant; it also broadcasts.
    let ok = len == out || (mode == BiasMode::Unknown && len == 1);
    if ok {
        return Ok(());
    }
    Err(ShapeError::DimensionMismatch {
        op: c.op_name().to_string(),
        lhs: c.input_name(BIAS),
        lhs_shape: bias,
        rhs: c.input_name(WEIGHT),
        rhs_shape: c.input(WEIGHT)?.clone(),
        left: len,
        right: out,
    })
}
