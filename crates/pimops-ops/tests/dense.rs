use anyhow::{ensure, Context, Result};
use pimops_core::{ConstTensor, Dim, OpRegistry, RegistryError, ShapeError, TensorShape};
use pimops_ops::dense::HAS_BIAS;
use pimops_ops::{register_all, PIM_DENSE};

fn registry() -> Result<OpRegistry> {
    let mut reg = OpRegistry::new();
    register_all(&mut reg).context("register ops")?;
    Ok(reg)
}

fn shape(d: &[usize]) -> TensorShape {
    TensorShape::from_slice(d)
}

fn infer(
    reg: &OpRegistry,
    shapes: [TensorShape; 4],
    has_bias: Option<i32>,
) -> std::result::Result<TensorShape, RegistryError> {
    let consts = [None, None, None, has_bias.map(|v| ConstTensor::from_i32(&[1], &[v]).unwrap())];
    let mut out = reg.infer(PIM_DENSE, &shapes, &consts)?;
    assert_eq!(out.len(), 1);
    Ok(out.remove(0))
}

fn shape_err(res: std::result::Result<TensorShape, RegistryError>) -> Result<ShapeError> {
    match res {
        Err(RegistryError::Shape(e)) => Ok(e),
        other => anyhow::bail!("expected shape error, got {other:?}"),
    }
}

#[test]
fn dense_2d_with_bias() -> Result<()> {
    let reg = registry()?;
    let out = infer(
        &reg,
        [shape(&[32, 784]), shape(&[784, 10]), shape(&[10]), shape(&[1])],
        Some(1),
    )?;
    assert_eq!(out, shape(&[32, 10]));
    Ok(())
}

#[test]
fn dense_keeps_leading_batch_dims() -> Result<()> {
    let reg = registry()?;
    let out = infer(
        &reg,
        [
            shape(&[4, 7, 256]),
            shape(&[256, 1024]),
            shape(&[1024]),
            TensorShape::scalar(),
        ],
        None,
    )?;
    assert_eq!(out, shape(&[4, 7, 1024]));
    Ok(())
}

#[test]
fn contraction_mismatch_is_rejected() -> Result<()> {
    let reg = registry()?;
    let err = shape_err(infer(
        &reg,
        [shape(&[8, 100]), shape(&[99, 10]), shape(&[10]), shape(&[1])],
        None,
    ))?;
    match &err {
        ShapeError::DimensionMismatch {
            lhs,
            rhs,
            left,
            right,
            ..
        } => {
            assert_eq!(lhs, "input");
            assert_eq!(rhs, "weight");
            assert_eq!((*left, *right), (100, 99));
        }
        other => anyhow::bail!("unexpected error {other:?}"),
    }
    let msg = err.to_string();
    ensure!(msg.contains("PimDense"), "message should name the op: {msg}");
    ensure!(msg.contains("[8,100]") && msg.contains("[99,10]"), "message should carry shapes: {msg}");
    Ok(())
}

#[test]
fn weight_must_be_rank_two() -> Result<()> {
    let reg = registry()?;
    for weight in [shape(&[784]), shape(&[1, 784, 10])] {
        let err = shape_err(infer(
            &reg,
            [shape(&[32, 784]), weight.clone(), shape(&[10]), shape(&[1])],
            None,
        ))?;
        match err {
            ShapeError::InvalidRank { arg, actual, .. } => {
                assert_eq!(arg, "weight");
                assert_eq!(Some(actual), weight.rank());
            }
            other => anyhow::bail!("unexpected error {other:?}"),
        }
    }
    Ok(())
}

#[test]
fn scalar_input_is_rejected() -> Result<()> {
    let reg = registry()?;
    let err = shape_err(infer(
        &reg,
        [TensorShape::scalar(), shape(&[1, 10]), shape(&[10]), shape(&[1])],
        None,
    ))?;
    ensure!(matches!(err, ShapeError::InvalidRank { ref arg, .. } if arg == "input"));
    Ok(())
}

#[test]
fn unknown_input_rank_gives_unknown_output() -> Result<()> {
    let reg = registry()?;
    let out = infer(
        &reg,
        [
            TensorShape::unknown(),
            shape(&[784, 10]),
            shape(&[10]),
            TensorShape::unknown(),
        ],
        None,
    )?;
    assert_eq!(out.rank(), None);
    Ok(())
}

#[test]
fn unknown_dims_propagate() -> Result<()> {
    let reg = registry()?;
    let input = TensorShape::from_dims([Dim::Unknown, Dim::Known(784)]);
    let out = infer(
        &reg,
        [input, shape(&[784, 10]), shape(&[10]), shape(&[1])],
        Some(1),
    )?;
    assert_eq!(out, TensorShape::from_dims([Dim::Unknown, Dim::Known(10)]));

    let weight = TensorShape::from_dims([Dim::Known(784), Dim::Unknown]);
    let out = infer(
        &reg,
        [shape(&[2, 784]), weight, shape(&[10]), shape(&[1])],
        Some(1),
    )?;
    assert_eq!(out, TensorShape::from_dims([Dim::Known(2), Dim::Unknown]));

    let out = infer(
        &reg,
        [
            shape(&[2, 784]),
            TensorShape::unknown(),
            TensorShape::unknown(),
            TensorShape::unknown(),
        ],
        None,
    )?;
    assert_eq!(out, TensorShape::from_dims([Dim::Known(2), Dim::Unknown]));
    Ok(())
}

#[test]
fn contraction_not_checked_when_unknown() -> Result<()> {
    let reg = registry()?;
    let input = TensorShape::from_dims([Dim::Known(3), Dim::Unknown]);
    let out = infer(
        &reg,
        [input, shape(&[64, 16]), shape(&[16]), shape(&[1])],
        None,
    )?;
    assert_eq!(out, shape(&[3, 16]));
    Ok(())
}

#[test]
fn bias_mismatch_when_enabled() -> Result<()> {
    let reg = registry()?;
    let err = shape_err(infer(
        &reg,
        [shape(&[32, 784]), shape(&[784, 10]), shape(&[12]), shape(&[1])],
        Some(1),
    ))?;
    match err {
        ShapeError::DimensionMismatch {
            lhs, left, right, ..
        } => {
            assert_eq!(lhs, "bias");
            assert_eq!((left, right), (12, 10));
        }
        other => anyhow::bail!("unexpected error {other:?}"),
    }

    // A length-1 placeholder does not satisfy an enabled bias.
    let res = infer(
        &reg,
        [shape(&[32, 784]), shape(&[784, 10]), shape(&[1]), shape(&[1])],
        Some(1),
    );
    ensure!(res.is_err(), "expected mismatch, got {res:?}");
    Ok(())
}

#[test]
fn disabled_bias_is_not_validated() -> Result<()> {
    let reg = registry()?;
    let out = infer(
        &reg,
        [shape(&[32, 784]), shape(&[784, 10]), shape(&[3, 3]), shape(&[1])],
        Some(0),
    )?;
    assert_eq!(out, shape(&[32, 10]));
    Ok(())
}

#[test]
fn bias_checked_when_flag_not_constant() -> Result<()> {
    let reg = registry()?;
    let res = infer(
        &reg,
        [shape(&[32, 784]), shape(&[784, 10]), shape(&[12]), shape(&[1])],
        None,
    );
    ensure!(
        matches!(res, Err(RegistryError::Shape(ShapeError::DimensionMismatch { .. }))),
        "got {res:?}"
    );

    // Placeholder bias passed alongside a runtime flag.
    let out = infer(
        &reg,
        [shape(&[32, 784]), shape(&[784, 10]), shape(&[1]), shape(&[1])],
        None,
    )?;
    assert_eq!(out, shape(&[32, 10]));

    let res = infer(
        &reg,
        [shape(&[32, 784]), shape(&[784, 10]), shape(&[2, 10]), shape(&[1])],
        None,
    );
    ensure!(
        matches!(res, Err(RegistryError::Shape(ShapeError::InvalidRank { .. }))),
        "got {res:?}"
    );
    Ok(())
}

#[test]
fn has_bias_must_be_a_single_value() -> Result<()> {
    let reg = registry()?;
    let res = infer(
        &reg,
        [shape(&[32, 784]), shape(&[784, 10]), shape(&[10]), shape(&[2])],
        None,
    );
    ensure!(
        matches!(res, Err(RegistryError::Shape(ShapeError::DimensionMismatch { .. }))),
        "got {res:?}"
    );

    let res = infer(
        &reg,
        [shape(&[32, 784]), shape(&[784, 10]), shape(&[10]), shape(&[1, 1])],
        None,
    );
    ensure!(
        matches!(res, Err(RegistryError::Shape(ShapeError::InvalidRank { .. }))),
        "got {res:?}"
    );
    Ok(())
}

#[test]
fn signature_matches_registration() -> Result<()> {
    let reg = registry()?;
    let def = reg.get(PIM_DENSE).context("PimDense registered")?;
    let sig = def.signature();
    let names: Vec<_> = sig.inputs.iter().map(|a| a.name.0.as_str()).collect();
    assert_eq!(names, ["input", "weight", "bias", "has_bias"]);
    assert_eq!(sig.input_index("has_bias"), Some(HAS_BIAS));
    assert_eq!(
        sig.to_string(),
        "PimDense(input: float16, weight: float16, bias: float16, has_bias: int32) -> (ans: float16)"
    );
    Ok(())
}
