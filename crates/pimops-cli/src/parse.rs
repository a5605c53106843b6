use anyhow::{bail, Context, Result};
use pimops_core::{ConstTensor, Dim, TensorShape};

/// `32,?,784` -> partial shape, `?` -> unknown rank, empty -> scalar.
pub fn parse_shape(raw: &str) -> Result<TensorShape> {
    let raw = raw.trim().trim_start_matches('[').trim_end_matches(']');
    if raw == "?" {
        return Ok(TensorShape::unknown());
    }
    if raw.is_empty() {
        return Ok(TensorShape::scalar());
    }
    let dims = raw
        .split(',')
        .map(|d| match d.trim() {
            "?" | "-1" => Ok(Dim::Unknown),
            d => d
                .parse::<usize>()
                .map(Dim::Known)
                .with_context(|| format!("invalid dimension '{d}'")),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(TensorShape::from_dims(dims))
}

/// `INDEX=VALUE` -> (input index, one-element int32 tensor).
pub fn parse_const(raw: &str) -> Result<(usize, ConstTensor)> {
    let Some((idx, value)) = raw.split_once('=') else {
        bail!("expected INDEX=VALUE, got '{raw}'");
    };
    let idx: usize = idx.trim().parse().context("invalid input index")?;
    let value: i32 = value.trim().parse().context("invalid int32 value")?;
    Ok((idx, ConstTensor::scalar_i32(value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shapes() {
        assert_eq!(
            parse_shape("32, ?,784").unwrap(),
            TensorShape::from_dims([Dim::Known(32), Dim::Unknown, Dim::Known(784)])
        );
        assert_eq!(parse_shape("[4,-1]").unwrap().to_string(), "[4,?]");
        assert_eq!(parse_shape("?").unwrap(), TensorShape::unknown());
        assert_eq!(parse_shape("").unwrap(), TensorShape::scalar());
        assert!(parse_shape("3,x").is_err());
    }

    #[test]
    fn consts() {
        let (idx, t) = parse_const("3=1").unwrap();
        assert_eq!(idx, 3);
        assert_eq!(t.as_scalar_i32(), Ok(1));
        assert!(parse_const("3").is_err());
        assert!(parse_const("a=1").is_err());
    }
}
