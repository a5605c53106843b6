use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use pimops_core::{DType, OpDef, OpRegistry, RegistryError, ShapeError, TensorShape};

fn identity_op(name: &str) -> OpDef {
    OpDef::builder(name)
        .input("x", DType::F16)
        .output("y", DType::F16)
        .shape_fn(|c| {
            let x = c.input(0)?.clone();
            c.set_output(0, x);
            Ok(())
        })
        .build()
}

#[test]
fn register_and_lookup() -> Result<()> {
    let mut reg = OpRegistry::new();
    assert!(reg.is_empty());
    reg.register(identity_op("B"))?;
    reg.register(identity_op("A"))?;
    assert_eq!(reg.op_names(), ["A", "B"]);
    assert!(reg.contains("A"));
    let def = reg.get("B").context("B registered")?;
    assert_eq!(def.name(), "B");
    assert!(reg.get("C").is_none());
    Ok(())
}

#[test]
fn duplicate_registration_fails() -> Result<()> {
    let mut reg = OpRegistry::new();
    reg.register(identity_op("Id"))?;
    assert_eq!(
        reg.register(identity_op("Id")),
        Err(RegistryError::AlreadyRegistered("Id".to_string()))
    );
    assert_eq!(reg.len(), 1);
    Ok(())
}

#[test]
fn infer_checks_op_and_arity() -> Result<()> {
    let mut reg = OpRegistry::new();
    reg.register(identity_op("Id"))?;

    let x = TensorShape::from_slice(&[3, 4]);
    assert_eq!(reg.infer("Id", &[x.clone()], &[])?, vec![x.clone()]);
    assert_eq!(
        reg.infer("Nope", &[x.clone()], &[]),
        Err(RegistryError::UnknownOp("Nope".to_string()))
    );
    assert!(matches!(
        reg.infer("Id", &[x.clone(), x], &[]),
        Err(RegistryError::ArityMismatch { expected: 1, actual: 2, .. })
    ));
    Ok(())
}

#[test]
fn shape_fn_failure_is_wrapped() -> Result<()> {
    let mut reg = OpRegistry::new();
    reg.register(
        OpDef::builder("Vec")
            .input("v", DType::F32)
            .output("o", DType::F32)
            .shape_fn(|c| {
                let v = c.with_rank(0, 1)?;
                c.set_output(0, v);
                Ok(())
            })
            .build(),
    )?;
    let res = reg.infer("Vec", &[TensorShape::from_slice(&[2, 2])], &[]);
    assert!(matches!(
        res,
        Err(RegistryError::Shape(ShapeError::InvalidRank { actual: 2, .. }))
    ));
    Ok(())
}

#[test]
fn op_without_shape_fn_yields_unknown() -> Result<()> {
    let mut reg = OpRegistry::new();
    reg.register(
        OpDef::builder("Opaque")
            .input("a", DType::U8)
            .output("b", DType::U8)
            .output("c", DType::U8)
            .build(),
    )?;
    let out = reg.infer("Opaque", &[TensorShape::scalar()], &[])?;
    assert_eq!(out, vec![TensorShape::unknown(), TensorShape::unknown()]);
    Ok(())
}

#[test]
fn concurrent_inference_shares_registry() -> Result<()> {
    let mut reg = OpRegistry::new();
    reg.register(identity_op("Id"))?;
    let reg = Arc::new(reg);

    thread::scope(|s| {
        let handles: Vec<_> = (1..=8usize)
            .map(|n| {
                let reg = Arc::clone(&reg);
                s.spawn(move || {
                    let x = TensorShape::from_slice(&[n, n + 1]);
                    let out = reg.infer("Id", &[x.clone()], &[]);
                    (x, out)
                })
            })
            .collect();
        for h in handles {
            let (x, out) = h.join().expect("worker panicked");
            assert_eq!(out, Ok(vec![x]));
        }
    });
    Ok(())
}
