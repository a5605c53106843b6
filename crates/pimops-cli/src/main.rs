mod cli;
mod parse;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use pimops_core::{ConstTensor, OpRegistry};
use pimops_graph::{GraphDef, ShapePass};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log).context("invalid --log filter")?)
        .with_writer(std::io::stderr)
        .init();

    let registry = build_registry()?;

    match cli.command {
        Command::Ops => list_ops(&registry),
        Command::Infer { op, shapes, consts } => infer(&registry, &op, &shapes, &consts),
        Command::Check { graph } => check(&registry, &graph),
    }
}

fn build_registry() -> Result<OpRegistry> {
    let mut registry = OpRegistry::new();
    pimops_ops::register_all(&mut registry).context("failed to register ops")?;
    Ok(registry)
}

fn list_ops(registry: &OpRegistry) -> Result<()> {
    for name in registry.op_names() {
        let def = registry.get(name).context("op vanished from registry")?;
        println!("{}", def.signature());
    }
    Ok(())
}

fn infer(registry: &OpRegistry, op: &str, shapes: &[String], consts: &[String]) -> Result<()> {
    let def = registry
        .get(op)
        .with_context(|| format!("unknown op '{op}', see `pimops ops`"))?;

    let inputs = shapes
        .iter()
        .map(|s| parse::parse_shape(s))
        .collect::<Result<Vec<_>>>()?;

    let mut values: Vec<Option<ConstTensor>> = vec![None; inputs.len()];
    for raw in consts {
        let (idx, value) = parse::parse_const(raw)?;
        let Some(slot) = values.get_mut(idx) else {
            bail!("--const index {idx} out of range, {} shapes given", inputs.len());
        };
        *slot = Some(value);
    }

    let outputs = registry
        .infer(op, &inputs, &values)
        .with_context(|| format!("shape inference failed for {op}"))?;
    tracing::info!(op, outputs = outputs.len(), "inference done");

    for (arg, shape) in def.signature().outputs.iter().zip(&outputs) {
        println!("{}: {} {}", arg.name, arg.dtype, shape);
    }
    Ok(())
}

fn check(registry: &OpRegistry, path: &std::path::Path) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let def: GraphDef = serde_json::from_str(&raw)
        .with_context(|| format!("invalid graph definition in {}", path.display()))?;
    let graph = def.build().context("failed to build graph")?;
    tracing::info!(path = %path.display(), entries = graph.len(), "loaded graph");

    let shapes = ShapePass::run(&graph, registry)?;
    for (name, outputs) in shapes.iter() {
        for (idx, value) in outputs.iter().enumerate() {
            println!("{name}:{idx}\t{}\t{}", value.dtype, value.shape);
        }
    }
    Ok(())
}
