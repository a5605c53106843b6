use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "pimops", version, about = "PIM custom op registry and shape checker")]
pub struct Cli {
    /// Log level (RUST_LOG)
    #[arg(long, global = true, default_value = "info")]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List registered ops and their signatures
    Ops,

    /// Infer the output shapes of a single op
    Infer {
        /// Registered op name
        #[arg(long, default_value = "PimDense")]
        op: String,

        /// Input shape, once per input in order: `32,?,784`, `?` for unknown rank, `""` for a scalar
        #[arg(long = "shape", allow_hyphen_values = true)]
        shapes: Vec<String>,

        /// Statically known int32 input value as INDEX=VALUE, e.g. `3=1` for has_bias
        #[arg(long = "const")]
        consts: Vec<String>,
    },

    /// Load a JSON graph definition and propagate shapes through it
    Check {
        /// Path to the graph definition
        graph: PathBuf,
    },
}
