use std::fmt;

use crate::DType;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ArgName(pub String);

impl fmt::Display for ArgName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArgSpec {
    pub name: ArgName,
    pub dtype: DType,
}

/// Declared inputs and outputs of an operation, in call order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpSignature {
    pub name: String,
    pub inputs: Vec<ArgSpec>,
    pub outputs: Vec<ArgSpec>,
}

impl OpSignature {
    pub fn input_index(&self, name: &str) -> Option<usize> {
        self.inputs.iter().position(|a| a.name.0 == name)
    }
}

impl fmt::Display for OpSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |args: &[ArgSpec]| {
            args.iter()
                .map(|a| format!("{}: {}", a.name, a.dtype))
                .collect::<Vec<_>>()
                .join(", ")
        };
        write!(
            f,
            "{}({}) -> ({})",
            self.name,
            join(&self.inputs),
            join(&self.outputs)
        )
    }
}
