use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use pimops_core::{ConstTensor, DType, TensorShape};

use crate::GraphError;

/// Output `index` of the value named `source`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ValueRef {
    pub source: String,
    pub index: usize,
}

impl ValueRef {
    pub fn new(source: impl Into<String>) -> Self {
        Self::output(source, 0)
    }

    pub fn output(source: impl Into<String>, index: usize) -> Self {
        Self {
            source: source.into(),
            index,
        }
    }
}

impl FromStr for ValueRef {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || GraphError::InvalidValueRef(s.to_string());
        let (name, index) = match s.rsplit_once(':') {
            Some((name, idx)) => (name, idx.parse::<usize>().map_err(|_| invalid())?),
            None => (s, 0),
        };
        if name.is_empty() {
            return Err(invalid());
        }
        Ok(Self::output(name, index))
    }
}

impl fmt::Display for ValueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.index)
    }
}

#[derive(Clone, Debug)]
pub enum EntryKind {
    Placeholder { dtype: DType, shape: TensorShape },
    Constant(ConstTensor),
    Node { op: String, inputs: Vec<ValueRef> },
}

#[derive(Clone, Debug)]
pub struct Entry {
    pub name: String,
    pub kind: EntryKind,
}

/// A computation graph in definition order. Every node only consumes values
/// defined before it, so the entry order is a valid evaluation order.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_placeholder(
        &mut self,
        name: &str,
        dtype: DType,
        shape: TensorShape,
    ) -> Result<ValueRef, GraphError> {
        self.push(name, EntryKind::Placeholder { dtype, shape })
    }

    pub fn add_constant(&mut self, name: &str, value: ConstTensor) -> Result<ValueRef, GraphError> {
        self.push(name, EntryKind::Constant(value))
    }

    pub fn add_node(
        &mut self,
        name: &str,
        op: &str,
        inputs: Vec<ValueRef>,
    ) -> Result<ValueRef, GraphError> {
        if let Some(missing) = inputs.iter().find(|r| !self.index.contains_key(&r.source)) {
            return Err(GraphError::UnknownValue {
                node: name.to_string(),
                value: missing.source.clone(),
            });
        }
        self.push(
            name,
            EntryKind::Node {
                op: op.to_string(),
                inputs,
            },
        )
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.kind, EntryKind::Node { .. }))
            .count()
    }

    fn push(&mut self, name: &str, kind: EntryKind) -> Result<ValueRef, GraphError> {
        if self.index.contains_key(name) {
            return Err(GraphError::DuplicateName(name.to_string()));
        }
        self.index.insert(name.to_string(), self.entries.len());
        self.entries.push(Entry {
            name: name.to_string(),
            kind,
        });
        Ok(ValueRef::new(name))
    }
}
