//! Compiled program model consumed by the executor.
//!
//! A program is a flat list of chunks addressed by 1-based refs. Block
//! functions are nested programs whose ref 1 is bound to the value the
//! block runs against.

pub mod builder;
pub mod labels;
mod value;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use value::{Primitive, RawData, RawResult, Value};

use crate::error::ProgramError;

/// 1-based index into a program's chunk list.
pub type Ref = u32;

/// A call on a bound value: a builtin operator or a resource field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Call {
    pub id: String,
    pub binding: Option<Ref>,
    pub args: Vec<Primitive>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Chunk {
    Primitive(Primitive),
    /// Named input binding supplied with the run.
    Property { name: String },
    Call(Call),
}

impl Chunk {
    pub fn primitive(primitive: Primitive) -> Self {
        Chunk::Primitive(primitive)
    }

    pub fn property(name: &str) -> Self {
        Chunk::Property {
            name: name.to_string(),
        }
    }

    pub fn call(id: &str, binding: Option<Ref>, args: Vec<Primitive>) -> Self {
        Chunk::Call(Call {
            id: id.to_string(),
            binding,
            args,
        })
    }

    /// Refs this chunk reads when it resolves.
    pub fn dependencies(&self) -> Vec<Ref> {
        match self {
            Chunk::Call(call) => call
                .binding
                .into_iter()
                .chain(call.args.iter().filter_map(Primitive::as_reference))
                .collect(),
            Chunk::Primitive(primitive) => primitive.as_reference().into_iter().collect(),
            Chunk::Property { .. } => vec![],
        }
    }
}

/// Datapoints grouped under one assertion. They are evaluated but never
/// labeled for regular output.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Assertion {
    pub datapoints: Vec<Ref>,
    pub checksums: Vec<String>,
    #[serde(default)]
    pub decode_block: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    pub code: Vec<Chunk>,
    #[serde(default)]
    pub functions: Vec<Arc<Program>>,
    #[serde(default)]
    pub entrypoints: Vec<Ref>,
    #[serde(default)]
    pub datapoints: Vec<Ref>,
    #[serde(default)]
    pub checksums: HashMap<Ref, String>,
    #[serde(default)]
    pub assertions: HashMap<Ref, Assertion>,
}

impl Program {
    pub fn chunk(&self, reference: Ref) -> Result<&Chunk, ProgramError> {
        reference
            .checked_sub(1)
            .and_then(|idx| self.code.get(idx as usize))
            .ok_or(ProgramError::InvalidRef { reference })
    }

    pub fn function(&self, reference: Ref) -> Result<&Arc<Program>, ProgramError> {
        reference
            .checked_sub(1)
            .and_then(|idx| self.functions.get(idx as usize))
            .ok_or(ProgramError::UnknownFunction { reference })
    }

    pub fn checksum(&self, reference: Ref) -> Result<&str, ProgramError> {
        self.checksums
            .get(&reference)
            .map(String::as_str)
            .ok_or(ProgramError::MissingChecksum { reference })
    }

    /// Entrypoints followed by datapoints.
    pub fn callpoints(&self) -> impl Iterator<Item = Ref> + '_ {
        self.entrypoints
            .iter()
            .chain(self.datapoints.iter())
            .copied()
    }

    pub fn callpoint_count(&self) -> usize {
        self.entrypoints.len() + self.datapoints.len()
    }

    /// Datapoints referenced by any assertion.
    pub fn assertion_datapoints(&self) -> HashSet<Ref> {
        self.assertions
            .values()
            .flat_map(|assertion| assertion.datapoints.iter().copied())
            .collect()
    }

    /// Checks the invariants the executor relies on, recursing into
    /// functions.
    pub fn validate(&self) -> Result<(), ProgramError> {
        let mut seen = HashSet::new();
        for reference in self.callpoints() {
            self.chunk(reference)?;
            self.checksum(reference)?;
            if !seen.insert(reference) {
                return Err(ProgramError::DuplicateCallpoint { reference });
            }
        }

        for chunk in &self.code {
            for dependency in chunk.dependencies() {
                self.chunk(dependency)?;
            }
            if let Chunk::Call(call) = chunk {
                for fref in call.args.iter().filter_map(Primitive::as_function) {
                    self.function(fref)?;
                }
            }
        }

        for function in &self.functions {
            function.validate()?;
        }
        Ok(())
    }
}
