use std::collections::HashMap;
use std::sync::Arc;

use xxhash_rust::xxh3::Xxh3;

use super::{Assertion, Chunk, Primitive, Program, Ref, Value};
use crate::types::Type;

/// Assembles a [`Program`] in memory and derives its checksums.
///
/// A chunk's checksum covers its own content plus the checksums of every
/// ref and function it reads, so equal sub-expressions always hash the same.
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    program: Program,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a block function. Ref 1 is reserved for the bound value.
    pub fn block() -> Self {
        let mut builder = Self::new();
        builder.push(Chunk::primitive(Primitive::new(Type::Any, Value::Nil)));
        builder
    }

    pub fn push(&mut self, chunk: Chunk) -> Ref {
        self.program.code.push(chunk);
        self.program.code.len() as Ref
    }

    pub fn primitive(&mut self, primitive: Primitive) -> Ref {
        self.push(Chunk::primitive(primitive))
    }

    pub fn property(&mut self, name: &str) -> Ref {
        self.push(Chunk::property(name))
    }

    pub fn call(&mut self, id: &str, binding: Option<Ref>, args: Vec<Primitive>) -> Ref {
        self.push(Chunk::call(id, binding, args))
    }

    /// Registers a nested program and returns the argument referencing it.
    pub fn function(&mut self, function: Program) -> Primitive {
        self.program.functions.push(Arc::new(function));
        Primitive::function(self.program.functions.len() as Ref)
    }

    pub fn entrypoint(&mut self, reference: Ref) -> &mut Self {
        self.program.entrypoints.push(reference);
        self
    }

    pub fn datapoint(&mut self, reference: Ref) -> &mut Self {
        self.program.datapoints.push(reference);
        self
    }

    pub fn assertion(&mut self, reference: Ref, assertion: Assertion) -> &mut Self {
        self.program.assertions.insert(reference, assertion);
        self
    }

    pub fn build(mut self) -> Program {
        let mut checksums = HashMap::new();
        for reference in 1..=self.program.code.len() as Ref {
            checksum_of(&self.program, reference, &mut checksums);
        }
        self.program.checksums = checksums;
        self.program
    }
}

fn checksum_of(program: &Program, reference: Ref, memo: &mut HashMap<Ref, String>) -> String {
    if let Some(checksum) = memo.get(&reference) {
        return checksum.clone();
    }
    let Ok(chunk) = program.chunk(reference) else {
        return String::new();
    };

    let mut hasher = Xxh3::new();
    hasher.update(format!("{:?}", chunk).as_bytes());
    for dependency in chunk.dependencies() {
        // forward refs cannot occur in compiled programs; skip them
        if dependency < reference {
            hasher.update(checksum_of(program, dependency, memo).as_bytes());
        }
    }
    if let Chunk::Call(call) = chunk {
        for fref in call.args.iter().filter_map(Primitive::as_function) {
            if let Ok(function) = program.function(fref) {
                for point in function.callpoints() {
                    if let Some(checksum) = function.checksums.get(&point) {
                        hasher.update(checksum.as_bytes());
                    }
                }
            }
        }
    }

    let checksum = format!("{:016x}", hasher.digest());
    memo.insert(reference, checksum.clone());
    checksum
}
