use std::collections::HashMap;

use unicode_normalization::UnicodeNormalization;

use super::{Chunk, Primitive, Program, Ref, Value};
use crate::error::ProgramError;
use crate::registry::Operator;

/// Human readable labels for reported results, keyed by checksum.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Labels {
    pub labels: HashMap<String, String>,
}

impl Labels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_program(program: &Program) -> Result<Self, ProgramError> {
        let mut labels = Self::new();
        labels.update(program)?;
        Ok(labels)
    }

    pub fn get(&self, checksum: &str) -> Option<&str> {
        self.labels.get(checksum).map(String::as_str)
    }

    /// Adds labels for the program's entrypoints and datapoints, skipping
    /// datapoints that belong to assertions.
    pub fn update(&mut self, program: &Program) -> Result<(), ProgramError> {
        let assertion_points = program.assertion_datapoints();
        let refs: Vec<Ref> = program
            .entrypoints
            .iter()
            .chain(
                program
                    .datapoints
                    .iter()
                    .filter(|r| !assertion_points.contains(r)),
            )
            .copied()
            .collect();

        for reference in refs {
            let checksum = program.checksum(reference)?.to_string();
            if self.labels.contains_key(&checksum) {
                continue;
            }
            let label = self.create_label(program, reference)?;
            self.labels.insert(checksum, label);
        }

        for assertion in program.assertions.values() {
            if !assertion.decode_block {
                continue;
            }
            for checksum in &assertion.checksums {
                self.labels.remove(checksum);
            }
        }
        Ok(())
    }

    fn create_label(&mut self, program: &Program, reference: Ref) -> Result<String, ProgramError> {
        let call = match program.chunk(reference)? {
            Chunk::Primitive(_) => return Ok(String::new()),
            Chunk::Property { name } => return Ok(strip_control(name)),
            Chunk::Call(call) => call,
        };

        let Some(binding) = call.binding else {
            return Ok(strip_control(&call.id));
        };
        let parent = self.create_label(program, binding)?;

        let label = match call.id.as_str() {
            "[]" => {
                let arg = call.args.first().ok_or_else(|| ProgramError::Label {
                    reference,
                    message: "array access without an index".to_string(),
                })?;
                let index = match &arg.value {
                    Value::Int(i) => i.to_string(),
                    Value::String(s) => s.clone(),
                    other => {
                        return Err(ProgramError::Label {
                            reference,
                            message: format!("cannot label index of type {}", other.kind()),
                        })
                    }
                };
                format!("{}[{}]", parent, index)
            }
            "{}" => {
                self.update_function_labels(program, &call.args)?;
                parent
            }
            id => match id.parse::<Operator>() {
                Ok(op) if op.is_comparison() => {
                    let arg = match call.args.first() {
                        Some(arg) => self.arg_label(program, arg)?,
                        None => String::new(),
                    };
                    format!("{} {} {}", parent, op, arg)
                }
                _ => {
                    self.update_function_labels(program, &call.args)?;
                    if parent.is_empty() {
                        id.to_string()
                    } else {
                        format!("{}.{}", parent, id)
                    }
                }
            },
        };
        Ok(strip_control(&label))
    }

    fn arg_label(&mut self, program: &Program, arg: &Primitive) -> Result<String, ProgramError> {
        match &arg.value {
            Value::Ref(r) => self.create_label(program, *r),
            Value::Function(_) => Ok("{}".to_string()),
            other => Ok(other.to_string()),
        }
    }

    fn update_function_labels(
        &mut self,
        program: &Program,
        args: &[Primitive],
    ) -> Result<(), ProgramError> {
        for fref in args.iter().filter_map(Primitive::as_function) {
            let function = program.function(fref)?.clone();
            self.update(&function)?;
        }
        Ok(())
    }
}

// decomposed first so accented letters keep their base character
fn strip_control(label: &str) -> String {
    label.nfkd().filter(|c| (' '..='~').contains(c)).collect()
}
