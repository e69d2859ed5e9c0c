use core::fmt;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Ref;
use crate::error::ExecError;
use crate::graph::ResourceHandle;
use crate::types::Type;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Regex pattern source.
    Regex(String),
    Array(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Resource(ResourceHandle),
    Ref(Ref),
    Function(Ref),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Strings and regex patterns both expose their text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Regex(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Capability check for resource-like values.
    pub fn as_resource(&self) -> Option<&ResourceHandle> {
        match self {
            Value::Resource(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Nil => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Regex(_) => "regex",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Resource(_) => "resource",
            Value::Ref(_) => "ref",
            Value::Function(_) => "function",
        }
    }

    /// Type implied by the value alone, for results typed `any`.
    pub fn natural_type(&self) -> Type {
        match self {
            Value::Nil => Type::Nil,
            Value::Bool(_) => Type::Bool,
            Value::Int(_) => Type::Int,
            Value::Float(_) => Type::Float,
            Value::String(_) => Type::String,
            Value::Regex(_) => Type::Regex,
            Value::Array(_) => Type::array(Type::Any),
            Value::Map(_) => Type::map(Type::String, Type::Any),
            Value::Resource(handle) => handle.resource_type(),
            Value::Ref(_) => Type::Ref,
            Value::Function(_) => Type::Function,
        }
    }

    /// Nil, false, zero and empty strings are falsy. Collections are truthy
    /// when every element is.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) | Value::Regex(s) => !s.is_empty(),
            Value::Array(items) => items.iter().all(Value::is_truthy),
            Value::Map(map) => map.values().all(Value::is_truthy),
            Value::Resource(_) | Value::Ref(_) | Value::Function(_) => true,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Regex(s) => write!(f, "/{}/", s),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
            Value::Resource(handle) => write!(f, "{}", handle),
            Value::Ref(r) => write!(f, "<ref {}>", r),
            Value::Function(r) => write!(f, "<function {}>", r),
        }
    }
}

/// A typed literal as it appears in a program.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Primitive {
    pub ty: Type,
    pub value: Value,
}

impl Primitive {
    pub fn new(ty: Type, value: Value) -> Self {
        Self { ty, value }
    }

    pub fn nil() -> Self {
        Self::default()
    }

    pub fn bool(b: bool) -> Self {
        Self::new(Type::Bool, Value::Bool(b))
    }

    pub fn int(i: i64) -> Self {
        Self::new(Type::Int, Value::Int(i))
    }

    pub fn float(f: f64) -> Self {
        Self::new(Type::Float, Value::Float(f))
    }

    pub fn string(s: &str) -> Self {
        Self::new(Type::String, Value::String(s.to_string()))
    }

    pub fn regex(pattern: &str) -> Self {
        Self::new(Type::Regex, Value::Regex(pattern.to_string()))
    }

    pub fn array(child: Type, items: Vec<Value>) -> Self {
        Self::new(Type::array(child), Value::Array(items))
    }

    pub fn map(value_type: Type, entries: BTreeMap<String, Value>) -> Self {
        Self::new(Type::map(Type::String, value_type), Value::Map(entries))
    }

    pub fn reference(reference: Ref) -> Self {
        Self::new(Type::Ref, Value::Ref(reference))
    }

    pub fn function(reference: Ref) -> Self {
        Self::new(Type::Function, Value::Function(reference))
    }

    pub fn as_reference(&self) -> Option<Ref> {
        match self.value {
            Value::Ref(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<Ref> {
        match self.value {
            Value::Function(r) => Some(r),
            _ => None,
        }
    }

    pub fn raw_data(&self) -> RawData {
        RawData::new(self.ty.clone(), self.value.clone())
    }
}

impl From<RawData> for Primitive {
    fn from(data: RawData) -> Self {
        Self::new(data.ty, data.value)
    }
}

/// Every result the evaluator produces: a typed value or an error.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawData {
    pub ty: Type,
    pub value: Value,
    pub error: Option<ExecError>,
}

impl RawData {
    pub fn new(ty: Type, value: Value) -> Self {
        Self {
            ty,
            value,
            error: None,
        }
    }

    pub fn error(ty: Type, error: ExecError) -> Self {
        Self {
            ty,
            value: Value::Nil,
            error: Some(error),
        }
    }

    pub fn bool(b: bool) -> Self {
        Self::new(Type::Bool, Value::Bool(b))
    }

    pub fn int(i: i64) -> Self {
        Self::new(Type::Int, Value::Int(i))
    }

    pub fn float(f: f64) -> Self {
        Self::new(Type::Float, Value::Float(f))
    }

    pub fn string(s: &str) -> Self {
        Self::new(Type::String, Value::String(s.to_string()))
    }

    pub fn nil(ty: Type) -> Self {
        Self::new(ty, Value::Nil)
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// The type operators dispatch on.
    pub fn runtime_type(&self) -> Type {
        match self.ty {
            Type::Any => self.value.natural_type(),
            _ => self.ty.clone(),
        }
    }

    pub fn is_truthy(&self) -> bool {
        self.error.is_none() && self.value.is_truthy()
    }
}

/// A reported entrypoint or datapoint, identified by its checksum.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResult {
    pub data: RawData,
    pub code_id: String,
}

impl RawResult {
    pub fn new(data: RawData, code_id: impl Into<String>) -> Self {
        Self {
            data,
            code_id: code_id.into(),
        }
    }

    pub fn error(error: ExecError, code_id: impl Into<String>) -> Self {
        Self::new(RawData::error(Type::Nil, error), code_id)
    }
}
