use core::fmt;

use serde::{Deserialize, Serialize};

/// Semantic type carried by every primitive and every computed result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Type {
    #[default]
    Nil,
    Bool,
    Int,
    Float,
    String,
    Regex,
    Array(Box<Type>),
    Map(Box<Type>, Box<Type>),
    Resource(String),
    /// Result of a block projection: entry checksum -> value.
    Block,
    Function,
    Ref,
    Any,
}

/// The fixed set of types the builtin registry is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
pub enum Underlying {
    #[strum(serialize = "bool")]
    Bool,
    #[strum(serialize = "int")]
    Int,
    #[strum(serialize = "float")]
    Float,
    #[strum(serialize = "string")]
    String,
    #[strum(serialize = "regex")]
    Regex,
    #[strum(serialize = "array")]
    ArrayLike,
    #[strum(serialize = "map")]
    MapLike,
    #[strum(serialize = "resource")]
    ResourceLike,
}

impl Type {
    pub fn array(child: Type) -> Self {
        Type::Array(Box::new(child))
    }

    pub fn map(key: Type, value: Type) -> Self {
        Type::Map(Box::new(key), Box::new(value))
    }

    pub fn resource(kind: &str) -> Self {
        Type::Resource(kind.to_string())
    }

    /// `None` for types that never carry operators (nil, refs, functions).
    pub fn underlying(&self) -> Option<Underlying> {
        match self {
            Type::Bool => Some(Underlying::Bool),
            Type::Int => Some(Underlying::Int),
            Type::Float => Some(Underlying::Float),
            Type::String => Some(Underlying::String),
            Type::Regex => Some(Underlying::Regex),
            Type::Array(_) => Some(Underlying::ArrayLike),
            Type::Map(_, _) | Type::Block => Some(Underlying::MapLike),
            Type::Resource(_) => Some(Underlying::ResourceLike),
            Type::Nil | Type::Function | Type::Ref | Type::Any => None,
        }
    }

    /// Element type of arrays, value type of maps.
    pub fn child(&self) -> Option<&Type> {
        match self {
            Type::Array(child) => Some(child),
            Type::Map(_, value) => Some(value),
            _ => None,
        }
    }

    pub fn is_resource(&self) -> bool {
        matches!(self, Type::Resource(_))
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Type::Function)
    }

    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Nil => write!(f, "null"),
            Type::Bool => write!(f, "bool"),
            Type::Int => write!(f, "int"),
            Type::Float => write!(f, "float"),
            Type::String => write!(f, "string"),
            Type::Regex => write!(f, "regex"),
            Type::Array(child) => write!(f, "[]{}", child),
            Type::Map(key, value) => write!(f, "map[{}]{}", key, value),
            Type::Resource(kind) => write!(f, "{}", kind),
            Type::Block => write!(f, "block"),
            Type::Function => write!(f, "function"),
            Type::Ref => write!(f, "ref"),
            Type::Any => write!(f, "any"),
        }
    }
}
