//! Builtin operator registry.
//!
//! Handlers are keyed first by the bound value's [`Underlying`] type, then by
//! a [`HandlerKey`] of operator and operand type. The registry is built once
//! with [`BuiltinRegistry::new`] and shared read-only through the runtime.

mod array;
mod compare;
mod map;
mod resource;
mod scalar;

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use regex::Regex;

use crate::error::{ExecError, ExecResult, LookupError};
use crate::eval::Executor;
use crate::program::{Call, RawData, Ref, Value};
use crate::types::{Type, Underlying};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::EnumString,
    strum::IntoStaticStr,
    strum::EnumIter,
)]
pub enum Operator {
    #[strum(serialize = "==")]
    Equal,
    #[strum(serialize = "!=")]
    NotEqual,
    #[strum(serialize = "<")]
    Less,
    #[strum(serialize = "<=")]
    LessEqual,
    #[strum(serialize = ">")]
    Greater,
    #[strum(serialize = ">=")]
    GreaterEqual,
    #[strum(serialize = "[]")]
    Index,
    #[strum(serialize = "{}")]
    Block,
    #[strum(serialize = "length")]
    Length,
    #[strum(serialize = "where")]
    Where,
}

// strum's Display derive reads "{}" as a format string
impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str((*self).into())
    }
}

impl Operator {
    /// Comparisons are the only operators keyed by their operand's type.
    pub fn takes_operand(&self) -> bool {
        self.is_comparison()
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Operator::Equal
                | Operator::NotEqual
                | Operator::Less
                | Operator::LessEqual
                | Operator::Greater
                | Operator::GreaterEqual
        )
    }
}

/// Second-level registry key.
///
/// `element` is set only for comparisons on arrays and holds the array's
/// element type. `operand` is set only for comparisons.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandlerKey {
    pub element: Option<Type>,
    pub op: Operator,
    pub operand: Option<Type>,
}

impl HandlerKey {
    pub fn generic(op: Operator) -> Self {
        Self {
            element: None,
            op,
            operand: None,
        }
    }

    pub fn compare(element: Option<Type>, op: Operator, operand: Type) -> Self {
        Self {
            element,
            op,
            operand: Some(operand),
        }
    }
}

impl fmt::Display for HandlerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(element) = &self.element {
            write!(f, "{} ", element)?;
        }
        write!(f, "{}", self.op)?;
        if let Some(operand) = &self.operand {
            write!(f, " {}", operand)?;
        }
        Ok(())
    }
}

/// What a handler decided for its ref.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Resolved now; the executor caches it and triggers dependents.
    Value(RawData),
    /// Resolve this other ref first, then retry.
    Suspend(Ref),
    /// Resolution arrives later through a callback.
    Pending,
}

/// Handler arguments: executor, bound value, call, resolved call arguments
/// and the ref being resolved.
pub type HandlerFn = Box<
    dyn Fn(&Executor, &RawData, &Call, &[RawData], Ref) -> ExecResult<Resolution> + Send + Sync,
>;

pub struct ChunkHandler {
    pub label: &'static str,
    f: HandlerFn,
}

impl ChunkHandler {
    pub fn call(
        &self,
        executor: &Executor,
        bind: &RawData,
        call: &Call,
        args: &[RawData],
        reference: Ref,
    ) -> ExecResult<Resolution> {
        (self.f)(executor, bind, call, args, reference)
    }
}

impl fmt::Debug for ChunkHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkHandler")
            .field("label", &self.label)
            .finish()
    }
}

pub(crate) type CompareFn = fn(&Value, &Value) -> ExecResult<bool>;
pub(crate) type OrderFn = fn(&Value, &Value) -> ExecResult<Option<Ordering>>;
/// Matches a non-pattern value against a compiled regex.
pub(crate) type MatchFn = fn(&Value, &Regex) -> ExecResult<bool>;

/// How the bound value and the operand line up for an equality check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Shape {
    Scalar,
    /// Bound array, scalar operand: the operand is a member.
    Contains,
    /// Scalar bound, array operand: the bound value is a member.
    ContainedIn,
    /// Both arrays: same length and pairwise equal.
    Elementwise,
}

fn expect_items(value: &Value) -> ExecResult<&[Value]> {
    value
        .as_array()
        .ok_or_else(|| ExecError::binding("array", value.kind()))
}

// nil only equals nil
fn nil_safe<F>(eq: &F, left: &Value, right: &Value) -> ExecResult<bool>
where
    F: Fn(&Value, &Value) -> ExecResult<bool>,
{
    match (left, right) {
        (Value::Nil, _) | (_, Value::Nil) => Ok(left == right),
        _ => eq(left, right),
    }
}

impl Shape {
    fn test<F>(self, eq: F, left: &Value, right: &Value) -> ExecResult<bool>
    where
        F: Fn(&Value, &Value) -> ExecResult<bool>,
    {
        if matches!(left, Value::Nil) || matches!(right, Value::Nil) {
            return Ok(left == right);
        }
        match self {
            Shape::Scalar => eq(left, right),
            Shape::Contains => {
                for item in expect_items(left)? {
                    if nil_safe(&eq, item, right)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Shape::ContainedIn => {
                for item in expect_items(right)? {
                    if nil_safe(&eq, left, item)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Shape::Elementwise => {
                let (left, right) = (expect_items(left)?, expect_items(right)?);
                if left.len() != right.len() {
                    return Ok(false);
                }
                for (l, r) in left.iter().zip(right) {
                    if !nil_safe(&eq, l, r)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }
}

pub(crate) fn operand<'a>(args: &'a [RawData], label: &str) -> ExecResult<&'a RawData> {
    args.first()
        .ok_or_else(|| ExecError::operator(label, "missing operand"))
}

/// First function-typed argument of a call: the block to run.
pub(crate) fn block_function(args: &[RawData], label: &str) -> ExecResult<Ref> {
    args.iter()
        .find_map(|arg| match arg.value {
            Value::Function(r) => Some(r),
            _ => None,
        })
        .ok_or_else(|| ExecError::operator(label, "called without a block"))
}

pub struct BuiltinRegistry {
    tables: HashMap<Underlying, HashMap<HandlerKey, ChunkHandler>>,
}

impl Default for BuiltinRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BuiltinRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            tables: HashMap::new(),
        };
        scalar::register(&mut registry);
        array::register(&mut registry);
        map::register(&mut registry);
        resource::register(&mut registry);
        registry
    }

    pub(crate) fn insert<F>(&mut self, ty: Underlying, key: HandlerKey, f: F)
    where
        F: Fn(&Executor, &RawData, &Call, &[RawData], Ref) -> ExecResult<Resolution>
            + Send
            + Sync
            + 'static,
    {
        let label: &'static str = key.op.into();
        self.tables.entry(ty).or_default().insert(
            key,
            ChunkHandler {
                label,
                f: Box::new(f),
            },
        );
    }

    pub(crate) fn generic<F>(&mut self, ty: Underlying, op: Operator, f: F)
    where
        F: Fn(&Executor, &RawData, &Call, &[RawData], Ref) -> ExecResult<Resolution>
            + Send
            + Sync
            + 'static,
    {
        self.insert(ty, HandlerKey::generic(op), f);
    }

    /// Registers `==` and its negation `!=`.
    pub(crate) fn equality(
        &mut self,
        ty: Underlying,
        element: Option<Type>,
        operand_ty: Type,
        shape: Shape,
        eq: CompareFn,
    ) {
        for (op, negate) in [(Operator::Equal, false), (Operator::NotEqual, true)] {
            let label: &'static str = op.into();
            self.insert(
                ty,
                HandlerKey::compare(element.clone(), op, operand_ty.clone()),
                move |_: &Executor, bind: &RawData, _: &Call, args: &[RawData], _: Ref| {
                    let other = operand(args, label)?;
                    let equal = shape.test(eq, &bind.value, &other.value)?;
                    Ok(Resolution::Value(RawData::bool(equal != negate)))
                },
            );
        }
    }

    /// Registers `==` and `!=` against a regex on the scalar side. The
    /// pattern is compiled once per call, not once per array element.
    pub(crate) fn matching(
        &mut self,
        ty: Underlying,
        element: Option<Type>,
        operand_ty: Type,
        shape: Shape,
        is_match: MatchFn,
    ) {
        for (op, negate) in [(Operator::Equal, false), (Operator::NotEqual, true)] {
            let label: &'static str = op.into();
            self.insert(
                ty,
                HandlerKey::compare(element.clone(), op, operand_ty.clone()),
                move |_: &Executor, bind: &RawData, _: &Call, args: &[RawData], _: Ref| {
                    let other = operand(args, label)?;
                    let (left, right) = (&bind.value, &other.value);
                    if matches!(left, Value::Nil) || matches!(right, Value::Nil) {
                        return Ok(Resolution::Value(RawData::bool((left == right) != negate)));
                    }

                    let pattern_right = match shape {
                        Shape::Contains => true,
                        Shape::ContainedIn => false,
                        Shape::Scalar | Shape::Elementwise => matches!(right, Value::Regex(_)),
                    };
                    let re = compare::compile(if pattern_right { right } else { left })?;
                    let equal = shape.test(
                        |l: &Value, r: &Value| is_match(if pattern_right { l } else { r }, &re),
                        left,
                        right,
                    )?;
                    Ok(Resolution::Value(RawData::bool(equal != negate)))
                },
            );
        }
    }

    /// Registers `<`, `<=`, `>` and `>=`. Unordered values (NaN) compare
    /// false, and so does nil.
    pub(crate) fn ordering(&mut self, ty: Underlying, operand_ty: Type, cmp: OrderFn) {
        let ops: [(Operator, fn(Ordering) -> bool); 4] = [
            (Operator::Less, Ordering::is_lt),
            (Operator::LessEqual, Ordering::is_le),
            (Operator::Greater, Ordering::is_gt),
            (Operator::GreaterEqual, Ordering::is_ge),
        ];
        for (op, accept) in ops {
            let label: &'static str = op.into();
            self.insert(
                ty,
                HandlerKey::compare(None, op, operand_ty.clone()),
                move |_: &Executor, bind: &RawData, _: &Call, args: &[RawData], _: Ref| {
                    let other = operand(args, label)?;
                    if matches!(bind.value, Value::Nil) || matches!(other.value, Value::Nil) {
                        return Ok(Resolution::Value(RawData::bool(false)));
                    }
                    let ordered = cmp(&bind.value, &other.value)?.is_some_and(accept);
                    Ok(Resolution::Value(RawData::bool(ordered)))
                },
            );
        }
    }

    /// Finds the handler for `name` on a value of type `ty`. Comparisons also
    /// need the operand's type.
    pub fn lookup(
        &self,
        ty: &Type,
        name: &str,
        operand: Option<&Type>,
    ) -> Result<&ChunkHandler, LookupError> {
        let no_operators = || LookupError::NoOperators {
            ty: ty.label(),
            name: name.to_string(),
        };
        let not_found = || LookupError::NotFound {
            ty: ty.label(),
            name: name.to_string(),
        };

        let underlying = ty.underlying().ok_or_else(no_operators)?;
        let table = self.tables.get(&underlying).ok_or_else(no_operators)?;
        let op: Operator = name.parse().map_err(|_| not_found())?;

        let key = if op.takes_operand() {
            let element = match underlying {
                Underlying::ArrayLike => ty.child().cloned(),
                _ => None,
            };
            HandlerKey::compare(element, op, operand.ok_or_else(not_found)?.clone())
        } else {
            HandlerKey::generic(op)
        };
        table.get(&key).ok_or_else(not_found)
    }

    /// Every registered combination, with a representative bound type.
    pub fn entries(&self) -> impl Iterator<Item = (Type, &HandlerKey, &ChunkHandler)> {
        self.tables.iter().flat_map(|(underlying, table)| {
            table
                .iter()
                .map(move |(key, handler)| (sample_type(*underlying, key), key, handler))
        })
    }

    pub fn len(&self) -> usize {
        self.tables.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn sample_type(underlying: Underlying, key: &HandlerKey) -> Type {
    match underlying {
        Underlying::Bool => Type::Bool,
        Underlying::Int => Type::Int,
        Underlying::Float => Type::Float,
        Underlying::String => Type::String,
        Underlying::Regex => Type::Regex,
        Underlying::ArrayLike => Type::array(key.element.clone().unwrap_or(Type::Any)),
        Underlying::MapLike => Type::map(Type::String, Type::Any),
        Underlying::ResourceLike => Type::resource("resource"),
    }
}
