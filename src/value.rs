use alloc::{string::String, sync::Arc, vec::Vec};
use core::{
    any::Any,
    fmt::{self, Debug, Formatter},
};

use crate::store::Store;

type DynFunction = dyn Fn(&[Value]) -> Value + Send + Sync;

/// Shared callable.
///
/// Cloning a [`Function`] doesn't clone the closure, both handles point to the same allocation,
/// so identity is preserved across the container (see [`Function::ptr_eq`]).
#[derive(Clone)]
pub struct Function(Arc<DynFunction>);

impl Function {
    #[inline]
    #[must_use]
    pub fn new<F, R>(f: F) -> Self
    where
        F: Fn(&[Value]) -> R + Send + Sync + 'static,
        R: Into<Value>,
    {
        Self(Arc::new(move |args: &[Value]| f(args).into()))
    }

    #[inline]
    pub fn call(&self, args: &[Value]) -> Value {
        (self.0)(args)
    }

    /// Calls the function without arguments
    #[inline]
    pub fn materialize(&self) -> Value {
        self.call(&[])
    }

    #[inline]
    #[must_use]
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::as_ptr(&this.0).cast::<()>() == Arc::as_ptr(&other.0).cast::<()>()
    }
}

impl Debug for Function {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Function({:p})", Arc::as_ptr(&self.0).cast::<()>())
    }
}

impl PartialEq for Function {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other)
    }
}

/// Dynamic value held by a collection.
///
/// Scalars compare by value, while [`Value::Map`], [`Value::Function`] and [`Value::Object`]
/// compare by identity, since they are shared handles.
#[derive(Clone, Default)]
pub enum Value {
    /// Absence of a value, returned for example by a factory that produces nothing
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(Store),
    Function(Function),
    Object(Arc<dyn Any + Send + Sync>),
}

impl Value {
    #[inline]
    #[must_use]
    pub fn object<T: Any + Send + Sync>(value: T) -> Self {
        Self::Object(Arc::new(value))
    }

    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[inline]
    #[must_use]
    pub const fn is_map(&self) -> bool {
        matches!(self, Self::Map(_))
    }

    #[inline]
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(val) => Some(*val),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(val) => Some(*val),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(val) => Some(*val),
            Self::Int(val) => Some(*val as f64),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(val) => Some(val),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(val) => Some(val),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn as_map(&self) -> Option<&Store> {
        match self {
            Self::Map(val) => Some(val),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn as_function(&self) -> Option<&Function> {
        match self {
            Self::Function(val) => Some(val),
            _ => None,
        }
    }

    /// Returns the shared object if it's a [`Value::Object`] of type `T`
    #[must_use]
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        match self {
            Self::Object(val) => val.clone().downcast().ok(),
            _ => None,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Function(_) => "function",
            Self::Object(_) => "object",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => Store::ptr_eq(a, b),
            (Self::Function(a), Self::Function(b)) => Function::ptr_eq(a, b),
            (Self::Object(a), Self::Object(b)) => Arc::as_ptr(a).cast::<()>() == Arc::as_ptr(b).cast::<()>(),
            _ => false,
        }
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(val) => f.debug_tuple("Bool").field(val).finish(),
            Self::Int(val) => f.debug_tuple("Int").field(val).finish(),
            Self::Float(val) => f.debug_tuple("Float").field(val).finish(),
            Self::String(val) => f.debug_tuple("String").field(val).finish(),
            Self::List(val) => f.debug_tuple("List").field(val).finish(),
            Self::Map(val) => f.debug_tuple("Map").field(val).finish(),
            Self::Function(val) => val.fmt(f),
            Self::Object(val) => write!(f, "Object({:p})", Arc::as_ptr(val).cast::<()>()),
        }
    }
}

macro_rules! impl_value_from {
    ($($ty:ty => |$val:ident| $expr:expr),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                #[inline]
                fn from($val: $ty) -> Self {
                    $expr
                }
            }
        )*
    };
}

impl_value_from! {
    () => |_val| Value::Null,
    bool => |val| Value::Bool(val),
    i32 => |val| Value::Int(val.into()),
    i64 => |val| Value::Int(val),
    u32 => |val| Value::Int(val.into()),
    f64 => |val| Value::Float(val),
    &str => |val| Value::String(val.into()),
    String => |val| Value::String(val),
    Vec<Value> => |val| Value::List(val),
    Store => |val| Value::Map(val),
    Function => |val| Value::Function(val),
}

impl<T: Into<Value>> From<Option<T>> for Value {
    #[inline]
    fn from(val: Option<T>) -> Self {
        val.map_or(Value::Null, Into::into)
    }
}

/// Value stored under a key.
///
/// The variant decides how [`crate::Collection::get`] reads the slot:
/// a [`Entry::Literal`] is returned verbatim, a [`Entry::Materializer`] is called without arguments.
/// A function stored as [`Entry::Literal`] is data and is never called by the container.
#[derive(Clone, Debug, PartialEq)]
pub enum Entry {
    Literal(Value),
    Materializer(Function),
}

impl Entry {
    #[inline]
    pub fn materialize(&self) -> Value {
        match self {
            Self::Literal(value) => value.clone(),
            Self::Materializer(function) => function.materialize(),
        }
    }

    /// Converts the entry to a value without calling it,
    /// a materializer becomes a [`Value::Function`]
    #[inline]
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Literal(value) => value,
            Self::Materializer(function) => Value::Function(function),
        }
    }

    #[inline]
    #[must_use]
    pub const fn as_literal(&self) -> Option<&Value> {
        match self {
            Self::Literal(value) => Some(value),
            Self::Materializer(_) => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn as_materializer(&self) -> Option<&Function> {
        match self {
            Self::Literal(_) => None,
            Self::Materializer(function) => Some(function),
        }
    }
}

impl From<Function> for Entry {
    #[inline]
    fn from(function: Function) -> Self {
        Self::Materializer(function)
    }
}

impl From<Value> for Entry {
    #[inline]
    fn from(value: Value) -> Self {
        Self::Literal(value)
    }
}

macro_rules! impl_literal_entry_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Entry {
                #[inline]
                fn from(val: $ty) -> Self {
                    Self::Literal(val.into())
                }
            }
        )*
    };
}

impl_literal_entry_from!((), bool, i32, i64, u32, f64, &str, String, Vec<Value>, Store);
