use alloc::{string::String, sync::Arc, vec::Vec};
use core::fmt::{self, Debug, Formatter};

use crate::{store::Store, value::Value};

type DynAccessor = dyn Fn(&Store) -> Value + Send + Sync;

/// Function receiving the whole backing store instead of resolved dependencies
#[derive(Clone)]
pub struct Accessor(Arc<DynAccessor>);

impl Accessor {
    #[inline]
    #[must_use]
    pub fn new<F, R>(f: F) -> Self
    where
        F: Fn(&Store) -> R + Send + Sync + 'static,
        R: Into<Value>,
    {
        Self(Arc::new(move |store: &Store| f(store).into()))
    }

    #[inline]
    pub fn call(&self, store: &Store) -> Value {
        (self.0)(store)
    }
}

/// Dependencies accepted by [`crate::Collection::inject`] and [`crate::Collection::invoke`].
///
/// ## Variants
/// - `Key`: the function gets one argument, the resolved key
/// - `Keys`: the function gets the resolved keys positionally, in the list order
/// - `Accessor`: the accessor is called with the backing store, the function isn't called
#[derive(Clone)]
pub enum Deps {
    Key(String),
    Keys(Vec<String>),
    Accessor(Accessor),
}

impl Deps {
    #[inline]
    #[must_use]
    pub fn accessor<F, R>(f: F) -> Self
    where
        F: Fn(&Store) -> R + Send + Sync + 'static,
        R: Into<Value>,
    {
        Self::Accessor(Accessor::new(f))
    }

    /// Reads dependencies from a dynamic value: a string is a key, a list of strings is a list of keys
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(key) => Some(Self::Key(key.clone())),
            Value::List(keys) => keys
                .iter()
                .map(|key| key.as_str().map(String::from))
                .collect::<Option<Vec<_>>>()
                .map(Self::Keys),
            _ => None,
        }
    }
}

impl Debug for Deps {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.debug_tuple("Key").field(key).finish(),
            Self::Keys(keys) => f.debug_tuple("Keys").field(keys).finish(),
            Self::Accessor(_) => f.write_str("Accessor"),
        }
    }
}

impl From<&str> for Deps {
    #[inline]
    fn from(key: &str) -> Self {
        Self::Key(key.into())
    }
}

impl From<String> for Deps {
    #[inline]
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<Vec<String>> for Deps {
    #[inline]
    fn from(keys: Vec<String>) -> Self {
        Self::Keys(keys)
    }
}

impl From<Vec<&str>> for Deps {
    #[inline]
    fn from(keys: Vec<&str>) -> Self {
        Self::Keys(keys.into_iter().map(Into::into).collect())
    }
}

impl From<&[&str]> for Deps {
    #[inline]
    fn from(keys: &[&str]) -> Self {
        Self::Keys(keys.iter().copied().map(Into::into).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Deps {
    #[inline]
    fn from(keys: [&str; N]) -> Self {
        Self::Keys(keys.into_iter().map(Into::into).collect())
    }
}

impl From<Accessor> for Deps {
    #[inline]
    fn from(accessor: Accessor) -> Self {
        Self::Accessor(accessor)
    }
}
