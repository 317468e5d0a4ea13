use alloc::{
    string::String,
    sync::{Arc, Weak},
    vec::Vec,
};
use core::mem;
use parking_lot::Mutex;
use tracing::{debug, error, info_span, warn};

use crate::{
    errors::CollectionErrorKind,
    store::Store,
    utils::merge::Merge as _,
    value::{Entry, Value},
};

/// Key/value container with injection helpers.
///
/// [`Collection`] is a handle: clones share the same container.
/// The backing [`Store`] is itself a shared handle, returned by [`Collection::get_all`] without copying.
#[derive(Clone)]
pub struct Collection {
    pub(crate) inner: Arc<CollectionInner>,
}

pub(crate) struct CollectionInner {
    store: Mutex<Store>,
}

impl Default for Collection {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Store> for Collection {
    #[inline]
    fn from(store: Store) -> Self {
        Self {
            inner: Arc::new(CollectionInner { store: Mutex::new(store) }),
        }
    }
}

impl Collection {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Store::new().into()
    }

    /// Creates collection with the values as its backing store.
    /// The map isn't copied, so the collection and the caller share it.
    ///
    /// # Errors
    /// - Returns [`CollectionErrorKind::InvalidArgument`] if the values is neither a map nor null
    pub fn with_values(values: impl Into<Value>) -> Result<Self, CollectionErrorKind> {
        match values.into() {
            Value::Null => Ok(Self::new()),
            values => map_argument("Collection::with_values", values).map(Into::into),
        }
    }

    /// Returns all keys in insertion order
    #[inline]
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.store().keys()
    }

    #[inline]
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.store().contains_key(key)
    }

    /// Removes the item, does nothing if it doesn't exist
    pub fn remove(&self, key: &str) -> &Self {
        if self.store().remove(key).is_some() {
            debug!(key, "Removed");
        }
        self
    }

    /// Sets the item, overwriting the previous one.
    ///
    /// # Notes
    /// A [`crate::Function`] is stored as materializer, so [`Self::get`] calls it,
    /// use [`crate::Entry::Literal`] or [`Self::wrap`] to store a function as a value.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Entry>) -> &Self {
        let key = key.into();
        debug!(key = key.as_str(), "Set");
        self.store().insert(key, value);
        self
    }

    /// Replaces the backing store with the values, previous items are discarded.
    /// The map isn't copied, so the collection and the caller share it.
    ///
    /// # Errors
    /// - Returns [`CollectionErrorKind::InvalidArgument`] if the values isn't a map
    pub fn set_all(&self, values: impl Into<Value>) -> Result<&Self, CollectionErrorKind> {
        let store = map_argument("Collection::set_all", values.into())?;
        let previous = mem::replace(&mut *self.inner.store.lock(), store);
        // Entries of the previous store may access the collection on drop
        drop(previous);
        debug!("Backing store replaced");
        Ok(self)
    }

    /// Sets each item of the values, overwriting existing and keeping the other ones
    ///
    /// # Errors
    /// - Returns [`CollectionErrorKind::InvalidArgument`] if the values isn't a map
    pub fn add_all(&self, values: impl Into<Value>) -> Result<&Self, CollectionErrorKind> {
        let values = map_argument("Collection::add_all", values.into())?;
        for (key, entry) in values.entries() {
            self.set(key, entry);
        }
        Ok(self)
    }

    /// Sets the item only if it doesn't exist yet
    ///
    /// # Errors
    /// - Returns [`CollectionErrorKind::AlreadyDefined`] if the item exists and `skip_if_exists` is `false`
    pub fn add_once(&self, key: impl Into<String>, value: impl Into<Entry>, skip_if_exists: bool) -> Result<&Self, CollectionErrorKind> {
        let key = key.into();
        if self.has(&key) {
            if skip_if_exists {
                debug!(key = key.as_str(), "Already defined, skipped");
                return Ok(self);
            }

            let err = CollectionErrorKind::AlreadyDefined {
                key,
                method: "Collection::add_once",
            };
            error!("{}", err);
            return Err(err);
        }
        Ok(self.set(key, value))
    }

    /// Calls [`Self::add_once`] for each item of the values.
    ///
    /// # Warning
    /// Items added before the failed one are kept, the call isn't atomic.
    ///
    /// # Errors
    /// - Returns [`CollectionErrorKind::InvalidArgument`] if the values isn't a map
    /// - Returns [`CollectionErrorKind::AlreadyDefined`] on the first existing item if `skip_if_exists` is `false`
    pub fn add_once_all(&self, values: impl Into<Value>, skip_if_exists: bool) -> Result<&Self, CollectionErrorKind> {
        let values = map_argument("Collection::add_once_all", values.into())?;
        for (key, entry) in values.entries() {
            self.add_once(key, entry, skip_if_exists)?;
        }
        Ok(self)
    }

    /// Merges each source into the backing store recursively.
    /// Nested maps are merged, other values (lists included) are overwritten.
    ///
    /// # Errors
    /// - Returns [`CollectionErrorKind::InvalidArgument`] if there are no sources or the first one isn't a map
    pub fn merge<I>(&self, sources: I) -> Result<&Self, CollectionErrorKind>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let mut sources = sources.into_iter();
        let first = map_argument("Collection::merge", sources.next().map_or(Value::Null, Into::into))?;

        let store = self.store().merge(&first);
        for (index, source) in sources.enumerate() {
            match source.into() {
                Value::Map(source) => {
                    let _ = store.clone().merge(&source);
                }
                source => warn!(position = index + 2, given = source.kind(), "Merge source isn't a map, skipped"),
            }
        }
        Ok(self)
    }

    /// Returns the backing store.
    /// It's the same store the collection uses, so changes through it are visible in the collection.
    #[inline]
    #[must_use]
    pub fn get_all(&self) -> Store {
        self.store()
    }

    /// Returns the stored entry as is, a materializer isn't called
    #[inline]
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<Entry> {
        self.store().get(key)
    }

    /// Returns the stored entry as is or the default, the default isn't called even if it's a materializer
    #[inline]
    pub fn raw_or(&self, key: &str, default: impl Into<Entry>) -> Entry {
        self.raw(key).unwrap_or_else(|| default.into())
    }

    /// # Errors
    /// - Returns [`CollectionErrorKind::NotFound`] if the item doesn't exist
    pub fn raw_strict(&self, key: &str) -> Result<Entry, CollectionErrorKind> {
        self.raw(key).ok_or_else(|| {
            let err = CollectionErrorKind::NotFound { key: key.into() };
            error!("{}", err);
            err
        })
    }

    /// Returns the materialized item: a materializer is called without arguments each time
    /// (memoized ones compute their value once), a literal is returned as is.
    pub fn get(&self, key: &str) -> Option<Value> {
        let span = info_span!("get", key);
        let _guard = span.enter();

        let Some(entry) = self.raw(key) else {
            debug!("Not found");
            return None;
        };
        Some(entry.materialize())
    }

    /// Returns the materialized item or the default.
    /// The default is materialized the same way as an item, so a materializer default is called.
    pub fn get_or(&self, key: &str, default: impl Into<Entry>) -> Value {
        match self.get(key) {
            Some(value) => value,
            None => default.into().materialize(),
        }
    }

    /// # Errors
    /// - Returns [`CollectionErrorKind::NotFound`] if the item doesn't exist
    pub fn get_strict(&self, key: &str) -> Result<Value, CollectionErrorKind> {
        let span = info_span!("get_strict", key);
        let _guard = span.enter();

        self.raw_strict(key).map(|entry| entry.materialize())
    }

    /// Returns `true` if both handles point to the same collection
    #[inline]
    #[must_use]
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.inner, &other.inner)
    }
}

impl Collection {
    /// Current backing store. The lock is released before returning,
    /// so the entries can be called without blocking the collection.
    #[inline]
    pub(crate) fn store(&self) -> Store {
        self.inner.store.lock().clone()
    }

    #[inline]
    pub(crate) fn downgrade(&self) -> WeakCollection {
        WeakCollection(Arc::downgrade(&self.inner))
    }
}

/// Non-owning handle, used by stored closures that need the collection
/// to not keep it alive through its own store.
#[derive(Clone)]
pub(crate) struct WeakCollection(Weak<CollectionInner>);

impl WeakCollection {
    #[inline]
    pub(crate) fn upgrade(&self) -> Option<Collection> {
        self.0.upgrade().map(|inner| Collection { inner })
    }
}

fn map_argument(method: &'static str, values: Value) -> Result<Store, CollectionErrorKind> {
    match values {
        Value::Map(store) => Ok(store),
        values => {
            let err = CollectionErrorKind::InvalidArgument {
                method,
                position: 1,
                expected: "a map",
                given: values.kind(),
            };
            error!("{}", err);
            Err(err)
        }
    }
}
