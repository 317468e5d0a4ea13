use alloc::{collections::BTreeMap, string::String, sync::Arc};
use parking_lot::Mutex;
use tracing::{debug, error, info_span};

use crate::{
    collection::Collection,
    dependency::Accessor,
    errors::NoderErrorKind,
    loader::Loader,
    store::Store,
    value::Value,
};

/// Where a lazy property takes its value from
#[derive(Clone)]
pub enum Source {
    /// Module with the same name as the property
    Default,
    /// Module with the given name
    Module(String),
    /// Function called with the backing store of the collection
    Loader(Accessor),
}

impl Source {
    #[inline]
    #[must_use]
    pub fn loader<F, R>(f: F) -> Self
    where
        F: Fn(&Store) -> R + Send + Sync + 'static,
        R: Into<Value>,
    {
        Self::Loader(Accessor::new(f))
    }
}

impl From<&str> for Source {
    #[inline]
    fn from(name: &str) -> Self {
        Self::Module(name.into())
    }
}

impl From<String> for Source {
    #[inline]
    fn from(name: String) -> Self {
        Self::Module(name)
    }
}

impl From<Accessor> for Source {
    #[inline]
    fn from(accessor: Accessor) -> Self {
        Self::Loader(accessor)
    }
}

pub(crate) struct Property {
    source: Source,
    loader: Arc<dyn Loader>,
    collection: Collection,
    value: Mutex<Option<Value>>,
}

impl Property {
    #[inline]
    #[must_use]
    pub(crate) fn new(source: Source, loader: Arc<dyn Loader>, collection: Collection) -> Self {
        Self {
            source,
            loader,
            collection,
            value: Mutex::new(None),
        }
    }

    fn resolve(&self, property: &str) -> Result<Value, NoderErrorKind> {
        if let Some(value) = self.value.lock().as_ref() {
            debug!("Found in cache");
            return Ok(value.clone());
        }

        let value = match &self.source {
            Source::Default => self.load(property)?,
            Source::Module(name) => self.load(name)?,
            Source::Loader(accessor) => accessor.call(&self.collection.get_all()),
        };

        *self.value.lock() = Some(value.clone());
        debug!("Loaded");
        Ok(value)
    }

    fn load(&self, name: &str) -> Result<Value, NoderErrorKind> {
        self.loader.load(name).ok_or_else(|| {
            let err = NoderErrorKind::NotFound { name: name.into() };
            error!("{}", err);
            err
        })
    }
}

/// Read-only properties whose values are loaded on the first access and then cached.
///
/// Properties are defined by [`crate::Noder::require`] and [`crate::Noder::require_into`],
/// each one is bound to the noder that defined it.
#[derive(Default)]
pub struct LazyModules {
    properties: Mutex<BTreeMap<String, Arc<Property>>>,
}

impl LazyModules {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn define(&self, property: String, data: Property) -> Result<(), NoderErrorKind> {
        let mut guard = self.properties.lock();
        if guard.contains_key(&property) {
            let err = NoderErrorKind::AlreadyDefined { property };
            error!("{}", err);
            return Err(err);
        }

        debug!(property = property.as_str(), "Defined");
        guard.insert(property, Arc::new(data));
        Ok(())
    }

    /// Returns the value of the property, loading it on the first access.
    /// A failed load isn't cached, so the next access tries again.
    ///
    /// # Errors
    /// - Returns [`NoderErrorKind::NoProperty`] if the property isn't defined
    /// - Returns [`NoderErrorKind::NotFound`] if the loader can't resolve the module
    pub fn get(&self, property: &str) -> Result<Value, NoderErrorKind> {
        let span = info_span!("lazy_get", property);
        let _guard = span.enter();

        // Property is cloned out, so the loader runs without the lock
        let data = self.properties.lock().get(property).cloned();
        match data {
            Some(data) => data.resolve(property),
            None => {
                let err = NoderErrorKind::NoProperty { property: property.into() };
                error!("{}", err);
                Err(err)
            }
        }
    }

    /// Properties are read-only, so it always fails
    ///
    /// # Errors
    /// - Returns [`NoderErrorKind::NotWritable`] if the property is defined
    /// - Returns [`NoderErrorKind::NoProperty`] otherwise
    pub fn set(&self, property: &str, _value: impl Into<Value>) -> Result<(), NoderErrorKind> {
        let err = if self.contains(property) {
            NoderErrorKind::NotWritable { property: property.into() }
        } else {
            NoderErrorKind::NoProperty { property: property.into() }
        };
        error!("{}", err);
        Err(err)
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, property: &str) -> bool {
        self.properties.lock().contains_key(property)
    }

    /// Returns `true` if the property was accessed and loaded
    #[must_use]
    pub fn is_loaded(&self, property: &str) -> bool {
        self.properties
            .lock()
            .get(property)
            .is_some_and(|data| data.value.lock().is_some())
    }
}
