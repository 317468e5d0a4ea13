mod presets;

use alloc::{string::String, sync::Arc, vec::Vec};
use tracing::{debug, error, info_span};

use crate::{
    collection::Collection,
    dependency::Deps,
    errors::NoderErrorKind,
    lazy::{LazyModules, Property, Source},
    loader::{Loader, ModuleRegistry},
    plugin::Plugin,
    store::Store,
    value::{Entry, Function, Value},
};

/// Facade over a [`Collection`] with plugins and lazily loaded modules.
///
/// [`Noder`] is a handle: clones share the same collection, loader and modules.
///
/// The collection has the next presets:
/// - `$api`: the noder itself as [`Value::Object`]
/// - `$di`: the collection as [`Value::Object`]
/// - `$container`: the current backing store as [`Value::Map`]
/// - `$invoke`, `$inject`, `$provider`, `$factory`, `$singleton`, `$apply`, `$wrap`:
///   the shortcuts as [`Value::Function`] with dynamic arguments
#[derive(Clone)]
pub struct Noder {
    inner: Arc<NoderInner>,
}

struct NoderInner {
    di: Collection,
    loader: Arc<dyn Loader>,
    modules: LazyModules,
}

impl Default for Noder {
    fn default() -> Self {
        Self::new()
    }
}

impl Noder {
    /// Creates noder with an empty [`ModuleRegistry`] as loader
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_loader(ModuleRegistry::new())
    }

    #[must_use]
    pub fn with_loader(loader: impl Loader + 'static) -> Self {
        Self::from_shared_loader(Arc::new(loader))
    }

    fn from_shared_loader(loader: Arc<dyn Loader>) -> Self {
        let noder = Self {
            inner: Arc::new(NoderInner {
                di: Collection::new(),
                loader,
                modules: LazyModules::new(),
            }),
        };
        presets::install(&noder);
        noder
    }

    /// Collection of the noder
    #[inline]
    #[must_use]
    pub fn di(&self) -> &Collection {
        &self.inner.di
    }

    /// Lazily loaded modules of the noder
    #[inline]
    #[must_use]
    pub fn modules(&self) -> &LazyModules {
        &self.inner.modules
    }

    /// Creates independent collection
    ///
    /// # Errors
    /// - Returns [`NoderErrorKind::Collection`] if the values is neither a map nor null
    pub fn create_collection(&self, values: impl Into<Value>) -> Result<Collection, NoderErrorKind> {
        Collection::with_values(values).map_err(Into::into)
    }

    /// Creates independent noder that shares the loader of this one
    #[must_use]
    pub fn create_noder(&self) -> Self {
        Self::from_shared_loader(self.inner.loader.clone())
    }

    /// Calls the plugin entry point with the noder and the arguments and returns its result
    ///
    /// # Errors
    /// - Returns [`NoderErrorKind::Plugin`] if the plugin fails
    pub fn use_plugin<P: Plugin + ?Sized>(&self, plugin: &P, args: &[Value]) -> Result<Value, NoderErrorKind> {
        let span = info_span!("use_plugin", args = args.len());
        let _guard = span.enter();

        match plugin.init(self, args) {
            Ok(value) => {
                debug!("Plugin initialized");
                Ok(value)
            }
            Err(err) => {
                let err = NoderErrorKind::Plugin(err);
                error!("{}", err);
                Err(err)
            }
        }
    }

    /// Resolves the plugin by the loader and calls [`Self::use_plugin`]
    ///
    /// # Errors
    /// - Returns [`NoderErrorKind::NotFound`] if the loader doesn't know the name
    /// - Returns [`NoderErrorKind::NotCallable`] if the name is a module without entry point
    /// - Returns [`NoderErrorKind::Plugin`] if the plugin fails
    pub fn use_named(&self, name: &str, args: &[Value]) -> Result<Value, NoderErrorKind> {
        let span = info_span!("use_named", name);
        let _guard = span.enter();

        if let Some(plugin) = self.inner.loader.plugin(name) {
            return self.use_plugin(&*plugin, args);
        }

        let err = if self.inner.loader.load(name).is_some() {
            NoderErrorKind::NotCallable { name: name.into() }
        } else {
            NoderErrorKind::NotFound { name: name.into() }
        };
        error!("{}", err);
        Err(err)
    }

    /// See [`Collection::inject`]
    #[inline]
    pub fn inject<F, R>(&self, deps: impl Into<Deps>, f: F) -> Value
    where
        F: FnOnce(Vec<Option<Entry>>) -> R,
        R: Into<Value>,
    {
        self.inner.di.inject(deps, f)
    }

    /// See [`Collection::invoke`]
    #[inline]
    pub fn invoke<F, R>(&self, deps: impl Into<Deps>, f: F) -> Value
    where
        F: FnOnce(Vec<Option<Value>>) -> R,
        R: Into<Value>,
    {
        self.inner.di.invoke(deps, f)
    }

    /// See [`Collection::apply`]
    #[inline]
    pub fn apply<F, R>(&self, bindable: F, args: &[Value]) -> R
    where
        F: FnOnce(&Store, &[Value]) -> R,
    {
        self.inner.di.apply(bindable, args)
    }

    /// See [`crate::wrap`]
    #[inline]
    #[must_use]
    pub fn wrap(&self, value: impl Into<Value>) -> Function {
        self.inner.di.wrap(value)
    }

    /// See [`Collection::singleton`]
    #[inline]
    pub fn singleton<F, R>(&self, key: impl Into<String>, factory: F) -> &Self
    where
        F: FnOnce(&[Value]) -> R + Send + 'static,
        R: Into<Value>,
    {
        self.inner.di.singleton(key, factory);
        self
    }

    /// See [`Collection::provider`]
    #[inline]
    pub fn provider<F, R>(&self, key: impl Into<String>, deps: impl Into<Deps>, factory: F) -> &Self
    where
        F: FnOnce(Vec<Option<Entry>>) -> R + Send + 'static,
        R: Into<Value>,
    {
        self.inner.di.provider(key, deps, factory);
        self
    }

    /// See [`Collection::factory`]
    #[inline]
    pub fn factory<F, R>(&self, key: impl Into<String>, deps: impl Into<Deps>, factory: F) -> &Self
    where
        F: FnOnce(Vec<Option<Value>>) -> R + Send + 'static,
        R: Into<Value>,
    {
        self.inner.di.factory(key, deps, factory);
        self
    }

    /// Defines a lazy property on the modules of the noder.
    /// Nothing is loaded until the first [`Self::module`] call.
    ///
    /// # Errors
    /// - Returns [`NoderErrorKind::AlreadyDefined`] if the property is already defined
    pub fn require(&self, property: impl Into<String>, source: impl Into<Source>) -> Result<&Self, NoderErrorKind> {
        self.require_into(&self.inner.modules, property, source)
    }

    /// Defines a lazy property on the target.
    /// The property is resolved with the loader and the collection of this noder.
    ///
    /// # Errors
    /// - Returns [`NoderErrorKind::AlreadyDefined`] if the property is already defined on the target
    pub fn require_into(
        &self,
        target: &LazyModules,
        property: impl Into<String>,
        source: impl Into<Source>,
    ) -> Result<&Self, NoderErrorKind> {
        let property = property.into();
        let data = Property::new(source.into(), self.inner.loader.clone(), self.inner.di.clone());

        target.define(property, data)?;
        Ok(self)
    }

    /// See [`LazyModules::get`]
    ///
    /// # Errors
    /// - Returns [`NoderErrorKind::NoProperty`] if the property isn't defined
    /// - Returns [`NoderErrorKind::NotFound`] if the loader can't resolve the module
    #[inline]
    pub fn module(&self, property: &str) -> Result<Value, NoderErrorKind> {
        self.inner.modules.get(property)
    }

    /// See [`LazyModules::set`]
    ///
    /// # Errors
    /// - Returns [`NoderErrorKind::NotWritable`] if the property is defined
    /// - Returns [`NoderErrorKind::NoProperty`] otherwise
    #[inline]
    pub fn set_module(&self, property: &str, value: impl Into<Value>) -> Result<(), NoderErrorKind> {
        self.inner.modules.set(property, value)
    }

    #[inline]
    #[must_use]
    pub fn is_loaded(&self, property: &str) -> bool {
        self.inner.modules.is_loaded(property)
    }

    /// Returns `true` if both handles point to the same noder
    #[inline]
    #[must_use]
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.inner, &other.inner)
    }
}
