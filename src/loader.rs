use alloc::{boxed::Box, collections::BTreeMap, string::String, sync::Arc};
use tracing::{debug, info_span};

use crate::{memo::Memo, plugin::Plugin, value::Value};

/// Resolves names to loaded units for [`crate::Noder`]
pub trait Loader: Send + Sync {
    /// Resolves a name to a module
    fn load(&self, name: &str) -> Option<Value>;

    /// Resolves a name to a plugin entry point.
    /// Returns `None` by default, so the loader provides modules only.
    fn plugin(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        let _ = name;
        None
    }
}

type ModuleFactory = Box<dyn FnOnce() -> Value + Send>;

#[derive(Clone)]
enum Module {
    Instance(Value),
    Factory(Arc<Memo<ModuleFactory>>),
}

/// In-memory [`Loader`].
/// Module factories are called on the first load and their result is reused by next loads.
#[derive(Default, Clone)]
pub struct ModuleRegistry {
    modules: BTreeMap<String, Module>,
    plugins: BTreeMap<String, Arc<dyn Plugin>>,
}

impl ModuleRegistry {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a lazily created module
    #[inline]
    #[must_use]
    pub fn module<F, R>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: FnOnce() -> R + Send + 'static,
        R: Into<Value>,
    {
        let factory: ModuleFactory = Box::new(move || -> Value { factory().into() });
        self.modules.insert(name.into(), Module::Factory(Arc::new(Memo::new(factory))));
        self
    }

    /// Adds a module created outside the registry
    #[inline]
    #[must_use]
    pub fn instance(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.modules.insert(name.into(), Module::Instance(value.into()));
        self
    }

    #[inline]
    #[must_use]
    pub fn plugin(mut self, name: impl Into<String>, plugin: impl Plugin + 'static) -> Self {
        self.plugins.insert(name.into(), Arc::new(plugin));
        self
    }
}

impl Loader for ModuleRegistry {
    fn load(&self, name: &str) -> Option<Value> {
        match self.modules.get(name)? {
            Module::Instance(value) => Some(value.clone()),
            Module::Factory(memo) => {
                let span = info_span!("load", module = name);
                let _guard = span.enter();

                Some(memo.get_or_run(|factory| {
                    debug!("Module factory called");
                    factory()
                }))
            }
        }
    }

    fn plugin(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        self.plugins.get(name).cloned()
    }
}
