use alloc::{vec, vec::Vec};
use tracing::{debug, info_span};

use crate::{
    collection::Collection,
    dependency::Deps,
    store::Store,
    value::{Entry, Value},
};

impl Collection {
    /// Calls the function with raw dependencies: materializers are passed as is, not called,
    /// so the function can call them as many times as it needs.
    /// An absent key is passed as `None`.
    ///
    /// If the dependencies are [`Deps::Accessor`], the accessor is called with the backing store
    /// and the function isn't called.
    pub fn inject<F, R>(&self, deps: impl Into<Deps>, f: F) -> Value
    where
        F: FnOnce(Vec<Option<Entry>>) -> R,
        R: Into<Value>,
    {
        let deps = deps.into();
        let span = info_span!("inject", ?deps);
        let _guard = span.enter();

        self.resolve_with(deps, |key| self.raw(key), f)
    }

    /// Calls the function with materialized dependencies, see [`Collection::get`].
    /// An absent key is passed as `None`.
    ///
    /// If the dependencies are [`Deps::Accessor`], the accessor is called with the backing store
    /// and the function isn't called.
    pub fn invoke<F, R>(&self, deps: impl Into<Deps>, f: F) -> Value
    where
        F: FnOnce(Vec<Option<Value>>) -> R,
        R: Into<Value>,
    {
        let deps = deps.into();
        let span = info_span!("invoke", ?deps);
        let _guard = span.enter();

        self.resolve_with(deps, |key| self.get(key), f)
    }

    /// Calls the bindable with the backing store as its scope and the arguments.
    /// The scope is the store the collection uses, not a copy.
    pub fn apply<F, R>(&self, bindable: F, args: &[Value]) -> R
    where
        F: FnOnce(&Store, &[Value]) -> R,
    {
        bindable(&self.store(), args)
    }

    fn resolve_with<T, F, R>(&self, deps: Deps, resolve: impl Fn(&str) -> Option<T>, f: F) -> Value
    where
        F: FnOnce(Vec<Option<T>>) -> R,
        R: Into<Value>,
    {
        match deps {
            Deps::Key(key) => f(vec![resolve(key.as_str())]).into(),
            Deps::Keys(keys) => {
                let dependencies = keys.iter().map(|key| resolve(key.as_str())).collect();
                debug!("Dependencies resolved");
                f(dependencies).into()
            }
            Deps::Accessor(accessor) => accessor.call(&self.store()),
        }
    }
}
