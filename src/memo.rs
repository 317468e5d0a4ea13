use alloc::{string::String, vec::Vec};
use core::mem;
use parking_lot::Mutex;
use tracing::{debug, info_span, warn};

use crate::{
    collection::{Collection, WeakCollection},
    dependency::Deps,
    store::WeakStore,
    value::{Entry, Function, Value},
};

enum State<F> {
    Pending(F),
    Running,
    Done(Value),
}

/// Runs the factory at most once and caches its result, [`Value::Null`] included.
///
/// The lock isn't held while the factory runs, so the factory may access the collection.
/// A call made while the factory is running returns [`Value::Null`] instead of entering it twice.
pub(crate) struct Memo<F> {
    state: Mutex<State<F>>,
}

impl<F> Memo<F> {
    #[inline]
    #[must_use]
    pub(crate) fn new(factory: F) -> Self {
        Self {
            state: Mutex::new(State::Pending(factory)),
        }
    }

    pub(crate) fn get_or_run(&self, run: impl FnOnce(F) -> Value) -> Value {
        self.try_get_or_run(|factory| Ok(run(factory)))
    }

    /// Same as [`Self::get_or_run`], but the run may give the factory back.
    /// In that case nothing is cached, the next call runs it again and this one returns [`Value::Null`].
    pub(crate) fn try_get_or_run(&self, run: impl FnOnce(F) -> Result<Value, F>) -> Value {
        let factory = {
            let mut guard = self.state.lock();
            match mem::replace(&mut *guard, State::Running) {
                State::Pending(factory) => factory,
                State::Running => {
                    debug!("Requested while running");
                    return Value::Null;
                }
                State::Done(value) => {
                    *guard = State::Done(value.clone());
                    debug!("Found in cache");
                    return value;
                }
            }
        };

        match run(factory) {
            Ok(value) => {
                *self.state.lock() = State::Done(value.clone());
                debug!("Cached");
                value
            }
            Err(factory) => {
                *self.state.lock() = State::Pending(factory);
                debug!("Not run, kept pending");
                Value::Null
            }
        }
    }

    #[cfg(test)]
    #[must_use]
    pub(crate) fn has_run(&self) -> bool {
        !matches!(*self.state.lock(), State::Pending(_))
    }
}

/// Collection to resolve dependencies of a memoized entry against.
/// If the collection that stored the entry is dropped, the store it was stored in is used,
/// since other collections may still share it.
fn resolver(collection: &WeakCollection, store: &WeakStore) -> Option<Collection> {
    collection.upgrade().or_else(|| store.upgrade().map(Collection::from))
}

/// Creates a function that always returns the value.
/// Storing it lets [`Collection::get`] return a value that is a function itself.
#[must_use]
pub fn wrap(value: impl Into<Value>) -> Function {
    let value = value.into();
    Function::new(move |_: &[Value]| value.clone())
}

impl Collection {
    /// See [`wrap`]
    #[inline]
    #[must_use]
    pub fn wrap(&self, value: impl Into<Value>) -> Function {
        wrap(value)
    }

    /// Stores a function that calls the factory on its first call and returns the cached result afterwards.
    /// Arguments of the first call are passed to the factory, arguments of next calls are ignored.
    pub fn singleton<F, R>(&self, key: impl Into<String>, factory: F) -> &Self
    where
        F: FnOnce(&[Value]) -> R + Send + 'static,
        R: Into<Value>,
    {
        let key = key.into();
        let memo = Memo::new(factory);
        let name = key.clone();

        self.set(
            key,
            Function::new(move |args: &[Value]| {
                memo.get_or_run(|factory| {
                    let span = info_span!("singleton", key = name.as_str(), args = args.len());
                    let _guard = span.enter();

                    factory(args).into()
                })
            }),
        )
    }

    /// Stores a function that computes [`Collection::inject`] with the dependencies and the factory
    /// on its first call and returns the cached result afterwards.
    ///
    /// Dependencies are resolved on the first call, not at registration.
    pub fn provider<F, R>(&self, key: impl Into<String>, deps: impl Into<Deps>, factory: F) -> &Self
    where
        F: FnOnce(Vec<Option<Entry>>) -> R + Send + 'static,
        R: Into<Value>,
    {
        let key = key.into();
        let name = key.clone();
        let collection = self.downgrade();
        let store = self.store().downgrade();
        let memo = Memo::new((deps.into(), factory));

        self.set(
            key,
            Function::new(move |_: &[Value]| {
                memo.try_get_or_run(|(deps, factory)| {
                    let span = info_span!("provider", key = name.as_str());
                    let _guard = span.enter();

                    match resolver(&collection, &store) {
                        Some(collection) => Ok(collection.inject(deps, factory)),
                        None => {
                            warn!("Collection and its store are dropped, nothing to inject");
                            Err((deps, factory))
                        }
                    }
                })
            }),
        )
    }

    /// Stores a function that computes [`Collection::invoke`] with the dependencies and the factory
    /// on its first call and returns the cached result afterwards.
    ///
    /// Dependencies are resolved on the first call, not at registration.
    pub fn factory<F, R>(&self, key: impl Into<String>, deps: impl Into<Deps>, factory: F) -> &Self
    where
        F: FnOnce(Vec<Option<Value>>) -> R + Send + 'static,
        R: Into<Value>,
    {
        let key = key.into();
        let name = key.clone();
        let collection = self.downgrade();
        let store = self.store().downgrade();
        let memo = Memo::new((deps.into(), factory));

        self.set(
            key,
            Function::new(move |_: &[Value]| {
                memo.try_get_or_run(|(deps, factory)| {
                    let span = info_span!("factory", key = name.as_str());
                    let _guard = span.enter();

                    match resolver(&collection, &store) {
                        Some(collection) => Ok(collection.invoke(deps, factory)),
                        None => {
                            warn!("Collection and its store are dropped, nothing to invoke");
                            Err((deps, factory))
                        }
                    }
                })
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::{sync::Arc, vec, vec::Vec};
    use core::sync::atomic::{AtomicI64, AtomicU8, Ordering};
    use tracing_test::traced_test;

    use super::{wrap, Memo};
    use crate::{
        collection::Collection,
        dependency::Deps,
        store,
        store::Store,
        value::{Entry, Function, Value},
    };

    #[test]
    fn test_memo_state() {
        let memo = Memo::new(|| Value::Int(1));

        assert!(!memo.has_run());
        assert_eq!(memo.get_or_run(|factory| factory()), Value::Int(1));
        assert!(memo.has_run());
        assert_eq!(memo.get_or_run(|_| Value::Int(2)), Value::Int(1));
    }

    #[test]
    fn test_wrap() {
        let collection = Collection::new();

        assert_eq!(collection.wrap("item").materialize(), Value::from("item"));
        assert_eq!(wrap(true).call(&[Value::Int(1)]), Value::Bool(true));
    }

    #[test]
    #[traced_test]
    fn test_singleton() {
        let count = Arc::new(AtomicI64::new(0));
        let collection = Collection::new();

        collection.singleton("count", {
            let count = count.clone();
            move |args: &[Value]| {
                let value = args.first().and_then(Value::as_i64).unwrap_or_default();
                count.fetch_add(value, Ordering::SeqCst) + value
            }
        });

        let Some(Entry::Materializer(function)) = collection.raw("count") else {
            panic!("Expected materializer");
        };
        assert_eq!(function.call(&[Value::Int(1)]), Value::Int(1));
        assert_eq!(function.call(&[Value::Int(5)]), Value::Int(1));
        assert_eq!(collection.get("count"), Some(Value::Int(1)));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[traced_test]
    fn test_singleton_caches_null() {
        let call_count = Arc::new(AtomicU8::new(0));
        let collection = Collection::new();

        collection.singleton("count", {
            let call_count = call_count.clone();
            move |_: &[Value]| {
                call_count.fetch_add(1, Ordering::SeqCst);
            }
        });

        assert_eq!(collection.get("count"), Some(Value::Null));
        assert_eq!(collection.get("count"), Some(Value::Null));
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[traced_test]
    fn test_singleton_reentrant() {
        let collection = Collection::new();

        collection.singleton("self", {
            let collection = collection.downgrade();
            move |_: &[Value]| {
                let collection = collection.upgrade().unwrap();
                // The factory is running, so there is no value yet
                assert_eq!(collection.get("self"), Some(Value::Null));
                "done"
            }
        });

        assert_eq!(collection.get("self"), Some(Value::from("done")));
    }

    #[test]
    #[traced_test]
    fn test_provider() {
        let count = Arc::new(AtomicU8::new(0));
        let dep2 = wrap("dep 2");
        let collection = Collection::with_values(store! { "dep1" => "dep 1", "dep2" => dep2.clone() }).unwrap();

        collection.provider("provider", ["dep1", "dep2"], {
            let count = count.clone();
            move |deps: Vec<Option<Entry>>| {
                let count = count.fetch_add(1, Ordering::SeqCst) + 1;
                let [Some(Entry::Literal(dep1)), Some(Entry::Materializer(dep2_raw))] = deps.as_slice() else {
                    panic!("Unexpected dependencies: {deps:?}");
                };
                assert_eq!(dep1, &Value::from("dep 1"));
                assert!(Function::ptr_eq(dep2_raw, &dep2));

                store! { "value" => alloc::format!("ok{count}") }
            }
        });

        let first = collection.get("provider").unwrap();
        let second = collection.get("provider").unwrap();

        assert_eq!(first, second);
        assert_eq!(
            first.as_map().unwrap().get("value"),
            Some(Entry::Literal(Value::from("ok1")))
        );
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[traced_test]
    fn test_factory() {
        let count = Arc::new(AtomicU8::new(0));
        let collection = Collection::new();
        collection.set("dep1", "dep 1").set("dep2", wrap("dep 2"));

        collection.factory("factory", vec!["dep1", "dep2"], {
            let count = count.clone();
            move |deps: Vec<Option<Value>>| {
                count.fetch_add(1, Ordering::SeqCst);
                assert_eq!(deps, vec![Some(Value::from("dep 1")), Some(Value::from("dep 2"))]);
            }
        });

        assert_eq!(collection.get("factory"), Some(Value::Null));
        assert_eq!(collection.get("factory"), Some(Value::Null));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[traced_test]
    fn test_lazy_dependencies() {
        let collection = Collection::new();

        collection.factory("greeting", "name", |deps| {
            let name = deps.into_iter().next().flatten().unwrap_or_default();
            alloc::format!("hello {}", name.as_str().unwrap_or("nobody"))
        });
        // Defined after the factory, but before the first call
        collection.set("name", "noder");

        assert_eq!(collection.get("greeting"), Some(Value::from("hello noder")));
    }

    #[test]
    #[traced_test]
    fn test_provider_with_accessor() {
        let collection = Collection::new();
        let expected = collection.get_all();

        collection.provider(
            "keys",
            Deps::accessor(move |store: &Store| {
                assert!(Store::ptr_eq(store, &expected));
                store.len() as i64
            }),
            |_| Value::Null,
        );

        assert_eq!(collection.get("keys"), Some(Value::Int(1)));
    }

    #[test]
    fn test_memo_kept_pending() {
        let memo = Memo::new(|| Value::Int(1));

        assert_eq!(memo.try_get_or_run(Err), Value::Null);
        assert!(!memo.has_run());
        assert_eq!(memo.try_get_or_run(|factory| Ok(factory())), Value::Int(1));
        assert!(memo.has_run());
    }

    #[test]
    #[traced_test]
    fn test_shared_store_outlives_collection() {
        let collection = Collection::new();
        collection
            .set("dep", 41)
            .factory("factory", "dep", |deps: Vec<Option<Value>>| {
                deps[0].as_ref().and_then(Value::as_i64).unwrap_or_default() + 1
            })
            .provider("provider", ["dep"], |deps: Vec<Option<Entry>>| deps[0].is_some());

        let other = Collection::from(collection.get_all());
        drop(collection);

        assert_eq!(other.get("factory"), Some(Value::Int(42)));
        assert_eq!(other.get("factory"), Some(Value::Int(42)));
        assert_eq!(other.get("provider"), Some(Value::Bool(true)));
    }

    #[test]
    #[traced_test]
    fn test_dropped_collection() {
        let collection = Collection::new();
        collection.set("dep", 1).provider("provider", "dep", |deps| deps.len() as i64);

        let Some(Entry::Materializer(provider)) = collection.raw("provider") else {
            panic!("Expected materializer");
        };
        drop(collection);

        assert_eq!(provider.materialize(), Value::Null);
    }
}
