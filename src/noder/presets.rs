use alloc::{
    string::String,
    sync::{Arc, Weak},
    vec,
    vec::Vec,
};
use tracing::{error, info_span, warn};

use super::{Noder, NoderInner};
use crate::{
    dependency::Deps,
    errors::CollectionErrorKind,
    memo::wrap,
    value::{Entry, Function, Value},
};

type Shortcut = fn(&Noder, &[Value]) -> Result<Value, CollectionErrorKind>;

/// Stores the presets of the noder.
///
/// `$api`, `$di` and `$container` are the noder, its collection and the backing store.
/// The other presets are functions with dynamic arguments, one per shortcut of [`Noder`]:
/// - `$invoke(deps, fn)` and `$inject(deps, fn)`: `fn` gets the dependencies as arguments,
///   an absent key is passed as [`Value::Null`] and `$inject` passes a materializer uncalled
/// - `$provider(key, deps, fn)`, `$factory(key, deps, fn)` and `$singleton(key, fn)`: return `$api`
/// - `$apply(fn, args...)`: `fn` gets the backing store as first argument followed by `args`
/// - `$wrap(value)`
///
/// Every preset holds a weak handle, otherwise the store would keep its own noder alive.
pub(super) fn install(noder: &Noder) {
    let api = Arc::downgrade(&noder.inner);
    let di = noder.inner.di.downgrade();
    let container = noder.inner.di.downgrade();

    let presets = [
        (
            "$api",
            Function::new({
                let api = api.clone();
                move |_: &[Value]| upgrade(&api).map(Value::object)
            }),
        ),
        ("$di", Function::new(move |_: &[Value]| di.upgrade().map(Value::object))),
        (
            "$container",
            Function::new(move |_: &[Value]| container.upgrade().map(|di| di.get_all())),
        ),
        ("$invoke", shortcut("$invoke", &api, invoke)),
        ("$inject", shortcut("$inject", &api, inject)),
        ("$provider", shortcut("$provider", &api, provider)),
        ("$factory", shortcut("$factory", &api, factory)),
        ("$singleton", shortcut("$singleton", &api, singleton)),
        ("$apply", shortcut("$apply", &api, apply)),
        ("$wrap", shortcut("$wrap", &api, wrap_value)),
    ];

    for (key, preset) in presets {
        noder.inner.di.set(key, preset);
    }
}

fn upgrade(api: &Weak<NoderInner>) -> Option<Noder> {
    api.upgrade().map(|inner| Noder { inner })
}

/// The stored entry materializes to the shortcut function itself, so every read returns the same function
fn shortcut(method: &'static str, api: &Weak<NoderInner>, run: Shortcut) -> Function {
    let api = api.clone();
    wrap(Function::new(move |args: &[Value]| {
        let span = info_span!("shortcut", method, args = args.len());
        let _guard = span.enter();

        let Some(noder) = upgrade(&api) else {
            warn!("Noder is dropped, nothing to call");
            return Value::Null;
        };
        run(&noder, args).unwrap_or_default()
    }))
}

fn invoke(noder: &Noder, args: &[Value]) -> Result<Value, CollectionErrorKind> {
    let deps = deps_argument("$invoke", args, 0)?;
    let function = function_argument("$invoke", args, 1)?;

    Ok(noder.invoke(deps, |deps| function.call(&values(deps))))
}

fn inject(noder: &Noder, args: &[Value]) -> Result<Value, CollectionErrorKind> {
    let deps = deps_argument("$inject", args, 0)?;
    let function = function_argument("$inject", args, 1)?;

    Ok(noder.inject(deps, |deps| function.call(&entries(deps))))
}

fn provider(noder: &Noder, args: &[Value]) -> Result<Value, CollectionErrorKind> {
    let key = key_argument("$provider", args, 0)?;
    let deps = deps_argument("$provider", args, 1)?;
    let function = function_argument("$provider", args, 2)?;

    noder.provider(key, deps, move |deps| function.call(&entries(deps)));
    Ok(Value::object(noder.clone()))
}

fn factory(noder: &Noder, args: &[Value]) -> Result<Value, CollectionErrorKind> {
    let key = key_argument("$factory", args, 0)?;
    let deps = deps_argument("$factory", args, 1)?;
    let function = function_argument("$factory", args, 2)?;

    noder.factory(key, deps, move |deps| function.call(&values(deps)));
    Ok(Value::object(noder.clone()))
}

fn singleton(noder: &Noder, args: &[Value]) -> Result<Value, CollectionErrorKind> {
    let key = key_argument("$singleton", args, 0)?;
    let function = function_argument("$singleton", args, 1)?;

    noder.singleton(key, move |args: &[Value]| function.call(args));
    Ok(Value::object(noder.clone()))
}

fn apply(noder: &Noder, args: &[Value]) -> Result<Value, CollectionErrorKind> {
    let function = function_argument("$apply", args, 0)?;

    Ok(noder.apply(
        |store, args| {
            let mut scoped = vec![Value::Map(store.clone())];
            scoped.extend_from_slice(args);
            function.call(&scoped)
        },
        &args[1..],
    ))
}

fn wrap_value(noder: &Noder, args: &[Value]) -> Result<Value, CollectionErrorKind> {
    Ok(Value::Function(noder.wrap(args.first().cloned().unwrap_or_default())))
}

fn values(deps: Vec<Option<Value>>) -> Vec<Value> {
    deps.into_iter().map(Option::unwrap_or_default).collect()
}

fn entries(deps: Vec<Option<Entry>>) -> Vec<Value> {
    deps.into_iter().map(|entry| entry.map_or(Value::Null, Entry::into_value)).collect()
}

fn key_argument(method: &'static str, args: &[Value], index: usize) -> Result<String, CollectionErrorKind> {
    args.get(index)
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| invalid_argument(method, args, index, "a key"))
}

fn deps_argument(method: &'static str, args: &[Value], index: usize) -> Result<Deps, CollectionErrorKind> {
    args.get(index)
        .and_then(Deps::from_value)
        .ok_or_else(|| invalid_argument(method, args, index, "a key or a list of keys"))
}

fn function_argument(method: &'static str, args: &[Value], index: usize) -> Result<Function, CollectionErrorKind> {
    args.get(index)
        .and_then(Value::as_function)
        .cloned()
        .ok_or_else(|| invalid_argument(method, args, index, "a function"))
}

fn invalid_argument(method: &'static str, args: &[Value], index: usize, expected: &'static str) -> CollectionErrorKind {
    let err = CollectionErrorKind::InvalidArgument {
        method,
        position: u8::try_from(index + 1).unwrap_or(u8::MAX),
        expected,
        given: args.get(index).map_or("nothing", Value::kind),
    };
    error!("{}", err);
    err
}
