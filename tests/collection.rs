use noder::{store, wrap, Collection, CollectionErrorKind, Entry, Function, Store, Value};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tracing_test::traced_test;

fn counter() -> (Arc<AtomicUsize>, Function) {
    let count = Arc::new(AtomicUsize::new(0));
    let function = Function::new({
        let count = count.clone();
        move |_: &[Value]| count.fetch_add(1, Ordering::SeqCst) as i64 + 1
    });
    (count, function)
}

#[test]
#[traced_test]
fn set_then_raw_keeps_identity() {
    let collection = Collection::new();
    let map = store! { "nested" => 1 };
    let (_, function) = counter();

    collection
        .set("scalar", 1.5)
        .set("map", map.clone())
        .set("function", function.clone());

    for key in ["scalar", "map", "function"] {
        assert!(collection.has(key));
    }
    assert_eq!(collection.raw("scalar"), Some(Entry::Literal(Value::Float(1.5))));

    let map_entry = collection.raw("map").unwrap().into_value();
    assert!(Store::ptr_eq(map_entry.as_map().unwrap(), &map));

    let function_entry = collection.raw("function").unwrap();
    assert!(Function::ptr_eq(function_entry.as_materializer().unwrap(), &function));
}

#[test]
#[traced_test]
fn get_calls_function_each_time() {
    let collection = Collection::new();
    let (count, function) = counter();
    collection.set("fresh", function);

    assert_eq!(collection.get("fresh"), Some(Value::Int(1)));
    assert_eq!(collection.get("fresh"), Some(Value::Int(2)));
    assert_eq!(collection.get_strict("fresh"), Ok(Value::Int(3)));
    assert_eq!(count.load(Ordering::SeqCst), 3);
}

#[test]
#[traced_test]
fn singleton_runs_once() {
    let collection = Collection::new();
    let count = Arc::new(AtomicUsize::new(0));

    collection.singleton("single", {
        let count = count.clone();
        move |args: &[Value]| {
            count.fetch_add(1, Ordering::SeqCst);
            args.to_vec()
        }
    });

    let single = collection.raw("single").unwrap();
    let single = single.as_materializer().unwrap();
    let first = single.call(&[Value::from("first")]);

    for n in 0..10 {
        assert_eq!(single.call(&[Value::Int(n)]), first);
    }
    assert_eq!(collection.get("single"), Some(Value::List(vec![Value::from("first")])));
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
#[traced_test]
fn add_once_keeps_first_value() {
    let collection = Collection::new();

    collection.add_once("key", "v1", false).unwrap();
    assert!(matches!(
        collection.add_once("key", "v2", false),
        Err(CollectionErrorKind::AlreadyDefined { key, .. }) if key == "key"
    ));
    assert_eq!(collection.get("key"), Some(Value::from("v1")));

    collection.add_once("key", "v2", true).unwrap();
    assert_eq!(collection.get("key"), Some(Value::from("v1")));
}

#[test]
#[traced_test]
fn merge_nested_maps() {
    let collection = Collection::new();

    collection
        .merge([
            store! { "a" => store! { "b" => 1 }, "list" => vec![Value::Int(1)] },
            store! { "a" => store! { "c" => 2 }, "list" => vec![Value::Int(2)] },
        ])
        .unwrap();

    let a = collection.get("a").unwrap();
    let a = a.as_map().unwrap();
    assert_eq!(a.keys(), ["b", "c"]);
    assert_eq!(a.get("b"), Some(Entry::Literal(Value::Int(1))));
    assert_eq!(a.get("c"), Some(Entry::Literal(Value::Int(2))));
    assert_eq!(collection.get("list"), Some(Value::List(vec![Value::Int(2)])));
}

#[test]
#[traced_test]
fn inject_and_invoke_dependencies() {
    let collection = Collection::new();
    let (count, function) = counter();
    collection.set("x", function.clone());

    let injected = collection.inject(["x"], |deps| {
        let Some(Some(Entry::Materializer(x))) = deps.first() else {
            panic!("Expected materializer");
        };
        assert!(Function::ptr_eq(x, &function));
        "injected"
    });
    assert_eq!(injected, Value::from("injected"));
    assert_eq!(count.load(Ordering::SeqCst), 0);

    let invoked = collection.invoke(["x"], |deps| deps.into_iter().next().flatten());
    assert_eq!(invoked, Value::Int(1));
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
#[traced_test]
fn raw_strict_and_default() {
    let collection = Collection::new();

    assert_eq!(
        collection.raw_strict("missing"),
        Err(CollectionErrorKind::NotFound { key: "missing".into() })
    );
    assert_eq!(collection.raw_or("missing", "default"), Entry::Literal(Value::from("default")));
}

#[test]
#[traced_test]
fn apply_binds_backing_store() {
    let collection = Collection::new();
    collection.set("name", "noder");

    let no_args = collection.apply(
        |scope: &Store, args: &[Value]| {
            assert!(Store::ptr_eq(scope, &collection.get_all()));
            args.len()
        },
        &[],
    );
    assert_eq!(no_args, 0);

    let greeting = collection.apply(
        |scope: &Store, args: &[Value]| {
            let name = scope.get("name").unwrap().materialize();
            format!("{} {:?}", name.as_str().unwrap(), args)
        },
        &[Value::from("a"), Value::from("b")],
    );
    assert_eq!(greeting, r#"noder [String("a"), String("b")]"#);
}

#[test]
#[traced_test]
fn provider_observes_replaced_store() {
    let collection = Collection::new();
    collection.provider("greeting", "name", |deps| {
        let name = deps.into_iter().next().flatten().map(|entry| entry.materialize());
        format!("hello {}", name.as_ref().and_then(Value::as_str).unwrap_or("nobody"))
    });

    // Provider is kept, because it's part of the new store
    let store = collection.get_all();
    let replacement = Store::new();
    for (key, entry) in store.entries() {
        replacement.insert(key, entry);
    }
    replacement.insert("name", "noder");
    collection.set_all(replacement).unwrap();

    assert_eq!(collection.get("greeting"), Some(Value::from("hello noder")));
    assert_eq!(collection.get("greeting"), Some(Value::from("hello noder")));
}

#[test]
#[traced_test]
fn wrapped_function_is_returned_as_value() {
    let collection = Collection::new();
    let (count, function) = counter();

    collection.set("wrapped", wrap(function.clone()));

    assert_eq!(collection.get("wrapped"), Some(Value::Function(function)));
    assert_eq!(count.load(Ordering::SeqCst), 0);
}
