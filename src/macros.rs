/// Creates a [`crate::Store`] from `key => value` pairs, preserving their order.
///
/// Values are converted with [`Into<crate::Entry>`], so a [`crate::Function`] becomes a materializer
/// and everything else a literal.
///
/// ```rust
/// use noder::{store, Value};
///
/// let store = store! {
///     "name" => "noder",
///     "nested" => store! { "port" => 3000 },
/// };
///
/// assert_eq!(store.keys(), ["name", "nested"]);
/// assert_eq!(store.get("name").unwrap().into_value(), Value::from("noder"));
/// ```
#[macro_export]
macro_rules! store {
    () => {
        $crate::Store::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let store = $crate::Store::new();
        $(
            store.insert($key, $value);
        )+
        store
    }};
}
