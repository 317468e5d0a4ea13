use alloc::{
    collections::BTreeMap,
    string::String,
    sync::{Arc, Weak},
    vec::Vec,
};
use core::{
    fmt::{self, Debug, Formatter},
    mem,
};
use parking_lot::Mutex;

use crate::value::Entry;

/// Backing mapping of a collection.
///
/// [`Store`] is a shared handle: clones alias the same entries, so a mutation through one handle
/// is visible through all others. Keys are enumerated in the order of their first insertion,
/// overwriting a key keeps its position.
///
/// The lock is only held for the duration of a single operation and never while an entry is called.
#[derive(Clone, Default)]
pub struct Store {
    inner: Arc<Mutex<Slots>>,
}

#[derive(Default)]
struct Slots {
    entries: BTreeMap<String, Slot>,
    next_order: u64,
}

struct Slot {
    order: u64,
    entry: Entry,
}

impl Store {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts the entry, returning the previous one
    pub fn insert(&self, key: impl Into<String>, entry: impl Into<Entry>) -> Option<Entry> {
        let mut guard = self.inner.lock();
        let Slots { entries, next_order } = &mut *guard;
        let key = key.into();
        let entry = entry.into();

        if let Some(slot) = entries.get_mut(&key) {
            return Some(mem::replace(&mut slot.entry, entry));
        }

        let order = *next_order;
        *next_order += 1;
        entries.insert(key, Slot { order, entry });
        None
    }

    #[inline]
    pub fn remove(&self, key: &str) -> Option<Entry> {
        self.inner.lock().entries.remove(key).map(|slot| slot.entry)
    }

    #[inline]
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.lock().entries.contains_key(key)
    }

    /// Returns a clone of the entry, the entry itself isn't called
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Entry> {
        self.inner.lock().entries.get(key).map(|slot| slot.entry.clone())
    }

    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let guard = self.inner.lock();
        let mut keys = guard
            .entries
            .iter()
            .map(|(key, slot)| (slot.order, key.clone()))
            .collect::<Vec<_>>();
        drop(guard);

        keys.sort_unstable_by_key(|(order, _)| *order);
        keys.into_iter().map(|(_, key)| key).collect()
    }

    /// Snapshot of the entries in insertion order
    #[must_use]
    pub fn entries(&self) -> Vec<(String, Entry)> {
        let guard = self.inner.lock();
        let mut slots = guard
            .entries
            .iter()
            .map(|(key, Slot { order, entry })| (*order, key.clone(), entry.clone()))
            .collect::<Vec<_>>();
        drop(guard);

        slots.sort_unstable_by_key(|(order, ..)| *order);
        slots.into_iter().map(|(_, key, entry)| (key, entry)).collect()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    /// Returns `true` if both handles point to the same mapping
    #[inline]
    #[must_use]
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.inner, &other.inner)
    }

    #[inline]
    pub(crate) fn downgrade(&self) -> WeakStore {
        WeakStore(Arc::downgrade(&self.inner))
    }
}

/// Non-owning handle, used by stored closures that need the store they are stored in
#[derive(Clone)]
pub(crate) struct WeakStore(Weak<Mutex<Slots>>);

impl WeakStore {
    #[inline]
    pub(crate) fn upgrade(&self) -> Option<Store> {
        self.0.upgrade().map(|inner| Store { inner })
    }
}

impl Debug for Store {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store").field("keys", &self.keys()).finish()
    }
}

impl<K, E> FromIterator<(K, E)> for Store
where
    K: Into<String>,
    E: Into<Entry>,
{
    fn from_iter<I: IntoIterator<Item = (K, E)>>(iter: I) -> Self {
        let store = Self::new();
        for (key, entry) in iter {
            store.insert(key, entry);
        }
        store
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::{string::String, vec, vec::Vec};

    use super::Store;
    use crate::value::{Entry, Value};

    fn keys(store: &Store) -> Vec<String> {
        store.keys()
    }

    #[test]
    fn test_insertion_order() {
        let store = Store::new();
        store.insert("b", 1);
        store.insert("a", 2);
        store.insert("c", 3);

        assert_eq!(keys(&store), vec!["b", "a", "c"]);

        // Overwrite keeps the position
        assert_eq!(store.insert("b", 4), Some(Entry::Literal(Value::Int(1))));
        assert_eq!(keys(&store), vec!["b", "a", "c"]);

        // Re-inserted key goes to the end
        store.remove("b");
        store.insert("b", 5);
        assert_eq!(keys(&store), vec!["a", "c", "b"]);
        assert_eq!(store.get("b"), Some(Entry::Literal(Value::Int(5))));
    }

    #[test]
    fn test_keys_after_overwrite() {
        let store = Store::new();
        store.insert("list", vec![Value::Int(1)]);
        store.insert("text", "a");
        store.insert("list", "replaced");

        assert_eq!(keys(&store), vec!["list", "text"]);
        assert_eq!(store.entries().len(), 2);
    }

    #[test]
    fn test_weak_handle() {
        let store = Store::new();
        let weak = store.downgrade();

        assert!(Store::ptr_eq(&weak.upgrade().unwrap(), &store));
        drop(store);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_aliasing() {
        let store = Store::new();
        let alias = store.clone();

        alias.insert("key", "value");

        assert!(Store::ptr_eq(&store, &alias));
        assert!(store.contains_key("key"));
        assert_eq!(store.len(), 1);
        assert!(!Store::ptr_eq(&store, &Store::new()));
    }

    #[test]
    fn test_remove_absent() {
        let store: Store = [("a", 1)].into_iter().collect();

        assert_eq!(store.remove("missing"), None);
        assert_eq!(store.remove("a"), Some(Entry::Literal(Value::Int(1))));
        assert!(store.is_empty());
    }
}
