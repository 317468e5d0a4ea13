use crate::{
    store::Store,
    value::{Entry, Value},
};

pub trait Merge<T> {
    type Output;

    #[must_use]
    fn merge(self, other: T) -> Self::Output;
}

/// Recursive merge: nested maps present on both sides are merged in place,
/// any other value of `other` (lists included) overwrites the one in `self`.
impl Merge<&Store> for Store {
    type Output = Store;

    fn merge(self, other: &Store) -> Self::Output {
        for (key, entry) in other.entries() {
            let nested = match self.get(&key) {
                Some(Entry::Literal(Value::Map(nested))) => Some(nested),
                _ => None,
            };

            match (nested, entry) {
                (Some(nested), Entry::Literal(Value::Map(source))) => {
                    if !Store::ptr_eq(&nested, &source) {
                        let _ = nested.merge(&source);
                    }
                }
                (_, entry) => {
                    self.insert(key, entry);
                }
            }
        }
        self
    }
}

impl Merge<Store> for Store {
    type Output = Store;

    #[inline]
    fn merge(self, other: Store) -> Self::Output {
        self.merge(&other)
    }
}
