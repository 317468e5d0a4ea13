mod collection;
mod noder;

pub use collection::CollectionErrorKind;
pub use noder::NoderErrorKind;
