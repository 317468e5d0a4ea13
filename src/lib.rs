#![cfg_attr(not(test), no_std)]

extern crate alloc;

#[macro_use]
pub(crate) mod macros;

pub(crate) mod collection;
pub(crate) mod dependency;
pub(crate) mod errors;
pub(crate) mod injector;
pub(crate) mod lazy;
pub(crate) mod loader;
pub(crate) mod memo;
pub(crate) mod noder;
pub(crate) mod plugin;
pub(crate) mod store;
pub(crate) mod value;

pub mod utils;

pub use collection::Collection;
pub use dependency::{Accessor, Deps};
pub use errors::{CollectionErrorKind, NoderErrorKind};
pub use lazy::{LazyModules, Source};
pub use loader::{Loader, ModuleRegistry};
pub use memo::wrap;
pub use noder::Noder;
pub use plugin::Plugin;
pub use store::Store;
pub use value::{Entry, Function, Value};
