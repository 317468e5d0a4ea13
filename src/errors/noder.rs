use alloc::string::String;

use super::collection::CollectionErrorKind;

#[derive(thiserror::Error, Debug)]
pub enum NoderErrorKind {
    #[error(
        "\
        Unit {name} is not a valid plugin. \
        A plugin must provide an initialization entry point, register it with `ModuleRegistry::plugin`\
        "
    )]
    NotCallable { name: String },
    #[error("Unit {name} not found by the loader")]
    NotFound { name: String },
    #[error("Property {property} is not writable, because it is a placeholder of a lazily loaded module")]
    NotWritable { property: String },
    #[error("Property {property} is already defined")]
    AlreadyDefined { property: String },
    #[error("Property {property} is not defined")]
    NoProperty { property: String },
    #[error(transparent)]
    Plugin(anyhow::Error),
    #[error(transparent)]
    Collection(#[from] CollectionErrorKind),
}
