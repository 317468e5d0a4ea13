use alloc::string::String;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CollectionErrorKind {
    #[error("Argument #{position} passed to {method} must be {expected}, {given} given")]
    InvalidArgument {
        method: &'static str,
        position: u8,
        expected: &'static str,
        given: &'static str,
    },
    #[error("Identifier {key} passed to {method} is already defined")]
    AlreadyDefined { key: String, method: &'static str },
    #[error("Identifier {key} is not defined")]
    NotFound { key: String },
}
