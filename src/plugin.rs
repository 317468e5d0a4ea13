use crate::{noder::Noder, value::Value};

/// Unit that initializes itself against a [`Noder`].
///
/// Closures `Fn(&Noder, &[Value]) -> Result<R, E>` are plugins too.
pub trait Plugin: Send + Sync {
    /// Initialization entry point, called once per [`Noder::use_plugin`] with the extra arguments of the call
    ///
    /// # Errors
    /// Any error of the plugin, it's propagated to the caller as [`crate::NoderErrorKind::Plugin`]
    fn init(&self, noder: &Noder, args: &[Value]) -> anyhow::Result<Value>;
}

impl<F, R, E> Plugin for F
where
    F: Fn(&Noder, &[Value]) -> Result<R, E> + Send + Sync,
    R: Into<Value>,
    E: Into<anyhow::Error>,
{
    #[inline]
    fn init(&self, noder: &Noder, args: &[Value]) -> anyhow::Result<Value> {
        self(noder, args).map(Into::into).map_err(Into::into)
    }
}
