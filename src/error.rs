//! Unified error type.

/// The error type returned by ctxstack's fallible operations.
///
/// Application-level failures (404, 422, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// context lookups that came up empty and infrastructure failures in
/// [`Server`](crate::Server): binding to a port or accepting a connection.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// [`Context::get`](crate::Context::get) on a key that was never put, or
    /// has since been deleted.
    #[error("context: key {0:?} does not exist")]
    KeyNotFound(String),

    /// The key exists but holds a value of another type.
    #[error("context: value for key {key:?} is not a {expected}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
    },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// `true` for [`Error::KeyNotFound`]. Handy when a missing key should
    /// fall back to a default but a type mismatch should not.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound(_))
    }
}
