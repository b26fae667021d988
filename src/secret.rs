use std::fmt;

/// A wrapper that keeps credentials out of logs.
///
/// Request credentials (the `Authorization` header, API tokens passed to
/// middleware) travel through every pipeline stage, and stages log freely.
/// `Secret<T>` makes the value unprintable: `Debug` and `Display` both
/// produce `[REDACTED]`, and the value is only reachable through
/// [`expose_secret`](Self::expose_secret).
///
/// # Examples
///
/// ```
/// use pipeline_bus::Secret;
///
/// let token = Secret::new("Bearer t0k3n".to_string());
/// assert_eq!(format!("{:?}", token), "[REDACTED]");
/// assert_eq!(token.expose_secret(), "Bearer t0k3n");
/// ```
// Do NOT derive Clone, Copy or Default; each copy is another place to leak from.
pub struct Secret<T> {
    inner: T,
}

impl<T> Secret<T> {
    /// Wraps a sensitive value.
    pub fn new(value: T) -> Self {
        Self { inner: value }
    }

    /// Returns the wrapped value.
    ///
    /// Never pass the result to a log macro.
    pub fn expose_secret(&self) -> &T {
        &self.inner
    }
}

impl<T> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl<T> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}
