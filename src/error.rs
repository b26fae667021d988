use std::fmt;

/// Boxed error raised by a stage, a handler or a destination.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that can occur while running a pipeline or dispatching a command.
#[derive(Debug)]
pub enum Error {
    /// A named stage or a parameter type could not be resolved
    Resolution(ResolutionError),
    /// The command does not expose the requested handler method
    MethodNotFound {
        /// Name of the command that was dispatched
        command: String,
        /// Handler method that was looked up
        method: String,
    },
    /// A stage specifier string could not be parsed
    InvalidSpecifier {
        /// The offending specifier
        spec: String,
        /// Why it was rejected
        reason: &'static str,
    },
    /// An error raised inside a stage, handler or destination.
    ///
    /// The boxed value is the original error; it can be downcast.
    Stage(BoxError),
}

impl Error {
    /// Wraps an error raised by user code so it can cross the pipeline.
    pub fn stage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Stage(Box::new(err))
    }

    /// Builds a resolution error for a named stage.
    pub(crate) fn unresolved_stage(name: impl Into<String>) -> Self {
        Error::Resolution(ResolutionError::new(ResolutionTarget::Stage, name))
    }

    /// Builds a resolution error for a type lookup.
    pub(crate) fn unresolved_type(name: impl Into<String>) -> Self {
        Error::Resolution(ResolutionError::new(ResolutionTarget::Type, name))
    }

    /// Returns the resolution error, if this is one.
    pub fn as_resolution(&self) -> Option<&ResolutionError> {
        match self {
            Error::Resolution(r) => Some(r),
            _ => None,
        }
    }

    /// Returns true for `MethodNotFound`.
    pub fn is_method_not_found(&self) -> bool {
        matches!(self, Error::MethodNotFound { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Resolution(r) => write!(f, "Resolution failed: {}", r),
            Error::MethodNotFound { command, method } => {
                write!(f, "Method '{}' not found on command '{}'", method, command)
            }
            Error::InvalidSpecifier { spec, reason } => {
                write!(f, "Invalid stage specifier '{}': {}", spec, reason)
            }
            Error::Stage(e) => write!(f, "Stage failed: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Resolution(r) => Some(r),
            Error::Stage(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<ResolutionError> for Error {
    fn from(r: ResolutionError) -> Self {
        Error::Resolution(r)
    }
}

/// A failed registry lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionError {
    /// What kind of lookup failed
    pub target: ResolutionTarget,
    /// The stage name or type name that was looked up
    pub name: String,
}

impl ResolutionError {
    /// Creates a new resolution error.
    pub fn new(target: ResolutionTarget, name: impl Into<String>) -> Self {
        Self {
            target,
            name: name.into(),
        }
    }
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}' is not registered", self.target, self.name)
    }
}

impl std::error::Error for ResolutionError {}

/// The registry a failed lookup went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionTarget {
    /// A named pipeline stage
    Stage,
    /// A type-directed parameter lookup
    Type,
}

impl fmt::Display for ResolutionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionTarget::Stage => write!(f, "stage"),
            ResolutionTarget::Type => write!(f, "type"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[derive(Debug)]
    struct Boom;

    impl fmt::Display for Boom {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("boom")
        }
    }

    impl std::error::Error for Boom {}

    #[test]
    fn stage_error_keeps_original_source() {
        let err = Error::stage(Boom);

        assert_eq!(err.to_string(), "Stage failed: boom");
        let source = err.source().expect("source present");
        assert!(source.downcast_ref::<Boom>().is_some());
    }

    #[test]
    fn resolution_error_display() {
        let err = Error::unresolved_stage("auth");
        assert_eq!(
            err.to_string(),
            "Resolution failed: stage 'auth' is not registered"
        );
        assert_eq!(
            err.as_resolution().map(|r| r.target),
            Some(ResolutionTarget::Stage)
        );
    }

    #[test]
    fn method_not_found_display() {
        let err = Error::MethodNotFound {
            command: "SendInvoice".to_string(),
            method: "handle".to_string(),
        };
        assert!(err.is_method_not_found());
        assert_eq!(
            err.to_string(),
            "Method 'handle' not found on command 'SendInvoice'"
        );
    }
}
