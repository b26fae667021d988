use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::next::Next;

/// A named, registry-resolved pipeline stage.
///
/// Implementors receive the payload, the continuation to the rest of the
/// chain and the extra arguments from the stage specifier.
///
/// # Examples
///
/// ```
/// use pipeline_bus::{Next, Pipe, Result};
///
/// struct Prefix;
///
/// impl Pipe<String, String> for Prefix {
///     fn handle(&self, payload: String, next: Next<'_, String, String>, args: &[String]) -> Result<String> {
///         let prefix = args.first().map(String::as_str).unwrap_or(">");
///         next.run(format!("{}{}", prefix, payload))
///     }
/// }
/// ```
pub trait Pipe<P, R>: Send + Sync {
    /// Handles the payload. Call `next.run` to continue, or return to stop.
    fn handle(&self, payload: P, next: Next<'_, P, R>, args: &[String]) -> Result<R>;
}

/// Function type of an inline stage.
pub type InlineFn<P, R> = dyn Fn(P, Next<'_, P, R>) -> Result<R> + Send + Sync;

/// One link in a pipeline.
///
/// A stage is either an inline function or the name of a stage registered
/// with a [`ResolveStage`](crate::ResolveStage) plus its extra arguments.
/// Named stages are resolved when a run reaches them, not when the pipeline
/// is built.
pub enum Stage<P, R> {
    /// A function called directly with `(payload, next)`
    Inline(Arc<InlineFn<P, R>>),
    /// A stage looked up by name at run time
    Named {
        /// Registry name
        name: String,
        /// Extra arguments passed to [`Pipe::handle`]
        args: Vec<String>,
    },
}

impl<P, R> Stage<P, R> {
    /// Creates an inline stage from a function.
    pub fn inline<F>(f: F) -> Self
    where
        F: Fn(P, Next<'_, P, R>) -> Result<R> + Send + Sync + 'static,
    {
        Stage::Inline(Arc::new(f))
    }

    /// Creates a named stage with explicit arguments.
    pub fn named<I, S>(name: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Stage::Named {
            name: name.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses a `name:arg1,arg2` specifier into a named stage.
    ///
    /// Everything before the first `:` is the name. Without a `:` the stage
    /// has no arguments.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidSpecifier` if the name is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use pipeline_bus::Stage;
    ///
    /// let stage: Stage<(), ()> = Stage::parse("throttle:60,1").unwrap();
    /// assert_eq!(stage.name(), Some("throttle"));
    /// assert_eq!(stage.args(), ["60", "1"]);
    /// ```
    pub fn parse(spec: &str) -> Result<Self> {
        let (name, args) = match spec.split_once(':') {
            Some((name, rest)) => (name.trim(), rest.split(',').map(str::to_string).collect()),
            None => (spec.trim(), Vec::new()),
        };

        if name.is_empty() {
            return Err(Error::InvalidSpecifier {
                spec: spec.to_string(),
                reason: "stage name is empty",
            });
        }

        Ok(Stage::Named {
            name: name.to_string(),
            args,
        })
    }

    /// Returns the registry name for named stages.
    pub fn name(&self) -> Option<&str> {
        match self {
            Stage::Inline(_) => None,
            Stage::Named { name, .. } => Some(name),
        }
    }

    /// Returns the extra arguments; inline stages have none.
    pub fn args(&self) -> &[String] {
        match self {
            Stage::Inline(_) => &[],
            Stage::Named { args, .. } => args,
        }
    }

    /// Returns a label for logs.
    pub(crate) fn label(&self) -> &str {
        self.name().unwrap_or("<inline>")
    }
}

impl<P, R> Clone for Stage<P, R> {
    fn clone(&self) -> Self {
        match self {
            Stage::Inline(f) => Stage::Inline(Arc::clone(f)),
            Stage::Named { name, args } => Stage::Named {
                name: name.clone(),
                args: args.clone(),
            },
        }
    }
}

impl<P, R> fmt::Debug for Stage<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Inline(_) => f.write_str("<inline>"),
            Stage::Named { name, args } => f
                .debug_struct("Named")
                .field("name", name)
                .field("args", args)
                .finish(),
        }
    }
}

impl<P, R> FromStr for Stage<P, R> {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Stage::parse(s)
    }
}
