//! Command dispatcher.
//!
//! The dispatcher sends a command through its configured pipes and then
//! invokes the command's handler, binding the handler's declared parameters
//! from the type registry it was constructed with.
//!
//! # Dispatch Flow
//!
//! ```text
//! dispatch(command)
//!   ↓
//! handler method exists?  ── no ──→ Error::MethodNotFound (no pipe runs)
//!   ↓ yes
//! pipes configured?       ── no ──→ bind parameters → call handler
//!   ↓ yes
//! pipeline(command) ──→ destination: bind parameters → call handler
//! ```

use std::fmt;
use std::sync::Arc;

use crate::binding::{bind_parameters, Arguments, BindingStrategy, Param};
use crate::error::{Error, Result};
use crate::pipeline::Pipeline;
use crate::registry::{ResolveStage, ResolveType};
use crate::stage::Stage;

/// Default handler method name.
pub const DEFAULT_METHOD: &str = "handle";

/// A command that can handle itself.
///
/// A command exposes handler methods by name. [`params`](Self::params)
/// declares what a method needs, and [`call`](Self::call) runs it with the
/// bound arguments.
///
/// # Examples
///
/// ```
/// use pipeline_bus::{Arguments, Command, Param, Result};
///
/// struct Greet { who: String }
///
/// impl Command for Greet {
///     type Output = String;
///
///     fn name(&self) -> &str { "Greet" }
///
///     fn params(&self, method: &str) -> Option<Vec<Param>> {
///         (method == "handle").then(|| vec![Param::new("greeting").default_value("Hello")])
///     }
///
///     fn call(self, _method: &str, args: Arguments) -> Result<String> {
///         let greeting = args.get::<&'static str>("greeting").map(|g| *g).unwrap_or("Hi");
///         Ok(format!("{}, {}", greeting, self.who))
///     }
/// }
/// ```
pub trait Command: Sized + 'static {
    /// What the handler returns
    type Output: 'static;

    /// Command name used in logs and errors.
    fn name(&self) -> &str;

    /// Declared parameters of handler `method`, or `None` if the command
    /// does not expose that method.
    fn params(&self, method: &str) -> Option<Vec<Param>>;

    /// Runs handler `method` with bound arguments.
    fn call(self, method: &str, args: Arguments) -> Result<Self::Output>;
}

/// A separate handler object for commands of type `C`.
///
/// When mapped on a dispatcher, it replaces the command's own handler
/// methods.
pub trait CommandHandler<C: Command>: Send + Sync {
    /// Declared parameters of [`handle`](Self::handle).
    fn params(&self) -> Vec<Param> {
        Vec::new()
    }

    /// Handles the command.
    fn handle(&self, command: C, args: Arguments) -> Result<C::Output>;
}

/// Sends commands through pipes and into their handlers.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use pipeline_bus::{Arguments, Command, Container, Dispatcher, Param, Result, Stage};
///
/// struct Double(i64);
///
/// impl Command for Double {
///     type Output = i64;
///     fn name(&self) -> &str { "Double" }
///     fn params(&self, method: &str) -> Option<Vec<Param>> {
///         (method == "handle").then(Vec::new)
///     }
///     fn call(self, _method: &str, _args: Arguments) -> Result<i64> {
///         Ok(self.0 * 2)
///     }
/// }
///
/// let dispatcher = Dispatcher::<Double>::new(Arc::new(Container::new()))
///     .pipe_through([Stage::inline(|cmd: Double, next| next.run(Double(cmd.0 + 1)))]);
///
/// assert_eq!(dispatcher.dispatch(Double(4)).unwrap(), 10);
/// assert_eq!(dispatcher.dispatch_now(Double(4)).unwrap(), 8);
/// ```
pub struct Dispatcher<C: Command> {
    container: Arc<dyn ResolveType>,
    pipeline: Pipeline<C, C::Output>,
    method: String,
    strategy: BindingStrategy,
    handler: Option<Arc<dyn CommandHandler<C>>>,
}

impl<C: Command> Dispatcher<C> {
    /// Creates a dispatcher that binds handler parameters from `container`.
    pub fn new(container: Arc<dyn ResolveType>) -> Self {
        Self {
            container,
            pipeline: Pipeline::inline_only(),
            method: DEFAULT_METHOD.to_string(),
            strategy: BindingStrategy::default(),
            handler: None,
        }
    }

    /// Sets the pipes every dispatched command passes through.
    pub fn pipe_through<I>(mut self, pipes: I) -> Self
    where
        I: IntoIterator<Item = Stage<C, C::Output>>,
    {
        self.pipeline = self.pipeline.through(pipes);
        self
    }

    /// Sets the registry used to resolve named pipes.
    pub fn with_stage_registry(mut self, registry: Arc<dyn ResolveStage<C, C::Output>>) -> Self {
        self.pipeline = Pipeline::new(registry).through(self.pipeline.stages().to_vec());
        self
    }

    /// Sets the handler method name. Defaults to `"handle"`.
    pub fn via(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Sets the parameter binding strategy.
    pub fn binding(mut self, strategy: BindingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Maps a separate handler for all commands of type `C`.
    pub fn map_handler<H>(mut self, handler: H) -> Self
    where
        H: CommandHandler<C> + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// The configured pipes.
    pub fn pipes(&self) -> &[Stage<C, C::Output>] {
        self.pipeline.stages()
    }

    /// The handler method name.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Returns true if `command` can be handled, either by a mapped handler
    /// or by its own handler method.
    pub fn has_handler(&self, command: &C) -> bool {
        self.handler.is_some() || command.params(&self.method).is_some()
    }

    /// Sends `command` through the pipes and into its handler.
    ///
    /// # Errors
    ///
    /// - `Error::MethodNotFound` if the handler method does not exist.
    ///   Checked before any pipe runs.
    /// - `Error::Resolution` for unknown named pipes, or for unbindable
    ///   parameters under `BindingStrategy::Strict`.
    /// - Errors from pipes or the handler, unchanged.
    pub fn dispatch(&self, command: C) -> Result<C::Output> {
        self.ensure_handler(&command)?;

        tracing::debug!(
            command = command.name(),
            method = %self.method,
            pipes = self.pipeline.len(),
            "dispatching command"
        );

        if self.pipeline.is_empty() {
            return self.invoke(command);
        }

        self.pipeline.dispatch(command, |command| self.invoke(command))
    }

    /// Calls the handler directly, skipping the pipes.
    ///
    /// # Errors
    ///
    /// Same as [`dispatch`](Self::dispatch), minus pipe errors.
    pub fn dispatch_now(&self, command: C) -> Result<C::Output> {
        self.ensure_handler(&command)?;
        self.invoke(command)
    }

    fn ensure_handler(&self, command: &C) -> Result<()> {
        if self.has_handler(command) {
            Ok(())
        } else {
            Err(self.method_not_found(command))
        }
    }

    fn method_not_found(&self, command: &C) -> Error {
        tracing::warn!(
            command = command.name(),
            method = %self.method,
            "handler method not found"
        );
        Error::MethodNotFound {
            command: command.name().to_string(),
            method: self.method.clone(),
        }
    }

    /// Binds parameters against the command that reached the handler, which
    /// may be a replacement forwarded by a pipe.
    fn invoke(&self, command: C) -> Result<C::Output> {
        match &self.handler {
            Some(handler) => {
                let args = self.bind(&handler.params())?;
                handler.handle(command, args)
            }
            None => {
                let params = command
                    .params(&self.method)
                    .ok_or_else(|| self.method_not_found(&command))?;
                let args = self.bind(&params)?;
                command.call(&self.method, args)
            }
        }
    }

    fn bind(&self, params: &[Param]) -> Result<Arguments> {
        bind_parameters(params, self.container.as_ref(), self.strategy)
    }
}

impl<C: Command> fmt::Debug for Dispatcher<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("pipeline", &self.pipeline)
            .field("method", &self.method)
            .field("strategy", &self.strategy)
            .field("mapped_handler", &self.handler.is_some())
            .finish()
    }
}
