//! Onion-style middleware pipeline and command dispatcher.
//!
//! This crate provides the request/command plumbing of a web framework:
//! - **Pipeline**: threads a payload through an ordered list of stages and
//!   into a destination, each stage holding a single-use continuation
//! - **Dispatcher**: sends commands through pipes and into their handlers,
//!   binding handler parameters from an explicit type registry
//! - **HTTP kernel**: request middleware in front of a request handler
//!
//! # Core Types
//!
//! - [`Pipeline`]: Ordered stages plus the registry that resolves named ones
//! - [`Stage`]: Either an inline function or a named, registry-resolved [`Pipe`]
//! - [`Next`]: Continuation to the rest of the chain, consumed on use
//! - [`StageRegistry`] / [`Container`]: Explicitly passed stage and type registries
//! - [`Dispatcher`]: Command bus over a [`Pipeline`]
//! - [`http::Kernel`]: HTTP middleware stack
//!
//! # Examples
//!
//! ```
//! use pipeline_bus::{Pipeline, Stage};
//!
//! let pipeline = Pipeline::inline_only()
//!     .pipe(Stage::inline(|s: String, next| next.run(s.trim().to_string())))
//!     .pipe(Stage::inline(|s: String, next| {
//!         if s.is_empty() {
//!             return Ok("rejected".to_string());
//!         }
//!         next.run(s)
//!     }));
//!
//! assert_eq!(pipeline.dispatch("  hi ".to_string(), Ok).unwrap(), "hi");
//! assert_eq!(pipeline.dispatch("   ".to_string(), Ok).unwrap(), "rejected");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod binding;
mod dispatcher;
mod error;
pub mod http;
mod logging;
mod next;
mod pipeline;
mod registry;
mod secret;
mod stage;

pub use binding::{bind_parameters, Arguments, Binding, BindingStrategy, Param};
pub use dispatcher::{Command, CommandHandler, Dispatcher, DEFAULT_METHOD};
pub use error::{BoxError, Error, ResolutionError, ResolutionTarget, Result};
pub use logging::RunLog;
pub use next::Next;
pub use pipeline::{Pipeline, Sending};
pub use registry::{Container, Instance, ResolveStage, ResolveType, StageRegistry, TypeKey};
pub use secret::Secret;
pub use stage::{InlineFn, Pipe, Stage};
