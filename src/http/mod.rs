//! HTTP request handling on top of the pipeline.
//!
//! The [`Kernel`] is the pipeline's main client: each incoming request is
//! sent through the configured middleware and into a request handler.
//!
//! # Integration Model
//!
//! Server-specific code should:
//! 1. Build a [`Request`] from its own request type
//! 2. Set the [`Principal`] if its session or token layer authenticated one
//! 3. Call [`Kernel::handle`]
//! 4. Convert the returned [`Response`] back
//!
//! ```text
//! Server request
//!   ↓
//! Request (+ Principal)
//!   ↓
//! Kernel::handle ──→ request_id ──→ auth ──→ body_limit ──→ handler
//!   ↓
//! Response
//! ```
//!
//! This module contains no server-specific code.

mod kernel;
mod middleware;
mod request;

pub use kernel::{Kernel, KernelBuilder};
pub use middleware::{Authenticate, BodyLimit, MiddlewareError, RequestIdHeader, RequireHeader};
pub use request::{Principal, Request, Response, AUTHORIZATION};
