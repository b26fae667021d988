//! Built-in HTTP middleware.
//!
//! Each middleware is a named [`Pipe`] over `Request`/`Response`. Arguments
//! come from the specifier the middleware was registered with, e.g.
//! `body_limit:1024` or `require_header:x-tenant,x-api-version`.
//!
//! None of these grant anything. A middleware either forwards the request
//! with `next`, or answers it directly with an error response.

use std::fmt;

use crate::error::{Error, Result};
use crate::next::Next;
use crate::stage::Pipe;

use super::{Request, Response};

/// A middleware was configured with arguments it cannot use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiddlewareError {
    /// Registry name of the middleware
    pub middleware: &'static str,
    /// What was wrong
    pub message: String,
}

impl fmt::Display for MiddlewareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "middleware '{}': {}", self.middleware, self.message)
    }
}

impl std::error::Error for MiddlewareError {}

/// Rejects requests without a principal with `401`.
///
/// # Examples
///
/// ```
/// use pipeline_bus::http::{Kernel, Request, Response};
///
/// let kernel = Kernel::builder(|_req| Ok(Response::ok("secret stuff")))
///     .middleware("auth")
///     .build()
///     .unwrap();
///
/// let response = kernel.handle(Request::new("req-1".to_string(), "GET", "/")).unwrap();
/// assert_eq!(response.status_code(), 401);
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct Authenticate;

impl Pipe<Request, Response> for Authenticate {
    fn handle(
        &self,
        request: Request,
        next: Next<'_, Request, Response>,
        _args: &[String],
    ) -> Result<Response> {
        if request.principal().is_none() {
            next.log().debug(format_args!(
                "request {} has no principal, rejecting",
                request.request_id()
            ));
            return Ok(Response::status(401, "Unauthenticated"));
        }
        next.run(request)
    }
}

/// Rejects bodies larger than the byte limit given as first argument
/// with `413`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BodyLimit;

impl BodyLimit {
    fn limit(args: &[String]) -> Result<usize> {
        let raw = args.first().ok_or_else(|| {
            Error::stage(MiddlewareError {
                middleware: "body_limit",
                message: "missing byte limit argument".to_string(),
            })
        })?;

        raw.trim().parse().map_err(|_| {
            Error::stage(MiddlewareError {
                middleware: "body_limit",
                message: format!("byte limit '{}' is not a number", raw),
            })
        })
    }
}

impl Pipe<Request, Response> for BodyLimit {
    fn handle(
        &self,
        request: Request,
        next: Next<'_, Request, Response>,
        args: &[String],
    ) -> Result<Response> {
        let limit = Self::limit(args)?;
        if request.body().len() > limit {
            tracing::debug!(
                request_id = request.request_id(),
                size = request.body().len(),
                limit,
                "body too large"
            );
            return Ok(Response::status(413, "Payload Too Large"));
        }
        next.run(request)
    }
}

/// Rejects requests missing any header named in the arguments with `400`.
///
/// Empty arguments, as in `require_header:` or `require_header:x-a,,x-b`,
/// are skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequireHeader;

impl Pipe<Request, Response> for RequireHeader {
    fn handle(
        &self,
        request: Request,
        next: Next<'_, Request, Response>,
        args: &[String],
    ) -> Result<Response> {
        let missing = args
            .iter()
            .map(|a| a.trim())
            .filter(|a| !a.is_empty())
            .find(|a| !request.has_header(a));

        if let Some(missing) = missing {
            return Ok(Response::status(400, format!("Missing header: {}", missing)));
        }
        next.run(request)
    }
}

/// Stamps the request id on the response as `x-request-id`.
///
/// Runs after the rest of the chain, so it also stamps responses produced
/// by inner middleware that short-circuited.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestIdHeader;

impl Pipe<Request, Response> for RequestIdHeader {
    fn handle(
        &self,
        request: Request,
        next: Next<'_, Request, Response>,
        _args: &[String],
    ) -> Result<Response> {
        let request_id = request.request_id().to_string();
        let response = next.run(request)?;
        Ok(response.with_header("x-request-id", request_id))
    }
}
