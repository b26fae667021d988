//! The HTTP kernel: request middleware in front of a request handler.

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::pipeline::Pipeline;
use crate::registry::StageRegistry;
use crate::stage::{Pipe, Stage};

use super::middleware::{Authenticate, BodyLimit, RequestIdHeader, RequireHeader};
use super::{Request, Response};

type RequestHandler = dyn Fn(Request) -> Result<Response> + Send + Sync;

/// Sends every request through the global middleware and into the handler.
///
/// The built-in middleware are registered as `auth`, `body_limit`,
/// `require_header` and `request_id`.
///
/// # Examples
///
/// ```
/// use pipeline_bus::http::{Kernel, Principal, Request, Response};
///
/// let kernel = Kernel::builder(|req: Request| Ok(Response::ok(format!("hello {}", req.path()))))
///     .middleware("request_id")
///     .middleware("auth")
///     .middleware("body_limit:64")
///     .build()
///     .expect("valid middleware specifiers");
///
/// let mut request = Request::new("req-7".to_string(), "GET", "/home");
/// request.set_principal(Some(Principal { id: "u1".to_string(), name: "Alice".to_string() }));
///
/// let response = kernel.handle(request).unwrap();
/// assert_eq!(response.body(), "hello /home");
/// assert_eq!(response.header("x-request-id"), Some("req-7"));
/// ```
pub struct Kernel {
    pipeline: Pipeline<Request, Response>,
    handler: Arc<RequestHandler>,
}

impl Kernel {
    /// Starts configuring a kernel around `handler`.
    pub fn builder<H>(handler: H) -> KernelBuilder
    where
        H: Fn(Request) -> Result<Response> + Send + Sync + 'static,
    {
        KernelBuilder {
            registry: StageRegistry::new()
                .singleton("auth", Authenticate)
                .singleton("body_limit", BodyLimit)
                .singleton("require_header", RequireHeader)
                .singleton("request_id", RequestIdHeader),
            specs: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    /// Returns the configured middleware in order.
    pub fn middleware(&self) -> &[Stage<Request, Response>] {
        self.pipeline.stages()
    }

    /// Handles one request.
    ///
    /// # Errors
    ///
    /// Returns `Error::Resolution` if a configured middleware name is not
    /// registered, and any error a middleware or the handler returns.
    pub fn handle(&self, request: Request) -> Result<Response> {
        let request_id = request.request_id().to_string();
        let method = request.method().to_string();
        let path = request.path().to_string();

        let result = self
            .pipeline
            .dispatch(request, |request| (self.handler)(request));

        match &result {
            Ok(response) => tracing::info!(
                request_id = %request_id,
                method = %method,
                path = %path,
                status = response.status_code(),
                "request handled"
            ),
            Err(e) => tracing::warn!(
                request_id = %request_id,
                method = %method,
                path = %path,
                error = %e,
                "request failed"
            ),
        }

        result
    }
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kernel")
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

enum MiddlewareSpec {
    Text(String),
    Stage(Stage<Request, Response>),
}

/// Builder for [`Kernel`].
///
/// Specifiers are parsed in [`build`](Self::build); names are resolved only
/// when a request reaches them.
pub struct KernelBuilder {
    registry: StageRegistry<Request, Response>,
    specs: Vec<MiddlewareSpec>,
    handler: Arc<RequestHandler>,
}

impl KernelBuilder {
    /// Appends a middleware by specifier, e.g. `"body_limit:1024"`.
    pub fn middleware(mut self, spec: impl Into<String>) -> Self {
        self.specs.push(MiddlewareSpec::Text(spec.into()));
        self
    }

    /// Appends an already-built stage, such as an inline middleware.
    pub fn stage(mut self, stage: Stage<Request, Response>) -> Self {
        self.specs.push(MiddlewareSpec::Stage(stage));
        self
    }

    /// Registers a custom middleware under `name`, replacing any built-in
    /// of the same name.
    pub fn register<T>(mut self, name: impl Into<String>, middleware: T) -> Self
    where
        T: Pipe<Request, Response> + 'static,
    {
        self.registry = self.registry.singleton(name, middleware);
        self
    }

    /// Parses the specifiers and builds the kernel.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidSpecifier` for a specifier with an empty name.
    pub fn build(self) -> Result<Kernel> {
        let stages = self
            .specs
            .into_iter()
            .map(|spec| match spec {
                MiddlewareSpec::Text(text) => Stage::parse(&text),
                MiddlewareSpec::Stage(stage) => Ok(stage),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Kernel {
            pipeline: Pipeline::new(Arc::new(self.registry)).through(stages),
            handler: self.handler,
        })
    }
}
