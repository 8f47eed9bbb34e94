use std::sync::Arc;

use matchit::Router as PathRouter;
use tower_service::Service;

use crate::context::RequestContext;
use crate::error::EdgeError;
use crate::handler::{BoxHandler, IntoHandler};
use crate::http::{HandlerFuture, Request, Response};
use crate::middleware::{BoxMiddleware, Middleware, Next};
use crate::response::IntoResponse;

#[derive(Default)]
pub struct RouterBuilder {
    routes: PathRouter<BoxHandler>,
    paths: Vec<String>,
    middlewares: Vec<BoxMiddleware>,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler that answers every method on `path`.
    pub fn any<H>(mut self, path: &str, handler: H) -> Self
    where
        H: IntoHandler,
    {
        // Routes are declared in code at startup, so a conflicting declaration is a programming
        // error.
        self.routes
            .insert(path, handler.into_handler())
            .unwrap_or_else(|err| panic!("duplicate route definition for {}: {}", path, err));
        self.paths.push(path.to_string());
        self
    }

    pub fn middleware<M>(mut self, middleware: M) -> Self
    where
        M: Middleware,
    {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    pub fn build(self) -> RouterService {
        RouterService {
            inner: Arc::new(RouterInner {
                routes: self.routes,
                paths: self.paths,
                middlewares: self.middlewares,
            }),
        }
    }
}

#[derive(Clone)]
pub struct RouterService {
    inner: Arc<RouterInner>,
}

impl RouterService {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Registered paths in declaration order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.inner.paths.iter().map(String::as_str)
    }

    /// Dispatch a request and render any routing or handler error as a response.
    pub async fn oneshot(&self, request: Request) -> Response {
        match self.inner.dispatch(request).await {
            Ok(response) => response,
            Err(err) => err.into_response(),
        }
    }
}

struct RouterInner {
    routes: PathRouter<BoxHandler>,
    paths: Vec<String>,
    middlewares: Vec<BoxMiddleware>,
}

impl RouterInner {
    async fn dispatch(&self, request: Request) -> Result<Response, EdgeError> {
        let handler = match self.routes.at(request.uri().path()) {
            Ok(matched) => matched.value,
            Err(_) => return Err(EdgeError::not_found(request.uri().path())),
        };
        let ctx = RequestContext::new(request);
        Next::new(&self.middlewares, handler.as_ref()).run(ctx).await
    }
}

impl Service<Request> for RouterService {
    type Response = Response;
    type Error = EdgeError;
    type Future = HandlerFuture;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move { inner.dispatch(request).await })
    }
}
