use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Body as AxumBody;
use axum::http::{Request, Response};
use edgerelay_core::response::IntoResponse;
use edgerelay_core::proxy::ProxyHandle;
use edgerelay_core::router::RouterService;
use tokio::{runtime::Handle, task};
use tower::Service;

use crate::request::into_core_request;
use crate::response::into_axum_response;

/// Tower service that runs an EdgeRelay router behind axum.
///
/// Core futures are not `Send`, so each request is driven to completion with `block_in_place`
/// on the current runtime. This requires the multi-threaded runtime.
#[derive(Clone)]
pub struct EdgeRelayAxumService {
    router: RouterService,
    proxy: ProxyHandle,
}

impl EdgeRelayAxumService {
    pub fn new(router: RouterService, proxy: ProxyHandle) -> Self {
        Self { router, proxy }
    }
}

impl Service<Request<AxumBody>> for EdgeRelayAxumService {
    type Response = Response<AxumBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<AxumBody>) -> Self::Future {
        let router = self.router.clone();
        let proxy = self.proxy.clone();
        Box::pin(async move {
            let response = task::block_in_place(move || {
                Handle::current().block_on(async move {
                    let core_response = match into_core_request(request, proxy).await {
                        Ok(core_request) => router.oneshot(core_request).await,
                        Err(err) => err.into_response(),
                    };
                    into_axum_response(core_response).await
                })
            });
            Ok(response)
        })
    }
}
