use std::io;

use edgerelay_core::app::App;
use edgerelay_core::body::Body;
use edgerelay_core::error::EdgeError;
use edgerelay_core::http::{request_builder, Method as CoreMethod, Request, Uri};
use edgerelay_core::proxy::ProxyHandle;
use futures_util::TryStreamExt;
use worker::{Error as WorkerError, Method, Request as CfRequest, Response as CfResponse};

use crate::proxy::CloudflareProxyClient;
use crate::response::from_core_response;

/// Convert a Worker request into a core request. The body stays a stream so large uploads are
/// relayed without buffering.
pub async fn into_core_request(mut req: CfRequest) -> Result<Request, EdgeError> {
    let method = into_core_method(req.method())?;
    let url = req
        .url()
        .map_err(|err| EdgeError::bad_request(format!("invalid URL: {}", err)))?;
    let uri: Uri = url
        .as_str()
        .parse()
        .map_err(|err| EdgeError::bad_request(format!("invalid URI: {}", err)))?;

    let mut builder = request_builder().method(method).uri(uri);
    for (name, value) in req.headers().entries() {
        builder = builder.header(name.as_str(), value);
    }

    let body = if req.inner().body().is_some() {
        let stream = req
            .stream()
            .map_err(EdgeError::internal)?
            .map_err(|err| io::Error::other(err.to_string()));
        Body::from_stream(stream.map_ok(bytes::Bytes::from))
    } else {
        Body::empty()
    };

    let mut request = builder.body(body).map_err(EdgeError::internal)?;
    request
        .extensions_mut()
        .insert(ProxyHandle::with_client(CloudflareProxyClient));
    Ok(request)
}

pub async fn dispatch(app: &App, req: CfRequest) -> Result<CfResponse, WorkerError> {
    let core_request = into_core_request(req).await.map_err(edge_error_to_worker)?;
    let response = app.router().oneshot(core_request).await;
    from_core_response(response).map_err(edge_error_to_worker)
}

fn edge_error_to_worker(err: EdgeError) -> WorkerError {
    WorkerError::RustError(err.to_string())
}

fn into_core_method(method: Method) -> Result<CoreMethod, EdgeError> {
    CoreMethod::from_bytes(method.as_ref().as_bytes())
        .map_err(|_| EdgeError::bad_request(format!("unsupported method: {}", method.as_ref())))
}
