use async_trait::async_trait;
use edgerelay_core::body::Body;
use edgerelay_core::error::EdgeError;
use edgerelay_core::http::{header, HeaderName, HeaderValue, Method, StatusCode};
use edgerelay_core::proxy::{ProxyClient, ProxyRequest, ProxyResponse};
use futures_util::stream::{self, StreamExt, TryStreamExt};
use worker::wasm_bindgen::{JsCast, JsValue};
use worker::wasm_bindgen_futures::JsFuture;
use worker::{
    js_sys, web_sys, Body as WorkerBody, Headers, Method as CfMethod, Request as CfRequest,
    RequestInit, Response as CfResponse,
};

/// Sends proxy requests with the Workers `fetch` API.
pub struct CloudflareProxyClient;

#[async_trait(?Send)]
impl ProxyClient for CloudflareProxyClient {
    async fn send(&self, request: ProxyRequest) -> Result<ProxyResponse, EdgeError> {
        let cf_request = build_cf_request(request)?;
        let raw = fetch_raw(&cf_request).await?;
        convert_response(raw)
    }
}

// `worker::Fetch` rebuilds its `Response` from status and headers only, which drops `statusText`.
async fn fetch_raw(request: &CfRequest) -> Result<web_sys::Response, EdgeError> {
    let scope: web_sys::WorkerGlobalScope = js_sys::global().unchecked_into();
    let promise = scope.fetch_with_request(request.inner());
    let value = JsFuture::from(promise)
        .await
        .map_err(|err| EdgeError::internal(worker::Error::from(err)))?;
    value
        .dyn_into::<web_sys::Response>()
        .map_err(|err| EdgeError::internal(worker::Error::from(err)))
}

fn build_cf_request(request: ProxyRequest) -> Result<CfRequest, EdgeError> {
    let (method, uri, headers, body) = request.into_parts();

    let mut init = RequestInit::new();
    init.with_method(into_cf_method(&method));
    init.with_headers(Headers::from(&headers));
    attach_body(&mut init, body)?;

    CfRequest::new_with_init(&uri.to_string(), &init).map_err(EdgeError::internal)
}

fn attach_body(init: &mut RequestInit, body: Body) -> Result<(), EdgeError> {
    if body.is_absent() {
        return Ok(());
    }
    let chunks = match body {
        Body::Once(bytes) => {
            let chunk = bytes.to_vec();
            stream::once(async move { Ok::<Vec<u8>, JsValue>(chunk) }).boxed_local()
        }
        Body::Stream(stream) => stream
            .map(|chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(|err| JsValue::from_str(&err.to_string()))
            })
            .boxed_local(),
    };
    let worker_body = WorkerBody::from_stream(chunks).map_err(EdgeError::internal)?;
    if let Some(readable) = worker_body.into_inner() {
        init.with_body(Some(JsValue::from(readable)));
    }
    Ok(())
}

/// `fetch` has already decoded gzip/br payloads, so the stale coding headers are dropped and the
/// body is streamed as-is.
fn convert_response(raw: web_sys::Response) -> Result<ProxyResponse, EdgeError> {
    let status_text = raw.status_text();
    let has_body = raw.body().is_some();
    let mut cf_response = CfResponse::from(raw);
    let status = StatusCode::from_u16(cf_response.status_code()).map_err(EdgeError::internal)?;

    let body = if has_body {
        let chunks = cf_response.stream().map_err(EdgeError::internal)?;
        Body::from_stream(chunks.map_ok(bytes::Bytes::from).map_err(EdgeError::internal))
    } else {
        Body::empty()
    };
    let mut proxy_response = ProxyResponse::new(status, body).with_status_text(status_text);

    for (name, value) in cf_response.headers().entries() {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            proxy_response.headers_mut().append(name, value);
        }
    }
    let headers = proxy_response.headers_mut();
    headers.remove(header::CONTENT_ENCODING);
    headers.remove(header::CONTENT_LENGTH);

    Ok(proxy_response)
}

fn into_cf_method(method: &Method) -> CfMethod {
    match *method {
        Method::GET => CfMethod::Get,
        Method::POST => CfMethod::Post,
        Method::PUT => CfMethod::Put,
        Method::PATCH => CfMethod::Patch,
        Method::DELETE => CfMethod::Delete,
        Method::HEAD => CfMethod::Head,
        Method::OPTIONS => CfMethod::Options,
        Method::CONNECT => CfMethod::Connect,
        Method::TRACE => CfMethod::Trace,
        _ => CfMethod::from(method.as_str().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::wasm_bindgen_test;

    #[wasm_bindgen_test]
    fn maps_standard_methods() {
        assert_eq!(into_cf_method(&Method::GET), CfMethod::Get);
        assert_eq!(into_cf_method(&Method::PATCH), CfMethod::Patch);
        assert_eq!(into_cf_method(&Method::OPTIONS), CfMethod::Options);
    }

    #[wasm_bindgen_test]
    fn passes_extension_methods_through() {
        let method = Method::from_bytes(b"PURGE").unwrap();
        assert_eq!(into_cf_method(&method).as_ref(), "PURGE");
    }

    fn fetched(status: u16, status_text: &str, body: &str) -> web_sys::Response {
        let headers = web_sys::Headers::new().unwrap();
        headers.set("content-type", "application/json").unwrap();
        headers.set("content-encoding", "gzip").unwrap();
        let init = web_sys::ResponseInit::new();
        init.set_status(status);
        init.set_status_text(status_text);
        init.set_headers_headers(&headers);
        web_sys::Response::new_with_opt_str_and_init(Some(body), &init).unwrap()
    }

    #[wasm_bindgen_test]
    async fn already_decoded_body_is_not_decoded_again() {
        let response = convert_response(fetched(200, "OK", r#"{"price":100}"#)).unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::CONTENT_ENCODING).is_none());
        assert_eq!(response.headers()["content-type"], "application/json");
        let body = response.into_body().collect().await.unwrap();
        assert_eq!(body.as_ref(), br#"{"price":100}"#);
    }

    #[wasm_bindgen_test]
    fn keeps_the_upstream_status_text() {
        let custom = convert_response(fetched(404, "No Such Code", "{}")).unwrap();
        assert_eq!(custom.status(), StatusCode::NOT_FOUND);
        assert_eq!(custom.status_text(), Some("No Such Code"));

        let blank = convert_response(fetched(404, "", "{}")).unwrap();
        assert_eq!(blank.status_text(), None);
    }

    #[wasm_bindgen_test]
    fn bodyless_response_has_empty_body() {
        let init = web_sys::ResponseInit::new();
        init.set_status(204);
        let raw = web_sys::Response::new_with_opt_str_and_init(None, &init).unwrap();

        let response = convert_response(raw).unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.body().is_absent());
    }
}
