use bytes::Bytes;
use edgerelay_core::context::RequestContext;
use edgerelay_core::error::EdgeError;
use edgerelay_core::http::{Response, StatusCode};
use edgerelay_core::proxy::ProxyResponse;
use edgerelay_core::response::{IntoResponse, Json};
use serde_json::Value;

use crate::envelope::Envelope;
use crate::error::RelayError;
use crate::upstream::{codes_param, prepare_upstream_request, upstream_uri};

/// Envelope plus the upstream status it is sent back with.
#[derive(Debug)]
pub struct Relayed {
    pub status: StatusCode,
    pub envelope: Envelope,
}

impl IntoResponse for Relayed {
    fn into_response(self) -> Response {
        (self.status, Json(self.envelope)).into_response()
    }
}

/// Forward the request upstream and wrap the JSON it returns.
pub async fn relay(ctx: RequestContext) -> Result<Relayed, RelayError> {
    let codes = codes_param(&ctx)?;
    let target = upstream_uri(codes.as_deref())?;
    let proxy = ctx.proxy_handle().ok_or(RelayError::MissingClient)?;

    let request = prepare_upstream_request(ctx.into_request(), target);
    let response = proxy.send(request).await.map_err(RelayError::Upstream)?;

    let status = response.status();
    let status_text = response.status_text().map(str::to_owned);
    let bytes = read_body(response).await?;
    let data: Value = serde_json::from_slice(&bytes)?;

    Ok(Relayed {
        status,
        envelope: Envelope::from_upstream(status, status_text.as_deref(), data),
    })
}

/// `/worker-data` for every method. Relay failures become a 500 envelope, never an `Err`.
pub async fn worker_data(ctx: RequestContext) -> Result<Response, EdgeError> {
    match relay(ctx).await {
        Ok(relayed) => Ok(relayed.into_response()),
        Err(err) => {
            log::error!("worker-data relay failed: {}", err);
            Ok((StatusCode::INTERNAL_SERVER_ERROR, Json(Envelope::failure(&err))).into_response())
        }
    }
}

// Proxy clients hand over decoded bytes; `Content-Encoding` may still name the upstream coding.
async fn read_body(response: ProxyResponse) -> Result<Bytes, RelayError> {
    response.into_body().collect().await.map_err(RelayError::Body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::App;
    use crate::upstream::UPSTREAM_BASE_URL;
    use async_trait::async_trait;
    use edgerelay_core::app::Hooks;
    use edgerelay_core::body::Body;
    use edgerelay_core::http::{header, request_builder, HeaderMap, HeaderValue, Method, Uri};
    use edgerelay_core::proxy::{ProxyClient, ProxyHandle, ProxyRequest};
    use futures::executor::block_on;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    struct Seen {
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
    }

    #[derive(Clone)]
    struct FakeUpstream {
        status: StatusCode,
        status_text: Option<&'static str>,
        headers: Vec<(&'static str, &'static str)>,
        body: Bytes,
        seen: Arc<Mutex<Vec<Seen>>>,
    }

    impl FakeUpstream {
        fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
            Self {
                status,
                status_text: None,
                headers: vec![("content-type", "application/json")],
                body: body.into(),
                seen: Arc::default(),
            }
        }

        fn status_text(mut self, text: &'static str) -> Self {
            self.status_text = Some(text);
            self
        }

        fn header(mut self, name: &'static str, value: &'static str) -> Self {
            self.headers.push((name, value));
            self
        }

        fn only_request(&self) -> Seen {
            let mut seen = self.seen.lock().unwrap();
            assert_eq!(seen.len(), 1, "expected exactly one upstream call");
            seen.remove(0)
        }
    }

    #[async_trait(?Send)]
    impl ProxyClient for FakeUpstream {
        async fn send(&self, request: ProxyRequest) -> Result<ProxyResponse, EdgeError> {
            let (method, uri, headers, body) = request.into_parts();
            let body = body.collect().await.map_err(EdgeError::internal)?;
            self.seen.lock().unwrap().push(Seen {
                method,
                uri,
                headers,
                body,
            });

            let mut response = ProxyResponse::new(self.status, Body::from(self.body.clone()));
            if let Some(text) = self.status_text {
                response = response.with_status_text(text);
            }
            for (name, value) in &self.headers {
                response
                    .headers_mut()
                    .append(*name, HeaderValue::from_static(*value));
            }
            Ok(response)
        }
    }

    struct UnreachableUpstream;

    #[async_trait(?Send)]
    impl ProxyClient for UnreachableUpstream {
        async fn send(&self, _request: ProxyRequest) -> Result<ProxyResponse, EdgeError> {
            Err(EdgeError::internal(anyhow::anyhow!(
                "getaddrinfo ENOTFOUND rustwasm-fullstack-app.sumitomo0210.workers.dev"
            )))
        }
    }

    fn request(method: Method, uri: &str, body: Body) -> edgerelay_core::http::Request {
        request_builder()
            .method(method)
            .uri(uri)
            .header("host", "pages.example")
            .header("x-custom", "kept")
            .body(body)
            .expect("request")
    }

    fn run(
        mut request: edgerelay_core::http::Request,
        client: impl ProxyClient + 'static,
    ) -> Response {
        request
            .extensions_mut()
            .insert(ProxyHandle::with_client(client));
        block_on(App::build_app().router().oneshot(request))
    }

    fn json_body(response: &Response) -> Value {
        serde_json::from_slice(response.body().as_bytes()).expect("json body")
    }

    fn content_type(response: &Response) -> Option<&str> {
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    #[test]
    fn success_reply_wraps_upstream_json() {
        let upstream = FakeUpstream::new(StatusCode::OK, r#"{"price":100}"#);
        let response = run(
            request(Method::GET, "/worker-data", Body::empty()),
            upstream.clone(),
        );

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(content_type(&response), Some("application/json"));
        assert_eq!(
            response.body().as_bytes(),
            r#"{"status":"success","data":{"price":100},"source":"existing-worker","message":"データ取得成功"}"#.as_bytes()
        );
        assert_eq!(upstream.only_request().uri.to_string(), UPSTREAM_BASE_URL);
    }

    #[test]
    fn codes_are_forwarded_encoded() {
        let upstream = FakeUpstream::new(StatusCode::OK, "[]");
        run(
            request(Method::GET, "/worker-data?codes=A,B&lang=ja", Body::empty()),
            upstream.clone(),
        );

        let seen = upstream.only_request();
        assert_eq!(
            seen.uri.to_string(),
            format!("{}?codes=A%2CB", UPSTREAM_BASE_URL)
        );
    }

    #[test]
    fn other_parameters_alone_leave_base_url_bare() {
        let upstream = FakeUpstream::new(StatusCode::OK, "{}");
        run(
            request(Method::GET, "/worker-data?lang=ja", Body::empty()),
            upstream.clone(),
        );
        assert_eq!(upstream.only_request().uri.query(), None);
    }

    #[test]
    fn host_is_removed_and_other_headers_kept() {
        let upstream = FakeUpstream::new(StatusCode::OK, "{}");
        run(
            request(Method::GET, "/worker-data", Body::empty()),
            upstream.clone(),
        );

        let seen = upstream.only_request();
        assert!(seen.headers.get(header::HOST).is_none());
        assert_eq!(seen.headers["x-custom"], "kept");
    }

    #[test]
    fn get_never_forwards_a_body() {
        let upstream = FakeUpstream::new(StatusCode::OK, "{}");
        run(
            request(Method::GET, "/worker-data", Body::from("stray")),
            upstream.clone(),
        );

        let seen = upstream.only_request();
        assert_eq!(seen.method, Method::GET);
        assert!(seen.body.is_empty());
    }

    #[test]
    fn non_get_methods_forward_body_unchanged() {
        for method in [Method::POST, Method::PUT, Method::PATCH, Method::DELETE] {
            let upstream = FakeUpstream::new(StatusCode::OK, "{}");
            let body = Body::stream(futures::stream::iter(vec![
                Bytes::from_static(br#"{"codes":"#),
                Bytes::from_static(br#"["6758.T"]}"#),
            ]));
            run(request(method.clone(), "/worker-data", body), upstream.clone());

            let seen = upstream.only_request();
            assert_eq!(seen.method, method);
            assert_eq!(seen.body.as_ref(), br#"{"codes":["6758.T"]}"#);
        }
    }

    #[test]
    fn upstream_error_status_is_mirrored() {
        let upstream = FakeUpstream::new(StatusCode::NOT_FOUND, r#"{"error":"unknown code"}"#)
            .status_text("Not Found");
        let response = run(
            request(Method::GET, "/worker-data?codes=XXXX", Body::empty()),
            upstream,
        );

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(content_type(&response), Some("application/json"));
        let body = json_body(&response);
        assert_eq!(body["status"], "error");
        assert_eq!(body["source"], "existing-worker");
        assert_eq!(body["data"], json!({ "error": "unknown code" }));
        assert!(body["message"].as_str().unwrap().contains("Not Found"));
    }

    #[test]
    fn empty_status_text_uses_placeholder() {
        let upstream = FakeUpstream::new(StatusCode::BAD_GATEWAY, "{}").status_text("");
        let response = run(request(Method::GET, "/worker-data", Body::empty()), upstream);

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(json_body(&response)["message"], "既存Workerからのエラー: 不明なエラー");
    }

    #[test]
    fn network_failure_becomes_500_envelope() {
        for method in [Method::GET, Method::POST] {
            let response = run(
                request(method, "/worker-data?codes=A", Body::from("x")),
                UnreachableUpstream,
            );

            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(content_type(&response), Some("application/json"));
            let body = json_body(&response);
            assert_eq!(body["status"], "error");
            let message = body["message"].as_str().unwrap();
            assert!(message.starts_with("Pages Function内部エラー: "));
            assert!(message.contains("getaddrinfo ENOTFOUND"));
            assert!(body.get("data").is_none());
            assert!(body.get("source").is_none());
        }
    }

    #[test]
    fn non_json_upstream_body_becomes_500() {
        let upstream = FakeUpstream::new(StatusCode::OK, "<html>maintenance</html>")
            .header("content-type", "text/html");
        let response = run(request(Method::GET, "/worker-data", Body::empty()), upstream);

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(&response);
        assert_eq!(body["status"], "error");
        assert!(body["message"].as_str().unwrap().contains("not valid JSON"));
    }

    #[test]
    fn stale_content_encoding_does_not_trigger_decoding() {
        let upstream = FakeUpstream::new(StatusCode::OK, r#"{"price":100}"#)
            .header("content-encoding", "gzip");
        let response = run(
            request(Method::GET, "/worker-data", Body::empty()),
            upstream,
        );

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(&response)["data"], json!({ "price": 100 }));
    }

    #[test]
    fn missing_client_becomes_500() {
        let request = request(Method::GET, "/worker-data", Body::empty());
        let response = block_on(App::build_app().router().oneshot(request));

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(&response)["message"],
            "Pages Function内部エラー: no HTTP client is available for this request"
        );
    }

    #[test]
    fn other_paths_are_not_routed() {
        let upstream = FakeUpstream::new(StatusCode::OK, "{}");
        let response = run(request(Method::GET, "/elsewhere", Body::empty()), upstream.clone());

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(upstream.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn relay_reports_typed_errors() {
        let mut request = request(Method::GET, "/worker-data", Body::empty());
        request
            .extensions_mut()
            .insert(ProxyHandle::with_client(UnreachableUpstream));
        let err = block_on(relay(RequestContext::new(request))).expect_err("error");
        assert!(matches!(err, RelayError::Upstream(_)));
    }
}
