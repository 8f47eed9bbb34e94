//! Cloudflare Workers adapter for EdgeRelay applications.

#[cfg(all(feature = "cloudflare", target_arch = "wasm32"))]
mod logger;
#[cfg(all(feature = "cloudflare", target_arch = "wasm32"))]
mod proxy;
#[cfg(all(feature = "cloudflare", target_arch = "wasm32"))]
mod request;
#[cfg(all(feature = "cloudflare", target_arch = "wasm32"))]
mod response;

#[cfg(all(feature = "cloudflare", target_arch = "wasm32"))]
pub use logger::init_logger;
#[cfg(all(feature = "cloudflare", target_arch = "wasm32"))]
pub use proxy::CloudflareProxyClient;
#[cfg(all(feature = "cloudflare", target_arch = "wasm32"))]
pub use request::{dispatch, into_core_request};
#[cfg(all(feature = "cloudflare", target_arch = "wasm32"))]
pub use response::from_core_response;

/// Builds the app described by `A` and serves one Worker request with it.
///
/// `manifest_src` is the embedded `edgerelay.toml`; its `[logging.cloudflare]` table sets the
/// console log level.
///
/// ```rust,ignore
/// #[event(fetch)]
/// pub async fn main(req: Request, _env: Env, _ctx: Context) -> Result<Response> {
///     run_app::<App>(include_str!("../../../edgerelay.toml"), req).await
/// }
/// ```
#[cfg(all(feature = "cloudflare", target_arch = "wasm32"))]
pub async fn run_app<A: edgerelay_core::app::Hooks>(
    manifest_src: &str,
    req: worker::Request,
) -> Result<worker::Response, worker::Error> {
    let loader = edgerelay_core::manifest::ManifestLoader::load_from_str(manifest_src)
        .map_err(|err| worker::Error::RustError(err.to_string()))?;
    let manifest = loader.manifest();
    init_logger(manifest.logging_or_default("cloudflare").level_filter());

    let mut app = A::build_app();
    if let Some(name) = manifest.app_name() {
        app.set_name(name);
    }
    dispatch(&app, req).await
}
