#![cfg_attr(target_arch = "wasm32", no_main)]

#[cfg(target_arch = "wasm32")]
use worker::*;
#[cfg(target_arch = "wasm32")]
use worker_data_core::App;

#[cfg(target_arch = "wasm32")]
#[event(fetch)]
pub async fn main(req: Request, _env: Env, _ctx: Context) -> Result<Response> {
    edgerelay_adapter_cloudflare::run_app::<App>(include_str!("../../../edgerelay.toml"), req).await
}
