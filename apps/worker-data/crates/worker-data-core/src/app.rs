use edgerelay_core::app::Hooks;
use edgerelay_core::middleware::RequestLogger;
use edgerelay_core::router::RouterService;

use crate::handlers::worker_data;

pub const ROUTE: &str = "/worker-data";

pub struct App;

impl Hooks for App {
    fn routes() -> RouterService {
        RouterService::builder()
            .middleware(RequestLogger)
            .any(ROUTE, worker_data)
            .build()
    }

    fn name() -> &'static str {
        "worker-data"
    }
}
