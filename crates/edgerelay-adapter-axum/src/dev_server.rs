use std::net::{SocketAddr, TcpListener as StdTcpListener};

use anyhow::Context;
use axum::Router;
use edgerelay_core::app::Hooks;
use edgerelay_core::manifest::ManifestLoader;
use edgerelay_core::proxy::ProxyHandle;
use edgerelay_core::router::RouterService;
use log::info;
use simple_logger::SimpleLogger;
use tokio::runtime::Builder as RuntimeBuilder;
use tokio::signal;

use crate::proxy::AxumProxyClient;
use crate::service::EdgeRelayAxumService;

#[derive(Clone, Debug)]
pub struct AxumDevServerConfig {
    pub addr: SocketAddr,
    pub enable_ctrl_c: bool,
}

impl Default for AxumDevServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8787)),
            enable_ctrl_c: true,
        }
    }
}

/// Blocking local server for an EdgeRelay router.
pub struct AxumDevServer {
    router: RouterService,
    config: AxumDevServerConfig,
}

impl AxumDevServer {
    pub fn new(router: RouterService) -> Self {
        Self::with_config(router, AxumDevServerConfig::default())
    }

    pub fn with_config(router: RouterService, config: AxumDevServerConfig) -> Self {
        Self { router, config }
    }

    pub fn run(self) -> anyhow::Result<()> {
        let runtime = RuntimeBuilder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to build tokio runtime")?;

        runtime.block_on(self.run_async())
    }

    async fn run_async(self) -> anyhow::Result<()> {
        // Bind synchronously so a busy port is reported before any task is spawned.
        let listener = StdTcpListener::bind(self.config.addr)
            .with_context(|| format!("failed to bind dev server to {}", self.config.addr))?;
        listener
            .set_nonblocking(true)
            .context("failed to set listener to non-blocking")?;
        let listener = tokio::net::TcpListener::from_std(listener)
            .context("failed to adopt std listener into tokio")?;

        self.serve(listener).await
    }

    async fn serve(self, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
        let AxumDevServer { router, config } = self;
        let client = AxumProxyClient::new().context("failed to build upstream client")?;
        let service = EdgeRelayAxumService::new(router, ProxyHandle::with_client(client));
        let app = Router::new().fallback_service(service).into_make_service();

        if let Ok(addr) = listener.local_addr() {
            info!("dev server listening on http://{}", addr);
        }

        let server = axum::serve(listener, app);
        if config.enable_ctrl_c {
            server
                .with_graceful_shutdown(async {
                    let _ = signal::ctrl_c().await;
                })
                .await
                .context("axum server error")
        } else {
            server.await.context("axum server error")
        }
    }
}

/// Load `edgerelay.toml`, install the stdout logger and serve `A` until Ctrl-C.
pub fn run_app<A: Hooks>(manifest_src: &str) -> anyhow::Result<()> {
    let loader = ManifestLoader::load_from_str(manifest_src).context("invalid edgerelay.toml")?;
    let manifest = loader.manifest();

    let level = manifest.logging_or_default("axum").level_filter();
    SimpleLogger::new().with_level(level).init().ok();

    let mut app = A::build_app();
    if let Some(name) = manifest.app_name() {
        app.set_name(name);
    }

    let config = AxumDevServerConfig {
        addr: manifest
            .dev_addr()
            .unwrap_or_else(|| AxumDevServerConfig::default().addr),
        ..AxumDevServerConfig::default()
    };
    info!("starting {}", app.name());
    for path in app.router().paths() {
        info!("route {} (any method)", path);
    }
    AxumDevServer::with_config(app.into_router(), config).run()
}
