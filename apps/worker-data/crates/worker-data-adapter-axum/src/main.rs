use worker_data_core::App;

fn main() {
    if let Err(err) = edgerelay_adapter_axum::run_app::<App>(include_str!("../../../edgerelay.toml")) {
        eprintln!("worker-data-adapter-axum failed: {err:#}");
        std::process::exit(1);
    }
}
