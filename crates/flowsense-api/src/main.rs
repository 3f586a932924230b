use std::net::SocketAddr;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    // Observability
    flowsense_obs::init("flowsense-api");

    // Config
    let cfg = flowsense_config::AppConfig::load().unwrap_or_default();
    let http_bind = cfg.http_bind();
    let udp_bind = cfg.udp_bind();
    let sink_dir = cfg.sink_dir();

    // Build app and state
    let (app, state) = flowsense_api::build_app(cfg.alert_thresholds(), cfg.calibration());

    // Start UDP device ingest in background
    let udp_addr: SocketAddr = udp_bind.parse().expect("Invalid UDP bind address");
    match flowsense_api::start_device_ingest(state.clone(), udp_addr, sink_dir).await {
        Ok((local, _handle)) => tracing::info!(%local, "device UDP ingest listening"),
        Err(e) => tracing::error!(error=?e, "failed to start UDP ingest"),
    }

    // Start HTTP server
    let addr: SocketAddr = http_bind.parse().expect("Invalid HTTP bind address");
    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind TCP listener");

    // Mark ready just before serving
    flowsense_api::set_ready(&state, true);

    tracing::info!(%addr, "HTTP server listening");
    axum::serve(listener, app).await.expect("server error");
}
