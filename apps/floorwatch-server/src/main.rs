use std::sync::Arc;

use axum::Router;
use floorwatch_server::config::AppConfig;
use floorwatch_server::ledger::SessionLedger;
use floorwatch_server::metrics;
use floorwatch_server::routes;
use floorwatch_server::state::AppState;
use floorwatch_server::store_redis;
use floorwatch_server::supervisor::{WorkerCommand, WorkerSupervisor};
use floorwatch_server::telemetry::init_tracing;
use floorwatch_server::zones::ZoneConfigStore;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

#[tokio::main]
async fn main() {
    let cfg = AppConfig::from_env();
    init_tracing(&cfg.log_filter);

    let store = store_redis::build_session_store(&cfg);
    let ledger = SessionLedger::new(store);
    let zones = Arc::new(ZoneConfigStore::new(cfg.zone_config_path.clone()));
    let supervisor = WorkerSupervisor::new(
        WorkerCommand {
            program: cfg.worker_command.clone(),
            args: vec![cfg.worker_script.clone()],
        },
        cfg.log_capacity,
    );
    let app_state = AppState::new(cfg.instance_id.clone(), zones, supervisor, ledger);

    let app: Router = routes::router(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    info!(
        addr = %cfg.bind_addr,
        instance = %cfg.instance_id,
        store = ?cfg.store_backend,
        redis = %cfg.redis_url.as_deref().unwrap_or("unset"),
        zone_config = %cfg.zone_config_path.display(),
        worker = %cfg.worker_command,
        log_capacity = cfg.log_capacity,
        "starting floorwatch-server"
    );
    metrics::BOOT_COUNTER.inc();
    let listener = tokio::net::TcpListener::bind(cfg.bind_addr)
        .await
        .expect("bind");
    axum::serve(listener, app.into_make_service())
        .await
        .expect("server");
}
