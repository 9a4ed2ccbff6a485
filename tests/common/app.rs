use std::sync::Arc;

use axum::Router;
use tempfile::TempDir;
use tokio::sync::broadcast;

use techquest_backend::config::{Config, RateLimitConfig, WorkerConfig};
use techquest_backend::routes::build_router;
use techquest_backend::state::AppState;
use techquest_backend::store::Store;

pub const TEST_SERVICE_KEY: &str = "integration-test-service-key";

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub config: Config,
    pub shutdown_tx: broadcast::Sender<()>,
    _temp_dir: TempDir,
}

async fn spawn_with(api_limit: u64, service_key: &str, max_sse: usize) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let sled_path = temp_dir.path().join("techquest-test.sled");

    // built directly; set_var would race across parallel tests
    let config = Config {
        host: std::net::IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
        port: 3000,
        log_level: "info".to_string(),
        enable_file_logs: false,
        log_dir: "./logs".to_string(),
        sled_path: sled_path.to_string_lossy().to_string(),
        jwt_secret: format!("integration-test-jwt-secret-{}", uuid::Uuid::new_v4()),
        service_api_key: service_key.to_string(),
        cors_origin: "http://localhost:5173".to_string(),
        trust_proxy: false,
        rate_limit: RateLimitConfig {
            window_secs: 60,
            max_requests: api_limit,
        },
        worker: WorkerConfig { is_leader: false },
        catalog_cache_ttl_secs: 600,
        max_sse_connections: max_sse,
    };

    let store = Arc::new(Store::open(&config.sled_path).expect("open store"));
    store.run_migrations().expect("run migrations");

    let (shutdown_tx, _) = broadcast::channel::<()>(8);
    let state = AppState::new(store, &config, shutdown_tx.clone());
    let app = build_router(state.clone());

    TestApp {
        app,
        state,
        config,
        shutdown_tx,
        _temp_dir: temp_dir,
    }
}

pub async fn spawn_test_app() -> TestApp {
    spawn_with(1_000, TEST_SERVICE_KEY, 8).await
}

pub async fn spawn_test_app_with_rate_limit(api_limit: u64) -> TestApp {
    spawn_with(api_limit, TEST_SERVICE_KEY, 8).await
}

pub async fn spawn_test_app_without_service_key() -> TestApp {
    spawn_with(1_000, "", 8).await
}

pub async fn spawn_test_app_with_sse_limit(max_sse: usize) -> TestApp {
    spawn_with(1_000, TEST_SERVICE_KEY, max_sse).await
}
