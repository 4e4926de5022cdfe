use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub log_filter: String,
    pub instance_id: String,
    pub store_backend: StoreBackend,
    pub redis_url: Option<String>,
    pub zone_config_path: PathBuf,
    pub worker_command: String,
    pub worker_script: String,
    pub log_capacity: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let bind_addr: SocketAddr = std::env::var("FLOORWATCH_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3001".into())
            .parse()
            .expect("valid addr");
        let log_filter =
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,floorwatch_server=debug".into());
        let instance_id =
            std::env::var("FLOORWATCH_INSTANCE_ID").unwrap_or_else(|_| "floorwatch-1".into());
        let store_backend = StoreBackend::from_env();
        let redis_url = std::env::var("REDIS_URL").ok();
        let zone_config_path: PathBuf = std::env::var("FLOORWATCH_CONFIG_PATH")
            .unwrap_or_else(|_| "config.json".into())
            .into();
        let worker_command =
            std::env::var("FLOORWATCH_WORKER_CMD").unwrap_or_else(|_| "python3".into());
        let worker_script =
            std::env::var("FLOORWATCH_WORKER_SCRIPT").unwrap_or_else(|_| "ai/main.py".into());
        let log_capacity = std::env::var("FLOORWATCH_LOG_CAPACITY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(100);
        Self {
            bind_addr,
            log_filter,
            instance_id,
            store_backend,
            redis_url,
            zone_config_path,
            worker_command,
            worker_script,
            log_capacity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    InMemory,
    Redis,
}

impl StoreBackend {
    fn from_env() -> Self {
        match std::env::var("FLOORWATCH_STORE_BACKEND")
            .unwrap_or_else(|_| "memory".into())
            .as_str()
        {
            "redis" => StoreBackend::Redis,
            _ => StoreBackend::InMemory,
        }
    }
}
