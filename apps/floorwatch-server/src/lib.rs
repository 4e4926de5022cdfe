pub mod config;
pub mod ledger;
pub mod log_buffer;
pub mod metrics;
pub mod routes;
pub mod state;
pub mod store_redis;
pub mod supervisor;
pub mod telemetry;
pub mod zones;
