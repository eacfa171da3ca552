use std::env;
use std::sync::OnceLock;

use crate::lag::UncommittedPolicy;

static CONFIG: OnceLock<Config> = OnceLock::new();

// --- CONFIG AGGREGATOR ---

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub kafka: KafkaConfig,
    pub monitor: MonitorConfig,
}

impl Config {
    pub fn global() -> &'static Config {
        CONFIG.get_or_init(Self::load)
    }

    fn load() -> Self {
        dotenv::dotenv().ok();
        Self {
            server: ServerConfig::load(),
            kafka: KafkaConfig::load(),
            monitor: MonitorConfig::load(),
        }
    }
}

// --- MODULES ---

// SERVER
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
    pub log_level: String,
    pub auth_enabled: bool,
    pub admin_user: String,
    pub admin_password: String,
}

impl ServerConfig {
    fn load() -> Self {
        Self {
            host:           get_env("SERVER_HOST", "127.0.0.1"),
            port:           get_env("SERVER_PORT", "4000"),
            cors_origin:    get_env("FRONTEND_URL", "http://localhost:3000"),
            log_level:      get_env("LAGVIEW_LOG", "info"),
            auth_enabled:   get_env("AUTH_ENABLED", "true"),
            admin_user:     get_env("ADMIN_USER", "admin"),
            admin_password: get_env("ADMIN_PASSWORD", "admin"),
        }
    }
}

// KAFKA CLIENT
#[derive(Debug, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub system_topic_prefix: String,
    pub probe_group_prefix: String,
}

impl KafkaConfig {
    fn load() -> Self {
        Self {
            brokers:             get_env("KAFKA_BROKERS", "localhost:9092"),
            connect_timeout_ms:  get_env("KAFKA_CONNECT_TIMEOUT_MS", "5000"),
            request_timeout_ms:  get_env("KAFKA_REQUEST_TIMEOUT_MS", "5000"),
            system_topic_prefix: get_env("SYSTEM_TOPIC_PREFIX", "__"),
            probe_group_prefix:  get_env("PROBE_GROUP_PREFIX", "lagview-viewer-"),
        }
    }
}

// COLLECTION CYCLE
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub refresh_interval_ms: u64,
    pub cycle_timeout_ms: u64,
    pub topic_limit: usize,
    pub group_limit: usize,
    pub detail_group_limit: usize,
    pub uncommitted_policy: UncommittedPolicy,
}

impl MonitorConfig {
    fn load() -> Self {
        Self {
            refresh_interval_ms: get_env("MONITOR_REFRESH_MS", "30000"),
            cycle_timeout_ms:    get_env("MONITOR_CYCLE_TIMEOUT_MS", "60000"),
            topic_limit:         get_env("MONITOR_TOPIC_LIMIT", "20"),
            group_limit:         get_env("MONITOR_GROUP_LIMIT", "10"),
            detail_group_limit:  get_env("MONITOR_DETAIL_GROUP_LIMIT", "5"),
            uncommitted_policy:  get_env("LAG_UNCOMMITTED_POLICY", "zero-lag"),
        }
    }
}

// --- PRIVATE HELPER ---

fn get_env<T: std::str::FromStr>(key: &str, default: &str) -> T {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| format!("Config error: {} must be valid", key))
        .unwrap()
}
