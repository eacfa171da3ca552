pub mod auth;
pub mod config;
pub mod connections;
pub mod dashboard;
pub mod error;
pub mod kafka;
pub mod lag;
pub mod scheduler;
pub mod snapshot;

use std::sync::Arc;

use crate::auth::{AuthService, Authenticator, MemoryUserStore, NoopCipher, SessionStore};
use crate::config::{Config, MonitorConfig};
use crate::connections::ConnectionRegistry;
use crate::kafka::{rdkafka_factory, AdminFactory};
use crate::scheduler::{Scheduler, SchedulerConfig};
use crate::snapshot::builder::CollectorConfig;

// ========================================
// ENGINE (The Singleton)
// ========================================

/// The central brain of the monitor. Holds references to all components.
/// Cheap to clone (all fields are Arcs); used directly as the axum state.
#[derive(Clone)]
pub struct MonitorEngine {
    pub scheduler: Arc<Scheduler>,
    pub registry: Arc<ConnectionRegistry>,
    pub auth: Arc<AuthService>,
    pub sessions: Arc<SessionStore>,
    pub auth_enabled: bool,
    pub monitor: MonitorConfig,
    pub probe_group_prefix: String,
}

impl MonitorEngine {
    /// Production wiring: rdkafka-backed admin clients, no directory
    /// authenticator (the local fallback account still works).
    pub fn new(config: &Config) -> Self {
        Self::with_factory(config, rdkafka_factory(&config.kafka), None)
    }

    /// Wiring with an injected admin-client factory and optional directory
    /// authenticator. Tests script both.
    pub fn with_factory(
        config: &Config,
        factory: AdminFactory,
        directory: Option<Arc<dyn Authenticator>>,
    ) -> Self {
        let scheduler_config = SchedulerConfig {
            refresh_interval_ms: config.monitor.refresh_interval_ms,
            cycle_timeout_ms: config.monitor.cycle_timeout_ms,
            collector: CollectorConfig {
                system_topic_prefix: config.kafka.system_topic_prefix.clone(),
                probe_group_prefix: config.kafka.probe_group_prefix.clone(),
                topic_limit: config.monitor.topic_limit,
                group_limit: config.monitor.group_limit,
                uncommitted_policy: config.monitor.uncommitted_policy,
            },
        };
        let scheduler = Arc::new(Scheduler::new(
            factory.clone(),
            &config.kafka.brokers,
            scheduler_config,
        ));
        let registry = Arc::new(ConnectionRegistry::new(
            scheduler.clone(),
            factory,
            &config.kafka.brokers,
        ));
        let auth = Arc::new(AuthService::new(
            &config.server.admin_user,
            &config.server.admin_password,
            directory,
            Arc::new(MemoryUserStore::new()),
            &NoopCipher,
        ));
        Self {
            scheduler,
            registry,
            auth,
            sessions: Arc::new(SessionStore::new()),
            auth_enabled: config.server.auth_enabled,
            monitor: config.monitor.clone(),
            probe_group_prefix: config.kafka.probe_group_prefix.clone(),
        }
    }
}
