//! Connection Registry: the active broker target plus named saved targets.
//!
//! Activation delegates to the scheduler, which test-connects before
//! swapping anything.

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::MonitorError;
use crate::kafka::types::ClusterMeta;
use crate::kafka::AdminFactory;
use crate::scheduler::Scheduler;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SavedTarget {
    pub name: String,
    pub brokers: String,
    #[serde(default)]
    pub label: Option<String>,
}

pub struct ConnectionRegistry {
    scheduler: Arc<Scheduler>,
    factory: AdminFactory,
    default_brokers: String,
    targets: DashMap<String, SavedTarget>,
}

impl ConnectionRegistry {
    pub fn new(scheduler: Arc<Scheduler>, factory: AdminFactory, default_brokers: &str) -> Self {
        let targets = DashMap::new();
        targets.insert(
            "default".to_string(),
            SavedTarget {
                name: "default".to_string(),
                brokers: default_brokers.to_string(),
                label: Some("bootstrap".to_string()),
            },
        );
        Self {
            scheduler,
            factory,
            default_brokers: default_brokers.to_string(),
            targets,
        }
    }

    /// Active broker list and whether it is still the configured default.
    pub fn current(&self) -> (String, bool) {
        let brokers = self.scheduler.current_brokers();
        let is_default = brokers == self.default_brokers;
        (brokers, is_default)
    }

    pub fn list_targets(&self) -> Vec<SavedTarget> {
        let mut targets: Vec<SavedTarget> =
            self.targets.iter().map(|entry| entry.value().clone()).collect();
        targets.sort_by_key(|t| t.name.to_lowercase());
        targets
    }

    pub fn add_or_update_target(&self, target: SavedTarget) -> Result<(), MonitorError> {
        if target.name.trim().is_empty() {
            return Err(MonitorError::validation("target name must not be empty"));
        }
        if target.brokers.trim().is_empty() {
            return Err(MonitorError::validation("broker list must not be empty"));
        }
        self.targets.insert(target.name.clone(), target);
        Ok(())
    }

    /// Remove a saved target. The last remaining target cannot be removed:
    /// the registry must always offer somewhere to point the monitor.
    pub fn remove_target(&self, name: &str) -> Result<(), MonitorError> {
        if !self.targets.contains_key(name) {
            return Err(MonitorError::validation(format!("unknown target: {}", name)));
        }
        if self.targets.len() == 1 {
            return Err(MonitorError::validation(
                "cannot remove the last remaining target",
            ));
        }
        self.targets.remove(name);
        Ok(())
    }

    /// Connect, describe, disconnect. No mutation of the active target.
    pub async fn test_target(&self, brokers: &str) -> Result<ClusterMeta, MonitorError> {
        let brokers = brokers.trim();
        if brokers.is_empty() {
            return Err(MonitorError::validation("broker list must not be empty"));
        }
        let admin = (self.factory)(brokers);
        admin.describe_cluster().await
    }

    /// Make a saved target the active one.
    pub async fn activate(&self, name: &str) -> Result<String, MonitorError> {
        let target = self
            .targets
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| MonitorError::validation(format!("unknown target: {}", name)))?;
        self.scheduler.change_target(&target.brokers).await?;
        info!(target = %name, brokers = %target.brokers, "saved target activated");
        Ok(target.brokers)
    }
}
