//! Snapshot data model: the unit of distribution to every subscriber.
//!
//! A `ClusterSnapshot` is built from one coherent collection pass and
//! replaces, never merges with, the previous one. Wire format is camelCase
//! JSON (what the dashboard frontend consumes).

pub mod builder;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub use builder::SnapshotBuilder;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BrokerDescriptor {
    pub node_id: i32,
    pub host: String,
    pub port: i32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterInfo {
    pub brokers: Vec<BrokerDescriptor>,
    pub controller_id: i32,
    pub connection_string: String,
}

/// One group's position on one partition. `current_offset == -1` means the
/// group has never committed there.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerOffsetEntry {
    pub current_offset: i64,
    pub lag: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PartitionOffsetRow {
    pub partition: i32,
    pub low: i64,
    pub high: i64,
    pub message_count: i64,
    pub consumer_offsets: HashMap<String, ConsumerOffsetEntry>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TopicSnapshot {
    pub name: String,
    pub partition_count: usize,
    pub total_messages: i64,
    pub partitions: Vec<PartitionOffsetRow>,
    pub replication_factor: usize,
    pub remaining_messages: i64,
    pub total_consumed: i64,
    pub has_active_consumers: bool,
    pub per_group_lag: HashMap<String, i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TopicSnapshot {
    /// Placeholder for a topic whose fetch failed mid-cycle. The rest of
    /// the cycle proceeds.
    pub fn failed(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            partition_count: 0,
            total_messages: 0,
            partitions: Vec::new(),
            replication_factor: 0,
            remaining_messages: 0,
            total_consumed: 0,
            has_active_consumers: false,
            per_group_lag: HashMap::new(),
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GroupMember {
    pub member_id: String,
    pub client_id: String,
    pub client_host: String,
    pub assigned_partition_keys: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum ConsumerGroupState {
    Stable,
    Rebalancing,
    Empty,
    Dead,
    Unknown,
}

impl ConsumerGroupState {
    /// Broker group states come over the wire as free-form strings.
    pub fn from_broker(state: &str) -> Self {
        match state {
            "Stable" => ConsumerGroupState::Stable,
            "PreparingRebalance" | "CompletingRebalance" | "AwaitingSync" => {
                ConsumerGroupState::Rebalancing
            }
            "Empty" => ConsumerGroupState::Empty,
            "Dead" => ConsumerGroupState::Dead,
            _ => ConsumerGroupState::Unknown,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerGroupSnapshot {
    pub group_id: String,
    pub protocol: String,
    pub state: ConsumerGroupState,
    pub coordinator: Option<BrokerDescriptor>,
    pub members: Vec<GroupMember>,
    pub member_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConsumerGroupSnapshot {
    pub fn failed(group_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            protocol: String::new(),
            state: ConsumerGroupState::Unknown,
            coordinator: None,
            members: Vec::new(),
            member_count: 0,
            error: Some(error.into()),
        }
    }
}

/// The whole dashboard state for one instant. Internally consistent: every
/// figure comes from the same collection pass.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSnapshot {
    pub cluster: Option<ClusterInfo>,
    pub topics: Vec<TopicSnapshot>,
    pub total_topic_count: usize,
    pub consumer_groups: Vec<ConsumerGroupSnapshot>,
    pub total_group_count: usize,
    pub generated_at: DateTime<Utc>,
    pub error: Option<String>,
}

impl ClusterSnapshot {
    /// The "nothing collected yet" state, used at startup and after a
    /// broker-target swap invalidates the cache.
    pub fn empty() -> Self {
        Self {
            cluster: None,
            topics: Vec::new(),
            total_topic_count: 0,
            consumer_groups: Vec::new(),
            total_group_count: 0,
            generated_at: Utc::now(),
            error: None,
        }
    }

    /// Stale-but-present degradation: keep the previous topics/groups, but
    /// surface the failure and refresh the timestamp.
    pub fn degraded(previous: &ClusterSnapshot, error: impl Into<String>) -> Self {
        Self {
            generated_at: Utc::now(),
            error: Some(error.into()),
            ..previous.clone()
        }
    }
}
