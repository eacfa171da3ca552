//! Normalized admin-client response shapes.
//!
//! The broker library reports loosely-typed, heterogeneous structures;
//! the adapter converts them into these entities at the boundary.

use serde::Serialize;

use crate::snapshot::BrokerDescriptor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterMeta {
    pub brokers: Vec<BrokerDescriptor>,
    pub controller_id: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicMeta {
    pub name: String,
    pub partition_count: usize,
    pub replication_factor: usize,
}

/// A consumer group as returned by the group listing (no member detail).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupOverview {
    pub group_id: String,
    pub protocol: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub member_id: String,
    pub client_id: String,
    pub client_host: String,
    /// `topic-partition` keys decoded from the member assignment blob.
    pub assignments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDetail {
    pub group_id: String,
    pub protocol: String,
    pub state: String,
    pub members: Vec<MemberInfo>,
}

/// Committed position of one group on one partition; -1 when the group has
/// never committed there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommittedOffset {
    pub partition: i32,
    pub offset: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TopicConfigEntry {
    pub name: String,
    pub value: Option<String>,
    pub is_default: bool,
    pub is_read_only: bool,
    pub is_sensitive: bool,
}

/// One record from the bounded probe-read path.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub offset: i64,
    pub timestamp: Option<i64>,
    pub key: Option<String>,
    pub value: Option<String>,
    pub size: usize,
}
