//! One collection cycle: cluster metadata, topic offsets, consumer-group
//! positions, lag figures, assembled into a single `ClusterSnapshot`.
//!
//! A failure on one topic or group degrades to an error-tagged entry; only
//! a failure to describe the cluster or list topics/groups aborts the
//! cycle.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::error::MonitorError;
use crate::kafka::types::GroupOverview;
use crate::kafka::ClusterAdmin;
use crate::lag::{self, UncommittedPolicy};
use crate::snapshot::{
    ClusterInfo, ClusterSnapshot, ConsumerGroupSnapshot, ConsumerGroupState, ConsumerOffsetEntry,
    GroupMember, PartitionOffsetRow, TopicSnapshot,
};

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub system_topic_prefix: String,
    pub probe_group_prefix: String,
    pub topic_limit: usize,
    pub group_limit: usize,
    pub uncommitted_policy: UncommittedPolicy,
}

pub struct SnapshotBuilder {
    admin: Arc<dyn ClusterAdmin>,
    connection_string: String,
    config: CollectorConfig,
}

impl SnapshotBuilder {
    pub fn new(
        admin: Arc<dyn ClusterAdmin>,
        connection_string: impl Into<String>,
        config: CollectorConfig,
    ) -> Self {
        Self {
            admin,
            connection_string: connection_string.into(),
            config,
        }
    }

    /// Run one full collection pass.
    pub async fn collect(&self) -> Result<ClusterSnapshot, MonitorError> {
        let cluster = self.admin.describe_cluster().await?;

        let mut topics: Vec<String> = self
            .admin
            .list_topics()
            .await?
            .into_iter()
            .filter(|name| !name.starts_with(&self.config.system_topic_prefix))
            .collect();
        topics.sort_by_key(|name| name.to_lowercase());
        let total_topic_count = topics.len();

        let mut groups: Vec<GroupOverview> = self
            .admin
            .list_consumer_groups()
            .await?
            .into_iter()
            .filter(|g| !g.group_id.starts_with(&self.config.probe_group_prefix))
            .collect();
        groups.sort_by_key(|g| g.group_id.to_lowercase());
        let total_group_count = groups.len();

        // Deterministic truncation keeps large clusters from blowing the
        // cycle deadline while staying reproducible between cycles.
        topics.truncate(self.config.topic_limit);
        groups.truncate(self.config.group_limit);

        let mut topic_snapshots = Vec::with_capacity(topics.len());
        for topic in &topics {
            match self.collect_topic(topic, &groups).await {
                Ok(snapshot) => topic_snapshots.push(snapshot),
                Err(e) => {
                    debug!(topic = %topic, error = %e, "topic fetch failed, degrading");
                    topic_snapshots.push(TopicSnapshot::failed(topic, e.to_string()));
                }
            }
        }
        topic_snapshots.sort_by_key(|t| t.name.to_lowercase());

        let mut group_snapshots = Vec::with_capacity(groups.len());
        for group in &groups {
            match self.collect_group(group).await {
                Ok(snapshot) => group_snapshots.push(snapshot),
                Err(e) => {
                    debug!(group = %group.group_id, error = %e, "group describe failed, degrading");
                    group_snapshots.push(ConsumerGroupSnapshot::failed(
                        &group.group_id,
                        e.to_string(),
                    ));
                }
            }
        }

        Ok(ClusterSnapshot {
            cluster: Some(ClusterInfo {
                brokers: cluster.brokers,
                controller_id: cluster.controller_id,
                connection_string: self.connection_string.clone(),
            }),
            topics: topic_snapshots,
            total_topic_count,
            consumer_groups: group_snapshots,
            total_group_count,
            generated_at: Utc::now(),
            error: None,
        })
    }

    async fn collect_topic(
        &self,
        topic: &str,
        groups: &[GroupOverview],
    ) -> Result<TopicSnapshot, MonitorError> {
        let meta = self.admin.fetch_topic_metadata(topic).await?;
        let watermarks = self.admin.fetch_topic_offsets(topic).await?;

        // group id -> partition -> committed offset (sentinel included).
        let mut committed: HashMap<String, HashMap<i32, i64>> = HashMap::new();
        for group in groups {
            match self.admin.fetch_committed_offsets(&group.group_id, topic).await {
                Ok(offsets) => {
                    let by_partition = offsets.iter().map(|o| (o.partition, o.offset)).collect();
                    committed.insert(group.group_id.clone(), by_partition);
                }
                Err(e) => {
                    // Not an error for the cycle: the group may simply not
                    // consume this topic.
                    debug!(group = %group.group_id, topic = %topic, error = %e,
                        "no committed offsets for group");
                }
            }
        }

        let policy = self.config.uncommitted_policy;
        let topic_lag = lag::topic_remaining(policy, &watermarks, &committed);

        let partitions = watermarks
            .iter()
            .map(|w| {
                let consumer_offsets = committed
                    .iter()
                    .filter_map(|(group_id, offsets)| {
                        offsets.get(&w.partition).map(|&offset| {
                            let entry = ConsumerOffsetEntry {
                                current_offset: offset,
                                lag: lag::partition_lag(policy, w.low, w.high, offset),
                            };
                            (group_id.clone(), entry)
                        })
                    })
                    .collect();
                PartitionOffsetRow {
                    partition: w.partition,
                    low: w.low,
                    high: w.high,
                    message_count: w.message_count(),
                    consumer_offsets,
                }
            })
            .collect();

        let total_messages: i64 = watermarks.iter().map(|w| w.message_count()).sum();

        Ok(TopicSnapshot {
            name: meta.name,
            partition_count: meta.partition_count,
            total_messages,
            partitions,
            replication_factor: meta.replication_factor,
            remaining_messages: topic_lag.remaining,
            total_consumed: topic_lag.total_consumed,
            has_active_consumers: topic_lag.has_active_consumers,
            per_group_lag: topic_lag.per_group_lag,
            error: None,
        })
    }

    async fn collect_group(
        &self,
        group: &GroupOverview,
    ) -> Result<ConsumerGroupSnapshot, MonitorError> {
        let detail = self.admin.describe_consumer_group(&group.group_id).await?;
        let members: Vec<GroupMember> = detail
            .members
            .into_iter()
            .map(|m| GroupMember {
                member_id: m.member_id,
                client_id: m.client_id,
                client_host: m.client_host,
                assigned_partition_keys: m.assignments,
            })
            .collect();
        let member_count = members.len();
        Ok(ConsumerGroupSnapshot {
            group_id: detail.group_id,
            protocol: detail.protocol,
            state: ConsumerGroupState::from_broker(&detail.state),
            coordinator: None,
            members,
            member_count,
            error: None,
        })
    }
}
