#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use lagview::error::MonitorError;
use lagview::kafka::types::{
    ClusterMeta, CommittedOffset, GroupDetail, GroupOverview, MemberInfo, MessageRecord,
    TopicConfigEntry, TopicMeta,
};
use lagview::kafka::{AdminFactory, ClusterAdmin};
use lagview::lag::{PartitionWatermarks, UncommittedPolicy};
use lagview::scheduler::{Scheduler, SchedulerConfig};
use lagview::snapshot::builder::CollectorConfig;
use lagview::snapshot::BrokerDescriptor;

// ========================================
// SCRIPTED ADMIN CLIENT
// ========================================

#[derive(Clone)]
pub struct FakeTopic {
    pub name: String,
    pub replication_factor: usize,
    pub partitions: Vec<PartitionWatermarks>,
}

#[derive(Clone, Default)]
pub struct FakeGroup {
    pub group_id: String,
    pub protocol: String,
    pub state: String,
    pub members: Vec<MemberInfo>,
    /// topic -> committed offsets (sentinel -1 included).
    pub committed: HashMap<String, Vec<CommittedOffset>>,
}

/// Scripted `ClusterAdmin`: fixed metadata, per-entity failure injection,
/// an optional artificial delay, and call counters.
#[derive(Default)]
pub struct FakeAdmin {
    pub topics: Vec<FakeTopic>,
    pub groups: Vec<FakeGroup>,
    pub messages: Vec<MessageRecord>,
    pub failing_topics: Vec<String>,
    pub failing_groups: Vec<String>,
    pub cluster_unreachable: AtomicBool,
    pub cycle_delay: Option<Duration>,
    pub describe_cluster_calls: AtomicUsize,
}

impl FakeAdmin {
    pub fn with_topics(topics: Vec<FakeTopic>, groups: Vec<FakeGroup>) -> Self {
        Self {
            topics,
            groups,
            ..Self::default()
        }
    }

    pub fn describe_calls(&self) -> usize {
        self.describe_cluster_calls.load(Ordering::SeqCst)
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.cluster_unreachable.store(unreachable, Ordering::SeqCst);
    }

    fn topic(&self, name: &str) -> Result<&FakeTopic, MonitorError> {
        if self.failing_topics.iter().any(|t| t == name) {
            return Err(MonitorError::partial(name, "scripted topic failure"));
        }
        self.topics
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| MonitorError::partial(name, "unknown topic"))
    }
}

#[async_trait]
impl ClusterAdmin for FakeAdmin {
    async fn describe_cluster(&self) -> Result<ClusterMeta, MonitorError> {
        self.describe_cluster_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.cycle_delay {
            tokio::time::sleep(delay).await;
        }
        if self.cluster_unreachable.load(Ordering::SeqCst) {
            return Err(MonitorError::connectivity(
                "describe cluster",
                "scripted outage",
            ));
        }
        Ok(ClusterMeta {
            brokers: vec![BrokerDescriptor {
                node_id: 1,
                host: "broker-1".to_string(),
                port: 9092,
            }],
            controller_id: 1,
        })
    }

    async fn list_topics(&self) -> Result<Vec<String>, MonitorError> {
        Ok(self.topics.iter().map(|t| t.name.clone()).collect())
    }

    async fn fetch_topic_metadata(&self, topic: &str) -> Result<TopicMeta, MonitorError> {
        let fake = self.topic(topic)?;
        Ok(TopicMeta {
            name: fake.name.clone(),
            partition_count: fake.partitions.len(),
            replication_factor: fake.replication_factor,
        })
    }

    async fn fetch_topic_offsets(
        &self,
        topic: &str,
    ) -> Result<Vec<PartitionWatermarks>, MonitorError> {
        Ok(self.topic(topic)?.partitions.clone())
    }

    async fn list_consumer_groups(&self) -> Result<Vec<GroupOverview>, MonitorError> {
        Ok(self
            .groups
            .iter()
            .map(|g| GroupOverview {
                group_id: g.group_id.clone(),
                protocol: g.protocol.clone(),
            })
            .collect())
    }

    async fn describe_consumer_group(&self, group_id: &str) -> Result<GroupDetail, MonitorError> {
        if self.failing_groups.iter().any(|g| g == group_id) {
            return Err(MonitorError::partial(group_id, "scripted group failure"));
        }
        let fake = self
            .groups
            .iter()
            .find(|g| g.group_id == group_id)
            .ok_or_else(|| MonitorError::partial(group_id, "unknown group"))?;
        Ok(GroupDetail {
            group_id: fake.group_id.clone(),
            protocol: fake.protocol.clone(),
            state: fake.state.clone(),
            members: fake.members.clone(),
        })
    }

    async fn fetch_committed_offsets(
        &self,
        group_id: &str,
        topic: &str,
    ) -> Result<Vec<CommittedOffset>, MonitorError> {
        let fake = self
            .groups
            .iter()
            .find(|g| g.group_id == group_id)
            .ok_or_else(|| MonitorError::partial(group_id, "unknown group"))?;
        fake.committed
            .get(topic)
            .cloned()
            .ok_or_else(|| MonitorError::partial(group_id, "no offsets for topic"))
    }

    async fn fetch_topic_configs(
        &self,
        topic: &str,
    ) -> Result<Vec<TopicConfigEntry>, MonitorError> {
        self.topic(topic)?;
        Ok(Vec::new())
    }

    async fn read_messages(
        &self,
        topic: &str,
        _partition: i32,
        start_offset: i64,
        end_offset: i64,
        limit: usize,
    ) -> Result<Vec<MessageRecord>, MonitorError> {
        self.topic(topic)?;
        Ok(self
            .messages
            .iter()
            .filter(|m| m.offset >= start_offset && m.offset <= end_offset)
            .take(limit)
            .cloned()
            .collect())
    }
}

// ========================================
// FIXTURES
// ========================================

pub fn watermarks(partition: i32, low: i64, high: i64) -> PartitionWatermarks {
    PartitionWatermarks {
        partition,
        low,
        high,
    }
}

pub fn topic(name: &str, partitions: Vec<PartitionWatermarks>) -> FakeTopic {
    FakeTopic {
        name: name.to_string(),
        replication_factor: 1,
        partitions,
    }
}

pub fn group(group_id: &str, committed: Vec<(&str, Vec<CommittedOffset>)>) -> FakeGroup {
    FakeGroup {
        group_id: group_id.to_string(),
        protocol: "range".to_string(),
        state: "Stable".to_string(),
        members: Vec::new(),
        committed: committed
            .into_iter()
            .map(|(topic, offsets)| (topic.to_string(), offsets))
            .collect(),
    }
}

pub fn committed(partition: i32, offset: i64) -> CommittedOffset {
    CommittedOffset { partition, offset }
}

pub fn collector_config() -> CollectorConfig {
    CollectorConfig {
        system_topic_prefix: "__".to_string(),
        probe_group_prefix: "lagview-viewer-".to_string(),
        topic_limit: 20,
        group_limit: 10,
        uncommitted_policy: UncommittedPolicy::ZeroLag,
    }
}

pub fn scheduler_config() -> SchedulerConfig {
    SchedulerConfig {
        refresh_interval_ms: 30_000,
        cycle_timeout_ms: 5_000,
        collector: collector_config(),
    }
}

/// Factory serving a fixed admin per broker string; unknown targets fail
/// their connection test.
pub fn fake_factory(admins: HashMap<String, Arc<FakeAdmin>>) -> AdminFactory {
    Arc::new(move |brokers: &str| match admins.get(brokers) {
        Some(admin) => admin.clone() as Arc<dyn ClusterAdmin>,
        None => Arc::new(FakeAdmin {
            cluster_unreachable: AtomicBool::new(true),
            ..FakeAdmin::default()
        }) as Arc<dyn ClusterAdmin>,
    })
}

pub fn scheduler_with(admin: Arc<FakeAdmin>) -> Arc<Scheduler> {
    let mut admins = HashMap::new();
    admins.insert("broker-1:9092".to_string(), admin);
    Arc::new(Scheduler::new(
        fake_factory(admins),
        "broker-1:9092",
        scheduler_config(),
    ))
}
