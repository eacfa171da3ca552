//! Broker Client Adapter: a pluggable, read-only admin client.
//!
//! `RdKafkaAdmin` opens one short-lived client per logical operation and
//! drops it at the end, so a bad call can never poison a shared handle.
//! All librdkafka calls are blocking and run under `spawn_blocking`.
//! Errors map to `MonitorError::Connectivity`; retry policy lives with the
//! scheduler, not here.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rdkafka::admin::{AdminClient, AdminOptions, ResourceSpecifier};
use rdkafka::client::DefaultClientContext;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{BaseConsumer, Consumer};
use rdkafka::message::Message;
use rdkafka::{Offset, TopicPartitionList};
use uuid::Uuid;

use crate::config::KafkaConfig;
use crate::error::MonitorError;
use crate::kafka::types::{
    ClusterMeta, CommittedOffset, GroupDetail, GroupOverview, MemberInfo, MessageRecord,
    TopicConfigEntry, TopicMeta,
};
use crate::lag::{PartitionWatermarks, UNCOMMITTED};
use crate::snapshot::BrokerDescriptor;

/// Read-only view of a cluster. One implementation speaks to real brokers;
/// tests script their own.
#[async_trait]
pub trait ClusterAdmin: Send + Sync {
    async fn describe_cluster(&self) -> Result<ClusterMeta, MonitorError>;
    async fn list_topics(&self) -> Result<Vec<String>, MonitorError>;
    async fn fetch_topic_metadata(&self, topic: &str) -> Result<TopicMeta, MonitorError>;
    async fn fetch_topic_offsets(
        &self,
        topic: &str,
    ) -> Result<Vec<PartitionWatermarks>, MonitorError>;
    async fn list_consumer_groups(&self) -> Result<Vec<GroupOverview>, MonitorError>;
    async fn describe_consumer_group(&self, group_id: &str) -> Result<GroupDetail, MonitorError>;
    async fn fetch_committed_offsets(
        &self,
        group_id: &str,
        topic: &str,
    ) -> Result<Vec<CommittedOffset>, MonitorError>;
    async fn fetch_topic_configs(&self, topic: &str)
        -> Result<Vec<TopicConfigEntry>, MonitorError>;
    async fn read_messages(
        &self,
        topic: &str,
        partition: i32,
        start_offset: i64,
        end_offset: i64,
        limit: usize,
    ) -> Result<Vec<MessageRecord>, MonitorError>;
}

/// Builds an admin client for a broker list. The scheduler and the
/// connection registry use this to hot-swap targets.
pub type AdminFactory = Arc<dyn Fn(&str) -> Arc<dyn ClusterAdmin> + Send + Sync>;

pub fn rdkafka_factory(config: &KafkaConfig) -> AdminFactory {
    let config = config.clone();
    Arc::new(move |brokers: &str| {
        Arc::new(RdKafkaAdmin::new(brokers, &config)) as Arc<dyn ClusterAdmin>
    })
}

// ========================================
// RDKAFKA IMPLEMENTATION
// ========================================

pub struct RdKafkaAdmin {
    brokers: String,
    connect_timeout: Duration,
    request_timeout: Duration,
    probe_group_prefix: String,
}

impl RdKafkaAdmin {
    pub fn new(brokers: &str, config: &KafkaConfig) -> Self {
        Self {
            brokers: brokers.to_string(),
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            request_timeout: Duration::from_millis(config.request_timeout_ms),
            probe_group_prefix: config.probe_group_prefix.clone(),
        }
    }

    fn base_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", &self.brokers)
            .set(
                "socket.connection.setup.timeout.ms",
                self.connect_timeout.as_millis().to_string(),
            )
            .set("enable.auto.commit", "false");
        config
    }

    /// Fresh metadata client, dropped (and disconnected) when the scope ends.
    fn metadata_client(&self, op: &'static str) -> Result<BaseConsumer, MonitorError> {
        self.base_config()
            .create()
            .map_err(|e| MonitorError::connectivity(op, e.to_string()))
    }

    /// Client bound to a specific group id, for committed-offset reads.
    fn group_client(&self, group_id: &str, op: &'static str) -> Result<BaseConsumer, MonitorError> {
        let mut config = self.base_config();
        config.set("group.id", group_id);
        config
            .create()
            .map_err(|e| MonitorError::connectivity(op, e.to_string()))
    }

    async fn blocking<T, F>(op: &'static str, task: F) -> Result<T, MonitorError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, MonitorError> + Send + 'static,
    {
        tokio::task::spawn_blocking(task)
            .await
            .map_err(|e| MonitorError::connectivity(op, e.to_string()))?
    }

    fn partition_ids(
        consumer: &BaseConsumer,
        topic: &str,
        timeout: Duration,
        op: &'static str,
    ) -> Result<Vec<i32>, MonitorError> {
        let metadata = consumer
            .fetch_metadata(Some(topic), timeout)
            .map_err(|e| MonitorError::connectivity(op, e.to_string()))?;
        let meta_topic = metadata
            .topics()
            .iter()
            .find(|t| t.name() == topic)
            .ok_or_else(|| MonitorError::connectivity(op, format!("unknown topic {}", topic)))?;
        Ok(meta_topic.partitions().iter().map(|p| p.id()).collect())
    }
}

#[async_trait]
impl ClusterAdmin for RdKafkaAdmin {
    async fn describe_cluster(&self) -> Result<ClusterMeta, MonitorError> {
        const OP: &str = "describe cluster";
        let consumer = self.metadata_client(OP)?;
        let timeout = self.request_timeout;
        Self::blocking(OP, move || {
            let metadata = consumer
                .fetch_metadata(None, timeout)
                .map_err(|e| MonitorError::connectivity(OP, e.to_string()))?;
            let brokers = metadata
                .brokers()
                .iter()
                .map(|b| BrokerDescriptor {
                    node_id: b.id(),
                    host: b.host().to_string(),
                    port: b.port(),
                })
                .collect();
            Ok(ClusterMeta {
                brokers,
                // librdkafka does not expose the controller; report the
                // broker that served this metadata instead.
                controller_id: metadata.orig_broker_id(),
            })
        })
        .await
    }

    async fn list_topics(&self) -> Result<Vec<String>, MonitorError> {
        const OP: &str = "list topics";
        let consumer = self.metadata_client(OP)?;
        let timeout = self.request_timeout;
        Self::blocking(OP, move || {
            let metadata = consumer
                .fetch_metadata(None, timeout)
                .map_err(|e| MonitorError::connectivity(OP, e.to_string()))?;
            Ok(metadata
                .topics()
                .iter()
                .map(|t| t.name().to_string())
                .collect())
        })
        .await
    }

    async fn fetch_topic_metadata(&self, topic: &str) -> Result<TopicMeta, MonitorError> {
        const OP: &str = "fetch topic metadata";
        let consumer = self.metadata_client(OP)?;
        let timeout = self.request_timeout;
        let topic = topic.to_string();
        Self::blocking(OP, move || {
            let metadata = consumer
                .fetch_metadata(Some(&topic), timeout)
                .map_err(|e| MonitorError::connectivity(OP, e.to_string()))?;
            let meta_topic = metadata
                .topics()
                .iter()
                .find(|t| t.name() == topic)
                .ok_or_else(|| {
                    MonitorError::connectivity(OP, format!("unknown topic {}", topic))
                })?;
            let partitions = meta_topic.partitions();
            Ok(TopicMeta {
                name: topic.clone(),
                partition_count: partitions.len(),
                replication_factor: partitions
                    .first()
                    .map(|p| p.replicas().len())
                    .unwrap_or(0),
            })
        })
        .await
    }

    async fn fetch_topic_offsets(
        &self,
        topic: &str,
    ) -> Result<Vec<PartitionWatermarks>, MonitorError> {
        const OP: &str = "fetch topic offsets";
        let consumer = self.metadata_client(OP)?;
        let timeout = self.request_timeout;
        let topic = topic.to_string();
        Self::blocking(OP, move || {
            let ids = Self::partition_ids(&consumer, &topic, timeout, OP)?;
            let mut rows = Vec::with_capacity(ids.len());
            for partition in ids {
                let (low, high) = consumer
                    .fetch_watermarks(&topic, partition, timeout)
                    .map_err(|e| MonitorError::connectivity(OP, e.to_string()))?;
                rows.push(PartitionWatermarks { partition, low, high });
            }
            Ok(rows)
        })
        .await
    }

    async fn list_consumer_groups(&self) -> Result<Vec<GroupOverview>, MonitorError> {
        const OP: &str = "list consumer groups";
        let consumer = self.metadata_client(OP)?;
        let timeout = self.request_timeout;
        Self::blocking(OP, move || {
            let groups = consumer
                .fetch_group_list(None, timeout)
                .map_err(|e| MonitorError::connectivity(OP, e.to_string()))?;
            Ok(groups
                .groups()
                .iter()
                .map(|g| GroupOverview {
                    group_id: g.name().to_string(),
                    protocol: g.protocol().to_string(),
                })
                .collect())
        })
        .await
    }

    async fn describe_consumer_group(&self, group_id: &str) -> Result<GroupDetail, MonitorError> {
        const OP: &str = "describe consumer group";
        let consumer = self.metadata_client(OP)?;
        let timeout = self.request_timeout;
        let group_id = group_id.to_string();
        Self::blocking(OP, move || {
            let groups = consumer
                .fetch_group_list(Some(&group_id), timeout)
                .map_err(|e| MonitorError::connectivity(OP, e.to_string()))?;
            let group = groups
                .groups()
                .iter()
                .find(|g| g.name() == group_id)
                .ok_or_else(|| {
                    MonitorError::connectivity(OP, format!("unknown group {}", group_id))
                })?;
            let members = group
                .members()
                .iter()
                .map(|m| MemberInfo {
                    member_id: m.id().to_string(),
                    client_id: m.client_id().to_string(),
                    client_host: m.client_host().to_string(),
                    assignments: m
                        .assignment()
                        .map(parse_member_assignment)
                        .unwrap_or_default(),
                })
                .collect();
            Ok(GroupDetail {
                group_id: group.name().to_string(),
                protocol: group.protocol().to_string(),
                state: group.state().to_string(),
                members,
            })
        })
        .await
    }

    async fn fetch_committed_offsets(
        &self,
        group_id: &str,
        topic: &str,
    ) -> Result<Vec<CommittedOffset>, MonitorError> {
        const OP: &str = "fetch committed offsets";
        let consumer = self.group_client(group_id, OP)?;
        let timeout = self.request_timeout;
        let topic = topic.to_string();
        Self::blocking(OP, move || {
            let ids = Self::partition_ids(&consumer, &topic, timeout, OP)?;
            let mut tpl = TopicPartitionList::new();
            for partition in &ids {
                tpl.add_partition(&topic, *partition);
            }
            let committed = consumer
                .committed_offsets(tpl, timeout)
                .map_err(|e| MonitorError::connectivity(OP, e.to_string()))?;
            Ok(committed
                .elements()
                .iter()
                .map(|elem| CommittedOffset {
                    partition: elem.partition(),
                    offset: match elem.offset() {
                        Offset::Offset(offset) => offset,
                        _ => UNCOMMITTED,
                    },
                })
                .collect())
        })
        .await
    }

    async fn fetch_topic_configs(
        &self,
        topic: &str,
    ) -> Result<Vec<TopicConfigEntry>, MonitorError> {
        const OP: &str = "fetch topic configs";
        let admin: AdminClient<DefaultClientContext> = self
            .base_config()
            .create()
            .map_err(|e| MonitorError::connectivity(OP, e.to_string()))?;
        let options = AdminOptions::new().request_timeout(Some(self.request_timeout));
        let results = admin
            .describe_configs([&ResourceSpecifier::Topic(topic)], &options)
            .await
            .map_err(|e| MonitorError::connectivity(OP, e.to_string()))?;
        let resource = results
            .into_iter()
            .next()
            .ok_or_else(|| MonitorError::connectivity(OP, "empty describe_configs response"))?
            .map_err(|e| MonitorError::connectivity(OP, e.to_string()))?;
        Ok(resource
            .entries
            .into_iter()
            .map(|entry| TopicConfigEntry {
                name: entry.name,
                value: entry.value,
                is_default: entry.is_default,
                is_read_only: entry.is_read_only,
                is_sensitive: entry.is_sensitive,
            })
            .collect())
    }

    async fn read_messages(
        &self,
        topic: &str,
        partition: i32,
        start_offset: i64,
        end_offset: i64,
        limit: usize,
    ) -> Result<Vec<MessageRecord>, MonitorError> {
        const OP: &str = "read messages";
        // Transient probe group, filtered out of every listing by prefix.
        let group_id = format!("{}{}", self.probe_group_prefix, Uuid::new_v4());
        let consumer = self.group_client(&group_id, OP)?;
        let deadline = self.request_timeout;
        let topic = topic.to_string();
        Self::blocking(OP, move || {
            let mut tpl = TopicPartitionList::new();
            tpl.add_partition_offset(&topic, partition, Offset::Offset(start_offset))
                .map_err(|e| MonitorError::connectivity(OP, e.to_string()))?;
            consumer
                .assign(&tpl)
                .map_err(|e| MonitorError::connectivity(OP, e.to_string()))?;

            let started = Instant::now();
            let mut records = Vec::new();
            while records.len() < limit && started.elapsed() < deadline {
                let Some(polled) = consumer.poll(Duration::from_millis(200)) else {
                    continue;
                };
                let message = polled.map_err(|e| MonitorError::connectivity(OP, e.to_string()))?;
                if message.offset() > end_offset {
                    break;
                }
                records.push(MessageRecord {
                    offset: message.offset(),
                    timestamp: message.timestamp().to_millis(),
                    key: message
                        .key()
                        .map(|k| String::from_utf8_lossy(k).into_owned()),
                    value: message
                        .payload()
                        .map(|v| String::from_utf8_lossy(v).into_owned()),
                    size: message.payload().map(|v| v.len()).unwrap_or(0),
                });
                if message.offset() >= end_offset {
                    break;
                }
            }
            Ok(records)
        })
        .await
    }
}

/// Decode `topic-partition` keys from a ConsumerProtocolAssignment blob
/// (version i16, then [topic string, [i32 partition]] pairs). Truncated or
/// foreign-protocol blobs yield whatever decoded cleanly.
fn parse_member_assignment(data: &[u8]) -> Vec<String> {
    let mut keys = Vec::new();
    let mut cursor = 2usize; // skip version
    let Some(topic_count) = read_i32(data, &mut cursor) else {
        return keys;
    };
    for _ in 0..topic_count.max(0) {
        let Some(len) = read_i16(data, &mut cursor) else {
            return keys;
        };
        let len = len.max(0) as usize;
        if cursor + len > data.len() {
            return keys;
        }
        let topic = String::from_utf8_lossy(&data[cursor..cursor + len]).into_owned();
        cursor += len;
        let Some(partition_count) = read_i32(data, &mut cursor) else {
            return keys;
        };
        for _ in 0..partition_count.max(0) {
            let Some(partition) = read_i32(data, &mut cursor) else {
                return keys;
            };
            keys.push(format!("{}-{}", topic, partition));
        }
    }
    keys
}

fn read_i16(data: &[u8], cursor: &mut usize) -> Option<i16> {
    let bytes = data.get(*cursor..*cursor + 2)?;
    *cursor += 2;
    Some(i16::from_be_bytes([bytes[0], bytes[1]]))
}

fn read_i32(data: &[u8], cursor: &mut usize) -> Option<i32> {
    let bytes = data.get(*cursor..*cursor + 4)?;
    *cursor += 4;
    Some(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}
