//! Pure lag arithmetic. No I/O, no hidden state.
//!
//! All offsets are signed 64-bit, clamped at zero: a partition's
//! high-watermark can move between reads, so a committed offset observed
//! "ahead" of the log end is a race, not a negative backlog.

use std::collections::HashMap;
use std::str::FromStr;

/// Committed-offset value for a group that has never committed on a partition.
pub const UNCOMMITTED: i64 = -1;

/// How a never-committed consumer counts toward per-group lag.
///
/// `ZeroLag` treats the group as "not yet engaged" (no lag). `FullBacklog`
/// treats it as maximally behind (the whole retained partition counts).
/// Both are defensible; the dashboard defaults to `ZeroLag`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UncommittedPolicy {
    #[default]
    ZeroLag,
    FullBacklog,
}

impl FromStr for UncommittedPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zero-lag" => Ok(UncommittedPolicy::ZeroLag),
            "full-backlog" => Ok(UncommittedPolicy::FullBacklog),
            other => Err(format!("unknown uncommitted policy: {}", other)),
        }
    }
}

/// Watermarks for one partition: earliest retained offset and next-to-write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionWatermarks {
    pub partition: i32,
    pub low: i64,
    pub high: i64,
}

impl PartitionWatermarks {
    pub fn is_empty(&self) -> bool {
        self.low == self.high
    }

    pub fn message_count(&self) -> i64 {
        (self.high - self.low).max(0)
    }
}

/// Topic-level figures derived from one coherent set of offset reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicLag {
    pub remaining: i64,
    pub total_consumed: i64,
    pub has_active_consumers: bool,
    pub per_group_lag: HashMap<String, i64>,
}

/// Lag of one consumer group on one partition.
///
/// Empty partitions and (under `ZeroLag`) never-committed groups contribute
/// nothing; otherwise `high - committed`, clamped at zero.
pub fn partition_lag(policy: UncommittedPolicy, low: i64, high: i64, committed: i64) -> i64 {
    if low == high {
        return 0;
    }
    if committed == UNCOMMITTED {
        return match policy {
            UncommittedPolicy::ZeroLag => 0,
            UncommittedPolicy::FullBacklog => (high - low).max(0),
        };
    }
    (high - committed).max(0)
}

/// Topic-level remaining/consumed figures across all groups.
///
/// `committed` maps group id -> partition -> committed offset (sentinel
/// included). The slowest consumer determines the backlog: per partition,
/// the minimum ever-committed offset wins; a partition no group ever
/// committed on counts as fully unconsumed. With no committed offset
/// anywhere, the whole topic is backlog.
pub fn topic_remaining(
    policy: UncommittedPolicy,
    partitions: &[PartitionWatermarks],
    committed: &HashMap<String, HashMap<i32, i64>>,
) -> TopicLag {
    let total_messages: i64 = partitions.iter().map(|p| p.message_count()).sum();

    // Minimum ever-committed offset per partition, across all groups.
    let mut min_committed: HashMap<i32, i64> = HashMap::new();
    let mut has_active_consumers = false;

    for offsets in committed.values() {
        for (&partition, &offset) in offsets {
            if offset == UNCOMMITTED {
                continue;
            }
            has_active_consumers = true;
            min_committed
                .entry(partition)
                .and_modify(|cur| *cur = (*cur).min(offset))
                .or_insert(offset);
        }
    }

    if !has_active_consumers {
        return TopicLag {
            remaining: total_messages,
            total_consumed: 0,
            has_active_consumers: false,
            per_group_lag: per_group_lag(policy, partitions, committed),
        };
    }

    let mut remaining: i64 = 0;
    for watermarks in partitions {
        if watermarks.is_empty() {
            continue;
        }
        // No committed offset on this partition means nothing was consumed.
        let floor = min_committed
            .get(&watermarks.partition)
            .copied()
            .unwrap_or(watermarks.low);
        remaining += (watermarks.high - floor).max(0);
    }

    TopicLag {
        remaining,
        total_consumed: (total_messages - remaining).max(0),
        has_active_consumers: true,
        per_group_lag: per_group_lag(policy, partitions, committed),
    }
}

fn per_group_lag(
    policy: UncommittedPolicy,
    partitions: &[PartitionWatermarks],
    committed: &HashMap<String, HashMap<i32, i64>>,
) -> HashMap<String, i64> {
    let mut result = HashMap::new();
    for (group_id, offsets) in committed {
        let mut lag = 0i64;
        for watermarks in partitions {
            if let Some(&offset) = offsets.get(&watermarks.partition) {
                lag += partition_lag(policy, watermarks.low, watermarks.high, offset);
            }
        }
        result.insert(group_id.clone(), lag);
    }
    result
}
