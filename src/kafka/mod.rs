//! Broker client boundary.
//!
//! Everything past this module works with the normalized shapes in
//! [`types`]; rdkafka's native response types never escape the adapter.

pub mod admin;
pub mod types;

pub use admin::{rdkafka_factory, AdminFactory, ClusterAdmin, RdKafkaAdmin};
