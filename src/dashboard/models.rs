//! Request/response payloads for the HTTP surface.

use serde::{Deserialize, Serialize};

use crate::auth::{Identity, UserRecord};
use crate::kafka::types::{MessageRecord, TopicConfigEntry};

// --- AUTH ---

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<Identity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_approval: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LoginResponse {
    pub fn authenticated(token: String, user: Identity) -> Self {
        Self {
            success: true,
            token: Some(token),
            user: Some(user),
            pending_approval: None,
            rejected: None,
            message: None,
        }
    }

    pub fn pending() -> Self {
        Self {
            success: false,
            token: None,
            user: None,
            pending_approval: Some(true),
            rejected: None,
            message: Some("Your account is pending approval from an administrator.".to_string()),
        }
    }

    pub fn rejected() -> Self {
        Self {
            success: false,
            token: None,
            user: None,
            pending_approval: None,
            rejected: Some(true),
            message: Some(
                "Your access request has been denied. Please contact your administrator."
                    .to_string(),
            ),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthCheckResponse {
    pub authenticated: bool,
    pub auth_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<Identity>,
}

#[derive(Debug, Deserialize)]
pub struct ApprovalQuery {
    pub username: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListResponse {
    pub users: Vec<UserRecord>,
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: String,
}

// --- CONNECTIONS ---

#[derive(Debug, Deserialize)]
pub struct BrokersRequest {
    pub brokers: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestConnectionResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broker_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller_id: Option<i32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeConnectionResponse {
    pub success: bool,
    pub message: String,
    pub brokers: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentConnectionResponse {
    pub brokers: String,
    pub is_default: bool,
}

// --- TOPIC DETAIL / MESSAGES ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OffsetRow {
    pub partition: i32,
    pub low: i64,
    pub high: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPartitionLag {
    pub partition: i32,
    pub current_offset: i64,
    pub lag: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupLag {
    pub group_id: String,
    pub lag: Vec<GroupPartitionLag>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicDetailResponse {
    pub topic: String,
    pub partition_count: usize,
    pub replication_factor: usize,
    pub offsets: Vec<OffsetRow>,
    pub configs: Vec<TopicConfigEntry>,
    pub consumer_lag: Vec<GroupLag>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesQuery {
    pub start_offset: Option<i64>,
    pub end_offset: Option<i64>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesResponse {
    pub topic: String,
    pub partition: i32,
    pub messages: Vec<MessageRecord>,
    pub count: usize,
}

// --- GENERIC ---

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct OkBody {
    pub success: bool,
}
