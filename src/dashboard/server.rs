//! HTTP surface: status, connection management, topic deep-dive, bounded
//! message reads, and the auth/user-management routes.

use axum::extract::{Path, Query, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::auth::{AuthOutcome, Identity};
use crate::connections::SavedTarget;
use crate::dashboard::models::*;
use crate::dashboard::ws::ws_handler;
use crate::error::MonitorError;
use crate::lag;
use crate::MonitorEngine;

pub fn router(engine: MonitorEngine, cors_origin: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(
            cors_origin
                .parse::<HeaderValue>()
                .unwrap_or_else(|_| HeaderValue::from_static("*")),
        )
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(tower_http::cors::Any);

    Router::new()
        // auth
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/check", get(auth_check))
        .route("/api/auth/check-approval", get(check_approval))
        // user management (admin)
        .route("/api/admin/users", get(list_users))
        .route("/api/admin/users/{username}/approve", post(approve_user))
        .route("/api/admin/users/{username}/reject", post(reject_user))
        .route("/api/admin/users/{username}/role", put(set_user_role))
        .route("/api/admin/users/{username}", delete(delete_user))
        // monitoring
        .route("/api/status", get(status))
        .route("/api/health", get(health))
        .route("/api/topics/{name}", get(topic_detail))
        .route("/api/messages/{topic}/{partition}", get(read_messages))
        // connections
        .route("/api/test-connection", post(test_connection))
        .route("/api/change-connection", post(change_connection))
        .route("/api/current-connection", get(current_connection))
        .route("/api/connections", get(list_targets).post(save_target))
        .route("/api/connections/{name}", delete(remove_target))
        .route("/api/connections/{name}/activate", post(activate_target))
        // realtime channel
        .route("/ws", get(ws_handler))
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(engine)
}

// ========================================
// ERRORS & AUTH EXTRACTORS
// ========================================

pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn unauthorized() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: "Authentication required".to_string(),
        }
    }

    pub fn forbidden() -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: "Admin privileges required".to_string(),
        }
    }
}

impl From<MonitorError> for ApiError {
    fn from(error: MonitorError) -> Self {
        let status = match error {
            MonitorError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

/// Resolve a caller to an identity: bearer token, session cookie, or
/// `token` query parameter (the latter for WebSocket upgrades, where
/// browsers cannot set headers).
pub fn resolve_identity(
    engine: &MonitorEngine,
    headers: &HeaderMap,
    query: Option<&str>,
) -> Option<Identity> {
    if !engine.auth_enabled {
        return Some(crate::auth::SessionStore::development_identity());
    }
    bearer_token(headers, query).and_then(|token| engine.sessions.resolve(&token))
}

fn bearer_token(headers: &HeaderMap, query: Option<&str>) -> Option<String> {
    if let Some(value) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        if let Some(token) = value.strip_prefix("Bearer ") {
            return Some(token.to_string());
        }
    }
    if let Some(cookies) = headers.get("cookie").and_then(|v| v.to_str().ok()) {
        for cookie in cookies.split(';') {
            if let Some(token) = cookie.trim().strip_prefix("lagview_session=") {
                return Some(token.to_string());
            }
        }
    }
    query.and_then(|q| {
        q.split('&')
            .find_map(|pair| pair.strip_prefix("token="))
            .map(|t| t.to_string())
    })
}

/// Extractor: any authenticated caller.
pub struct AuthUser(pub Identity);

impl axum::extract::FromRequestParts<MonitorEngine> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        engine: &MonitorEngine,
    ) -> Result<Self, Self::Rejection> {
        resolve_identity(engine, &parts.headers, parts.uri.query())
            .map(AuthUser)
            .ok_or_else(ApiError::unauthorized)
    }
}

/// Extractor: authenticated caller with the admin role.
pub struct AdminUser(pub Identity);

impl axum::extract::FromRequestParts<MonitorEngine> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        engine: &MonitorEngine,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(identity) = AuthUser::from_request_parts(parts, engine).await?;
        if !identity.is_admin() {
            return Err(ApiError::forbidden());
        }
        Ok(AdminUser(identity))
    }
}

// ========================================
// AUTH ROUTES
// ========================================

async fn login(
    State(engine): State<MonitorEngine>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    info!(user = %request.username, "login attempt");
    match engine.auth.login(&request.username, &request.password).await {
        Ok(AuthOutcome::Authenticated(identity)) => {
            let token = engine.sessions.issue(identity.clone());
            Ok(Json(LoginResponse::authenticated(token, identity)))
        }
        Ok(AuthOutcome::PendingApproval) => Ok(Json(LoginResponse::pending())),
        Ok(AuthOutcome::Rejected) => Ok(Json(LoginResponse::rejected())),
        Err(e) => Err(ApiError {
            status: StatusCode::UNAUTHORIZED,
            message: e.to_string(),
        }),
    }
}

async fn logout(State(engine): State<MonitorEngine>, headers: HeaderMap) -> Json<OkBody> {
    if let Some(token) = bearer_token(&headers, None) {
        engine.sessions.revoke(&token);
    }
    Json(OkBody { success: true })
}

async fn auth_check(
    State(engine): State<MonitorEngine>,
    headers: HeaderMap,
) -> Json<AuthCheckResponse> {
    let user = resolve_identity(&engine, &headers, None);
    Json(AuthCheckResponse {
        authenticated: user.is_some(),
        auth_enabled: engine.auth_enabled,
        user,
    })
}

async fn check_approval(
    State(engine): State<MonitorEngine>,
    Query(query): Query<ApprovalQuery>,
) -> Result<Json<LoginResponse>, ApiError> {
    match engine.auth.check_approval(&query.username) {
        Ok(AuthOutcome::Authenticated(identity)) => {
            let token = engine.sessions.issue(identity.clone());
            Ok(Json(LoginResponse::authenticated(token, identity)))
        }
        Ok(AuthOutcome::PendingApproval) => Ok(Json(LoginResponse::pending())),
        Ok(AuthOutcome::Rejected) => Ok(Json(LoginResponse::rejected())),
        Err(e) => Err(ApiError {
            status: StatusCode::UNAUTHORIZED,
            message: e.to_string(),
        }),
    }
}

// ========================================
// USER MANAGEMENT (ADMIN)
// ========================================

async fn list_users(
    State(engine): State<MonitorEngine>,
    AdminUser(_): AdminUser,
) -> Json<UserListResponse> {
    Json(UserListResponse {
        users: engine.auth.users().list(),
    })
}

async fn approve_user(
    State(engine): State<MonitorEngine>,
    AdminUser(admin): AdminUser,
    Path(username): Path<String>,
) -> Result<Json<UserListResponse>, ApiError> {
    engine
        .auth
        .users()
        .approve(&username, &admin.username)
        .map_err(|e| ApiError {
            status: StatusCode::NOT_FOUND,
            message: e.to_string(),
        })?;
    info!(user = %username, by = %admin.username, "user approved");
    Ok(Json(UserListResponse {
        users: engine.auth.users().list(),
    }))
}

async fn reject_user(
    State(engine): State<MonitorEngine>,
    AdminUser(admin): AdminUser,
    Path(username): Path<String>,
) -> Result<Json<UserListResponse>, ApiError> {
    engine
        .auth
        .users()
        .reject(&username, &admin.username)
        .map_err(|e| ApiError {
            status: StatusCode::NOT_FOUND,
            message: e.to_string(),
        })?;
    info!(user = %username, by = %admin.username, "user rejected");
    Ok(Json(UserListResponse {
        users: engine.auth.users().list(),
    }))
}

async fn set_user_role(
    State(engine): State<MonitorEngine>,
    AdminUser(_): AdminUser,
    Path(username): Path<String>,
    Json(request): Json<SetRoleRequest>,
) -> Result<Json<OkBody>, ApiError> {
    let role = request
        .role
        .parse()
        .map_err(|e: String| ApiError::from(MonitorError::validation(e)))?;
    engine
        .auth
        .users()
        .set_role(&username, role)
        .map_err(|e| ApiError {
            status: StatusCode::NOT_FOUND,
            message: e.to_string(),
        })?;
    Ok(Json(OkBody { success: true }))
}

async fn delete_user(
    State(engine): State<MonitorEngine>,
    AdminUser(_): AdminUser,
    Path(username): Path<String>,
) -> Result<Json<OkBody>, ApiError> {
    engine.auth.users().remove(&username).map_err(|e| ApiError {
        status: StatusCode::NOT_FOUND,
        message: e.to_string(),
    })?;
    Ok(Json(OkBody { success: true }))
}

// ========================================
// MONITORING ROUTES
// ========================================

async fn status(
    State(engine): State<MonitorEngine>,
    AuthUser(_): AuthUser,
) -> impl IntoResponse {
    let snapshot = engine.scheduler.ensure_snapshot().await;
    Json((*snapshot).clone())
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok", "timestamp": chrono::Utc::now() }))
}

async fn topic_detail(
    State(engine): State<MonitorEngine>,
    AuthUser(_): AuthUser,
    Path(name): Path<String>,
) -> Result<Json<TopicDetailResponse>, ApiError> {
    let admin = engine.scheduler.active_admin();

    let meta = admin.fetch_topic_metadata(&name).await?;
    let watermarks = admin.fetch_topic_offsets(&name).await?;
    let configs = admin.fetch_topic_configs(&name).await.unwrap_or_default();

    let mut groups = admin.list_consumer_groups().await?;
    groups.retain(|g| !g.group_id.starts_with(&engine.probe_group_prefix));
    groups.sort_by_key(|g| g.group_id.to_lowercase());
    groups.truncate(engine.monitor.detail_group_limit);

    let policy = engine.monitor.uncommitted_policy;
    let mut consumer_lag = Vec::new();
    for group in &groups {
        // A group that does not consume this topic is not an error.
        let Ok(committed) = admin.fetch_committed_offsets(&group.group_id, &name).await else {
            continue;
        };
        let entries: Vec<GroupPartitionLag> = committed
            .iter()
            .filter_map(|offset| {
                watermarks
                    .iter()
                    .find(|w| w.partition == offset.partition)
                    .map(|w| GroupPartitionLag {
                        partition: offset.partition,
                        current_offset: offset.offset,
                        lag: lag::partition_lag(policy, w.low, w.high, offset.offset),
                    })
            })
            .collect();
        if !entries.is_empty() {
            consumer_lag.push(GroupLag {
                group_id: group.group_id.clone(),
                lag: entries,
            });
        }
    }

    Ok(Json(TopicDetailResponse {
        topic: name,
        partition_count: meta.partition_count,
        replication_factor: meta.replication_factor,
        offsets: watermarks
            .iter()
            .map(|w| OffsetRow {
                partition: w.partition,
                low: w.low,
                high: w.high,
            })
            .collect(),
        configs,
        consumer_lag,
    }))
}

const MESSAGE_READ_MAX: usize = 500;

async fn read_messages(
    State(engine): State<MonitorEngine>,
    AuthUser(_): AuthUser,
    Path((topic, partition)): Path<(String, i32)>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<MessagesResponse>, ApiError> {
    if partition < 0 {
        return Err(MonitorError::validation("partition must be non-negative").into());
    }
    let start = query
        .start_offset
        .ok_or_else(|| MonitorError::validation("startOffset is required"))?;
    let end = query
        .end_offset
        .ok_or_else(|| MonitorError::validation("endOffset is required"))?;
    if start < 0 || end < start {
        return Err(MonitorError::validation("invalid offset range").into());
    }
    let limit = query.limit.unwrap_or(10);
    if limit == 0 || limit > MESSAGE_READ_MAX {
        return Err(MonitorError::validation(format!(
            "limit must be between 1 and {}",
            MESSAGE_READ_MAX
        ))
        .into());
    }

    let admin = engine.scheduler.active_admin();
    let messages = admin
        .read_messages(&topic, partition, start, end, limit)
        .await?;
    let count = messages.len();
    Ok(Json(MessagesResponse {
        topic,
        partition,
        messages,
        count,
    }))
}

// ========================================
// CONNECTION ROUTES
// ========================================

async fn test_connection(
    State(engine): State<MonitorEngine>,
    AuthUser(_): AuthUser,
    Json(request): Json<BrokersRequest>,
) -> Result<Json<TestConnectionResponse>, ApiError> {
    match engine.registry.test_target(&request.brokers).await {
        Ok(meta) => Ok(Json(TestConnectionResponse {
            success: true,
            message: format!("Connected to cluster with {} broker(s)", meta.brokers.len()),
            broker_count: Some(meta.brokers.len()),
            controller_id: Some(meta.controller_id),
        })),
        // Malformed input is a 400; an unreachable target is a normal
        // "no" answer to the question the endpoint asks.
        Err(e @ MonitorError::Validation(_)) => Err(e.into()),
        Err(e) => Ok(Json(TestConnectionResponse {
            success: false,
            message: e.to_string(),
            broker_count: None,
            controller_id: None,
        })),
    }
}

async fn change_connection(
    State(engine): State<MonitorEngine>,
    AuthUser(_): AuthUser,
    Json(request): Json<BrokersRequest>,
) -> Result<Json<ChangeConnectionResponse>, ApiError> {
    engine.scheduler.change_target(&request.brokers).await?;
    Ok(Json(ChangeConnectionResponse {
        success: true,
        message: "Connection changed successfully".to_string(),
        brokers: engine.scheduler.current_brokers(),
    }))
}

async fn current_connection(
    State(engine): State<MonitorEngine>,
    AuthUser(_): AuthUser,
) -> Json<CurrentConnectionResponse> {
    let (brokers, is_default) = engine.registry.current();
    Json(CurrentConnectionResponse { brokers, is_default })
}

async fn list_targets(
    State(engine): State<MonitorEngine>,
    AuthUser(_): AuthUser,
) -> Json<Vec<SavedTarget>> {
    Json(engine.registry.list_targets())
}

async fn save_target(
    State(engine): State<MonitorEngine>,
    AuthUser(_): AuthUser,
    Json(target): Json<SavedTarget>,
) -> Result<Json<OkBody>, ApiError> {
    engine.registry.add_or_update_target(target)?;
    Ok(Json(OkBody { success: true }))
}

async fn remove_target(
    State(engine): State<MonitorEngine>,
    AuthUser(_): AuthUser,
    Path(name): Path<String>,
) -> Result<Json<OkBody>, ApiError> {
    engine.registry.remove_target(&name)?;
    Ok(Json(OkBody { success: true }))
}

async fn activate_target(
    State(engine): State<MonitorEngine>,
    AuthUser(_): AuthUser,
    Path(name): Path<String>,
) -> Result<Json<ChangeConnectionResponse>, ApiError> {
    let brokers = engine.registry.activate(&name).await?;
    Ok(Json(ChangeConnectionResponse {
        success: true,
        message: "Connection changed successfully".to_string(),
        brokers,
    }))
}
