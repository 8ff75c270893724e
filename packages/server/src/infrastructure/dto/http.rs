//! HTTP API DTOs.

use serde::{Deserialize, Serialize};

/// `GET /api/health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthDto {
    pub status: String,
    pub instance_id: String,
    /// Whether the subscription loop is currently attached to the transport
    pub subscribed: bool,
    /// False once shutdown has begun
    pub accepting: bool,
}

/// `GET /api/presence`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceSummaryDto {
    pub online_users: Vec<String>,
    pub sessions: usize,
}

/// `GET /api/presence/{user_id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPresenceDto {
    pub user_id: String,
    pub online: bool,
    pub sessions: usize,
}

/// `POST /api/notifications` request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishNotificationRequest {
    #[serde(default)]
    pub target_user_id: Option<String>,
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// `POST /api/notifications` response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishNotificationResponse {
    pub id: String,
}

/// `DELETE /api/sessions/{user_id}` response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloseSessionsResponse {
    pub user_id: String,
    pub closed: usize,
}

/// Error body for every non-2xx response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
