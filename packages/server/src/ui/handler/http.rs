//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    domain::UserId,
    infrastructure::dto::http::{
        CloseSessionsResponse, ErrorResponse, HealthDto, PresenceSummaryDto,
        PublishNotificationRequest, PublishNotificationResponse, UserPresenceDto,
    },
    ui::state::AppState,
    usecase::PublishNotificationError,
};

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl ToString) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

fn parse_user_id(raw: String) -> Result<UserId, ApiError> {
    UserId::new(raw).map_err(|e| api_error(StatusCode::BAD_REQUEST, e))
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthDto> {
    Json(HealthDto {
        status: "ok".to_string(),
        instance_id: state.bridge.instance_id().to_string(),
        subscribed: state.bridge.is_subscribed(),
        accepting: state.registry.is_accepting(),
    })
}

/// Users and sessions connected to this instance
pub async fn get_presence(State(state): State<Arc<AppState>>) -> Json<PresenceSummaryDto> {
    let summary = state.get_presence_usecase.summary().await;

    // Domain Model から DTO への変換
    Json(PresenceSummaryDto {
        online_users: summary
            .online_users
            .into_iter()
            .map(UserId::into_string)
            .collect(),
        sessions: summary.sessions,
    })
}

/// Presence of a single user on this instance
pub async fn get_user_presence(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<UserPresenceDto>, ApiError> {
    let user_id = parse_user_id(user_id)?;
    let sessions = state.get_presence_usecase.sessions_of(&user_id).await;

    Ok(Json(UserPresenceDto {
        user_id: user_id.into_string(),
        online: sessions > 0,
        sessions,
    }))
}

/// Producer boundary for business services that are not linked into this process
pub async fn publish_notification(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PublishNotificationRequest>,
) -> Result<(StatusCode, Json<PublishNotificationResponse>), ApiError> {
    match state
        .publish_notification_usecase
        .execute(request.target_user_id, &request.kind, request.payload)
        .await
    {
        Ok(id) => Ok((
            StatusCode::ACCEPTED,
            Json(PublishNotificationResponse { id: id.to_string() }),
        )),
        Err(e @ PublishNotificationError::UnknownKind(_)) => {
            Err(api_error(StatusCode::UNPROCESSABLE_ENTITY, e))
        }
        Err(e @ PublishNotificationError::InvalidTarget(_)) => {
            Err(api_error(StatusCode::BAD_REQUEST, e))
        }
        Err(e @ PublishNotificationError::BridgeUnavailable(_)) => {
            tracing::warn!("Notification not published: {}", e);
            Err(api_error(StatusCode::SERVICE_UNAVAILABLE, e))
        }
        Err(e @ PublishNotificationError::Encode(_)) => {
            tracing::error!("Notification not published: {}", e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e))
        }
    }
}

/// Forced logout: gracefully close every session of a user on this instance
pub async fn close_sessions(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<CloseSessionsResponse>, ApiError> {
    let user_id = parse_user_id(user_id)?;
    let closed = state.disconnect_session_usecase.force_logout(&user_id).await;

    Ok(Json(CloseSessionsResponse {
        user_id: user_id.into_string(),
        closed,
    }))
}
