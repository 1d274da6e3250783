use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json},
    Extension,
};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::middleware::auth::Claims;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PollQuery {
    #[serde(default = "default_since")]
    since: chrono::DateTime<chrono::Utc>,
    room: Option<String>,
}

fn default_since() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now() - chrono::Duration::minutes(5)
}

#[utoipa::path(
    get,
    path = "/api/notifications/poll",
    responses(
        (status = 200, description = "Recent events for the caller's room"),
        (status = 403, description = "Room does not belong to the caller")
    )
)]
#[axum::debug_handler]
pub async fn poll_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<PollQuery>,
) -> Result<impl IntoResponse> {
    let room = match query.room {
        Some(room) => {
            if !claims.is_super_admin() && room != claims.college() {
                return Err(Error::Forbidden(
                    "Cannot poll another college's room".to_string(),
                ));
            }
            room
        }
        None => claims.college().to_string(),
    };

    let events = state.notification_service.poll(&room, query.since).await?;
    Ok(Json(serde_json::json!({
        "room": room,
        "events": events.iter().map(|e| serde_json::json!({
            "id": e.id,
            "event": e.event_type,
            "payload": e.payload,
            "created_at": e.created_at,
        })).collect::<Vec<_>>(),
    })))
}
