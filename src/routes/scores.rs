use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;

use crate::dto::score_dto::{
    EditScoreRequest, ScoreDetailResponse, ScoreFilter, ScoreResponse,
};
use crate::error::{Error, Result};
use crate::middleware::auth::Claims;
use crate::services::notification_service::EVENT_SCORE_EDITED;
use crate::services::score_service::{EditTarget, EditorContext};
use crate::AppState;

/// Students see only their own scores; college-scoped admins see their
/// college; super admins may filter freely.
fn scope_filter(claims: &Claims, mut filter: ScoreFilter) -> Result<ScoreFilter> {
    if claims.is_super_admin() {
        return Ok(filter);
    }
    if claims.is_admin() {
        filter.college = Some(claims.college().to_string());
        return Ok(filter);
    }
    filter.student_id = Some(claims.user_id()?);
    Ok(filter)
}

#[utoipa::path(
    get,
    path = "/api/scores",
    responses(
        (status = 200, description = "Scores visible to the caller")
    )
)]
#[axum::debug_handler]
pub async fn list_scores(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(filter): Query<ScoreFilter>,
) -> Result<impl IntoResponse> {
    let filter = scope_filter(&claims, filter)?;
    let scores = state.score_service.list_scores(filter).await?;
    let scores: Vec<ScoreResponse> = scores.into_iter().map(ScoreResponse::from).collect();
    Ok(Json(scores))
}

#[utoipa::path(
    get,
    path = "/api/scores/{id}",
    params(
        ("id" = Uuid, Path, description = "Score ID")
    ),
    responses(
        (status = 200, description = "Score with its edit history", body = Json<ScoreDetailResponse>),
        (status = 403, description = "Score belongs to another student or college"),
        (status = 404, description = "Score not found")
    )
)]
#[axum::debug_handler]
pub async fn get_score(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(score_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let score = state.score_service.get_score(score_id).await?;

    if !claims.is_super_admin() {
        if claims.is_admin() {
            if score.college != claims.college() {
                return Err(Error::Forbidden(
                    "Score belongs to another college".to_string(),
                ));
            }
        } else if score.student_id != claims.user_id()? {
            return Err(Error::Forbidden(
                "Students may only view their own scores".to_string(),
            ));
        }
    }

    let edits = state.score_service.list_edits(score_id).await?;
    Ok(Json(ScoreDetailResponse {
        score: ScoreResponse::from(score),
        edits,
    }))
}

#[utoipa::path(
    put,
    path = "/api/scores/{id}/edit",
    params(
        ("id" = Uuid, Path, description = "Score ID")
    ),
    request_body = EditScoreRequest,
    responses(
        (status = 200, description = "Score updated and audit entry appended"),
        (status = 400, description = "Missing reason or out-of-range value"),
        (status = 403, description = "Caller may not edit this score"),
        (status = 404, description = "Score not found")
    )
)]
#[axum::debug_handler]
pub async fn edit_score(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(score_id): Path<Uuid>,
    Json(req): Json<EditScoreRequest>,
) -> Result<impl IntoResponse> {
    let (target, reason) = EditTarget::parse(&req)?;
    let editor = EditorContext {
        id: claims.user_id()?,
        role: claims.role().to_string(),
        college: claims.college().to_string(),
    };

    let (score, edit) = state
        .score_service
        .edit_score(score_id, target, &reason, &editor)
        .await?;

    if let Err(e) = state
        .notification_service
        .enqueue_score_event(
            EVENT_SCORE_EDITED,
            &score.college,
            &score.student_name,
            score.id,
            &score.quiz_title,
        )
        .await
    {
        tracing::error!(score_id = %score.id, error = ?e, "Failed to enqueue score-edited event");
    }

    Ok(Json(serde_json::json!({
        "score": ScoreResponse::from(score),
        "edit": edit,
    })))
}
