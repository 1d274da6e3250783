use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::dto::score_dto::{SubmitQuizRequest, SubmitQuizResponse};
use crate::error::Result;
use crate::middleware::auth::Claims;
use crate::services::notification_service::EVENT_SCORE_SUBMITTED;
use crate::services::scoring::ScoringService;
use crate::AppState;

#[utoipa::path(
    get,
    path = "/api/simulations/public",
    responses(
        (status = 200, description = "Active quizzes visible to students")
    )
)]
#[axum::debug_handler]
pub async fn list_public_simulations(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let quizzes = state.quiz_service.list_public().await?;
    Ok(Json(quizzes))
}

#[utoipa::path(
    post,
    path = "/api/simulations/{id}/submit",
    params(
        ("id" = Uuid, Path, description = "Quiz ID")
    ),
    request_body = SubmitQuizRequest,
    responses(
        (status = 201, description = "Score recorded", body = Json<SubmitQuizResponse>),
        (status = 400, description = "Invalid submission"),
        (status = 404, description = "Quiz not found")
    )
)]
#[axum::debug_handler]
pub async fn submit_simulation(
    State(state): State<AppState>,
    Path(quiz_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubmitQuizRequest>,
) -> Result<Response> {
    req.validate()?;

    let quiz = state.quiz_service.get_quiz_by_id(quiz_id).await?;
    if !quiz.is_active {
        return Ok((
            StatusCode::FORBIDDEN,
            Json(json!({
                "error": "quiz_inactive",
                "message": "This quiz is not open for submissions"
            })),
        )
            .into_response());
    }

    let student = state
        .student_service
        .get_user_by_id(claims.user_id()?)
        .await?;

    let (score, misconfigured) = state
        .score_service
        .submit_quiz(&quiz, &student, req.answers)
        .await?;

    if misconfigured {
        if let Err(e) = state.quiz_service.flag_misconfigured(quiz.id).await {
            tracing::error!(quiz_id = %quiz.id, error = ?e, "Failed to flag quiz as misconfigured");
        }
    }

    if let Err(e) = state
        .notification_service
        .enqueue_score_event(
            EVENT_SCORE_SUBMITTED,
            &score.college,
            &score.student_name,
            score.id,
            &score.quiz_title,
        )
        .await
    {
        tracing::error!(score_id = %score.id, error = ?e, "Failed to enqueue score-submitted event");
    }

    let resp = SubmitQuizResponse {
        score_id: score.id,
        percentage: score.percentage,
        total_score: ScoringService::display(score.total_score),
        max_marks: score.max_marks,
        misconfigured,
    };
    Ok((StatusCode::CREATED, Json(resp)).into_response())
}
