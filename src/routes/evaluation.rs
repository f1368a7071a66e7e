use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json, Response},
};

use crate::dto::evaluation_dto::EvaluateQuizResponse;
use crate::AppState;

/// Triggers a full evaluation run for one quiz. Invoked by the staff-facing
/// API layer once a quiz has closed; re-invocation re-grades from the
/// current attempt set.
#[axum::debug_handler]
pub async fn evaluate_quiz(
    State(state): State<AppState>,
    Path(quiz_id): Path<i32>,
) -> crate::error::Result<Response> {
    let outcome = state.evaluation_service.evaluate_quiz(quiz_id).await?;

    let response = EvaluateQuizResponse {
        message: "Quiz evaluation completed successfully".to_string(),
        quiz_id: outcome.quiz_id,
        students_evaluated: outcome.students_evaluated,
        evaluated_at: outcome.evaluated_at,
    };
    Ok(Json(response).into_response())
}
