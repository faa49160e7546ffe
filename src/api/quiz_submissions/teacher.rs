use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    Json,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{require_quiz_owner, CurrentTeacher};
use crate::core::state::AppState;
use crate::repositories;
use crate::repositories::answers::QuestionDetailRow;
use crate::schemas::submission::{
    GradeRequest, GradeResponse, TeacherSubmissionResponse, TeacherSubmissionsResponse,
};
use crate::services::manual_grading;

/// Grading view: every submission of the quiz with its per-question answers.
pub(crate) async fn list_quiz_submissions(
    Path(quiz_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<TeacherSubmissionsResponse>, ApiError> {
    require_quiz_owner(state.db(), &quiz_id, &teacher).await?;

    let rows = repositories::submissions::list_for_quiz(state.db(), &quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list submissions"))?;
    let submission_ids = rows.iter().map(|row| row.id.clone()).collect::<Vec<_>>();
    let details = repositories::answers::list_question_details(state.db(), &submission_ids)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch question details"))?;

    let mut grouped: HashMap<String, Vec<QuestionDetailRow>> = HashMap::new();
    for detail in details {
        grouped.entry(detail.submission_id.clone()).or_default().push(detail);
    }

    let submissions = rows
        .into_iter()
        .map(|row| {
            let details = grouped.remove(&row.id).unwrap_or_default();
            TeacherSubmissionResponse::from_row(row, details)
        })
        .collect();

    Ok(Json(TeacherSubmissionsResponse { submissions }))
}

pub(super) async fn grade_submission(
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<GradeRequest>,
) -> Result<Json<GradeResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let (submission_id, input) = payload.into_input();
    let submission =
        manual_grading::grade_submission(state.db(), &teacher, &submission_id, input).await?;

    Ok(Json(GradeResponse::from_db(submission)))
}
