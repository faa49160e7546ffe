use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentStudent;
use crate::api::uploads::read_pdf_form;
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::submission::{
    PdfSubmitResponse, QuizSubmitRequest, QuizSubmitResponse, StudentQuestionResult,
    StudentResultDetailResponse, StudentResultResponse, StudentResultsResponse,
    StudentSubmissionDetail, SubmissionCheckResponse,
};
use crate::services::quiz_submission;

pub(super) async fn submit_quiz(
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
    Json(payload): Json<QuizSubmitRequest>,
) -> Result<(StatusCode, Json<QuizSubmitResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let receipt = quiz_submission::submit_interactive(
        state.db(),
        &student.id,
        &payload.quiz_id,
        &payload.answers,
    )
    .await?;

    let message = if receipt.auto_graded {
        "Quiz submitted and graded"
    } else {
        "Quiz submitted; essay answers are pending teacher review"
    };

    Ok((
        StatusCode::CREATED,
        Json(QuizSubmitResponse {
            success: true,
            submission_id: receipt.submission.id,
            auto_graded: receipt.auto_graded,
            score: receipt.submission.score,
            total_points: receipt.submission.total_points,
            message: message.to_string(),
        }),
    ))
}

pub(super) async fn submit_quiz_pdf(
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<PdfSubmitResponse>), ApiError> {
    let form = read_pdf_form(&state, multipart).await?;
    let quiz_id = form
        .fields
        .get("quiz_id")
        .filter(|value| !value.is_empty())
        .cloned()
        .ok_or_else(|| ApiError::BadRequest("quiz_id is required".to_string()))?;

    quiz_submission::check_pdf_submittable(state.db(), &student.id, &quiz_id).await?;

    let key = format!(
        "quiz-answers/{}_{}_{}_{}",
        student.id,
        quiz_id,
        Uuid::new_v4(),
        form.safe_filename()
    );
    let stored = state
        .storage()
        .store(&key, &form.content_type, form.bytes)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to store uploaded file"))?;

    let receipt =
        match quiz_submission::submit_pdf(state.db(), &student.id, &quiz_id, &stored.reference)
            .await
        {
            Ok(receipt) => receipt,
            Err(err) => {
                discard_upload(&state, &key, &stored.reference).await;
                return Err(err.into());
            }
        };

    Ok((
        StatusCode::CREATED,
        Json(PdfSubmitResponse {
            success: true,
            submission_id: receipt.submission.id,
            file_path: stored.reference,
            message: "PDF submitted; awaiting teacher grading".to_string(),
        }),
    ))
}

/// Drops an answer sheet whose submission was refused so no object is left unreferenced.
async fn discard_upload(state: &AppState, key: &str, reference: &str) {
    if let Err(err) = state.storage().delete(key).await {
        tracing::warn!(
            error = %err,
            file_path = %reference,
            action = "quiz_submit_pdf",
            "Orphaned PDF upload could not be removed"
        );
    }
}

pub(super) async fn check_submission(
    Path(quiz_id): Path<String>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<SubmissionCheckResponse>, ApiError> {
    let submission =
        repositories::submissions::find_by_quiz_and_student(state.db(), &quiz_id, &student.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to check submission"))?;

    Ok(Json(SubmissionCheckResponse {
        has_submitted: submission.is_some(),
        submission_id: submission.map(|submission| submission.id),
    }))
}

pub(super) async fn list_results(
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<StudentResultsResponse>, ApiError> {
    let rows = repositories::submissions::list_results_for_student(state.db(), &student.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list quiz results"))?;

    Ok(Json(StudentResultsResponse {
        results: rows.into_iter().map(StudentResultResponse::from_row).collect(),
    }))
}

pub(super) async fn get_result(
    Path(submission_id): Path<String>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<StudentResultDetailResponse>, ApiError> {
    let row = repositories::submissions::find_result(state.db(), &submission_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch quiz result"))?;
    let Some(row) = row else {
        return Err(ApiError::NotFound("Submission not found".to_string()));
    };
    if row.student_id != student.id {
        return Err(ApiError::Forbidden("You can only view your own results"));
    }

    let graded = row.graded_at.is_some();
    let details =
        repositories::answers::list_question_details(state.db(), &[submission_id.clone()])
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch question details"))?;

    Ok(Json(StudentResultDetailResponse {
        submission: StudentSubmissionDetail {
            result: StudentResultResponse::from_row(row),
            questions: details
                .into_iter()
                .map(|detail| StudentQuestionResult::from_row(detail, graded))
                .collect(),
        },
    }))
}
