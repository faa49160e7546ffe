use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{require_course_owner, require_quiz_owner, CurrentTeacher, CurrentUser};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::QuizType;
use crate::repositories;
use crate::schemas::quiz::{
    check_questions, parse_due_date, resolve_total_points, QuizCreate, QuizCreatedResponse,
    QuizDeletedResponse, QuizResponse, QuizUpdate,
};

use super::helpers;

pub(super) async fn create_quiz(
    Path(course_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<QuizCreate>,
) -> Result<(StatusCode, Json<QuizCreatedResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    payload.check().map_err(ApiError::BadRequest)?;

    let due_date = parse_due_date(payload.due_date.as_deref()).map_err(ApiError::BadRequest)?;
    let total_points =
        resolve_total_points(payload.quiz_type, &payload.questions, payload.total_points)
            .map_err(ApiError::BadRequest)?;

    let now = primitive_now_utc();
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    require_course_owner(&mut *tx, &course_id, &teacher).await?;

    let quiz_id = Uuid::new_v4().to_string();
    let quiz = repositories::quizzes::create(
        &mut *tx,
        repositories::quizzes::CreateQuiz {
            id: &quiz_id,
            title: payload.title.trim(),
            description: payload.description.as_deref(),
            course_id: &course_id,
            quiz_type: payload.quiz_type,
            pdf_file_path: payload.pdf_file_path.as_deref().filter(|path| !path.is_empty()),
            time_limit: payload.time_limit,
            total_points,
            is_active: payload.is_active,
            due_date,
            created_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create quiz"))?;

    let questions = helpers::insert_questions(&mut tx, &quiz.id, &payload.questions, now).await?;
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    tracing::info!(
        user_id = %teacher.id,
        course_id = %course_id,
        quiz_id = %quiz.id,
        questions = questions.len(),
        total_points,
        action = "quiz_create",
        "Quiz created"
    );

    Ok((
        StatusCode::CREATED,
        Json(QuizCreatedResponse {
            success: true,
            quiz_id: quiz.id,
            message: "Quiz created successfully".to_string(),
        }),
    ))
}

pub(super) async fn list_quizzes(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<QuizResponse>>, ApiError> {
    let owner = repositories::courses::find_owner(state.db(), &course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch course"))?;
    let Some(teacher_id) = owner else {
        return Err(ApiError::NotFound("Course not found".to_string()));
    };
    let reveal_keys = user.manages_course_of(&teacher_id);

    let quizzes = repositories::quizzes::list_by_course(state.db(), &course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list quizzes"))?;
    let quiz_ids = quizzes.iter().map(|quiz| quiz.id.clone()).collect::<Vec<_>>();
    let questions = repositories::questions::list_by_quizzes(state.db(), &quiz_ids)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list quiz questions"))?;
    let mut grouped = helpers::group_by_quiz(questions);

    let response = quizzes
        .into_iter()
        .map(|quiz| {
            let questions = grouped.remove(&quiz.id).unwrap_or_default();
            QuizResponse::from_db(quiz, questions, reveal_keys)
        })
        .collect();

    Ok(Json(response))
}

pub(super) async fn get_quiz(
    Path(quiz_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<QuizResponse>, ApiError> {
    let quiz = repositories::quizzes::find_by_id(state.db(), &quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch quiz"))?;
    let Some(quiz) = quiz else {
        return Err(ApiError::NotFound("Quiz not found".to_string()));
    };

    let reveal_keys = match repositories::courses::find_owner(state.db(), &quiz.course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch course"))?
    {
        Some(teacher_id) => user.manages_course_of(&teacher_id),
        None => false,
    };

    let questions = repositories::questions::list_by_quiz(state.db(), &quiz.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list quiz questions"))?;

    Ok(Json(QuizResponse::from_db(quiz, questions, reveal_keys)))
}

pub(super) async fn update_quiz(
    Path(quiz_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<QuizUpdate>,
) -> Result<Json<QuizResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let due_date = match &payload.due_date {
        Some(raw) => Some(parse_due_date(raw.as_deref()).map_err(ApiError::BadRequest)?),
        None => None,
    };

    let now = primitive_now_utc();
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    require_quiz_owner(&mut *tx, &quiz_id, &teacher).await?;

    let quiz = repositories::quizzes::lock_for_update(&mut *tx, &quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to lock quiz"))?;
    let Some(quiz) = quiz else {
        return Err(ApiError::NotFound("Quiz not found".to_string()));
    };

    let total_points = match &payload.questions {
        Some(questions) => {
            check_questions(quiz.quiz_type, questions).map_err(ApiError::BadRequest)?;

            let submissions = repositories::quizzes::count_submissions(&mut *tx, &quiz.id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to count submissions"))?;
            if submissions > 0 {
                return Err(ApiError::Conflict(
                    "Questions cannot be replaced after students have submitted".to_string(),
                ));
            }

            let total = resolve_total_points(quiz.quiz_type, questions, payload.total_points)
                .map_err(ApiError::BadRequest)?;

            repositories::questions::delete_by_quiz(&mut *tx, &quiz.id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to remove quiz questions"))?;
            helpers::insert_questions(&mut tx, &quiz.id, questions, now).await?;
            Some(total)
        }
        None => match (quiz.quiz_type, payload.total_points) {
            (QuizType::Interactive, Some(total)) => {
                let current = repositories::questions::list_by_quiz(&mut *tx, &quiz.id)
                    .await
                    .map_err(|e| ApiError::internal(e, "Failed to list quiz questions"))?;
                let sum = helpers::question_points(&current)?;
                if !current.is_empty() && sum != total {
                    return Err(ApiError::BadRequest(format!(
                        "total_points ({total}) must equal the sum of question points ({sum})"
                    )));
                }
                Some(total)
            }
            (_, total) => total,
        },
    };

    let updated = repositories::quizzes::update(
        &mut *tx,
        &quiz.id,
        repositories::quizzes::UpdateQuiz {
            title: payload.title.as_deref().map(str::trim).map(str::to_string),
            description: payload.description,
            pdf_file_path: payload.pdf_file_path,
            time_limit: payload.time_limit,
            total_points,
            is_active: payload.is_active,
            due_date,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update quiz"))?;

    let questions = repositories::questions::list_by_quiz(&mut *tx, &updated.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list quiz questions"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    tracing::info!(
        user_id = %teacher.id,
        quiz_id = %updated.id,
        replaced_questions = payload.questions.is_some(),
        action = "quiz_update",
        "Quiz updated"
    );

    Ok(Json(QuizResponse::from_db(updated, questions, true)))
}

pub(super) async fn delete_quiz(
    Path(quiz_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<QuizDeletedResponse>, ApiError> {
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    require_quiz_owner(&mut *tx, &quiz_id, &teacher).await?;

    let quiz = repositories::quizzes::lock_for_update(&mut *tx, &quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to lock quiz"))?;
    if quiz.is_none() {
        return Err(ApiError::NotFound("Quiz not found".to_string()));
    }

    let submissions = repositories::quizzes::count_submissions(&mut *tx, &quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count submissions"))?;
    if submissions > 0 {
        return Err(ApiError::Conflict(format!(
            "Quiz has {submissions} submission(s) and cannot be deleted"
        )));
    }

    repositories::quizzes::delete_by_id(&mut *tx, &quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete quiz"))?;
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    tracing::info!(user_id = %teacher.id, quiz_id = %quiz_id, action = "quiz_delete", "Quiz deleted");

    Ok(Json(QuizDeletedResponse { success: true, message: "Quiz deleted successfully".to_string() }))
}
