use time::PrimitiveDateTime;

use crate::db::models::Quiz;
use crate::db::types::QuizType;

const COLUMNS: &str = "\
    id, title, description, course_id, quiz_type, pdf_file_path, time_limit, total_points, \
    is_active, due_date, created_at, updated_at";

pub(crate) struct CreateQuiz<'a> {
    pub(crate) id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) description: Option<&'a str>,
    pub(crate) course_id: &'a str,
    pub(crate) quiz_type: QuizType,
    pub(crate) pdf_file_path: Option<&'a str>,
    pub(crate) time_limit: Option<i32>,
    pub(crate) total_points: i32,
    pub(crate) is_active: bool,
    pub(crate) due_date: Option<PrimitiveDateTime>,
    pub(crate) created_at: PrimitiveDateTime,
}

/// Partial update; `None` keeps the stored value. `due_date` distinguishes "keep" (`None`)
/// from "clear" (`Some(None)`).
pub(crate) struct UpdateQuiz {
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) pdf_file_path: Option<String>,
    pub(crate) time_limit: Option<i32>,
    pub(crate) total_points: Option<i32>,
    pub(crate) is_active: Option<bool>,
    pub(crate) due_date: Option<Option<PrimitiveDateTime>>,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct QuizOwner {
    pub(crate) course_id: String,
    pub(crate) teacher_id: String,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateQuiz<'_>,
) -> Result<Quiz, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!(
        "INSERT INTO quizzes (
            id, title, description, course_id, quiz_type, pdf_file_path, time_limit,
            total_points, is_active, due_date, created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$11)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.title)
    .bind(params.description)
    .bind(params.course_id)
    .bind(params.quiz_type)
    .bind(params.pdf_file_path)
    .bind(params.time_limit)
    .bind(params.total_points)
    .bind(params.is_active)
    .bind(params.due_date)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Quiz>, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!("SELECT {COLUMNS} FROM quizzes WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Locks the quiz row against concurrent submissions while it is edited or deleted.
pub(crate) async fn lock_for_update(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Quiz>, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!("SELECT {COLUMNS} FROM quizzes WHERE id = $1 FOR UPDATE"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Shared lock taken by submissions so the quiz cannot be deleted or re-keyed underneath them.
pub(crate) async fn lock_for_share(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Quiz>, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!("SELECT {COLUMNS} FROM quizzes WHERE id = $1 FOR SHARE"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn list_by_course(
    executor: impl sqlx::PgExecutor<'_>,
    course_id: &str,
) -> Result<Vec<Quiz>, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!(
        "SELECT {COLUMNS} FROM quizzes WHERE course_id = $1 ORDER BY created_at, id"
    ))
    .bind(course_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn find_owner(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
) -> Result<Option<QuizOwner>, sqlx::Error> {
    sqlx::query_as::<_, QuizOwner>(
        "SELECT q.course_id, c.teacher_id
         FROM quizzes q
         JOIN courses c ON c.id = q.course_id
         WHERE q.id = $1",
    )
    .bind(quiz_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn update(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    params: UpdateQuiz,
) -> Result<Quiz, sqlx::Error> {
    let (set_due_date, due_date) = match params.due_date {
        Some(value) => (true, value),
        None => (false, None),
    };

    sqlx::query_as::<_, Quiz>(&format!(
        "UPDATE quizzes SET
            title = COALESCE($1, title),
            description = COALESCE($2, description),
            pdf_file_path = COALESCE($3, pdf_file_path),
            time_limit = COALESCE($4, time_limit),
            total_points = COALESCE($5, total_points),
            is_active = COALESCE($6, is_active),
            due_date = CASE WHEN $7 THEN $8 ELSE due_date END,
            updated_at = $9
         WHERE id = $10
         RETURNING {COLUMNS}",
    ))
    .bind(params.title)
    .bind(params.description)
    .bind(params.pdf_file_path)
    .bind(params.time_limit)
    .bind(params.total_points)
    .bind(params.is_active)
    .bind(set_due_date)
    .bind(due_date)
    .bind(params.updated_at)
    .bind(id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn count_submissions(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM quiz_submissions WHERE quiz_id = $1")
        .bind(quiz_id)
        .fetch_one(executor)
        .await
}

pub(crate) async fn delete_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM quizzes WHERE id = $1").bind(id).execute(executor).await?;
    Ok(result.rows_affected())
}
