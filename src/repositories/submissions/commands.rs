use crate::db::models::QuizSubmission;

use super::types::{CreateSubmission, FinalizeGrade, COLUMNS};

/// Inserts the submission unless one already exists for the (quiz, student) pair.
///
/// Returns `None` on a duplicate; concurrent inserts for the same pair wait on the unique index
/// and the loser observes `None`.
pub(crate) async fn insert_if_absent(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateSubmission<'_>,
) -> Result<Option<QuizSubmission>, sqlx::Error> {
    sqlx::query_as::<_, QuizSubmission>(&format!(
        "INSERT INTO quiz_submissions (
            id, quiz_id, student_id, submission_type, answers, uploaded_file_path,
            score, total_points, submitted_at, graded_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
         ON CONFLICT (quiz_id, student_id) DO NOTHING
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.quiz_id)
    .bind(params.student_id)
    .bind(params.submission_type)
    .bind(params.answers)
    .bind(params.uploaded_file_path)
    .bind(params.score)
    .bind(params.total_points)
    .bind(params.submitted_at)
    .bind(params.graded_at)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn finalize(
    executor: impl sqlx::PgExecutor<'_>,
    submission_id: &str,
    params: FinalizeGrade<'_>,
) -> Result<QuizSubmission, sqlx::Error> {
    sqlx::query_as::<_, QuizSubmission>(&format!(
        "UPDATE quiz_submissions
         SET score = $1, graded_at = $2, graded_by = $3, feedback = $4
         WHERE id = $5
         RETURNING {COLUMNS}",
    ))
    .bind(params.score)
    .bind(params.graded_at)
    .bind(params.graded_by)
    .bind(params.feedback)
    .bind(submission_id)
    .fetch_one(executor)
    .await
}
