use crate::db::models::QuizSubmission;

use super::types::{GradingTarget, StudentResultRow, TeacherSubmissionRow, COLUMNS};

const STUDENT_RESULT_SELECT: &str = "\
    SELECT s.id AS submission_id, s.student_id, s.quiz_id, q.title AS quiz_title, \
           q.course_id, c.title AS course_name, s.submission_type, s.uploaded_file_path, \
           s.score, s.total_points, s.submitted_at, s.graded_at, s.feedback \
    FROM quiz_submissions s \
    JOIN quizzes q ON q.id = s.quiz_id \
    JOIN courses c ON c.id = q.course_id";

pub(crate) async fn find_by_quiz_and_student(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
    student_id: &str,
) -> Result<Option<QuizSubmission>, sqlx::Error> {
    sqlx::query_as::<_, QuizSubmission>(&format!(
        "SELECT {COLUMNS} FROM quiz_submissions WHERE quiz_id = $1 AND student_id = $2"
    ))
    .bind(quiz_id)
    .bind(student_id)
    .fetch_optional(executor)
    .await
}

/// Row-locks the submission for the rest of the transaction and resolves its course owner.
pub(crate) async fn lock_for_grading(
    executor: impl sqlx::PgExecutor<'_>,
    submission_id: &str,
) -> Result<Option<GradingTarget>, sqlx::Error> {
    sqlx::query_as::<_, GradingTarget>(
        "SELECT s.id, s.quiz_id, s.submission_type, s.total_points, c.teacher_id
         FROM quiz_submissions s
         JOIN quizzes q ON q.id = s.quiz_id
         JOIN courses c ON c.id = q.course_id
         WHERE s.id = $1
         FOR UPDATE OF s",
    )
    .bind(submission_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn list_for_quiz(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
) -> Result<Vec<TeacherSubmissionRow>, sqlx::Error> {
    sqlx::query_as::<_, TeacherSubmissionRow>(
        "SELECT s.id,
                s.quiz_id,
                q.title AS quiz_title,
                s.student_id,
                u.full_name AS student_name,
                u.email AS student_email,
                s.submission_type,
                s.uploaded_file_path,
                s.score,
                s.total_points,
                s.submitted_at,
                s.graded_at,
                s.graded_by,
                s.feedback
         FROM quiz_submissions s
         JOIN quizzes q ON q.id = s.quiz_id
         JOIN users u ON u.id = s.student_id
         WHERE s.quiz_id = $1
         ORDER BY s.submitted_at, s.id",
    )
    .bind(quiz_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn list_results_for_student(
    executor: impl sqlx::PgExecutor<'_>,
    student_id: &str,
) -> Result<Vec<StudentResultRow>, sqlx::Error> {
    sqlx::query_as::<_, StudentResultRow>(&format!(
        "{STUDENT_RESULT_SELECT} WHERE s.student_id = $1 ORDER BY s.submitted_at DESC, s.id"
    ))
    .bind(student_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn find_result(
    executor: impl sqlx::PgExecutor<'_>,
    submission_id: &str,
) -> Result<Option<StudentResultRow>, sqlx::Error> {
    sqlx::query_as::<_, StudentResultRow>(&format!("{STUDENT_RESULT_SELECT} WHERE s.id = $1"))
        .bind(submission_id)
        .fetch_optional(executor)
        .await
}
