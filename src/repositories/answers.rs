use crate::db::types::QuestionType;

pub(crate) struct NewAnswer<'a> {
    pub(crate) id: &'a str,
    pub(crate) submission_id: &'a str,
    pub(crate) question_id: &'a str,
    pub(crate) answer: &'a str,
    pub(crate) is_correct: Option<bool>,
    pub(crate) points_awarded: Option<f64>,
}

/// An answer row together with the maximum points of its question.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct GradableAnswer {
    pub(crate) question_id: String,
    pub(crate) max_points: i32,
}

/// One question of a submission's quiz, joined with the student's answer when there is one.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct QuestionDetailRow {
    pub(crate) submission_id: String,
    pub(crate) question_id: String,
    pub(crate) question_type: QuestionType,
    pub(crate) points: i32,
    pub(crate) question: String,
    pub(crate) option_a: Option<String>,
    pub(crate) option_b: Option<String>,
    pub(crate) option_c: Option<String>,
    pub(crate) option_d: Option<String>,
    pub(crate) correct_answer: Option<String>,
    pub(crate) essay_answer_key: Option<String>,
    pub(crate) answer: Option<String>,
    pub(crate) is_correct: Option<bool>,
    pub(crate) points_awarded: Option<f64>,
}

pub(crate) async fn insert(
    executor: impl sqlx::PgExecutor<'_>,
    params: NewAnswer<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO quiz_answers (id, submission_id, question_id, answer, is_correct, points_awarded)
         VALUES ($1,$2,$3,$4,$5,$6)",
    )
    .bind(params.id)
    .bind(params.submission_id)
    .bind(params.question_id)
    .bind(params.answer)
    .bind(params.is_correct)
    .bind(params.points_awarded)
    .execute(executor)
    .await?;

    Ok(())
}

pub(crate) async fn list_gradable(
    executor: impl sqlx::PgExecutor<'_>,
    submission_id: &str,
) -> Result<Vec<GradableAnswer>, sqlx::Error> {
    sqlx::query_as::<_, GradableAnswer>(
        "SELECT a.question_id, q.points AS max_points
         FROM quiz_answers a
         JOIN quiz_questions q ON q.id = a.question_id
         WHERE a.submission_id = $1",
    )
    .bind(submission_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn apply_grade(
    executor: impl sqlx::PgExecutor<'_>,
    submission_id: &str,
    question_id: &str,
    points_awarded: f64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE quiz_answers
         SET points_awarded = $1, is_correct = $1 > 0
         WHERE submission_id = $2 AND question_id = $3",
    )
    .bind(points_awarded)
    .bind(submission_id)
    .bind(question_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// Authoritative submission score: the sum over every answer row, ungraded rows counting as 0.
pub(crate) async fn sum_points(
    executor: impl sqlx::PgExecutor<'_>,
    submission_id: &str,
) -> Result<f64, sqlx::Error> {
    sqlx::query_scalar::<_, f64>(
        "SELECT COALESCE(SUM(points_awarded), 0)::DOUBLE PRECISION
         FROM quiz_answers
         WHERE submission_id = $1",
    )
    .bind(submission_id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn list_question_details(
    executor: impl sqlx::PgExecutor<'_>,
    submission_ids: &[String],
) -> Result<Vec<QuestionDetailRow>, sqlx::Error> {
    if submission_ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, QuestionDetailRow>(
        "SELECT s.id AS submission_id,
                q.id AS question_id,
                q.question_type,
                q.points,
                q.question,
                q.option_a,
                q.option_b,
                q.option_c,
                q.option_d,
                q.correct_answer,
                q.essay_answer_key,
                a.answer,
                a.is_correct,
                a.points_awarded
         FROM quiz_submissions s
         JOIN quiz_questions q ON q.quiz_id = s.quiz_id
         LEFT JOIN quiz_answers a ON a.submission_id = s.id AND a.question_id = q.id
         WHERE s.id = ANY($1)
         ORDER BY s.id, q.position, q.id",
    )
    .bind(submission_ids)
    .fetch_all(executor)
    .await
}
