use time::PrimitiveDateTime;

use crate::db::models::QuizQuestion;
use crate::db::types::QuestionType;

const COLUMNS: &str = "\
    id, quiz_id, position, question_type, points, question, option_a, option_b, option_c, \
    option_d, correct_answer, essay_answer_key, created_at";

pub(crate) struct CreateQuestion<'a> {
    pub(crate) id: &'a str,
    pub(crate) quiz_id: &'a str,
    pub(crate) position: i32,
    pub(crate) question_type: QuestionType,
    pub(crate) points: i32,
    pub(crate) question: &'a str,
    pub(crate) options: [Option<&'a str>; 4],
    pub(crate) correct_answer: Option<&'a str>,
    pub(crate) essay_answer_key: Option<&'a str>,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn insert(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateQuestion<'_>,
) -> Result<QuizQuestion, sqlx::Error> {
    let [option_a, option_b, option_c, option_d] = params.options;

    sqlx::query_as::<_, QuizQuestion>(&format!(
        "INSERT INTO quiz_questions (
            id, quiz_id, position, question_type, points, question,
            option_a, option_b, option_c, option_d, correct_answer, essay_answer_key, created_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.quiz_id)
    .bind(params.position)
    .bind(params.question_type)
    .bind(params.points)
    .bind(params.question)
    .bind(option_a)
    .bind(option_b)
    .bind(option_c)
    .bind(option_d)
    .bind(params.correct_answer)
    .bind(params.essay_answer_key)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn list_by_quiz(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
) -> Result<Vec<QuizQuestion>, sqlx::Error> {
    sqlx::query_as::<_, QuizQuestion>(&format!(
        "SELECT {COLUMNS} FROM quiz_questions WHERE quiz_id = $1 ORDER BY position, id"
    ))
    .bind(quiz_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn list_by_quizzes(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_ids: &[String],
) -> Result<Vec<QuizQuestion>, sqlx::Error> {
    if quiz_ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, QuizQuestion>(&format!(
        "SELECT {COLUMNS} FROM quiz_questions
         WHERE quiz_id = ANY($1)
         ORDER BY quiz_id, position, id"
    ))
    .bind(quiz_ids)
    .fetch_all(executor)
    .await
}

pub(crate) async fn delete_by_quiz(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM quiz_questions WHERE quiz_id = $1")
        .bind(quiz_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}
