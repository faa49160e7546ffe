use std::collections::HashMap;

use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::db::models::QuizQuestion;
use crate::db::types::QuestionType;
use crate::repositories;
use crate::schemas::quiz::{sum_points, QuestionCreate};

pub(super) async fn insert_questions(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    quiz_id: &str,
    questions: &[QuestionCreate],
    now: time::PrimitiveDateTime,
) -> Result<Vec<QuizQuestion>, ApiError> {
    let mut inserted = Vec::with_capacity(questions.len());

    for (position, question) in questions.iter().enumerate() {
        let question_id = Uuid::new_v4().to_string();
        let is_choice = question.question_type == QuestionType::MultipleChoice;
        let correct_letter = question.correct_letter().filter(|_| is_choice);
        let options = if is_choice { question.options() } else { [None; 4] };
        let essay_answer_key = question
            .essay_answer_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty() && !is_choice);

        let row = repositories::questions::insert(
            &mut **tx,
            repositories::questions::CreateQuestion {
                id: &question_id,
                quiz_id,
                position: i32::try_from(position).unwrap_or(i32::MAX),
                question_type: question.question_type,
                points: question.points,
                question: question.question.trim(),
                options,
                correct_answer: correct_letter.as_deref(),
                essay_answer_key,
                created_at: now,
            },
        )
        .await
        .map_err(|e| ApiError::internal(e, "Failed to create quiz question"))?;

        inserted.push(row);
    }

    Ok(inserted)
}

pub(super) fn group_by_quiz(questions: Vec<QuizQuestion>) -> HashMap<String, Vec<QuizQuestion>> {
    let mut grouped: HashMap<String, Vec<QuizQuestion>> = HashMap::new();
    for question in questions {
        grouped.entry(question.quiz_id.clone()).or_default().push(question);
    }
    grouped
}

/// Sum of points over the quiz's current questions.
pub(super) fn question_points(questions: &[QuizQuestion]) -> Result<i32, ApiError> {
    sum_points(questions.iter().map(|question| question.points))
        .ok_or_else(|| ApiError::BadRequest("sum of question points is too large".to_string()))
}
