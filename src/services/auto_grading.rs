//! Submission-time grading of multiple-choice answers.
//!
//! Pure functions over the quiz's questions and the student's answer map; the caller persists
//! the outcome. Essay answers are recorded ungraded and keep the submission pending.

use std::collections::HashMap;

use serde_json::Value;

use crate::db::models::QuizQuestion;
use crate::db::types::QuestionType;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GradedAnswer {
    pub(crate) question_id: String,
    pub(crate) answer: String,
    pub(crate) is_correct: Option<bool>,
    pub(crate) points_awarded: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AutoGradeOutcome {
    pub(crate) answers: Vec<GradedAnswer>,
    pub(crate) auto_score: f64,
    pub(crate) has_essay: bool,
}

impl AutoGradeOutcome {
    /// Final score when nothing is left for a teacher, `None` while essays await review.
    pub(crate) fn final_score(&self) -> Option<f64> {
        (!self.has_essay).then_some(self.auto_score)
    }

    pub(crate) fn is_complete(&self) -> bool {
        !self.has_essay
    }
}

/// Renders a submitted answer value as the text stored on the answer row.
///
/// Strings are trimmed, numbers and booleans are printed; `null`, arrays and objects are
/// rejected.
pub(crate) fn coerce_answer(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

pub(crate) fn is_correct_choice(answer: &str, correct: &str) -> bool {
    let answer = answer.trim();
    !answer.is_empty() && answer.eq_ignore_ascii_case(correct.trim())
}

pub(crate) fn grade(questions: &[QuizQuestion], answers: &HashMap<String, Value>) -> AutoGradeOutcome {
    let has_essay = questions.iter().any(|q| q.question_type == QuestionType::Essay);
    let mut graded = Vec::with_capacity(answers.len());
    let mut auto_score = 0.0;

    for question in questions {
        let Some(raw) = answers.get(&question.id) else {
            continue;
        };

        let Some(answer) = coerce_answer(raw) else {
            tracing::warn!(
                question_id = %question.id,
                kind = value_kind(raw),
                "Skipping unparseable answer"
            );
            continue;
        };

        match question.question_type {
            QuestionType::MultipleChoice => {
                let correct = question
                    .correct_answer
                    .as_deref()
                    .map(|expected| is_correct_choice(&answer, expected))
                    .unwrap_or(false);
                let points = if correct { f64::from(question.points) } else { 0.0 };
                auto_score += points;
                graded.push(GradedAnswer {
                    question_id: question.id.clone(),
                    answer,
                    is_correct: Some(correct),
                    points_awarded: Some(points),
                });
            }
            QuestionType::Essay => graded.push(GradedAnswer {
                question_id: question.id.clone(),
                answer,
                is_correct: None,
                points_awarded: None,
            }),
        }
    }

    let unknown = answers.keys().filter(|id| !questions.iter().any(|q| &q.id == *id)).count();
    if unknown > 0 {
        tracing::warn!(unknown, "Ignoring answers for questions outside the quiz");
    }

    AutoGradeOutcome { answers: graded, auto_score, has_essay }
}

/// `score / total_points * 100`, only for graded submissions with a positive total.
pub(crate) fn percentage(score: Option<f64>, total_points: i32) -> Option<f64> {
    let score = score?;
    if total_points <= 0 {
        return None;
    }
    Some(score / f64::from(total_points) * 100.0)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
