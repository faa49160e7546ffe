use serde::{Deserialize, Deserializer, Serialize};
use time::PrimitiveDateTime;
use validator::Validate;

pub(crate) use crate::core::time::format_primitive;
use crate::core::time::parse_flexible_datetime;
use crate::db::models::{Quiz, QuizQuestion};
use crate::db::types::{QuestionType, QuizType};

pub(crate) const DEFAULT_PDF_TOTAL_POINTS: i32 = 100;
const CHOICE_LETTERS: [&str; 4] = ["A", "B", "C", "D"];

#[derive(Debug, Clone, Deserialize, Validate)]
pub(crate) struct QuestionCreate {
    #[serde(alias = "questionType", alias = "type")]
    pub(crate) question_type: QuestionType,
    #[validate(range(min = 1, max = 10_000, message = "points must be between 1 and 10000"))]
    pub(crate) points: i32,
    #[serde(default)]
    #[validate(length(min = 1, message = "question must not be empty"))]
    pub(crate) question: String,
    #[serde(default)]
    #[serde(alias = "optionA")]
    pub(crate) option_a: Option<String>,
    #[serde(default)]
    #[serde(alias = "optionB")]
    pub(crate) option_b: Option<String>,
    #[serde(default)]
    #[serde(alias = "optionC")]
    pub(crate) option_c: Option<String>,
    #[serde(default)]
    #[serde(alias = "optionD")]
    pub(crate) option_d: Option<String>,
    #[serde(default)]
    #[serde(alias = "correctAnswer")]
    pub(crate) correct_answer: Option<String>,
    #[serde(default)]
    #[serde(alias = "essayAnswerKey")]
    pub(crate) essay_answer_key: Option<String>,
}

impl QuestionCreate {
    pub(crate) fn options(&self) -> [Option<&str>; 4] {
        [&self.option_a, &self.option_b, &self.option_c, &self.option_d]
            .map(|option| option.as_deref().map(str::trim).filter(|value| !value.is_empty()))
    }

    /// Upper-cased correct letter of a multiple-choice question.
    pub(crate) fn correct_letter(&self) -> Option<String> {
        self.correct_answer.as_deref().and_then(normalize_choice)
    }

    pub(crate) fn check(&self, index: usize) -> Result<(), String> {
        let number = index + 1;
        match self.question_type {
            QuestionType::MultipleChoice => {
                let options = self.options();
                if options[0].is_none() || options[1].is_none() {
                    return Err(format!("question {number}: options A and B are required"));
                }
                let Some(letter) = self.correct_letter() else {
                    return Err(format!("question {number}: correct_answer must be one of A, B, C, D"));
                };
                let slot = CHOICE_LETTERS.iter().position(|candidate| *candidate == letter);
                if slot.and_then(|slot| options[slot]).is_none() {
                    return Err(format!("question {number}: correct_answer points to an empty option"));
                }
                Ok(())
            }
            QuestionType::Essay => {
                if self.correct_answer.as_deref().is_some_and(|value| !value.trim().is_empty()) {
                    return Err(format!(
                        "question {number}: essay questions use essay_answer_key, not correct_answer"
                    ));
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuizCreate {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 255, message = "title must be 1-255 characters"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default = "default_quiz_type")]
    #[serde(alias = "quizType", alias = "type")]
    pub(crate) quiz_type: QuizType,
    #[serde(default)]
    #[serde(alias = "pdfFilePath")]
    pub(crate) pdf_file_path: Option<String>,
    #[serde(default)]
    #[serde(alias = "timeLimit")]
    #[validate(range(min = 1, message = "time_limit must be positive"))]
    pub(crate) time_limit: Option<i32>,
    #[serde(default)]
    #[serde(alias = "totalPoints")]
    #[validate(range(min = 1, message = "total_points must be positive"))]
    pub(crate) total_points: Option<i32>,
    #[serde(default = "default_true")]
    #[serde(alias = "isActive")]
    pub(crate) is_active: bool,
    #[serde(default)]
    #[serde(alias = "dueDate")]
    pub(crate) due_date: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub(crate) questions: Vec<QuestionCreate>,
}

impl QuizCreate {
    /// Structural checks that go beyond field-level validation.
    pub(crate) fn check(&self) -> Result<(), String> {
        check_questions(self.quiz_type, &self.questions)
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub(crate) struct QuizUpdate {
    #[serde(default, deserialize_with = "trimmed_option")]
    #[validate(length(min = 1, max = 255, message = "title must be 1-255 characters"))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    #[serde(alias = "pdfFilePath")]
    pub(crate) pdf_file_path: Option<String>,
    #[serde(default)]
    #[serde(alias = "timeLimit")]
    #[validate(range(min = 1, message = "time_limit must be positive"))]
    pub(crate) time_limit: Option<i32>,
    #[serde(default)]
    #[serde(alias = "totalPoints")]
    #[validate(range(min = 1, message = "total_points must be positive"))]
    pub(crate) total_points: Option<i32>,
    #[serde(default)]
    #[serde(alias = "isActive")]
    pub(crate) is_active: Option<bool>,
    /// Absent keeps the current due date, `null` or `""` clears it.
    #[serde(default, deserialize_with = "double_option")]
    #[serde(alias = "dueDate")]
    pub(crate) due_date: Option<Option<String>>,
    #[serde(default)]
    #[validate(nested)]
    pub(crate) questions: Option<Vec<QuestionCreate>>,
}

pub(crate) fn check_questions(quiz_type: QuizType, questions: &[QuestionCreate]) -> Result<(), String> {
    if quiz_type == QuizType::Pdf && !questions.is_empty() {
        return Err("pdf quizzes do not take questions".to_string());
    }
    questions.iter().enumerate().try_for_each(|(index, question)| question.check(index))
}

/// Total points stored on the quiz.
///
/// Interactive quizzes with questions always total the sum of their question points; a supplied
/// value must agree with it.
pub(crate) fn resolve_total_points(
    quiz_type: QuizType,
    questions: &[QuestionCreate],
    supplied: Option<i32>,
) -> Result<i32, String> {
    match quiz_type {
        QuizType::Pdf => Ok(supplied.unwrap_or(DEFAULT_PDF_TOTAL_POINTS)),
        QuizType::Interactive if questions.is_empty() => {
            Ok(supplied.unwrap_or(DEFAULT_PDF_TOTAL_POINTS))
        }
        QuizType::Interactive => {
            let sum = sum_points(questions.iter().map(|question| question.points))
                .ok_or_else(|| "sum of question points is too large".to_string())?;
            match supplied {
                Some(total) if total != sum => Err(format!(
                    "total_points ({total}) must equal the sum of question points ({sum})"
                )),
                _ => Ok(sum),
            }
        }
    }
}

/// Overflow-checked sum; `None` when the total does not fit the `total_points` column.
pub(crate) fn sum_points(points: impl IntoIterator<Item = i32>) -> Option<i32> {
    points.into_iter().try_fold(0i32, |total, points| total.checked_add(points))
}

pub(crate) fn parse_due_date(raw: Option<&str>) -> Result<Option<PrimitiveDateTime>, String> {
    let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    parse_flexible_datetime(raw)
        .map(Some)
        .ok_or_else(|| format!("due_date has an unsupported format: {raw}"))
}

pub(crate) fn normalize_choice(raw: &str) -> Option<String> {
    let letter = raw.trim().to_ascii_uppercase();
    CHOICE_LETTERS.contains(&letter.as_str()).then_some(letter)
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) id: String,
    pub(crate) quiz_id: String,
    pub(crate) question_type: QuestionType,
    pub(crate) points: i32,
    pub(crate) question: String,
    pub(crate) option_a: Option<String>,
    pub(crate) option_b: Option<String>,
    pub(crate) option_c: Option<String>,
    pub(crate) option_d: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) correct_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) essay_answer_key: Option<String>,
}

impl QuestionResponse {
    pub(crate) fn from_db(question: QuizQuestion, reveal_keys: bool) -> Self {
        Self {
            id: question.id,
            quiz_id: question.quiz_id,
            question_type: question.question_type,
            points: question.points,
            question: question.question,
            option_a: question.option_a,
            option_b: question.option_b,
            option_c: question.option_c,
            option_d: question.option_d,
            correct_answer: question.correct_answer.filter(|_| reveal_keys),
            essay_answer_key: question.essay_answer_key.filter(|_| reveal_keys),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct QuizResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) course_id: String,
    pub(crate) quiz_type: QuizType,
    pub(crate) pdf_file_path: Option<String>,
    pub(crate) time_limit: Option<i32>,
    pub(crate) total_points: i32,
    pub(crate) is_active: bool,
    pub(crate) due_date: Option<String>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
    pub(crate) questions: Vec<QuestionResponse>,
}

impl QuizResponse {
    pub(crate) fn from_db(quiz: Quiz, questions: Vec<QuizQuestion>, reveal_keys: bool) -> Self {
        Self {
            id: quiz.id,
            title: quiz.title,
            description: quiz.description,
            course_id: quiz.course_id,
            quiz_type: quiz.quiz_type,
            pdf_file_path: quiz.pdf_file_path,
            time_limit: quiz.time_limit,
            total_points: quiz.total_points,
            is_active: quiz.is_active,
            due_date: quiz.due_date.map(format_primitive),
            created_at: format_primitive(quiz.created_at),
            updated_at: format_primitive(quiz.updated_at),
            questions: questions
                .into_iter()
                .map(|question| QuestionResponse::from_db(question, reveal_keys))
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct QuizCreatedResponse {
    pub(crate) success: bool,
    pub(crate) quiz_id: String,
    pub(crate) message: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuizDeletedResponse {
    pub(crate) success: bool,
    pub(crate) message: String,
}

fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(|value| value.trim().to_string())
}

fn trimmed_option<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(|value| value.map(|v| v.trim().to_string()))
}

fn default_quiz_type() -> QuizType {
    QuizType::Interactive
}

fn default_true() -> bool {
    true
}
