use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

pub(crate) use crate::core::time::format_primitive;
use crate::db::models::QuizSubmission;
use crate::db::types::{QuestionType, SubmissionType};
use crate::repositories::answers::QuestionDetailRow;
use crate::repositories::submissions::{StudentResultRow, TeacherSubmissionRow};
use crate::services::auto_grading::percentage;
use crate::services::manual_grading::{GradeInput, QuestionGrade};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuizSubmitRequest {
    #[serde(default)]
    #[serde(alias = "quizId")]
    #[validate(length(min = 1, message = "quiz_id is required"))]
    pub(crate) quiz_id: String,
    #[serde(default)]
    pub(crate) answers: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuizSubmitResponse {
    pub(crate) success: bool,
    pub(crate) submission_id: String,
    pub(crate) auto_graded: bool,
    pub(crate) score: Option<f64>,
    pub(crate) total_points: i32,
    pub(crate) message: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct PdfSubmitResponse {
    pub(crate) success: bool,
    pub(crate) submission_id: String,
    pub(crate) file_path: String,
    pub(crate) message: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionCheckResponse {
    pub(crate) has_submitted: bool,
    pub(crate) submission_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct GradeItem {
    #[serde(alias = "questionId")]
    #[validate(length(min = 1, message = "question_id is required"))]
    pub(crate) question_id: String,
    #[serde(alias = "pointsAwarded")]
    pub(crate) points_awarded: f64,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct GradeRequest {
    #[serde(default)]
    #[serde(alias = "submissionId")]
    #[validate(length(min = 1, message = "submission_id is required"))]
    pub(crate) submission_id: String,
    #[serde(default)]
    #[validate(nested)]
    pub(crate) grades: Vec<GradeItem>,
    #[serde(default)]
    pub(crate) score: Option<f64>,
    #[serde(default)]
    #[validate(length(max = 10000, message = "feedback is too long"))]
    pub(crate) feedback: Option<String>,
}

impl GradeRequest {
    pub(crate) fn into_input(self) -> (String, GradeInput) {
        let grades = self
            .grades
            .into_iter()
            .map(|item| QuestionGrade {
                question_id: item.question_id,
                points_awarded: item.points_awarded,
            })
            .collect();
        let feedback = self.feedback.filter(|text| !text.trim().is_empty());
        (self.submission_id, GradeInput { grades, score: self.score, feedback })
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct GradeResponse {
    pub(crate) success: bool,
    pub(crate) submission_id: String,
    pub(crate) score: Option<f64>,
    pub(crate) total_points: i32,
    pub(crate) graded_at: Option<String>,
}

impl GradeResponse {
    pub(crate) fn from_db(submission: QuizSubmission) -> Self {
        Self {
            success: true,
            submission_id: submission.id,
            score: submission.score,
            total_points: submission.total_points,
            graded_at: submission.graded_at.map(format_primitive),
        }
    }
}

/// Question as shown in the teacher grading view, with the student's answer when given.
#[derive(Debug, Serialize)]
pub(crate) struct QuestionDetailResponse {
    pub(crate) question_id: String,
    pub(crate) question_text: String,
    pub(crate) question_type: QuestionType,
    pub(crate) points: i32,
    pub(crate) option_a: Option<String>,
    pub(crate) option_b: Option<String>,
    pub(crate) option_c: Option<String>,
    pub(crate) option_d: Option<String>,
    pub(crate) student_answer: Option<String>,
    pub(crate) correct_answer: Option<String>,
    pub(crate) essay_answer_key: Option<String>,
    pub(crate) is_correct: Option<bool>,
    pub(crate) points_awarded: Option<f64>,
}

impl QuestionDetailResponse {
    pub(crate) fn from_row(row: QuestionDetailRow) -> Self {
        Self {
            question_id: row.question_id,
            question_text: row.question,
            question_type: row.question_type,
            points: row.points,
            option_a: row.option_a,
            option_b: row.option_b,
            option_c: row.option_c,
            option_d: row.option_d,
            student_answer: row.answer,
            correct_answer: row.correct_answer,
            essay_answer_key: row.essay_answer_key,
            is_correct: row.is_correct,
            points_awarded: row.points_awarded,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct TeacherSubmissionResponse {
    pub(crate) id: String,
    pub(crate) quiz_id: String,
    pub(crate) quiz_title: String,
    pub(crate) student_id: String,
    pub(crate) student_name: String,
    pub(crate) student_email: String,
    pub(crate) submission_type: SubmissionType,
    pub(crate) uploaded_file_path: Option<String>,
    pub(crate) score: Option<f64>,
    pub(crate) total_points: i32,
    pub(crate) submitted_at: String,
    pub(crate) graded_at: Option<String>,
    pub(crate) graded_by: Option<String>,
    pub(crate) feedback: Option<String>,
    pub(crate) is_graded: bool,
    pub(crate) question_details: Vec<QuestionDetailResponse>,
}

impl TeacherSubmissionResponse {
    pub(crate) fn from_row(row: TeacherSubmissionRow, details: Vec<QuestionDetailRow>) -> Self {
        Self {
            is_graded: row.graded_at.is_some(),
            id: row.id,
            quiz_id: row.quiz_id,
            quiz_title: row.quiz_title,
            student_id: row.student_id,
            student_name: row.student_name,
            student_email: row.student_email,
            submission_type: row.submission_type,
            uploaded_file_path: row.uploaded_file_path,
            score: row.score,
            total_points: row.total_points,
            submitted_at: format_primitive(row.submitted_at),
            graded_at: row.graded_at.map(format_primitive),
            graded_by: row.graded_by,
            feedback: row.feedback,
            question_details: details.into_iter().map(QuestionDetailResponse::from_row).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct TeacherSubmissionsResponse {
    pub(crate) submissions: Vec<TeacherSubmissionResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentResultResponse {
    pub(crate) submission_id: String,
    pub(crate) quiz_id: String,
    pub(crate) quiz_title: String,
    pub(crate) course_id: String,
    pub(crate) course_name: String,
    pub(crate) submission_type: SubmissionType,
    pub(crate) uploaded_file_path: Option<String>,
    pub(crate) score: Option<f64>,
    pub(crate) total_points: i32,
    pub(crate) percentage: Option<f64>,
    pub(crate) is_graded: bool,
    pub(crate) submitted_at: String,
    pub(crate) graded_at: Option<String>,
    pub(crate) feedback: Option<String>,
}

impl StudentResultResponse {
    pub(crate) fn from_row(row: StudentResultRow) -> Self {
        let is_graded = row.graded_at.is_some();
        // Pending submissions report neither score nor percentage.
        let score = row.score.filter(|_| is_graded);
        Self {
            percentage: percentage(score, row.total_points),
            is_graded,
            submission_id: row.submission_id,
            quiz_id: row.quiz_id,
            quiz_title: row.quiz_title,
            course_id: row.course_id,
            course_name: row.course_name,
            submission_type: row.submission_type,
            uploaded_file_path: row.uploaded_file_path,
            score,
            total_points: row.total_points,
            submitted_at: format_primitive(row.submitted_at),
            graded_at: row.graded_at.map(format_primitive),
            feedback: row.feedback,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentResultsResponse {
    pub(crate) results: Vec<StudentResultResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionOptions {
    #[serde(rename = "A")]
    pub(crate) a: Option<String>,
    #[serde(rename = "B")]
    pub(crate) b: Option<String>,
    #[serde(rename = "C")]
    pub(crate) c: Option<String>,
    #[serde(rename = "D")]
    pub(crate) d: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentQuestionResult {
    pub(crate) question_id: String,
    pub(crate) question_text: String,
    pub(crate) question_type: QuestionType,
    pub(crate) points: i32,
    pub(crate) options: QuestionOptions,
    pub(crate) student_answer: Option<String>,
    pub(crate) correct_answer: Option<String>,
    pub(crate) is_correct: Option<bool>,
    pub(crate) points_awarded: Option<f64>,
}

impl StudentQuestionResult {
    /// The correct letter is only revealed once the submission is graded; essay keys never are.
    pub(crate) fn from_row(row: QuestionDetailRow, graded: bool) -> Self {
        Self {
            question_id: row.question_id,
            question_text: row.question,
            question_type: row.question_type,
            points: row.points,
            options: QuestionOptions { a: row.option_a, b: row.option_b, c: row.option_c, d: row.option_d },
            student_answer: row.answer,
            correct_answer: row.correct_answer.filter(|_| graded),
            is_correct: row.is_correct,
            points_awarded: row.points_awarded,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentSubmissionDetail {
    #[serde(flatten)]
    pub(crate) result: StudentResultResponse,
    pub(crate) questions: Vec<StudentQuestionResult>,
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentResultDetailResponse {
    pub(crate) submission: StudentSubmissionDetail,
}
