use sqlx::types::Json;
use time::PrimitiveDateTime;

use crate::db::types::SubmissionType;

pub(crate) const COLUMNS: &str = "\
    id, quiz_id, student_id, submission_type, answers, uploaded_file_path, score, total_points, \
    submitted_at, graded_at, graded_by, feedback";

pub(crate) struct CreateSubmission<'a> {
    pub(crate) id: &'a str,
    pub(crate) quiz_id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) submission_type: SubmissionType,
    pub(crate) answers: Option<Json<serde_json::Value>>,
    pub(crate) uploaded_file_path: Option<&'a str>,
    pub(crate) score: Option<f64>,
    pub(crate) total_points: i32,
    pub(crate) submitted_at: PrimitiveDateTime,
    pub(crate) graded_at: Option<PrimitiveDateTime>,
}

pub(crate) struct FinalizeGrade<'a> {
    pub(crate) score: f64,
    pub(crate) graded_at: PrimitiveDateTime,
    pub(crate) graded_by: Option<&'a str>,
    pub(crate) feedback: Option<&'a str>,
}

/// Locked submission row plus the teacher who owns its course.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct GradingTarget {
    pub(crate) id: String,
    pub(crate) quiz_id: String,
    pub(crate) submission_type: SubmissionType,
    pub(crate) total_points: i32,
    pub(crate) teacher_id: String,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct TeacherSubmissionRow {
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
    pub(crate) submitted_at: PrimitiveDateTime,
    pub(crate) graded_at: Option<PrimitiveDateTime>,
    pub(crate) graded_by: Option<String>,
    pub(crate) feedback: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct StudentResultRow {
    pub(crate) submission_id: String,
    pub(crate) student_id: String,
    pub(crate) quiz_id: String,
    pub(crate) quiz_title: String,
    pub(crate) course_id: String,
    pub(crate) course_name: String,
    pub(crate) submission_type: SubmissionType,
    pub(crate) uploaded_file_path: Option<String>,
    pub(crate) score: Option<f64>,
    pub(crate) total_points: i32,
    pub(crate) submitted_at: PrimitiveDateTime,
    pub(crate) graded_at: Option<PrimitiveDateTime>,
    pub(crate) feedback: Option<String>,
}
