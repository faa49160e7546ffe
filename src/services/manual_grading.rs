//! Teacher-driven grading of essay answers and PDF answer sheets.

use std::collections::{HashMap, HashSet};

use sqlx::PgPool;
use thiserror::Error;

use crate::core::time::primitive_now_utc;
use crate::db::models::{QuizSubmission, User};
use crate::db::types::SubmissionType;
use crate::repositories;
use crate::repositories::answers::GradableAnswer;

#[derive(Debug, Error)]
pub(crate) enum GradingError {
    #[error("submission not found")]
    SubmissionNotFound,
    #[error("submission belongs to another teacher's course")]
    NotOwner,
    #[error("{0}")]
    InvalidGrade(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct QuestionGrade {
    pub(crate) question_id: String,
    pub(crate) points_awarded: f64,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct GradeInput {
    pub(crate) grades: Vec<QuestionGrade>,
    /// Overall score; only meaningful for PDF submissions, which have no answer rows.
    pub(crate) score: Option<f64>,
    pub(crate) feedback: Option<String>,
}

pub(crate) fn validate_grades(
    submission_type: SubmissionType,
    total_points: i32,
    gradable: &[GradableAnswer],
    input: &GradeInput,
) -> Result<(), GradingError> {
    match submission_type {
        SubmissionType::PdfUpload => {
            if !input.grades.is_empty() {
                return Err(GradingError::InvalidGrade(
                    "PDF submissions are graded with an overall score".to_string(),
                ));
            }
            let Some(score) = input.score else {
                return Err(GradingError::InvalidGrade(
                    "score is required for PDF submissions".to_string(),
                ));
            };
            if !score.is_finite() || score < 0.0 || score > f64::from(total_points) {
                return Err(GradingError::InvalidGrade(format!(
                    "score must be between 0 and {total_points}"
                )));
            }
            Ok(())
        }
        SubmissionType::Interactive => {
            if input.score.is_some() {
                return Err(GradingError::InvalidGrade(
                    "score is computed from question grades for interactive submissions"
                        .to_string(),
                ));
            }

            let max_points: HashMap<&str, i32> = gradable
                .iter()
                .map(|answer| (answer.question_id.as_str(), answer.max_points))
                .collect();
            let mut seen = HashSet::new();

            for grade in &input.grades {
                let Some(max) = max_points.get(grade.question_id.as_str()) else {
                    return Err(GradingError::InvalidGrade(format!(
                        "question {} has no answer in this submission",
                        grade.question_id
                    )));
                };
                if !seen.insert(grade.question_id.as_str()) {
                    return Err(GradingError::InvalidGrade(format!(
                        "question {} is graded more than once",
                        grade.question_id
                    )));
                }
                let points = grade.points_awarded;
                if !points.is_finite() || points < 0.0 || points > f64::from(*max) {
                    return Err(GradingError::InvalidGrade(format!(
                        "points for question {} must be between 0 and {max}",
                        grade.question_id
                    )));
                }
            }
            Ok(())
        }
    }
}

/// Applies a teacher's grades and re-derives the submission score from every answer row.
///
/// The submission row stays locked until commit, so overlapping grade requests serialize and
/// each one sums the answers the previous one committed.
pub(crate) async fn grade_submission(
    pool: &PgPool,
    grader: &User,
    submission_id: &str,
    input: GradeInput,
) -> Result<QuizSubmission, GradingError> {
    let mut tx = pool.begin().await?;

    let Some(target) = repositories::submissions::lock_for_grading(&mut *tx, submission_id).await?
    else {
        return Err(GradingError::SubmissionNotFound);
    };
    if !grader.manages_course_of(&target.teacher_id) {
        return Err(GradingError::NotOwner);
    }

    let gradable = repositories::answers::list_gradable(&mut *tx, submission_id).await?;
    validate_grades(target.submission_type, target.total_points, &gradable, &input)?;

    for grade in &input.grades {
        repositories::answers::apply_grade(
            &mut *tx,
            submission_id,
            &grade.question_id,
            grade.points_awarded,
        )
        .await?;
    }

    let score = match (target.submission_type, input.score) {
        (SubmissionType::PdfUpload, Some(score)) => score,
        _ => repositories::answers::sum_points(&mut *tx, submission_id).await?,
    };

    let submission = repositories::submissions::finalize(
        &mut *tx,
        submission_id,
        repositories::submissions::FinalizeGrade {
            score,
            graded_at: primitive_now_utc(),
            graded_by: Some(&grader.id),
            feedback: input.feedback.as_deref(),
        },
    )
    .await?;

    tx.commit().await?;

    crate::core::metrics::record_grading(target.submission_type.as_str());
    tracing::info!(
        user_id = %grader.id,
        quiz_id = %target.quiz_id,
        submission_id = %target.id,
        graded_questions = input.grades.len(),
        score,
        action = "quiz_grade",
        "Submission graded"
    );

    Ok(submission)
}
