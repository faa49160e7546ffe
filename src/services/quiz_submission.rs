use std::collections::HashMap;

use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::core::time::primitive_now_utc;
use crate::db::models::{Quiz, QuizSubmission};
use crate::db::types::{QuizType, SubmissionType};
use crate::repositories;
use crate::services::auto_grading;

#[derive(Debug, Error)]
pub(crate) enum SubmissionError {
    #[error("quiz not found")]
    QuizNotFound,
    #[error("quiz is not accepting submissions")]
    QuizInactive,
    #[error("quiz expects {expected} submissions")]
    ModeMismatch { expected: &'static str },
    #[error("quiz already submitted")]
    AlreadySubmitted,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug)]
pub(crate) struct SubmissionReceipt {
    pub(crate) submission: QuizSubmission,
    pub(crate) auto_graded: bool,
}

fn ensure_accepts(quiz: &Quiz, mode: SubmissionType) -> Result<(), SubmissionError> {
    if !quiz.is_active {
        return Err(SubmissionError::QuizInactive);
    }
    match (quiz.quiz_type, mode) {
        (QuizType::Interactive, SubmissionType::Interactive)
        | (QuizType::Pdf, SubmissionType::PdfUpload) => Ok(()),
        (QuizType::Interactive, SubmissionType::PdfUpload) => {
            Err(SubmissionError::ModeMismatch { expected: "interactive" })
        }
        (QuizType::Pdf, SubmissionType::Interactive) => {
            Err(SubmissionError::ModeMismatch { expected: "pdf_upload" })
        }
    }
}

/// Records an interactive attempt and grades its multiple-choice answers in one transaction.
///
/// The quiz row is share-locked so a concurrent delete or question replacement waits for us.
pub(crate) async fn submit_interactive(
    pool: &PgPool,
    student_id: &str,
    quiz_id: &str,
    answers: &HashMap<String, Value>,
) -> Result<SubmissionReceipt, SubmissionError> {
    let mut tx = pool.begin().await?;

    let Some(quiz) = repositories::quizzes::lock_for_share(&mut *tx, quiz_id).await? else {
        return Err(SubmissionError::QuizNotFound);
    };
    ensure_accepts(&quiz, SubmissionType::Interactive)?;

    let questions = repositories::questions::list_by_quiz(&mut *tx, quiz_id).await?;
    let outcome = auto_grading::grade(&questions, answers);

    let now = primitive_now_utc();
    let submission_id = Uuid::new_v4().to_string();
    let raw_answers = Value::Object(answers.clone().into_iter().collect());

    let Some(submission) = repositories::submissions::insert_if_absent(
        &mut *tx,
        repositories::submissions::CreateSubmission {
            id: &submission_id,
            quiz_id,
            student_id,
            submission_type: SubmissionType::Interactive,
            answers: Some(Json(raw_answers)),
            uploaded_file_path: None,
            score: outcome.final_score(),
            total_points: quiz.total_points,
            submitted_at: now,
            graded_at: outcome.is_complete().then_some(now),
        },
    )
    .await?
    else {
        return Err(SubmissionError::AlreadySubmitted);
    };

    for answer in &outcome.answers {
        let answer_id = Uuid::new_v4().to_string();
        repositories::answers::insert(
            &mut *tx,
            repositories::answers::NewAnswer {
                id: &answer_id,
                submission_id: &submission.id,
                question_id: &answer.question_id,
                answer: &answer.answer,
                is_correct: answer.is_correct,
                points_awarded: answer.points_awarded,
            },
        )
        .await?;
    }

    tx.commit().await?;

    let auto_graded = outcome.is_complete();
    crate::core::metrics::record_submission(SubmissionType::Interactive.as_str(), auto_graded);
    tracing::info!(
        user_id = %student_id,
        quiz_id = %quiz_id,
        submission_id = %submission.id,
        answered = outcome.answers.len(),
        auto_graded,
        score = ?submission.score,
        action = "quiz_submit",
        "Quiz submitted"
    );

    Ok(SubmissionReceipt { submission, auto_graded })
}

/// Cheap pre-flight for PDF answers so nothing is uploaded for a submission that would be refused.
pub(crate) async fn check_pdf_submittable(
    pool: &PgPool,
    student_id: &str,
    quiz_id: &str,
) -> Result<Quiz, SubmissionError> {
    let Some(quiz) = repositories::quizzes::find_by_id(pool, quiz_id).await? else {
        return Err(SubmissionError::QuizNotFound);
    };
    ensure_accepts(&quiz, SubmissionType::PdfUpload)?;

    if repositories::submissions::find_by_quiz_and_student(pool, quiz_id, student_id)
        .await?
        .is_some()
    {
        return Err(SubmissionError::AlreadySubmitted);
    }

    Ok(quiz)
}

/// Records a PDF answer sheet. The score stays empty until a teacher grades it.
pub(crate) async fn submit_pdf(
    pool: &PgPool,
    student_id: &str,
    quiz_id: &str,
    file_reference: &str,
) -> Result<SubmissionReceipt, SubmissionError> {
    let mut tx = pool.begin().await?;

    let Some(quiz) = repositories::quizzes::lock_for_share(&mut *tx, quiz_id).await? else {
        return Err(SubmissionError::QuizNotFound);
    };
    ensure_accepts(&quiz, SubmissionType::PdfUpload)?;

    let submission_id = Uuid::new_v4().to_string();
    let Some(submission) = repositories::submissions::insert_if_absent(
        &mut *tx,
        repositories::submissions::CreateSubmission {
            id: &submission_id,
            quiz_id,
            student_id,
            submission_type: SubmissionType::PdfUpload,
            answers: None,
            uploaded_file_path: Some(file_reference),
            score: None,
            total_points: quiz.total_points,
            submitted_at: primitive_now_utc(),
            graded_at: None,
        },
    )
    .await?
    else {
        return Err(SubmissionError::AlreadySubmitted);
    };

    tx.commit().await?;

    crate::core::metrics::record_submission(SubmissionType::PdfUpload.as_str(), false);
    tracing::info!(
        user_id = %student_id,
        quiz_id = %quiz_id,
        submission_id = %submission.id,
        file_path = %file_reference,
        action = "quiz_submit_pdf",
        "PDF quiz submitted"
    );

    Ok(SubmissionReceipt { submission, auto_graded: false })
}
