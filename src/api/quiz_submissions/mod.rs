mod student;
mod teacher;

use axum::{routing::get, routing::post, Router};

use crate::core::state::AppState;

pub(crate) use teacher::list_quiz_submissions;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        // Student endpoints
        .route("/", post(student::submit_quiz))
        .route("/pdf", post(student::submit_quiz_pdf))
        .route("/check/:quiz_id", get(student::check_submission))
        // Teacher endpoints
        .route("/grade", post(teacher::grade_submission))
}

/// Student-facing result routes scoped under `/student`.
pub(crate) fn results_router() -> Router<AppState> {
    Router::new()
        .route("/quiz-results", get(student::list_results))
        .route("/quiz-results/:submission_id", get(student::get_result))
}

#[cfg(test)]
mod tests;
