mod handlers;
mod helpers;

use axum::{routing::get, Router};

use crate::api::quiz_submissions;
use crate::core::state::AppState;

/// Quiz catalog routes scoped under `/courses`.
pub(crate) fn course_router() -> Router<AppState> {
    Router::new().route(
        "/:course_id/quizzes",
        get(handlers::list_quizzes).post(handlers::create_quiz),
    )
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/:quiz_id",
            get(handlers::get_quiz).put(handlers::update_quiz).delete(handlers::delete_quiz),
        )
        .route("/:quiz_id/submissions", get(quiz_submissions::list_quiz_submissions))
}

#[cfg(test)]
mod tests;
