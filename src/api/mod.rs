pub(crate) mod auth;
pub(crate) mod errors;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod quiz_submissions;
pub(crate) mod quizzes;
pub(crate) mod router;
pub(crate) mod uploads;
pub(crate) mod validation;
