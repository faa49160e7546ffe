pub(crate) mod answers;
pub(crate) mod courses;
pub(crate) mod questions;
pub(crate) mod quizzes;
pub(crate) mod submissions;
pub(crate) mod users;
