mod commands;
mod queries;
mod types;

pub(crate) use commands::{finalize, insert_if_absent};
pub(crate) use queries::{
    find_by_quiz_and_student, find_result, list_for_quiz, list_results_for_student,
    lock_for_grading,
};
pub(crate) use types::{CreateSubmission, FinalizeGrade, StudentResultRow, TeacherSubmissionRow};
