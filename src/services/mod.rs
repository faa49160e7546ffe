pub(crate) mod auto_grading;
pub(crate) mod manual_grading;
pub(crate) mod quiz_submission;
pub(crate) mod storage;
