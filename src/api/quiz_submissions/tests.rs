use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::db::models::User;
use crate::test_support::{self, TestContext};

struct Classroom {
    teacher: User,
    student: User,
    teacher_token: String,
    student_token: String,
    course_id: String,
}

async fn classroom(ctx: &TestContext) -> Classroom {
    let teacher = test_support::insert_teacher(ctx.state.db(), "owner@school.test").await;
    let student = test_support::insert_student(ctx.state.db(), "pupil@school.test").await;
    let course = test_support::insert_course(ctx.state.db(), "Biology", &teacher.id).await;
    Classroom {
        teacher_token: test_support::bearer_token(&teacher, ctx.state.settings()),
        student_token: test_support::bearer_token(&student, ctx.state.settings()),
        teacher,
        student,
        course_id: course.id,
    }
}

async fn send(
    ctx: &TestContext,
    method: Method,
    uri: &str,
    token: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(method, uri, Some(token), body))
        .await
        .expect("response");
    let status = response.status();
    (status, test_support::read_json(response).await)
}

fn choice(points: i32, correct: &str) -> serde_json::Value {
    json!({
        "question_type": "multiple_choice",
        "points": points,
        "question": format!("Pick {correct}"),
        "option_a": "first",
        "option_b": "second",
        "option_c": "third",
        "option_d": "fourth",
        "correct_answer": correct
    })
}

fn essay(points: i32) -> serde_json::Value {
    json!({"question_type": "essay", "points": points, "question": "Explain diffusion."})
}

/// Creates a quiz and returns its id with question ids in display order.
async fn create_quiz(
    ctx: &TestContext,
    class: &Classroom,
    payload: serde_json::Value,
) -> (String, Vec<String>) {
    let (status, created) = send(
        ctx,
        Method::POST,
        &format!("/api/courses/{}/quizzes", class.course_id),
        &class.teacher_token,
        Some(payload),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "response: {created}");
    let quiz_id = created["quiz_id"].as_str().expect("quiz id").to_string();

    let (_, quiz) =
        send(ctx, Method::GET, &format!("/api/quizzes/{quiz_id}"), &class.teacher_token, None)
            .await;
    let question_ids = quiz["questions"]
        .as_array()
        .expect("questions")
        .iter()
        .map(|question| question["id"].as_str().expect("question id").to_string())
        .collect();
    (quiz_id, question_ids)
}

async fn submit(
    ctx: &TestContext,
    token: &str,
    quiz_id: &str,
    answers: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send(
        ctx,
        Method::POST,
        "/api/quiz-submissions",
        token,
        Some(json!({"quiz_id": quiz_id, "answers": answers})),
    )
    .await
}

#[tokio::test]
#[ignore = "requires the PostgreSQL test database"]
async fn multiple_choice_quiz_is_graded_on_submit_and_cannot_be_resubmitted() {
    let ctx = test_support::setup_test_context().await;
    let class = classroom(&ctx).await;
    let (quiz_id, questions) = create_quiz(
        &ctx,
        &class,
        json!({"title": "Quick check", "questions": [choice(10, "A"), choice(10, "C")]}),
    )
    .await;

    let answers = json!({questions[0].clone(): "a", questions[1].clone(): "B"});
    let (status, body) = submit(&ctx, &class.student_token, &quiz_id, answers.clone()).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    assert_eq!(body["auto_graded"], true);
    assert_eq!(body["score"], 10.0);
    assert_eq!(body["total_points"], 20);
    let submission_id = body["submission_id"].as_str().expect("submission id").to_string();

    let (status, _) = submit(&ctx, &class.student_token, &quiz_id, answers).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quiz_submissions WHERE quiz_id = $1")
        .bind(&quiz_id)
        .fetch_one(ctx.state.db())
        .await
        .expect("count submissions");
    assert_eq!(count, 1);

    let (status, check) = send(
        &ctx,
        Method::GET,
        &format!("/api/quiz-submissions/check/{quiz_id}"),
        &class.student_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(check["has_submitted"], true);
    assert_eq!(check["submission_id"], submission_id);

    let (status, results) =
        send(&ctx, Method::GET, "/api/student/quiz-results", &class.student_token, None).await;
    assert_eq!(status, StatusCode::OK, "response: {results}");
    let result = &results["results"][0];
    assert_eq!(result["is_graded"], true);
    assert_eq!(result["percentage"], 50.0);
    assert_eq!(result["course_name"], "Biology");
}

#[tokio::test]
#[ignore = "requires the PostgreSQL test database"]
async fn essay_grading_merges_with_auto_graded_points() {
    let ctx = test_support::setup_test_context().await;
    let class = classroom(&ctx).await;
    let (quiz_id, questions) = create_quiz(
        &ctx,
        &class,
        json!({"title": "Mixed", "questions": [choice(10, "A"), choice(10, "C"), essay(20)]}),
    )
    .await;

    let answers = json!({
        questions[0].clone(): "a",
        questions[1].clone(): "B",
        questions[2].clone(): "Particles spread out."
    });
    let (status, body) = submit(&ctx, &class.student_token, &quiz_id, answers).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    assert_eq!(body["auto_graded"], false);
    assert_eq!(body["score"], serde_json::Value::Null);
    let submission_id = body["submission_id"].as_str().expect("submission id").to_string();

    let (_, results) =
        send(&ctx, Method::GET, "/api/student/quiz-results", &class.student_token, None).await;
    assert_eq!(results["results"][0]["is_graded"], false);
    assert_eq!(results["results"][0]["percentage"], serde_json::Value::Null);

    let (_, detail) = send(
        &ctx,
        Method::GET,
        &format!("/api/student/quiz-results/{submission_id}"),
        &class.student_token,
        None,
    )
    .await;
    assert_eq!(detail["submission"]["questions"][0]["correct_answer"], serde_json::Value::Null);

    let (status, view) = send(
        &ctx,
        Method::GET,
        &format!("/api/quizzes/{quiz_id}/submissions"),
        &class.teacher_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {view}");
    let details = view["submissions"][0]["question_details"].as_array().expect("details");
    assert_eq!(details.len(), 3);
    assert_eq!(details[2]["student_answer"], "Particles spread out.");
    assert_eq!(details[2]["points_awarded"], serde_json::Value::Null);

    let grade = json!({
        "submission_id": submission_id,
        "grades": [{"question_id": questions[2], "points_awarded": 15}],
        "feedback": "Good explanation"
    });
    for _ in 0..2 {
        let (status, graded) = send(
            &ctx,
            Method::POST,
            "/api/quiz-submissions/grade",
            &class.teacher_token,
            Some(grade.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "response: {graded}");
        assert_eq!(graded["score"], 25.0);
        assert!(graded["graded_at"].is_string());
    }

    let (status, detail) = send(
        &ctx,
        Method::GET,
        &format!("/api/student/quiz-results/{submission_id}"),
        &class.student_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {detail}");
    let submission = &detail["submission"];
    assert_eq!(submission["score"], 25.0);
    assert_eq!(submission["percentage"], 62.5);
    assert_eq!(submission["feedback"], "Good explanation");
    let graded_questions = submission["questions"].as_array().expect("questions");
    assert_eq!(graded_questions[0]["is_correct"], true);
    assert_eq!(graded_questions[0]["points_awarded"], 10.0);
    assert_eq!(graded_questions[0]["correct_answer"], "A");
    assert_eq!(graded_questions[0]["options"]["A"], "first");
    assert_eq!(graded_questions[1]["is_correct"], false);
    assert_eq!(graded_questions[2]["is_correct"], true);
    assert_eq!(graded_questions[2]["points_awarded"], 15.0);

    let graded_by: Option<String> =
        sqlx::query_scalar("SELECT graded_by FROM quiz_submissions WHERE id = $1")
            .bind(&submission_id)
            .fetch_one(ctx.state.db())
            .await
            .expect("graded_by");
    assert_eq!(graded_by.as_deref(), Some(class.teacher.id.as_str()));
}

#[tokio::test]
#[ignore = "requires the PostgreSQL test database"]
async fn grading_rejects_foreign_teachers_and_invalid_points() {
    let ctx = test_support::setup_test_context().await;
    let class = classroom(&ctx).await;
    let outsider = test_support::insert_teacher(ctx.state.db(), "outsider@school.test").await;
    let outsider_token = test_support::bearer_token(&outsider, ctx.state.settings());
    let (quiz_id, questions) =
        create_quiz(&ctx, &class, json!({"title": "Essay", "questions": [essay(20)]})).await;

    let (_, body) =
        submit(&ctx, &class.student_token, &quiz_id, json!({questions[0].clone(): "Answer"}))
            .await;
    let submission_id = body["submission_id"].as_str().expect("submission id").to_string();

    let grade = |points: f64| {
        json!({
            "submission_id": submission_id,
            "grades": [{"question_id": questions[0], "points_awarded": points}]
        })
    };

    let (status, _) = send(
        &ctx,
        Method::POST,
        "/api/quiz-submissions/grade",
        &outsider_token,
        Some(grade(10.0)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &ctx,
        Method::POST,
        "/api/quiz-submissions/grade",
        &class.student_token,
        Some(grade(10.0)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &ctx,
        Method::POST,
        "/api/quiz-submissions/grade",
        &class.teacher_token,
        Some(grade(25.0)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &ctx,
        Method::POST,
        "/api/quiz-submissions/grade",
        &class.teacher_token,
        Some(json!({"submission_id": "missing", "grades": []})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (score, points): (Option<f64>, Option<f64>) = sqlx::query_as(
        "SELECT s.score, a.points_awarded
         FROM quiz_submissions s JOIN quiz_answers a ON a.submission_id = s.id
         WHERE s.id = $1",
    )
    .bind(&submission_id)
    .fetch_one(ctx.state.db())
    .await
    .expect("submission row");
    assert_eq!((score, points), (None, None));
}

#[tokio::test]
#[ignore = "requires the PostgreSQL test database"]
async fn submissions_respect_quiz_state_and_roles() {
    let ctx = test_support::setup_test_context().await;
    let class = classroom(&ctx).await;
    let (quiz_id, questions) = create_quiz(
        &ctx,
        &class,
        json!({"title": "Closed", "is_active": false, "questions": [choice(5, "B")]}),
    )
    .await;

    let (status, _) =
        submit(&ctx, &class.student_token, &quiz_id, json!({questions[0].clone(): "B"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) =
        submit(&ctx, &class.teacher_token, &quiz_id, json!({questions[0].clone(): "B"})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = submit(&ctx, &class.student_token, "missing-quiz", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &ctx,
        Method::POST,
        "/api/quiz-submissions",
        &class.student_token,
        Some(json!({"answers": {}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "requires the PostgreSQL test database"]
async fn concurrent_submissions_produce_exactly_one_record() {
    let ctx = test_support::setup_test_context().await;
    let class = classroom(&ctx).await;
    let (quiz_id, questions) =
        create_quiz(&ctx, &class, json!({"title": "Race", "questions": [choice(5, "D")]})).await;
    let answers = json!({questions[0].clone(): "d"});

    let (first, second) = tokio::join!(
        submit(&ctx, &class.student_token, &quiz_id, answers.clone()),
        submit(&ctx, &class.student_token, &quiz_id, answers.clone()),
    );
    let mut statuses = [first.0, second.0];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::CONFLICT]);

    let answer_rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quiz_answers")
        .fetch_one(ctx.state.db())
        .await
        .expect("count answers");
    assert_eq!(answer_rows, 1);
}

#[tokio::test]
#[ignore = "requires the PostgreSQL test database"]
async fn pdf_quiz_accepts_uploaded_answers_and_overall_grade() {
    let ctx = test_support::setup_test_context().await;
    let class = classroom(&ctx).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::multipart_request(
            "/api/uploads/quiz-pdf",
            &class.teacher_token,
            ("worksheet.pdf", "application/pdf", b"%PDF-1.4 worksheet".as_slice()),
            &[],
        ))
        .await
        .expect("upload quiz pdf");
    let status = response.status();
    let uploaded = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {uploaded}");
    let pdf_path = uploaded["file_path"].as_str().expect("file path").to_string();
    assert!(pdf_path.starts_with("/uploads/quiz-pdfs/"));

    let (quiz_id, _) = create_quiz(
        &ctx,
        &class,
        json!({"title": "Worksheet", "quiz_type": "pdf", "pdf_file_path": pdf_path}),
    )
    .await;

    let (status, _) = submit(&ctx, &class.student_token, &quiz_id, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::multipart_request(
            "/api/quiz-submissions/pdf",
            &class.student_token,
            ("notes.txt", "text/plain", b"not a pdf".as_slice()),
            &[("quiz_id", quiz_id.as_str())],
        ))
        .await
        .expect("reject non-pdf");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::multipart_request(
            "/api/quiz-submissions/pdf",
            &class.student_token,
            ("my answers.pdf", "application/pdf", b"%PDF-1.4 answers".as_slice()),
            &[("quiz_id", quiz_id.as_str())],
        ))
        .await
        .expect("submit pdf");
    let status = response.status();
    let submitted = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {submitted}");
    assert!(submitted["file_path"].as_str().unwrap_or_default().ends_with("my_answers.pdf"));
    let submission_id = submitted["submission_id"].as_str().expect("submission id").to_string();

    let (status, _) = send(
        &ctx,
        Method::POST,
        "/api/quiz-submissions/grade",
        &class.teacher_token,
        Some(json!({"submission_id": submission_id, "grades": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, graded) = send(
        &ctx,
        Method::POST,
        "/api/quiz-submissions/grade",
        &class.teacher_token,
        Some(json!({"submission_id": submission_id, "score": 80, "feedback": "Neat work"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {graded}");
    assert_eq!(graded["score"], 80.0);
    assert_eq!(graded["total_points"], 100);

    let (_, results) =
        send(&ctx, Method::GET, "/api/student/quiz-results", &class.student_token, None).await;
    assert_eq!(results["results"][0]["percentage"], 80.0);
    assert_eq!(results["results"][0]["submission_type"], "pdf_upload");
}

#[tokio::test]
#[ignore = "requires the PostgreSQL test database"]
async fn students_cannot_read_each_others_results() {
    let ctx = test_support::setup_test_context().await;
    let class = classroom(&ctx).await;
    let other = test_support::insert_student(ctx.state.db(), "other@school.test").await;
    let other_token = test_support::bearer_token(&other, ctx.state.settings());
    let (quiz_id, questions) =
        create_quiz(&ctx, &class, json!({"title": "Private", "questions": [choice(5, "A")]}))
            .await;

    let (_, body) =
        submit(&ctx, &class.student_token, &quiz_id, json!({questions[0].clone(): "A"})).await;
    let submission_id = body["submission_id"].as_str().expect("submission id");

    let (status, _) = send(
        &ctx,
        Method::GET,
        &format!("/api/student/quiz-results/{submission_id}"),
        &other_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, check) = send(
        &ctx,
        Method::GET,
        &format!("/api/quiz-submissions/check/{quiz_id}"),
        &other_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(check["has_submitted"], false);
}

#[tokio::test]
#[ignore = "requires the PostgreSQL test database"]
async fn separate_essay_grades_accumulate_into_one_score() {
    let ctx = test_support::setup_test_context().await;
    let class = classroom(&ctx).await;
    let (quiz_id, questions) = create_quiz(
        &ctx,
        &class,
        json!({"title": "Two essays", "questions": [choice(10, "A"), essay(20), essay(30)]}),
    )
    .await;

    let answers = json!({
        questions[0].clone(): "A",
        questions[1].clone(): "First essay",
        questions[2].clone(): "Second essay"
    });
    let (_, body) = submit(&ctx, &class.student_token, &quiz_id, answers).await;
    let submission_id = body["submission_id"].as_str().expect("submission id").to_string();

    let grade_one = |question_id: &str, points: i32| {
        json!({
            "submission_id": submission_id,
            "grades": [{"question_id": question_id, "points_awarded": points}]
        })
    };

    let (status, graded) = send(
        &ctx,
        Method::POST,
        "/api/quiz-submissions/grade",
        &class.teacher_token,
        Some(grade_one(&questions[1], 12)),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {graded}");
    assert_eq!(graded["score"], 22.0);

    let (status, graded) = send(
        &ctx,
        Method::POST,
        "/api/quiz-submissions/grade",
        &class.teacher_token,
        Some(grade_one(&questions[2], 25)),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {graded}");
    assert_eq!(graded["score"], 47.0);

    // Regrading both concurrently replaces the earlier points instead of adding to them.
    let (first, second) = tokio::join!(
        send(
            &ctx,
            Method::POST,
            "/api/quiz-submissions/grade",
            &class.teacher_token,
            Some(grade_one(&questions[1], 20)),
        ),
        send(
            &ctx,
            Method::POST,
            "/api/quiz-submissions/grade",
            &class.teacher_token,
            Some(grade_one(&questions[2], 5)),
        ),
    );
    assert_eq!((first.0, second.0), (StatusCode::OK, StatusCode::OK));

    let score: Option<f64> = sqlx::query_scalar("SELECT score FROM quiz_submissions WHERE id = $1")
        .bind(&submission_id)
        .fetch_one(ctx.state.db())
        .await
        .expect("score");
    assert_eq!(score, Some(35.0));

    let (_, detail) = send(
        &ctx,
        Method::GET,
        &format!("/api/student/quiz-results/{submission_id}"),
        &class.student_token,
        None,
    )
    .await;
    let graded_questions = detail["submission"]["questions"].as_array().expect("questions");
    assert_eq!(graded_questions[0]["points_awarded"], 10.0);
    assert_eq!(graded_questions[1]["points_awarded"], 20.0);
    assert_eq!(graded_questions[2]["points_awarded"], 5.0);
}

#[tokio::test]
#[ignore = "requires the PostgreSQL test database"]
async fn refused_pdf_submissions_leave_no_stored_file() {
    let ctx = test_support::setup_test_context().await;
    let class = classroom(&ctx).await;
    let (quiz_id, _) = create_quiz(
        &ctx,
        &class,
        json!({"title": "Worksheet", "quiz_type": "pdf", "pdf_file_path": "/uploads/quiz-pdfs/w.pdf"}),
    )
    .await;

    let upload = || {
        ctx.app.clone().oneshot(test_support::multipart_request(
            "/api/quiz-submissions/pdf",
            &class.student_token,
            ("answers.pdf", "application/pdf", b"%PDF-1.4 answers".as_slice()),
            &[("quiz_id", quiz_id.as_str())],
        ))
    };
    let (first, second) = tokio::join!(upload(), upload());
    let mut statuses =
        [first.expect("first upload").status(), second.expect("second upload").status()];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::CONFLICT]);

    let prefix = format!("{}_{}_", class.student.id, quiz_id);
    let answers_dir =
        std::path::Path::new(&ctx.state.settings().storage().upload_dir).join("quiz-answers");
    let mut stored = 0;
    let mut entries = tokio::fs::read_dir(&answers_dir).await.expect("answers dir");
    while let Some(entry) = entries.next_entry().await.expect("dir entry") {
        if entry.file_name().to_string_lossy().starts_with(&prefix) {
            stored += 1;
        }
    }
    assert_eq!(stored, 1);
}

#[tokio::test]
#[ignore = "requires the PostgreSQL test database"]
async fn tokens_carrying_a_stale_role_are_rejected() {
    let ctx = test_support::setup_test_context().await;
    let class = classroom(&ctx).await;

    let forged = crate::core::security::create_access_token(
        &class.student.id,
        crate::db::types::UserRole::Teacher,
        ctx.state.settings(),
        None,
    )
    .expect("token");

    let (status, _) = send(&ctx, Method::GET, "/api/auth/me", &forged, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, me) = send(&ctx, Method::GET, "/api/auth/me", &class.student_token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["role"], "student");
}
