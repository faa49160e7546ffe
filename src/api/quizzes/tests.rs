use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::test_support;

fn quiz_payload() -> serde_json::Value {
    json!({
        "title": "Cell biology check",
        "description": "Chapter 3",
        "quiz_type": "interactive",
        "time_limit": 20,
        "due_date": "2030-05-01 18:00",
        "questions": [
            {
                "question_type": "multiple_choice",
                "points": 10,
                "question": "Powerhouse of the cell?",
                "option_a": "Mitochondria",
                "option_b": "Nucleus",
                "option_c": "Ribosome",
                "option_d": "Golgi",
                "correct_answer": "a"
            },
            {
                "question_type": "essay",
                "points": 20,
                "question": "Describe osmosis.",
                "essay_answer_key": "Water moves across a membrane"
            }
        ]
    })
}

async fn create_quiz(
    ctx: &test_support::TestContext,
    token: &str,
    course_id: &str,
    payload: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/courses/{course_id}/quizzes"),
            Some(token),
            Some(payload),
        ))
        .await
        .expect("create quiz");
    let status = response.status();
    (status, test_support::read_json(response).await)
}

async fn send(
    ctx: &test_support::TestContext,
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

#[tokio::test]
#[ignore = "requires the PostgreSQL test database"]
async fn teacher_creates_quiz_and_students_do_not_see_answer_keys() {
    let ctx = test_support::setup_test_context().await;

    let teacher = test_support::insert_teacher(ctx.state.db(), "owner@school.test").await;
    let student = test_support::insert_student(ctx.state.db(), "pupil@school.test").await;
    let course = test_support::insert_course(ctx.state.db(), "Biology", &teacher.id).await;
    let teacher_token = test_support::bearer_token(&teacher, ctx.state.settings());
    let student_token = test_support::bearer_token(&student, ctx.state.settings());

    let (status, created) = create_quiz(&ctx, &teacher_token, &course.id, quiz_payload()).await;
    assert_eq!(status, StatusCode::CREATED, "response: {created}");
    assert_eq!(created["success"], true);
    let quiz_id = created["quiz_id"].as_str().expect("quiz id").to_string();

    let (status, quizzes) = send(
        &ctx,
        Method::GET,
        &format!("/api/courses/{}/quizzes", course.id),
        &teacher_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {quizzes}");
    let quizzes = quizzes.as_array().expect("quiz list");
    assert_eq!(quizzes.len(), 1);
    assert_eq!(quizzes[0]["id"], quiz_id);
    assert_eq!(quizzes[0]["total_points"], 30);
    assert_eq!(quizzes[0]["due_date"], "2030-05-01T18:00:00Z");
    let questions = quizzes[0]["questions"].as_array().expect("questions");
    assert_eq!(questions.len(), 2);
    assert_eq!(questions[0]["correct_answer"], "A");
    assert_eq!(questions[1]["essay_answer_key"], "Water moves across a membrane");

    let (status, quiz) =
        send(&ctx, Method::GET, &format!("/api/quizzes/{quiz_id}"), &student_token, None).await;
    assert_eq!(status, StatusCode::OK, "response: {quiz}");
    let questions = quiz["questions"].as_array().expect("questions");
    assert_eq!(questions[0]["option_a"], "Mitochondria");
    assert!(questions[0].get("correct_answer").is_none());
    assert!(questions[1].get("essay_answer_key").is_none());
}

#[tokio::test]
#[ignore = "requires the PostgreSQL test database"]
async fn quiz_creation_enforces_ownership_and_input_rules() {
    let ctx = test_support::setup_test_context().await;

    let owner = test_support::insert_teacher(ctx.state.db(), "owner@school.test").await;
    let outsider = test_support::insert_teacher(ctx.state.db(), "outsider@school.test").await;
    let student = test_support::insert_student(ctx.state.db(), "pupil@school.test").await;
    let course = test_support::insert_course(ctx.state.db(), "Biology", &owner.id).await;
    let owner_token = test_support::bearer_token(&owner, ctx.state.settings());
    let outsider_token = test_support::bearer_token(&outsider, ctx.state.settings());
    let student_token = test_support::bearer_token(&student, ctx.state.settings());

    let (status, _) = create_quiz(&ctx, &outsider_token, &course.id, quiz_payload()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = create_quiz(&ctx, &student_token, &course.id, quiz_payload()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = create_quiz(&ctx, &owner_token, "missing-course", quiz_payload()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let mut untitled = quiz_payload();
    untitled["title"] = json!("   ");
    let (status, _) = create_quiz(&ctx, &owner_token, &course.id, untitled).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut oversized = quiz_payload();
    oversized["questions"][0]["points"] = json!(2_000_000_000);
    oversized["questions"][1]["points"] = json!(2_000_000_000);
    let (status, body) = create_quiz(&ctx, &owner_token, &course.id, oversized).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");

    let mut bad_due_date = quiz_payload();
    bad_due_date["due_date"] = json!("sometime next week");
    let (status, body) = create_quiz(&ctx, &owner_token, &course.id, bad_due_date).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");

    let mut wrong_total = quiz_payload();
    wrong_total["total_points"] = json!(100);
    let (status, _) = create_quiz(&ctx, &owner_token, &course.id, wrong_total).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut bad_letter = quiz_payload();
    bad_letter["questions"][0]["correct_answer"] = json!("Z");
    let (status, _) = create_quiz(&ctx, &owner_token, &course.id, bad_letter).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let quizzes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quizzes")
        .fetch_one(ctx.state.db())
        .await
        .expect("count quizzes");
    let questions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quiz_questions")
        .fetch_one(ctx.state.db())
        .await
        .expect("count questions");
    assert_eq!((quizzes, questions), (0, 0));
}

#[tokio::test]
#[ignore = "requires the PostgreSQL test database"]
async fn deleting_quiz_is_blocked_once_students_submit() {
    let ctx = test_support::setup_test_context().await;

    let teacher = test_support::insert_teacher(ctx.state.db(), "owner@school.test").await;
    let student = test_support::insert_student(ctx.state.db(), "pupil@school.test").await;
    let course = test_support::insert_course(ctx.state.db(), "Biology", &teacher.id).await;
    let teacher_token = test_support::bearer_token(&teacher, ctx.state.settings());
    let student_token = test_support::bearer_token(&student, ctx.state.settings());

    let (_, first) = create_quiz(&ctx, &teacher_token, &course.id, quiz_payload()).await;
    let submitted_quiz = first["quiz_id"].as_str().expect("quiz id").to_string();
    let (_, second) = create_quiz(&ctx, &teacher_token, &course.id, quiz_payload()).await;
    let empty_quiz = second["quiz_id"].as_str().expect("quiz id").to_string();

    let (status, body) = send(
        &ctx,
        Method::POST,
        "/api/quiz-submissions",
        &student_token,
        Some(json!({"quiz_id": submitted_quiz, "answers": {}})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");

    let (status, body) = send(
        &ctx,
        Method::DELETE,
        &format!("/api/quizzes/{submitted_quiz}"),
        &teacher_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT, "response: {body}");

    let (status, body) =
        send(&ctx, Method::DELETE, &format!("/api/quizzes/{empty_quiz}"), &teacher_token, None)
            .await;
    assert_eq!(status, StatusCode::OK, "response: {body}");

    let (status, _) =
        send(&ctx, Method::GET, &format!("/api/quizzes/{empty_quiz}"), &teacher_token, None)
            .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let orphaned: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM quiz_questions WHERE quiz_id = $1")
            .bind(&empty_quiz)
            .fetch_one(ctx.state.db())
            .await
            .expect("count questions");
    assert_eq!(orphaned, 0);
}

#[tokio::test]
#[ignore = "requires the PostgreSQL test database"]
async fn update_replaces_questions_only_before_submissions() {
    let ctx = test_support::setup_test_context().await;

    let teacher = test_support::insert_teacher(ctx.state.db(), "owner@school.test").await;
    let outsider = test_support::insert_teacher(ctx.state.db(), "outsider@school.test").await;
    let student = test_support::insert_student(ctx.state.db(), "pupil@school.test").await;
    let course = test_support::insert_course(ctx.state.db(), "Biology", &teacher.id).await;
    let teacher_token = test_support::bearer_token(&teacher, ctx.state.settings());
    let outsider_token = test_support::bearer_token(&outsider, ctx.state.settings());
    let student_token = test_support::bearer_token(&student, ctx.state.settings());

    let (_, created) = create_quiz(&ctx, &teacher_token, &course.id, quiz_payload()).await;
    let quiz_id = created["quiz_id"].as_str().expect("quiz id").to_string();
    let uri = format!("/api/quizzes/{quiz_id}");

    let replacement = json!({
        "title": "Cell biology (revised)",
        "due_date": null,
        "questions": [{
            "question_type": "multiple_choice",
            "points": 5,
            "question": "Largest organelle?",
            "option_a": "Nucleus",
            "option_b": "Vacuole",
            "correct_answer": "B"
        }]
    });

    let (status, _) =
        send(&ctx, Method::PUT, &uri, &outsider_token, Some(replacement.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) =
        send(&ctx, Method::PUT, &uri, &teacher_token, Some(replacement.clone())).await;
    assert_eq!(status, StatusCode::OK, "response: {updated}");
    assert_eq!(updated["title"], "Cell biology (revised)");
    assert_eq!(updated["total_points"], 5);
    assert_eq!(updated["due_date"], serde_json::Value::Null);
    assert_eq!(updated["questions"].as_array().map(Vec::len), Some(1));

    let (status, _) = send(
        &ctx,
        Method::PUT,
        &uri,
        &teacher_token,
        Some(json!({"total_points": 50})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &ctx,
        Method::POST,
        "/api/quiz-submissions",
        &student_token,
        Some(json!({"quiz_id": quiz_id, "answers": {}})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");

    let (status, _) = send(&ctx, Method::PUT, &uri, &teacher_token, Some(replacement)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, updated) =
        send(&ctx, Method::PUT, &uri, &teacher_token, Some(json!({"is_active": false}))).await;
    assert_eq!(status, StatusCode::OK, "response: {updated}");
    assert_eq!(updated["is_active"], false);
    assert_eq!(updated["title"], "Cell biology (revised)");
}
