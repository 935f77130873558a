//! Integration tests for the unauthenticated website endpoints and the
//! role guards on the back office.

mod common;

use axum::http::{Method, StatusCode};
use chrono::Datelike;
use common::{response_json, TestApp};
use eduops_api::{auth::Role, services::NumberingSettings};
use serde_json::json;

#[tokio::test]
async fn inline_school_request_registers_school_and_numbers_request() {
    let app = TestApp::new().await;
    let program = app.seed_program("Coding with Robots").await;
    let year = NumberingSettings::from_config(&app.state.config)
        .unwrap()
        .calendar
        .today()
        .year();

    let response = app
        .public(
            Method::POST,
            "/api/v1/public/school-requests",
            Some(json!({
                "school": { "name": "Hanbit Elementary School", "email": "office@hanbit.example" },
                "program_id": program["id"],
                "desired_date": "2025-05-20",
                "student_count": 28,
                "budget": "300000"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let request = response_json(response).await["data"].clone();
    assert_eq!(request["request_number"], format!("REQ-{year}-001"));
    assert_eq!(request["status"], "SUBMITTED");

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/schools/{}", request["school_id"].as_str().unwrap()),
            None,
            Some(app.staff_token()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response_json(response).await["data"]["name"],
        "Hanbit Elementary School"
    );
}

#[tokio::test]
async fn request_naming_both_or_neither_school_is_rejected() {
    let app = TestApp::new().await;
    let school = app.seed_school("Riverside High").await;

    for body in [
        json!({ "student_count": 10 }),
        json!({ "school_id": school["id"], "school": { "name": "Duplicate" } }),
    ] {
        let response = app
            .public(Method::POST, "/api/v1/public/school-requests", Some(body))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let response = app
        .public(
            Method::POST,
            "/api/v1/public/school-requests",
            Some(json!({ "school_id": uuid::Uuid::new_v4() })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn contact_form_lands_in_the_inbox() {
    let app = TestApp::new().await;

    let response = app
        .public(
            Method::POST,
            "/api/v1/public/contact",
            Some(json!({
                "name": "Lee Jiwon",
                "email": "jiwon@school.example",
                "organization": "Hanbit Elementary",
                "message": "Do you run programs in July?"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = response_json(response).await["data"].clone();
    assert_eq!(created["kind"], "CONTACT");
    assert_eq!(created["payload"]["email"], "jiwon@school.example");

    let response = app
        .request(
            Method::GET,
            "/api/v1/notifications?unread=true",
            None,
            Some(app.staff_token()),
        )
        .await;
    let inbox = response_json(response).await;
    assert_eq!(inbox["data"]["total"], 1);

    let response = app
        .request(
            Method::POST,
            &format!(
                "/api/v1/notifications/{}/read",
                created["id"].as_str().unwrap()
            ),
            None,
            Some(app.staff_token()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(
            Method::GET,
            "/api/v1/notifications?unread=true",
            None,
            Some(app.staff_token()),
        )
        .await;
    assert_eq!(response_json(response).await["data"]["total"], 0);
}

#[tokio::test]
async fn contact_without_valid_email_is_rejected() {
    let app = TestApp::new().await;
    let response = app
        .public(
            Method::POST,
            "/api/v1/public/contact",
            Some(json!({ "name": "Anon", "email": "not-an-email", "message": "hi" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn public_board_hides_drafts_and_pins_first() {
    let app = TestApp::new().await;
    app.create(
        "/api/v1/notices",
        json!({ "title": "Spring schedule", "content": "..." }),
    )
    .await;
    app.create(
        "/api/v1/notices",
        json!({ "title": "Holiday closure", "content": "...", "is_pinned": true }),
    )
    .await;
    app.create(
        "/api/v1/notices",
        json!({ "title": "Draft", "content": "...", "is_published": false }),
    )
    .await;

    let response = app.public(Method::GET, "/api/v1/public/notices", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["items"][0]["title"], "Holiday closure");
}

#[tokio::test]
async fn back_office_requires_a_token_and_role() {
    let app = TestApp::new().await;

    let response = app.public(Method::GET, "/api/v1/school-requests", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(
            Method::GET,
            "/api/v1/school-requests",
            None,
            Some("not-a-jwt"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let school_token = app.token_for(Role::School);
    let response = app
        .request(
            Method::GET,
            "/api/v1/school-requests",
            None,
            Some(&school_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Staff may read but not write
    let response = app
        .request(Method::GET, "/api/v1/schools", None, Some(app.staff_token()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = app
        .request(
            Method::POST,
            "/api/v1/schools",
            Some(json!({ "name": "Nope" })),
            Some(app.staff_token()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn absurd_page_number_returns_an_empty_page() {
    let app = TestApp::new().await;
    app.seed_school("Riverside High").await;

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/schools?page={}", u64::MAX),
            None,
            Some(app.staff_token()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn health_and_status_are_open() {
    let app = TestApp::new().await;

    let response = app.public(Method::GET, "/api/v1/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["checks"]["database"], "up");

    let response = app.public(Method::GET, "/api/v1/status", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["database"], "healthy");
    assert!(response_has_request_id(&body));
}

fn response_has_request_id(body: &serde_json::Value) -> bool {
    body["meta"]["request_id"].is_string()
}
