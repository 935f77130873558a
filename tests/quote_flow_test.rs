//! Integration tests for quoting a school request.
//!
//! Tests cover:
//! - Fee derivation and the stored breakdown
//! - Request status moving to QUOTED
//! - Lookup by display number
//! - Validation and not-found errors
//! - Concurrent quote creation

mod common;

use std::{str::FromStr, sync::Arc};

use axum::http::{Method, StatusCode};
use chrono::Datelike;
use common::{response_json, TestApp};
use eduops_api::services::NumberingSettings;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::ConnectionTrait;
use serde_json::{json, Value};

fn money(value: &Value) -> Decimal {
    Decimal::from_str(value.as_str().expect("decimal rendered as string")).expect("decimal")
}

fn current_year(app: &TestApp) -> i32 {
    NumberingSettings::from_config(&app.state.config)
        .expect("numbering settings")
        .calendar
        .today()
        .year()
}

fn quote_body(request_id: &Value) -> Value {
    json!({
        "request_id": request_id,
        "session_fee": "100000",
        "transport_fee": "20000",
        "margin_rate": "0.15"
    })
}

#[tokio::test]
async fn quote_derives_totals_and_marks_request_quoted() {
    let app = TestApp::new().await;
    let request = app.submit_request().await;
    assert_eq!(request["status"], "SUBMITTED");

    let quote = app.create("/api/v1/quotes", quote_body(&request["id"])).await;

    assert_eq!(money(&quote["subtotal"]), dec!(120000));
    assert_eq!(money(&quote["margin_amount"]), dec!(18000));
    assert_eq!(money(&quote["vat"]), dec!(13800));
    assert_eq!(money(&quote["final_total"]), dec!(151800));
    assert_eq!(quote["created_by"], "Test Admin");

    let year = current_year(&app);
    assert_eq!(quote["quote_number"], format!("QT-{year}-001"));

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/school-requests/{}", request["id"].as_str().unwrap()),
            None,
            Some(app.staff_token()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["data"]["status"], "QUOTED");

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/quotes/by-number/QT-{year}-001"),
            None,
            Some(app.staff_token()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["data"]["id"], quote["id"]);
}

#[tokio::test]
async fn request_lists_its_quotes() {
    let app = TestApp::new().await;
    let request = app.submit_request().await;
    let first = app.create("/api/v1/quotes", quote_body(&request["id"])).await;
    let second = app.create("/api/v1/quotes", quote_body(&request["id"])).await;
    assert_ne!(first["quote_number"], second["quote_number"]);

    let response = app
        .request(
            Method::GET,
            &format!(
                "/api/v1/school-requests/{}/quotes",
                request["id"].as_str().unwrap()
            ),
            None,
            Some(app.staff_token()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn negative_fee_is_rejected_without_consuming_a_number() {
    let app = TestApp::new().await;
    let request = app.submit_request().await;

    let response = app
        .admin(
            Method::POST,
            "/api/v1/quotes",
            Some(json!({ "request_id": request["id"], "session_fee": "-1" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("session_fee"));

    let quote = app.create("/api/v1/quotes", quote_body(&request["id"])).await;
    assert!(quote["quote_number"].as_str().unwrap().ends_with("-001"));
}

#[tokio::test]
async fn oversized_fee_is_rejected_instead_of_crashing() {
    let app = TestApp::new().await;
    let request = app.submit_request().await;

    let response = app
        .admin(
            Method::POST,
            "/api/v1/quotes",
            Some(json!({
                "request_id": request["id"],
                "session_fee": Decimal::MAX.to_string(),
                "transport_fee": Decimal::MAX.to_string()
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("session_fee"));
}

#[tokio::test]
async fn numbering_continues_after_a_manually_renumbered_quote() {
    let app = TestApp::new().await;
    let request = app.submit_request().await;
    let year = current_year(&app);

    let first = app.create("/api/v1/quotes", quote_body(&request["id"])).await;
    assert_eq!(first["quote_number"], format!("QT-{year}-001"));

    // An operator fixes a number by hand, jumping ahead of the counter
    app.state
        .db
        .execute_unprepared(&format!(
            "UPDATE quotes SET quote_number = 'QT-{year}-002' WHERE quote_number = 'QT-{year}-001'"
        ))
        .await
        .unwrap();

    let next = app.create("/api/v1/quotes", quote_body(&request["id"])).await;
    assert_eq!(next["quote_number"], format!("QT-{year}-003"));
}

#[tokio::test]
async fn quote_for_unknown_request_is_404() {
    let app = TestApp::new().await;

    let response = app
        .admin(
            Method::POST,
            "/api/v1/quotes",
            Some(quote_body(&json!(uuid::Uuid::new_v4()))),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .request(
            Method::GET,
            "/api/v1/quotes/by-number/QT-1999-001",
            None,
            Some(app.staff_token()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn approved_request_no_longer_accepts_quotes() {
    let app = TestApp::new().await;
    let request = app.submit_request().await;
    let id = request["id"].as_str().unwrap();
    app.create("/api/v1/quotes", quote_body(&request["id"])).await;

    let response = app
        .admin(
            Method::PUT,
            &format!("/api/v1/school-requests/{id}/status"),
            Some(json!({ "status": "APPROVED" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .admin(Method::POST, "/api/v1/quotes", Some(quote_body(&request["id"])))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Going back is never allowed
    let response = app
        .admin(
            Method::PUT,
            &format!("/api/v1/school-requests/{id}/status"),
            Some(json!({ "status": "SUBMITTED" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn concurrent_quotes_get_distinct_gap_free_numbers() {
    let app = Arc::new(TestApp::new().await);
    let request = app.submit_request().await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let app = app.clone();
        let body = quote_body(&request["id"]);
        handles.push(tokio::spawn(async move {
            let response = app.admin(Method::POST, "/api/v1/quotes", Some(body)).await;
            assert_eq!(response.status(), StatusCode::CREATED);
            response_json(response).await["data"]["quote_number"]
                .as_str()
                .unwrap()
                .to_string()
        }));
    }

    let mut numbers = Vec::new();
    for handle in handles {
        numbers.push(handle.await.unwrap());
    }
    numbers.sort();

    let year = current_year(&app);
    let expected: Vec<String> = (1..=8).map(|n| format!("QT-{year}-{n:03}")).collect();
    assert_eq!(numbers, expected);
}
