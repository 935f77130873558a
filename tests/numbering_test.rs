//! Integration tests for display-number allocation across reset windows.

mod common;

use axum::http::{Method, StatusCode};
use chrono::NaiveDate;
use common::{response_json, TestApp};
use eduops_api::services::{
    numbering::{self, DocumentKind},
    NumberingSettings,
};
use rstest::rstest;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::ConnectionTrait;
use serde_json::json;
use std::str::FromStr;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[rstest]
#[case(DocumentKind::Quote, date(2024, 12, 31), date(2025, 1, 1), "QT-2024-002", "QT-2025-001")]
#[case(DocumentKind::Request, date(2024, 12, 31), date(2025, 1, 1), "REQ-2024-002", "REQ-2025-001")]
#[case(DocumentKind::Quotation, date(2025, 3, 14), date(2025, 3, 15), "2025/03/14-2", "2025/03/15-1")]
#[tokio::test]
async fn sequence_restarts_in_each_window(
    #[case] kind: DocumentKind,
    #[case] before: NaiveDate,
    #[case] after: NaiveDate,
    #[case] second_in_old_window: &str,
    #[case] first_in_new_window: &str,
) {
    let app = TestApp::new().await;
    let db = app.state.db.as_ref();

    numbering::next_number(db, kind, before).await.unwrap();
    let second = numbering::next_number(db, kind, before).await.unwrap();
    assert_eq!(second, second_in_old_window);

    let preview = numbering::preview_number(db, kind, after).await.unwrap();
    assert_eq!(preview, first_in_new_window);
    let rolled = numbering::next_number(db, kind, after).await.unwrap();
    assert_eq!(rolled, first_in_new_window);

    // The old window keeps counting where it left off
    let third = numbering::next_number(db, kind, before).await.unwrap();
    assert!(third.ends_with('3'));
}

#[tokio::test]
async fn quotation_over_http_uses_daily_number_and_derives_vat() {
    let app = TestApp::new().await;
    let prefix = NumberingSettings::from_config(&app.state.config)
        .unwrap()
        .calendar
        .today()
        .format("%Y/%m/%d")
        .to_string();

    let quotation = app
        .create(
            "/api/v1/quotations",
            json!({
                "recipient": "Daehan High",
                "title": "Spring camp",
                "items": [
                    { "description": "Robotics workshop", "quantity": 2, "unit_price": "150000" },
                    { "description": "Kits", "quantity": 30, "unit_price": "5500" }
                ]
            }),
        )
        .await;

    assert_eq!(quotation["quotation_number"], format!("{prefix}-1"));
    let money = |field: &str| {
        Decimal::from_str(quotation[field].as_str().expect("decimal string")).unwrap()
    };
    assert_eq!(money("supply_amount"), dec!(465000));
    assert_eq!(money("vat"), dec!(46500));
    assert_eq!(money("total_amount"), dec!(511500));

    let response = app
        .admin(
            Method::POST,
            "/api/v1/quotations",
            Some(json!({ "recipient": "Daehan High", "title": "Empty", "items": [] })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request(Method::GET, "/api/v1/quotations", None, Some(app.staff_token()))
        .await;
    assert_eq!(response_json(response).await["data"]["total"], 1);
}

/// Makes every quotation insert collide on its number: a trigger slips a row
/// holding the same number in first. The failed statement takes the extra
/// row with it, so each retry sees an identical table.
const SHADOW_NUMBER_TRIGGER: &str = r#"
CREATE TRIGGER shadow_quotation_number BEFORE INSERT ON quotations
BEGIN
    INSERT INTO quotations
        (id, quotation_number, recipient, title, items, supply_amount, vat, total_amount, created_by, created_at)
    VALUES
        (randomblob(16), NEW.quotation_number, 'shadow', 'shadow', '[]', 0, 0, 0, 'shadow', NEW.created_at);
END;
"#;

#[tokio::test]
async fn persistent_number_collisions_answer_409_and_leave_no_trace() {
    let app = TestApp::with_config(|cfg| cfg.numbering_max_retries = 2).await;
    let db = app.state.db.as_ref();
    db.execute_unprepared(SHADOW_NUMBER_TRIGGER).await.unwrap();

    let body = json!({
        "recipient": "Daehan High",
        "title": "Spring camp",
        "items": [{ "description": "Kits", "quantity": 1, "unit_price": "5500" }]
    });

    let response = app
        .admin(Method::POST, "/api/v1/quotations", Some(body.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let error = response_json(response).await;
    assert_eq!(error["error"], "Conflict");
    assert!(error["message"].as_str().unwrap().contains("2 attempts"));

    db.execute_unprepared("DROP TRIGGER shadow_quotation_number")
        .await
        .unwrap();

    // Every failed attempt rolled back, counter included
    let prefix = NumberingSettings::from_config(&app.state.config)
        .unwrap()
        .calendar
        .today()
        .format("%Y/%m/%d")
        .to_string();
    let quotation = app.create("/api/v1/quotations", body).await;
    assert_eq!(quotation["quotation_number"], format!("{prefix}-1"));
}
