//! Renewal API tests.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use certward_core::binding::SiteState;
use common::TestFixture;

#[tokio::test]
async fn test_status_before_any_pass() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/renewals/status").await;

    assert_status!(response, StatusCode::OK);
    assert_json_path!(response.body, "running", json!(false));
    assert_json_path!(response.body, "pass_in_progress", json!(false));
    assert_json_path!(response.body, "last_pass", json!(null));
}

#[tokio::test]
async fn test_renewal_pass_processes_due_and_skips_stopped() {
    let fixture = TestFixture::new().await;
    let due = fixture.create_web_item("Due", "due.example.com", &[]).await;
    let stopped = fixture
        .create_web_item("Stopped", "stopped.example.com", &[])
        .await;
    fixture
        .binding
        .set_site_state(&stopped, SiteState::Stopped)
        .await;

    let response = fixture.post_empty("/api/v1/renewals").await;

    assert_status!(response, StatusCode::OK);
    let results = response.body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["item"]["id"], json!(due));
    assert_eq!(results[0]["success"], json!(true));

    let skipped = response.body["skipped"].as_array().unwrap();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0]["item_id"], json!(stopped));
    assert_eq!(skipped[0]["reason"], json!("site_stopped"));
    assert_eq!(
        skipped[0]["message"],
        json!("Site stopped, renewal skipped as domain validation cannot be performed")
    );

    let status = fixture.get("/api/v1/renewals/status").await;
    let last_pass = &status.body["last_pass"];
    assert_eq!(last_pass["triggered_by"], json!("api"));
    assert_eq!(last_pass["processed"], json!(1));
    assert_eq!(last_pass["succeeded"], json!(1));
    assert_eq!(last_pass["skipped"], json!(1));
}

#[tokio::test]
async fn test_renewal_pass_policy_override() {
    let fixture = TestFixture::new().await;
    fixture.create_web_item("New", "new.example.com", &[]).await;

    // Never-renewed items count as 30 days old, inside a 60 day interval.
    let response = fixture
        .post("/api/v1/renewals", json!({ "renewal_interval_days": 60 }))
        .await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["results"].as_array().unwrap().len(), 0);
    let skipped = response.body["skipped"].as_array().unwrap();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0]["reason"], json!("certificate_still_valid"));
    assert!(fixture.provider.calls().await.is_empty());
}

#[tokio::test]
async fn test_renewal_pass_ignores_items_outside_auto_renew() {
    let fixture = TestFixture::new().await;
    let response = fixture
        .post(
            "/api/v1/items",
            json!({
                "name": "Manual only",
                "item_type": "manual",
                "include_in_auto_renew": false,
                "request_config": { "primary_domain": "manual.example.com" }
            }),
        )
        .await;
    assert_status!(response, StatusCode::CREATED);

    let response = fixture.post_empty("/api/v1/renewals").await;
    assert_status!(response, StatusCode::OK);
    assert!(response.body["results"].as_array().unwrap().is_empty());
    assert!(response.body["skipped"].as_array().unwrap().is_empty());

    let response = fixture
        .post("/api/v1/renewals", json!({ "auto_renew_only": false }))
        .await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["results"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_renewal_pass_is_audited() {
    let fixture = TestFixture::new().await;
    fixture.create_web_item("Due", "due.example.com", &[]).await;

    let response = fixture.post_empty("/api/v1/renewals").await;
    assert_status!(response, StatusCode::OK);

    let started = fixture
        .wait_for_audit("event_type=renewal_pass_started&actor=api", 1)
        .await;
    assert_eq!(started.len(), 1);
    fixture
        .wait_for_audit("event_type=renewal_pass_completed", 1)
        .await;
}
