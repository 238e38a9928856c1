//! The operator API as a proxy-authenticated client sees it.

use salvo::http::StatusCode;
use serde_json::json;

use darkroom_test::component::config::AuthMethod;
use darkroom_test::component::booking::{NewBooking, create_booking};
use darkroom_test::component::lifecycle::soft_delete;
use darkroom_test::component::types::EntityKind;

use super::helpers::*;

async fn proxied() -> TestStudio {
    TestStudio::with(|settings| settings.auth.method = AuthMethod::Proxy).await
}

#[test_log::test(tokio::test)]
async fn healthcheck_needs_no_identity() {
    let test = proxied().await;
    let service = test.service();
    let response = TestRequest::get("/api/app/healthcheck")
        .send(&service)
        .await
        .assert_status(StatusCode::OK);
    assert_eq!(response.body, b"OK");
}

#[test_log::test(tokio::test)]
async fn identity_comes_from_proxy_headers() {
    let test = proxied().await;
    let service = test.service();

    TestRequest::get("/api/app/whoami")
        .send(&service)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    TestRequest::get("/api/app/whoami")
        .acting_as("u-9", "intern")
        .send(&service)
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let actor = TestRequest::get("/api/app/whoami")
        .acting_as("u-9", "editor")
        .header("x-actor-name", "Nour")
        .send(&service)
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(actor["id"], json!("u-9"));
    assert_eq!(actor["name"], json!("Nour"));
}

#[test_log::test(tokio::test)]
async fn maintenance_sweep_is_manager_only() {
    let test = proxied().await;
    let booking = create_booking(
        &test.studio,
        &reception(),
        NewBooking::new("Swept", date(5, 5)),
    )
    .await
    .expect("create");
    soft_delete(&test.studio, &reception(), EntityKind::Booking, &booking.id)
        .await
        .expect("delete");
    let service = test.service();

    TestRequest::post("/api/maintenance/sweep")
        .acting_as("u-reception", "reception")
        .send(&service)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    // Deleted just now: inside the retention window.
    let report = TestRequest::post("/api/maintenance/sweep")
        .acting_as("u-manager", "manager")
        .send(&service)
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(report["purged"], json!([]));
}

#[test_log::test(tokio::test)]
async fn sync_status_reflects_queue() {
    let test = proxied().await;
    test.go_offline();
    create_booking(
        &test.studio,
        &reception(),
        NewBooking::new("Queued", date(5, 6)),
    )
    .await
    .expect("create");
    let service = test.service();

    let status = TestRequest::get("/api/sync")
        .acting_as("u-photo", "photographer")
        .send(&service)
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(status["online"], json!(false));
    assert!(status["pending"].as_u64().is_some_and(|pending| pending > 0));
}
