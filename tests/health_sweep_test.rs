//! Webhook health sweep tests.
//!
//! Endpoints are served by wiremock; links live in an in-memory SQLite
//! database. Covers classification, eligibility, idempotence and the
//! commit-failure path.

mod common;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use sea_orm::{ActiveModelTrait, DbErr, IntoActiveModel, Set};
use webhook_manager::entities::HealthStatus;
use webhook_manager::error::{RegistryError, Result};
use webhook_manager::health::{check_all_webhooks, HealthPatch, HealthStore};
use webhook_manager::models::Link;
use webhook_manager::webhook::WebhookClient;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use common::{client, reload, seed_group, seed_link, seed_service, test_db};

async fn mock_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

#[tokio::test]
async fn sweep_classifies_links_and_skips_ineligible_ones() {
    let server = MockServer::start().await;
    mock_status(&server, "/ok", 200).await;
    mock_status(&server, "/gone", 404).await;

    let db = test_db().await;
    let group = seed_group(&db, "Chipotle Flips").await;
    let fooji = seed_service(&db, "Fooji").await;
    let promos = seed_service(&db, "Food Promos").await;
    let raffles = seed_service(&db, "Raffles").await;
    let drops = seed_service(&db, "Drops").await;

    let ok_url = format!("{}/ok", server.uri());
    let gone_url = format!("{}/gone", server.uri());

    let a = seed_link(&db, group.id, fooji.id, true, Some(&ok_url)).await;
    let b = seed_link(&db, group.id, promos.id, true, Some(&gone_url)).await;
    let c = seed_link(&db, group.id, raffles.id, false, Some(&ok_url)).await;
    let d = seed_link(&db, group.id, drops.id, true, None).await;

    // Give C previous health so "unchanged" is meaningful
    let mut active = c.clone().into_active_model();
    active.health_status = Set(Some(HealthStatus::Missing));
    active.health_code = Set(Some(404));
    active.health_checked_at = Set(Some(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()));
    let c = active.update(&db).await.expect("failed to update link");

    let report = check_all_webhooks(&db, &client()).await.expect("sweep should succeed");

    let a = reload(&db, a.id).await;
    assert_eq!(a.health_status, Some(HealthStatus::Ok));
    assert_eq!(a.health_code, Some(200));

    let b = reload(&db, b.id).await;
    assert_eq!(b.health_status, Some(HealthStatus::Missing));
    assert_eq!(b.health_code, Some(404));

    assert_eq!(reload(&db, c.id).await, c);
    assert_eq!(reload(&db, d.id).await, d);

    assert_eq!(report.checked, 2);
    assert_eq!(report.ok, 1);
    assert_eq!(report.missing, 1);
    assert_eq!(report.error, 0);
}

#[tokio::test]
async fn classifies_no_content_and_server_errors() {
    let server = MockServer::start().await;
    mock_status(&server, "/no-content", 204).await;
    mock_status(&server, "/broken", 500).await;
    mock_status(&server, "/unauthorized", 401).await;

    let db = test_db().await;
    let group = seed_group(&db, "Chipotle2").await;
    let s1 = seed_service(&db, "Fooji").await;
    let s2 = seed_service(&db, "Food Promos").await;
    let s3 = seed_service(&db, "Raffles").await;

    let no_content =
        seed_link(&db, group.id, s1.id, true, Some(&format!("{}/no-content", server.uri()))).await;
    let broken =
        seed_link(&db, group.id, s2.id, true, Some(&format!("{}/broken", server.uri()))).await;
    let unauthorized =
        seed_link(&db, group.id, s3.id, true, Some(&format!("{}/unauthorized", server.uri())))
            .await;

    check_all_webhooks(&db, &client()).await.expect("sweep should succeed");

    let no_content = reload(&db, no_content.id).await;
    assert_eq!(no_content.health_status, Some(HealthStatus::Ok));
    assert_eq!(no_content.health_code, Some(204));

    let broken = reload(&db, broken.id).await;
    assert_eq!(broken.health_status, Some(HealthStatus::Error));
    assert_eq!(broken.health_code, Some(500));

    let unauthorized = reload(&db, unauthorized.id).await;
    assert_eq!(unauthorized.health_status, Some(HealthStatus::Missing));
    assert_eq!(unauthorized.health_code, Some(401));
}

#[tokio::test]
async fn connection_failure_is_error_without_code_and_does_not_stop_sweep() {
    let server = MockServer::start().await;
    mock_status(&server, "/ok", 200).await;

    let db = test_db().await;
    let group = seed_group(&db, "Chipotle Flips").await;
    let s1 = seed_service(&db, "Fooji").await;
    let s2 = seed_service(&db, "Food Promos").await;

    // Nothing listens on the discard port
    let refused = seed_link(&db, group.id, s1.id, true, Some("http://127.0.0.1:9/hook")).await;
    let healthy = seed_link(&db, group.id, s2.id, true, Some(&format!("{}/ok", server.uri()))).await;

    let report = check_all_webhooks(&db, &client()).await.expect("sweep should succeed");

    let refused = reload(&db, refused.id).await;
    assert_eq!(refused.health_status, Some(HealthStatus::Error));
    assert_eq!(refused.health_code, None);
    assert!(refused.health_checked_at.is_some());

    let healthy = reload(&db, healthy.id).await;
    assert_eq!(healthy.health_status, Some(HealthStatus::Ok));
    assert_eq!(report.checked, 2);
    assert_eq!(report.error, 1);
}

#[tokio::test]
async fn timeout_is_error_without_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let db = test_db().await;
    let group = seed_group(&db, "Chipotle Flips").await;
    let service = seed_service(&db, "Fooji").await;
    let link = seed_link(&db, group.id, service.id, true, Some(&format!("{}/slow", server.uri()))).await;

    let client = WebhookClient::with_timeout(Duration::from_millis(200)).expect("client");
    check_all_webhooks(&db, &client).await.expect("sweep should succeed");

    let link = reload(&db, link.id).await;
    assert_eq!(link.health_status, Some(HealthStatus::Error));
    assert_eq!(link.health_code, None);
}

#[tokio::test]
async fn stamps_checked_at_after_sweep_start() {
    let server = MockServer::start().await;
    mock_status(&server, "/ok", 200).await;

    let db = test_db().await;
    let group = seed_group(&db, "Chipotle Flips").await;
    let service = seed_service(&db, "Fooji").await;
    let link = seed_link(&db, group.id, service.id, true, Some(&format!("{}/ok", server.uri()))).await;

    let started = Utc::now();
    check_all_webhooks(&db, &client()).await.expect("sweep should succeed");

    let checked_at = reload(&db, link.id).await.health_checked_at.expect("checked_at should be set");
    assert!(checked_at >= started);
}

#[tokio::test]
async fn repeated_sweeps_are_idempotent() {
    let server = MockServer::start().await;
    mock_status(&server, "/ok", 200).await;
    mock_status(&server, "/gone", 404).await;

    let db = test_db().await;
    let group = seed_group(&db, "Chipotle Flips").await;
    let s1 = seed_service(&db, "Fooji").await;
    let s2 = seed_service(&db, "Food Promos").await;
    let s3 = seed_service(&db, "Raffles").await;

    let ids = [
        seed_link(&db, group.id, s1.id, true, Some(&format!("{}/ok", server.uri()))).await.id,
        seed_link(&db, group.id, s2.id, true, Some(&format!("{}/gone", server.uri()))).await.id,
        seed_link(&db, group.id, s3.id, true, Some("http://127.0.0.1:9/hook")).await.id,
    ];

    check_all_webhooks(&db, &client()).await.expect("first sweep");
    let mut first = Vec::new();
    for id in ids {
        first.push(reload(&db, id).await);
    }

    check_all_webhooks(&db, &client()).await.expect("second sweep");
    for before in first {
        let after = reload(&db, before.id).await;
        assert_eq!(after.health_status, before.health_status);
        assert_eq!(after.health_code, before.health_code);
        assert!(after.health_checked_at >= before.health_checked_at);
    }
}

#[tokio::test]
async fn blank_webhook_url_is_left_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let db = test_db().await;
    let group = seed_group(&db, "Chipotle Flips").await;
    let service = seed_service(&db, "Fooji").await;
    let link = seed_link(&db, group.id, service.id, true, Some("")).await;

    let report = check_all_webhooks(&db, &client()).await.expect("sweep should succeed");

    assert_eq!(report.checked, 0);
    assert_eq!(reload(&db, link.id).await, link);
}

#[tokio::test]
async fn sweep_over_empty_registry_succeeds() {
    let db = test_db().await;
    let report = check_all_webhooks(&db, &client()).await.expect("sweep should succeed");
    assert_eq!(report.checked, 0);
    assert!(report.finished_at >= report.started_at);
}

/// Store whose commit always fails.
struct FailingStore {
    links: Vec<Link>,
}

#[async_trait]
impl HealthStore for FailingStore {
    async fn eligible_links(&self) -> Result<Vec<Link>> {
        Ok(self.links.clone())
    }

    async fn apply_health(&self, _patches: &[HealthPatch]) -> Result<()> {
        Err(RegistryError::Database(DbErr::Custom("commit failed".into())))
    }
}

#[tokio::test]
async fn commit_failure_propagates() {
    let server = MockServer::start().await;
    mock_status(&server, "/ok", 200).await;

    let db = test_db().await;
    let group = seed_group(&db, "Chipotle Flips").await;
    let service = seed_service(&db, "Fooji").await;
    let link = seed_link(&db, group.id, service.id, true, Some(&format!("{}/ok", server.uri()))).await;

    let store = FailingStore { links: vec![link] };
    let result = check_all_webhooks(&store, &client()).await;

    assert!(matches!(result, Err(RegistryError::Database(_))));
}
