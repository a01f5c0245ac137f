//! Shared fixtures for integration tests.

#![allow(dead_code)]

use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use webhook_manager::db::init_db;
use webhook_manager::entities::group_service;
use webhook_manager::models::{CreateGroupRequest, Group, Link, Service};
use webhook_manager::registry;
use webhook_manager::webhook::WebhookClient;

/// Fresh in-memory database with the schema applied.
pub async fn test_db() -> DatabaseConnection {
    init_db("sqlite::memory:").await.expect("failed to create test database")
}

pub fn client() -> WebhookClient {
    WebhookClient::new().expect("failed to build webhook client")
}

pub async fn seed_service(db: &DatabaseConnection, name: &str) -> Service {
    registry::create_service(db, name).await.expect("failed to create service")
}

pub async fn seed_group(db: &DatabaseConnection, name: &str) -> Group {
    let req = CreateGroupRequest {
        name: name.to_string(),
        color: Some("FF0000".to_string()),
        ..Default::default()
    };
    registry::create_group(db, req).await.expect("failed to create group").group
}

/// Insert a link directly, bypassing URL validation.
pub async fn seed_link(
    db: &DatabaseConnection,
    group_id: i32,
    service_id: i32,
    enabled: bool,
    webhook_url: Option<&str>,
) -> Link {
    group_service::ActiveModel {
        group_id: Set(group_id),
        service_id: Set(service_id),
        enabled: Set(enabled),
        webhook_url: Set(webhook_url.map(str::to_string)),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("failed to insert link")
}

pub async fn reload(db: &DatabaseConnection, link_id: i32) -> Link {
    group_service::Entity::find_by_id(link_id)
        .one(db)
        .await
        .expect("query failed")
        .expect("link should exist")
}
