pub mod groups;
pub mod health;
pub mod links;
pub mod services;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::models::{ConfirmationRequired, LinkView};
use crate::state::{AppState, PendingAction};
use crate::webhook::disabled_notice;

pub fn router(state: AppState) -> Router {
    Router::new()
        // Services
        .route("/api/services", get(services::list_services))
        .route("/api/services", post(services::create_service))
        .route("/api/services/{service_id}", delete(services::delete_service))
        .route("/api/services/{service_id}/links", delete(services::detach_service))
        .route("/api/services/{service_id}/enabled", put(services::set_service_enabled))
        // Groups
        .route("/api/groups", get(groups::list_groups))
        .route("/api/groups", post(groups::create_group))
        .route("/api/groups/{group_id}", get(groups::get_group))
        .route("/api/groups/{group_id}", put(groups::update_group))
        .route("/api/groups/{group_id}", delete(groups::delete_group))
        .route("/api/groups/{group_id}/enabled", put(groups::set_group_enabled))
        .route("/api/groups/{group_id}/links", post(groups::link_services))
        // Links
        .route("/api/links", get(links::list_links))
        .route("/api/links/{link_id}", delete(links::delete_link))
        .route("/api/links/{link_id}/enabled", put(links::set_link_enabled))
        .route("/api/links/{link_id}/webhook", put(links::update_webhook))
        .route("/api/links/{link_id}/webhook", delete(links::remove_webhook))
        // Health
        .route("/api/health/check", post(health::run_check))
        .route("/api/health/broken", get(health::list_broken))
        // Pending confirmations
        .route("/api/confirmations/{action}/{id}", delete(cancel_confirmation))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// 202 answer for the first request of a two-step action.
pub(crate) fn confirmation_required(action: PendingAction, id: i32) -> Response {
    let body = ConfirmationRequired {
        status: "confirmation_required",
        message: format!("Repeat the request within 60 seconds to {action} {id}"),
    };
    (StatusCode::ACCEPTED, Json(body)).into_response()
}

/// Post a disable announcement to every newly disabled link that has its
/// own endpoint. Runs detached; the caller's state change is already committed.
pub(crate) fn announce_disabled(state: &AppState, links: &[LinkView]) {
    for link in links.iter().filter(|l| !l.enabled) {
        let Some(url) = link.webhook_url.clone().filter(|u| !u.trim().is_empty()) else {
            continue;
        };
        let content = disabled_notice(
            &link.group_name,
            &link.service_name,
            state.notify.contact.as_deref(),
        );
        let client = state.webhooks.clone();
        let username = state.notify.username.clone();

        tokio::spawn(async move {
            client.send_message(&url, &content, Some(&username)).await;
        });
    }
}

/// DELETE /api/confirmations/:action/:id — drop a pending confirmation
async fn cancel_confirmation(
    State(state): State<AppState>,
    Path((action, id)): Path<(PendingAction, i32)>,
) -> StatusCode {
    if state.confirmations.cancel(id, action) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}
