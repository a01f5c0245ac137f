use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::models::{LinkFilter, LinkView, SetEnabledRequest, UpdateWebhookRequest};
use crate::registry;
use crate::routes::{announce_disabled, confirmation_required};
use crate::state::{AppState, PendingAction};

/// GET /api/links — group/service matrix, optionally filtered by name
pub async fn list_links(
    State(state): State<AppState>,
    Query(filter): Query<LinkFilter>,
) -> Result<Json<Vec<LinkView>>, (StatusCode, String)> {
    Ok(Json(registry::list_links(&state.db, &filter).await?))
}

/// PUT /api/links/:link_id/enabled
pub async fn set_link_enabled(
    State(state): State<AppState>,
    Path(link_id): Path<i32>,
    Json(req): Json<SetEnabledRequest>,
) -> Result<Json<LinkView>, (StatusCode, String)> {
    let (link, flipped) = registry::set_link_enabled(&state.db, link_id, req.enabled).await?;
    if flipped {
        announce_disabled(&state, std::slice::from_ref(&link));
    }
    Ok(Json(link))
}

/// PUT /api/links/:link_id/webhook — validate and save a new endpoint
pub async fn update_webhook(
    State(state): State<AppState>,
    Path(link_id): Path<i32>,
    Json(req): Json<UpdateWebhookRequest>,
) -> Result<Json<LinkView>, (StatusCode, String)> {
    let link =
        registry::update_link_webhook(&state.db, &state.webhooks, link_id, &req.webhook_url)
            .await?;
    Ok(Json(link))
}

/// DELETE /api/links/:link_id/webhook — remove the endpoint (two-step)
pub async fn remove_webhook(
    State(state): State<AppState>,
    Path(link_id): Path<i32>,
) -> Result<Response, (StatusCode, String)> {
    registry::find_link(&state.db, link_id).await?;
    if !state.confirmations.confirm(link_id, PendingAction::RemoveWebhook) {
        return Ok(confirmation_required(PendingAction::RemoveWebhook, link_id));
    }

    let link = registry::clear_link_webhook(&state.db, link_id).await?;
    Ok(Json(link).into_response())
}

/// DELETE /api/links/:link_id — detach the service from the group (two-step)
pub async fn delete_link(
    State(state): State<AppState>,
    Path(link_id): Path<i32>,
) -> Result<Response, (StatusCode, String)> {
    registry::find_link(&state.db, link_id).await?;
    if !state.confirmations.confirm(link_id, PendingAction::DeleteLink) {
        return Ok(confirmation_required(PendingAction::DeleteLink, link_id));
    }

    registry::unlink(&state.db, link_id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
