use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::models::{CreateServiceRequest, LinkView, Service, ServiceOverview, SetEnabledRequest};
use crate::registry;
use crate::routes::{announce_disabled, confirmation_required};
use crate::state::{AppState, PendingAction};

/// GET /api/services — every service with its link counts
pub async fn list_services(
    State(state): State<AppState>,
) -> Result<Json<Vec<ServiceOverview>>, (StatusCode, String)> {
    Ok(Json(registry::list_services(&state.db).await?))
}

/// POST /api/services — create a service (names are unique)
pub async fn create_service(
    State(state): State<AppState>,
    Json(req): Json<CreateServiceRequest>,
) -> Result<(StatusCode, Json<Service>), (StatusCode, String)> {
    let service = registry::create_service(&state.db, &req.name).await?;
    Ok((StatusCode::CREATED, Json(service)))
}

/// DELETE /api/services/:service_id — delete a service and all its links
pub async fn delete_service(
    State(state): State<AppState>,
    Path(service_id): Path<i32>,
) -> Result<Response, (StatusCode, String)> {
    registry::find_service(&state.db, service_id).await?;
    if !state.confirmations.confirm(service_id, PendingAction::DeleteService) {
        return Ok(confirmation_required(PendingAction::DeleteService, service_id));
    }

    registry::delete_service(&state.db, service_id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// DELETE /api/services/:service_id/links — detach the service from every group
pub async fn detach_service(
    State(state): State<AppState>,
    Path(service_id): Path<i32>,
) -> Result<Response, (StatusCode, String)> {
    registry::find_service(&state.db, service_id).await?;
    if !state.confirmations.confirm(service_id, PendingAction::DetachService) {
        return Ok(confirmation_required(PendingAction::DetachService, service_id));
    }

    let removed = registry::detach_service(&state.db, service_id).await?;
    Ok(Json(serde_json::json!({ "removed": removed })).into_response())
}

/// PUT /api/services/:service_id/enabled — enable or disable the service in every group
pub async fn set_service_enabled(
    State(state): State<AppState>,
    Path(service_id): Path<i32>,
    Json(req): Json<SetEnabledRequest>,
) -> Result<Json<Vec<LinkView>>, (StatusCode, String)> {
    let flipped = registry::set_service_links_enabled(&state.db, service_id, req.enabled).await?;
    announce_disabled(&state, &flipped);
    Ok(Json(flipped))
}
