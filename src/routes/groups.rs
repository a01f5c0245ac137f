use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::models::{
    CreateGroupRequest, Group, GroupDetail, LinkServicesRequest, LinkView, SetEnabledRequest,
    UpdateGroupRequest,
};
use crate::registry;
use crate::routes::{announce_disabled, confirmation_required};
use crate::state::{AppState, PendingAction};

/// GET /api/groups — all groups with their links
pub async fn list_groups(
    State(state): State<AppState>,
) -> Result<Json<Vec<GroupDetail>>, (StatusCode, String)> {
    Ok(Json(registry::list_groups(&state.db).await?))
}

/// GET /api/groups/:group_id
pub async fn get_group(
    State(state): State<AppState>,
    Path(group_id): Path<i32>,
) -> Result<Json<GroupDetail>, (StatusCode, String)> {
    Ok(Json(registry::get_group(&state.db, group_id).await?))
}

/// POST /api/groups — create a group, optionally linking every service (disabled)
pub async fn create_group(
    State(state): State<AppState>,
    Json(req): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<GroupDetail>), (StatusCode, String)> {
    let group = registry::create_group(&state.db, req).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

/// PUT /api/groups/:group_id — update display settings
pub async fn update_group(
    State(state): State<AppState>,
    Path(group_id): Path<i32>,
    Json(req): Json<UpdateGroupRequest>,
) -> Result<Json<Group>, (StatusCode, String)> {
    Ok(Json(registry::update_group(&state.db, group_id, req).await?))
}

/// DELETE /api/groups/:group_id — delete a group and all its links
pub async fn delete_group(
    State(state): State<AppState>,
    Path(group_id): Path<i32>,
) -> Result<Response, (StatusCode, String)> {
    registry::find_group(&state.db, group_id).await?;
    if !state.confirmations.confirm(group_id, PendingAction::DeleteGroup) {
        return Ok(confirmation_required(PendingAction::DeleteGroup, group_id));
    }

    registry::delete_group(&state.db, group_id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// PUT /api/groups/:group_id/enabled — enable or disable every service of the group
pub async fn set_group_enabled(
    State(state): State<AppState>,
    Path(group_id): Path<i32>,
    Json(req): Json<SetEnabledRequest>,
) -> Result<Json<Vec<LinkView>>, (StatusCode, String)> {
    let flipped = registry::set_group_links_enabled(&state.db, group_id, req.enabled).await?;
    announce_disabled(&state, &flipped);
    Ok(Json(flipped))
}

/// POST /api/groups/:group_id/links — link the selected services, or all of them
pub async fn link_services(
    State(state): State<AppState>,
    Path(group_id): Path<i32>,
    Json(req): Json<LinkServicesRequest>,
) -> Result<(StatusCode, Json<Vec<LinkView>>), (StatusCode, String)> {
    let created = match req.service_ids {
        Some(ids) => registry::link_services(&state.db, group_id, &ids).await?,
        None => registry::link_all_services(&state.db, group_id).await?,
    };

    let status = if created.is_empty() { StatusCode::OK } else { StatusCode::CREATED };
    Ok((status, Json(created)))
}
