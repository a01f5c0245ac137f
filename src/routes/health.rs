use axum::{extract::State, http::StatusCode, Json};

use crate::health::check_all_webhooks;
use crate::models::{HealthCheckResponse, LinkView};
use crate::registry;
use crate::state::AppState;

/// POST /api/health/check — run a sweep now and report broken links
pub async fn run_check(
    State(state): State<AppState>,
) -> Result<Json<HealthCheckResponse>, (StatusCode, String)> {
    let report = check_all_webhooks(&state.db, &state.webhooks).await?;
    let broken = registry::broken_links(&state.db).await?;

    Ok(Json(HealthCheckResponse { report, broken }))
}

/// GET /api/health/broken — broken links as of the last sweep
pub async fn list_broken(
    State(state): State<AppState>,
) -> Result<Json<Vec<LinkView>>, (StatusCode, String)> {
    Ok(Json(registry::broken_links(&state.db).await?))
}
