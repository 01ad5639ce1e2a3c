use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router, middleware};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::{debug, instrument};

use crate::admission::rate_limit;
use crate::error::ApiError;
use crate::response::LookupResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub fn create_api_routes(state: AppState) -> Router {
    let search: Router<AppState> = Router::new()
        .route("/search/{name}", get(search_name))
        .route_layer(middleware::from_fn_with_state(state.admission.clone(), rate_limit));

    let api: Router<AppState> = Router::new().merge(search).route("/health", get(health));

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[instrument(skip(state), name = "api_search_name")]
async fn search_name(State(state): State<AppState>, Path(name): Path<String>) -> Result<Json<LookupResult>, ApiError> {
    let result = state.lookup.lookup(&name).await?;
    debug!(name = %result.name, searches = %result.searches, droptime = ?result.droptime, "lookup answered");
    Ok(Json(result))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok", version: env!("CARGO_PKG_VERSION") })
}
