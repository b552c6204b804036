use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use super::extract::{JsonBody, Params};
use super::AppState;
use crate::error::AppError;
use crate::models::{CreateLookupGroupRequest, CreateLookupRequest, Lookup, LookupGroup};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/lookup/api/lookupGroup", get(get_lookup_groups).post(create_lookup_group))
        .route("/lookup/api/lookup", get(get_lookups).post(create_lookup))
        .route("/lookup/api/lookup/GetByID", get(get_lookup_by_id))
}

async fn get_lookup_groups(State(state): State<AppState>) -> Result<Json<Vec<LookupGroup>>, AppError> {
    Ok(Json(state.run(|store| store.list_lookup_groups()).await?))
}

async fn create_lookup_group(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<CreateLookupGroupRequest>,
) -> Result<Json<Value>, AppError> {
    let group = body.validate()?;
    let id = state.run(move |store| store.create_lookup_group(group)).await?;
    log::info!("Created lookup group {}", id);
    Ok(Json(json!({ "success": true, "id": id })))
}

async fn get_lookups(State(state): State<AppState>, params: Params) -> Result<Json<Vec<Lookup>>, AppError> {
    let group_id = params.required("groupId", "Missing groupId")?;
    Ok(Json(state.run(move |store| store.list_lookups(group_id)).await?))
}

async fn create_lookup(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<CreateLookupRequest>,
) -> Result<Json<Value>, AppError> {
    let lookup = body.validate()?;
    let id = state.run(move |store| store.create_lookup(lookup)).await?;
    Ok(Json(json!({ "success": true, "id": id })))
}

/// The lookup with the given id, as a one-element (or empty) array.
async fn get_lookup_by_id(State(state): State<AppState>, params: Params) -> Result<Json<Vec<Lookup>>, AppError> {
    let id = params.required("id", "Missing id")?;
    Ok(Json(state.run(move |store| store.lookups_by_ids(&[id])).await?))
}
