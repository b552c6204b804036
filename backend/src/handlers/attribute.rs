use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use super::extract::{JsonBody, Params};
use super::AppState;
use crate::error::AppError;
use crate::models::{CreateAttributeRequest, DescriptorRequest, UpdateAttributeRequest};
use crate::slots::{catalogue, FieldSpec};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/Attribute/api",
            get(get_attributes).patch(update_attribute).delete(delete_attribute),
        )
        .route("/Attribute/api/add", post(add_attribute))
        .route(
            "/Attribute/api/descriptors",
            get(get_descriptors).post(save_descriptors).delete(delete_descriptor),
        )
        .route("/Attribute/api/fields", get(get_fields))
}

async fn get_attributes(State(state): State<AppState>, params: Params) -> Result<Json<Value>, AppError> {
    match params.int("id")? {
        Some(id) => {
            let attribute = state.run(move |store| store.get_attribute(id)).await?;
            Ok(Json(attribute.map_or_else(|| json!({}), |a| json!(a))))
        }
        None => Ok(Json(json!(state.run(|store| store.list_attributes()).await?))),
    }
}

async fn add_attribute(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<CreateAttributeRequest>,
) -> Result<Json<Value>, AppError> {
    let name = crate::models::required_text(body.name)
        .ok_or_else(|| AppError::validation("Name is required"))?;
    let id = state.run(move |store| store.create_attribute(&name)).await?;
    log::info!("Created attribute {}", id);
    Ok(Json(json!({ "id": id })))
}

async fn update_attribute(
    State(state): State<AppState>,
    params: Params,
    JsonBody(body): JsonBody<UpdateAttributeRequest>,
) -> Result<Json<Value>, AppError> {
    let id = params.required("id", "Missing id parameter")?;
    let changes = body.into_changes()?;
    if changes.is_empty() {
        return Err(AppError::validation("No valid fields to update"));
    }
    state.run(move |store| store.update_attribute(id, changes)).await?;
    Ok(Json(json!({ "success": true })))
}

async fn delete_attribute(State(state): State<AppState>, params: Params) -> Result<Json<Value>, AppError> {
    let id = params.required("id", "Missing id parameter")?;
    state.run(move |store| store.delete_attribute(id)).await?;
    log::info!("Deleted attribute {}", id);
    Ok(Json(json!({ "success": true })))
}

async fn get_descriptors(State(state): State<AppState>, params: Params) -> Result<Json<Value>, AppError> {
    let id = params.required("id", "Missing id parameter")?;
    let descriptors = state.run(move |store| store.list_descriptors(id)).await?;
    Ok(Json(json!(descriptors)))
}

/// Commits a staged batch of descriptor placements.
async fn save_descriptors(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<Value>, AppError> {
    let Value::Array(items) = body else {
        return Err(AppError::validation("Payload must be an array"));
    };
    let batch = items
        .into_iter()
        .map(|item| {
            serde_json::from_value::<DescriptorRequest>(item)
                .map_err(|e| AppError::validation(format!("Invalid descriptor: {e}")))?
                .validate()
        })
        .collect::<Result<Vec<_>, _>>()?;
    let count = batch.len();
    state.run(move |store| store.insert_descriptors(batch)).await?;
    log::info!("Saved {} descriptors", count);
    Ok(Json(json!({ "success": true })))
}

async fn delete_descriptor(State(state): State<AppState>, params: Params) -> Result<Json<Value>, AppError> {
    let id = params.required("id", "Missing id parameter")?;
    state.run(move |store| store.delete_descriptor(id)).await?;
    Ok(Json(json!({ "success": true })))
}

async fn get_fields(State(state): State<AppState>) -> Json<Vec<FieldSpec>> {
    Json(catalogue(state.slots_per_kind))
}
