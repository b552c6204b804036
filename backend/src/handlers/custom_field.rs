use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use super::extract::{JsonBody, Params};
use super::AppState;
use crate::error::AppError;
use crate::models::{CreateCustomFieldRequest, UpdateCustomFieldRequest};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/PropertyCustomField/api",
            get(get_custom_fields)
                .post(create_custom_field)
                .patch(update_custom_field)
                .delete(delete_custom_field),
        )
        .route("/PropertyCustomField/api/customFieldTypes", get(get_custom_field_types))
}

async fn get_custom_fields(State(state): State<AppState>, params: Params) -> Result<Json<Value>, AppError> {
    match params.int("id")? {
        Some(id) => {
            let field = state.run(move |store| store.get_custom_field(id)).await?;
            Ok(Json(field.map_or_else(|| json!({}), |f| json!(f))))
        }
        None => Ok(Json(json!(state.run(|store| store.list_custom_fields()).await?))),
    }
}

async fn create_custom_field(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<CreateCustomFieldRequest>,
) -> Result<Json<Value>, AppError> {
    let field = body.validate()?;
    let position = field.position();
    let id = state.run(move |store| store.create_custom_field(field)).await?;
    log::info!("Created custom field {} at {}", id, position);
    Ok(Json(json!({ "id": id, "success": true })))
}

async fn update_custom_field(
    State(state): State<AppState>,
    params: Params,
    JsonBody(body): JsonBody<UpdateCustomFieldRequest>,
) -> Result<Json<Value>, AppError> {
    let id = params.required("id", "Missing id parameter")?;
    let changes = body.into_changes()?;
    if changes.is_empty() {
        return Err(AppError::validation("No valid fields to update"));
    }
    state.run(move |store| store.update_custom_field(id, changes)).await?;
    Ok(Json(json!({ "success": true })))
}

async fn delete_custom_field(State(state): State<AppState>, params: Params) -> Result<Json<Value>, AppError> {
    let id = params.required("id", "Missing id parameter")?;
    state.run(move |store| store.delete_custom_field(id)).await?;
    log::info!("Deleted custom field {}", id);
    Ok(Json(json!({ "success": true })))
}

async fn get_custom_field_types(State(state): State<AppState>, params: Params) -> Result<Json<Value>, AppError> {
    match params.int("id")? {
        Some(id) => {
            let field_type = state.run(move |store| store.get_custom_field_type(id)).await?;
            Ok(Json(field_type.map_or_else(|| json!({}), |t| json!(t))))
        }
        None => Ok(Json(json!(state.run(|store| store.list_custom_field_types()).await?))),
    }
}
