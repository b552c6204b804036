use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use super::extract::{JsonBody, Params};
use super::AppState;
use crate::error::AppError;
use crate::models::{AddGroupMemberRequest, CreateAttributeGroupRequest, NewGroupMember};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/AttributeGroup/api", get(get_groups).post(create_group))
        .route(
            "/AttributeGroup/api/attributes",
            get(get_members).post(add_member).delete(remove_member),
        )
}

async fn get_groups(State(state): State<AppState>, params: Params) -> Result<Json<Value>, AppError> {
    match params.int("id")? {
        Some(id) => Ok(Json(json!(state.run(move |store| store.get_attribute_group(id)).await?))),
        None => Ok(Json(json!(state.run(|store| store.list_attribute_groups()).await?))),
    }
}

async fn create_group(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<CreateAttributeGroupRequest>,
) -> Result<Json<Value>, AppError> {
    let group = body.validate()?;
    let id = state.run(move |store| store.create_attribute_group(group)).await?;
    log::info!("Created attribute group {}", id);
    Ok(Json(json!({ "AttributeGroupID": id })))
}

async fn get_members(State(state): State<AppState>, params: Params) -> Result<Json<Value>, AppError> {
    let Some(group_id) = params.int("groupId")? else {
        return Ok(Json(json!([])));
    };
    let members = state.run(move |store| store.list_group_members(group_id)).await?;
    Ok(Json(json!(members)))
}

async fn add_member(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<AddGroupMemberRequest>,
) -> Result<Json<Value>, AppError> {
    let (Some(attribute_group_id), Some(attribute_id)) = (body.attribute_group_id, body.attribute_id) else {
        return Err(AppError::validation("attributeGroupId and attributeId are required"));
    };
    let member = NewGroupMember { attribute_group_id, attribute_id };
    let id = state.run(move |store| store.add_group_member(member)).await?;
    Ok(Json(json!({ "success": true, "id": id })))
}

async fn remove_member(State(state): State<AppState>, params: Params) -> Result<Json<Value>, AppError> {
    let group_id = params.required("attributeGroupId", "attributeGroupId and attributeId are required")?;
    let attribute_id = params.required("attributeId", "attributeGroupId and attributeId are required")?;
    state
        .run(move |store| store.remove_group_member(group_id, attribute_id))
        .await?;
    Ok(Json(json!({ "success": true })))
}
