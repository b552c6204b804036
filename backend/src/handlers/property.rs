use std::collections::HashMap;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use super::extract::{JsonBody, Params};
use super::AppState;
use crate::error::AppError;
use crate::models::{DescriptorView, NewPropertyAttribute, PropertyHierarchyView, SaveCustomFieldValueRequest};
use crate::resolve::{attribute_grid, lookup_ids};

const MISSING_PROPERTY: &str = "Missing propertyId parameter";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/property/api/properties", get(get_properties))
        .route("/property/api/propertyAttributes", get(get_property_attributes))
        .route("/property/api/attributeDescriptor", get(get_attribute_descriptors))
        .route("/property/api/attributeGrid", get(get_attribute_grid))
        .route("/property/api/getParentProperty", get(get_parent_property))
        .route("/property/api/getChildProperties", get(get_child_properties))
        .route("/property/api/hierarchy", get(get_hierarchy))
        .route("/property/api/insertPropertyAttribute", post(insert_property_attribute))
        .route(
            "/property/api/customFieldValues",
            get(get_custom_field_values).post(save_custom_field_value),
        )
}

async fn get_properties(State(state): State<AppState>, params: Params) -> Result<Json<Value>, AppError> {
    match params.int("id")? {
        Some(id) => Ok(Json(json!(state.run(move |store| store.get_property(id)).await?))),
        None => Ok(Json(json!(state.run(|store| store.list_properties()).await?))),
    }
}

async fn get_property_attributes(State(state): State<AppState>, params: Params) -> Result<Json<Value>, AppError> {
    let property_id = params.required("propertyId", "Missing propertyId")?;
    let records = state.run(move |store| store.property_attributes(property_id)).await?;
    Ok(Json(json!(records)))
}

async fn get_attribute_descriptors(
    State(state): State<AppState>,
    params: Params,
) -> Result<Json<Vec<DescriptorView>>, AppError> {
    let Some(attribute_id) = params.int("attributeId")? else {
        return Ok(Json(Vec::new()));
    };
    let descriptors = state.run(move |store| store.list_descriptors(attribute_id)).await?;
    Ok(Json(descriptors.into_iter().map(DescriptorView::from).collect()))
}

/// An occurrence's values resolved through its descriptors and laid out
/// on the display grid.
async fn get_attribute_grid(State(state): State<AppState>, params: Params) -> Result<Json<Value>, AppError> {
    let id = params.required("propertyAttributeId", "Missing propertyAttributeId parameter")?;
    let grid = state
        .run(move |store| {
            let Some(record) = store.property_attribute(id)? else {
                return Ok(None);
            };
            let descriptors = store.list_descriptors(record.attribute_id)?;
            let lookups: HashMap<i32, String> = store
                .lookups_by_ids(&lookup_ids(&record, &descriptors))?
                .into_iter()
                .map(|lookup| (lookup.id, lookup.value))
                .collect();
            Ok(Some(attribute_grid(&record, &descriptors, &lookups)))
        })
        .await?
        .ok_or_else(|| AppError::NotFound("Record not found".to_string()))?;
    Ok(Json(json!(grid)))
}

async fn get_parent_property(State(state): State<AppState>, params: Params) -> Result<Json<Value>, AppError> {
    let property_id = params.required("propertyId", MISSING_PROPERTY)?;
    Ok(Json(json!(state.run(move |store| store.parent_properties(property_id)).await?)))
}

async fn get_child_properties(State(state): State<AppState>, params: Params) -> Result<Json<Value>, AppError> {
    let property_id = params.required("propertyId", MISSING_PROPERTY)?;
    Ok(Json(json!(state.run(move |store| store.child_properties(property_id)).await?)))
}

async fn get_hierarchy(
    State(state): State<AppState>,
    params: Params,
) -> Result<Json<PropertyHierarchyView>, AppError> {
    let property_id = params.required("propertyId", MISSING_PROPERTY)?;
    let hierarchy = state
        .run(move |store| {
            Ok(PropertyHierarchyView {
                parents: store.parent_properties(property_id)?,
                children: store.child_properties(property_id)?,
            })
        })
        .await?;
    Ok(Json(hierarchy))
}

async fn insert_property_attribute(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<Value>, AppError> {
    let Value::Object(fields) = body else {
        return Err(AppError::validation("Request body must be an object"));
    };
    let attribute = NewPropertyAttribute::from_json(&fields)?;
    log::info!(
        "Inserting attribute {} on property {}",
        attribute.attribute_id,
        attribute.property_id
    );
    let id = state.run(move |store| store.insert_property_attribute(attribute)).await?;
    Ok(Json(json!({ "success": true, "id": id })))
}

async fn get_custom_field_values(State(state): State<AppState>, params: Params) -> Result<Json<Value>, AppError> {
    let property_id = params.required("propertyId", "propertyId is required")?;
    let fields = state.run(move |store| store.custom_field_values(property_id)).await?;
    Ok(Json(json!(fields)))
}

async fn save_custom_field_value(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<SaveCustomFieldValueRequest>,
) -> Result<Json<Value>, AppError> {
    let value = body.validate()?;
    let id = state.run(move |store| store.save_custom_field_value(value)).await?;
    Ok(Json(json!({ "success": true, "id": id })))
}
