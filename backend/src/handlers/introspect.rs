use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use super::AppState;
use crate::error::AppError;
use crate::models::ColumnInfo;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/introspect", get(introspect))
}

/// Column metadata for the custom field tables.
async fn introspect(State(state): State<AppState>) -> Result<Json<Vec<ColumnInfo>>, AppError> {
    Ok(Json(state.run(|store| store.custom_field_columns()).await?))
}
