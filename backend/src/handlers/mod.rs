use std::sync::Arc;

use axum::routing::get;
use axum::Router;

use crate::error::AppError;
use crate::store::{Store, StoreResult};

mod attribute;
mod attribute_group;
mod custom_field;
mod extract;
mod introspect;
mod lookup;
mod property;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    /// Slots of each kind listed by the field catalogue.
    pub slots_per_kind: u8,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, slots_per_kind: u8) -> Self {
        AppState { store, slots_per_kind }
    }

    /// Runs a store call on the blocking pool.
    pub async fn run<T, F>(&self, call: F) -> Result<T, AppError>
    where
        F: FnOnce(&dyn Store) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        Ok(tokio::task::spawn_blocking(move || call(store.as_ref())).await??)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "Property administration API" }))
        .merge(attribute::routes())
        .merge(attribute_group::routes())
        .merge(custom_field::routes())
        .merge(property::routes())
        .merge(lookup::routes())
        .merge(introspect::routes())
        .with_state(state)
}
