//! Extractors that report bad input as `{ "error": ... }` like every other
//! handler failure.

use std::collections::HashMap;

use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::{async_trait, Json};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::AppError;

/// A JSON body deserialized into `T`.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::validation(rejection.body_text()))?;
        serde_json::from_value(value)
            .map(JsonBody)
            .map_err(|e| AppError::validation(format!("Invalid request body: {e}")))
    }
}

/// Raw query string parameters.
pub struct Params(HashMap<String, String>);

impl Params {
    /// Reads an integer parameter. Absent or blank values are `None`.
    pub fn int(&self, key: &str) -> Result<Option<i32>, AppError> {
        match self.0.get(key).map(|v| v.trim()) {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| AppError::validation(format!("{key} must be an integer"))),
        }
    }

    /// Like [`Params::int`], but rejects a missing value with `message`.
    pub fn required(&self, key: &str, message: &str) -> Result<i32, AppError> {
        self.int(key)?.ok_or_else(|| AppError::validation(message))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Params
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::validation(rejection.body_text()))?;
        Ok(Params(params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Params {
        Params(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }

    #[test]
    fn integer_parameters() {
        let p = params(&[("id", "42"), ("groupId", ""), ("propertyId", "abc")]);
        assert_eq!(p.int("id").unwrap(), Some(42));
        assert_eq!(p.int("groupId").unwrap(), None);
        assert_eq!(p.int("missing").unwrap(), None);
        assert_eq!(p.int("propertyId").unwrap_err().to_string(), "propertyId must be an integer");
        assert_eq!(
            p.required("groupId", "Missing groupId").unwrap_err().to_string(),
            "Missing groupId"
        );
    }
}
