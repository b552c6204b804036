//! Serde helpers for the wire format, where flags travel as `0`/`1`
//! and partial updates distinguish an absent key from an explicit `null`.

use serde::de::Error;
use serde::{Deserialize, Deserializer, Serializer};
use serde_json::Value;

use crate::slots::json_flag;

pub fn as_int<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(u8::from(*value))
}

/// Reads `true`/`false`, `0`/`1` or their string forms.
pub fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => json_flag(&value)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("expected a flag, got {value}"))),
    }
}

/// Wraps any present value in `Some`, so `Option<Option<T>>` fields keep
/// `null` apart from a missing key.
pub fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Body {
        #[serde(default, deserialize_with = "super::deserialize_opt")]
        active: Option<bool>,
        #[serde(default, deserialize_with = "super::deserialize_some")]
        rules: Option<Option<String>>,
    }

    #[test]
    fn flags_accept_numbers_and_bools() {
        let body: Body = serde_json::from_value(json!({ "active": 1 })).unwrap();
        assert_eq!(body.active, Some(true));
        let body: Body = serde_json::from_value(json!({ "active": false })).unwrap();
        assert_eq!(body.active, Some(false));
        assert!(serde_json::from_value::<Body>(json!({ "active": 5 })).is_err());
    }

    #[test]
    fn null_differs_from_missing() {
        let body: Body = serde_json::from_value(json!({})).unwrap();
        assert_eq!(body.rules, None);
        let body: Body = serde_json::from_value(json!({ "rules": null })).unwrap();
        assert_eq!(body.rules, Some(None));
        let body: Body = serde_json::from_value(json!({ "rules": "<r/>" })).unwrap();
        assert_eq!(body.rules, Some(Some("<r/>".to_string())));
    }
}
