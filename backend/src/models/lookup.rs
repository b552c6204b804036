use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::{flag, required_text};
use crate::error::AppError;
use crate::schema::{lookup, lookup_group};

#[derive(Debug, Clone, Serialize, Queryable, Selectable)]
#[diesel(table_name = lookup_group)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct LookupGroup {
    #[serde(rename = "ID")]
    pub id: i32,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "isActive")]
    pub is_active: bool,
    #[serde(rename = "Description")]
    pub description: Option<String>,
    #[serde(rename = "Metadata")]
    pub metadata: Option<String>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = lookup_group)]
pub struct NewLookupGroup {
    pub name: String,
    pub is_active: bool,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateLookupGroupRequest {
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
    #[serde(rename = "IsActive", default, deserialize_with = "flag::deserialize_opt")]
    pub is_active: Option<bool>,
}

impl CreateLookupGroupRequest {
    pub fn validate(self) -> Result<NewLookupGroup, AppError> {
        let name = required_text(self.name).ok_or_else(|| AppError::validation("Name is required"))?;
        Ok(NewLookupGroup {
            name,
            is_active: self.is_active.unwrap_or(false),
            description: required_text(self.description),
        })
    }
}

#[derive(Debug, Clone, Serialize, Queryable, Selectable)]
#[diesel(table_name = lookup)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Lookup {
    #[serde(rename = "ID")]
    pub id: i32,
    #[serde(rename = "LookupGroupID")]
    pub lookup_group_id: i32,
    #[serde(rename = "Value")]
    pub value: String,
    #[serde(rename = "isActive")]
    pub is_active: bool,
    #[serde(rename = "MetaData")]
    pub meta_data: Option<String>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = lookup)]
pub struct NewLookup {
    pub lookup_group_id: i32,
    pub value: String,
    pub is_active: bool,
    pub meta_data: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateLookupRequest {
    #[serde(rename = "LookupGroupID", default)]
    pub lookup_group_id: Option<i32>,
    #[serde(rename = "Value", default)]
    pub value: Option<String>,
    #[serde(rename = "isActive", default, deserialize_with = "flag::deserialize_opt")]
    pub is_active: Option<bool>,
    #[serde(rename = "MetaData", default)]
    pub meta_data: Option<String>,
}

impl CreateLookupRequest {
    pub fn validate(self) -> Result<NewLookup, AppError> {
        let lookup_group_id = self
            .lookup_group_id
            .ok_or_else(|| AppError::validation("LookupGroupID is required"))?;
        let value = required_text(self.value).ok_or_else(|| AppError::validation("Value is required"))?;
        Ok(NewLookup {
            lookup_group_id,
            value,
            is_active: self.is_active.unwrap_or(true),
            meta_data: self.meta_data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_flag_is_boolean_on_the_wire() {
        let lookup = Lookup {
            id: 1,
            lookup_group_id: 2,
            value: "Gas".into(),
            is_active: true,
            meta_data: None,
        };
        assert_eq!(serde_json::to_value(lookup).unwrap()["isActive"], json!(true));
    }

    #[test]
    fn lookup_requires_group_and_value() {
        let request: CreateLookupRequest = serde_json::from_value(json!({ "Value": "Gas" })).unwrap();
        assert_eq!(request.validate().unwrap_err().to_string(), "LookupGroupID is required");
        let request: CreateLookupRequest =
            serde_json::from_value(json!({ "LookupGroupID": 2, "Value": "Gas", "isActive": 1 })).unwrap();
        let new = request.validate().unwrap();
        assert!(new.is_active);
    }

    #[test]
    fn lookup_group_defaults_to_inactive() {
        let request: CreateLookupGroupRequest = serde_json::from_value(json!({ "Name": "Fuel" })).unwrap();
        assert!(!request.validate().unwrap().is_active);
    }
}
