use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{flag, required_text};
use crate::dates;
use crate::error::AppError;
use crate::grid::{self, GridError, GridPosition};
use crate::schema::{custom_field_type, property_custom_field, property_custom_field_value};

#[derive(Debug, Clone, Serialize, Queryable, Selectable)]
#[diesel(table_name = custom_field_type)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CustomFieldType {
    #[serde(rename = "ID")]
    pub id: i32,
    #[serde(rename = "FieldTypeDescription")]
    pub field_type_description: Option<String>,
    #[serde(rename = "FieldTypeDefinition")]
    pub field_type_definition: Option<String>,
}

#[derive(Debug, Clone, Serialize, Queryable, Selectable)]
#[diesel(table_name = property_custom_field)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PropertyCustomField {
    #[serde(rename = "ID")]
    pub id: i32,
    #[serde(rename = "FieldName")]
    pub field_name: String,
    #[serde(rename = "FieldLabel")]
    pub field_label: String,
    #[serde(rename = "CustomFieldTypeID")]
    pub custom_field_type_id: i32,
    #[serde(rename = "TabNumber")]
    pub tab_number: i32,
    #[serde(rename = "RowNumber")]
    pub row_number: i32,
    #[serde(rename = "ColNumber")]
    pub col_number: i32,
    #[serde(rename = "isActive", serialize_with = "flag::as_int")]
    pub is_active: bool,
    #[serde(rename = "Rules", skip_serializing_if = "Option::is_none")]
    pub rules: Option<String>,
}

impl PropertyCustomField {
    pub fn position(&self) -> GridPosition {
        GridPosition {
            tab: self.tab_number,
            row: self.row_number,
            column: self.col_number,
        }
    }
}

/// A custom field definition with its type's display name.
#[derive(Debug, Clone, Serialize)]
pub struct CustomFieldView {
    #[serde(flatten)]
    pub field: PropertyCustomField,
    #[serde(rename = "CustomFieldTypeName")]
    pub custom_field_type_name: Option<String>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = property_custom_field)]
pub struct NewCustomField {
    pub field_name: String,
    pub field_label: String,
    pub custom_field_type_id: i32,
    pub tab_number: i32,
    pub row_number: i32,
    pub col_number: i32,
    pub is_active: bool,
    pub rules: Option<String>,
}

impl NewCustomField {
    pub fn position(&self) -> GridPosition {
        GridPosition {
            tab: self.tab_number,
            row: self.row_number,
            column: self.col_number,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCustomFieldRequest {
    #[serde(rename = "FieldName", default)]
    pub field_name: Option<String>,
    #[serde(rename = "FieldLabel", default)]
    pub field_label: Option<String>,
    #[serde(rename = "CustomFieldTypeID", default)]
    pub custom_field_type_id: Option<i32>,
    #[serde(rename = "TabNumber", default)]
    pub tab_number: Option<i32>,
    #[serde(rename = "RowNumber", default)]
    pub row_number: Option<i32>,
    #[serde(rename = "ColNumber", default)]
    pub col_number: Option<i32>,
    #[serde(rename = "isActive", default, deserialize_with = "flag::deserialize_opt")]
    pub is_active: Option<bool>,
    #[serde(rename = "Rules", default)]
    pub rules: Option<String>,
}

impl CreateCustomFieldRequest {
    pub fn validate(self) -> Result<NewCustomField, AppError> {
        let (Some(field_name), Some(field_label), Some(custom_field_type_id)) = (
            required_text(self.field_name),
            required_text(self.field_label),
            self.custom_field_type_id.filter(|id| *id != 0),
        ) else {
            return Err(AppError::validation(
                "FieldName, FieldLabel, and CustomFieldTypeID are required",
            ));
        };
        let position = GridPosition::new(
            self.tab_number.unwrap_or(1),
            self.row_number.unwrap_or(1),
            self.col_number.unwrap_or(1),
        )?;
        Ok(NewCustomField {
            field_name,
            field_label,
            custom_field_type_id,
            tab_number: position.tab,
            row_number: position.row,
            col_number: position.column,
            is_active: self.is_active.unwrap_or(true),
            rules: self.rules,
        })
    }
}

#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = property_custom_field)]
pub struct CustomFieldChanges {
    pub field_name: Option<String>,
    pub field_label: Option<String>,
    pub custom_field_type_id: Option<i32>,
    pub tab_number: Option<i32>,
    pub row_number: Option<i32>,
    pub col_number: Option<i32>,
    pub is_active: Option<bool>,
    pub rules: Option<Option<String>>,
}

impl CustomFieldChanges {
    pub fn is_empty(&self) -> bool {
        self.field_name.is_none()
            && self.field_label.is_none()
            && self.custom_field_type_id.is_none()
            && !self.moves()
            && self.is_active.is_none()
            && self.rules.is_none()
    }

    pub fn moves(&self) -> bool {
        self.tab_number.is_some() || self.row_number.is_some() || self.col_number.is_some()
    }

    /// The cell the field lands on once these changes apply to `current`.
    pub fn target_position(&self, current: &PropertyCustomField) -> Result<GridPosition, GridError> {
        GridPosition::new(
            self.tab_number.unwrap_or(current.tab_number),
            self.row_number.unwrap_or(current.row_number),
            self.col_number.unwrap_or(current.col_number),
        )
    }

    pub fn apply(&self, field: &mut PropertyCustomField) {
        if let Some(name) = &self.field_name {
            field.field_name = name.clone();
        }
        if let Some(label) = &self.field_label {
            field.field_label = label.clone();
        }
        if let Some(type_id) = self.custom_field_type_id {
            field.custom_field_type_id = type_id;
        }
        if let Some(tab) = self.tab_number {
            field.tab_number = tab;
        }
        if let Some(row) = self.row_number {
            field.row_number = row;
        }
        if let Some(col) = self.col_number {
            field.col_number = col;
        }
        if let Some(active) = self.is_active {
            field.is_active = active;
        }
        if let Some(rules) = &self.rules {
            field.rules = rules.clone();
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateCustomFieldRequest {
    #[serde(rename = "FieldName", default)]
    pub field_name: Option<String>,
    #[serde(rename = "FieldLabel", default)]
    pub field_label: Option<String>,
    #[serde(rename = "CustomFieldTypeID", default)]
    pub custom_field_type_id: Option<i32>,
    #[serde(rename = "TabNumber", default)]
    pub tab_number: Option<i32>,
    #[serde(rename = "RowNumber", default)]
    pub row_number: Option<i32>,
    #[serde(rename = "ColNumber", default)]
    pub col_number: Option<i32>,
    #[serde(rename = "isActive", default, deserialize_with = "flag::deserialize_opt")]
    pub is_active: Option<bool>,
    #[serde(rename = "Rules", default, deserialize_with = "flag::deserialize_some")]
    pub rules: Option<Option<String>>,
}

impl UpdateCustomFieldRequest {
    pub fn into_changes(self) -> Result<CustomFieldChanges, AppError> {
        if let Some(tab) = self.tab_number {
            grid::validate_tab(tab)?;
        }
        if self.row_number.is_some_and(|row| row < 1) {
            return Err(AppError::validation("Row number must be a positive integer"));
        }
        if self.col_number.is_some_and(|col| col < 1) {
            return Err(AppError::validation("Column number must be a positive integer"));
        }
        if self.field_name.as_deref().is_some_and(|s| s.trim().is_empty())
            || self.field_label.as_deref().is_some_and(|s| s.trim().is_empty())
        {
            return Err(AppError::validation("FieldName and FieldLabel cannot be empty"));
        }
        Ok(CustomFieldChanges {
            field_name: self.field_name.map(|s| s.trim().to_string()),
            field_label: self.field_label.map(|s| s.trim().to_string()),
            custom_field_type_id: self.custom_field_type_id,
            tab_number: self.tab_number,
            row_number: self.row_number,
            col_number: self.col_number,
            is_active: self.is_active,
            rules: self.rules,
        })
    }
}

/// The typed value columns of a custom field value row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomFieldValues {
    #[serde(default)]
    pub custom_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "dates::deserialize_datetime")]
    pub custom_date_time: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "dates::deserialize_time")]
    pub custom_time: Option<NaiveTime>,
    #[serde(default)]
    pub custom_int: Option<i32>,
    #[serde(default)]
    pub custom_decimal: Option<Decimal>,
    #[serde(default)]
    pub custom_short_text: Option<String>,
    #[serde(default)]
    pub custom_long_text: Option<String>,
    #[serde(default)]
    pub custom_max_text: Option<String>,
    #[serde(default, deserialize_with = "flag::deserialize_opt")]
    pub custom_boolean: Option<bool>,
    #[serde(default)]
    pub custom_image_link: Option<String>,
}

impl CustomFieldValues {
    pub fn validate(&self) -> Result<(), AppError> {
        let limits = [
            ("CustomShortText", &self.custom_short_text, 100),
            ("CustomLongText", &self.custom_long_text, 1000),
            ("CustomImageLink", &self.custom_image_link, 1000),
        ];
        for (name, value, limit) in limits {
            if value.as_ref().is_some_and(|v| v.chars().count() > limit) {
                return Err(AppError::validation(format!(
                    "{name} must be at most {limit} characters"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = property_custom_field_value)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CustomFieldValueRow {
    pub id: i32,
    pub property_id: i32,
    pub property_custom_field_id: i32,
    pub custom_date: Option<NaiveDate>,
    pub custom_date_time: Option<NaiveDateTime>,
    pub custom_time: Option<NaiveTime>,
    pub custom_int: Option<i32>,
    pub custom_decimal: Option<Decimal>,
    pub custom_short_text: Option<String>,
    pub custom_long_text: Option<String>,
    pub custom_max_text: Option<String>,
    pub custom_boolean: Option<bool>,
    pub custom_image_link: Option<String>,
}

impl CustomFieldValueRow {
    pub fn values(&self) -> CustomFieldValues {
        CustomFieldValues {
            custom_date: self.custom_date,
            custom_date_time: self.custom_date_time,
            custom_time: self.custom_time,
            custom_int: self.custom_int,
            custom_decimal: self.custom_decimal,
            custom_short_text: self.custom_short_text.clone(),
            custom_long_text: self.custom_long_text.clone(),
            custom_max_text: self.custom_max_text.clone(),
            custom_boolean: self.custom_boolean,
            custom_image_link: self.custom_image_link.clone(),
        }
    }
}

/// Upsert payload; every value column is written, absent ones as NULL.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = property_custom_field_value)]
#[diesel(treat_none_as_null = true)]
pub struct NewCustomFieldValue {
    pub property_id: i32,
    pub property_custom_field_id: i32,
    pub custom_date: Option<NaiveDate>,
    pub custom_date_time: Option<NaiveDateTime>,
    pub custom_time: Option<NaiveTime>,
    pub custom_int: Option<i32>,
    pub custom_decimal: Option<Decimal>,
    pub custom_short_text: Option<String>,
    pub custom_long_text: Option<String>,
    pub custom_max_text: Option<String>,
    pub custom_boolean: Option<bool>,
    pub custom_image_link: Option<String>,
}

impl NewCustomFieldValue {
    pub fn new(property_id: i32, property_custom_field_id: i32, values: CustomFieldValues) -> Self {
        NewCustomFieldValue {
            property_id,
            property_custom_field_id,
            custom_date: values.custom_date,
            custom_date_time: values.custom_date_time,
            custom_time: values.custom_time,
            custom_int: values.custom_int,
            custom_decimal: values.custom_decimal,
            custom_short_text: values.custom_short_text,
            custom_long_text: values.custom_long_text,
            custom_max_text: values.custom_max_text,
            custom_boolean: values.custom_boolean,
            custom_image_link: values.custom_image_link,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveCustomFieldValueRequest {
    pub property_id: Option<i32>,
    pub field_id: Option<i32>,
    #[serde(default)]
    pub values: CustomFieldValues,
}

impl SaveCustomFieldValueRequest {
    pub fn validate(self) -> Result<NewCustomFieldValue, AppError> {
        let (Some(property_id), Some(field_id)) = (self.property_id, self.field_id) else {
            return Err(AppError::validation("propertyId and fieldId are required"));
        };
        self.values.validate()?;
        Ok(NewCustomFieldValue::new(property_id, field_id, self.values))
    }
}

/// An active custom field together with one property's value for it.
#[derive(Debug, Clone, Serialize)]
pub struct CustomFieldWithValue {
    #[serde(rename = "ID")]
    pub id: i32,
    #[serde(rename = "FieldName")]
    pub field_name: String,
    #[serde(rename = "FieldLabel")]
    pub field_label: String,
    #[serde(rename = "CustomFieldTypeID")]
    pub custom_field_type_id: i32,
    #[serde(rename = "TabNumber")]
    pub tab_number: i32,
    #[serde(rename = "RowNumber")]
    pub row_number: i32,
    #[serde(rename = "ColNumber")]
    pub col_number: i32,
    #[serde(rename = "Rules")]
    pub rules: Option<String>,
    #[serde(rename = "FieldTypeDescription")]
    pub field_type_description: Option<String>,
    #[serde(rename = "FieldTypeDefinition")]
    pub field_type_definition: Option<String>,
    #[serde(rename = "ValueID")]
    pub value_id: Option<i32>,
    #[serde(flatten)]
    pub values: CustomFieldValues,
}

impl CustomFieldWithValue {
    pub fn new(
        field: PropertyCustomField,
        field_type: Option<&CustomFieldType>,
        value: Option<&CustomFieldValueRow>,
    ) -> Self {
        CustomFieldWithValue {
            id: field.id,
            field_name: field.field_name,
            field_label: field.field_label,
            custom_field_type_id: field.custom_field_type_id,
            tab_number: field.tab_number,
            row_number: field.row_number,
            col_number: field.col_number,
            rules: field.rules,
            field_type_description: field_type.and_then(|t| t.field_type_description.clone()),
            field_type_definition: field_type.and_then(|t| t.field_type_definition.clone()),
            value_id: value.map(|v| v.id),
            values: value.map(CustomFieldValueRow::values).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_defaults_to_first_cell() {
        let request: CreateCustomFieldRequest = serde_json::from_value(json!({
            "FieldName": "boiler_age", "FieldLabel": "Boiler age", "CustomFieldTypeID": 4
        }))
        .unwrap();
        let new = request.validate().unwrap();
        assert_eq!(new.position(), GridPosition { tab: 1, row: 1, column: 1 });
        assert!(new.is_active);
    }

    #[test]
    fn create_requires_name_label_and_type() {
        let request: CreateCustomFieldRequest =
            serde_json::from_value(json!({ "FieldName": "x", "FieldLabel": "X", "CustomFieldTypeID": 0 }))
                .unwrap();
        assert_eq!(
            request.validate().unwrap_err().to_string(),
            "FieldName, FieldLabel, and CustomFieldTypeID are required"
        );
    }

    #[test]
    fn update_distinguishes_null_rules() {
        let changes = serde_json::from_value::<UpdateCustomFieldRequest>(json!({ "Rules": null }))
            .unwrap()
            .into_changes()
            .unwrap();
        assert_eq!(changes.rules, Some(None));
        assert!(!changes.is_empty());

        let changes = serde_json::from_value::<UpdateCustomFieldRequest>(json!({ "Unknown": 1 }))
            .unwrap()
            .into_changes()
            .unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn update_target_keeps_unchanged_coordinates() {
        let current = PropertyCustomField {
            id: 1,
            field_name: "a".into(),
            field_label: "A".into(),
            custom_field_type_id: 1,
            tab_number: 2,
            row_number: 3,
            col_number: 1,
            is_active: true,
            rules: None,
        };
        let changes = CustomFieldChanges { col_number: Some(2), ..Default::default() };
        assert!(changes.moves());
        assert_eq!(
            changes.target_position(&current).unwrap(),
            GridPosition { tab: 2, row: 3, column: 2 }
        );
    }

    #[test]
    fn value_payload_accepts_browser_formats() {
        let values: CustomFieldValues = serde_json::from_value(json!({
            "CustomDateTime": "2024-02-01T09:15",
            "CustomTime": "17:45",
            "CustomBoolean": 1,
            "CustomDecimal": 12.75
        }))
        .unwrap();
        assert_eq!(values.custom_time, NaiveTime::from_hms_opt(17, 45, 0));
        assert_eq!(values.custom_boolean, Some(true));
        assert!(values.custom_date_time.is_some());
        assert_eq!(values.custom_decimal, Some(Decimal::new(1275, 2)));
    }

    #[test]
    fn text_lengths_are_bounded() {
        let values = CustomFieldValues {
            custom_short_text: Some("x".repeat(101)),
            ..Default::default()
        };
        assert_eq!(
            values.validate().unwrap_err().to_string(),
            "CustomShortText must be at most 100 characters"
        );
    }
}
