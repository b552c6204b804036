use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::{flag, required_text};
use crate::error::AppError;
use crate::grid::GridPosition;
use crate::schema::{attribute, attribute_descriptor, attribute_group, attribute_group_attribute};
use crate::slots::FieldName;

#[derive(Debug, Clone, Serialize, Queryable, Selectable)]
#[diesel(table_name = attribute)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Attribute {
    #[serde(rename = "ID")]
    pub id: i32,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "isActive", serialize_with = "flag::as_int")]
    pub is_active: bool,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = attribute)]
pub struct NewAttribute<'a> {
    pub name: &'a str,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = attribute)]
pub struct AttributeChanges {
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

impl AttributeChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.is_active.is_none()
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateAttributeRequest {
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAttributeRequest {
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "isActive", default, deserialize_with = "flag::deserialize_opt")]
    pub is_active: Option<bool>,
}

impl UpdateAttributeRequest {
    pub fn into_changes(self) -> Result<AttributeChanges, AppError> {
        let name = match self.name {
            Some(name) => Some(required_text(Some(name)).ok_or_else(|| AppError::validation("Name cannot be empty"))?),
            None => None,
        };
        Ok(AttributeChanges { name, is_active: self.is_active })
    }
}

#[derive(Debug, Clone, Serialize, Queryable, Selectable)]
#[diesel(table_name = attribute_descriptor)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AttributeDescriptor {
    #[serde(rename = "ID")]
    pub id: i32,
    #[serde(rename = "AttributeID")]
    pub attribute_id: i32,
    #[serde(rename = "FieldName")]
    pub field_name: String,
    #[serde(rename = "Label")]
    pub label: Option<String>,
    #[serde(rename = "TabNumber")]
    pub tab_number: i32,
    #[serde(rename = "RowNumber")]
    pub row_number: i32,
    #[serde(rename = "ColumnNumber")]
    pub column_number: i32,
    #[serde(rename = "LookupGroupID")]
    pub lookup_group_id: Option<i32>,
}

impl AttributeDescriptor {
    pub fn position(&self) -> GridPosition {
        GridPosition {
            tab: self.tab_number,
            row: self.row_number,
            column: self.column_number,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = attribute_descriptor)]
pub struct NewDescriptor {
    pub attribute_id: i32,
    pub field_name: String,
    pub label: Option<String>,
    pub tab_number: i32,
    pub row_number: i32,
    pub column_number: i32,
    pub lookup_group_id: Option<i32>,
}

impl NewDescriptor {
    pub fn position(&self) -> GridPosition {
        GridPosition {
            tab: self.tab_number,
            row: self.row_number,
            column: self.column_number,
        }
    }
}

/// One staged cell assignment from the descriptor editor.
#[derive(Debug, Deserialize)]
pub struct DescriptorRequest {
    #[serde(rename = "AttributeID")]
    pub attribute_id: Option<i32>,
    #[serde(rename = "FieldName")]
    pub field_name: Option<String>,
    #[serde(rename = "Label")]
    pub label: Option<String>,
    #[serde(rename = "TabNumber")]
    pub tab_number: Option<i32>,
    #[serde(rename = "RowNumber")]
    pub row_number: Option<i32>,
    #[serde(rename = "ColumnNumber")]
    pub column_number: Option<i32>,
    #[serde(rename = "LookupGroupID")]
    pub lookup_group_id: Option<i32>,
}

impl DescriptorRequest {
    pub fn validate(self) -> Result<NewDescriptor, AppError> {
        let attribute_id = self
            .attribute_id
            .ok_or_else(|| AppError::validation("AttributeID is required"))?;
        let field: FieldName = required_text(self.field_name)
            .ok_or_else(|| AppError::validation("FieldName is required"))?
            .parse()?;
        let (Some(tab), Some(row), Some(column)) = (self.tab_number, self.row_number, self.column_number) else {
            return Err(AppError::validation(
                "TabNumber, RowNumber and ColumnNumber are required",
            ));
        };
        let position = GridPosition::new(tab, row, column)?;
        if self.lookup_group_id.is_some() && !field.is_lookup() {
            return Err(AppError::validation(format!(
                "LookupGroupID can only be set on lookup fields, not {field}"
            )));
        }
        Ok(NewDescriptor {
            attribute_id,
            field_name: field.to_string(),
            label: required_text(self.label),
            tab_number: position.tab,
            row_number: position.row,
            column_number: position.column,
            lookup_group_id: self.lookup_group_id,
        })
    }
}

/// Descriptor shape consumed by the property detail view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptorView {
    pub id: i32,
    pub attribute_id: i32,
    pub field_name: String,
    pub label: Option<String>,
    pub tab: i32,
    pub row: i32,
    pub col: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookup_group_id: Option<i32>,
}

impl From<AttributeDescriptor> for DescriptorView {
    fn from(d: AttributeDescriptor) -> Self {
        DescriptorView {
            id: d.id,
            attribute_id: d.attribute_id,
            field_name: d.field_name,
            label: d.label,
            tab: d.tab_number,
            row: d.row_number,
            col: d.column_number,
            lookup_group_id: d.lookup_group_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Queryable, Selectable)]
#[diesel(table_name = attribute_group)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AttributeGroup {
    #[serde(rename = "ID")]
    pub id: i32,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Description")]
    pub description: Option<String>,
    #[serde(rename = "isActive", serialize_with = "flag::as_int")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = attribute_group)]
pub struct NewAttributeGroup {
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateAttributeGroupRequest {
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
}

impl CreateAttributeGroupRequest {
    pub fn validate(self) -> Result<NewAttributeGroup, AppError> {
        let name = required_text(self.name).ok_or_else(|| AppError::validation("Name is required"))?;
        Ok(NewAttributeGroup {
            name,
            description: required_text(self.description),
            is_active: true,
        })
    }
}

/// A group membership row joined with the attribute's name.
#[derive(Debug, Clone, Serialize, Queryable)]
pub struct GroupMember {
    #[serde(rename = "ID")]
    pub id: i32,
    #[serde(rename = "AttributeGroupID")]
    pub attribute_group_id: i32,
    #[serde(rename = "AttributeID")]
    pub attribute_id: i32,
    #[serde(rename = "AttributeName")]
    pub attribute_name: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = attribute_group_attribute)]
pub struct NewGroupMember {
    pub attribute_group_id: i32,
    pub attribute_id: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddGroupMemberRequest {
    pub attribute_group_id: Option<i32>,
    pub attribute_id: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn descriptor(body: serde_json::Value) -> Result<NewDescriptor, AppError> {
        serde_json::from_value::<DescriptorRequest>(body).unwrap().validate()
    }

    #[test]
    fn descriptor_field_names_are_normalised() {
        let new = descriptor(json!({
            "AttributeID": 42, "FieldName": "string01", "Label": " Boiler Type ",
            "TabNumber": 1, "RowNumber": 1, "ColumnNumber": 1
        }))
        .unwrap();
        assert_eq!(new.field_name, "String01");
        assert_eq!(new.label.as_deref(), Some("Boiler Type"));
    }

    #[test]
    fn descriptor_requires_position_and_field() {
        let err = descriptor(json!({ "AttributeID": 1, "FieldName": "Int01" })).unwrap_err();
        assert_eq!(err.to_string(), "TabNumber, RowNumber and ColumnNumber are required");
        let err = descriptor(json!({ "AttributeID": 1, "TabNumber": 1, "RowNumber": 1, "ColumnNumber": 1 }))
            .unwrap_err();
        assert_eq!(err.to_string(), "FieldName is required");
        let err = descriptor(json!({
            "AttributeID": 1, "FieldName": "Colour", "TabNumber": 1, "RowNumber": 1, "ColumnNumber": 1
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "Unknown field name: Colour");
    }

    #[test]
    fn descriptor_tab_is_bounded() {
        let err = descriptor(json!({
            "AttributeID": 1, "FieldName": "Int01", "TabNumber": 4, "RowNumber": 1, "ColumnNumber": 1
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "Tab number must be 1, 2, or 3");
    }

    #[test]
    fn lookup_group_only_on_lookup_fields() {
        assert!(descriptor(json!({
            "AttributeID": 1, "FieldName": "Lookup01", "TabNumber": 1, "RowNumber": 2,
            "ColumnNumber": 1, "LookupGroupID": 3
        }))
        .is_ok());
        assert!(descriptor(json!({
            "AttributeID": 1, "FieldName": "String01", "TabNumber": 1, "RowNumber": 2,
            "ColumnNumber": 1, "LookupGroupID": 3
        }))
        .is_err());
    }

    #[test]
    fn attribute_serialises_flag_as_integer() {
        let attribute = Attribute { id: 4, name: "Heating".into(), is_active: true };
        assert_eq!(
            serde_json::to_value(attribute).unwrap(),
            json!({ "ID": 4, "Name": "Heating", "isActive": 1 })
        );
    }
}
