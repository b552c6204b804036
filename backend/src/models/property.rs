use std::collections::BTreeMap;

use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::sql_types::{Integer, Nullable, Text};
use rust_decimal::Decimal;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::AppError;
use crate::schema::{property_attribute, property_attribute_value, property_details};
use crate::slots::{FieldName, SlotKind, SlotValue};

#[derive(Debug, Clone, Serialize, Queryable, Selectable)]
#[diesel(table_name = property_details)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PropertyDetails {
    #[serde(rename = "PropertyID")]
    pub property_id: i32,
    #[serde(rename = "PropertyTypeID")]
    pub property_type_id: i32,
    #[serde(rename = "AddressID")]
    pub address_id: i32,
    #[serde(rename = "PropIsVirtual")]
    pub prop_is_virtual: bool,
    #[serde(rename = "TakeOnDate")]
    pub take_on_date: NaiveDate,
    #[serde(rename = "DisposedDate")]
    pub disposed_date: Option<NaiveDate>,
    #[serde(rename = "DisposalMethod")]
    pub disposal_method: Option<i32>,
    #[serde(rename = "AddressLine1")]
    pub address_line1: String,
    #[serde(rename = "AddressLine2")]
    pub address_line2: Option<String>,
    #[serde(rename = "AddressLine3")]
    pub address_line3: Option<String>,
    #[serde(rename = "PostCode")]
    pub post_code: Option<String>,
    #[serde(rename = "UPRN")]
    pub uprn: Option<String>,
    #[serde(rename = "TypeName")]
    pub type_name: String,
    #[serde(rename = "isBlock")]
    pub is_block: bool,
    #[serde(rename = "isDwelling")]
    pub is_dwelling: bool,
    #[serde(rename = "isLettable")]
    pub is_lettable: bool,
    #[serde(rename = "isCommunual")]
    pub is_communual: bool,
    #[serde(rename = "isVirtual")]
    pub is_virtual: bool,
    #[serde(rename = "isUtility")]
    pub is_utility: bool,
    #[serde(rename = "isPrivate")]
    pub is_private: bool,
    #[serde(rename = "TakeonType")]
    pub takeon_type: String,
}

#[derive(Debug, Serialize)]
pub struct PropertyHierarchyView {
    pub parents: Vec<PropertyDetails>,
    pub children: Vec<PropertyDetails>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = property_attribute)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PropertyAttributeRow {
    pub id: i32,
    pub property_id: i32,
    pub attribute_id: i32,
    pub is_active: bool,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = property_attribute)]
pub struct NewPropertyAttributeRow {
    pub property_id: i32,
    pub attribute_id: i32,
    pub is_active: bool,
}

/// One slot value stored against a property attribute occurrence.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = property_attribute_value)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AttributeValueRow {
    pub property_attribute_id: i32,
    pub field_name: String,
    pub string_value: Option<String>,
    pub date_value: Option<NaiveDate>,
    pub int_value: Option<i32>,
    pub decimal_value: Option<Decimal>,
    pub lookup_value: Option<i32>,
    pub boolean_value: Option<bool>,
    pub image_value: Option<Vec<u8>>,
}

impl AttributeValueRow {
    /// Reads the column matching the field's kind. Rows naming an unknown
    /// field or holding NULL in that column are skipped.
    pub fn slot(&self) -> Option<(FieldName, SlotValue)> {
        let field: FieldName = self.field_name.parse().ok()?;
        let value = match field.kind() {
            SlotKind::String => SlotValue::String(self.string_value.clone()?),
            SlotKind::Date => SlotValue::Date(self.date_value?),
            SlotKind::Int => SlotValue::Int(self.int_value?),
            SlotKind::Decimal => SlotValue::Decimal(self.decimal_value?),
            SlotKind::Lookup => SlotValue::Lookup(self.lookup_value?),
            SlotKind::Boolean => SlotValue::Boolean(self.boolean_value?),
            SlotKind::Image => SlotValue::Image(self.image_value.clone()?),
        };
        Some((field, value))
    }
}

#[derive(Debug, Clone, Default, Insertable)]
#[diesel(table_name = property_attribute_value)]
pub struct NewAttributeValue {
    pub property_attribute_id: i32,
    pub field_name: String,
    pub string_value: Option<String>,
    pub date_value: Option<NaiveDate>,
    pub int_value: Option<i32>,
    pub decimal_value: Option<Decimal>,
    pub lookup_value: Option<i32>,
    pub boolean_value: Option<bool>,
    pub image_value: Option<Vec<u8>>,
}

impl NewAttributeValue {
    pub fn new(property_attribute_id: i32, field: FieldName, value: &SlotValue) -> Self {
        let mut row = NewAttributeValue {
            property_attribute_id,
            field_name: field.to_string(),
            ..Default::default()
        };
        match value {
            SlotValue::String(s) => row.string_value = Some(s.clone()),
            SlotValue::Date(d) => row.date_value = Some(*d),
            SlotValue::Int(n) => row.int_value = Some(*n),
            SlotValue::Decimal(d) => row.decimal_value = Some(*d),
            SlotValue::Lookup(id) => row.lookup_value = Some(*id),
            SlotValue::Boolean(b) => row.boolean_value = Some(*b),
            SlotValue::Image(bytes) => row.image_value = Some(bytes.clone()),
        }
        row
    }
}

/// A property attribute occurrence with its attribute, group and values.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyAttributeRecord {
    pub id: i32,
    pub property_id: i32,
    pub attribute_id: i32,
    pub is_active: bool,
    pub name: String,
    pub attribute_group_name: Option<String>,
    pub attribute_group_id: Option<i32>,
    pub values: BTreeMap<FieldName, SlotValue>,
}

impl PropertyAttributeRecord {
    pub fn new(row: PropertyAttributeRow, name: String) -> Self {
        PropertyAttributeRecord {
            id: row.id,
            property_id: row.property_id,
            attribute_id: row.attribute_id,
            is_active: row.is_active,
            name,
            attribute_group_name: None,
            attribute_group_id: None,
            values: BTreeMap::new(),
        }
    }

    pub fn value(&self, field: &FieldName) -> Option<&SlotValue> {
        self.values.get(field)
    }
}

impl Serialize for PropertyAttributeRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(7 + self.values.len()))?;
        map.serialize_entry("ID", &self.id)?;
        map.serialize_entry("PropertyID", &self.property_id)?;
        map.serialize_entry("AttributeID", &self.attribute_id)?;
        map.serialize_entry("isActive", &u8::from(self.is_active))?;
        map.serialize_entry("Name", &self.name)?;
        map.serialize_entry("AttributeGroupName", &self.attribute_group_name)?;
        map.serialize_entry("AttributeGroupID", &self.attribute_group_id)?;
        for (field, value) in &self.values {
            map.serialize_entry(field, &value.to_json())?;
        }
        map.end()
    }
}

/// Orders by group name with ungrouped attributes last, then attribute
/// name, then occurrence id.
pub fn sort_for_display(records: &mut [PropertyAttributeRecord]) {
    records.sort_by(|a, b| {
        let group = |r: &PropertyAttributeRecord| {
            (r.attribute_group_name.is_none(), r.attribute_group_name.clone().unwrap_or_default())
        };
        group(a)
            .cmp(&group(b))
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// A new occurrence of an attribute on a property, with its slot values.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPropertyAttribute {
    pub property_id: i32,
    pub attribute_id: i32,
    pub is_active: bool,
    pub values: Vec<(FieldName, SlotValue)>,
}

impl NewPropertyAttribute {
    /// Reads `PropertyID`, `AttributeID`, `isActive` and every key naming a
    /// storage slot. Other keys are ignored.
    pub fn from_json(body: &Map<String, Value>) -> Result<Self, AppError> {
        let id = |key: &str| -> Result<i32, AppError> {
            body.get(key)
                .and_then(Value::as_i64)
                .and_then(|n| i32::try_from(n).ok())
                .ok_or_else(|| AppError::validation(format!("{key} is required")))
        };
        let property_id = id("PropertyID")?;
        let attribute_id = id("AttributeID")?;
        let is_active = match body.get("isActive") {
            None | Some(Value::Null) => true,
            Some(v) => crate::slots::json_flag(v)
                .ok_or_else(|| AppError::validation("isActive must be 0 or 1"))?,
        };
        let mut values = Vec::new();
        for (key, raw) in body {
            let Ok(field) = key.parse::<FieldName>() else {
                continue;
            };
            if let Some(value) = SlotValue::from_json(field, raw)? {
                values.push((field, value));
            }
        }
        values.sort_by_key(|(field, _)| *field);
        values.dedup_by_key(|(field, _)| *field);
        Ok(NewPropertyAttribute { property_id, attribute_id, is_active, values })
    }
}

/// Column metadata returned by the introspection endpoint.
#[derive(Debug, Clone, Serialize, QueryableByName)]
pub struct ColumnInfo {
    #[diesel(sql_type = Text)]
    #[serde(rename = "TABLE_NAME")]
    pub table_name: String,
    #[diesel(sql_type = Text)]
    #[serde(rename = "COLUMN_NAME")]
    pub column_name: String,
    #[diesel(sql_type = Text)]
    #[serde(rename = "DATA_TYPE")]
    pub data_type: String,
    #[diesel(sql_type = Nullable<Integer>)]
    #[serde(rename = "CHARACTER_MAXIMUM_LENGTH")]
    pub character_maximum_length: Option<i32>,
    #[diesel(sql_type = Text)]
    #[serde(rename = "IS_NULLABLE")]
    pub is_nullable: String,
    #[diesel(sql_type = Nullable<Text>)]
    #[serde(rename = "COLUMN_DEFAULT")]
    pub column_default: Option<String>,
}
