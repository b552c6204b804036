//! Maps an attribute occurrence's stored slot values onto its descriptors,
//! producing labelled cells laid out on the display grid.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::dates::format_uk_date;
use crate::grid::{GridPosition, DENSE_COLUMNS, DENSE_ROWS, DISPLAY_COLUMNS, DISPLAY_ROWS, TAB_COUNT};
use crate::images::to_data_uri;
use crate::models::{AttributeDescriptor, PropertyAttributeRecord};
use crate::slots::{FieldName, SlotValue};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedCell {
    pub descriptor_id: i32,
    pub field_name: String,
    pub label: String,
    pub tab: i32,
    pub row: i32,
    pub col: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookup_group_id: Option<i32>,
    pub value: Value,
    pub display_value: String,
}

impl ResolvedCell {
    pub fn position(&self) -> GridPosition {
        GridPosition {
            tab: self.tab,
            row: self.row,
            column: self.col,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TabLayout {
    pub tab: i32,
    pub has_data: bool,
    pub rows: Vec<Vec<Option<ResolvedCell>>>,
    /// Cells placed beyond the dense grid, in position order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub overflow: Vec<ResolvedCell>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeGrid {
    pub property_attribute_id: i32,
    pub property_id: i32,
    pub attribute_id: i32,
    pub attribute_name: String,
    pub tabs: Vec<TabLayout>,
}

/// Lookup ids stored in the occurrence's lookup-typed descriptor slots.
pub fn lookup_ids(record: &PropertyAttributeRecord, descriptors: &[AttributeDescriptor]) -> Vec<i32> {
    let mut ids: Vec<i32> = descriptors
        .iter()
        .filter_map(|d| d.field_name.parse::<FieldName>().ok())
        .filter(FieldName::is_lookup)
        .filter_map(|field| match record.value(&field) {
            Some(SlotValue::Lookup(id)) => Some(*id),
            _ => None,
        })
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// One cell per descriptor, in descriptor order. `lookups` maps lookup ids
/// to their display values.
pub fn resolve_cells(
    record: &PropertyAttributeRecord,
    descriptors: &[AttributeDescriptor],
    lookups: &HashMap<i32, String>,
) -> Vec<ResolvedCell> {
    descriptors
        .iter()
        .map(|descriptor| {
            let stored = descriptor
                .field_name
                .parse::<FieldName>()
                .ok()
                .and_then(|field| record.value(&field));
            ResolvedCell {
                descriptor_id: descriptor.id,
                field_name: descriptor.field_name.clone(),
                label: descriptor
                    .label
                    .clone()
                    .unwrap_or_else(|| descriptor.field_name.clone()),
                tab: descriptor.tab_number,
                row: descriptor.row_number,
                col: descriptor.column_number,
                lookup_group_id: descriptor.lookup_group_id,
                value: stored.map(SlotValue::to_json).unwrap_or(Value::Null),
                display_value: stored.map(|v| display(v, lookups)).unwrap_or_default(),
            }
        })
        .collect()
}

fn display(value: &SlotValue, lookups: &HashMap<i32, String>) -> String {
    match value {
        SlotValue::String(s) => s.clone(),
        SlotValue::Date(d) => format_uk_date(*d),
        SlotValue::Int(n) => n.to_string(),
        SlotValue::Decimal(d) => d.normalize().to_string(),
        SlotValue::Lookup(id) => lookups.get(id).cloned().unwrap_or_else(|| id.to_string()),
        SlotValue::Boolean(true) => "Yes".to_string(),
        SlotValue::Boolean(false) => "No".to_string(),
        SlotValue::Image(bytes) => to_data_uri(bytes),
    }
}

/// Places cells on every tab, each at least `DISPLAY_ROWS` by
/// `DISPLAY_COLUMNS`, growing to fit the furthest cell up to `DENSE_ROWS` by
/// `DENSE_COLUMNS`. Cells further out are listed in `overflow`.
pub fn layout(cells: Vec<ResolvedCell>) -> Vec<TabLayout> {
    (1..=TAB_COUNT)
        .map(|tab| {
            let (dense, mut overflow): (Vec<&ResolvedCell>, Vec<&ResolvedCell>) = cells
                .iter()
                .filter(|c| c.tab == tab && c.row >= 1 && c.col >= 1)
                .partition(|c| c.row <= DENSE_ROWS && c.col <= DENSE_COLUMNS);
            let rows = dense.iter().map(|c| c.row).max().unwrap_or(0).max(DISPLAY_ROWS);
            let cols = dense.iter().map(|c| c.col).max().unwrap_or(0).max(DISPLAY_COLUMNS);
            let mut grid = vec![vec![None; cols as usize]; rows as usize];
            for cell in &dense {
                let slot = &mut grid[(cell.row - 1) as usize][(cell.col - 1) as usize];
                if slot.is_none() {
                    *slot = Some((*cell).clone());
                }
            }
            overflow.sort_by_key(|c| c.position());
            TabLayout {
                tab,
                has_data: !dense.is_empty() || !overflow.is_empty(),
                rows: grid,
                overflow: overflow.into_iter().cloned().collect(),
            }
        })
        .collect()
}

pub fn attribute_grid(
    record: &PropertyAttributeRecord,
    descriptors: &[AttributeDescriptor],
    lookups: &HashMap<i32, String>,
) -> AttributeGrid {
    AttributeGrid {
        property_attribute_id: record.id,
        property_id: record.property_id,
        attribute_id: record.attribute_id,
        attribute_name: record.name.clone(),
        tabs: layout(resolve_cells(record, descriptors, lookups)),
    }
}
