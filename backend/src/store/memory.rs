use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;

use super::{
    duplicate_attribute, duplicate_field, Store, StoreError, StoreResult, DUPLICATE_MEMBER,
    RECORD_NOT_FOUND,
};
use crate::grid::{ensure_vacant, GridError, GridPosition};
use crate::models::{
    sort_for_display, Attribute, AttributeChanges, AttributeDescriptor, AttributeGroup, ColumnInfo,
    CustomFieldChanges, CustomFieldType, CustomFieldValueRow, CustomFieldView, CustomFieldWithValue,
    GroupMember, Lookup, LookupGroup, NewAttributeGroup, NewCustomField, NewCustomFieldValue,
    NewDescriptor, NewGroupMember, NewLookup, NewLookupGroup, NewPropertyAttribute,
    PropertyAttributeRecord, PropertyAttributeRow, PropertyCustomField, PropertyDetails,
};

struct Hierarchy {
    parent: Option<i32>,
    child: i32,
}

#[derive(Default)]
struct Inner {
    next_id: i32,
    attributes: Vec<Attribute>,
    descriptors: Vec<AttributeDescriptor>,
    groups: Vec<AttributeGroup>,
    members: Vec<(i32, NewGroupMember)>,
    custom_fields: Vec<PropertyCustomField>,
    custom_field_types: Vec<CustomFieldType>,
    custom_values: Vec<CustomFieldValueRow>,
    properties: Vec<PropertyDetails>,
    hierarchy: Vec<Hierarchy>,
    occurrences: Vec<PropertyAttributeRecord>,
    lookup_groups: Vec<LookupGroup>,
    lookups: Vec<Lookup>,
}

impl Inner {
    fn view(&self, field: PropertyCustomField) -> CustomFieldView {
        let custom_field_type_name = self
            .custom_field_types
            .iter()
            .find(|t| t.id == field.custom_field_type_id)
            .and_then(|t| t.field_type_description.clone());
        CustomFieldView { field, custom_field_type_name }
    }

    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn name_taken(&self, name: &str, except: Option<i32>) -> bool {
        self.attributes
            .iter()
            .any(|a| Some(a.id) != except && a.name.to_lowercase() == name.to_lowercase())
    }

    fn custom_field_at(&self, position: GridPosition) -> Option<i32> {
        self.custom_fields
            .iter()
            .find(|f| f.position() == position)
            .map(|f| f.id)
    }

    fn properties_by_id(&self, ids: &[i32]) -> Vec<PropertyDetails> {
        self.properties
            .iter()
            .filter(|p| ids.contains(&p.property_id))
            .cloned()
            .collect()
    }

    /// Occurrences of a deleted attribute yield nothing, like the inner join
    /// on the attribute table.
    fn with_groups(&self, record: &PropertyAttributeRecord) -> Vec<PropertyAttributeRecord> {
        let Some(name) = self
            .attributes
            .iter()
            .find(|a| a.id == record.attribute_id)
            .map(|a| a.name.clone())
        else {
            return Vec::new();
        };
        let groups: Vec<&AttributeGroup> = self
            .members
            .iter()
            .filter(|(_, m)| m.attribute_id == record.attribute_id)
            .filter_map(|(_, m)| self.groups.iter().find(|g| g.id == m.attribute_group_id))
            .collect();
        let base = PropertyAttributeRecord { name, ..record.clone() };
        if groups.is_empty() {
            return vec![base];
        }
        groups
            .into_iter()
            .map(|g| PropertyAttributeRecord {
                attribute_group_id: Some(g.id),
                attribute_group_name: Some(g.name.clone()),
                ..base.clone()
            })
            .collect()
    }
}

/// Store kept in process memory for driving handlers in tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let store = MemoryStore::default();
        {
            let mut inner = store.lock();
            for (description, definition) in [
                ("Date", "CustomDate"),
                ("Whole number", "CustomInt"),
                ("Short text", "CustomShortText"),
                ("Yes/No", "CustomBoolean"),
            ] {
                let id = inner.next_id();
                inner.custom_field_types.push(CustomFieldType {
                    id,
                    field_type_description: Some(description.to_string()),
                    field_type_definition: Some(definition.to_string()),
                });
            }
        }
        store
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn custom_field_type_ids(&self) -> Vec<i32> {
        self.lock().custom_field_types.iter().map(|t| t.id).collect()
    }

    pub fn add_property(&self, property_id: i32, address: &str) {
        self.lock().properties.push(PropertyDetails {
            property_id,
            property_type_id: 1,
            address_id: property_id,
            prop_is_virtual: false,
            take_on_date: NaiveDate::from_ymd_opt(2001, 4, 1).unwrap_or_default(),
            disposed_date: None,
            disposal_method: None,
            address_line1: address.to_string(),
            address_line2: None,
            address_line3: None,
            post_code: Some("LS1 4AP".to_string()),
            uprn: None,
            type_name: "House".to_string(),
            is_block: false,
            is_dwelling: true,
            is_lettable: true,
            is_communual: false,
            is_virtual: false,
            is_utility: false,
            is_private: false,
            takeon_type: "Stock transfer".to_string(),
        });
    }

    pub fn link_properties(&self, parent: i32, child: i32) {
        self.lock().hierarchy.push(Hierarchy { parent: Some(parent), child });
    }
}

impl Store for MemoryStore {
    fn list_attributes(&self) -> StoreResult<Vec<Attribute>> {
        Ok(self.lock().attributes.clone())
    }

    fn get_attribute(&self, id: i32) -> StoreResult<Option<Attribute>> {
        Ok(self.lock().attributes.iter().find(|a| a.id == id).cloned())
    }

    fn create_attribute(&self, name: &str) -> StoreResult<i32> {
        let mut inner = self.lock();
        if inner.name_taken(name, None) {
            return Err(duplicate_attribute(name));
        }
        let id = inner.next_id();
        inner.attributes.push(Attribute { id, name: name.to_string(), is_active: true });
        Ok(id)
    }

    fn update_attribute(&self, id: i32, changes: AttributeChanges) -> StoreResult<()> {
        let mut inner = self.lock();
        if let Some(name) = &changes.name {
            if inner.name_taken(name, Some(id)) {
                return Err(duplicate_attribute(name));
            }
        }
        let attribute = inner
            .attributes
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| StoreError::NotFound(RECORD_NOT_FOUND.to_string()))?;
        if let Some(name) = changes.name {
            attribute.name = name;
        }
        if let Some(active) = changes.is_active {
            attribute.is_active = active;
        }
        Ok(())
    }

    fn delete_attribute(&self, id: i32) -> StoreResult<()> {
        self.lock().attributes.retain(|a| a.id != id);
        Ok(())
    }

    fn list_descriptors(&self, attribute_id: i32) -> StoreResult<Vec<AttributeDescriptor>> {
        let mut descriptors: Vec<AttributeDescriptor> = self
            .lock()
            .descriptors
            .iter()
            .filter(|d| d.attribute_id == attribute_id)
            .cloned()
            .collect();
        descriptors.sort_by_key(AttributeDescriptor::position);
        Ok(descriptors)
    }

    fn insert_descriptors(&self, batch: Vec<NewDescriptor>) -> StoreResult<()> {
        let mut inner = self.lock();
        let mut cells = HashSet::new();
        let mut fields = HashSet::new();
        for descriptor in &batch {
            let position = descriptor.position();
            if !cells.insert((descriptor.attribute_id, position)) {
                return Err(GridError::Occupied(position).into());
            }
            if !fields.insert((descriptor.attribute_id, descriptor.field_name.as_str())) {
                return Err(duplicate_field(&descriptor.field_name));
            }
            let siblings = inner
                .descriptors
                .iter()
                .filter(|d| d.attribute_id == descriptor.attribute_id);
            let occupant = siblings.clone().find(|d| d.position() == position).map(|d| d.id);
            ensure_vacant(position, occupant, None)?;
            if siblings.clone().any(|d| d.field_name == descriptor.field_name) {
                return Err(duplicate_field(&descriptor.field_name));
            }
        }
        for descriptor in batch {
            let id = inner.next_id();
            inner.descriptors.push(AttributeDescriptor {
                id,
                attribute_id: descriptor.attribute_id,
                field_name: descriptor.field_name,
                label: descriptor.label,
                tab_number: descriptor.tab_number,
                row_number: descriptor.row_number,
                column_number: descriptor.column_number,
                lookup_group_id: descriptor.lookup_group_id,
            });
        }
        Ok(())
    }

    fn delete_descriptor(&self, id: i32) -> StoreResult<()> {
        self.lock().descriptors.retain(|d| d.id != id);
        Ok(())
    }

    fn list_attribute_groups(&self) -> StoreResult<Vec<AttributeGroup>> {
        Ok(self.lock().groups.clone())
    }

    fn get_attribute_group(&self, id: i32) -> StoreResult<Option<AttributeGroup>> {
        Ok(self.lock().groups.iter().find(|g| g.id == id).cloned())
    }

    fn create_attribute_group(&self, group: NewAttributeGroup) -> StoreResult<i32> {
        let mut inner = self.lock();
        let id = inner.next_id();
        inner.groups.push(AttributeGroup {
            id,
            name: group.name,
            description: group.description,
            is_active: group.is_active,
        });
        Ok(id)
    }

    fn list_group_members(&self, group_id: i32) -> StoreResult<Vec<GroupMember>> {
        let inner = self.lock();
        let mut members: Vec<GroupMember> = inner
            .members
            .iter()
            .filter(|(_, m)| m.attribute_group_id == group_id)
            .filter_map(|(id, m)| {
                let attribute = inner.attributes.iter().find(|a| a.id == m.attribute_id)?;
                Some(GroupMember {
                    id: *id,
                    attribute_group_id: m.attribute_group_id,
                    attribute_id: m.attribute_id,
                    attribute_name: attribute.name.clone(),
                })
            })
            .collect();
        members.sort_by(|a, b| a.attribute_name.cmp(&b.attribute_name));
        Ok(members)
    }

    fn add_group_member(&self, member: NewGroupMember) -> StoreResult<i32> {
        let mut inner = self.lock();
        let exists = inner.members.iter().any(|(_, m)| {
            m.attribute_group_id == member.attribute_group_id && m.attribute_id == member.attribute_id
        });
        if exists {
            return Err(StoreError::Conflict(DUPLICATE_MEMBER.to_string()));
        }
        let id = inner.next_id();
        inner.members.push((id, member));
        Ok(id)
    }

    fn remove_group_member(&self, group_id: i32, attribute_id: i32) -> StoreResult<()> {
        self.lock()
            .members
            .retain(|(_, m)| !(m.attribute_group_id == group_id && m.attribute_id == attribute_id));
        Ok(())
    }

    fn list_custom_fields(&self) -> StoreResult<Vec<CustomFieldView>> {
        let inner = self.lock();
        let mut fields: Vec<CustomFieldView> = inner
            .custom_fields
            .iter()
            .map(|f| inner.view(PropertyCustomField { rules: None, ..f.clone() }))
            .collect();
        fields.sort_by_key(|v| v.field.position());
        Ok(fields)
    }

    fn get_custom_field(&self, id: i32) -> StoreResult<Option<CustomFieldView>> {
        let inner = self.lock();
        Ok(inner
            .custom_fields
            .iter()
            .find(|f| f.id == id)
            .map(|f| inner.view(f.clone())))
    }

    fn create_custom_field(&self, field: NewCustomField) -> StoreResult<i32> {
        let mut inner = self.lock();
        let position = field.position();
        ensure_vacant(position, inner.custom_field_at(position), None)?;
        let id = inner.next_id();
        inner.custom_fields.push(PropertyCustomField {
            id,
            field_name: field.field_name,
            field_label: field.field_label,
            custom_field_type_id: field.custom_field_type_id,
            tab_number: field.tab_number,
            row_number: field.row_number,
            col_number: field.col_number,
            is_active: field.is_active,
            rules: field.rules,
        });
        Ok(id)
    }

    fn update_custom_field(&self, id: i32, changes: CustomFieldChanges) -> StoreResult<()> {
        let mut inner = self.lock();
        let current = inner
            .custom_fields
            .iter()
            .find(|f| f.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(RECORD_NOT_FOUND.to_string()))?;
        if changes.moves() {
            let target = changes.target_position(&current)?;
            ensure_vacant(target, inner.custom_field_at(target), Some(id))?;
        }
        if let Some(field) = inner.custom_fields.iter_mut().find(|f| f.id == id) {
            changes.apply(field);
        }
        Ok(())
    }

    fn delete_custom_field(&self, id: i32) -> StoreResult<()> {
        self.lock().custom_fields.retain(|f| f.id != id);
        Ok(())
    }

    fn list_custom_field_types(&self) -> StoreResult<Vec<CustomFieldType>> {
        Ok(self.lock().custom_field_types.clone())
    }

    fn get_custom_field_type(&self, id: i32) -> StoreResult<Option<CustomFieldType>> {
        Ok(self.lock().custom_field_types.iter().find(|t| t.id == id).cloned())
    }

    fn list_properties(&self) -> StoreResult<Vec<PropertyDetails>> {
        Ok(self.lock().properties.clone())
    }

    fn get_property(&self, id: i32) -> StoreResult<Option<PropertyDetails>> {
        Ok(self.lock().properties.iter().find(|p| p.property_id == id).cloned())
    }

    fn parent_properties(&self, property_id: i32) -> StoreResult<Vec<PropertyDetails>> {
        let inner = self.lock();
        let parents: Vec<i32> = inner
            .hierarchy
            .iter()
            .filter(|h| h.child == property_id)
            .filter_map(|h| h.parent)
            .collect();
        Ok(inner.properties_by_id(&parents))
    }

    fn child_properties(&self, property_id: i32) -> StoreResult<Vec<PropertyDetails>> {
        let inner = self.lock();
        let children: Vec<i32> = inner
            .hierarchy
            .iter()
            .filter(|h| h.parent == Some(property_id))
            .map(|h| h.child)
            .collect();
        Ok(inner.properties_by_id(&children))
    }

    fn property_attributes(&self, property_id: i32) -> StoreResult<Vec<PropertyAttributeRecord>> {
        let inner = self.lock();
        let mut records: Vec<PropertyAttributeRecord> = inner
            .occurrences
            .iter()
            .filter(|r| r.property_id == property_id)
            .flat_map(|r| inner.with_groups(r))
            .collect();
        sort_for_display(&mut records);
        Ok(records)
    }

    fn property_attribute(&self, id: i32) -> StoreResult<Option<PropertyAttributeRecord>> {
        let inner = self.lock();
        Ok(inner
            .occurrences
            .iter()
            .find(|r| r.id == id)
            .and_then(|r| inner.with_groups(r).into_iter().next()))
    }

    fn insert_property_attribute(&self, new: NewPropertyAttribute) -> StoreResult<i32> {
        let mut inner = self.lock();
        let id = inner.next_id();
        let mut record = PropertyAttributeRecord::new(
            PropertyAttributeRow {
                id,
                property_id: new.property_id,
                attribute_id: new.attribute_id,
                is_active: new.is_active,
            },
            String::new(),
        );
        record.values = new.values.into_iter().collect::<BTreeMap<_, _>>();
        inner.occurrences.push(record);
        Ok(id)
    }

    fn custom_field_values(&self, property_id: i32) -> StoreResult<Vec<CustomFieldWithValue>> {
        let inner = self.lock();
        let mut fields: Vec<&PropertyCustomField> =
            inner.custom_fields.iter().filter(|f| f.is_active).collect();
        fields.sort_by_key(|f| f.position());
        Ok(fields
            .into_iter()
            .map(|f| {
                let field_type = inner.custom_field_types.iter().find(|t| t.id == f.custom_field_type_id);
                let value = inner
                    .custom_values
                    .iter()
                    .find(|v| v.property_id == property_id && v.property_custom_field_id == f.id);
                CustomFieldWithValue::new(f.clone(), field_type, value)
            })
            .collect())
    }

    fn save_custom_field_value(&self, value: NewCustomFieldValue) -> StoreResult<i32> {
        let mut inner = self.lock();
        let existing = inner.custom_values.iter().position(|v| {
            v.property_id == value.property_id && v.property_custom_field_id == value.property_custom_field_id
        });
        let id = match existing {
            Some(index) => inner.custom_values.remove(index).id,
            None => inner.next_id(),
        };
        inner.custom_values.push(CustomFieldValueRow {
            id,
            property_id: value.property_id,
            property_custom_field_id: value.property_custom_field_id,
            custom_date: value.custom_date,
            custom_date_time: value.custom_date_time,
            custom_time: value.custom_time,
            custom_int: value.custom_int,
            custom_decimal: value.custom_decimal,
            custom_short_text: value.custom_short_text,
            custom_long_text: value.custom_long_text,
            custom_max_text: value.custom_max_text,
            custom_boolean: value.custom_boolean,
            custom_image_link: value.custom_image_link,
        });
        Ok(id)
    }

    fn list_lookup_groups(&self) -> StoreResult<Vec<LookupGroup>> {
        Ok(self.lock().lookup_groups.clone())
    }

    fn create_lookup_group(&self, group: NewLookupGroup) -> StoreResult<i32> {
        let mut inner = self.lock();
        let id = inner.next_id();
        inner.lookup_groups.push(LookupGroup {
            id,
            name: group.name,
            is_active: group.is_active,
            description: group.description,
            metadata: None,
        });
        Ok(id)
    }

    fn list_lookups(&self, group_id: i32) -> StoreResult<Vec<Lookup>> {
        Ok(self
            .lock()
            .lookups
            .iter()
            .filter(|l| l.lookup_group_id == group_id)
            .cloned()
            .collect())
    }

    fn lookups_by_ids(&self, ids: &[i32]) -> StoreResult<Vec<Lookup>> {
        Ok(self
            .lock()
            .lookups
            .iter()
            .filter(|l| ids.contains(&l.id))
            .cloned()
            .collect())
    }

    fn create_lookup(&self, new: NewLookup) -> StoreResult<i32> {
        let mut inner = self.lock();
        let id = inner.next_id();
        inner.lookups.push(Lookup {
            id,
            lookup_group_id: new.lookup_group_id,
            value: new.value,
            is_active: new.is_active,
            meta_data: new.meta_data,
        });
        Ok(id)
    }

    fn custom_field_columns(&self) -> StoreResult<Vec<ColumnInfo>> {
        let column = |table: &str, name: &str, data_type: &str, nullable: bool| ColumnInfo {
            table_name: table.to_string(),
            column_name: name.to_string(),
            data_type: data_type.to_string(),
            character_maximum_length: None,
            is_nullable: if nullable { "YES" } else { "NO" }.to_string(),
            column_default: None,
        };
        Ok(vec![
            column("custom_field_type", "id", "integer", false),
            column("custom_field_type", "field_type_description", "character varying", true),
            column("property_custom_field", "id", "integer", false),
            column("property_custom_field", "field_name", "character varying", false),
            column("property_custom_field_value", "id", "integer", false),
            column("property_custom_field_value", "custom_date", "date", true),
        ])
    }
}
