use std::collections::{BTreeMap, HashMap, HashSet};

use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::sql_types::Text;
use log::debug;

use super::{
    duplicate_attribute, duplicate_field, Store, StoreError, StoreResult, DUPLICATE_MEMBER,
    RECORD_NOT_FOUND,
};
use crate::db::{PgPool, PgPooled};
use crate::grid::{ensure_vacant, GridError, GridPosition};
use crate::models::{
    sort_for_display, Attribute, AttributeChanges, AttributeDescriptor, AttributeGroup,
    AttributeValueRow, ColumnInfo, CustomFieldChanges, CustomFieldType, CustomFieldValueRow,
    CustomFieldView, CustomFieldWithValue, GroupMember, Lookup, LookupGroup, NewAttribute,
    NewAttributeGroup, NewAttributeValue, NewCustomField, NewCustomFieldValue, NewDescriptor,
    NewGroupMember, NewLookup, NewLookupGroup, NewPropertyAttribute, NewPropertyAttributeRow,
    PropertyAttributeRecord, PropertyAttributeRow, PropertyCustomField, PropertyDetails,
};
use crate::schema::{
    attribute, attribute_descriptor, attribute_group, attribute_group_attribute, custom_field_type,
    lookup, lookup_group, property_attribute, property_attribute_value, property_custom_field,
    property_custom_field_value, property_details, property_hierarchy,
};

diesel::define_sql_function!(fn lower(x: Text) -> Text);

const CUSTOM_FIELD_COLUMNS: &str = "\
    SELECT table_name::text AS table_name, \
           column_name::text AS column_name, \
           data_type::text AS data_type, \
           character_maximum_length::int4 AS character_maximum_length, \
           is_nullable::text AS is_nullable, \
           column_default::text AS column_default \
    FROM information_schema.columns \
    WHERE table_schema = current_schema() \
      AND table_name IN ('custom_field_type', 'property_custom_field', 'property_custom_field_value') \
    ORDER BY table_name, ordinal_position";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    fn conn(&self) -> StoreResult<PgPooled> {
        Ok(self.pool.get()?)
    }
}

fn descriptor_at(
    conn: &mut PgConnection,
    attribute_id: i32,
    position: GridPosition,
) -> QueryResult<Option<i32>> {
    attribute_descriptor::table
        .filter(attribute_descriptor::attribute_id.eq(attribute_id))
        .filter(attribute_descriptor::tab_number.eq(position.tab))
        .filter(attribute_descriptor::row_number.eq(position.row))
        .filter(attribute_descriptor::column_number.eq(position.column))
        .select(attribute_descriptor::id)
        .first(conn)
        .optional()
}

fn custom_field_at(conn: &mut PgConnection, position: GridPosition) -> QueryResult<Option<i32>> {
    property_custom_field::table
        .filter(property_custom_field::tab_number.eq(position.tab))
        .filter(property_custom_field::row_number.eq(position.row))
        .filter(property_custom_field::col_number.eq(position.column))
        .select(property_custom_field::id)
        .first(conn)
        .optional()
}

/// Case-insensitive name check, ignoring the attribute being renamed.
fn attribute_name_taken(conn: &mut PgConnection, name: &str, except: Option<i32>) -> QueryResult<bool> {
    attribute::table
        .filter(lower(attribute::name).eq(name.to_lowercase()))
        .filter(attribute::id.ne(except.unwrap_or(0)))
        .count()
        .get_result::<i64>(conn)
        .map(|n| n > 0)
}

fn properties_by_id(conn: &mut PgConnection, ids: Vec<i32>) -> QueryResult<Vec<PropertyDetails>> {
    property_details::table
        .filter(property_details::property_id.eq_any(ids))
        .order(property_details::property_id)
        .select(PropertyDetails::as_select())
        .load(conn)
}

/// Attaches slot values and group membership to occurrence rows. An
/// attribute in several groups yields one record per group.
fn assemble_records(
    conn: &mut PgConnection,
    rows: Vec<(PropertyAttributeRow, String)>,
) -> QueryResult<Vec<PropertyAttributeRecord>> {
    let occurrence_ids: Vec<i32> = rows.iter().map(|(row, _)| row.id).collect();
    let attribute_ids: Vec<i32> = rows.iter().map(|(row, _)| row.attribute_id).collect();

    let mut values: HashMap<i32, BTreeMap<_, _>> = HashMap::new();
    let value_rows: Vec<AttributeValueRow> = property_attribute_value::table
        .filter(property_attribute_value::property_attribute_id.eq_any(&occurrence_ids))
        .select(AttributeValueRow::as_select())
        .load(conn)?;
    for row in value_rows {
        if let Some((field, value)) = row.slot() {
            values.entry(row.property_attribute_id).or_default().insert(field, value);
        }
    }

    let mut groups: HashMap<i32, Vec<(i32, String)>> = HashMap::new();
    let memberships: Vec<(i32, i32, String)> = attribute_group_attribute::table
        .inner_join(attribute_group::table)
        .filter(attribute_group_attribute::attribute_id.eq_any(&attribute_ids))
        .select((
            attribute_group_attribute::attribute_id,
            attribute_group::id,
            attribute_group::name,
        ))
        .load(conn)?;
    for (attribute_id, group_id, group_name) in memberships {
        groups.entry(attribute_id).or_default().push((group_id, group_name));
    }

    let mut records = Vec::with_capacity(rows.len());
    for (row, name) in rows {
        let mut record = PropertyAttributeRecord::new(row, name);
        record.values = values.remove(&record.id).unwrap_or_default();
        match groups.get(&record.attribute_id) {
            Some(memberships) => {
                for (group_id, group_name) in memberships {
                    let mut grouped = record.clone();
                    grouped.attribute_group_id = Some(*group_id);
                    grouped.attribute_group_name = Some(group_name.clone());
                    records.push(grouped);
                }
            }
            None => records.push(record),
        }
    }
    sort_for_display(&mut records);
    Ok(records)
}

impl Store for PgStore {
    fn list_attributes(&self) -> StoreResult<Vec<Attribute>> {
        let mut conn = self.conn()?;
        Ok(attribute::table
            .order(attribute::id)
            .select(Attribute::as_select())
            .load(&mut conn)?)
    }

    fn get_attribute(&self, id: i32) -> StoreResult<Option<Attribute>> {
        let mut conn = self.conn()?;
        Ok(attribute::table
            .find(id)
            .select(Attribute::as_select())
            .first(&mut conn)
            .optional()?)
    }

    fn create_attribute(&self, name: &str) -> StoreResult<i32> {
        let mut conn = self.conn()?;
        conn.transaction::<_, StoreError, _>(|conn| {
            if attribute_name_taken(conn, name, None)? {
                return Err(duplicate_attribute(name));
            }
            let id: i32 = diesel::insert_into(attribute::table)
                .values(&NewAttribute { name, is_active: true })
                .returning(attribute::id)
                .get_result(conn)?;
            debug!("Created attribute {} ({})", id, name);
            Ok(id)
        })
    }

    fn update_attribute(&self, id: i32, changes: AttributeChanges) -> StoreResult<()> {
        let mut conn = self.conn()?;
        conn.transaction::<_, StoreError, _>(|conn| {
            if let Some(name) = &changes.name {
                if attribute_name_taken(conn, name, Some(id))? {
                    return Err(duplicate_attribute(name));
                }
            }
            let updated = diesel::update(attribute::table.find(id))
                .set(&changes)
                .execute(conn)?;
            if updated == 0 {
                return Err(StoreError::NotFound(RECORD_NOT_FOUND.to_string()));
            }
            Ok(())
        })
    }

    fn delete_attribute(&self, id: i32) -> StoreResult<()> {
        let mut conn = self.conn()?;
        diesel::delete(attribute::table.find(id)).execute(&mut conn)?;
        Ok(())
    }

    fn list_descriptors(&self, attribute_id: i32) -> StoreResult<Vec<AttributeDescriptor>> {
        let mut conn = self.conn()?;
        Ok(attribute_descriptor::table
            .filter(attribute_descriptor::attribute_id.eq(attribute_id))
            .order((
                attribute_descriptor::tab_number,
                attribute_descriptor::row_number,
                attribute_descriptor::column_number,
            ))
            .select(AttributeDescriptor::as_select())
            .load(&mut conn)?)
    }

    fn insert_descriptors(&self, batch: Vec<NewDescriptor>) -> StoreResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn()?;
        conn.transaction::<_, StoreError, _>(|conn| {
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
                ensure_vacant(position, descriptor_at(conn, descriptor.attribute_id, position)?, None)?;
                let placed: i64 = attribute_descriptor::table
                    .filter(attribute_descriptor::attribute_id.eq(descriptor.attribute_id))
                    .filter(attribute_descriptor::field_name.eq(&descriptor.field_name))
                    .count()
                    .get_result(conn)?;
                if placed > 0 {
                    return Err(duplicate_field(&descriptor.field_name));
                }
            }
            diesel::insert_into(attribute_descriptor::table)
                .values(&batch)
                .execute(conn)?;
            Ok(())
        })
    }

    fn delete_descriptor(&self, id: i32) -> StoreResult<()> {
        let mut conn = self.conn()?;
        diesel::delete(attribute_descriptor::table.find(id)).execute(&mut conn)?;
        Ok(())
    }

    fn list_attribute_groups(&self) -> StoreResult<Vec<AttributeGroup>> {
        let mut conn = self.conn()?;
        Ok(attribute_group::table
            .order(attribute_group::id)
            .select(AttributeGroup::as_select())
            .load(&mut conn)?)
    }

    fn get_attribute_group(&self, id: i32) -> StoreResult<Option<AttributeGroup>> {
        let mut conn = self.conn()?;
        Ok(attribute_group::table
            .find(id)
            .select(AttributeGroup::as_select())
            .first(&mut conn)
            .optional()?)
    }

    fn create_attribute_group(&self, group: NewAttributeGroup) -> StoreResult<i32> {
        let mut conn = self.conn()?;
        Ok(diesel::insert_into(attribute_group::table)
            .values(&group)
            .returning(attribute_group::id)
            .get_result(&mut conn)?)
    }

    fn list_group_members(&self, group_id: i32) -> StoreResult<Vec<GroupMember>> {
        let mut conn = self.conn()?;
        Ok(attribute_group_attribute::table
            .inner_join(attribute::table)
            .filter(attribute_group_attribute::attribute_group_id.eq(group_id))
            .order(attribute::name)
            .select((
                attribute_group_attribute::id,
                attribute_group_attribute::attribute_group_id,
                attribute_group_attribute::attribute_id,
                attribute::name,
            ))
            .load(&mut conn)?)
    }

    fn add_group_member(&self, member: NewGroupMember) -> StoreResult<i32> {
        let mut conn = self.conn()?;
        conn.transaction::<_, StoreError, _>(|conn| {
            let existing: i64 = attribute_group_attribute::table
                .filter(attribute_group_attribute::attribute_group_id.eq(member.attribute_group_id))
                .filter(attribute_group_attribute::attribute_id.eq(member.attribute_id))
                .count()
                .get_result(conn)?;
            if existing > 0 {
                return Err(StoreError::Conflict(DUPLICATE_MEMBER.to_string()));
            }
            Ok(diesel::insert_into(attribute_group_attribute::table)
                .values(&member)
                .returning(attribute_group_attribute::id)
                .get_result(conn)?)
        })
    }

    fn remove_group_member(&self, group_id: i32, attribute_id: i32) -> StoreResult<()> {
        let mut conn = self.conn()?;
        diesel::delete(
            attribute_group_attribute::table
                .filter(attribute_group_attribute::attribute_group_id.eq(group_id))
                .filter(attribute_group_attribute::attribute_id.eq(attribute_id)),
        )
        .execute(&mut conn)?;
        Ok(())
    }

    fn list_custom_fields(&self) -> StoreResult<Vec<CustomFieldView>> {
        let mut conn = self.conn()?;
        let rows: Vec<(PropertyCustomField, Option<String>)> = property_custom_field::table
            .left_join(custom_field_type::table)
            .order((
                property_custom_field::tab_number,
                property_custom_field::row_number,
                property_custom_field::col_number,
            ))
            .select((
                PropertyCustomField::as_select(),
                custom_field_type::field_type_description.nullable(),
            ))
            .load(&mut conn)?;
        Ok(rows
            .into_iter()
            .map(|(mut field, type_name)| {
                field.rules = None;
                CustomFieldView { field, custom_field_type_name: type_name }
            })
            .collect())
    }

    fn get_custom_field(&self, id: i32) -> StoreResult<Option<CustomFieldView>> {
        let mut conn = self.conn()?;
        let row: Option<(PropertyCustomField, Option<String>)> = property_custom_field::table
            .left_join(custom_field_type::table)
            .filter(property_custom_field::id.eq(id))
            .select((
                PropertyCustomField::as_select(),
                custom_field_type::field_type_description.nullable(),
            ))
            .first(&mut conn)
            .optional()?;
        Ok(row.map(|(field, type_name)| CustomFieldView { field, custom_field_type_name: type_name }))
    }

    fn create_custom_field(&self, field: NewCustomField) -> StoreResult<i32> {
        let mut conn = self.conn()?;
        conn.transaction::<_, StoreError, _>(|conn| {
            let position = field.position();
            ensure_vacant(position, custom_field_at(conn, position)?, None)?;
            Ok(diesel::insert_into(property_custom_field::table)
                .values(&field)
                .returning(property_custom_field::id)
                .get_result(conn)?)
        })
    }

    fn update_custom_field(&self, id: i32, changes: CustomFieldChanges) -> StoreResult<()> {
        let mut conn = self.conn()?;
        conn.transaction::<_, StoreError, _>(|conn| {
            let current = property_custom_field::table
                .find(id)
                .select(PropertyCustomField::as_select())
                .first(conn)
                .optional()?
                .ok_or_else(|| StoreError::NotFound(RECORD_NOT_FOUND.to_string()))?;
            if changes.moves() {
                let target = changes.target_position(&current)?;
                ensure_vacant(target, custom_field_at(conn, target)?, Some(id))?;
            }
            diesel::update(property_custom_field::table.find(id))
                .set(&changes)
                .execute(conn)?;
            Ok(())
        })
    }

    fn delete_custom_field(&self, id: i32) -> StoreResult<()> {
        let mut conn = self.conn()?;
        diesel::delete(property_custom_field::table.find(id)).execute(&mut conn)?;
        Ok(())
    }

    fn list_custom_field_types(&self) -> StoreResult<Vec<CustomFieldType>> {
        let mut conn = self.conn()?;
        Ok(custom_field_type::table
            .order(custom_field_type::id)
            .select(CustomFieldType::as_select())
            .load(&mut conn)?)
    }

    fn get_custom_field_type(&self, id: i32) -> StoreResult<Option<CustomFieldType>> {
        let mut conn = self.conn()?;
        Ok(custom_field_type::table
            .find(id)
            .select(CustomFieldType::as_select())
            .first(&mut conn)
            .optional()?)
    }

    fn list_properties(&self) -> StoreResult<Vec<PropertyDetails>> {
        let mut conn = self.conn()?;
        Ok(property_details::table
            .order(property_details::property_id)
            .select(PropertyDetails::as_select())
            .load(&mut conn)?)
    }

    fn get_property(&self, id: i32) -> StoreResult<Option<PropertyDetails>> {
        let mut conn = self.conn()?;
        Ok(property_details::table
            .find(id)
            .select(PropertyDetails::as_select())
            .first(&mut conn)
            .optional()?)
    }

    fn parent_properties(&self, property_id: i32) -> StoreResult<Vec<PropertyDetails>> {
        let mut conn = self.conn()?;
        let parents: Vec<i32> = property_hierarchy::table
            .filter(property_hierarchy::child_property_id.eq(property_id))
            .select(property_hierarchy::parent_property_id)
            .load::<Option<i32>>(&mut conn)?
            .into_iter()
            .flatten()
            .collect();
        Ok(properties_by_id(&mut conn, parents)?)
    }

    fn child_properties(&self, property_id: i32) -> StoreResult<Vec<PropertyDetails>> {
        let mut conn = self.conn()?;
        let children: Vec<i32> = property_hierarchy::table
            .filter(property_hierarchy::parent_property_id.eq(property_id))
            .select(property_hierarchy::child_property_id)
            .load(&mut conn)?;
        Ok(properties_by_id(&mut conn, children)?)
    }

    fn property_attributes(&self, property_id: i32) -> StoreResult<Vec<PropertyAttributeRecord>> {
        let mut conn = self.conn()?;
        let rows = property_attribute::table
            .inner_join(attribute::table)
            .filter(property_attribute::property_id.eq(property_id))
            .select((PropertyAttributeRow::as_select(), attribute::name))
            .load(&mut conn)?;
        Ok(assemble_records(&mut conn, rows)?)
    }

    fn property_attribute(&self, id: i32) -> StoreResult<Option<PropertyAttributeRecord>> {
        let mut conn = self.conn()?;
        let rows = property_attribute::table
            .inner_join(attribute::table)
            .filter(property_attribute::id.eq(id))
            .select((PropertyAttributeRow::as_select(), attribute::name))
            .load(&mut conn)?;
        Ok(assemble_records(&mut conn, rows)?.into_iter().next())
    }

    fn insert_property_attribute(&self, new: NewPropertyAttribute) -> StoreResult<i32> {
        let mut conn = self.conn()?;
        conn.transaction::<_, StoreError, _>(|conn| {
            let id: i32 = diesel::insert_into(property_attribute::table)
                .values(&NewPropertyAttributeRow {
                    property_id: new.property_id,
                    attribute_id: new.attribute_id,
                    is_active: new.is_active,
                })
                .returning(property_attribute::id)
                .get_result(conn)?;
            let values: Vec<NewAttributeValue> = new
                .values
                .iter()
                .map(|(field, value)| NewAttributeValue::new(id, *field, value))
                .collect();
            if !values.is_empty() {
                diesel::insert_into(property_attribute_value::table)
                    .values(&values)
                    .execute(conn)?;
            }
            debug!(
                "Stored attribute {} on property {} with {} values",
                new.attribute_id,
                new.property_id,
                values.len()
            );
            Ok(id)
        })
    }

    fn custom_field_values(&self, property_id: i32) -> StoreResult<Vec<CustomFieldWithValue>> {
        let mut conn = self.conn()?;
        let rows: Vec<(PropertyCustomField, Option<CustomFieldType>, Option<CustomFieldValueRow>)> =
            property_custom_field::table
                .left_join(custom_field_type::table)
                .left_join(
                    property_custom_field_value::table.on(property_custom_field_value::property_custom_field_id
                        .eq(property_custom_field::id)
                        .and(property_custom_field_value::property_id.eq(property_id))),
                )
                .filter(property_custom_field::is_active.eq(true))
                .order((
                    property_custom_field::tab_number,
                    property_custom_field::row_number,
                    property_custom_field::col_number,
                ))
                .select((
                    PropertyCustomField::as_select(),
                    Option::<CustomFieldType>::as_select(),
                    Option::<CustomFieldValueRow>::as_select(),
                ))
                .load(&mut conn)?;
        Ok(rows
            .into_iter()
            .map(|(field, field_type, value)| {
                CustomFieldWithValue::new(field, field_type.as_ref(), value.as_ref())
            })
            .collect())
    }

    fn save_custom_field_value(&self, value: NewCustomFieldValue) -> StoreResult<i32> {
        let mut conn = self.conn()?;
        Ok(diesel::insert_into(property_custom_field_value::table)
            .values(&value)
            .on_conflict((
                property_custom_field_value::property_id,
                property_custom_field_value::property_custom_field_id,
            ))
            .do_update()
            .set(&value)
            .returning(property_custom_field_value::id)
            .get_result(&mut conn)?)
    }

    fn list_lookup_groups(&self) -> StoreResult<Vec<LookupGroup>> {
        let mut conn = self.conn()?;
        Ok(lookup_group::table
            .order(lookup_group::id)
            .select(LookupGroup::as_select())
            .load(&mut conn)?)
    }

    fn create_lookup_group(&self, group: NewLookupGroup) -> StoreResult<i32> {
        let mut conn = self.conn()?;
        Ok(diesel::insert_into(lookup_group::table)
            .values(&group)
            .returning(lookup_group::id)
            .get_result(&mut conn)?)
    }

    fn list_lookups(&self, group_id: i32) -> StoreResult<Vec<Lookup>> {
        let mut conn = self.conn()?;
        Ok(lookup::table
            .filter(lookup::lookup_group_id.eq(group_id))
            .order(lookup::id)
            .select(Lookup::as_select())
            .load(&mut conn)?)
    }

    fn lookups_by_ids(&self, ids: &[i32]) -> StoreResult<Vec<Lookup>> {
        let mut conn = self.conn()?;
        Ok(lookup::table
            .filter(lookup::id.eq_any(ids))
            .order(lookup::id)
            .select(Lookup::as_select())
            .load(&mut conn)?)
    }

    fn create_lookup(&self, new: NewLookup) -> StoreResult<i32> {
        let mut conn = self.conn()?;
        Ok(diesel::insert_into(lookup::table)
            .values(&new)
            .returning(lookup::id)
            .get_result(&mut conn)?)
    }

    fn custom_field_columns(&self) -> StoreResult<Vec<ColumnInfo>> {
        let mut conn = self.conn()?;
        Ok(diesel::sql_query(CUSTOM_FIELD_COLUMNS).load(&mut conn)?)
    }
}
