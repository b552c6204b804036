//! Persistence boundary. Handlers talk to a [`Store`]; the Postgres
//! implementation backs the running service and an in-memory one backs the
//! handler tests.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

use crate::grid::GridError;
use crate::models::{
    Attribute, AttributeChanges, AttributeDescriptor, AttributeGroup, ColumnInfo, CustomFieldChanges,
    CustomFieldType, CustomFieldView, CustomFieldWithValue, GroupMember, Lookup, LookupGroup,
    NewAttributeGroup, NewCustomField, NewCustomFieldValue, NewDescriptor, NewGroupMember, NewLookup,
    NewLookupGroup, NewPropertyAttribute, PropertyAttributeRecord, PropertyDetails,
};

#[cfg(test)]
pub mod memory;
pub mod postgres;

#[cfg(test)]
pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Reference(String),
    #[error("Database error: {0}")]
    Database(DieselError),
    #[error("Connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
}

impl From<DieselError> for StoreError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                StoreError::Conflict(info.message().to_string())
            }
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
                StoreError::Reference(info.message().to_string())
            }
            other => StoreError::Database(other),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

pub(crate) const RECORD_NOT_FOUND: &str = "Record not found";
pub(crate) const DUPLICATE_MEMBER: &str = "Attribute is already in this group";

pub(crate) fn duplicate_attribute(name: &str) -> StoreError {
    StoreError::Conflict(format!("An attribute named {name} already exists"))
}

pub(crate) fn duplicate_field(field_name: &str) -> StoreError {
    StoreError::Conflict(format!("{field_name} is already placed on this attribute"))
}

/// Every query the handlers need. Implementations are synchronous; callers
/// on the async side run them through `spawn_blocking`.
pub trait Store: Send + Sync + 'static {
    fn list_attributes(&self) -> StoreResult<Vec<Attribute>>;
    fn get_attribute(&self, id: i32) -> StoreResult<Option<Attribute>>;
    /// Inserts an active attribute. Names are unique ignoring case.
    fn create_attribute(&self, name: &str) -> StoreResult<i32>;
    fn update_attribute(&self, id: i32, changes: AttributeChanges) -> StoreResult<()>;
    fn delete_attribute(&self, id: i32) -> StoreResult<()>;

    /// Descriptors of one attribute, ordered by tab, row and column.
    fn list_descriptors(&self, attribute_id: i32) -> StoreResult<Vec<AttributeDescriptor>>;
    /// Inserts a staged batch all or nothing. Each cell and field name must be
    /// free on its attribute, both against stored rows and within the batch.
    fn insert_descriptors(&self, batch: Vec<NewDescriptor>) -> StoreResult<()>;
    fn delete_descriptor(&self, id: i32) -> StoreResult<()>;

    fn list_attribute_groups(&self) -> StoreResult<Vec<AttributeGroup>>;
    fn get_attribute_group(&self, id: i32) -> StoreResult<Option<AttributeGroup>>;
    fn create_attribute_group(&self, group: NewAttributeGroup) -> StoreResult<i32>;
    fn list_group_members(&self, group_id: i32) -> StoreResult<Vec<GroupMember>>;
    fn add_group_member(&self, member: NewGroupMember) -> StoreResult<i32>;
    fn remove_group_member(&self, group_id: i32, attribute_id: i32) -> StoreResult<()>;

    /// Custom fields ordered by tab, row and column, without their rules.
    fn list_custom_fields(&self) -> StoreResult<Vec<CustomFieldView>>;
    /// One custom field with its rules and type name.
    fn get_custom_field(&self, id: i32) -> StoreResult<Option<CustomFieldView>>;
    fn create_custom_field(&self, field: NewCustomField) -> StoreResult<i32>;
    /// Applies a non-empty change set, moving the field only onto a free cell.
    fn update_custom_field(&self, id: i32, changes: CustomFieldChanges) -> StoreResult<()>;
    fn delete_custom_field(&self, id: i32) -> StoreResult<()>;
    fn list_custom_field_types(&self) -> StoreResult<Vec<CustomFieldType>>;
    fn get_custom_field_type(&self, id: i32) -> StoreResult<Option<CustomFieldType>>;

    fn list_properties(&self) -> StoreResult<Vec<PropertyDetails>>;
    fn get_property(&self, id: i32) -> StoreResult<Option<PropertyDetails>>;
    fn parent_properties(&self, property_id: i32) -> StoreResult<Vec<PropertyDetails>>;
    fn child_properties(&self, property_id: i32) -> StoreResult<Vec<PropertyDetails>>;
    /// Occurrences on a property in display order.
    fn property_attributes(&self, property_id: i32) -> StoreResult<Vec<PropertyAttributeRecord>>;
    fn property_attribute(&self, id: i32) -> StoreResult<Option<PropertyAttributeRecord>>;
    fn insert_property_attribute(&self, attribute: NewPropertyAttribute) -> StoreResult<i32>;
    /// Active custom fields joined with one property's values.
    fn custom_field_values(&self, property_id: i32) -> StoreResult<Vec<CustomFieldWithValue>>;
    /// Inserts or replaces the value row for (property, field).
    fn save_custom_field_value(&self, value: NewCustomFieldValue) -> StoreResult<i32>;

    fn list_lookup_groups(&self) -> StoreResult<Vec<LookupGroup>>;
    fn create_lookup_group(&self, group: NewLookupGroup) -> StoreResult<i32>;
    fn list_lookups(&self, group_id: i32) -> StoreResult<Vec<Lookup>>;
    fn lookups_by_ids(&self, ids: &[i32]) -> StoreResult<Vec<Lookup>>;
    fn create_lookup(&self, lookup: NewLookup) -> StoreResult<i32>;

    /// Column metadata of the custom field tables.
    fn custom_field_columns(&self) -> StoreResult<Vec<ColumnInfo>>;
}
