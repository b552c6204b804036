pub mod flag;

mod attribute;
mod custom_field;
mod lookup;
mod property;

pub use attribute::*;
pub use custom_field::*;
pub use lookup::*;
pub use property::*;

/// Trims a text field, treating blank input as absent.
pub(crate) fn required_text(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
