//! Storage slots an attribute's values live in.
//!
//! A slot is addressed by a field name of the form `<Kind><NN>`, e.g.
//! `String01` or `Lookup03`. Descriptors map slots to labels and grid cells;
//! property attribute occurrences store one value per slot.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

use crate::{dates, images};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SlotKind {
    String,
    Date,
    Int,
    Decimal,
    Lookup,
    Boolean,
    Image,
}

impl SlotKind {
    pub const ALL: [SlotKind; 7] = [
        SlotKind::String,
        SlotKind::Date,
        SlotKind::Int,
        SlotKind::Decimal,
        SlotKind::Lookup,
        SlotKind::Boolean,
        SlotKind::Image,
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            SlotKind::String => "String",
            SlotKind::Date => "Date",
            SlotKind::Int => "Int",
            SlotKind::Decimal => "Decimal",
            SlotKind::Lookup => "Lookup",
            SlotKind::Boolean => "Boolean",
            SlotKind::Image => "Image",
        }
    }

    /// Column type reported by the field catalogue.
    pub fn column_type(self) -> &'static str {
        match self {
            SlotKind::String => "varchar",
            SlotKind::Date => "date",
            SlotKind::Int | SlotKind::Lookup => "integer",
            SlotKind::Decimal => "numeric",
            SlotKind::Boolean => "boolean",
            SlotKind::Image => "bytea",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldName {
    kind: SlotKind,
    index: u8,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlotError {
    #[error("Unknown field name: {0}")]
    UnknownField(String),
    #[error("{field} expects {expected}")]
    InvalidValue { field: FieldName, expected: &'static str },
}

impl FieldName {
    pub fn new(kind: SlotKind, index: u8) -> Option<Self> {
        (1..=99).contains(&index).then_some(Self { kind, index })
    }

    pub fn kind(&self) -> SlotKind {
        self.kind
    }

    pub fn is_lookup(&self) -> bool {
        self.kind == SlotKind::Lookup
    }
}

impl FromStr for FieldName {
    type Err = SlotError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let unknown = || SlotError::UnknownField(raw.to_string());
        let kind = SlotKind::ALL
            .into_iter()
            .find(|kind| {
                let prefix = kind.prefix();
                raw.len() == prefix.len() + 2
                    && raw.is_char_boundary(prefix.len())
                    && raw[..prefix.len()].eq_ignore_ascii_case(prefix)
            })
            .ok_or_else(unknown)?;
        let digits = &raw[kind.prefix().len()..];
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(unknown());
        }
        let index: u8 = digits.parse().map_err(|_| unknown())?;
        FieldName::new(kind, index).ok_or_else(unknown)
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:02}", self.kind.prefix(), self.index)
    }
}

impl Serialize for FieldName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Whether a raw descriptor field name refers to a lookup slot.
pub fn is_lookup_field(raw: &str) -> bool {
    raw.to_ascii_lowercase().contains("lookup")
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: &'static str,
}

/// The slots offered to the descriptor editor, `per_kind` of each kind.
pub fn catalogue(per_kind: u8) -> Vec<FieldSpec> {
    SlotKind::ALL
        .into_iter()
        .flat_map(|kind| {
            (1..=per_kind.min(99)).filter_map(move |index| {
                FieldName::new(kind, index).map(|field| FieldSpec {
                    name: field.to_string(),
                    column_type: kind.column_type(),
                })
            })
        })
        .collect()
}

/// A stored value for one slot.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotValue {
    String(String),
    Date(NaiveDate),
    Int(i32),
    Decimal(Decimal),
    Lookup(i32),
    Boolean(bool),
    Image(Vec<u8>),
}

impl SlotValue {
    pub fn kind(&self) -> SlotKind {
        match self {
            SlotValue::String(_) => SlotKind::String,
            SlotValue::Date(_) => SlotKind::Date,
            SlotValue::Int(_) => SlotKind::Int,
            SlotValue::Decimal(_) => SlotKind::Decimal,
            SlotValue::Lookup(_) => SlotKind::Lookup,
            SlotValue::Boolean(_) => SlotKind::Boolean,
            SlotValue::Image(_) => SlotKind::Image,
        }
    }

    /// Reads a request value for `field`. Nulls, blank strings and
    /// unparseable UK dates are treated as "no value".
    pub fn from_json(field: FieldName, value: &Value) -> Result<Option<SlotValue>, SlotError> {
        if value.is_null() || value.as_str().is_some_and(|s| s.trim().is_empty()) {
            return Ok(None);
        }
        let invalid = |expected| SlotError::InvalidValue { field, expected };
        let parsed = match field.kind() {
            SlotKind::String => match value {
                Value::String(s) => SlotValue::String(s.clone()),
                Value::Number(n) => SlotValue::String(n.to_string()),
                Value::Bool(b) => SlotValue::String(b.to_string()),
                _ => return Err(invalid("text")),
            },
            SlotKind::Date => match value.as_str().and_then(dates::parse_uk_date) {
                Some(date) => SlotValue::Date(date),
                None => return Ok(None),
            },
            SlotKind::Int => SlotValue::Int(json_i32(value).ok_or_else(|| invalid("a whole number"))?),
            SlotKind::Lookup => {
                SlotValue::Lookup(json_i32(value).ok_or_else(|| invalid("a lookup id"))?)
            }
            SlotKind::Decimal => SlotValue::Decimal(json_decimal(value).ok_or_else(|| invalid("a number"))?),
            SlotKind::Boolean => SlotValue::Boolean(json_flag(value).ok_or_else(|| invalid("0 or 1"))?),
            SlotKind::Image => match value.as_str() {
                Some(s) => SlotValue::Image(
                    images::from_data_uri(s).map_err(|_| invalid("a base64 image"))?,
                ),
                None => return Err(invalid("a base64 image")),
            },
        };
        Ok(Some(parsed))
    }

    /// Wire form: dates as ISO strings, booleans as 0/1, images as data URIs.
    pub fn to_json(&self) -> Value {
        match self {
            SlotValue::String(s) => Value::String(s.clone()),
            SlotValue::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
            SlotValue::Int(n) | SlotValue::Lookup(n) => Value::from(*n),
            SlotValue::Decimal(d) => serde_json::to_value(d).unwrap_or(Value::Null),
            SlotValue::Boolean(b) => Value::from(u8::from(*b)),
            SlotValue::Image(bytes) => Value::String(images::to_data_uri(bytes)),
        }
    }
}

fn json_i32(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn json_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(_) => serde_json::from_value(value.clone()).ok(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn json_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" => Some(true),
            "0" | "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}
