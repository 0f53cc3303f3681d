//! Field values as seen by callers and as written to the database.
//!
//! Two vocabularies meet here:
//!
//! - [`FieldWrite`] is what a handle caches and what a merge-write carries. It can hold the
//!   database's field-deletion marker ([`FieldWrite::Delete`]) and native timestamps
//!   ([`Bson::DateTime`], [`Bson::Timestamp`]).
//! - [`FieldValue`] is the public surface. Native timestamps are presented as
//!   [`chrono::DateTime<Utc>`] and a pending delete is presented as [`FieldValue::Absent`].

use bson::{Bson, DateTime as BsonDateTime, Document};
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::BTreeMap;

/// A single field as held in a handle's cache or sent in a merge-write.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldWrite {
    /// Store this value.
    Set(Bson),
    /// Remove the field from the remote document.
    Delete,
}

/// Field name to value mapping used for the local cache and for save payloads.
pub type FieldMap = BTreeMap<String, FieldWrite>;

/// A field value on the public read/write surface of a handle.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Any non-timestamp value.
    Value(Bson),
    /// A point in time. Stored natively by the database.
    DateTime(DateTime<Utc>),
    /// No value. Writing it schedules a field deletion on the next save.
    Absent,
}

impl FieldValue {
    /// Returns the inner BSON value, if this is a plain value.
    pub fn as_bson(&self) -> Option<&Bson> {
        match self {
            FieldValue::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the date/time, if this is a timestamp.
    pub fn as_datetime(&self) -> Option<&DateTime<Utc>> {
        match self {
            FieldValue::DateTime(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Absent)
    }

    /// Converts this value into the form a handle caches.
    pub(crate) fn into_write(self) -> FieldWrite {
        match self {
            FieldValue::Value(value) => FieldWrite::Set(value),
            FieldValue::DateTime(value) => {
                FieldWrite::Set(Bson::DateTime(BsonDateTime::from_millis(value.timestamp_millis())))
            }
            FieldValue::Absent => FieldWrite::Delete,
        }
    }

    /// Reads a cached field, normalizing native timestamps.
    pub(crate) fn from_write(write: &FieldWrite) -> Self {
        match write {
            FieldWrite::Set(value) => match native_timestamp(value) {
                Some(datetime) => FieldValue::DateTime(datetime),
                None => FieldValue::Value(value.clone()),
            },
            FieldWrite::Delete => FieldValue::Absent,
        }
    }
}

/// Converts a native database timestamp into a UTC date/time.
///
/// Returns `None` for anything that is not a timestamp, and for timestamps outside the
/// range `chrono` can represent.
pub(crate) fn native_timestamp(value: &Bson) -> Option<DateTime<Utc>> {
    match value {
        Bson::DateTime(datetime) => DateTime::from_timestamp_millis(datetime.timestamp_millis()),
        Bson::Timestamp(timestamp) => DateTime::from_timestamp(i64::from(timestamp.time), 0),
        _ => None,
    }
}

/// Formats a timestamp the way `chrono` serializes `DateTime<Utc>`.
pub(crate) fn rfc3339(datetime: &DateTime<Utc>) -> String {
    datetime.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Presents native timestamps as RFC 3339 strings, at any depth, for serde-based reads.
pub(crate) fn readable(value: &Bson) -> Bson {
    match value {
        Bson::Document(document) => Bson::Document(
            document
                .iter()
                .map(|(key, value)| (key.clone(), readable(value)))
                .collect(),
        ),
        Bson::Array(items) => Bson::Array(items.iter().map(readable).collect()),
        other => match native_timestamp(other) {
            Some(datetime) => Bson::String(rfc3339(&datetime)),
            None => other.clone(),
        },
    }
}

/// Turns serialized `chrono` timestamps back into native ones, at any depth.
///
/// Only strings in the exact form `chrono` produces for a UTC date/time with at most
/// millisecond precision are converted, so every converted string reads back unchanged
/// through [`readable`].
pub(crate) fn native_dates(value: Bson) -> Bson {
    match value {
        Bson::String(text) => match serialized_datetime(&text) {
            Some(datetime) => Bson::DateTime(BsonDateTime::from_millis(datetime.timestamp_millis())),
            None => Bson::String(text),
        },
        Bson::Document(document) => Bson::Document(
            document
                .into_iter()
                .map(|(key, value)| (key, native_dates(value)))
                .collect(),
        ),
        Bson::Array(items) => Bson::Array(items.into_iter().map(native_dates).collect()),
        other => other,
    }
}

fn serialized_datetime(text: &str) -> Option<DateTime<Utc>> {
    if !text.ends_with('Z') {
        return None;
    }

    let datetime = DateTime::parse_from_rfc3339(text).ok()?.with_timezone(&Utc);

    (datetime.timestamp_subsec_nanos() % 1_000_000 == 0 && rfc3339(&datetime) == text).then_some(datetime)
}

/// Builds a field cache from a fetched document.
pub(crate) fn fields_from_document(document: Document) -> FieldMap {
    document
        .into_iter()
        .map(|(key, value)| (key, FieldWrite::Set(value)))
        .collect()
}

impl From<Bson> for FieldValue {
    fn from(value: Bson) -> Self {
        FieldValue::Value(value)
    }
}

impl From<Document> for FieldValue {
    fn from(value: Document) -> Self {
        FieldValue::Value(Bson::Document(value))
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Value(Bson::String(value.to_string()))
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Value(Bson::String(value))
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Value(Bson::Boolean(value))
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Value(Bson::Int32(value))
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Value(Bson::Int64(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Value(Bson::Double(value))
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::DateTime(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Absent, Into::into)
    }
}
