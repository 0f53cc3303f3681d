//! Field name escaping for MongoDB.
//!
//! MongoDB gives dots and dollar signs in field names special meaning in update and query
//! documents, and rejects NUL bytes. Field names are percent-escaped before they are written
//! and restored when documents are read back. `%` itself is escaped too, so every name survives
//! the round trip. Values are stored as they are.

use bson::{Bson, Document};

pub(crate) struct KeySanitizer;

impl KeySanitizer {
    const ESCAPES: [(char, &'static str); 4] = [('%', "%25"), ('.', "%2E"), ('$', "%24"), ('\0', "%00")];

    /// Escapes a single field name or collection name.
    pub(crate) fn escape(input: &str) -> String {
        input.chars().fold(String::with_capacity(input.len()), |mut name, c| {
            match Self::ESCAPES.iter().find(|(target, _)| *target == c) {
                Some((_, escaped)) => name.push_str(escaped),
                None => name.push(c),
            }
            name
        })
    }

    pub(crate) fn restore(input: &str) -> String {
        let mut name = String::with_capacity(input.len());
        let mut rest = input;

        while let Some(start) = rest.find('%') {
            name.push_str(&rest[..start]);
            rest = &rest[start..];

            match Self::ESCAPES.iter().find(|(_, escaped)| rest.starts_with(escaped)) {
                Some((target, escaped)) => {
                    name.push(*target);
                    rest = &rest[escaped.len()..];
                }
                None => {
                    name.push('%');
                    rest = &rest[1..];
                }
            }
        }

        name.push_str(rest);
        name
    }

    /// Escapes the keys of nested documents inside a value.
    pub(crate) fn escape_value(value: Bson) -> Bson {
        Self::map_keys(value, Self::escape)
    }

    /// Restores every key of a stored document, recursively.
    pub(crate) fn restore_document(document: Document) -> Document {
        document
            .into_iter()
            .map(|(key, value)| (Self::restore(&key), Self::map_keys(value, Self::restore)))
            .collect()
    }

    fn map_keys(value: Bson, rename: fn(&str) -> String) -> Bson {
        match value {
            Bson::Document(document) => Bson::Document(
                document
                    .into_iter()
                    .map(|(key, value)| (rename(&key), Self::map_keys(value, rename)))
                    .collect(),
            ),
            Bson::Array(items) => Bson::Array(
                items
                    .into_iter()
                    .map(|item| Self::map_keys(item, rename))
                    .collect(),
            ),
            other => other,
        }
    }
}
