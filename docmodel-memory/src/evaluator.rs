//! Evaluation of native query filters against stored documents.

use bson::{Bson, DateTime, Document};
use std::{cmp::Ordering, collections::HashMap};

use docmodel_core::{
    error::ModelError,
    query::{Expr, FieldOp, QueryVisitor},
};

/// Comparable view of a BSON value. Integers and doubles compare as `f64`.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(DateTime),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(f64::from(*value)),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(items) => Comparable::Array(items.iter().map(Comparable::from).collect()),
            Bson::Document(doc) => Comparable::Map(
                doc.iter()
                    .map(|(key, value)| (key.as_str(), Comparable::from(value)))
                    .collect(),
            ),
            _ => Comparable::Null,
        }
    }
}

impl PartialEq for Comparable<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Comparable<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Compares two documents by one field. Missing fields sort as null.
pub(crate) fn compare_by_field(left: &Document, right: &Document, field: &str) -> Ordering {
    let left = left.get(field).map(Comparable::from).unwrap_or(Comparable::Null);
    let right = right.get(field).map(Comparable::from).unwrap_or(Comparable::Null);

    left.partial_cmp(&right).unwrap_or(Ordering::Equal)
}

/// Evaluates a filter expression against one document.
pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    pub fn matches(document: &'a Document, expr: &Expr) -> bool {
        DocumentEvaluator::new(document)
            .visit_expr(expr)
            .unwrap_or(false)
    }

    /// Equality, where an array field also matches if any element equals the value.
    fn equality(field_value: &Bson, value: &Bson) -> bool {
        let (field_value, value) = (Comparable::from(field_value), Comparable::from(value));

        match &field_value {
            Comparable::Array(items) if items.contains(&value) => true,
            _ => field_value == value,
        }
    }

    fn membership(field_value: &Bson, value: &Bson) -> bool {
        match (Comparable::from(field_value), Comparable::from(value)) {
            (Comparable::Array(items), Comparable::Array(candidates)) => {
                candidates.iter().any(|candidate| items.contains(candidate))
            }
            (Comparable::Array(items), single) => items.contains(&single),
            (single, Comparable::Array(candidates)) => candidates.contains(&single),
            (single, candidate) => single == candidate,
        }
    }

    /// Substring of a string, or, for arrays, every needle is an element.
    fn containment(field_value: &Bson, value: &Bson) -> bool {
        match (Comparable::from(field_value), Comparable::from(value)) {
            (Comparable::String(haystack), Comparable::String(needle)) => haystack.contains(needle),
            (Comparable::Array(items), Comparable::Array(needles)) => {
                needles.iter().all(|needle| items.contains(needle))
            }
            (Comparable::Array(items), needle) => items.contains(&needle),
            _ => false,
        }
    }

    /// No substring match for strings; for arrays, none of the needles is an element.
    fn exclusion(field_value: &Bson, value: &Bson) -> bool {
        match (Comparable::from(field_value), Comparable::from(value)) {
            (Comparable::String(haystack), Comparable::String(needle)) => !haystack.contains(needle),
            (Comparable::Array(items), Comparable::Array(needles)) => {
                !needles.iter().any(|needle| items.contains(needle))
            }
            (Comparable::Array(items), needle) => !items.contains(&needle),
            (_, Comparable::String(_)) => true,
            (single, needle) => single != needle,
        }
    }
}

impl QueryVisitor for DocumentEvaluator<'_> {
    type Output = bool;
    type Error = ModelError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<bool, ModelError> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<bool, ModelError> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<bool, ModelError> {
        Ok(!self.visit_expr(expr)?)
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<bool, ModelError> {
        Ok(self.document.contains_key(field) == should_exist)
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<bool, ModelError> {
        // Negative operators match documents without the field
        let Some(field_value) = self.document.get(field) else {
            return Ok(matches!(op, FieldOp::Ne | FieldOp::NotContains | FieldOp::NoneOf));
        };

        let ordering = || Comparable::from(field_value).partial_cmp(&Comparable::from(value));

        Ok(match op {
            FieldOp::Eq => Self::equality(field_value, value),
            FieldOp::Ne => !Self::equality(field_value, value),
            FieldOp::Gt => ordering() == Some(Ordering::Greater),
            FieldOp::Gte => matches!(ordering(), Some(Ordering::Greater | Ordering::Equal)),
            FieldOp::Lt => ordering() == Some(Ordering::Less),
            FieldOp::Lte => matches!(ordering(), Some(Ordering::Less | Ordering::Equal)),
            FieldOp::Contains => Self::containment(field_value, value),
            FieldOp::NotContains => Self::exclusion(field_value, value),
            FieldOp::StartsWith => match (field_value, value) {
                (Bson::String(left), Bson::String(right)) => left.starts_with(right.as_str()),
                _ => false,
            },
            FieldOp::EndsWith => match (field_value, value) {
                (Bson::String(left), Bson::String(right)) => left.ends_with(right.as_str()),
                _ => false,
            },
            FieldOp::AnyOf => Self::membership(field_value, value),
            FieldOp::NoneOf => !Self::membership(field_value, value),
        })
    }
}
