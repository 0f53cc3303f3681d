//! Translation of native query expressions into MongoDB filter documents.

use bson::{Bson, Document, doc};

use docmodel_core::{
    error::ModelError,
    query::{Expr, FieldOp, QueryVisitor},
};

use crate::sanitizer::KeySanitizer;

/// Escapes regular expression metacharacters so user input matches literally.
fn literal_pattern(input: &str) -> String {
    input.chars().fold(String::with_capacity(input.len()), |mut pattern, c| {
        if "\\^$.|?*+()[]{}".contains(c) {
            pattern.push('\\');
        }
        pattern.push(c);
        pattern
    })
}

fn unsupported(op: FieldOp, expected: &str) -> ModelError {
    ModelError::Backend(format!("{op:?} operator requires {expected}"))
}

pub(crate) struct MongoQueryTranslator;

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = ModelError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Document, ModelError> {
        Ok(doc! {
            "$and": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Document, ModelError> {
        Ok(doc! {
            "$or": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    // `$not` only applies to operator expressions, `$nor` negates a whole filter.
    fn visit_not(&mut self, expr: &Expr) -> Result<Document, ModelError> {
        Ok(doc! {
            "$nor": [self.visit_expr(expr)?],
        })
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Document, ModelError> {
        Ok(doc! {
            KeySanitizer::escape(field): { "$exists": should_exist },
        })
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Document, ModelError> {
        let condition = match op {
            FieldOp::Eq => doc! { "$eq": value },
            FieldOp::Ne => doc! { "$ne": value },
            FieldOp::Gt => doc! { "$gt": value },
            FieldOp::Gte => doc! { "$gte": value },
            FieldOp::Lt => doc! { "$lt": value },
            FieldOp::Lte => doc! { "$lte": value },
            FieldOp::Contains => match value {
                Bson::String(s) => doc! { "$regex": literal_pattern(s) },
                Bson::Array(items) => doc! { "$all": items },
                other => doc! { "$elemMatch": { "$eq": other } },
            },
            FieldOp::NotContains => match value {
                Bson::String(s) => doc! { "$not": { "$regex": literal_pattern(s) } },
                Bson::Array(items) => doc! { "$nin": items },
                other => doc! { "$ne": other },
            },
            FieldOp::StartsWith => match value {
                Bson::String(s) => doc! { "$regex": format!("^{}", literal_pattern(s)) },
                _ => return Err(unsupported(*op, "a string value")),
            },
            FieldOp::EndsWith => match value {
                Bson::String(s) => doc! { "$regex": format!("{}$", literal_pattern(s)) },
                _ => return Err(unsupported(*op, "a string value")),
            },
            FieldOp::AnyOf => match value {
                Bson::Array(items) => doc! { "$in": items },
                other => doc! { "$in": [other] },
            },
            FieldOp::NoneOf => match value {
                Bson::Array(items) => doc! { "$nin": items },
                other => doc! { "$nin": [other] },
            },
        };

        Ok(doc! { KeySanitizer::escape(field): condition })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmodel_core::query::Filter;

    #[test]
    fn translates_nested_expressions() {
        let expr = Filter::eq("status", "active").and(Filter::gte("age", 18).or(Filter::exists("admin")));

        let translated = MongoQueryTranslator.visit_expr(&expr).unwrap();

        assert_eq!(
            translated,
            doc! {
                "$and": [
                    { "status": { "$eq": "active" } },
                    { "$or": [
                        { "age": { "$gte": 18 } },
                        { "admin": { "$exists": true } },
                    ] },
                ]
            }
        );
    }

    #[test]
    fn string_operators_match_literally() {
        let translated = MongoQueryTranslator
            .visit_expr(&Filter::starts_with("email", "a.b"))
            .unwrap();

        assert_eq!(translated, doc! { "email": { "$regex": "^a\\.b" } });
    }

    #[test]
    fn negation_wraps_whole_filters() {
        let translated = MongoQueryTranslator
            .visit_expr(&Filter::eq("a.b", 1).not())
            .unwrap();

        assert_eq!(translated, doc! { "$nor": [ { "a%2Eb": { "$eq": 1 } } ] });
    }

    #[test]
    fn rejects_prefix_match_on_non_strings() {
        assert!(MongoQueryTranslator.visit_expr(&Filter::ends_with("age", 3)).is_err());
    }
}
