//! Request validation from resource rules: presence checks only.

use crate::config::Resource;
use crate::error::AppError;
use crate::store::Row;
use serde_json::Value;

/// JavaScript-style truthiness: null, false, 0 and "" are all "not provided".
pub fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

pub struct RequestValidator;

impl RequestValidator {
    /// Every required field must be truthy. Returns the values to insert: the
    /// required fields only, anything else in the body is dropped.
    pub fn validate_create(resource: &Resource, body: &Row) -> Result<Row, AppError> {
        let mut values = Row::new();
        for field in resource.required_on_create {
            match body.get(*field) {
                Some(v) if is_truthy(v) => {
                    values.insert(field.to_string(), v.clone());
                }
                _ => return Err(AppError::BadRequest(resource.required_message())),
            }
        }
        Ok(values)
    }

    /// At least one updatable field must be truthy. Returns only the truthy
    /// updatable fields, so omitted columns are never cleared.
    pub fn validate_update(resource: &Resource, body: &Row) -> Result<Row, AppError> {
        let values: Row = resource
            .updatable
            .iter()
            .filter_map(|f| body.get(*f).filter(|v| is_truthy(v)).map(|v| (f.to_string(), v.clone())))
            .collect();
        if values.is_empty() {
            return Err(AppError::BadRequest("No data provided to update".into()));
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{POSTS, USERS};
    use serde_json::json;

    fn body(v: Value) -> Row {
        v.as_object().cloned().expect("object")
    }

    #[test]
    fn truthiness_matches_javascript() {
        for falsy in [json!(null), json!(false), json!(0), json!(0.0), json!("")] {
            assert!(!is_truthy(&falsy), "{falsy} should be falsy");
        }
        for truthy in [json!(true), json!(1), json!(-2.5), json!("0"), json!([]), json!({})] {
            assert!(is_truthy(&truthy), "{truthy} should be truthy");
        }
    }

    #[test]
    fn create_requires_every_field() {
        let err = RequestValidator::validate_create(&USERS, &body(json!({"email": "a@b.com"})))
            .expect_err("name missing");
        assert!(matches!(err, AppError::BadRequest(ref m) if m == "Name and email are required"));

        let err = RequestValidator::validate_create(
            &POSTS,
            &body(json!({"title": "t", "content": "", "created_by": 1})),
        )
        .expect_err("empty content");
        assert!(matches!(err, AppError::BadRequest(ref m) if m == "Title, content, and created_by are required"));
    }

    #[test]
    fn create_keeps_only_required_fields() {
        let values = RequestValidator::validate_create(
            &USERS,
            &body(json!({"name": "Ada", "email": "a@b.com", "id": 7, "created_at": "2020-01-01T00:00:00Z"})),
        )
        .expect("valid");
        assert_eq!(values, body(json!({"name": "Ada", "email": "a@b.com"})));
    }

    #[test]
    fn update_needs_a_truthy_updatable_field() {
        assert!(RequestValidator::validate_update(&USERS, &Row::new()).is_err());
        assert!(RequestValidator::validate_update(&USERS, &body(json!({"name": ""}))).is_err());
        // created_by is not updatable on posts
        assert!(RequestValidator::validate_update(&POSTS, &body(json!({"created_by": 3}))).is_err());
    }

    #[test]
    fn update_drops_omitted_and_falsy_fields() {
        let values = RequestValidator::validate_update(
            &POSTS,
            &body(json!({"title": "New Title", "content": null, "created_by": 9})),
        )
        .expect("valid");
        assert_eq!(values, body(json!({"title": "New Title"})));
    }
}
