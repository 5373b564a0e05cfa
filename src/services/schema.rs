/*
 * Responsibility
 * - Declared body shapes for protected endpoints
 * - Parse (BAD_REQUEST) then validate (VALIDATION_ERROR listing every
 *   offending field) before any identity or business logic runs
 *
 * Recognized per-field options: type, required, allowed values, max length.
 */
use serde_json::{Map, Value};

use crate::error::{AppError, FieldError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
}

impl FieldType {
    fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub name: &'static str,
    pub kind: FieldType,
    pub required: bool,
    pub allowed: &'static [&'static str],
    pub max_length: Option<usize>,
}

impl FieldRule {
    pub const fn required(name: &'static str, kind: FieldType) -> Self {
        Self {
            name,
            kind,
            required: true,
            allowed: &[],
            max_length: None,
        }
    }

    pub const fn optional(name: &'static str, kind: FieldType) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind)
        }
    }

    pub const fn one_of(self, allowed: &'static [&'static str]) -> Self {
        Self { allowed, ..self }
    }

    pub const fn max_length(self, max: usize) -> Self {
        Self {
            max_length: Some(max),
            ..self
        }
    }

    fn check(&self, body: &Map<String, Value>) -> Option<FieldError> {
        let value = match body.get(self.name) {
            None | Some(Value::Null) => {
                return self
                    .required
                    .then(|| FieldError::new(self.name, "is required"));
            }
            Some(value) => value,
        };

        if !self.kind.matches(value) {
            return Some(FieldError::new(
                self.name,
                format!("must be of type {}", self.kind.name()),
            ));
        }

        let Some(text) = value.as_str() else {
            return None;
        };

        if self.required && text.trim().is_empty() {
            return Some(FieldError::new(self.name, "is required"));
        }
        if !self.allowed.is_empty() && !self.allowed.contains(&text) {
            return Some(FieldError::new(
                self.name,
                format!("must be one of: {}", self.allowed.join(", ")),
            ));
        }
        if let Some(max) = self.max_length
            && text.chars().count() > max
        {
            return Some(FieldError::new(
                self.name,
                format!("must be at most {max} characters"),
            ));
        }

        None
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BodySchema {
    pub fields: &'static [FieldRule],
}

impl BodySchema {
    /// For endpoints that take no body.
    pub const EMPTY: Self = Self { fields: &[] };

    pub const fn new(fields: &'static [FieldRule]) -> Self {
        Self { fields }
    }

    pub fn requires_fields(&self) -> bool {
        self.fields.iter().any(|rule| rule.required)
    }

    /// Step one: turn the raw bytes into JSON.
    ///
    /// An empty body is `{}` unless the schema requires fields. A non-empty
    /// body must always be well-formed JSON.
    pub fn parse(&self, raw: &[u8]) -> Result<Value, AppError> {
        if raw.iter().all(u8::is_ascii_whitespace) {
            if self.requires_fields() {
                return Err(AppError::bad_request("request body is required"));
            }
            return Ok(Value::Object(Map::new()));
        }

        let value: Value = serde_json::from_slice(raw)
            .map_err(|_| AppError::bad_request("request body must be valid JSON"))?;

        if !self.fields.is_empty() && !value.is_object() {
            return Err(AppError::bad_request("request body must be a JSON object"));
        }

        Ok(value)
    }

    /// Step two: check every declared field, reporting all violations at once.
    pub fn validate(&self, body: &Value) -> Result<(), AppError> {
        let Some(object) = body.as_object() else {
            return Ok(());
        };

        let errors: Vec<FieldError> = self
            .fields
            .iter()
            .filter_map(|rule| rule.check(object))
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const INVITE: BodySchema = BodySchema::new(&[
        FieldRule::required("email", FieldType::String).max_length(20),
        FieldRule::required("role", FieldType::String).one_of(&["Owner", "Viewer"]),
        FieldRule::optional("note", FieldType::String),
        FieldRule::optional("dose", FieldType::Integer),
    ]);

    fn failing_fields(body: Value) -> Vec<String> {
        match INVITE.validate(&body) {
            Err(AppError::Validation(fields)) => fields.into_iter().map(|f| f.field).collect(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn missing_body_is_bad_request_only_when_fields_are_required() {
        assert!(matches!(INVITE.parse(b""), Err(AppError::BadRequest(_))));
        assert!(matches!(INVITE.parse(b"  \n"), Err(AppError::BadRequest(_))));
        assert_eq!(BodySchema::EMPTY.parse(b"").unwrap(), json!({}));
    }

    #[test]
    fn malformed_json_is_bad_request() {
        assert!(matches!(INVITE.parse(b"{\"email\":"), Err(AppError::BadRequest(_))));
        assert!(matches!(INVITE.parse(b"[1,2]"), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn reports_every_offending_field() {
        let fields = failing_fields(json!({ "role": "Admin", "dose": 1.5 }));
        assert_eq!(fields, vec!["email", "role", "dose"]);
    }

    #[test]
    fn blank_required_string_counts_as_missing() {
        assert_eq!(
            failing_fields(json!({ "email": "   ", "role": "Viewer" })),
            vec!["email"]
        );
    }

    #[test]
    fn enforces_type_and_length() {
        assert_eq!(
            failing_fields(json!({ "email": "someone.with.a.long@example.com", "role": 3 })),
            vec!["email", "role"]
        );
    }

    #[test]
    fn accepts_conforming_body_and_ignores_unknown_fields() {
        let body = json!({ "email": "a@b.io", "role": "Viewer", "extra": true, "note": null });
        assert!(INVITE.validate(&body).is_ok());
    }
}
