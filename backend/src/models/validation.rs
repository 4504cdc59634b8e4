//! Input validation for insertable and partial-update entity forms.
//!
//! The forms derive [`validator::Validate`]. This module holds the shared
//! text rule and flattens collected errors into one `field: message` entry
//! per offending field for the HTTP layer.

use std::borrow::Cow;

pub use validator::{Validate, ValidationError, ValidationErrors};

pub const NOT_BLANK: &str = "must not be empty";

/// Rejects text that is empty once surrounding whitespace is removed.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some(Cow::Borrowed(NOT_BLANK));
        return Err(error);
    }
    Ok(())
}

/// First message for each failing field, sorted by field name.
pub fn field_messages(errors: &ValidationErrors) -> Vec<(String, String)> {
    let mut fields: Vec<(String, String)> = errors
        .field_errors()
        .into_iter()
        .filter_map(|(field, errs)| errs.first().map(|e| (field.to_string(), message(e))))
        .collect();
    fields.sort();
    fields
}

/// `field: message; field: message`
pub fn describe(errors: &ValidationErrors) -> String {
    field_messages(errors)
        .iter()
        .map(|(field, message)| format!("{}: {}", field, message))
        .collect::<Vec<_>>()
        .join("; ")
}

fn message(error: &ValidationError) -> String {
    match &error.message {
        Some(message) => message.to_string(),
        None => error.code.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Validate)]
    struct Form {
        #[validate(length(min = 1, message = "must not be empty"), custom(function = "not_blank"))]
        name: String,
        #[validate(range(min = 1, message = "must be positive"))]
        interval: i32,
        #[validate(custom(function = "not_blank"))]
        code: Option<String>,
    }

    #[test]
    fn test_one_message_per_field() {
        let form = Form {
            name: String::new(),
            interval: 0,
            code: None,
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(
            describe(&errors),
            "interval: must be positive; name: must not be empty"
        );
    }

    #[test]
    fn test_whitespace_is_blank() {
        assert!(not_blank("  \t").is_err());
        assert!(not_blank(" aula ").is_ok());

        let form = Form {
            name: "Aula".into(),
            interval: 30,
            code: Some(" ".into()),
        };
        let fields = field_messages(&form.validate().unwrap_err());
        assert_eq!(fields, vec![("code".to_string(), NOT_BLANK.to_string())]);
    }

    #[test]
    fn test_absent_optional_is_skipped() {
        let form = Form {
            name: "Aula".into(),
            interval: 30,
            code: None,
        };
        assert!(form.validate().is_ok());
    }
}
