use uuid::Uuid;

use shared_models::error::AppError;

/// Trimmed, non-empty value of a required request field.
pub fn required<'a>(field: &str, value: Option<&'a str>) -> Result<&'a str, AppError> {
    match value.map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(AppError::ValidationError(format!("{} is required", field))),
    }
}

pub fn parse_uuid(field: &str, raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::ValidationError(format!("Invalid {}: {}", field, raw)))
}

/// Blank optional strings count as absent.
pub fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_required_rejects_blank() {
        assert_eq!(required("email", Some(" a@b.c ")).unwrap(), "a@b.c");
        assert_matches!(
            required("email", Some("   ")),
            Err(AppError::ValidationError(msg)) if msg == "email is required"
        );
        assert_matches!(required("email", None), Err(AppError::ValidationError(_)));
    }

    #[test]
    fn test_parse_uuid_names_field() {
        assert_matches!(
            parse_uuid("doctorId", "42"),
            Err(AppError::ValidationError(msg)) if msg.starts_with("Invalid doctorId")
        );
        assert_eq!(optional(Some("  ".into())), None);
        assert_eq!(optional(Some(" x ".into())), Some("x".into()));
    }
}
