// Typed errors surfaced through eyre reports

use thiserror::Error;

/// Input rejected before any storage access.
///
/// Returned inside an `eyre::Report`; callers that need to tell a bad input
/// apart from a storage failure can `downcast_ref::<ValidationError>()`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Streak name cannot be empty or whitespace-only")]
    EmptyName,

    #[error("Streak name too long: {0} chars (max {max})", max = MAX_NAME_LEN)]
    NameTooLong(usize),
}

/// Longest accepted streak name, in characters.
pub const MAX_NAME_LEN: usize = 256;

/// Trim a user-supplied name and check it is usable.
pub fn validate_name(name: &str) -> Result<&str, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyName);
    }

    let len = trimmed.chars().count();
    if len > MAX_NAME_LEN {
        return Err(ValidationError::NameTooLong(len));
    }

    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name_trims() {
        assert_eq!(validate_name("  Read  ").unwrap(), "Read");
    }

    #[test]
    fn test_validate_name_rejects_blank() {
        assert_eq!(validate_name(""), Err(ValidationError::EmptyName));
        assert_eq!(validate_name(" \t\n"), Err(ValidationError::EmptyName));
    }

    #[test]
    fn test_validate_name_length() {
        assert!(validate_name(&"a".repeat(MAX_NAME_LEN)).is_ok());
        assert_eq!(
            validate_name(&"a".repeat(MAX_NAME_LEN + 1)),
            Err(ValidationError::NameTooLong(MAX_NAME_LEN + 1))
        );
    }

    #[test]
    fn test_validation_error_into_report() {
        let report: eyre::Report = ValidationError::EmptyName.into();
        assert_eq!(
            report.downcast_ref::<ValidationError>(),
            Some(&ValidationError::EmptyName)
        );
    }
}
