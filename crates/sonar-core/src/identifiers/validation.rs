//! Identifier validation rules and utilities

/// Maximum length for all identifier types
pub const MAX_ID_LENGTH: usize = 128;

/// Error type for identifier validation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdValidationError {
    /// The identifier string is empty
    #[error("Identifier cannot be empty")]
    Empty,
    /// The identifier contains only whitespace
    #[error("Identifier cannot be whitespace-only")]
    WhitespaceOnly,
    /// The identifier has leading or trailing whitespace
    #[error("Identifier cannot have leading or trailing whitespace")]
    LeadingTrailingWhitespace,
    /// The identifier contains invalid characters
    #[error(
        "Identifier can only contain alphanumeric characters, hyphens, underscores, and dots"
    )]
    InvalidCharacters,
    /// The identifier exceeds the maximum length
    #[error("Identifier too long ({length} chars, max {max})")]
    TooLong { length: usize, max: usize },
    /// The identifier contains path traversal sequences
    #[error("Identifier cannot contain path traversal sequences (../)")]
    PathTraversal,
}

/// Validator for identifier strings
pub struct IdValidator;

impl IdValidator {
    /// Validate an identifier string.
    ///
    /// # Validation Rules
    ///
    /// - Non-empty (minimum 1 character)
    /// - Maximum 128 characters
    /// - No leading or trailing whitespace
    /// - Only alphanumeric characters, hyphens (`-`), underscores (`_`), and dots (`.`)
    /// - No path traversal sequences (`../`, `./`)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use sonar_core::identifiers::IdValidator;
    ///
    /// assert!(IdValidator::validate("web_search").is_ok());
    /// assert!(IdValidator::validate("research-agent.v2").is_ok());
    ///
    /// assert!(IdValidator::validate("").is_err());
    /// assert!(IdValidator::validate("../etc").is_err());
    /// assert!(IdValidator::validate("web search").is_err());
    /// ```
    pub fn validate(id: &str) -> Result<&str, IdValidationError> {
        if id.is_empty() {
            return Err(IdValidationError::Empty);
        }

        if id.trim().is_empty() {
            return Err(IdValidationError::WhitespaceOnly);
        }

        if id != id.trim() {
            return Err(IdValidationError::LeadingTrailingWhitespace);
        }

        if id.len() > MAX_ID_LENGTH {
            return Err(IdValidationError::TooLong {
                length: id.len(),
                max: MAX_ID_LENGTH,
            });
        }

        if id.contains("../") || id.contains("./") {
            return Err(IdValidationError::PathTraversal);
        }

        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        {
            return Err(IdValidationError::InvalidCharacters);
        }

        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_identifiers() {
        assert!(IdValidator::validate("web_search").is_ok());
        assert!(IdValidator::validate("research-agent").is_ok());
        assert!(IdValidator::validate("agent.1").is_ok());
        assert!(IdValidator::validate(&"a".repeat(MAX_ID_LENGTH)).is_ok());
    }

    #[test]
    fn rejects_malformed_identifiers() {
        assert_eq!(IdValidator::validate(""), Err(IdValidationError::Empty));
        assert_eq!(
            IdValidator::validate("   "),
            Err(IdValidationError::WhitespaceOnly)
        );
        assert_eq!(
            IdValidator::validate(" tool"),
            Err(IdValidationError::LeadingTrailingWhitespace)
        );
        assert_eq!(
            IdValidator::validate("../../etc"),
            Err(IdValidationError::PathTraversal)
        );
        assert_eq!(
            IdValidator::validate("tool/name"),
            Err(IdValidationError::InvalidCharacters)
        );
        assert!(matches!(
            IdValidator::validate(&"a".repeat(MAX_ID_LENGTH + 1)),
            Err(IdValidationError::TooLong { .. })
        ));
    }
}
