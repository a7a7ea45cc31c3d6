//! Input validation for notification recipients and content.

use std::fmt;

/// Validation error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Invalid email format.
    InvalidEmail(String),
    /// Invalid phone number format.
    InvalidPhone(String),
    /// Value too long.
    TooLong { field: String, max: usize, actual: usize },
    /// Empty value where one is required.
    Empty(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidEmail(msg) => write!(f, "Invalid email: {}", msg),
            ValidationError::InvalidPhone(msg) => write!(f, "Invalid phone number: {}", msg),
            ValidationError::TooLong { field, max, actual } => {
                write!(f, "{} is too long ({} chars, max {})", field, actual, max)
            }
            ValidationError::Empty(field) => write!(f, "{} cannot be empty", field),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Maximum allowed length for email addresses.
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Minimum digits in an E.164 number.
pub const MIN_PHONE_DIGITS: usize = 7;

/// Maximum digits in an E.164 number.
pub const MAX_PHONE_DIGITS: usize = 15;

/// Maximum length of a notification subject.
pub const MAX_SUBJECT_LENGTH: usize = 998;

fn invalid_email(reason: &str) -> ValidationError {
    ValidationError::InvalidEmail(reason.to_string())
}

/// Validate an email address (basic `local@domain.tld` check).
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Empty("email".to_string()));
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: MAX_EMAIL_LENGTH,
            actual: email.len(),
        });
    }

    let (local, domain) = match email.split_once('@') {
        Some((local, domain)) if !domain.contains('@') => (local, domain),
        _ => return Err(invalid_email("must contain exactly one @ symbol")),
    };

    if local.is_empty() {
        return Err(invalid_email("missing local part (before @)"));
    }
    if domain.is_empty() {
        return Err(invalid_email("missing domain (after @)"));
    }
    if !domain.contains('.') {
        return Err(invalid_email("domain must contain at least one dot"));
    }
    if domain.starts_with('.') || domain.ends_with('.') {
        return Err(invalid_email("domain cannot start or end with a dot"));
    }
    if domain.contains("..") {
        return Err(invalid_email("domain cannot contain consecutive dots"));
    }
    if email.chars().any(char::is_whitespace) {
        return Err(invalid_email("cannot contain whitespace"));
    }

    Ok(())
}

/// Validate a phone number in E.164 form (`+` followed by 7 to 15 digits).
///
/// Spaces, dashes and parentheses are tolerated as separators.
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let phone = phone.trim();

    if phone.is_empty() {
        return Err(ValidationError::Empty("phone number".to_string()));
    }

    let Some(rest) = phone.strip_prefix('+') else {
        return Err(ValidationError::InvalidPhone(
            "must start with + and a country code".to_string(),
        ));
    };

    let mut digits = 0;
    for c in rest.chars() {
        match c {
            '0'..='9' => digits += 1,
            ' ' | '-' | '(' | ')' => {}
            other => {
                return Err(ValidationError::InvalidPhone(format!(
                    "invalid character '{}'",
                    other
                )))
            }
        }
    }

    if !(MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits) {
        return Err(ValidationError::InvalidPhone(format!(
            "expected {}-{} digits, got {}",
            MIN_PHONE_DIGITS, MAX_PHONE_DIGITS, digits
        )));
    }

    Ok(())
}

/// Validate a notification subject line.
pub fn validate_subject(subject: &str) -> Result<(), ValidationError> {
    if subject.trim().is_empty() {
        return Err(ValidationError::Empty("subject".to_string()));
    }

    if subject.len() > MAX_SUBJECT_LENGTH {
        return Err(ValidationError::TooLong {
            field: "subject".to_string(),
            max: MAX_SUBJECT_LENGTH,
            actual: subject.len(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email_valid() {
        assert!(validate_email("test@example.com").is_ok());
        assert!(validate_email("user.name@domain.co.uk").is_ok());
        assert!(validate_email(" test@example.com ").is_ok()); // trimmed
    }

    #[test]
    fn test_validate_email_invalid() {
        assert!(matches!(validate_email(""), Err(ValidationError::Empty(_))));

        for bad in [
            "test.example.com",
            "test@example@com",
            "@example.com",
            "test@",
            "test@localhost",
            "test@.example.com",
            "test@example.com.",
            "test@example..com",
            "te st@example.com",
        ] {
            assert!(
                matches!(validate_email(bad), Err(ValidationError::InvalidEmail(_))),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_validate_email_too_long() {
        let email = format!("{}@example.com", "a".repeat(250));
        assert!(matches!(
            validate_email(&email),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("+15551234567").is_ok());
        assert!(validate_phone("+44 (20) 7946-0958").is_ok());

        assert!(matches!(validate_phone(""), Err(ValidationError::Empty(_))));
        assert!(matches!(
            validate_phone("5551234567"),
            Err(ValidationError::InvalidPhone(_))
        ));
        assert!(matches!(
            validate_phone("+1555abc4567"),
            Err(ValidationError::InvalidPhone(_))
        ));
        assert!(matches!(
            validate_phone("+123"),
            Err(ValidationError::InvalidPhone(_))
        ));
    }

    #[test]
    fn test_validate_subject() {
        assert!(validate_subject("Weekly report").is_ok());
        assert!(matches!(validate_subject("  "), Err(ValidationError::Empty(_))));
        assert!(matches!(
            validate_subject(&"x".repeat(MAX_SUBJECT_LENGTH + 1)),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::InvalidPhone("test message".to_string());
        assert_eq!(err.to_string(), "Invalid phone number: test message");

        let err = ValidationError::TooLong {
            field: "email".to_string(),
            max: 254,
            actual: 300,
        };
        assert_eq!(err.to_string(), "email is too long (300 chars, max 254)");
    }
}
