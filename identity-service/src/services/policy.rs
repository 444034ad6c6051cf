//! Password policy validation.
//!
//! Runs only for password-provider registration and resets; federated
//! provider ids are opaque tokens and bypass these rules.

use thiserror::Error;

const MIN_LENGTH: usize = 8;
const MAX_LENGTH: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordPolicyError {
    #[error("Password must be between {min} and {max} characters (got {actual})")]
    LengthOutOfRange {
        min: usize,
        max: usize,
        actual: usize,
    },

    #[error("Password must contain at least one lowercase letter")]
    MissingLowercase,

    #[error("Password must contain at least one uppercase letter")]
    MissingUppercase,

    #[error("Password must contain at least one number")]
    MissingNumber,

    #[error("Password must contain at least one special character")]
    MissingSpecial,
}

fn is_special(c: char) -> bool {
    matches!(
        c,
        '!' | '@'
            | '#'
            | '$'
            | '%'
            | '^'
            | '&'
            | '*'
            | '('
            | ')'
            | '-'
            | '_'
            | '='
            | '+'
            | '['
            | ']'
            | '{'
            | '}'
            | '|'
            | '\\'
            | ';'
            | ':'
            | '\''
            | '"'
            | ','
            | '.'
            | '<'
            | '>'
            | '/'
            | '?'
            | '`'
            | '~'
    )
}

/// Validate a password against the staff password policy.
///
/// Returns Ok(()) if the password meets all requirements, or Err with the
/// first violation found, in priority order.
pub fn validate_password(password: &str) -> Result<(), PasswordPolicyError> {
    let length = password.chars().count();
    if !(MIN_LENGTH..=MAX_LENGTH).contains(&length) {
        return Err(PasswordPolicyError::LengthOutOfRange {
            min: MIN_LENGTH,
            max: MAX_LENGTH,
            actual: length,
        });
    }

    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(PasswordPolicyError::MissingLowercase);
    }

    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(PasswordPolicyError::MissingUppercase);
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(PasswordPolicyError::MissingNumber);
    }

    if !password.chars().any(is_special) {
        return Err(PasswordPolicyError::MissingSpecial);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_too_short() {
        let result = validate_password("Ab1!x");
        assert!(matches!(
            result,
            Err(PasswordPolicyError::LengthOutOfRange { actual: 5, .. })
        ));
    }

    #[test]
    fn test_password_too_long() {
        let result = validate_password("Abcdefgh1!abcdefg");
        assert!(matches!(
            result,
            Err(PasswordPolicyError::LengthOutOfRange { actual: 17, .. })
        ));
    }

    #[test]
    fn test_password_length_boundaries() {
        // 8 and 16 are both inclusive.
        assert!(validate_password("Abcde1!x").is_ok());
        assert!(validate_password("Abcdefghijklm1!x").is_ok());
        assert!(validate_password("Abcd1!x").is_err());
    }

    #[test]
    fn test_password_missing_lowercase() {
        let result = validate_password("ABCDEFG1!");
        assert_eq!(result, Err(PasswordPolicyError::MissingLowercase));
    }

    #[test]
    fn test_password_missing_uppercase() {
        let result = validate_password("abcdefg1!");
        assert_eq!(result, Err(PasswordPolicyError::MissingUppercase));
    }

    #[test]
    fn test_password_missing_number() {
        let result = validate_password("Abcdefgh!");
        assert_eq!(result, Err(PasswordPolicyError::MissingNumber));
    }

    #[test]
    fn test_password_missing_special() {
        let result = validate_password("Abcdefgh1");
        assert_eq!(result, Err(PasswordPolicyError::MissingSpecial));
    }

    #[test]
    fn test_first_violation_wins() {
        // Both uppercase and number missing; lowercase check passes, the
        // uppercase rule fires first.
        let result = validate_password("abcdefgh!");
        assert_eq!(result, Err(PasswordPolicyError::MissingUppercase));
    }

    #[test]
    fn test_valid_password() {
        assert!(validate_password("Str0ng!pass").is_ok());
    }
}
