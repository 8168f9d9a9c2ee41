//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{AuthError, FieldError};

/// Canonical form of an email: trimmed and lowercased
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email must be at most 254 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Validate password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.chars().count() < 8 {
        return Err("Password must be at least 8 characters long".to_string());
    }

    if password.len() > 128 {
        return Err("Password must be at most 128 characters long".to_string());
    }

    Ok(())
}

/// Validate a display name
pub fn validate_full_name(full_name: &str) -> Result<(), String> {
    if full_name.trim().chars().count() < 2 {
        return Err("Full name must be at least 2 characters long".to_string());
    }

    if full_name.len() > 100 {
        return Err("Full name must be at most 100 characters long".to_string());
    }

    Ok(())
}

/// Collects field errors and turns them into a single `AuthError::Validation`
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one field check
    pub fn check(&mut self, path: &str, result: Result<(), String>) -> &mut Self {
        if let Err(message) = result {
            self.errors.push(FieldError::new(path, message));
        }
        self
    }

    /// Record a failure when `condition` is false
    pub fn require(&mut self, path: &str, condition: bool, message: &str) -> &mut Self {
        if !condition {
            self.errors.push(FieldError::new(path, message));
        }
        self
    }

    pub fn finish(&mut self) -> Result<(), AuthError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AuthError::Validation(std::mem::take(&mut self.errors)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_rules() {
        assert!(validate_email("alice@test.com").is_ok());
        assert_eq!(validate_email("").unwrap_err(), "Email is required");
        assert_eq!(validate_email("alice").unwrap_err(), "Invalid email format");
    }

    #[test]
    fn emails_are_compared_in_one_case() {
        assert_eq!(normalize_email("  Alice@Test.COM "), "alice@test.com");
        assert_eq!(normalize_email("alice@test.com"), normalize_email("ALICE@test.com"));
    }

    #[test]
    fn password_rules() {
        assert!(validate_password("password123").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password(&"x".repeat(129)).is_err());
    }

    #[test]
    fn full_name_rules() {
        assert!(validate_full_name("Al").is_ok());
        assert!(validate_full_name(" A ").is_err());
    }

    #[test]
    fn validator_collects_every_failure() {
        let err = Validator::new()
            .check("email", validate_email("nope"))
            .check("password", validate_password("short"))
            .check("fullName", validate_full_name("Alice"))
            .finish()
            .unwrap_err();

        match err {
            AuthError::Validation(details) => {
                let paths: Vec<_> = details.iter().map(|d| d.path.as_str()).collect();
                assert_eq!(paths, ["email", "password"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
