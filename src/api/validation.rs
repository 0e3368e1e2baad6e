//! Input validation for API requests.
//!
//! Validators return `Result<(), String>`; collect several with
//! `ValidationErrorBuilder::check` to report every bad field at once.

use lazy_static::lazy_static;
use regex::Regex;

use crate::db::SignupRequest;

use super::error::{ApiError, ValidationErrorBuilder};

lazy_static! {
    /// Usernames: letters, digits, dot, dash, underscore; 3-32 chars
    static ref USERNAME_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9][a-zA-Z0-9._-]{2,31}$"
    ).unwrap();

    /// Pragmatic email check: something@something.tld
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[^\s@]+@[^\s@]+\.[^\s@]+$"
    ).unwrap();

    /// Phone numbers: digits with optional +, spaces, dashes, parentheses
    static ref PHONE_REGEX: Regex = Regex::new(
        r"^\+?[0-9 ()-]{5,20}$"
    ).unwrap();

    /// "HH:mm" on a 24 hour clock
    static ref HHMM_REGEX: Regex = Regex::new(
        r"^([01][0-9]|2[0-3]):[0-5][0-9]$"
    ).unwrap();
}

pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }
    if !USERNAME_REGEX.is_match(username) {
        return Err(
            "Username must be 3-32 characters of letters, digits, '.', '-' or '_'".to_string(),
        );
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }
    if email.len() > 254 || !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email format".to_string());
    }
    Ok(())
}

pub fn validate_password(password: &str, min_length: usize) -> Result<(), String> {
    if password.chars().count() < min_length {
        return Err(format!("Password must be at least {} characters", min_length));
    }
    if password.len() > 128 {
        return Err("Password is too long (max 128 characters)".to_string());
    }
    Ok(())
}

/// Validate a person's display name
pub fn validate_full_name(name: &str) -> Result<(), String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("Full name is required".to_string());
    }
    if name.chars().count() > 100 {
        return Err("Full name is too long (max 100 characters)".to_string());
    }
    Ok(())
}

/// Optional phone; empty means "no phone"
pub fn validate_phone(phone: &Option<String>) -> Result<(), String> {
    match phone.as_deref().map(str::trim) {
        None | Some("") => Ok(()),
        Some(p) if PHONE_REGEX.is_match(p) => Ok(()),
        Some(_) => Err("Invalid phone number".to_string()),
    }
}

pub fn validate_hhmm(value: &str, field_name: &str) -> Result<(), String> {
    if !HHMM_REGEX.is_match(value.trim()) {
        return Err(format!("{} must be in HH:mm format", field_name));
    }
    Ok(())
}

/// Department, zone, role and holiday names
pub fn validate_lookup_name(name: &str) -> Result<(), String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("Name is required".to_string());
    }
    if name.chars().count() > 80 {
        return Err("Name is too long (max 80 characters)".to_string());
    }
    Ok(())
}

/// Validate a UUID string
pub fn validate_uuid(id: &str, field_name: &str) -> Result<(), String> {
    if id.is_empty() {
        return Err(format!("{} is required", field_name));
    }

    if uuid::Uuid::parse_str(id).is_err() {
        return Err(format!("Invalid {} format", field_name));
    }

    Ok(())
}

/// Path ids are UUIDs; anything else cannot exist
pub fn require_uuid(id: &str, what: &str) -> Result<(), ApiError> {
    validate_uuid(id, what).map_err(|_| ApiError::not_found(format!("{} not found", what)))
}

pub fn validate_signup(req: &SignupRequest, min_password_length: usize) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    errors
        .check("username", validate_username(req.username.trim()))
        .check("email", validate_email(req.email.trim()))
        .check("password", validate_password(&req.password, min_password_length))
        .check("fullName", validate_full_name(&req.full_name))
        .check("phone", validate_phone(&req.phone));
    errors.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username() {
        assert!(validate_username("jdoe").is_ok());
        assert!(validate_username("jane.doe-2").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("jd").is_err());
        assert!(validate_username(".jdoe").is_err());
        assert!(validate_username("j doe").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("jane@example.com").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("jane@").is_err());
        assert!(validate_email("jane example.com").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("longenough", 8).is_ok());
        assert!(validate_password("short", 8).is_err());
        assert!(validate_password(&"x".repeat(129), 8).is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone(&None).is_ok());
        assert!(validate_phone(&Some(String::new())).is_ok());
        assert!(validate_phone(&Some("+1 (555) 010-2000".into())).is_ok());
        assert!(validate_phone(&Some("call me".into())).is_err());
    }

    #[test]
    fn test_validate_hhmm() {
        assert!(validate_hhmm("09:00", "Start").is_ok());
        assert!(validate_hhmm("23:59", "Start").is_ok());
        assert!(validate_hhmm("24:00", "Start").is_err());
        assert!(validate_hhmm("9:00", "Start").is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000", "id").is_ok());
        assert!(validate_uuid("", "id").is_err());
        assert!(validate_uuid("nope", "id").is_err());
        assert!(require_uuid("nope", "Employee").is_err());
    }

    #[test]
    fn test_validate_signup_collects_all_fields() {
        let req = SignupRequest {
            username: "x".into(),
            email: "bad".into(),
            password: "short".into(),
            full_name: "Jane Doe".into(),
            department: None,
            position: None,
            location: None,
            phone: None,
        };
        let err = validate_signup(&req, 8).unwrap_err();
        assert!(err.message().contains("3 fields"));
    }
}
