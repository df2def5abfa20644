//! Request-shape checks run before the core is called.

use regex::Regex;

use super::{login::LoginRequest, register::RegisterRequest};
use crate::auth::{AuthError, FieldError, MIN_PASSWORD_LENGTH};

#[must_use]
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

#[must_use]
pub fn valid_username(username: &str) -> bool {
    Regex::new(r"^[A-Za-z0-9_]+$").is_ok_and(|re| re.is_match(username))
}

/// # Errors
/// [`AuthError::ValidationFailed`] listing every rejected field.
pub fn validate_registration(request: &RegisterRequest) -> Result<(), AuthError> {
    let mut errors = Vec::new();

    check_name(&mut errors, "firstName", "First name", &request.first_name);
    check_name(&mut errors, "lastName", "Last name", &request.last_name);

    let username = request.username.trim();
    if username.is_empty() {
        errors.push(FieldError::new("username", "Username is required"));
    } else if username.chars().count() < 3 {
        errors.push(FieldError::new(
            "username",
            "Username must be at least 3 characters",
        ));
    } else if !valid_username(username) {
        errors.push(FieldError::new(
            "username",
            "Username can only contain letters, numbers, and underscores",
        ));
    }

    if !valid_email(request.email.trim()) {
        errors.push(FieldError::new(
            "email",
            "Please provide a valid email address",
        ));
    }

    if request.password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.push(FieldError::new(
            "password",
            "Password must be at least 8 characters long",
        ));
    }

    if request.office_id.trim().is_empty() {
        errors.push(FieldError::new("officeId", "Office ID is required"));
    }

    finish(errors)
}

/// # Errors
/// [`AuthError::ValidationFailed`] listing every rejected field.
pub fn validate_login(request: &LoginRequest) -> Result<(), AuthError> {
    let mut errors = Vec::new();

    let email = request.email.as_deref().map(str::trim);
    let username = request.username.as_deref().map(str::trim);

    if let Some(email) = email {
        if !valid_email(email) {
            errors.push(FieldError::new(
                "email",
                "Please provide a valid email address",
            ));
        }
    }
    if username == Some("") {
        errors.push(FieldError::new("username", "Username cannot be empty"));
    }
    if email.is_none() && username.is_none() {
        errors.push(FieldError::new("email", "Email or username is required"));
    }
    if request.password.is_empty() {
        errors.push(FieldError::new("password", "Password is required"));
    }

    finish(errors)
}

fn check_name(errors: &mut Vec<FieldError>, field: &str, label: &str, value: &str) {
    let value = value.trim();
    if value.is_empty() {
        errors.push(FieldError::new(field, &format!("{label} is required")));
    } else if value.chars().count() < 2 {
        errors.push(FieldError::new(
            field,
            &format!("{label} must be at least 2 characters"),
        ));
    }
}

fn finish(errors: Vec<FieldError>) -> Result<(), AuthError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AuthError::ValidationFailed(errors))
    }
}
