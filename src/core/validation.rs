//! Client-side checks for the sign-in and sign-up forms.
//!
//! Messages are shown next to the offending field; a form with any error is
//! never submitted.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::api::{Credentials, Registration};

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

const MIN_PASSWORD_CHARS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    FirstName,
    LastName,
    Email,
    Password,
    ConfirmPassword,
}

impl Field {
    pub fn label(self) -> &'static str {
        match self {
            Field::FirstName => "First name",
            Field::LastName => "Last name",
            Field::Email => "Email",
            Field::Password => "Password",
            Field::ConfirmPassword => "Confirm password",
        }
    }
}

/// Per-field validation messages, ordered by field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<Field, &'static str>);

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: Field) -> Option<&'static str> {
        self.0.get(&field).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &'static str)> + '_ {
        self.0.iter().map(|(field, message)| (*field, *message))
    }

    fn check(&mut self, field: Field, result: Option<&'static str>) {
        if let Some(message) = result {
            self.0.insert(field, message);
        }
    }

    fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in self.iter() {
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            write!(f, "{}: {}", field.label(), message)?;
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

pub fn validate_email(value: &str) -> Option<&'static str> {
    if value.is_empty() {
        return Some("Email address is required");
    }
    if !EMAIL_PATTERN.is_match(value) {
        return Some("Please enter a valid email address");
    }
    None
}

pub fn validate_password(value: &str) -> Option<&'static str> {
    if value.is_empty() {
        return Some("Password is required");
    }
    if value.chars().count() < MIN_PASSWORD_CHARS {
        return Some("Password must be at least 8 characters");
    }
    let has_lower = value.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = value.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = value.chars().any(|c| c.is_ascii_digit());
    if !(has_lower && has_upper && has_digit) {
        return Some("Password must contain uppercase, lowercase, and number");
    }
    None
}

/// Fields collected by the sign-up prompt, before they become a
/// [`Registration`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignUpForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignUpForm {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();
        errors.check(
            Field::FirstName,
            self.first_name
                .trim()
                .is_empty()
                .then_some("First name is required"),
        );
        errors.check(
            Field::LastName,
            self.last_name
                .trim()
                .is_empty()
                .then_some("Last name is required"),
        );
        errors.check(Field::Email, validate_email(self.email.trim()));
        errors.check(Field::Password, validate_password(&self.password));
        errors.check(
            Field::ConfirmPassword,
            (self.confirm_password != self.password).then_some("Passwords do not match"),
        );
        errors.into_result()
    }

    pub fn into_registration(self) -> Registration {
        Registration {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password,
        }
    }
}

pub fn validate_sign_in(credentials: &Credentials) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::default();
    errors.check(Field::Email, validate_email(credentials.email.trim()));
    errors.check(Field::Password, validate_password(&credentials.password));
    errors.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> SignUpForm {
        SignUpForm {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            password: "Engine1843".to_string(),
            confirm_password: "Engine1843".to_string(),
        }
    }

    #[test]
    fn email_rules() {
        assert_eq!(validate_email(""), Some("Email address is required"));
        assert_eq!(
            validate_email("ada@example"),
            Some("Please enter a valid email address")
        );
        assert_eq!(
            validate_email("ada lovelace@example.com"),
            Some("Please enter a valid email address")
        );
        assert_eq!(validate_email("ada@example.com"), None);
    }

    #[test]
    fn password_rules() {
        let cases = [
            ("", Some("Password is required")),
            ("Ab1", Some("Password must be at least 8 characters")),
            (
                "alllowercase1",
                Some("Password must contain uppercase, lowercase, and number"),
            ),
            (
                "NoDigitsHere",
                Some("Password must contain uppercase, lowercase, and number"),
            ),
            ("Engine1843", None),
        ];
        for (password, expected) in cases {
            assert_eq!(validate_password(password), expected, "password={password:?}");
        }
    }

    #[test]
    fn sign_up_reports_every_failing_field() {
        let form = SignUpForm {
            first_name: " ".to_string(),
            confirm_password: "different".to_string(),
            ..valid_form()
        };
        let errors = form.validate().expect_err("form should be rejected");
        assert_eq!(errors.get(Field::FirstName), Some("First name is required"));
        assert_eq!(
            errors.get(Field::ConfirmPassword),
            Some("Passwords do not match")
        );
        assert_eq!(errors.get(Field::Email), None);
        assert_eq!(
            errors.to_string(),
            "First name: First name is required; Confirm password: Passwords do not match"
        );
    }

    #[test]
    fn valid_sign_up_becomes_trimmed_registration() {
        let form = SignUpForm {
            email: "  ada@example.com ".to_string(),
            ..valid_form()
        };
        assert!(form.validate().is_ok());
        let registration = form.into_registration();
        assert_eq!(registration.email, "ada@example.com");
        assert_eq!(registration.first_name, "Ada");
    }

    #[test]
    fn sign_in_checks_email_and_password_only() {
        let credentials = Credentials {
            email: "not-an-email".to_string(),
            password: "Engine1843".to_string(),
        };
        let errors = validate_sign_in(&credentials).expect_err("bad email");
        assert_eq!(errors.iter().count(), 1);
        assert_eq!(
            errors.get(Field::Email),
            Some("Please enter a valid email address")
        );
    }
}
