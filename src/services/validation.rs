use serde::Serialize;
use std::collections::BTreeMap;

const MAX_NAME_LEN: usize = 150;
const MIN_PASSWORD_LEN: usize = 8;

/// Field name to list of problems with that field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| format!("{field}: {}", messages.join(" ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Account fields submitted for registration.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password2: String,
    pub first_name: String,
    pub last_name: String,
}

/// Checks every field rule that does not need the database.
pub fn validate_registration(input: &Registration) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    if let Err(msg) = validate_username(&input.username) {
        errors.add("username", msg);
    }

    if let Err(msg) = validate_email(&input.email) {
        errors.add("email", msg);
    }

    for msg in password_problems(&input.password) {
        errors.add("password", msg);
    }

    if input.password != input.password2 {
        errors.add("password2", "Password fields didn't match.");
    }

    for (field, value) in [
        ("first_name", &input.first_name),
        ("last_name", &input.last_name),
    ] {
        if value.chars().count() > MAX_NAME_LEN {
            errors.add(
                field,
                format!("Ensure this field has no more than {MAX_NAME_LEN} characters."),
            );
        }
    }

    errors.into_result()
}

pub fn validate_username(username: &str) -> Result<(), &'static str> {
    if username.trim().is_empty() {
        return Err("This field may not be blank.");
    }

    if username.chars().count() > MAX_NAME_LEN {
        return Err("Ensure this field has no more than 150 characters.");
    }

    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(
            "Enter a valid username. This value may contain only letters, \
             numbers, and @/./+/-/_ characters.",
        );
    }

    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), &'static str> {
    let email = email.trim();
    if email.is_empty() {
        return Err("This field may not be blank.");
    }

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err("Enter a valid email address.")
    }
}

pub fn password_problems(password: &str) -> Vec<&'static str> {
    if password.is_empty() {
        return vec!["This field may not be blank."];
    }

    let mut problems = Vec::new();
    if password.chars().count() < MIN_PASSWORD_LEN {
        problems.push("This password is too short. It must contain at least 8 characters.");
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        problems.push("This password is entirely numeric.");
    }
    problems
}
