use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::types::{User, UserDraft, UserId};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Transient edit buffer behind the form. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    pub name: String,
    pub email: String,
}

impl FormState {
    pub fn from_user(user: &User) -> Self {
        Self {
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }

    pub fn clear(&mut self) {
        self.name.clear();
        self.email.clear();
    }

    /// Validate the buffer into a request body.
    pub fn to_draft(&self) -> Result<UserDraft> {
        validate(&self.name, &self.email)
    }
}

/// Which operation a submit performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(UserId),
}

impl FormMode {
    pub fn title(self) -> &'static str {
        match self {
            FormMode::Create => "Add New User",
            FormMode::Edit(_) => "Edit User",
        }
    }

    pub fn submit_label(self) -> &'static str {
        match self {
            FormMode::Create => "Add User",
            FormMode::Edit(_) => "Update User",
        }
    }
}

/// Both fields are required; the email must look like one.
pub fn validate(name: &str, email: &str) -> Result<UserDraft> {
    let name = name.trim();
    let email = email.trim();

    if name.is_empty() {
        return Err(Error::EmptyField("name"));
    }
    if email.is_empty() {
        return Err(Error::EmptyField("email"));
    }
    if !EMAIL_RE.is_match(email) {
        return Err(Error::InvalidEmail(email.to_string()));
    }

    Ok(UserDraft::new(name, email))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_accepts_valid_input() {
        let draft = validate("  Ada ", "ada@example.com ").unwrap();
        assert_eq!(draft, UserDraft::new("Ada", "ada@example.com"));
    }

    #[test]
    fn rejects_blank_fields() {
        assert!(matches!(validate("", "a@x.com"), Err(Error::EmptyField("name"))));
        assert!(matches!(validate("   ", "a@x.com"), Err(Error::EmptyField("name"))));
        assert!(matches!(validate("Ada", ""), Err(Error::EmptyField("email"))));
    }

    #[test]
    fn rejects_malformed_email() {
        for email in ["ada", "ada@", "@x.com", "ada@x", "a da@x.com"] {
            assert!(
                matches!(validate("Ada", email), Err(Error::InvalidEmail(_))),
                "{email} should be rejected"
            );
        }
    }

    #[test]
    fn mode_labels() {
        assert_eq!(FormMode::Create.title(), "Add New User");
        assert_eq!(FormMode::Edit(3).submit_label(), "Update User");
    }
}
