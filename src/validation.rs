use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{synth::UserDraft, types::Department};

/// Raw "add team member" form input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewMemberForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default = "default_department")]
    pub department: String,
    /// Comma-separated.
    #[serde(default)]
    pub skills: String,
}

fn default_department() -> String {
    Department::CustomerService.as_str().to_owned()
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq, Error)]
#[error("invalid form fields: {}", field_list(.errors))]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

fn field_list(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|error| error.field)
        .collect::<Vec<_>>()
        .join(", ")
}

impl ValidationErrors {
    fn push(&mut self, field: &'static str, message: &'static str) {
        self.errors.push(FieldError { field, message });
    }

    pub fn message_for(&self, field: &str) -> Option<&'static str> {
        self.errors
            .iter()
            .find(|error| error.field == field)
            .map(|error| error.message)
    }
}

impl NewMemberForm {
    pub fn validate(&self) -> Result<UserDraft, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let name = self.name.trim();
        let name_len = name.chars().count();
        if name_len < 2 {
            errors.push("name", "Name must be at least 2 characters");
        } else if name_len > 100 {
            errors.push("name", "Name must be at most 100 characters");
        }

        let email = self.email.trim();
        if !looks_like_email(email) {
            errors.push("email", "Invalid email address");
        } else if email.chars().count() > 255 {
            errors.push("email", "Email must be at most 255 characters");
        }

        let department = Department::parse(self.department.trim())
            .filter(|department| department.is_agent_department());
        if department.is_none() {
            errors.push("department", "Select a valid department");
        }

        let skills = split_skills(&self.skills);
        if skills.is_empty() {
            errors.push("skills", "At least one skill is required");
        }

        if !errors.errors.is_empty() {
            return Err(errors);
        }

        Ok(UserDraft {
            name: Some(name.to_owned()),
            email: Some(email.to_owned()),
            department,
            skills: Some(skills),
            ..UserDraft::default()
        })
    }
}

pub fn split_skills(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|skill| !skill.is_empty())
        .map(str::to_owned)
        .collect()
}

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*\.[a-zA-Z]{2,}$",
    )
    .expect("valid email regex")
});

fn looks_like_email(email: &str) -> bool {
    EMAIL.is_match(email)
}
