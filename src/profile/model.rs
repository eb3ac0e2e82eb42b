//! Identity and stored user record models.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ValidationError;

/// Role tag that allows a stored record to pre-fill the personal form.
pub const STUDENT_ROLE: &str = "student";

/// The student's personal information, as bound to the personal form and sent
/// to the personal-info save endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub age: Option<u32>,
    pub gender: String,
    /// Serialized as `YYYY-MM-DD`.
    pub dob: Option<NaiveDate>,
}

impl Identity {
    /// Check that all six fields are filled. Reports the first missing one.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let text_fields = [
            ("name", &self.name),
            ("email", &self.email),
            ("phone", &self.phone),
        ];
        for (field, value) in text_fields {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingField { field });
            }
        }
        if self.age.is_none() {
            return Err(ValidationError::MissingField { field: "age" });
        }
        if self.gender.trim().is_empty() {
            return Err(ValidationError::MissingField { field: "gender" });
        }
        if self.dob.is_none() {
            return Err(ValidationError::MissingField { field: "dob" });
        }
        Ok(())
    }

    /// Whether no field carries a value.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// A loosely-shaped user record read back from durable storage.
///
/// Fields are optional and tolerant of the shapes older writers produced
/// (`dateOfBirth`, numeric strings for age, numbers for phone, and so on).
/// A field of an unusable type is dropped instead of failing the record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(
        default,
        alias = "fullName",
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(
        default,
        alias = "phoneNumber",
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub phone: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_age",
        skip_serializing_if = "Option::is_none"
    )]
    pub age: Option<u32>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(
        default,
        alias = "dateOfBirth",
        alias = "date_of_birth",
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub dob: Option<String>,
}

impl UserRecord {
    /// Parse a stored JSON value; anything that is not an object yields `None`.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    pub fn is_student(&self) -> bool {
        self.role.as_deref() == Some(STUDENT_ROLE)
    }

    /// Whether the record looks like user data at all.
    pub fn has_name_or_email(&self) -> bool {
        non_blank(&self.name).is_some() || non_blank(&self.email).is_some()
    }
}

/// `Some(trimmed)` when the value is present and not blank.
pub(crate) fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Accept a number, a numeric string, or nothing.
fn lenient_age<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Accept a string or a number (kept as its decimal text); anything else is `None`.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
