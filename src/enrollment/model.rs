//! Course selection, navigation state, preference and result models.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ValidationError;

/// The course a student is enrolling into.
///
/// Carried opaquely between steps; display fields this crate does not know
/// about are preserved in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseSelection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_price",
        skip_serializing_if = "Option::is_none"
    )]
    pub price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CourseSelection {
    pub fn new(title: &str, price: Decimal) -> Self {
        Self {
            title: Some(title.to_string()),
            price: Some(price),
            ..Default::default()
        }
    }

    /// Title and price, both required before paying.
    pub fn payable(&self) -> Result<(&str, Decimal), ValidationError> {
        let title = self
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ValidationError::CourseInfoMissing)?;
        let price = self.price.ok_or(ValidationError::CourseInfoMissing)?;
        Ok((title, price))
    }
}

/// Price as sent in the `amount` form field.
pub fn amount_string(price: Decimal) -> String {
    price.normalize().to_string()
}

/// Accept a JSON number, a numeric string (currency symbols and separators
/// stripped), or nothing. Unparseable values count as missing.
fn lenient_price<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        Some(serde_json::Value::String(s)) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            Decimal::from_str(&cleaned).ok()
        }
        _ => None,
    })
}

/// State handed from one step to the next.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NavState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<CourseSelection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl NavState {
    pub fn new(course: Option<CourseSelection>, email: Option<String>) -> Self {
        Self { course, email }
    }
}

/// Learning preferences as entered on the preferences form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferencesForm {
    pub current_skills: String,
    pub field_of_study: String,
    pub language: String,
    pub goals: Option<String>,
    pub background: Option<String>,
    pub time_commitment: Option<String>,
}

impl PreferencesForm {
    /// The three mandatory inputs must be filled.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let required = [
            ("currentskills", &self.current_skills),
            ("fieldofstudy", &self.field_of_study),
            ("language", &self.language),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingField { field });
            }
        }
        Ok(())
    }
}

/// Record of a completed enrollment, kept for the "recent enrollment" banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentResult {
    pub payment_id: String,
    pub enrollment_id: String,
    pub course_title: String,
    pub enrollment_date: DateTime<Utc>,
}

impl EnrollmentResult {
    pub fn banner(&self) -> String {
        format!(
            "You are enrolled in {} (enrolled {}, enrollment {}).",
            self.course_title,
            self.enrollment_date.format("%Y-%m-%d"),
            self.enrollment_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn course_accepts_numeric_and_string_prices() {
        let numeric: CourseSelection =
            serde_json::from_value(serde_json::json!({"title": "Web Development", "price": 999}))
                .unwrap();
        assert_eq!(numeric.price, Some(dec!(999)));

        let text: CourseSelection =
            serde_json::from_value(serde_json::json!({"title": "Web Development", "price": "₹1,499.50"}))
                .unwrap();
        assert_eq!(text.price, Some(dec!(1499.50)));
    }

    #[test]
    fn unparseable_price_counts_as_missing() {
        let course: CourseSelection =
            serde_json::from_value(serde_json::json!({"title": "X", "price": "free"})).unwrap();
        assert_eq!(course.price, None);
        assert_eq!(course.payable(), Err(ValidationError::CourseInfoMissing));
    }

    #[test]
    fn course_preserves_unknown_display_fields() {
        let value = serde_json::json!({
            "title": "Data Science",
            "price": 1299,
            "image": "ds.png",
            "rating": 4.8
        });
        let course: CourseSelection = serde_json::from_value(value).unwrap();
        assert_eq!(course.extra["image"], "ds.png");

        let back = serde_json::to_value(&course).unwrap();
        assert_eq!(back["rating"], 4.8);
        assert_eq!(back["title"], "Data Science");
    }

    #[test]
    fn payable_requires_title_and_price() {
        assert!(CourseSelection::new("Web Development", dec!(999)).payable().is_ok());

        let no_price = CourseSelection {
            title: Some("Web Development".into()),
            ..Default::default()
        };
        assert_eq!(no_price.payable(), Err(ValidationError::CourseInfoMissing));

        let blank_title = CourseSelection::new("  ", dec!(999));
        assert_eq!(blank_title.payable(), Err(ValidationError::CourseInfoMissing));
    }

    #[test]
    fn amount_is_plain_number_text() {
        assert_eq!(amount_string(dec!(999)), "999");
        assert_eq!(amount_string(dec!(999.00)), "999");
        assert_eq!(amount_string(dec!(1499.5)), "1499.5");
    }

    #[test]
    fn preferences_require_three_inputs() {
        let mut form = PreferencesForm {
            current_skills: "Programming".into(),
            field_of_study: "Computer Science".into(),
            language: "English".into(),
            ..Default::default()
        };
        assert!(form.validate().is_ok());

        form.language.clear();
        assert_eq!(
            form.validate(),
            Err(ValidationError::MissingField { field: "language" })
        );
    }

    #[test]
    fn enrollment_result_uses_camel_case() {
        let result = EnrollmentResult {
            payment_id: "p1".into(),
            enrollment_id: "e1".into(),
            course_title: "Web Development".into(),
            enrollment_date: Utc::now(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["paymentId"], "p1");
        assert_eq!(json["courseTitle"], "Web Development");
        assert!(result.banner().contains("Web Development"));
    }
}
