//! Request and response bodies of the enrollment backend.

use serde::{Deserialize, Serialize};

use crate::enrollment::model::PreferencesForm;
use crate::enrollment::upload::PaymentProof;

/// `{success, error?}` returned by the save endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Body of `POST /course/save`.
///
/// All seven keys are always present; optional preferences are sent as `""`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferencesPayload {
    pub email: String,
    pub currentskills: String,
    pub fieldofstudy: String,
    pub language: String,
    pub goals: String,
    pub background: String,
    pub timecommitment: String,
}

impl PreferencesPayload {
    pub fn new(email: &str, form: &PreferencesForm) -> Self {
        Self {
            email: email.to_string(),
            currentskills: form.current_skills.clone(),
            fieldofstudy: form.field_of_study.clone(),
            language: form.language.clone(),
            goals: form.goals.clone().unwrap_or_default(),
            background: form.background.clone().unwrap_or_default(),
            timecommitment: form.time_commitment.clone().unwrap_or_default(),
        }
    }
}

/// Multipart body of `POST /payment/process`.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub screenshot: PaymentProof,
    pub student_email: String,
    /// Course title, verbatim. The backend uses it as the product key.
    pub course_track: String,
    /// Stringified price.
    pub amount: String,
}

/// `{success, payment_id?, enrollment_id?, error?}` from the payment endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrollment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Pull course titles out of the shapes `available-courses` has been seen to
/// return: a bare array, or an object with a `courses`/`data` array, each
/// entry being a title string or an object with a `title`.
pub fn course_titles(body: &serde_json::Value) -> Vec<String> {
    let list = body
        .as_array()
        .or_else(|| body.get("courses").and_then(|v| v.as_array()))
        .or_else(|| body.get("data").and_then(|v| v.as_array()));

    list.map(|items| {
        items
            .iter()
            .filter_map(|item| {
                item.as_str()
                    .or_else(|| item.get("title").and_then(|t| t.as_str()))
                    .map(String::from)
            })
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preferences_payload_always_has_seven_keys() {
        let form = PreferencesForm {
            current_skills: "Programming".into(),
            field_of_study: "Computer Science".into(),
            language: "English".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(PreferencesPayload::new("a@b.c", &form)).unwrap();
        let obj = json.as_object().unwrap();

        assert_eq!(obj.len(), 7);
        assert_eq!(json["goals"], "");
        assert_eq!(json["background"], "");
        assert_eq!(json["timecommitment"], "");
        assert_eq!(json["currentskills"], "Programming");
    }

    #[test]
    fn payment_response_tolerates_missing_fields() {
        let resp: PaymentResponse =
            serde_json::from_value(serde_json::json!({"success": false, "error": "Duplicate payment"}))
                .unwrap();
        assert!(!resp.success);
        assert_eq!(resp.error.as_deref(), Some("Duplicate payment"));
        assert!(resp.payment_id.is_none());
    }

    #[test]
    fn course_titles_from_various_shapes() {
        let bare = serde_json::json!(["Web Development", {"title": "Data Science"}]);
        assert_eq!(course_titles(&bare), vec!["Web Development", "Data Science"]);

        let wrapped = serde_json::json!({"success": true, "courses": [{"title": "UI/UX Design"}]});
        assert_eq!(course_titles(&wrapped), vec!["UI/UX Design"]);

        let data = serde_json::json!({"data": ["Cloud Computing"]});
        assert_eq!(course_titles(&data), vec!["Cloud Computing"]);

        assert!(course_titles(&serde_json::json!({"success": true})).is_empty());
    }
}
