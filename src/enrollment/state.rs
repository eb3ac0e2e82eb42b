//! Enrollment steps and the navigation handed between them.

use serde::{Deserialize, Serialize};

use super::model::NavState;
use crate::error::{EnrollmentError, ValidationError};

/// The screens of the enrollment workflow.
///
/// Progresses linearly: PersonalInfo → CoursePreferences → Payment →
/// Dashboard. Any step may send the student back to PersonalInfo when the
/// session email is lost.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStep {
    #[default]
    PersonalInfo,
    CoursePreferences,
    Payment,
    Dashboard,
}

impl EnrollmentStep {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: EnrollmentStep) -> bool {
        use EnrollmentStep::*;
        matches!(
            (self, target),
            (PersonalInfo, CoursePreferences)
                | (CoursePreferences, Payment)
                | (Payment, Dashboard)
                | (CoursePreferences, PersonalInfo)
                | (Payment, PersonalInfo)
        )
    }

    /// Whether this step ends the workflow.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Dashboard)
    }

    /// Route path of the step's screen.
    pub fn path(&self) -> &'static str {
        match self {
            Self::PersonalInfo => "/personal-info",
            Self::CoursePreferences => "/course-preferences",
            Self::Payment => "/payment",
            Self::Dashboard => "/student-dashboard",
        }
    }
}

impl std::fmt::Display for EnrollmentStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::PersonalInfo => "personal_info",
            Self::CoursePreferences => "course_preferences",
            Self::Payment => "payment",
            Self::Dashboard => "dashboard",
        };
        write!(f, "{s}")
    }
}

/// Where to go next and what to carry there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Navigation {
    pub to: EnrollmentStep,
    pub state: NavState,
}

impl Navigation {
    pub fn new(to: EnrollmentStep, state: NavState) -> Self {
        Self { to, state }
    }
}

impl ValidationError {
    /// Step the student must revisit to recover, if the error calls for one.
    pub fn redirect(&self) -> Option<EnrollmentStep> {
        match self {
            Self::SessionEmailMissing => Some(EnrollmentStep::PersonalInfo),
            _ => None,
        }
    }
}

impl EnrollmentError {
    pub fn redirect(&self) -> Option<EnrollmentStep> {
        match self {
            Self::Validation(v) => v.redirect(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_progression() {
        use EnrollmentStep::*;
        let path = [PersonalInfo, CoursePreferences, Payment, Dashboard];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
            assert!(!pair[0].is_terminal());
        }
        assert!(Dashboard.is_terminal());
    }

    #[test]
    fn skipping_steps_is_invalid() {
        use EnrollmentStep::*;
        assert!(!PersonalInfo.can_transition_to(Payment));
        assert!(!PersonalInfo.can_transition_to(Dashboard));
        assert!(!Dashboard.can_transition_to(PersonalInfo));
    }

    #[test]
    fn lost_session_email_redirects_to_personal_info() {
        let err = EnrollmentError::from(ValidationError::SessionEmailMissing);
        assert_eq!(err.redirect(), Some(EnrollmentStep::PersonalInfo));
        assert!(EnrollmentStep::Payment.can_transition_to(EnrollmentStep::PersonalInfo));

        let err = EnrollmentError::from(ValidationError::UploadMissing);
        assert_eq!(err.redirect(), None);
        assert_eq!(EnrollmentError::Network.redirect(), None);
    }

    #[test]
    fn step_serde() {
        let json = serde_json::to_string(&EnrollmentStep::CoursePreferences).unwrap();
        assert_eq!(json, "\"course_preferences\"");
        let back: EnrollmentStep = serde_json::from_str("\"dashboard\"").unwrap();
        assert_eq!(back, EnrollmentStep::Dashboard);
    }
}
