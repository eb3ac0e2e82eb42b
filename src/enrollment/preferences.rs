//! CoursePreferencesStep: saves learning preferences against the session email.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tracing::{info, warn};

use super::model::{NavState, PreferencesForm};
use super::state::{EnrollmentStep, Navigation};
use super::submitter::{EnrollmentSubmitter, InFlight};
use crate::api::types::PreferencesPayload;
use crate::error::{EnrollmentError, ValidationError};
use crate::session::Session;

pub struct CoursePreferencesStep {
    session: Arc<Session>,
    submitter: Arc<EnrollmentSubmitter>,
    inbound: NavState,
    in_flight: AtomicBool,
}

impl CoursePreferencesStep {
    pub fn new(session: Arc<Session>, submitter: Arc<EnrollmentSubmitter>, inbound: NavState) -> Self {
        Self {
            session,
            submitter,
            inbound,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Session email from the cookie, else from navigation state.
    pub async fn session_email(&self) -> Option<String> {
        self.session.resolve_email(self.inbound.email.as_deref()).await
    }

    /// Save preferences and hand off to payment with the course unchanged.
    ///
    /// Without a session email nothing is sent and the error redirects to
    /// the personal step.
    pub async fn submit(&self, form: PreferencesForm) -> Result<Navigation, EnrollmentError> {
        let _guard = InFlight::acquire(&self.in_flight)?;

        let Some(email) = self.session_email().await else {
            warn!("No session email; sending the student back to personal info");
            return Err(ValidationError::SessionEmailMissing.into());
        };
        form.validate()?;

        let payload = PreferencesPayload::new(&email, &form);
        self.submitter.save_preferences(&payload).await?;

        info!(email = %email, next = %EnrollmentStep::Payment, "Preferences step complete");
        Ok(Navigation::new(
            EnrollmentStep::Payment,
            NavState::new(self.inbound.course.clone(), Some(email)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrollment::model::CourseSelection;
    use crate::enrollment::testing::{Behavior, MockApi};
    use crate::error::CONNECTIVITY_MESSAGE;
    use crate::session::SystemClock;
    use crate::store::MemoryStore;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn session() -> Arc<Session> {
        Arc::new(Session::new(Arc::new(MemoryStore::new()), Arc::new(SystemClock)))
    }

    fn step(session: &Arc<Session>, api: &Arc<MockApi>, inbound: NavState) -> CoursePreferencesStep {
        CoursePreferencesStep::new(
            session.clone(),
            Arc::new(EnrollmentSubmitter::new(api.clone(), false)),
            inbound,
        )
    }

    fn form() -> PreferencesForm {
        PreferencesForm {
            current_skills: "Programming".into(),
            field_of_study: "Computer Science".into(),
            language: "English".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn cookie_email_is_used_and_optionals_are_blank() {
        let session = session();
        session
            .set_session_email("cookie@example.com", Duration::from_secs(3600))
            .await
            .unwrap();
        let api = Arc::new(MockApi::default());
        let course = CourseSelection::new("Web Development", dec!(999));
        let inbound = NavState::new(Some(course.clone()), Some("nav@example.com".into()));

        let nav = step(&session, &api, inbound).submit(form()).await.unwrap();
        assert_eq!(nav.to, EnrollmentStep::Payment);
        assert_eq!(nav.state.email.as_deref(), Some("cookie@example.com"));
        assert_eq!(nav.state.course, Some(course));

        let sent = api.preferences.lock().unwrap();
        assert_eq!(sent[0].email, "cookie@example.com");
        assert_eq!(sent[0].goals, "");
        assert_eq!(sent[0].background, "");
        assert_eq!(sent[0].timecommitment, "");
    }

    #[tokio::test]
    async fn navigation_email_is_the_fallback() {
        let session = session();
        let api = Arc::new(MockApi::default());
        let inbound = NavState::new(None, Some("nav@example.com".into()));

        let nav = step(&session, &api, inbound).submit(form()).await.unwrap();
        assert_eq!(nav.state.email.as_deref(), Some("nav@example.com"));
        assert_eq!(nav.state.course, None);
    }

    #[tokio::test]
    async fn no_email_redirects_without_calling_backend() {
        let session = session();
        let api = Arc::new(MockApi::default());

        let err = step(&session, &api, NavState::default())
            .submit(form())
            .await
            .unwrap_err();
        assert_eq!(err.redirect(), Some(EnrollmentStep::PersonalInfo));
        assert_eq!(api.calls(), 0);
    }

    #[tokio::test]
    async fn missing_mandatory_field_blocks() {
        let session = session();
        let api = Arc::new(MockApi::default());
        let inbound = NavState::new(None, Some("nav@example.com".into()));
        let mut form = form();
        form.language.clear();

        let err = step(&session, &api, inbound).submit(form).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(api.calls(), 0);
    }

    #[tokio::test]
    async fn failures_map_to_one_message_each() {
        let session = session();
        let inbound = NavState::new(None, Some("nav@example.com".into()));

        let api = Arc::new(MockApi::with(Behavior::Reject("Invalid language".into())));
        let err = step(&session, &api, inbound.clone()).submit(form()).await.unwrap_err();
        assert_eq!(err.user_message(), "Saving course preferences failed: Invalid language");

        api.set_behavior(Behavior::Offline);
        let err = step(&session, &api, inbound.clone()).submit(form()).await.unwrap_err();
        assert_eq!(err.user_message(), CONNECTIVITY_MESSAGE);

        api.set_behavior(Behavior::Garbled);
        let err = step(&session, &api, inbound).submit(form()).await.unwrap_err();
        assert!(matches!(err, EnrollmentError::Unexpected { .. }));
    }
}
