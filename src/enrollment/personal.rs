//! PersonalInfoStep: the first screen. Pre-fills from known identity,
//! saves the student's details and starts the session.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use tokio::sync::OnceCell;
use tracing::{info, warn};

use super::course::resolve_course;
use super::model::NavState;
use super::state::{EnrollmentStep, Navigation};
use super::submitter::{EnrollmentSubmitter, InFlight};
use crate::config::EnrollConfig;
use crate::error::EnrollmentError;
use crate::profile::model::Identity;
use crate::profile::resolver::{ProfileResolver, ResolvedProfile};
use crate::session::Session;

pub struct PersonalInfoStep {
    session: Arc<Session>,
    submitter: Arc<EnrollmentSubmitter>,
    inbound: NavState,
    cookie_lifetime: Duration,
    resolver: ProfileResolver,
    prefill: OnceCell<ResolvedProfile>,
    in_flight: AtomicBool,
}

impl PersonalInfoStep {
    pub fn new(
        session: Arc<Session>,
        submitter: Arc<EnrollmentSubmitter>,
        config: &EnrollConfig,
        inbound: NavState,
    ) -> Self {
        Self {
            resolver: ProfileResolver::new(Arc::clone(&session)),
            session,
            submitter,
            inbound,
            cookie_lifetime: config.session_cookie_lifetime,
            prefill: OnceCell::new(),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Resolve the identity to pre-fill the form with. Runs the resolver on
    /// the first call only; later calls return the same result.
    pub async fn initialize(&self) -> &ResolvedProfile {
        self.prefill
            .get_or_init(|| async { self.resolver.resolve().await })
            .await
    }

    /// Save the student's details and hand off to course preferences.
    ///
    /// On success the `student_email` cookie is set for the configured
    /// lifetime. On failure nothing is written.
    pub async fn submit(&self, mut identity: Identity) -> Result<Navigation, EnrollmentError> {
        let _guard = InFlight::acquire(&self.in_flight)?;
        identity.validate()?;
        identity.email = identity.email.trim().to_string();

        let course = resolve_course(&self.session, self.inbound.course.as_ref()).await;
        if course.is_none() {
            warn!("No course selected yet; continuing without one");
        }

        self.submitter.save_personal(&identity).await?;

        let email = identity.email.clone();
        self.session
            .set_session_email(&email, self.cookie_lifetime)
            .await?;

        info!(email = %email, next = %EnrollmentStep::CoursePreferences, "Personal step complete");
        Ok(Navigation::new(
            EnrollmentStep::CoursePreferences,
            NavState::new(course, Some(email)),
        ))
    }
}
