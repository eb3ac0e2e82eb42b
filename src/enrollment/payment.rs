//! PaymentUploadStep: screenshot upload, payment submission and the
//! post-success redirect.
//!
//! Upload state lives in a `watch` channel so callers can wait on the
//! `Idle → Uploading → Uploaded → Submitting → Succeeded` progression. The
//! preview decode runs on the blocking pool behind a spawned task; selecting
//! another file or removing the current one aborts that task, and a decode
//! that still finishes for a replaced proof is discarded by id.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::course::resolve_course;
use super::model::{EnrollmentResult, NavState};
use super::state::{EnrollmentStep, Navigation};
use super::submitter::EnrollmentSubmitter;
use super::timer::{TimerHandle, schedule};
use super::upload::{PaymentProof, Preview, UploadPhase, UploadState, decode_preview};
use crate::config::EnrollConfig;
use crate::error::{EnrollmentError, ValidationError};
use crate::session::Session;

pub struct PaymentUploadStep {
    session: Arc<Session>,
    submitter: Arc<EnrollmentSubmitter>,
    inbound: NavState,
    max_screenshot_bytes: u64,
    upload_delay: Duration,
    redirect_delay: Duration,
    state: Arc<watch::Sender<UploadState>>,
    navigation: Arc<watch::Sender<Option<Navigation>>>,
    decode: Mutex<Option<JoinHandle<()>>>,
    redirect: Mutex<Option<TimerHandle>>,
}

impl PaymentUploadStep {
    pub fn new(
        session: Arc<Session>,
        submitter: Arc<EnrollmentSubmitter>,
        config: &EnrollConfig,
        inbound: NavState,
    ) -> Self {
        Self {
            session,
            submitter,
            inbound,
            max_screenshot_bytes: config.max_screenshot_bytes,
            upload_delay: config.upload_delay,
            redirect_delay: config.redirect_delay,
            state: Arc::new(watch::channel(UploadState::Idle).0),
            navigation: Arc::new(watch::channel(None).0),
            decode: Mutex::new(None),
            redirect: Mutex::new(None),
        }
    }

    pub fn phase(&self) -> UploadPhase {
        self.state.borrow().phase()
    }

    pub fn preview(&self) -> Option<Preview> {
        self.state.borrow().preview().cloned()
    }

    /// Observe the pending redirect. Holds `Some` once it fires.
    pub fn watch_navigation(&self) -> watch::Receiver<Option<Navigation>> {
        self.navigation.subscribe()
    }

    /// Select a screenshot. A valid one replaces any previous selection and
    /// is previewed after the upload delay. An invalid one is rejected and
    /// clears any previous selection, returning to `Idle`.
    pub fn select_file(&self, proof: PaymentProof) -> Result<(), EnrollmentError> {
        if let Err(e) = proof.validate(self.max_screenshot_bytes) {
            warn!(file = %proof.file_name, "Rejected screenshot: {}", e);
            if matches!(self.phase(), UploadPhase::Uploading | UploadPhase::Uploaded) {
                self.remove_file()?;
            }
            return Err(e.into());
        }

        let proof = Arc::new(proof);
        self.update(|s| s.begin_upload(Arc::clone(&proof)))?;
        info!(proof = %proof.id, file = %proof.file_name, size = proof.size(), "Screenshot selected");

        let state = Arc::clone(&self.state);
        let delay = self.upload_delay;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let id = proof.id;
            let preview = match tokio::task::spawn_blocking(move || decode_preview(&proof)).await {
                Ok(preview) => preview,
                Err(e) => {
                    warn!(proof = %id, "Preview decode failed: {}", e);
                    return;
                }
            };
            if state.send_if_modified(|s| s.finish_upload(preview)) {
                debug!(proof = %id, "Preview ready");
            } else {
                debug!(proof = %id, "Discarding preview of a replaced screenshot");
            }
        });

        if let Some(previous) = self.replace_decode(Some(task)) {
            previous.abort();
        }
        Ok(())
    }

    /// Wait for a pending decode to settle. Returns the preview if a file is
    /// uploaded afterwards.
    pub async fn wait_until_uploaded(&self) -> Option<Preview> {
        let mut rx = self.state.subscribe();
        let state = rx
            .wait_for(|s| s.phase() != UploadPhase::Uploading)
            .await
            .ok()?;
        state.preview().cloned()
    }

    /// Drop the selected screenshot and any pending decode.
    pub fn remove_file(&self) -> Result<(), EnrollmentError> {
        self.update(|s| s.remove())?;
        if let Some(task) = self.replace_decode(None) {
            task.abort();
        }
        debug!("Screenshot removed");
        Ok(())
    }

    /// Submit the payment.
    ///
    /// Preconditions, checked in order before any network call: an uploaded
    /// screenshot, a session email, and a course with title and price. On
    /// success the enrollment is recorded and a redirect to the dashboard is
    /// scheduled. On failure the state returns to `Uploaded` with the preview
    /// intact.
    pub async fn submit(&self) -> Result<EnrollmentResult, EnrollmentError> {
        let phase = self.phase();
        match phase {
            UploadPhase::Uploaded => {}
            UploadPhase::Submitting => return Err(ValidationError::SubmissionInProgress.into()),
            UploadPhase::Succeeded => return Err(ValidationError::AlreadySubmitted.into()),
            UploadPhase::Idle | UploadPhase::Uploading => {
                return Err(ValidationError::UploadMissing.into());
            }
        }

        let email = self
            .session
            .resolve_email(self.inbound.email.as_deref())
            .await
            .ok_or(ValidationError::SessionEmailMissing)?;

        let course = resolve_course(&self.session, self.inbound.course.as_ref())
            .await
            .ok_or(ValidationError::CourseInfoMissing)?;
        course.payable()?;

        let proof = self.update(|s| s.begin_submit())?;
        info!(proof = %proof.id, email = %email, "Submitting payment");

        match self
            .submitter
            .submit_payment(&proof, &email, &course, self.session.now())
            .await
        {
            Ok(result) => {
                if let Err(e) = self.session.set_recent_enrollment(&result).await {
                    warn!("Failed to record enrollment: {}", e);
                }
                self.state.send_modify(|s| s.succeed(result.clone()));
                self.schedule_redirect(NavState::new(Some(course), Some(email)));
                Ok(result)
            }
            Err(e) => {
                warn!(proof = %proof.id, "Payment failed: {}", e);
                self.state.send_modify(|s| s.fail_submit());
                Err(e)
            }
        }
    }

    /// Skip the remaining redirect delay. Returns the navigation if one was
    /// due or had already happened.
    pub fn go_now(&self) -> Option<Navigation> {
        if let Some(timer) = self.take_redirect() {
            timer.fire_now();
        }
        self.navigation.borrow().clone()
    }

    /// Leave the screen: cancel the redirect and any pending decode.
    pub fn leave(&self) {
        if let Some(timer) = self.take_redirect() {
            if timer.cancel() {
                debug!("Pending redirect cancelled");
            }
        }
        if let Some(task) = self.replace_decode(None) {
            task.abort();
        }
    }

    fn schedule_redirect(&self, state: NavState) {
        let navigation = Arc::clone(&self.navigation);
        let target = Navigation::new(EnrollmentStep::Dashboard, state);
        let timer = schedule(self.redirect_delay, move || {
            info!(to = %target.to, "Redirecting");
            navigation.send_replace(Some(target));
        });
        if let Ok(mut slot) = self.redirect.lock() {
            *slot = Some(timer);
        }
    }

    fn take_redirect(&self) -> Option<TimerHandle> {
        match self.redirect.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }

    fn replace_decode(&self, task: Option<JoinHandle<()>>) -> Option<JoinHandle<()>> {
        match self.decode.lock() {
            Ok(mut slot) => std::mem::replace(&mut *slot, task),
            Err(poisoned) => std::mem::replace(&mut *poisoned.into_inner(), task),
        }
    }

    /// Apply a fallible transition, notifying watchers only on success.
    fn update<T>(
        &self,
        f: impl FnOnce(&mut UploadState) -> Result<T, ValidationError>,
    ) -> Result<T, ValidationError> {
        let mut outcome = None;
        self.state.send_if_modified(|s| {
            let result = f(s);
            let changed = result.is_ok();
            outcome = Some(result);
            changed
        });
        outcome.unwrap_or(Err(ValidationError::UploadMissing))
    }
}

impl Drop for PaymentUploadStep {
    fn drop(&mut self) {
        self.leave();
    }
}
