//! EnrollmentSubmitter: sends each step's data to the backend and folds
//! transport failures into the user-facing error taxonomy.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::model::{CourseSelection, EnrollmentResult, amount_string};
use super::upload::PaymentProof;
use crate::api::catalog::verify_course;
use crate::api::client::EnrollmentApi;
use crate::api::types::{PaymentRequest, PreferencesPayload};
use crate::error::{ApiError, EnrollmentError, ValidationError};
use crate::profile::model::Identity;

const PERSONAL_CONTEXT: &str = "Saving personal information";
const PREFERENCES_CONTEXT: &str = "Saving course preferences";
const PAYMENT_CONTEXT: &str = "Payment";

/// Map a transport failure onto what the student is told.
///
/// A server-side rejection keeps its message; a request that never got an
/// answer becomes the fixed connectivity message; anything else surfaces
/// its own text.
pub fn classify(context: &'static str, err: ApiError) -> EnrollmentError {
    match err {
        ApiError::Server { message, .. } => EnrollmentError::Server {
            context,
            message: message.unwrap_or_else(|| "Unknown error".to_string()),
        },
        ApiError::Network { .. } | ApiError::Timeout { .. } => EnrollmentError::Network,
        other @ (ApiError::InvalidResponse { .. } | ApiError::Request { .. }) => {
            EnrollmentError::Unexpected {
                message: other.to_string(),
            }
        }
    }
}

/// One in-flight call per step. Released on drop.
pub(crate) struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    pub(crate) fn acquire(flag: &'a AtomicBool) -> Result<Self, ValidationError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self(flag))
            .map_err(|_| ValidationError::SubmissionInProgress)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

const DEFAULT_VERIFY_BUDGET: Duration = Duration::from_secs(10);

/// Backend submissions for all three steps.
pub struct EnrollmentSubmitter {
    api: Arc<dyn EnrollmentApi>,
    verify_course: bool,
    verify_budget: Duration,
}

impl EnrollmentSubmitter {
    pub fn new(api: Arc<dyn EnrollmentApi>, verify_course: bool) -> Self {
        Self {
            api,
            verify_course,
            verify_budget: DEFAULT_VERIFY_BUDGET,
        }
    }

    /// Bound the whole course check. Covers both catalog lookups.
    pub fn with_verify_timeout(mut self, per_lookup: Duration) -> Self {
        self.verify_budget = per_lookup * 2;
        self
    }

    pub async fn save_personal(&self, identity: &Identity) -> Result<(), EnrollmentError> {
        self.api
            .save_personal(identity)
            .await
            .map_err(|e| classify(PERSONAL_CONTEXT, e))?;
        info!(email = %identity.email, "Personal information saved");
        Ok(())
    }

    pub async fn save_preferences(
        &self,
        payload: &PreferencesPayload,
    ) -> Result<(), EnrollmentError> {
        self.api
            .save_preferences(payload)
            .await
            .map_err(|e| classify(PREFERENCES_CONTEXT, e))?;
        info!(email = %payload.email, "Course preferences saved");
        Ok(())
    }

    /// Submit the payment proof for `course`.
    ///
    /// The course must carry a title and a price; otherwise nothing is sent.
    pub async fn submit_payment(
        &self,
        proof: &PaymentProof,
        email: &str,
        course: &CourseSelection,
        now: DateTime<Utc>,
    ) -> Result<EnrollmentResult, EnrollmentError> {
        let (title, price) = course.payable()?;

        if self.verify_course {
            match tokio::time::timeout(self.verify_budget, verify_course(self.api.as_ref(), title))
                .await
            {
                Ok(availability) if availability.is_known() => {
                    info!(course = title, ?availability, "Course verified");
                }
                Ok(availability) => {
                    warn!(course = title, ?availability, "Course not recognised, submitting anyway");
                }
                Err(_) => {
                    warn!(
                        course = title,
                        budget = ?self.verify_budget,
                        "Course check timed out, submitting anyway"
                    );
                }
            }
        }

        let request = PaymentRequest {
            screenshot: proof.clone(),
            student_email: email.to_string(),
            course_track: title.to_string(),
            amount: amount_string(price),
        };

        let response = self
            .api
            .process_payment(request)
            .await
            .map_err(|e| classify(PAYMENT_CONTEXT, e))?;

        let payment_id = response.payment_id.unwrap_or_else(|| {
            warn!("Payment accepted without a payment id");
            String::new()
        });
        let enrollment_id = response.enrollment_id.unwrap_or_else(|| {
            warn!("Payment accepted without an enrollment id");
            String::new()
        });

        info!(
            proof = %proof.id,
            payment_id = %payment_id,
            enrollment_id = %enrollment_id,
            course = title,
            "Payment accepted"
        );

        Ok(EnrollmentResult {
            payment_id,
            enrollment_id,
            course_title: title.to_string(),
            enrollment_date: now,
        })
    }
}
