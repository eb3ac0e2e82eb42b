//! The three-step enrollment workflow: personal info, course preferences,
//! payment. Each step takes the shared [`Session`](crate::session::Session)
//! and the [`NavState`] handed over by the previous step.

pub mod course;
pub mod model;
pub mod payment;
pub mod personal;
pub mod preferences;
pub mod state;
pub mod submitter;
pub mod timer;
pub mod upload;

#[cfg(test)]
pub(crate) mod testing;

pub use model::{CourseSelection, EnrollmentResult, NavState, PreferencesForm};
pub use payment::PaymentUploadStep;
pub use personal::PersonalInfoStep;
pub use preferences::CoursePreferencesStep;
pub use state::{EnrollmentStep, Navigation};
pub use submitter::{EnrollmentSubmitter, classify};
pub use upload::{PaymentProof, Preview, UploadPhase, UploadState};
