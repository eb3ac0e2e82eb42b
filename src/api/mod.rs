//! Enrollment backend: wire types, the HTTP client and the course catalog check.

pub mod catalog;
pub mod client;
pub mod types;

pub use catalog::{CourseAvailability, KNOWN_COURSE_TITLES, verify_course};
pub use client::{EnrollmentApi, HttpEnrollmentApi};
pub use types::{PaymentRequest, PaymentResponse, PreferencesPayload, SaveResponse};
