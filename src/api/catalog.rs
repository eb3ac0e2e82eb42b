//! Best-effort check that a course title is one the backend sells.
//!
//! Never blocks a submission: every outcome, including backend failures,
//! is only logged by the caller.

use tracing::{debug, warn};

use super::client::EnrollmentApi;

/// Titles the backend has historically accepted as `course_track`.
pub const KNOWN_COURSE_TITLES: &[&str] = &[
    "Web Development",
    "Data Science",
    "Mobile App Development",
    "UI/UX Design",
    "Cloud Computing",
    "Cyber Security",
    "Machine Learning",
    "Digital Marketing",
];

/// Where a course title was confirmed, if anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CourseAvailability {
    /// `course-details` returned the course.
    Confirmed,
    /// Found in the `available-courses` listing.
    Listed,
    /// Only matched the built-in title list.
    KnownTitle,
    /// Not found anywhere. Carries the titles that were on offer.
    Unknown { available: Vec<String> },
}

impl CourseAvailability {
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown { .. })
    }
}

/// Look the title up via course details, then the course listing, then the
/// built-in list. Title comparison ignores case and surrounding whitespace.
pub async fn verify_course(api: &dyn EnrollmentApi, title: &str) -> CourseAvailability {
    match api.course_details(title).await {
        Ok(_) => return CourseAvailability::Confirmed,
        Err(e) => debug!(course = title, "Course details unavailable: {}", e),
    }

    let mut available = Vec::new();
    match api.available_courses().await {
        Ok(titles) => {
            if titles.iter().any(|t| same_title(t, title)) {
                return CourseAvailability::Listed;
            }
            available = titles;
        }
        Err(e) => warn!(course = title, "Course listing unavailable: {}", e),
    }

    if KNOWN_COURSE_TITLES.iter().any(|t| same_title(t, title)) {
        return CourseAvailability::KnownTitle;
    }

    if available.is_empty() {
        available = KNOWN_COURSE_TITLES.iter().map(|t| t.to_string()).collect();
    }
    CourseAvailability::Unknown { available }
}

fn same_title(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}
