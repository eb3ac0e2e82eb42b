//! Error types for course enrollment.

use std::time::Duration;

/// Top-level error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Durable record store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Transport-level failures talking to the enrollment backend.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The backend answered, but reported a failure.
    #[error("Server rejected request to {endpoint}: {}", .message.as_deref().unwrap_or("no error message"))]
    Server {
        endpoint: String,
        status: Option<u16>,
        message: Option<String>,
    },

    /// The request never produced a response.
    #[error("Request to {endpoint} failed before a response arrived: {reason}")]
    Network { endpoint: String, reason: String },

    #[error("Request to {endpoint} timed out after {timeout:?}")]
    Timeout { endpoint: String, timeout: Duration },

    #[error("Invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },

    #[error("Failed to build request for {endpoint}: {reason}")]
    Request { endpoint: String, reason: String },
}

/// Token claim verification errors.
#[derive(Debug, thiserror::Error)]
pub enum ClaimsError {
    #[error("Token expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),
}

/// Client-side precondition failures. Block the call entirely.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please fill in the required field: {field}")]
    MissingField { field: &'static str },

    #[error("Session expired. Please fill in your personal information again.")]
    SessionEmailMissing,

    #[error("Please upload your payment screenshot first.")]
    UploadMissing,

    #[error("Course information is missing. Please select a course again.")]
    CourseInfoMissing,

    #[error("Please select an image file (got {content_type}).")]
    UnsupportedFileType { content_type: String },

    #[error("File size must be less than {max_mb} MB (got {size} bytes).")]
    FileTooLarge { size: u64, max_mb: u64 },

    #[error("A submission is already in progress.")]
    SubmissionInProgress,

    #[error("This enrollment has already been submitted.")]
    AlreadySubmitted,
}

/// User-facing failure taxonomy shared by all enrollment steps.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnrollmentError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Call completed; server reported failure.
    #[error("{context} failed: {message}")]
    Server {
        context: &'static str,
        message: String,
    },

    /// Call never completed.
    #[error("{}", CONNECTIVITY_MESSAGE)]
    Network,

    /// Anything else; the underlying message surfaces as-is.
    #[error("{message}")]
    Unexpected { message: String },
}

/// Fixed message shown when a request never reached the server.
pub const CONNECTIVITY_MESSAGE: &str =
    "Network error: unable to reach the server. Please check your connection and try again.";

impl EnrollmentError {
    /// The single alert string to show the user.
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    /// Whether the failure happened before any network call.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Local persistence failures mid-step surface as-is.
impl From<StoreError> for EnrollmentError {
    fn from(err: StoreError) -> Self {
        Self::Unexpected {
            message: err.to_string(),
        }
    }
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
