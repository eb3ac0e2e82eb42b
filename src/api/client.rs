//! REST client for the enrollment backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::types::{PaymentRequest, PaymentResponse, PreferencesPayload, SaveResponse, course_titles};
use crate::config::EnrollConfig;
use crate::error::ApiError;
use crate::profile::model::Identity;

/// The backend calls the enrollment workflow depends on.
///
/// Implementations return `Ok` only when the backend reported success;
/// `success: false` bodies surface as [`ApiError::Server`].
#[async_trait]
pub trait EnrollmentApi: Send + Sync {
    /// `POST /personal/save`
    async fn save_personal(&self, identity: &Identity) -> Result<SaveResponse, ApiError>;

    /// `POST /course/save`
    async fn save_preferences(
        &self,
        payload: &PreferencesPayload,
    ) -> Result<SaveResponse, ApiError>;

    /// `POST /payment/process` (multipart)
    async fn process_payment(&self, request: PaymentRequest) -> Result<PaymentResponse, ApiError>;

    /// `GET /payment/course-details/{title}`
    async fn course_details(&self, title: &str) -> Result<serde_json::Value, ApiError>;

    /// `GET /payment/available-courses`, reduced to titles.
    async fn available_courses(&self) -> Result<Vec<String>, ApiError>;
}

/// Response bodies that carry a success flag and an optional error.
trait Outcome {
    fn succeeded(&self) -> bool;
    fn failure_message(&self) -> Option<String>;
}

impl Outcome for SaveResponse {
    fn succeeded(&self) -> bool {
        self.success
    }
    fn failure_message(&self) -> Option<String> {
        self.error.clone().or_else(|| self.message.clone())
    }
}

impl Outcome for PaymentResponse {
    fn succeeded(&self) -> bool {
        self.success
    }
    fn failure_message(&self) -> Option<String> {
        self.error.clone().or_else(|| self.message.clone())
    }
}

/// `reqwest`-backed [`EnrollmentApi`].
pub struct HttpEnrollmentApi {
    client: Client,
    base_url: Url,
    payment_timeout: Duration,
    verify_timeout: Duration,
}

impl HttpEnrollmentApi {
    pub fn new(config: &EnrollConfig) -> Result<Self, ApiError> {
        let base_url = Url::parse(&config.api_base_url).map_err(|e| ApiError::Request {
            endpoint: config.api_base_url.clone(),
            reason: format!("invalid base URL: {e}"),
        })?;

        let client = Client::builder()
            .user_agent(concat!("course-enroll/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Request {
                endpoint: config.api_base_url.clone(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url,
            payment_timeout: config.payment_timeout,
            verify_timeout: config.verify_timeout,
        })
    }

    /// Append path segments to the base URL, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Request {
                endpoint: self.base_url.to_string(),
                reason: "base URL cannot take path segments".into(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn post_json<B, R>(&self, segments: &[&str], body: &B) -> Result<R, ApiError>
    where
        B: serde::Serialize + Sync,
        R: DeserializeOwned + Outcome,
    {
        let url = self.url(segments)?;
        let endpoint = url.path().to_string();
        debug!(endpoint = %endpoint, "POST");

        let resp = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| send_error(&endpoint, e, None))?;

        read_outcome(&endpoint, resp).await
    }
}

#[async_trait]
impl EnrollmentApi for HttpEnrollmentApi {
    async fn save_personal(&self, identity: &Identity) -> Result<SaveResponse, ApiError> {
        self.post_json(&["personal", "save"], identity).await
    }

    async fn save_preferences(
        &self,
        payload: &PreferencesPayload,
    ) -> Result<SaveResponse, ApiError> {
        self.post_json(&["course", "save"], payload).await
    }

    async fn process_payment(&self, request: PaymentRequest) -> Result<PaymentResponse, ApiError> {
        let url = self.url(&["payment", "process"])?;
        let endpoint = url.path().to_string();

        let PaymentRequest {
            screenshot,
            student_email,
            course_track,
            amount,
        } = request;

        let part = Part::bytes(screenshot.bytes)
            .file_name(screenshot.file_name.clone())
            .mime_str(&screenshot.content_type)
            .map_err(|e| ApiError::Request {
                endpoint: endpoint.clone(),
                reason: format!("invalid screenshot content type: {e}"),
            })?;

        let form = Form::new()
            .part("screenshot", part)
            .text("student_email", student_email)
            .text("course_track", course_track.clone())
            .text("amount", amount.clone());

        info!(
            course = %course_track,
            amount = %amount,
            file = %screenshot.file_name,
            "Submitting payment"
        );

        let resp = self
            .client
            .post(url)
            .multipart(form)
            .timeout(self.payment_timeout)
            .send()
            .await
            .map_err(|e| send_error(&endpoint, e, Some(self.payment_timeout)))?;

        read_outcome(&endpoint, resp).await
    }

    async fn course_details(&self, title: &str) -> Result<serde_json::Value, ApiError> {
        let url = self.url(&["payment", "course-details", title])?;
        let endpoint = url.path().to_string();

        let resp = self
            .client
            .get(url)
            .timeout(self.verify_timeout)
            .send()
            .await
            .map_err(|e| send_error(&endpoint, e, Some(self.verify_timeout)))?;

        let status = resp.status();
        let body: serde_json::Value = resp.json().await.map_err(|e| ApiError::InvalidResponse {
            endpoint: endpoint.clone(),
            reason: e.to_string(),
        })?;

        let flagged_failure = body.get("success").and_then(|v| v.as_bool()) == Some(false);
        if !status.is_success() || flagged_failure {
            return Err(ApiError::Server {
                endpoint,
                status: Some(status.as_u16()),
                message: error_field(&body),
            });
        }
        Ok(body)
    }

    async fn available_courses(&self) -> Result<Vec<String>, ApiError> {
        let url = self.url(&["payment", "available-courses"])?;
        let endpoint = url.path().to_string();

        let resp = self
            .client
            .get(url)
            .timeout(self.verify_timeout)
            .send()
            .await
            .map_err(|e| send_error(&endpoint, e, Some(self.verify_timeout)))?;

        let status = resp.status();
        let body: serde_json::Value = resp.json().await.map_err(|e| ApiError::InvalidResponse {
            endpoint: endpoint.clone(),
            reason: e.to_string(),
        })?;
        if !status.is_success() {
            return Err(ApiError::Server {
                endpoint,
                status: Some(status.as_u16()),
                message: error_field(&body),
            });
        }
        Ok(course_titles(&body))
    }
}

/// Classify a failure to get any response at all.
fn send_error(endpoint: &str, e: reqwest::Error, timeout: Option<Duration>) -> ApiError {
    if e.is_timeout() {
        return ApiError::Timeout {
            endpoint: endpoint.to_string(),
            timeout: timeout.unwrap_or_default(),
        };
    }
    if e.is_builder() {
        return ApiError::Request {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        };
    }
    ApiError::Network {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    }
}

/// Read `{success, error?}`-style bodies, mapping failure to `ApiError::Server`.
async fn read_outcome<R>(endpoint: &str, resp: Response) -> Result<R, ApiError>
where
    R: DeserializeOwned + Outcome,
{
    let status = resp.status();
    let text = resp.text().await.map_err(|e| ApiError::InvalidResponse {
        endpoint: endpoint.to_string(),
        reason: format!("failed to read body: {e}"),
    })?;

    if !status.is_success() {
        let message = serde_json::from_str::<serde_json::Value>(&text)
            .ok()
            .and_then(|body| error_field(&body))
            .or_else(|| status.canonical_reason().map(String::from));
        warn!(endpoint, status = status.as_u16(), "Backend returned an error status");
        return Err(ApiError::Server {
            endpoint: endpoint.to_string(),
            status: Some(status.as_u16()),
            message,
        });
    }

    let outcome: R = serde_json::from_str(&text).map_err(|e| ApiError::InvalidResponse {
        endpoint: endpoint.to_string(),
        reason: format!("{e} (body: {text})"),
    })?;

    if !outcome.succeeded() {
        return Err(ApiError::Server {
            endpoint: endpoint.to_string(),
            status: Some(status.as_u16()),
            message: outcome.failure_message(),
        });
    }
    Ok(outcome)
}

/// The `error` (or `message`) string of a JSON error body.
fn error_field(body: &serde_json::Value) -> Option<String> {
    body.get("error")
        .or_else(|| body.get("message"))
        .and_then(|v| v.as_str())
        .map(String::from)
}
