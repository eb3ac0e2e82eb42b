//! In-process backend double shared by the step tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::api::client::EnrollmentApi;
use crate::api::types::{PaymentRequest, PaymentResponse, PreferencesPayload, SaveResponse};
use crate::error::ApiError;
use crate::profile::model::Identity;

/// How the mock answers every call.
#[derive(Debug, Clone, Default)]
pub(crate) enum Behavior {
    #[default]
    Succeed,
    /// Server answers `{success: false, error}`.
    Reject(String),
    /// No response at all.
    Offline,
    /// Response body could not be understood.
    Garbled,
}

#[derive(Default)]
pub(crate) struct MockApi {
    pub behavior: Mutex<Behavior>,
    pub personal: Mutex<Vec<Identity>>,
    pub preferences: Mutex<Vec<PreferencesPayload>>,
    pub payments: Mutex<Vec<PaymentRequest>>,
    /// Catalog lookups never answer.
    pub stall_catalog: AtomicBool,
}

impl MockApi {
    pub fn with(behavior: Behavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            ..Default::default()
        }
    }

    pub fn set_behavior(&self, behavior: Behavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn calls(&self) -> usize {
        self.personal.lock().unwrap().len()
            + self.preferences.lock().unwrap().len()
            + self.payments.lock().unwrap().len()
    }

    fn outcome(&self, endpoint: &str) -> Result<(), ApiError> {
        match self.behavior.lock().unwrap().clone() {
            Behavior::Succeed => Ok(()),
            Behavior::Reject(message) => Err(ApiError::Server {
                endpoint: endpoint.into(),
                status: Some(200),
                message: Some(message),
            }),
            Behavior::Offline => Err(ApiError::Network {
                endpoint: endpoint.into(),
                reason: "connection refused".into(),
            }),
            Behavior::Garbled => Err(ApiError::InvalidResponse {
                endpoint: endpoint.into(),
                reason: "expected value at line 1 column 1".into(),
            }),
        }
    }
}

fn saved() -> SaveResponse {
    SaveResponse {
        success: true,
        ..Default::default()
    }
}

#[async_trait]
impl EnrollmentApi for MockApi {
    async fn save_personal(&self, identity: &Identity) -> Result<SaveResponse, ApiError> {
        self.personal.lock().unwrap().push(identity.clone());
        self.outcome("/api/personal/save").map(|_| saved())
    }

    async fn save_preferences(
        &self,
        payload: &PreferencesPayload,
    ) -> Result<SaveResponse, ApiError> {
        self.preferences.lock().unwrap().push(payload.clone());
        self.outcome("/api/course/save").map(|_| saved())
    }

    async fn process_payment(&self, request: PaymentRequest) -> Result<PaymentResponse, ApiError> {
        self.payments.lock().unwrap().push(request);
        self.outcome("/api/payment/process").map(|_| PaymentResponse {
            success: true,
            payment_id: Some("p1".into()),
            enrollment_id: Some("e1".into()),
            ..Default::default()
        })
    }

    async fn course_details(&self, title: &str) -> Result<serde_json::Value, ApiError> {
        if self.stall_catalog.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Ok(serde_json::json!({"success": true, "course": {"title": title}}))
    }

    async fn available_courses(&self) -> Result<Vec<String>, ApiError> {
        if self.stall_catalog.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Ok(Vec::new())
    }
}
