//! Session: the explicit bundle of client state passed through every step.
//!
//! Wraps the durable record store (selected course, current user, most recent
//! enrollment), the session cookies, the verified token claims and the clock.
//! Records are read and written wholesale.

pub mod clock;
pub mod cookie;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::enrollment::model::{CourseSelection, EnrollmentResult};
use crate::error::{ClaimsError, StoreError};
use crate::profile::claims::{ClaimsVerifier, TokenClaims};
use crate::store::{RecordStore, scopes};

pub use clock::{Clock, SystemClock};
#[cfg(test)]
pub(crate) use clock::FixedClock;
pub use cookie::{Cookie, SESSION_EMAIL_COOKIE};

/// Keys of the durable records.
pub mod record_keys {
    /// Course chosen in the catalog, kept so a reload does not lose it.
    pub const SELECTED_COURSE: &str = "selectedCourse";
    /// Profile of the signed-in user.
    pub const CURRENT_USER: &str = "currentUser";
    /// Confirmation of the last successful enrollment.
    pub const RECENT_ENROLLMENT: &str = "recentEnrollment";
    /// Generic user record written by older releases.
    pub const LEGACY_USER: &str = "user";
}

/// Client session state.
pub struct Session {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    claims: RwLock<Option<TokenClaims>>,
}

impl Session {
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            claims: RwLock::new(None),
        }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    // ── Cookies ─────────────────────────────────────────────────────

    pub async fn set_cookie(&self, cookie: &Cookie) -> Result<(), StoreError> {
        let value =
            serde_json::to_value(cookie).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.store.set(scopes::COOKIE, &cookie.name, &value).await
    }

    /// Read a cookie. Expired cookies are removed and read as absent.
    pub async fn cookie(&self, name: &str) -> Result<Option<Cookie>, StoreError> {
        let Some(value) = self.store.get(scopes::COOKIE, name).await? else {
            return Ok(None);
        };
        let Ok(cookie) = serde_json::from_value::<Cookie>(value) else {
            warn!(name, "Discarding unreadable cookie");
            self.store.remove(scopes::COOKIE, name).await?;
            return Ok(None);
        };
        if cookie.is_expired(self.now()) {
            debug!(name, "Cookie expired");
            self.store.remove(scopes::COOKIE, name).await?;
            return Ok(None);
        }
        Ok(Some(cookie))
    }

    /// Write the `student_email` cookie, site-wide, living `lifetime`.
    pub async fn set_session_email(
        &self,
        email: &str,
        lifetime: Duration,
    ) -> Result<Cookie, StoreError> {
        let cookie = Cookie::site_wide(SESSION_EMAIL_COOKIE, email, lifetime, self.now());
        self.set_cookie(&cookie).await?;
        debug!(email, expires_at = %cookie.expires_at, "Session email cookie set");
        Ok(cookie)
    }

    /// The session email, if the cookie exists and has not expired.
    ///
    /// Store failures are logged and read as absent.
    pub async fn session_email(&self) -> Option<String> {
        match self.cookie(SESSION_EMAIL_COOKIE).await {
            Ok(cookie) => cookie.map(|c| c.value).filter(|v| !v.trim().is_empty()),
            Err(e) => {
                warn!("Failed to read session email cookie: {}", e);
                None
            }
        }
    }

    /// Session email from the cookie, falling back to inbound navigation state.
    pub async fn resolve_email(&self, inbound: Option<&str>) -> Option<String> {
        if let Some(email) = self.session_email().await {
            return Some(email);
        }
        inbound
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string)
    }

    // ── Durable records ─────────────────────────────────────────────

    /// Read and parse a record. Unparseable records read as absent.
    pub async fn load_record<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = match self.store.get(scopes::LOCAL, key).await {
            Ok(Some(value)) => value,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, "Failed to read record: {}", e);
                return None;
            }
        };
        match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(key, "Ignoring unparseable record: {}", e);
                None
            }
        }
    }

    pub async fn save_record<T: Serialize>(&self, key: &str, record: &T) -> Result<(), StoreError> {
        let value =
            serde_json::to_value(record).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.store.set(scopes::LOCAL, key, &value).await
    }

    pub async fn remove_record(&self, key: &str) -> Result<bool, StoreError> {
        self.store.remove(scopes::LOCAL, key).await
    }

    /// Raw record value, for callers that probe its shape.
    pub async fn raw_record(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        self.store.get(scopes::LOCAL, key).await
    }

    /// Every durable record, ordered by key.
    pub async fn records(&self) -> Result<Vec<(String, serde_json::Value)>, StoreError> {
        self.store.entries(scopes::LOCAL).await
    }

    pub async fn selected_course(&self) -> Option<CourseSelection> {
        self.load_record(record_keys::SELECTED_COURSE).await
    }

    pub async fn set_selected_course(&self, course: &CourseSelection) -> Result<(), StoreError> {
        self.save_record(record_keys::SELECTED_COURSE, course).await
    }

    pub async fn recent_enrollment(&self) -> Option<EnrollmentResult> {
        self.load_record(record_keys::RECENT_ENROLLMENT).await
    }

    pub async fn set_recent_enrollment(&self, result: &EnrollmentResult) -> Result<(), StoreError> {
        self.save_record(record_keys::RECENT_ENROLLMENT, result).await
    }

    // ── Claims ──────────────────────────────────────────────────────

    /// Verify an auth token and keep its claims for this session.
    pub async fn authenticate(
        &self,
        token: &str,
        verifier: &ClaimsVerifier,
    ) -> Result<TokenClaims, ClaimsError> {
        let claims = verifier.verify(token)?;
        *self.claims.write().await = Some(claims.clone());
        Ok(claims)
    }

    pub async fn verified_claims(&self) -> Option<TokenClaims> {
        self.claims.read().await.clone()
    }
}
