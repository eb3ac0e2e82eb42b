//! ProfileResolver: finds an identity to pre-populate the personal form.
//!
//! Sources are tried in priority order:
//! 1. `SessionStore`: the `currentUser` record, when tagged `role=student`.
//! 2. `TokenClaims`: verified claims on the session (name/email only).
//! 3. `LegacyScan`: any other stored record exposing `name`/`email` with
//!    `role=student`; merges into fields that are still empty.
//!
//! Resolution never fails. Store errors and malformed records degrade to a
//! partial or empty identity.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::dob::{age_on, normalize_dob};
use super::model::{Identity, UserRecord, non_blank};
use crate::session::{Session, record_keys};

/// Where a pre-filled value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentitySource {
    SessionStore,
    TokenClaims,
    LegacyScan,
}

impl std::fmt::Display for IdentitySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::SessionStore => "session_store",
            Self::TokenClaims => "token_claims",
            Self::LegacyScan => "legacy_scan",
        };
        write!(f, "{s}")
    }
}

/// Outcome of a resolution pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedProfile {
    pub identity: Identity,
    /// Drives the one-time "we filled this in for you" banner.
    pub auto_filled: bool,
    pub sources: Vec<IdentitySource>,
}

pub struct ProfileResolver {
    session: Arc<Session>,
}

impl ProfileResolver {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    pub async fn resolve(&self) -> ResolvedProfile {
        let mut resolved = ResolvedProfile::default();

        self.cleanup_legacy_user().await;

        if let Some(identity) = self.from_session_store().await {
            resolved.identity = identity;
            resolved.sources.push(IdentitySource::SessionStore);
        } else if let Some(identity) = self.from_token_claims().await {
            resolved.identity = identity;
            resolved.sources.push(IdentitySource::TokenClaims);
        }

        if self.merge_legacy_scan(&mut resolved.identity).await {
            resolved.sources.push(IdentitySource::LegacyScan);
        }

        resolved.auto_filled = !resolved.identity.is_empty();
        if resolved.auto_filled {
            info!(sources = ?resolved.sources, "Personal form pre-filled");
        }
        resolved
    }

    /// Full identity from the `currentUser` record.
    async fn from_session_store(&self) -> Option<Identity> {
        let value = match self.session.raw_record(record_keys::CURRENT_USER).await {
            Ok(value) => value?,
            Err(e) => {
                warn!("Failed to read current user record: {}", e);
                return None;
            }
        };
        let Some(record) = UserRecord::from_value(&value) else {
            debug!("Current user record is not an object");
            return None;
        };
        if !record.is_student() {
            debug!(role = ?record.role, "Current user is not a student; not pre-filling");
            return None;
        }
        Some(self.identity_from_record(&record))
    }

    fn identity_from_record(&self, record: &UserRecord) -> Identity {
        let dob = record.dob.as_deref().and_then(normalize_dob);
        let age = record
            .age
            .or_else(|| dob.map(|d| age_on(d, self.session.today())));
        Identity {
            name: non_blank(&record.name).unwrap_or_default().to_string(),
            email: non_blank(&record.email).unwrap_or_default().to_string(),
            phone: non_blank(&record.phone).unwrap_or_default().to_string(),
            age,
            gender: non_blank(&record.gender).unwrap_or_default().to_string(),
            dob,
        }
    }

    /// Name and email from verified claims.
    async fn from_token_claims(&self) -> Option<Identity> {
        let claims = self.session.verified_claims().await?;
        if !claims.is_student() {
            debug!(role = ?claims.role, "Token claims are not a student's; not pre-filling");
            return None;
        }
        Some(Identity {
            name: non_blank(&claims.name).unwrap_or_default().to_string(),
            email: non_blank(&claims.email).unwrap_or_default().to_string(),
            ..Default::default()
        })
    }

    /// Scan remaining records; a student-tagged one fills empty name/email/phone.
    async fn merge_legacy_scan(&self, identity: &mut Identity) -> bool {
        let records = match self.session.records().await {
            Ok(records) => records,
            Err(e) => {
                warn!("Failed to scan stored records: {}", e);
                return false;
            }
        };

        let mut merged = false;
        for (key, value) in records {
            if is_reserved_key(&key) {
                continue;
            }
            let Some(record) = UserRecord::from_value(&value) else {
                continue;
            };
            if !record.has_name_or_email() || !record.is_student() {
                continue;
            }
            debug!(key = %key, "Found student record in legacy scan");
            merged |= fill_if_empty(&mut identity.name, &record.name);
            merged |= fill_if_empty(&mut identity.email, &record.email);
            merged |= fill_if_empty(&mut identity.phone, &record.phone);
        }
        merged
    }

    /// A generic `user` record that is not a student's is stale; drop it.
    async fn cleanup_legacy_user(&self) {
        let value = match self.session.raw_record(record_keys::LEGACY_USER).await {
            Ok(Some(value)) => value,
            Ok(None) => return,
            Err(e) => {
                warn!("Failed to read legacy user record: {}", e);
                return;
            }
        };
        let is_student = UserRecord::from_value(&value).is_some_and(|r| r.is_student());
        if is_student {
            return;
        }
        match self.session.remove_record(record_keys::LEGACY_USER).await {
            Ok(_) => info!("Removed non-student legacy user record"),
            Err(e) => warn!("Failed to remove legacy user record: {}", e),
        }
    }
}

/// Records with a known meaning never feed the legacy scan.
fn is_reserved_key(key: &str) -> bool {
    matches!(
        key,
        record_keys::CURRENT_USER | record_keys::SELECTED_COURSE | record_keys::RECENT_ENROLLMENT
    )
}

fn fill_if_empty(target: &mut String, candidate: &Option<String>) -> bool {
    if !target.trim().is_empty() {
        return false;
    }
    match non_blank(candidate) {
        Some(value) => {
            *target = value.to_string();
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::profile::claims::{ClaimsVerifier, TokenClaims};
    use crate::session::FixedClock;
    use crate::store::{MemoryStore, RecordStore, scopes};

    fn session_on(date: (i32, u32, u32)) -> Arc<Session> {
        let today = NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap();
        Arc::new(Session::new(
            Arc::new(MemoryStore::new()),
            Arc::new(FixedClock::on(today)),
        ))
    }

    async fn put(session: &Session, key: &str, value: serde_json::Value) {
        session.store().set(scopes::LOCAL, key, &value).await.unwrap();
    }

    #[tokio::test]
    async fn student_record_fills_everything_and_computes_age() {
        let session = session_on((2024, 6, 14));
        put(
            &session,
            record_keys::CURRENT_USER,
            serde_json::json!({
                "role": "student",
                "name": "Asha",
                "email": "asha@example.com",
                "phone": "9876543210",
                "gender": "female",
                "dob": "2000-06-15T00:00:00.000Z"
            }),
        )
        .await;

        let resolved = ProfileResolver::new(session).resolve().await;
        assert!(resolved.auto_filled);
        assert_eq!(resolved.sources, vec![IdentitySource::SessionStore]);
        assert_eq!(resolved.identity.age, Some(23));
        assert_eq!(resolved.identity.dob, NaiveDate::from_ymd_opt(2000, 6, 15));
        assert_eq!(resolved.identity.email, "asha@example.com");
        assert!(resolved.identity.validate().is_ok());
    }

    #[tokio::test]
    async fn computed_age_turns_over_on_birthday() {
        let session = session_on((2024, 6, 15));
        put(
            &session,
            record_keys::CURRENT_USER,
            serde_json::json!({"role": "student", "name": "A", "dob": "2000-06-15"}),
        )
        .await;
        let resolved = ProfileResolver::new(session).resolve().await;
        assert_eq!(resolved.identity.age, Some(24));
    }

    #[tokio::test]
    async fn numeric_phone_still_fills_the_form() {
        let session = session_on((2024, 6, 14));
        put(
            &session,
            record_keys::CURRENT_USER,
            serde_json::json!({
                "role": "student",
                "name": "Asha",
                "email": "asha@example.com",
                "phone": 9876543210u64,
                "gender": "female",
                "dob": "2000-06-15"
            }),
        )
        .await;

        let resolved = ProfileResolver::new(session).resolve().await;
        assert!(resolved.auto_filled);
        assert_eq!(resolved.sources, vec![IdentitySource::SessionStore]);
        assert_eq!(resolved.identity.phone, "9876543210");
        assert_eq!(resolved.identity.name, "Asha");
    }

    #[tokio::test]
    async fn stored_age_wins_over_computed() {
        let session = session_on((2024, 6, 15));
        put(
            &session,
            record_keys::CURRENT_USER,
            serde_json::json!({"role": "student", "age": 30, "dob": "2000-06-15"}),
        )
        .await;
        let resolved = ProfileResolver::new(session).resolve().await;
        assert_eq!(resolved.identity.age, Some(30));
    }

    #[tokio::test]
    async fn non_student_record_is_ignored() {
        let session = session_on((2024, 1, 1));
        put(
            &session,
            record_keys::CURRENT_USER,
            serde_json::json!({"role": "teacher", "name": "Mr T", "email": "t@example.com"}),
        )
        .await;
        let resolved = ProfileResolver::new(session).resolve().await;
        assert!(!resolved.auto_filled);
        assert!(resolved.identity.is_empty());
        assert!(resolved.sources.is_empty());
    }

    #[tokio::test]
    async fn malformed_record_degrades_to_empty() {
        let session = session_on((2024, 1, 1));
        put(&session, record_keys::CURRENT_USER, serde_json::json!("{not json")).await;
        let resolved = ProfileResolver::new(session).resolve().await;
        assert_eq!(resolved, ResolvedProfile::default());
    }

    #[tokio::test]
    async fn verified_student_claims_fill_name_and_email_only() {
        use jsonwebtoken::{EncodingKey, Header, encode};

        let session = session_on((2024, 1, 1));
        let secret = secrecy::SecretString::from("resolver-secret".to_string());
        let claims = TokenClaims {
            sub: None,
            name: Some("Ravi".into()),
            email: Some("ravi@example.com".into()),
            role: Some("student".into()),
            exp: chrono::Utc::now().timestamp() + 600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"resolver-secret"),
        )
        .unwrap();
        session
            .authenticate(&token, &ClaimsVerifier::with_hs256(&secret))
            .await
            .unwrap();

        let resolved = ProfileResolver::new(session).resolve().await;
        assert_eq!(resolved.sources, vec![IdentitySource::TokenClaims]);
        assert_eq!(resolved.identity.name, "Ravi");
        assert_eq!(resolved.identity.email, "ravi@example.com");
        assert!(resolved.identity.phone.is_empty());
        assert_eq!(resolved.identity.age, None);
    }

    #[tokio::test]
    async fn legacy_scan_merges_into_empty_fields() {
        let session = session_on((2024, 1, 1));
        put(
            &session,
            record_keys::CURRENT_USER,
            serde_json::json!({"role": "student", "name": "Asha"}),
        )
        .await;
        put(
            &session,
            "profileCache",
            serde_json::json!({"role": "student", "name": "Other", "email": "asha@example.com", "phone": "555"}),
        )
        .await;
        put(
            &session,
            "adminCache",
            serde_json::json!({"role": "admin", "email": "root@example.com"}),
        )
        .await;

        let resolved = ProfileResolver::new(session).resolve().await;
        assert_eq!(
            resolved.sources,
            vec![IdentitySource::SessionStore, IdentitySource::LegacyScan]
        );
        // Already-filled name is not overwritten.
        assert_eq!(resolved.identity.name, "Asha");
        assert_eq!(resolved.identity.email, "asha@example.com");
        assert_eq!(resolved.identity.phone, "555");
    }

    #[tokio::test]
    async fn non_student_legacy_user_is_deleted() {
        let session = session_on((2024, 1, 1));
        put(
            &session,
            record_keys::LEGACY_USER,
            serde_json::json!({"role": "admin", "name": "Root"}),
        )
        .await;

        let resolved = ProfileResolver::new(session.clone()).resolve().await;
        assert!(resolved.identity.is_empty());
        assert!(session.raw_record(record_keys::LEGACY_USER).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn student_legacy_user_is_kept_and_scanned() {
        let session = session_on((2024, 1, 1));
        put(
            &session,
            record_keys::LEGACY_USER,
            serde_json::json!({"role": "student", "name": "Kiran", "email": "k@example.com"}),
        )
        .await;

        let resolved = ProfileResolver::new(session.clone()).resolve().await;
        assert_eq!(resolved.sources, vec![IdentitySource::LegacyScan]);
        assert_eq!(resolved.identity.name, "Kiran");
        assert!(session.raw_record(record_keys::LEGACY_USER).await.unwrap().is_some());
    }
}
