//! Configuration types.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Enrollment client configuration.
#[derive(Debug, Clone)]
pub struct EnrollConfig {
    /// Base URL of the enrollment REST backend, without trailing slash.
    pub api_base_url: String,
    /// Upper bound for the payment submission call.
    pub payment_timeout: Duration,
    /// Largest accepted payment screenshot, in bytes.
    pub max_screenshot_bytes: u64,
    /// Minimum latency before a selected screenshot's preview is decoded.
    pub upload_delay: Duration,
    /// How long the success confirmation stays up before redirecting.
    pub redirect_delay: Duration,
    /// Lifetime of the `student_email` session cookie.
    pub session_cookie_lifetime: Duration,
    /// Path to the durable record database.
    pub db_path: String,
    /// HS256 secret for verifying auth token claims. Claims are ignored when unset.
    pub claims_secret: Option<SecretString>,
    /// Whether to check the course against the catalog before paying.
    pub verify_course: bool,
    /// Upper bound for each catalog lookup made while verifying the course.
    pub verify_timeout: Duration,
}

impl Default for EnrollConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000/api".to_string(),
            payment_timeout: Duration::from_secs(30),
            max_screenshot_bytes: 5 * 1024 * 1024, // 5 MB
            upload_delay: Duration::from_millis(1500),
            redirect_delay: Duration::from_secs(3),
            session_cookie_lifetime: Duration::from_secs(24 * 60 * 60), // 24 hours
            db_path: "./data/course-enroll.db".to_string(),
            claims_secret: None,
            verify_course: true,
            verify_timeout: Duration::from_secs(5),
        }
    }
}

impl EnrollConfig {
    /// Build from `ENROLL_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let api_base_url = std::env::var("ENROLL_API_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_base_url);

        let payment_timeout = env_parse::<u64>("ENROLL_PAYMENT_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.payment_timeout);

        let max_screenshot_bytes =
            env_parse::<u64>("ENROLL_MAX_SCREENSHOT_BYTES")?.unwrap_or(defaults.max_screenshot_bytes);

        let upload_delay = env_parse::<u64>("ENROLL_UPLOAD_DELAY_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.upload_delay);

        let redirect_delay = env_parse::<u64>("ENROLL_REDIRECT_DELAY_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.redirect_delay);

        let session_cookie_lifetime = env_parse::<u64>("ENROLL_COOKIE_HOURS")?
            .map(|h| Duration::from_secs(h * 60 * 60))
            .unwrap_or(defaults.session_cookie_lifetime);

        let db_path = std::env::var("ENROLL_DB_PATH").unwrap_or(defaults.db_path);

        let claims_secret = std::env::var("ENROLL_CLAIMS_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .map(SecretString::from);

        let verify_course =
            env_parse::<bool>("ENROLL_VERIFY_COURSE")?.unwrap_or(defaults.verify_course);

        let verify_timeout = env_parse::<u64>("ENROLL_VERIFY_TIMEOUT_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.verify_timeout);

        Ok(Self {
            api_base_url,
            payment_timeout,
            max_screenshot_bytes,
            upload_delay,
            redirect_delay,
            session_cookie_lifetime,
            db_path,
            claims_secret,
            verify_course,
            verify_timeout,
        })
    }
}

fn env_parse<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{raw:?}: {e}"),
            }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_enrollment_contract() {
        let config = EnrollConfig::default();
        assert_eq!(config.payment_timeout, Duration::from_secs(30));
        assert_eq!(config.max_screenshot_bytes, 5_242_880);
        assert_eq!(config.redirect_delay, Duration::from_secs(3));
        assert_eq!(config.session_cookie_lifetime, Duration::from_secs(86_400));
        assert!(config.claims_secret.is_none());
        assert!(config.verify_timeout < config.payment_timeout);
    }

    #[test]
    fn env_parse_rejects_garbage() {
        // SAFETY: This test runs in isolation; no other test reads this variable.
        unsafe { std::env::set_var("ENROLL_TEST_GARBAGE_NUMBER", "twelve") };
        let result = env_parse::<u64>("ENROLL_TEST_GARBAGE_NUMBER");
        unsafe { std::env::remove_var("ENROLL_TEST_GARBAGE_NUMBER") };
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn env_parse_missing_is_none() {
        // SAFETY: This test runs in isolation; no other test reads this variable.
        unsafe { std::env::remove_var("ENROLL_TEST_UNSET_NUMBER") };
        assert_eq!(env_parse::<u64>("ENROLL_TEST_UNSET_NUMBER").unwrap(), None);
    }
}
