use std::time::Duration;

use tracing::{info, warn};
use url::Url;

/// Preference key holding an explicit API base URL.
pub const BASE_URL_PREFERENCE: &str = "api_base_url";
/// Environment variable consulted when no preference is saved.
pub const BASE_URL_ENV: &str = "DUGONG_API_URL";
const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Connection settings for the detection API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: Url,
    pub timeout: Duration,
    pub login_timeout: Duration,
    pub retry_attempts: u32,
}

impl ApiConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: Duration::from_secs(120),
            login_timeout: Duration::from_secs(10),
            retry_attempts: 3,
        }
    }

    /// Pick the base URL: saved preference, then environment, then the
    /// local development backend.
    pub fn resolve(preference: Option<&str>, env: Option<&str>) -> Self {
        let candidates = [
            ("preference", preference),
            ("environment", env),
        ];

        for (source, value) in candidates {
            let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
                continue;
            };
            match parse_base_url(raw) {
                Ok(url) => {
                    info!("Using API base URL from {}: {}", source, url);
                    return Self::new(url);
                }
                Err(e) => warn!("Ignoring API base URL from {}: {}", source, e),
            }
        }

        info!("Using default API base URL: {}", DEFAULT_BASE_URL);
        Self::new(Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"))
    }

    /// Full URL for an endpoint path such as `/api/session-status/abc`.
    pub fn endpoint(&self, path: &str) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{}/{}", base, path)
    }
}

/// Validate a user-supplied base URL. Only http and https are accepted.
pub fn parse_base_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| format!("Invalid URL '{}': {}", raw, e))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("Unsupported URL scheme '{}' in '{}'", other, raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preference_wins_over_environment() {
        let config =
            ApiConfig::resolve(Some("https://dugong.example.org"), Some("http://env:9000"));
        assert_eq!(config.base_url.as_str(), "https://dugong.example.org/");
    }

    #[test]
    fn test_invalid_preference_falls_through() {
        let config = ApiConfig::resolve(Some("not a url"), Some("http://env:9000"));
        assert_eq!(config.base_url.as_str(), "http://env:9000/");

        let config = ApiConfig::resolve(Some("ftp://files.example.org"), None);
        assert_eq!(config.base_url.as_str(), "http://localhost:8000/");
    }

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let config = ApiConfig::resolve(Some("http://localhost:8000/"), None);
        assert_eq!(
            config.endpoint("/api/session-status/s1"),
            "http://localhost:8000/api/session-status/s1"
        );
        assert_eq!(config.endpoint("auth/login"), "http://localhost:8000/auth/login");
    }

    #[test]
    fn test_defaults() {
        let config = ApiConfig::resolve(None, None);
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert_eq!(config.login_timeout, Duration::from_secs(10));
        assert_eq!(config.retry_attempts, 3);
    }
}
