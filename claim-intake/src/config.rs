use std::time::Duration;

const ENV_BASE_URL: &str = "CLAIMS_API_BASE_URL";
const ENV_TIMEOUT_SECS: &str = "CLAIMS_API_TIMEOUT_SECS";
const ENV_TOKEN: &str = "CLAIMS_API_TOKEN";
pub const DEFAULT_BASE_URL: &str = "https://pry-tesis-be.azurewebsites.net";

/// Claims backend connection settings
#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
    pub base_url: String,
    /// Request timeout; `None` keeps the transport default
    pub timeout: Option<Duration>,
    /// Bearer token forwarded from the identity provider, if the backend wants one
    pub access_token: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
            access_token: None,
        }
    }
}

impl BackendConfig {
    /// Load from `CLAIMS_API_BASE_URL`, `CLAIMS_API_TIMEOUT_SECS` and
    /// `CLAIMS_API_TOKEN`, falling back to defaults for anything unset.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let base_url = lookup(ENV_BASE_URL)
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout = lookup(ENV_TIMEOUT_SECS)
            .and_then(|secs| secs.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let access_token = lookup(ENV_TOKEN).filter(|token| !token.is_empty());

        Self {
            base_url,
            timeout,
            access_token,
        }
    }

    /// Absolute URL of an API path such as `casos/`.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
