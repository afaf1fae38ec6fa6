//! Google Calendar provider configuration.

use std::time::Duration;

use url::Url;

/// Configuration for the Google Calendar provider.
///
/// The provider authenticates with a bearer access token obtained out of
/// band. Tokens are never written anywhere by this crate.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// Account name, used to tell several Google accounts apart.
    ///
    /// Defaults to `"default"`.
    pub account_name: String,

    /// OAuth 2.0 access token sent as `Authorization: Bearer`.
    pub access_token: String,

    /// Base URL of the Calendar API.
    pub api_base: Url,

    /// Calendar IDs to expose. Empty means every calendar of the account.
    pub calendar_ids: Vec<String>,

    /// Request timeout.
    pub timeout: Duration,

    /// Page size requested from list endpoints.
    pub page_size: u32,

    /// User agent string for API requests.
    pub user_agent: String,
}

impl GoogleConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Public Calendar API v3 endpoint.
    pub const DEFAULT_API_BASE: &'static str = "https://www.googleapis.com/calendar/v3";

    /// Creates a configuration for the default account.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            account_name: "default".to_string(),
            access_token: access_token.into(),
            api_base: default_api_base(),
            calendar_ids: Vec::new(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            page_size: 250,
            user_agent: format!("calhub/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Returns the provider name for this account (e.g. `"google:work"`).
    pub fn provider_name(&self) -> String {
        format!("google:{}", self.account_name)
    }

    pub fn with_account_name(mut self, name: impl Into<String>) -> Self {
        self.account_name = name.into();
        self
    }

    /// Points the provider at another API endpoint (proxies, test servers).
    pub fn with_api_base(mut self, api_base: Url) -> Self {
        self.api_base = api_base;
        self
    }

    pub fn with_calendar_ids(mut self, ids: Vec<String>) -> Self {
        self.calendar_ids = ids;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Checks the configuration without contacting Google.
    pub fn validate(&self) -> Result<(), String> {
        if self.account_name.trim().is_empty() {
            return Err("account_name must not be empty".to_string());
        }
        if self.access_token.trim().is_empty() {
            return Err("access_token is required".to_string());
        }
        if !matches!(self.api_base.scheme(), "http" | "https") {
            return Err(format!(
                "api_base must be an http(s) URL, got '{}'",
                self.api_base
            ));
        }
        if self.page_size == 0 || self.page_size > 2500 {
            return Err("page_size must be between 1 and 2500".to_string());
        }
        if self.timeout.is_zero() {
            return Err("timeout must be greater than zero".to_string());
        }
        Ok(())
    }

    /// Returns the API base without a trailing slash.
    pub(crate) fn base(&self) -> &str {
        self.api_base.as_str().trim_end_matches('/')
    }
}

fn default_api_base() -> Url {
    Url::parse(GoogleConfig::DEFAULT_API_BASE).unwrap_or_else(|_| unreachable!())
}
