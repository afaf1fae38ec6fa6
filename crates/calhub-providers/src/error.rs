//! Error types for calendar provider operations.
//!
//! Every provider operation returns [`ProviderResult`]. An `Err` is the
//! uniform "backend unavailable or refused" outcome: the catalog logs it and
//! carries on with the other providers, so it never needs to know anything
//! backend-specific about the failure.

use std::fmt;
use thiserror::Error;

/// The category of a provider error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// Credentials are missing, invalid or expired.
    AuthenticationFailed,
    /// The identity lacks permission for the resource.
    AuthorizationFailed,
    /// Connection failed, timed out, DNS resolution failed, etc.
    NetworkError,
    /// Too many requests.
    RateLimited,
    /// The backend answered with a 5xx status.
    ServerError,
    /// The response could not be parsed.
    InvalidResponse,
    /// Calendar or appointment does not exist on the backend.
    NotFound,
    /// The backend rejected the request as malformed.
    BadRequest,
    /// The provider is misconfigured. Raised at construction time.
    ConfigurationError,
    /// A write was attempted on a read-only calendar.
    ReadOnly,
    /// The operation is not supported by this provider.
    Unsupported,
    /// Unexpected provider state.
    InternalError,
}

impl ProviderErrorCode {
    /// Returns true if the backend could not be reached or could not serve
    /// the request at this time. Such errors abort a whole fetch, while the
    /// others only concern a single calendar or appointment.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError
                | Self::RateLimited
                | Self::ServerError
                | Self::AuthenticationFailed
                | Self::InvalidResponse
        )
    }

    /// Returns true if retrying the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError | Self::RateLimited | Self::ServerError
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication_failed",
            Self::AuthorizationFailed => "authorization_failed",
            Self::NetworkError => "network_error",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::ConfigurationError => "configuration_error",
            Self::ReadOnly => "read_only",
            Self::Unsupported => "unsupported",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error that occurred while talking to a calendar backend.
#[derive(Debug, Error)]
pub struct ProviderError {
    code: ProviderErrorCode,
    message: String,
    /// The provider that produced the error.
    provider: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider: None,
            source: None,
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthenticationFailed, message)
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthorizationFailed, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::RateLimited, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ServerError, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::BadRequest, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ConfigurationError, message)
    }

    pub fn read_only(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ReadOnly, message)
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::Unsupported, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InternalError, message)
    }

    /// Sets the provider name for this error.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the underlying cause.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    pub fn is_unavailable(&self) -> bool {
        self.code.is_unavailable()
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    /// Returns a copy without the source chain, tagged with `provider`.
    pub fn detached(&self, provider: &str) -> Self {
        Self::new(self.code, self.message.clone()).with_provider(provider)
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref provider) = self.provider {
            write!(f, "[{}] ", provider)?;
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A specialized Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_classification() {
        assert!(ProviderErrorCode::NetworkError.is_unavailable());
        assert!(ProviderErrorCode::ServerError.is_unavailable());
        assert!(ProviderErrorCode::AuthenticationFailed.is_unavailable());
        assert!(!ProviderErrorCode::NotFound.is_unavailable());
        assert!(!ProviderErrorCode::ReadOnly.is_unavailable());
    }

    #[test]
    fn retryable_classification() {
        assert!(ProviderErrorCode::RateLimited.is_retryable());
        assert!(!ProviderErrorCode::AuthenticationFailed.is_retryable());
        assert!(!ProviderErrorCode::ConfigurationError.is_retryable());
    }

    #[test]
    fn display_includes_provider_and_code() {
        let err = ProviderError::network("connection refused").with_provider("google:work");
        let display = err.to_string();
        assert_eq!(display, "[google:work] network_error: connection refused");
    }

    #[test]
    fn with_source_keeps_chain() {
        use std::error::Error;
        let err = ProviderError::internal("lock poisoned").with_source(std::io::Error::other("x"));
        assert!(err.source().is_some());

        let copy = err.detached("local");
        assert!(copy.source().is_none());
        assert_eq!(copy.provider(), Some("local"));
        assert_eq!(copy.code(), ProviderErrorCode::InternalError);
    }
}
