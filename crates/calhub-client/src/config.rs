//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/calhub/config.toml` by default. `--config` or
//! `CALHUB_CONFIG` points elsewhere.
//!
//! ```toml
//! default_calendar = "local/home"
//!
//! [sync]
//! interval_secs = 60
//! tolerate_partial_fetch = false
//!
//! [logging]
//! level = "warn"
//! format = "compact"
//!
//! [google]
//! account_name = "work"
//! access_token = "env::GOOGLE_ACCESS_TOKEN"
//!
//! [[local.calendars]]
//! id = "home"
//! name = "Home"
//! access = "write"
//! color = "#33aa55"
//! ```
//!
//! `access_token` supports `env::VAR_NAME` references.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use calhub_core::{AccessRights, CalendarKey, Color, TracingConfig, TracingOutputFormat};
use calhub_providers::{LOCAL_PROVIDER_NAME, LocalProvider, ProviderRegistry};
use calhub_server::SyncConfig;

use crate::error::{ClientError, ClientResult};

// ---------------------------------------------------------------------------
// ClientConfig (config.toml)
// ---------------------------------------------------------------------------

/// Configuration for the calhub client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Calendar receiving appointments created without one, as
    /// `provider/calendar_id`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_calendar: Option<String>,

    pub sync: SyncSettings,

    pub logging: LoggingSettings,

    /// Google Calendar settings.
    #[cfg(feature = "google")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google: Option<GoogleSettings>,

    pub local: LocalSettings,
}

/// Sync scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Seconds between sync cycles.
    pub interval_secs: u64,

    /// Skip failing providers instead of failing the whole cycle.
    pub tolerate_partial_fetch: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            tolerate_partial_fetch: false,
        }
    }
}

impl SyncSettings {
    pub fn to_sync_config(&self) -> SyncConfig {
        SyncConfig::new(Duration::from_secs(self.interval_secs))
            .with_tolerate_partial_fetch(self.tolerate_partial_fetch)
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `error`, `warn`, `info`, `debug` or `trace`.
    pub level: String,

    pub format: TracingOutputFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: TracingOutputFormat::Compact,
        }
    }
}

impl LoggingSettings {
    /// Builds the tracing setup. `debug` overrides the configured level.
    pub fn tracing_config(&self, debug: bool) -> ClientResult<TracingConfig> {
        if debug {
            return Ok(TracingConfig::debug().with_format(self.format));
        }
        Ok(TracingConfig::cli()
            .with_level_name(&self.level)?
            .with_format(self.format))
    }
}

/// In-process calendars.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalSettings {
    pub calendars: Vec<LocalCalendarSettings>,
}

/// One local calendar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalCalendarSettings {
    pub id: String,
    pub name: String,
    #[serde(default = "default_local_access")]
    pub access: AccessRights,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

fn default_local_access() -> AccessRights {
    AccessRights::Write
}

impl ClientConfig {
    /// Loads configuration from the default path, or defaults if the file
    /// does not exist.
    pub fn load() -> ClientResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> ClientResult<Self> {
        toml::from_str(content)
            .map_err(|e| ClientError::config(format!("failed to parse config: {}", e)))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calhub")
    }

    /// Parses `default_calendar`.
    pub fn default_calendar_key(&self) -> ClientResult<Option<CalendarKey>> {
        self.default_calendar
            .as_deref()
            .map(|s| s.parse::<CalendarKey>().map_err(ClientError::Config))
            .transpose()
    }

    /// Checks everything that can be checked without network access.
    pub fn validate(&self) -> ClientResult<()> {
        if self.sync.interval_secs == 0 {
            return Err(ClientError::config("sync.interval_secs must be at least 1"));
        }
        self.logging.tracing_config(false)?;
        self.default_calendar_key()?;

        let mut seen = std::collections::HashSet::new();
        for calendar in &self.local.calendars {
            if calendar.id.trim().is_empty() {
                return Err(ClientError::config("local calendar id must not be empty"));
            }
            if !seen.insert(calendar.id.as_str()) {
                return Err(ClientError::config(format!(
                    "local calendar '{}' is defined twice",
                    calendar.id
                )));
            }
        }

        #[cfg(feature = "google")]
        if let Some(ref google) = self.google {
            google
                .to_provider_config()?
                .validate()
                .map_err(|e| ClientError::config(format!("[google] {}", e)))?;
        }

        Ok(())
    }

    /// Registers every configured provider: local calendars first, then
    /// Google. Registration order decides routing fallbacks.
    pub fn build_registry(&self) -> ClientResult<ProviderRegistry> {
        let mut builder = ProviderRegistry::builder();

        if !self.local.calendars.is_empty() {
            let local = LocalProvider::new(LOCAL_PROVIDER_NAME);
            for calendar in &self.local.calendars {
                local.add_calendar(&calendar.id, &calendar.name, calendar.access, calendar.color);
            }
            builder = builder.register_instance(Arc::new(local));
        }

        #[cfg(feature = "google")]
        if let Some(ref google) = self.google {
            let config = google.to_provider_config()?;
            let name = config.provider_name();
            builder = builder.register(name, move || {
                calhub_providers::google::GoogleProvider::new(config)
                    .map(|p| Arc::new(p) as Arc<dyn calhub_providers::CalendarProvider>)
            });
        }

        if builder.is_empty() {
            tracing::warn!("no calendar providers configured");
        }
        Ok(builder.build()?)
    }
}

// ---------------------------------------------------------------------------
// GoogleSettings
// ---------------------------------------------------------------------------

/// Google Calendar provider settings.
#[cfg(feature = "google")]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    /// Distinguishes several Google accounts; the provider is named
    /// `google:<account_name>`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,

    /// OAuth access token (supports `env::` references).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Calendar IDs to expose; empty means all.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub calendar_ids: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Alternative API endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

#[cfg(feature = "google")]
impl GoogleSettings {
    /// Converts to provider configuration, resolving the access token.
    pub fn to_provider_config(&self) -> ClientResult<calhub_providers::google::GoogleConfig> {
        use calhub_providers::google::GoogleConfig;

        let raw_token = self.access_token.as_deref().ok_or_else(|| {
            ClientError::config(format!(
                "Google access token not found. Add to {}:\n  \
                 [google]\n  \
                 access_token = \"env::GOOGLE_ACCESS_TOKEN\"",
                ClientConfig::default_path().display()
            ))
        })?;
        let token = crate::secret::resolve(raw_token)
            .map_err(|e| ClientError::config(format!("failed to resolve access_token: {}", e)))?;

        let mut config = GoogleConfig::new(token).with_calendar_ids(self.calendar_ids.clone());
        if let Some(ref name) = self.account_name {
            config = config.with_account_name(name);
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Some(ref base) = self.api_base {
            let url = base.parse::<url::Url>().map_err(|e| {
                ClientError::config(format!("invalid google.api_base '{}': {}", base, e))
            })?;
            config = config.with_api_base(url);
        }
        Ok(config)
    }
}
