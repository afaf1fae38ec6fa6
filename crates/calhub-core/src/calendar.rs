//! Calendar types.
//!
//! A [`Calendar`] identifies one calendar inside one backend. Calendars are
//! produced by providers during discovery and are treated as immutable values
//! afterwards: a new discovery pass replaces the list, it never patches an
//! entry in place.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Access rights the authenticated identity has on a calendar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessRights {
    /// Events can be listed but not changed.
    #[default]
    Read,
    /// Events can be created, updated and removed.
    Write,
}

impl AccessRights {
    /// Returns true if appointments in the calendar may be mutated.
    pub fn is_writable(&self) -> bool {
        matches!(self, Self::Write)
    }
}

/// Error returned when a color string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid color '{0}': expected #rrggbb")]
pub struct ColorParseError(String);

/// Display color of a calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().strip_prefix('#').unwrap_or(s.trim());
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(ColorParseError(s.to_string()));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| ColorParseError(s.to_string()))
        };
        Ok(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl TryFrom<String> for Color {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// The globally unique identity of a calendar: owning provider plus the
/// backend-scoped calendar id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CalendarKey {
    pub provider_name: String,
    pub calendar_id: String,
}

impl CalendarKey {
    pub fn new(provider_name: impl Into<String>, calendar_id: impl Into<String>) -> Self {
        Self {
            provider_name: provider_name.into(),
            calendar_id: calendar_id.into(),
        }
    }
}

impl fmt::Display for CalendarKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider_name, self.calendar_id)
    }
}

impl FromStr for CalendarKey {
    type Err = String;

    /// Parses `provider/calendar_id`. The calendar id may itself contain
    /// slashes; only the first one separates the provider name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((provider, calendar)) if !provider.is_empty() && !calendar.is_empty() => {
                Ok(Self::new(provider, calendar))
            }
            _ => Err(format!(
                "invalid calendar reference '{}': expected provider/calendar_id",
                s
            )),
        }
    }
}

/// One calendar within one backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calendar {
    /// Backend-scoped identifier, not unique across providers.
    pub calendar_id: String,
    /// Display name.
    pub name: String,
    /// Description, if the backend provides one.
    pub description: Option<String>,
    /// What the authenticated identity may do with the calendar.
    pub access: AccessRights,
    /// Display color.
    pub color: Option<Color>,
    /// Name of the provider that owns this calendar. Used to route mutations.
    pub provider_name: String,
}

impl Calendar {
    /// Creates a read-only calendar with no description or color.
    pub fn new(
        provider_name: impl Into<String>,
        calendar_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            calendar_id: calendar_id.into(),
            name: name.into(),
            description: None,
            access: AccessRights::Read,
            color: None,
            provider_name: provider_name.into(),
        }
    }

    /// Builder method to set access rights.
    pub fn with_access(mut self, access: AccessRights) -> Self {
        self.access = access;
        self
    }

    /// Builder method to set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builder method to set the color.
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    /// Returns the globally unique key of this calendar.
    pub fn key(&self) -> CalendarKey {
        CalendarKey::new(&self.provider_name, &self.calendar_id)
    }

    pub fn is_writable(&self) -> bool {
        self.access.is_writable()
    }
}
