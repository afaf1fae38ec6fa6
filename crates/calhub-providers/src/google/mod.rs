//! Google Calendar provider implementation.
//!
//! [`GoogleProvider`] exposes the calendars of one Google account through
//! the Calendar API v3.
//!
//! # Features
//!
//! - Calendar discovery from the user's calendar list, with access rights
//!   derived from the list entry's role
//! - Event listing with pagination and server-side recurrence expansion
//! - Insert, update (read-modify-write) and delete of single events
//!
//! Authentication uses an OAuth 2.0 access token supplied in the
//! configuration. Obtaining and refreshing that token happens elsewhere.
//!
//! # Example
//!
//! ```ignore
//! use calhub_providers::google::{GoogleConfig, GoogleProvider};
//!
//! let config = GoogleConfig::new(token).with_account_name("work");
//! let provider = GoogleProvider::new(config)?;
//! let calendars = provider.list_calendars().await?;
//! ```

mod client;
mod config;
mod provider;

pub use client::CalendarListEntry;
pub use config::GoogleConfig;
pub use provider::GoogleProvider;
