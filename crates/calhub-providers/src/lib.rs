//! CalendarProvider trait, provider registry and backend implementations.
//!
//! This crate provides the abstraction layer for calendar backends:
//!
//! - [`CalendarProvider`] - The trait every calendar backend implements
//! - [`ProviderRegistry`] - Explicitly registered providers, in order
//! - [`RawAppointment`] - Backend event data before normalization
//! - [`normalize_appointment`] - Turns raw events into [`Appointment`]s
//! - [`ProviderError`] - Error type shared by all providers
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐
//! │  Google API     │    │  in-memory      │
//! └────────┬────────┘    └────────┬────────┘
//!          │                      │
//!          ▼                      ▼
//! ┌─────────────────┐    ┌─────────────────┐
//! │ GoogleProvider  │    │ LocalProvider   │
//! └────────┬────────┘    └────────┬────────┘
//!          │                      │
//!          │   CalendarProvider   │
//!          └──────────┬───────────┘
//!                     │
//!                     ▼
//!             ┌──────────────────┐
//!             │ ProviderRegistry │
//!             └──────────────────┘
//! ```
//!
//! [`Appointment`]: calhub_core::Appointment

pub mod error;
#[cfg(feature = "google")]
pub mod google;
pub mod local;
pub mod normalize;
pub mod provider;
pub mod registry;

// Re-export main types at crate root
pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use local::{LOCAL_PROVIDER_NAME, LocalProvider};
pub use normalize::{
    RawAppointment, RawEventTime, normalize_appointment, normalize_appointment_in,
    normalize_appointments,
};
pub use provider::{BoxFuture, CalendarProvider, UnavailableProvider, target_calendar};
pub use registry::{ProviderConstructor, ProviderRegistry, ProviderRegistryBuilder, RegistryError};
