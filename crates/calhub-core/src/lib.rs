//! Core types: calendars, appointments, time conversions, tracing setup

pub mod appointment;
pub mod calendar;
pub mod time;
pub mod tracing;

pub use appointment::{Appointment, AppointmentId, ReminderInfo};
pub use calendar::{AccessRights, Calendar, CalendarKey, Color, ColorParseError};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
