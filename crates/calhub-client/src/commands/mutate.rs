//! `calhub add` and `calhub remove`

use chrono::{DateTime, Duration, NaiveDate, Utc};

use calhub_core::{Appointment, AppointmentId, time};

use super::{Session, print_json};
use crate::cli::AddArgs;
use crate::commands::appointments::format_appointment;
use crate::error::{ClientError, ClientResult};

pub async fn add(session: &Session, args: AddArgs, json: bool) -> ClientResult<()> {
    let mut appointment = appointment_from_args(&args)?;
    if let Some(ref key) = args.calendar {
        appointment.calendar = Some(session.find_calendar_str(key).await?);
    }

    session.load().await?;
    let created = session.hub().create(appointment).await?;

    if json {
        return print_json(&created);
    }
    println!("Created {}", format_appointment(&created));
    Ok(())
}

pub async fn remove(session: &Session, id: &str, json: bool) -> ClientResult<()> {
    session.load().await?;
    let id = AppointmentId::from(id);
    session.hub().remove(&id).await?;

    if json {
        return print_json(&serde_json::json!({ "removed": id }));
    }
    println!("Removed {}", id);
    Ok(())
}

/// Builds the appointment described on the command line, without calendar.
pub(crate) fn appointment_from_args(args: &AddArgs) -> ClientResult<Appointment> {
    let (start, end) = if args.all_day {
        let first = parse_day(&args.start)?;
        let end = match args.end {
            Some(ref end) => parse_day(end)?,
            None => first + chrono::Days::new(1),
        };
        (time::local_midnight(first), time::local_midnight(end))
    } else {
        let start = parse_instant(&args.start)?;
        let end = match args.end {
            Some(ref end) => parse_instant(end)?,
            None => {
                if args.duration <= 0 {
                    return Err(ClientError::InvalidArgument(
                        "--duration must be positive".to_string(),
                    ));
                }
                start + Duration::minutes(args.duration)
            }
        };
        (start, end)
    };

    if end <= start {
        return Err(ClientError::InvalidArgument(
            "end must be after start".to_string(),
        ));
    }

    let mut appointment = Appointment::new(AppointmentId::generate(), start, end)
        .with_subject(&args.subject)
        .with_all_day(args.all_day)
        .with_label(args.label);
    if let Some(ref location) = args.location {
        appointment = appointment.with_location(location);
    }
    if let Some(ref description) = args.description {
        appointment = appointment.with_description(description);
    }
    Ok(appointment)
}

fn parse_instant(s: &str) -> ClientResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ClientError::InvalidArgument(format!("invalid time '{}': {}", s, e)))
}

/// Parses an all-day boundary. The end date is exclusive.
fn parse_day(s: &str) -> ClientResult<NaiveDate> {
    time::parse_date(s).ok_or_else(|| {
        ClientError::InvalidArgument(format!("invalid date '{}', expected YYYY-MM-DD", s))
    })
}
