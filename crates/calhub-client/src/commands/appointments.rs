//! `calhub appointments`

use chrono::Local;

use calhub_core::Appointment;

use super::{Session, print_json};
use crate::error::ClientResult;

pub async fn run(session: &Session, calendar: Option<&str>, json: bool) -> ClientResult<()> {
    let appointments: Vec<Appointment> = match calendar {
        Some(key) => {
            let calendar = session.find_calendar_str(key).await?;
            let mut found = session.catalog().calendar_appointments(&calendar).await;
            found.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
            found
        }
        None => session.load().await?.appointments().to_vec(),
    };

    if json {
        return print_json(&appointments);
    }
    print_list(&appointments);
    Ok(())
}

pub(crate) fn print_list(appointments: &[Appointment]) {
    if appointments.is_empty() {
        println!("No appointments.");
        return;
    }
    for appointment in appointments {
        println!("{}", format_appointment(appointment));
    }
}

/// One line per appointment: when, subject, calendar and id.
pub(crate) fn format_appointment(appointment: &Appointment) -> String {
    let start = appointment.start.with_timezone(&Local);
    let end = appointment.end.with_timezone(&Local);
    let when = if appointment.all_day {
        let days = appointment.duration().num_days();
        if days > 1 {
            format!("{} ({} days)", start.format("%Y-%m-%d"), days)
        } else {
            format!("{} all day", start.format("%Y-%m-%d"))
        }
    } else if start.date_naive() == end.date_naive() {
        format!("{} - {}", start.format("%Y-%m-%d %H:%M"), end.format("%H:%M"))
    } else {
        format!(
            "{} - {}",
            start.format("%Y-%m-%d %H:%M"),
            end.format("%Y-%m-%d %H:%M")
        )
    };

    let mut line = format!("{:<30} {}", when, appointment.display_subject());
    if let Some(ref location) = appointment.location {
        line.push_str(&format!(" @ {}", location));
    }
    if let Some(ref calendar) = appointment.calendar {
        line.push_str(&format!(" [{}]", calendar.key()));
    }
    line.push_str(&format!(" ({})", appointment.id));
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use calhub_core::Calendar;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn timed_line() {
        let start = Local.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap().with_timezone(&Utc);
        let appointment = Appointment::new("a1", start, start + Duration::minutes(30))
            .with_subject("Standup")
            .with_location("Room 4")
            .with_calendar(Calendar::new("local", "home", "Home"));

        let line = format_appointment(&appointment);
        assert!(line.starts_with("2024-03-15 09:00 - 09:30"));
        assert!(line.ends_with("Standup @ Room 4 [local/home] (a1)"));
    }

    #[test]
    fn all_day_line() {
        let start = Local.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap().with_timezone(&Utc);
        let appointment = Appointment::new("h", start, start + Duration::days(3)).with_all_day(true);

        let line = format_appointment(&appointment);
        assert!(line.starts_with("2024-03-15 (3 days)"));
        assert!(line.contains("(No title)"));
    }
}
