//! `calhub calendars`

use calhub_core::Calendar;

use super::{Session, print_json};
use crate::error::ClientResult;

pub async fn run(session: &Session, json: bool) -> ClientResult<()> {
    let calendars = session.catalog().calendars().await;
    if json {
        return print_json(&calendars);
    }

    if calendars.is_empty() {
        println!("No calendars.");
        return Ok(());
    }
    let default = session.catalog().default_calendar().map(|c| c.key());
    for calendar in &calendars {
        let marker = if Some(calendar.key()) == default { "*" } else { " " };
        println!("{} {}", marker, format_calendar(calendar));
    }
    Ok(())
}

fn format_calendar(calendar: &Calendar) -> String {
    let access = if calendar.is_writable() { "rw" } else { "ro" };
    let mut line = format!("{:<32} {} {}", calendar.key().to_string(), access, calendar.name);
    if let Some(color) = calendar.color {
        line.push_str(&format!(" {}", color));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use calhub_core::{AccessRights, Color};

    #[test]
    fn format_line() {
        let calendar = Calendar::new("local", "home", "Home")
            .with_access(AccessRights::Write)
            .with_color(Color::rgb(0x33, 0xaa, 0x55));
        let line = format_calendar(&calendar);
        assert!(line.starts_with("local/home "));
        assert!(line.ends_with("rw Home #33aa55"));
    }
}
