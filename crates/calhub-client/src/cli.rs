//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// calhub - one view over all your calendars
#[derive(Debug, Parser)]
#[command(name = "calhub")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "CALHUB_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the calendars of every provider
    Calendars,

    /// List merged appointments
    Appointments {
        /// Only this calendar (`provider/calendar_id`)
        #[arg(long)]
        calendar: Option<String>,
    },

    /// Keep syncing and print every published snapshot
    Watch {
        /// Seconds between sync cycles (overrides the config)
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Create an appointment
    Add(AddArgs),

    /// Remove an appointment by id
    Remove {
        /// Appointment id as shown by `appointments`
        id: String,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Arguments of `calhub add`.
#[derive(Debug, Args)]
pub struct AddArgs {
    /// Subject line
    pub subject: String,

    /// Start, as RFC 3339 (`2024-03-15T09:00:00+01:00`) or, with
    /// `--all-day`, a date (`2024-03-15`)
    #[arg(long)]
    pub start: String,

    /// End, same format as `--start`
    #[arg(long, conflicts_with = "duration")]
    pub end: Option<String>,

    /// Length in minutes, used when `--end` is not given
    #[arg(long, default_value_t = 60)]
    pub duration: i64,

    /// Store as an all-day appointment
    #[arg(long)]
    pub all_day: bool,

    /// Target calendar (`provider/calendar_id`); defaults to the
    /// configured default calendar
    #[arg(long)]
    pub calendar: Option<String>,

    #[arg(long)]
    pub location: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// Color label (0 for none)
    #[arg(long, default_value_t = 0)]
    pub label: u8,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_add() {
        let cli = Cli::try_parse_from([
            "calhub",
            "--json",
            "add",
            "Standup",
            "--start",
            "2024-03-15T09:00:00Z",
            "--duration",
            "15",
            "--calendar",
            "local/home",
        ])
        .unwrap();

        assert!(cli.json);
        match cli.command {
            Some(Command::Add(args)) => {
                assert_eq!(args.subject, "Standup");
                assert_eq!(args.duration, 15);
                assert_eq!(args.calendar.as_deref(), Some("local/home"));
                assert!(!args.all_day);
                assert_eq!(args.label, 0);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn end_conflicts_with_duration() {
        let result = Cli::try_parse_from([
            "calhub",
            "add",
            "x",
            "--start",
            "2024-03-15T09:00:00Z",
            "--end",
            "2024-03-15T10:00:00Z",
            "--duration",
            "30",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["calhub", "appointments", "--debug"]).unwrap();
        assert!(cli.debug);
        assert!(matches!(
            cli.command,
            Some(Command::Appointments { calendar: None })
        ));
    }
}
