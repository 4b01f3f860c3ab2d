pub mod automation;
pub mod board;
pub mod commands;
pub mod config;
pub mod cycle;
pub mod detect;
pub mod emitter;
pub mod hooks;
pub mod report;
pub mod source;
pub mod state_store;
pub mod types;

#[cfg(test)]
pub mod testing;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::update::UpdateOptions;
use commands::ConfigArgs;

#[derive(Parser)]
#[command(
    name = "devmon",
    version,
    about = "Unattended Kanban dev monitor",
    long_about = "devmon polls a Kanban board once per invocation, flags tasks that look stuck or silently finished, \
                  applies version-guarded remediations and notifies a human/agent channel. Run it from cron."
)]
struct Cli {
    /// Debug logging (overrides DEVMON_LOG / RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run one monitor cycle (default)
    Check {
        /// Do not print the JSON event summary
        #[arg(short, long)]
        quiet: bool,
    },

    /// Summarise stuck comments posted by the monitor
    Report {
        /// Look back this many days
        #[arg(short, long, default_value_t = 7)]
        days: u32,

        /// Print the report instead of sending it
        #[arg(long)]
        dry_run: bool,
    },

    /// Show board reachability, review queue and monitor state
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Update a task with a version-guarded write
    Update {
        /// Task id
        #[arg(short, long)]
        task: String,

        /// New status: todo, in-progress, review or done
        #[arg(long, value_name = "STATUS")]
        set_status: Option<String>,

        /// Mark a subtask done (title or part of it, repeatable)
        #[arg(long, value_name = "TITLE")]
        done_subtask: Vec<String>,

        /// Mark a subtask not done (repeatable)
        #[arg(long, value_name = "TITLE")]
        undone_subtask: Vec<String>,

        /// Append a discussion entry
        #[arg(long, value_name = "TEXT")]
        append_discussion: Option<String>,

        /// Discussion author (defaults to the automation author)
        #[arg(long)]
        author: Option<String>,

        /// Discussion timestamp (ISO 8601, defaults to now)
        #[arg(long)]
        at: Option<String>,

        /// Print the request instead of sending it
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the effective configuration
    Config,
}

fn log_filter(verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new("debug");
    }
    let level = std::env::var("DEVMON_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "warn,devmon::notify=info".to_string());
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.verbose))
        .with_writer(std::io::stderr)
        .init();

    let command = cli.command.unwrap_or(Command::Check { quiet: false });
    match command {
        Command::Check { quiet } => {
            if let Err(e) = commands::check::run(&cli.config, quiet) {
                eprintln!("Check error: {:#}", e);
                std::process::exit(1);
            }
        }
        Command::Report { days, dry_run } => {
            if let Err(e) = commands::report::run(&cli.config, days, dry_run) {
                eprintln!("Report error: {:#}", e);
                std::process::exit(1);
            }
        }
        Command::Status { json } => {
            if let Err(e) = commands::status::run(&cli.config, json) {
                eprintln!("Status error: {:#}", e);
                std::process::exit(1);
            }
        }
        Command::Update {
            task,
            set_status,
            done_subtask,
            undone_subtask,
            append_discussion,
            author,
            at,
            dry_run,
        } => {
            let options = UpdateOptions {
                task_id: task,
                set_status,
                done_subtasks: done_subtask,
                undone_subtasks: undone_subtask,
                append_discussion,
                author,
                at,
                dry_run,
            };
            if let Err(e) = commands::update::run(&cli.config, &options) {
                eprintln!("Update error: {:#}", e);
                std::process::exit(1);
            }
        }
        Command::Config => {
            if let Err(e) = commands::config::run(&cli.config) {
                eprintln!("Config error: {:#}", e);
                std::process::exit(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_defaults_to_check() {
        let cli = Cli::try_parse_from(["devmon", "--urls", "http://a:3001"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config.urls.as_deref(), Some("http://a:3001"));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["devmon", "check", "--stuck-minutes", "45", "--quiet"]).unwrap();
        assert_eq!(cli.config.stuck_minutes, Some(45));
        assert!(matches!(cli.command, Some(Command::Check { quiet: true })));
    }

    #[test]
    fn test_update_collects_repeated_subtasks() {
        let cli = Cli::try_parse_from([
            "devmon",
            "update",
            "--task",
            "t1",
            "--done-subtask",
            "api",
            "--done-subtask",
            "ui",
        ])
        .unwrap();
        match cli.command {
            Some(Command::Update {
                task, done_subtask, ..
            }) => {
                assert_eq!(task, "t1");
                assert_eq!(done_subtask, vec!["api", "ui"]);
            }
            _ => panic!("expected update"),
        }
    }
}
