//! Config command - Show the effective configuration and where it came from

use colored::Colorize;

use super::ConfigArgs;
use crate::config::loader::{
    ENV_ONLY_ASSIGNEE, ENV_SMOKE_TEST_URL, ENV_STATE_PATH, ENV_STUCK_MINUTES, ENV_URLS,
};
use crate::config::{resolve_config_path, ConfigSource};

pub fn run(args: &ConfigArgs) -> anyhow::Result<()> {
    println!("{}", "\nDev Monitor Configuration\n".bold());

    let location = resolve_config_path(args.config.as_deref());
    println!("{}", "Config location:".dimmed());
    let source = match location.source {
        ConfigSource::Explicit => "explicit",
        ConfigSource::Local => "local",
        ConfigSource::Global => "global",
    };
    if location.path.exists() {
        println!("  {} {} ({})", "●".green(), location.path.display(), source);
    } else {
        println!(
            "  {} {} (not found, using defaults)",
            "○".red(),
            location.path.display()
        );
    }

    match super::load_config(args) {
        Ok((config, _)) => {
            println!("{}", "\nCurrent settings:".dimmed());
            println!("  urls:                 {}", config.urls.join(", ").cyan());
            println!(
                "  state_path:           {}",
                config.state_path.display().to_string().cyan()
            );
            println!(
                "  stuck_minutes:        {}",
                config.stuck_minutes.to_string().cyan()
            );
            println!(
                "  only_assignee:        {}",
                config.only_assignee.as_deref().unwrap_or("(all)").cyan()
            );
            println!("  smoke_test_url:       {}", config.smoke_test_url.cyan());
            println!(
                "  automation_author:    {}",
                config.automation_author.cyan()
            );
            println!(
                "  finish_dedup_hours:   {}",
                config.finish_dedup_hours.to_string().cyan()
            );
            println!(
                "  restart_command:      {}",
                display_argv(&config.restart_command).cyan()
            );
            println!(
                "  notify_command:       {}",
                display_argv(&config.notify_command).cyan()
            );

            println!("{}", "\nEnvironment overrides:".dimmed());
            let env_vars = [
                ENV_URLS,
                ENV_STATE_PATH,
                ENV_STUCK_MINUTES,
                ENV_ONLY_ASSIGNEE,
                ENV_SMOKE_TEST_URL,
            ];

            let mut has_overrides = false;
            for var in &env_vars {
                if let Ok(val) = std::env::var(var) {
                    if !val.trim().is_empty() {
                        println!("  {}={}", var, val.yellow());
                        has_overrides = true;
                    }
                }
            }
            if !has_overrides {
                println!("  {}", "(none)".dimmed());
            }

            println!();
        }
        Err(e) => {
            eprintln!("\n{}", "Error reading config:".red());
            eprintln!("  {}", format!("{}", e).dimmed());
            println!();
        }
    }

    Ok(())
}

fn display_argv(argv: &[String]) -> String {
    if argv.is_empty() {
        "(none)".to_string()
    } else {
        argv.join(" ")
    }
}
