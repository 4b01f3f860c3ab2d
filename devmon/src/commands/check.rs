//! Check command - Run one monitor cycle

use anyhow::{bail, Context};
use chrono::Utc;
use tracing::debug;

use super::{load_config, ConfigArgs};
use crate::board::KanbanClient;
use crate::cycle::{run_cycle, Collaborators};
use crate::hooks::{notifier_from_argv, CommandRestarter, HttpProbe};
use crate::state_store::StateStore;

pub fn run(args: &ConfigArgs, quiet: bool) -> anyhow::Result<()> {
    let (config, location) = load_config(args)?;
    debug!(
        "Config from {} ({:?})",
        location.path.display(),
        location.source
    );

    let board = KanbanClient::new(config.request_timeout())?;
    let restarter = CommandRestarter::new(config.restart_command.clone(), config.command_timeout());
    let probe = HttpProbe::new(config.smoke_test_url.clone(), config.smoke_timeout())?;
    let notifier = notifier_from_argv(&config.notify_command, config.command_timeout());
    let store = StateStore::new(&config.state_path);

    let deps = Collaborators {
        board: &board,
        restarter: &restarter,
        probe: &probe,
        notifier: notifier.as_ref(),
    };

    let rt = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    let report = rt.block_on(run_cycle(&config, &deps, &store, Utc::now()))?;

    if let Some(error) = &report.outage {
        bail!("board unreachable after restart: {error}");
    }

    if !quiet {
        if let Some(summary) = report.summary() {
            println!("{}", serde_json::to_string(&summary)?);
        }
    }

    Ok(())
}
