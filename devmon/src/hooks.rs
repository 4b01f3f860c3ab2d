//! External collaborators: service restart, notifier, smoke-test probe.
//!
//! All three are best-effort. Callers log their failures and move on.

use std::process::Stdio;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

/// Restarts the board service after a total fetch failure.
#[async_trait]
pub trait ServiceRestarter: Send + Sync {
    async fn restart(&self) -> Result<()>;
}

/// Delivers one preformatted message to a human/agent channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str) -> Result<()>;
}

/// Outcome of a smoke-test probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub ok: bool,
    pub status: Option<u16>,
    pub error: Option<String>,
}

impl ProbeResult {
    pub fn describe(&self) -> String {
        match (&self.status, &self.error) {
            (_, Some(err)) => err.clone(),
            (Some(status), None) => format!("HTTP {status}"),
            (None, None) => "no response".to_string(),
        }
    }
}

/// Reachability check against a fixed URL.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self) -> ProbeResult;
}

/// Runs an argv with a timeout, failing on non-zero exit.
async fn run_command(argv: &[String], extra_arg: Option<&str>, timeout: Duration) -> Result<()> {
    let (program, args) = match argv.split_first() {
        Some(split) => split,
        None => bail!("no command configured"),
    };

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(arg) = extra_arg {
        cmd.arg(arg);
    }

    debug!("Running {}", argv.join(" "));
    let output = tokio::time::timeout(timeout, cmd.output())
        .await
        .with_context(|| format!("{program} timed out after {}s", timeout.as_secs()))?
        .with_context(|| format!("Failed to run {program}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("{program} exited with {}: {}", output.status, stderr.trim());
    }
    Ok(())
}

/// Restart via an external command, e.g. `systemctl --user restart ...`.
#[derive(Debug, Clone)]
pub struct CommandRestarter {
    argv: Vec<String>,
    timeout: Duration,
}

impl CommandRestarter {
    pub fn new(argv: Vec<String>, timeout: Duration) -> Self {
        Self { argv, timeout }
    }
}

#[async_trait]
impl ServiceRestarter for CommandRestarter {
    async fn restart(&self) -> Result<()> {
        if self.argv.is_empty() {
            bail!("no restart command configured");
        }
        info!("Restarting board service: {}", self.argv.join(" "));
        run_command(&self.argv, None, self.timeout).await
    }
}

/// Notifier that appends the message as the last argument of a command.
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    argv: Vec<String>,
    timeout: Duration,
}

impl CommandNotifier {
    pub fn new(argv: Vec<String>, timeout: Duration) -> Self {
        Self { argv, timeout }
    }
}

#[async_trait]
impl Notifier for CommandNotifier {
    async fn send(&self, message: &str) -> Result<()> {
        run_command(&self.argv, Some(message), self.timeout).await
    }
}

/// Notifier used when no command is configured: messages go to the log.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &str) -> Result<()> {
        info!(target: "devmon::notify", "{}", message);
        Ok(())
    }
}

/// Build the configured notifier.
pub fn notifier_from_argv(argv: &[String], timeout: Duration) -> Box<dyn Notifier> {
    if argv.is_empty() {
        Box::new(LogNotifier)
    } else {
        Box::new(CommandNotifier::new(argv.to_vec(), timeout))
    }
}

/// `GET url` with a short timeout; any 2xx is healthy.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
    url: String,
}

impl HttpProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl HealthProbe for HttpProbe {
    async fn probe(&self) -> ProbeResult {
        match self.client.get(&self.url).send().await {
            Ok(resp) => {
                let status = resp.status();
                ProbeResult {
                    ok: status.is_success(),
                    status: Some(status.as_u16()),
                    error: None,
                }
            }
            Err(e) => ProbeResult {
                ok: false,
                status: e.status().map(|s| s.as_u16()),
                error: Some(e.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_command_notifier_appends_message() {
        let notifier = CommandNotifier::new(
            argv(&["sh", "-c", "test \"$1\" = 'hello world'", "sh"]),
            Duration::from_secs(5),
        );
        assert!(notifier.send("hello world").await.is_ok());
        assert!(notifier.send("something else").await.is_err());
    }

    #[tokio::test]
    async fn test_command_failure_includes_stderr() {
        let restarter = CommandRestarter::new(
            argv(&["sh", "-c", "echo unit missing >&2; exit 3"]),
            Duration::from_secs(5),
        );
        let err = restarter.restart().await.unwrap_err();
        assert!(format!("{err:#}").contains("unit missing"));
    }

    #[tokio::test]
    async fn test_command_timeout() {
        let restarter =
            CommandRestarter::new(argv(&["sleep", "5"]), Duration::from_millis(100));
        let err = restarter.restart().await.unwrap_err();
        assert!(format!("{err:#}").contains("timed out"));
    }

    #[tokio::test]
    async fn test_empty_restart_command() {
        let restarter = CommandRestarter::new(vec![], Duration::from_secs(1));
        assert!(restarter.restart().await.is_err());
    }

    #[tokio::test]
    async fn test_missing_program() {
        let notifier = CommandNotifier::new(
            argv(&["devmon-test-no-such-binary"]),
            Duration::from_secs(1),
        );
        assert!(notifier.send("x").await.is_err());
    }

    #[tokio::test]
    async fn test_log_notifier_never_fails() {
        let notifier = notifier_from_argv(&[], Duration::from_secs(1));
        assert!(notifier.send("message").await.is_ok());
    }

    #[tokio::test]
    async fn test_http_probe_unreachable() {
        // Port 9 (discard) on localhost is almost never listening.
        let probe = HttpProbe::new("http://127.0.0.1:9/", Duration::from_millis(500)).unwrap();
        let result = probe.probe().await;
        assert!(!result.ok);
        assert!(result.error.is_some());
    }

    #[test]
    fn test_probe_result_describe() {
        let ok = ProbeResult {
            ok: true,
            status: Some(200),
            error: None,
        };
        assert_eq!(ok.describe(), "HTTP 200");
        let failed = ProbeResult {
            ok: false,
            status: None,
            error: Some("connection refused".into()),
        };
        assert_eq!(failed.describe(), "connection refused");
    }
}
