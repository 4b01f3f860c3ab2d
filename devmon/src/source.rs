//! Task source with URL failover and a restart-and-retry escalation.

use tracing::{info, warn};

use crate::board::TaskBoard;
use crate::hooks::ServiceRestarter;
use crate::types::Task;

/// Tasks fetched from the first candidate that answered.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub base: String,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceError {
    #[error("no board URLs configured")]
    NoCandidates,
    #[error("all board URLs failed (tried {}): {last}", tried.join(", "))]
    AllFailed { tried: Vec<String>, last: String },
}

/// How the escalation went when the first fetch failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartAttempt {
    pub ok: bool,
    pub error: Option<String>,
}

/// Result of [`TaskSource::fetch_with_restart`].
#[derive(Debug)]
pub enum FetchOutcome {
    Ok(Fetched),
    /// First fetch failed, the restart was attempted and the retry succeeded.
    Recovered {
        fetched: Fetched,
        restart: RestartAttempt,
    },
    /// Both fetches failed; the cycle must stop.
    Unreachable {
        error: SourceError,
        restart: RestartAttempt,
    },
}

/// Ordered list of candidate base URLs over one [`TaskBoard`].
pub struct TaskSource<'a> {
    board: &'a dyn TaskBoard,
    urls: Vec<String>,
}

impl<'a> TaskSource<'a> {
    pub fn new(board: &'a dyn TaskBoard, urls: &[String]) -> Self {
        let urls = urls
            .iter()
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .collect();
        Self { board, urls }
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    /// Try each candidate in order and return the first success.
    pub async fn fetch(&self) -> Result<Fetched, SourceError> {
        let mut last = None;
        for base in &self.urls {
            match self.board.list_tasks(base).await {
                Ok(tasks) => {
                    return Ok(Fetched {
                        base: base.clone(),
                        tasks,
                    })
                }
                Err(e) => {
                    warn!("Board fetch failed at {}: {}", base, e);
                    last = Some(e.to_string());
                }
            }
        }
        match last {
            Some(last) => Err(SourceError::AllFailed {
                tried: self.urls.clone(),
                last,
            }),
            None => Err(SourceError::NoCandidates),
        }
    }

    /// [`fetch`](Self::fetch), and on total failure restart the service once
    /// and retry exactly once.
    pub async fn fetch_with_restart(&self, restarter: &dyn ServiceRestarter) -> FetchOutcome {
        let first_error = match self.fetch().await {
            Ok(fetched) => return FetchOutcome::Ok(fetched),
            Err(e) => e,
        };

        warn!("Board unreachable ({}), attempting service restart", first_error);
        let restart = match restarter.restart().await {
            Ok(()) => RestartAttempt {
                ok: true,
                error: None,
            },
            Err(e) => {
                warn!("Service restart failed: {:#}", e);
                RestartAttempt {
                    ok: false,
                    error: Some(format!("{e:#}")),
                }
            }
        };

        match self.fetch().await {
            Ok(fetched) => {
                info!("Board reachable again after restart via {}", fetched.base);
                FetchOutcome::Recovered { fetched, restart }
            }
            Err(error) => FetchOutcome::Unreachable { error, restart },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeBoard, FakeRestarter};

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_fetch_uses_first_healthy_url() {
        let board = FakeBoard::new();
        board.fail_base("http://a:3001");
        board.insert(crate::testing::task("t1", 1, "todo"));

        let source = TaskSource::new(&board, &urls(&["http://a:3001/", "http://b:3001"]));
        let fetched = source.fetch().await.unwrap();
        assert_eq!(fetched.base, "http://b:3001");
        assert_eq!(fetched.tasks.len(), 1);
        assert_eq!(board.list_calls(), vec!["http://a:3001", "http://b:3001"]);
    }

    #[tokio::test]
    async fn test_fetch_all_failed_reports_every_url() {
        let board = FakeBoard::new();
        board.fail_base("http://a:3001");
        board.fail_base("http://b:3001");

        let source = TaskSource::new(&board, &urls(&["http://a:3001", "http://b:3001"]));
        match source.fetch().await.unwrap_err() {
            SourceError::AllFailed { tried, last } => {
                assert_eq!(tried, vec!["http://a:3001", "http://b:3001"]);
                assert!(last.contains("http://b:3001"));
            }
            other => panic!("unexpected: {other}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_without_candidates() {
        let board = FakeBoard::new();
        let source = TaskSource::new(&board, &urls(&["  "]));
        assert!(matches!(
            source.fetch().await.unwrap_err(),
            SourceError::NoCandidates
        ));
    }

    #[tokio::test]
    async fn test_restart_not_called_when_healthy() {
        let board = FakeBoard::new();
        let restarter = FakeRestarter::ok();
        let source = TaskSource::new(&board, &urls(&["http://a:3001"]));

        assert!(matches!(
            source.fetch_with_restart(&restarter).await,
            FetchOutcome::Ok(_)
        ));
        assert_eq!(restarter.calls(), 0);
    }

    #[tokio::test]
    async fn test_recovered_after_restart() {
        let board = FakeBoard::new();
        board.fail_base("http://a:3001");
        let restarter = FakeRestarter::ok().healing(&board, "http://a:3001");
        let source = TaskSource::new(&board, &urls(&["http://a:3001"]));

        match source.fetch_with_restart(&restarter).await {
            FetchOutcome::Recovered { fetched, restart } => {
                assert_eq!(fetched.base, "http://a:3001");
                assert!(restart.ok);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(restarter.calls(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_retries_exactly_once() {
        let board = FakeBoard::new();
        board.fail_base("http://a:3001");
        board.fail_base("http://b:3001");
        let restarter = FakeRestarter::failing("unit not found");
        let source = TaskSource::new(&board, &urls(&["http://a:3001", "http://b:3001"]));

        match source.fetch_with_restart(&restarter).await {
            FetchOutcome::Unreachable { error, restart } => {
                assert!(matches!(error, SourceError::AllFailed { .. }));
                assert!(!restart.ok);
                assert!(restart.error.unwrap().contains("unit not found"));
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(restarter.calls(), 1);
        assert_eq!(board.list_calls().len(), 4);
    }
}
