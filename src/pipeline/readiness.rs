//! Readiness state machine for uploaded media.
//!
//! An upload starts out `PROCESSING` on the remote side and eventually
//! settles on `READY` or `FAILED`. Waiting for that is a bounded
//! retry-with-fixed-delay: [`ReadinessPoller::step`] is the pure decision
//! function, and [`crate::pipeline::upload::MediaGateway::await_ready`] is
//! the async driver that sleeps and re-fetches. Keeping the decision pure
//! means it can be driven by any scheduler, and tested with a fake clock.
//!
//! ```text
//!               ┌──────── re-fetch every poll_interval ────────┐
//!               ▼                                              │
//!  upload ─▶ PROCESSING ──(elapsed < timeout)──▶ Wait ─────────┘
//!               │  │
//!               │  └──(elapsed ≥ timeout)──▶ TimedOut
//!               ├──▶ READY   (terminal)
//!               └──▶ FAILED  (terminal)
//! ```

use crate::provider::{Readiness, RemoteFile};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Opaque reference to a remotely stored blob.
///
/// Owned by the request that uploaded it. Only [`MediaHandle::refresh`]
/// changes it, and [`crate::pipeline::upload::MediaGateway::release`]
/// consumes it.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct MediaHandle {
    pub remote_id: String,
    pub uri: String,
    pub mime_type: String,
    pub readiness: Readiness,
    /// Failure detail reported by the remote store, if any.
    pub failure_reason: Option<String>,
}

impl MediaHandle {
    /// Build a handle from the record returned by an upload.
    pub fn from_remote(file: RemoteFile) -> Self {
        Self {
            remote_id: file.name,
            uri: file.uri,
            mime_type: file.mime_type,
            readiness: file.state,
            failure_reason: file.error,
        }
    }

    /// Apply a re-fetched record.
    ///
    /// Terminal states are never left: once `Ready` or `Failed`, later
    /// records are ignored.
    pub fn refresh(&mut self, file: &RemoteFile) {
        if self.readiness.is_terminal() {
            return;
        }
        self.readiness = file.state;
        if !file.uri.is_empty() {
            self.uri = file.uri.clone();
        }
        if file.error.is_some() {
            self.failure_reason = file.error.clone();
        }
    }

    /// Failure detail, or the state name when the remote gave none.
    pub fn failure_detail(&self) -> String {
        self.failure_reason
            .clone()
            .unwrap_or_else(|| self.readiness.to_string())
    }
}

/// What the poll driver should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStep {
    /// The handle can be used.
    Ready,
    /// The remote store gave up on the upload.
    Failed(String),
    /// Sleep this long, then re-fetch and step again.
    Wait(Duration),
    /// Still processing and the time budget is spent.
    TimedOut,
}

/// Fixed-interval, bounded readiness poller.
#[derive(Debug, Clone)]
pub struct ReadinessPoller {
    interval: Duration,
    timeout: Duration,
    polls: u32,
}

impl ReadinessPoller {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            polls: 0,
        }
    }

    /// Decide the next action from the latest observed handle and the time
    /// spent waiting so far.
    ///
    /// A wait never runs past the timeout: the last one is shortened to the
    /// budget that is left.
    pub fn step(&mut self, handle: &MediaHandle, elapsed: Duration) -> PollStep {
        match handle.readiness {
            Readiness::Ready => PollStep::Ready,
            Readiness::Failed => PollStep::Failed(handle.failure_detail()),
            Readiness::Processing if elapsed >= self.timeout => PollStep::TimedOut,
            Readiness::Processing => {
                self.polls += 1;
                PollStep::Wait(self.interval.min(self.remaining(elapsed)))
            }
        }
    }

    /// Budget left after `elapsed`.
    pub fn remaining(&self, elapsed: Duration) -> Duration {
        self.timeout.saturating_sub(elapsed)
    }

    /// Number of re-fetches requested so far.
    pub fn polls(&self) -> u32 {
        self.polls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(state: Readiness) -> RemoteFile {
        RemoteFile {
            name: "files/abc".into(),
            uri: "https://example/files/abc".into(),
            mime_type: "video/mp4".into(),
            state,
            error: None,
        }
    }

    fn handle(state: Readiness) -> MediaHandle {
        MediaHandle::from_remote(remote(state))
    }

    #[test]
    fn scripted_sequence_resolves_after_two_polls() {
        let mut poller = ReadinessPoller::new(Duration::from_secs(10), Duration::from_secs(600));
        let mut h = handle(Readiness::Processing);
        let mut clock = Duration::ZERO;

        for next in [Readiness::Processing, Readiness::Ready] {
            match poller.step(&h, clock) {
                PollStep::Wait(d) => {
                    assert_eq!(d, Duration::from_secs(10));
                    clock += d;
                }
                other => panic!("expected Wait, got {other:?}"),
            }
            h.refresh(&remote(next));
        }

        assert_eq!(poller.step(&h, clock), PollStep::Ready);
        assert_eq!(poller.polls(), 2);
        assert_eq!(clock, Duration::from_secs(20));
    }

    #[test]
    fn failed_carries_reason() {
        let mut poller = ReadinessPoller::new(Duration::from_secs(10), Duration::from_secs(600));
        let mut file = remote(Readiness::Failed);
        file.error = Some("unsupported codec".into());
        let h = MediaHandle::from_remote(file);
        assert_eq!(
            poller.step(&h, Duration::ZERO),
            PollStep::Failed("unsupported codec".into())
        );
        assert_eq!(poller.polls(), 0);
    }

    #[test]
    fn failed_without_reason_uses_state_name() {
        let h = handle(Readiness::Failed);
        assert_eq!(h.failure_detail(), "FAILED");
    }

    #[test]
    fn times_out_once_budget_spent() {
        let mut poller = ReadinessPoller::new(Duration::from_secs(10), Duration::from_secs(30));
        let h = handle(Readiness::Processing);
        assert!(matches!(poller.step(&h, Duration::from_secs(20)), PollStep::Wait(_)));
        assert_eq!(poller.step(&h, Duration::from_secs(30)), PollStep::TimedOut);
    }

    #[test]
    fn last_wait_is_shortened_to_the_budget() {
        let mut poller = ReadinessPoller::new(Duration::from_secs(10), Duration::from_secs(35));
        let h = handle(Readiness::Processing);
        assert_eq!(
            poller.step(&h, Duration::from_secs(30)),
            PollStep::Wait(Duration::from_secs(5))
        );
        assert_eq!(poller.step(&h, Duration::from_secs(35)), PollStep::TimedOut);
    }

    #[test]
    fn terminal_state_is_sticky() {
        let mut h = handle(Readiness::Ready);
        h.refresh(&remote(Readiness::Processing));
        assert_eq!(h.readiness, Readiness::Ready);

        let mut h = handle(Readiness::Failed);
        h.refresh(&remote(Readiness::Ready));
        assert_eq!(h.readiness, Readiness::Failed);
    }

    #[test]
    fn ready_immediately_needs_no_polls() {
        let mut poller = ReadinessPoller::new(Duration::from_secs(10), Duration::from_secs(600));
        assert_eq!(poller.step(&handle(Readiness::Ready), Duration::ZERO), PollStep::Ready);
        assert_eq!(poller.polls(), 0);
    }
}
