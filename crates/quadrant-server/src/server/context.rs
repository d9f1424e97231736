//! Per-call deadline and cancellation.
//!
//! A [`CallContext`] is created when a call opens and dropped when it closes.
//! It carries the deadline the client sent in the `grpc-timeout` header and a
//! cancellation token derived from the server's shutdown token. Every point
//! where a handler can wait (sleeping, sending, receiving) goes through
//! [`CallContext::run`] so that deadline expiry and cancellation preempt the
//! wait instead of racing it.

use core::{future::Future, time::Duration};
use quadrant_core::{Error, Result};
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tonic::metadata::MetadataMap;

/// Header carrying the client's time budget, e.g. `500m` or `2S`.
pub const GRPC_TIMEOUT_HEADER: &str = "grpc-timeout";

/// Taken off every client budget so the handler's deadline fires before the
/// transport's own timer, which starts earlier and answers `CANCELLED`.
pub const DEADLINE_MARGIN: Duration = Duration::from_millis(10);

/// Parses a `grpc-timeout` header value.
///
/// The value is an ASCII integer of at most eight digits followed by a unit:
/// `H` (hours), `M` (minutes), `S` (seconds), `m` (milliseconds),
/// `u` (microseconds) or `n` (nanoseconds). Anything else yields `None`.
pub fn parse_grpc_timeout(value: &str) -> Option<Duration> {
    if !value.is_ascii() || value.len() < 2 {
        return None;
    }

    let (digits, unit) = value.split_at(value.len() - 1);
    if digits.len() > 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let amount: u64 = digits.parse().ok()?;
    let timeout = match unit {
        "H" => Duration::from_secs(amount * 60 * 60),
        "M" => Duration::from_secs(amount * 60),
        "S" => Duration::from_secs(amount),
        "m" => Duration::from_millis(amount),
        "u" => Duration::from_micros(amount),
        "n" => Duration::from_nanos(amount),
        _ => return None,
    };

    Some(timeout)
}

/// Deadline and cancellation signal scoped to one call.
#[derive(Clone, Debug)]
pub struct CallContext {
    deadline: Option<Instant>,
    token: CancellationToken,
}

impl CallContext {
    pub const fn new(deadline: Option<Instant>, token: CancellationToken) -> Self {
        Self { deadline, token }
    }

    /// Builds a context from request metadata. A missing or malformed
    /// `grpc-timeout` header means the call has no deadline.
    ///
    /// The deadline is [`DEADLINE_MARGIN`] shorter than the header's budget.
    pub fn from_metadata(metadata: &MetadataMap, token: CancellationToken) -> Self {
        let deadline = metadata
            .get(GRPC_TIMEOUT_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_grpc_timeout)
            .map(|timeout| Instant::now() + timeout.saturating_sub(DEADLINE_MARGIN));

        Self::new(deadline, token)
    }

    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancels this call and every context cloned from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns the reason the call must stop, if it must stop now.
    pub fn check(&self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(Error::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Error::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Resolves once the call is cancelled or its deadline passes, with the
    /// matching error. Never resolves for a live call without a deadline.
    pub async fn done(&self) -> Error {
        let expired = async {
            match self.deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => core::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            () = self.token.cancelled() => Error::Cancelled,
            () = expired => Error::DeadlineExceeded,
        }
    }

    /// Drives `fut` to completion unless the call ends first.
    ///
    /// When the deadline or cancellation wins, `fut` is dropped without being
    /// polled again.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            err = self.done() => Err(err),
            out = fut => Ok(out),
        }
    }

    /// Sleeps for `duration`, cut short by deadline or cancellation.
    pub async fn sleep(&self, duration: Duration) -> Result<()> {
        self.run(tokio::time::sleep(duration)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::metadata::MetadataValue;

    #[test]
    fn parses_every_unit() {
        assert_eq!(parse_grpc_timeout("2H"), Some(Duration::from_secs(7200)));
        assert_eq!(parse_grpc_timeout("3M"), Some(Duration::from_secs(180)));
        assert_eq!(parse_grpc_timeout("5S"), Some(Duration::from_secs(5)));
        assert_eq!(parse_grpc_timeout("500m"), Some(Duration::from_millis(500)));
        assert_eq!(
            parse_grpc_timeout("5000000u"),
            Some(Duration::from_secs(5))
        );
        assert_eq!(parse_grpc_timeout("42n"), Some(Duration::from_nanos(42)));
    }

    #[test]
    fn rejects_malformed_values() {
        for value in ["", "S", "5", "5s", "-5S", "123456789S", "1.5S", "5 S", "é5S"] {
            assert_eq!(parse_grpc_timeout(value), None, "{value:?}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn metadata_without_timeout_has_no_deadline() {
        let ctx = CallContext::from_metadata(&MetadataMap::new(), CancellationToken::new());
        assert!(ctx.deadline().is_none());
        assert!(ctx.check().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_comes_from_metadata() {
        let mut metadata = MetadataMap::new();
        metadata.insert(GRPC_TIMEOUT_HEADER, MetadataValue::from_static("1S"));

        let start = Instant::now();
        let ctx = CallContext::from_metadata(&metadata, CancellationToken::new());
        assert_eq!(
            ctx.deadline(),
            Some(start + Duration::from_secs(1) - DEADLINE_MARGIN)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn budget_below_margin_is_already_expired() {
        let mut metadata = MetadataMap::new();
        metadata.insert(GRPC_TIMEOUT_HEADER, MetadataValue::from_static("5m"));

        let ctx = CallContext::from_metadata(&metadata, CancellationToken::new());
        assert_eq!(ctx.check(), Err(Error::DeadlineExceeded));
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_within_budget_completes() {
        let ctx = CallContext::new(
            Some(Instant::now() + Duration::from_secs(5)),
            CancellationToken::new(),
        );
        assert_eq!(ctx.sleep(Duration::from_secs(2)).await, Ok(()));
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_past_deadline_is_cut_short() {
        let start = Instant::now();
        let ctx = CallContext::new(
            Some(start + Duration::from_secs(1)),
            CancellationToken::new(),
        );

        assert_eq!(
            ctx.sleep(Duration::from_secs(2)).await,
            Err(Error::DeadlineExceeded)
        );
        assert_eq!(start.elapsed(), Duration::from_secs(1));
        assert_eq!(ctx.check(), Err(Error::DeadlineExceeded));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_preempts_a_pending_wait() {
        let ctx = CallContext::new(None, CancellationToken::new());
        let canceller = ctx.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let result = ctx.run(core::future::pending::<()>()).await;
        assert_eq!(result, Err(Error::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn parent_token_cancels_child_contexts() {
        let shutdown = CancellationToken::new();
        let ctx = CallContext::new(None, shutdown.child_token());

        shutdown.cancel();
        assert_eq!(ctx.check(), Err(Error::Cancelled));
        assert_eq!(ctx.done().await, Error::Cancelled);
    }
}
