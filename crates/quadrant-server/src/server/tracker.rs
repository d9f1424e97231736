//! Server-wide call lifecycle.
//!
//! [`CallTracker`] is the only state shared between calls: the number of calls
//! in flight, whether the server is closing, and the shutdown token from which
//! every call's cancellation token is derived. Each accepted call holds a
//! [`CallGuard`] for as long as it runs; dropping the guard is what marks the
//! call finished.
//!
//! Shutdown proceeds in phases:
//!
//! 1. Stop accepting calls (new calls fail with `Unavailable`).
//! 2. Wait up to `shutdown_timeout` for in-flight calls to drain.
//! 3. Cancel whatever is left through the shutdown token.

use crate::server::{
    context::CallContext,
    telemetry::{
        decrement_calls_inflight, increment_call_errors, increment_calls,
        increment_calls_inflight, record_call_duration,
    },
};
use core::time::Duration;
use portable_atomic::{AtomicBool, AtomicUsize, Ordering};
use quadrant_core::{Error, ErrorKind, Operation, Result};
use std::{sync::Arc, time::Instant};
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tonic::{Status, metadata::MetadataMap};

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub struct CallTracker {
    inflight: AtomicUsize,
    closing: AtomicBool,
    shutdown_token: CancellationToken,
    shutdown_timeout: Duration,
}

impl CallTracker {
    pub fn new(shutdown_timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            inflight: AtomicUsize::new(0),
            closing: AtomicBool::new(false),
            shutdown_token: CancellationToken::new(),
            shutdown_timeout,
        })
    }

    pub fn inflight(&self) -> usize {
        self.inflight.load(Ordering::Acquire)
    }

    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    /// Registers a new call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ServiceShutdown`] once shutdown has started.
    pub fn begin(self: &Arc<Self>, op: Operation) -> Result<CallGuard> {
        if self.is_closing() {
            tracing::debug!(%op, "Refusing call during shutdown");
            increment_call_errors(op, ErrorKind::Unavailable);
            return Err(Error::ServiceShutdown);
        }

        self.inflight.fetch_add(1, Ordering::AcqRel);
        increment_calls(op);
        increment_calls_inflight();

        Ok(CallGuard {
            tracker: Arc::clone(self),
            op,
            started: Instant::now(),
        })
    }

    /// Builds the context for a call from its request metadata. The call is
    /// cancelled when the server gives up draining.
    pub fn context(&self, metadata: &MetadataMap) -> CallContext {
        CallContext::from_metadata(metadata, self.shutdown_token.child_token())
    }

    /// Stops accepting calls, drains in-flight calls and cancels the rest.
    pub async fn shutdown(&self) {
        // === Phase 0: Stop accepting new calls ===
        tracing::info!("Refusing new calls");
        self.closing.store(true, Ordering::Release);

        // === Phase 1: Wait for in-flight calls to drain ===
        tracing::info!("Draining in-flight calls ({} active)", self.inflight());
        let drained = timeout(self.shutdown_timeout, async {
            while self.inflight() > 0 {
                sleep(DRAIN_POLL_INTERVAL).await;
            }
        })
        .await;

        match drained {
            Ok(()) => tracing::debug!("All in-flight calls drained"),
            Err(_) => tracing::warn!(
                "Graceful drain timed out ({} calls still active)",
                self.inflight()
            ),
        }

        // === Phase 2: Cancel any remaining work ===
        tracing::debug!("Cancelling remaining calls via shutdown token");
        self.shutdown_token.cancel();
    }
}

/// Marks one call as in flight until dropped.
#[derive(Debug)]
pub struct CallGuard {
    tracker: Arc<CallTracker>,
    op: Operation,
    started: Instant,
}

impl CallGuard {
    pub const fn operation(&self) -> Operation {
        self.op
    }

    /// Records `err` as the outcome of this call and converts it into the
    /// status sent to the client.
    pub fn fail(&self, err: Error) -> Status {
        let kind = err.kind();
        match kind {
            ErrorKind::Internal => tracing::error!(op = %self.op, "Call failed: {err}"),
            ErrorKind::Unavailable => tracing::warn!(op = %self.op, "Call failed: {err}"),
            ErrorKind::InvalidArgument | ErrorKind::DeadlineExceeded | ErrorKind::Cancelled => {
                tracing::info!(op = %self.op, %kind, "Call rejected: {err}");
            }
        }
        increment_call_errors(self.op, kind);
        err.into()
    }
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        self.tracker.inflight.fetch_sub(1, Ordering::AcqRel);
        decrement_calls_inflight();
        record_call_duration(self.op, self.started.elapsed().as_secs_f64() * 1000.0);
    }
}
