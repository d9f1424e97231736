//! Drivers for the three streaming call shapes.
//!
//! Every streaming call is driven by a single task that owns the call's
//! session state. Outbound messages go through a bounded `mpsc` channel whose
//! receiver the transport drains, so a slow client applies backpressure to the
//! producer. All waits (channel capacity, next inbound message, pacing) go
//! through the call's [`CallContext`] and end early on deadline or
//! cancellation.
//!
//! ## Structure
//!
//! - [`producer`] - server streaming: one request, a lazy sequence out.
//! - [`collector`] - client streaming: a sequence in, one response out.
//! - [`relay`] - bidirectional: each inbound message may produce one outbound
//!   message.

pub mod collector;
pub mod producer;
pub mod relay;

use crate::server::{context::CallContext, telemetry::increment_messages_sent, tracker::CallGuard};
use core::{future::Future, time::Duration};
use quadrant_core::{Error, Operation, Result};
use tokio::sync::mpsc;
use tonic::Status;
use tracing::Instrument;

/// Sending half of a streaming response.
pub type Outbound<T> = mpsc::Sender<core::result::Result<T, Status>>;

/// How long a failing call may wait for room to report its error.
const ERROR_SEND_TIMEOUT: Duration = Duration::from_secs(1);

/// Sends one response message, waiting for channel capacity.
///
/// # Errors
///
/// Fails with the context's error if the call ends while waiting, or with
/// [`Error::Cancelled`] if the client stopped reading.
pub async fn send<T>(tx: &Outbound<T>, ctx: &CallContext, op: Operation, msg: T) -> Result<()> {
    match ctx.run(tx.send(Ok(msg))).await? {
        Ok(()) => {
            increment_messages_sent(op);
            Ok(())
        }
        Err(_) => Err(Error::Cancelled),
    }
}

/// Runs `driver` on its own task for the lifetime of `call`.
///
/// If the driver fails, the error is recorded on the call and surfaced to the
/// client as the terminal item of the stream. The stream closes once the task
/// drops the last sender.
pub fn spawn_stream<T, F>(call: CallGuard, tx: Outbound<T>, driver: F)
where
    T: Send + 'static,
    F: Future<Output = Result<()>> + Send + 'static,
{
    let task = async move {
        match driver.await {
            Ok(()) => tracing::debug!(op = %call.operation(), "Stream completed"),
            Err(err) => {
                let status = call.fail(err);
                // Best effort: the client may already be gone.
                match tokio::time::timeout(ERROR_SEND_TIMEOUT, tx.send(Err(status))).await {
                    Ok(Ok(())) => {}
                    Ok(Err(_)) => tracing::debug!("Client left before the error was sent"),
                    Err(_) => tracing::warn!("Timed out forwarding error to client"),
                }
            }
        }
        drop(call);
    };

    tokio::spawn(task.in_current_span());
}
