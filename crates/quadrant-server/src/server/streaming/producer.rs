use super::{Outbound, send};
use crate::server::context::CallContext;
use core::time::Duration;
use quadrant_core::{Error, Operation, Result};

/// Outcome of one [`Producer::step`].
#[derive(Debug, PartialEq, Eq)]
pub enum Produced<T> {
    /// The next item of the sequence.
    Ready(T),
    /// Work was done but no item is available yet; the driver yields to the
    /// runtime before stepping again.
    Pending,
    /// The sequence is complete.
    Done,
}

/// A lazy, finite sequence computed in bounded steps.
///
/// Each step must do a bounded amount of work so a long computation never
/// blocks the runtime worker it runs on.
pub trait Producer: Send {
    type Item: Send;

    fn step(&mut self) -> Produced<Self::Item>;
}

/// Drains `producer` into the response stream of a server-streaming call.
///
/// Items are sent one at a time, each as soon as it is produced. When `pace`
/// is set the driver waits that long between two items. The loop stops
/// without error after [`Produced::Done`], and stops with the reason when the
/// call is cancelled, the deadline passes or the client stops reading.
pub async fn feed_stream<P, T>(
    mut producer: P,
    tx: Outbound<T>,
    ctx: CallContext,
    op: Operation,
    pace: Option<Duration>,
    encode: fn(P::Item) -> T,
) -> Result<()>
where
    P: Producer,
{
    let mut sent = 0_u64;

    loop {
        ctx.check()?;
        if tx.is_closed() {
            return Err(Error::Cancelled);
        }

        match producer.step() {
            Produced::Ready(item) => {
                if let Some(interval) = pace.filter(|_| sent > 0) {
                    ctx.sleep(interval).await?;
                }
                send(&tx, &ctx, op, encode(item)).await?;
                sent += 1;
            }
            Produced::Pending => tokio::task::yield_now().await,
            Produced::Done => {
                tracing::debug!(%op, sent, "Producer exhausted");
                return Ok(());
            }
        }
    }
}
