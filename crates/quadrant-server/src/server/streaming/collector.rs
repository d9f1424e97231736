use crate::server::context::CallContext;
use core::pin::pin;
use futures::{Stream, StreamExt};
use quadrant_core::{Error, Result};
use tonic::Status;

/// Folds every inbound message of a client-streaming call into `acc`.
///
/// Returns the accumulator once the client signals end-of-stream. An inbound
/// error, a failing `fold`, the deadline or cancellation stop accumulation
/// immediately and the partial state is discarded.
pub async fn collect_stream<S, M, A, F>(
    inbound: S,
    ctx: &CallContext,
    mut acc: A,
    mut fold: F,
) -> Result<A>
where
    S: Stream<Item = core::result::Result<M, Status>>,
    F: FnMut(&mut A, M) -> Result<()>,
{
    let mut inbound = pin!(inbound);

    while let Some(msg) = ctx.run(inbound.next()).await? {
        fold(&mut acc, msg.map_err(Error::from)?)?;
    }

    Ok(acc)
}
