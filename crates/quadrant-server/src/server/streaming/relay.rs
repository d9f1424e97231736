use super::{Outbound, send};
use crate::server::context::CallContext;
use core::pin::pin;
use futures::{Stream, StreamExt};
use quadrant_core::{Operation, Result};
use tonic::Status;

/// Drives a bidirectional call.
///
/// Each inbound message is handed to `step`, which owns the session state and
/// may return one outbound message. Outbound messages are sent in the order
/// of the inbound messages that caused them. When the client half-closes,
/// the driver returns and dropping `tx` closes the outbound direction. An
/// inbound error ends the call with that error.
pub async fn relay_stream<S, M, T, F>(
    inbound: S,
    tx: Outbound<T>,
    ctx: CallContext,
    op: Operation,
    mut step: F,
) -> Result<()>
where
    S: Stream<Item = core::result::Result<M, Status>>,
    F: FnMut(M) -> Result<Option<T>>,
{
    let mut inbound = pin!(inbound);
    let mut received = 0_u64;

    while let Some(msg) = ctx.run(inbound.next()).await? {
        received += 1;
        if let Some(out) = step(msg?)? {
            send(&tx, &ctx, op, out).await?;
        }
    }

    tracing::debug!(%op, received, "Client closed its stream");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quadrant_core::Error;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    fn live_context() -> CallContext {
        CallContext::new(None, CancellationToken::new())
    }

    async fn drain<T>(
        mut rx: mpsc::Receiver<core::result::Result<T, Status>>,
    ) -> Vec<core::result::Result<T, Status>> {
        let mut items = Vec::new();
        while let Some(item) = rx.recv().await {
            items.push(item);
        }
        items
    }

    #[tokio::test]
    async fn emits_only_when_step_produces() {
        let (tx, rx) = mpsc::channel(4);
        let inbound = tokio_stream::iter([1, 2, 3, 4, 5, 6].map(Ok::<i32, Status>));

        let result = relay_stream(inbound, tx, live_context(), Operation::RunningMax, |x| {
            Ok((x % 2 == 0).then_some(x * 10))
        })
        .await;
        assert_eq!(result, Ok(()));

        let out: Vec<i32> = drain(rx).await.into_iter().map(|item| item.unwrap()).collect();
        assert_eq!(out, vec![20, 40, 60]);
    }

    #[tokio::test]
    async fn state_carries_across_messages() {
        let (tx, rx) = mpsc::channel(4);
        let inbound = tokio_stream::iter(["a", "b", "c"].map(Ok::<&str, Status>));

        let mut seen = String::new();
        relay_stream(inbound, tx, live_context(), Operation::GreetEveryone, |name| {
            seen.push_str(name);
            Ok(Some(seen.clone()))
        })
        .await
        .unwrap();

        let out: Vec<String> = drain(rx).await.into_iter().map(|item| item.unwrap()).collect();
        assert_eq!(out, vec!["a", "ab", "abc"]);
    }

    #[tokio::test]
    async fn inbound_error_ends_the_call() {
        let (tx, rx) = mpsc::channel(4);
        let inbound = tokio_stream::iter(vec![Ok(3), Err(Status::internal("boom")), Ok(9)]);

        let result = relay_stream(inbound, tx, live_context(), Operation::RunningMax, |x: i32| {
            Ok(Some(x))
        })
        .await;

        assert_eq!(result.unwrap_err().kind(), quadrant_core::ErrorKind::Internal);
        let out: Vec<i32> = drain(rx).await.into_iter().map(|item| item.unwrap()).collect();
        assert_eq!(out, vec![3]);
    }

    #[tokio::test]
    async fn client_gone_is_cancelled() {
        let (tx, rx) = mpsc::channel::<core::result::Result<i32, Status>>(1);
        drop(rx);
        let inbound = tokio_stream::iter([1].map(Ok::<i32, Status>));

        let result = relay_stream(inbound, tx, live_context(), Operation::RunningMax, |x| {
            Ok(Some(x))
        })
        .await;
        assert_eq!(result, Err(Error::Cancelled));
    }
}
