//! Typed clients for the calculator and greet services.
//!
//! These wrap the generated `tonic` clients so that callers deal in plain
//! values and [`Error`], never in raw [`tonic::Status`]. Streaming results are
//! exposed as [`ResultStream`]s: `Some(Ok(_))` is a message, `Some(Err(_))`
//! ends the stream with a failure, and `None` is a clean end-of-stream.

use crate::{
    Error, Result,
    proto::{
        calculator::calculator_service_client::CalculatorServiceClient,
        greet::greet_service_client::GreetServiceClient,
    },
    types::{
        AverageRequest, GreetEveryoneRequest, GreetManyTimesRequest, GreetRequest,
        GreetWithDeadlineRequest, Greeting, LongGreetRequest, PrimeFactorsRequest,
        RunningMaxRequest, SquareRootRequest, SumRequest,
    },
};
use core::{pin::Pin, time::Duration};
use futures::{Stream, StreamExt};
use tonic::{
    Request,
    codec::CompressionEncoding,
    transport::{Channel, Endpoint},
};

/// A boxed stream of decoded messages or the error that ended the stream.
pub type ResultStream<T> = Pin<Box<dyn Stream<Item = Result<T>> + Send>>;

/// Opens a channel to a `quadrant` server, e.g. `http://127.0.0.1:50051`.
///
/// # Errors
///
/// Returns [`Error::Transport`] if the address is invalid or the connection
/// cannot be established.
pub async fn connect(addr: impl Into<String>) -> Result<Channel> {
    let endpoint = Endpoint::from_shared(addr.into())?;
    Ok(endpoint.connect().await?)
}

fn into_result_stream<M, T>(
    stream: tonic::Streaming<M>,
    extract: fn(M) -> T,
) -> ResultStream<T>
where
    M: Send + 'static,
    T: Send + 'static,
{
    Box::pin(stream.map(move |item| item.map(extract).map_err(Error::from)))
}

/// Client for `quadrant.calculator.CalculatorService`.
#[derive(Clone, Debug)]
pub struct Calculator {
    inner: CalculatorServiceClient<Channel>,
}

impl Calculator {
    pub fn new(channel: Channel) -> Self {
        Self {
            inner: CalculatorServiceClient::new(channel),
        }
    }

    /// Connects to `addr` and builds a client on the new channel.
    pub async fn connect(addr: impl Into<String>) -> Result<Self> {
        Ok(Self::new(connect(addr).await?))
    }

    /// Compresses requests and accepts compressed responses.
    #[must_use]
    pub fn compressed(mut self, encoding: CompressionEncoding) -> Self {
        self.inner = self
            .inner
            .send_compressed(encoding)
            .accept_compressed(encoding);
        self
    }

    /// `x + y`, wrapping on `i32` overflow.
    pub async fn sum(&mut self, x: i32, y: i32) -> Result<i32> {
        let response = self.inner.sum(SumRequest { x, y }).await?;
        Ok(response.into_inner().sum)
    }

    /// Square root of `number`.
    ///
    /// # Errors
    ///
    /// Fails with [`ErrorKind::InvalidArgument`](crate::ErrorKind) for
    /// negative numbers.
    pub async fn square_root(&mut self, number: i32) -> Result<f64> {
        let response = self.inner.square_root(SquareRootRequest { number }).await?;
        Ok(response.into_inner().number_root)
    }

    /// Streams the prime factors of `n` in non-decreasing order.
    pub async fn prime_factors(&mut self, n: i64) -> Result<ResultStream<i64>> {
        let response = self.inner.prime_factors(PrimeFactorsRequest { n }).await?;
        Ok(into_result_stream(response.into_inner(), |msg| msg.factor))
    }

    /// Streams `values` to the server and returns their arithmetic mean once
    /// the stream ends.
    pub async fn average<S>(&mut self, values: S) -> Result<f64>
    where
        S: Stream<Item = i32> + Send + 'static,
    {
        let outbound = values.map(|x| AverageRequest { x });
        let response = self.inner.average(outbound).await?;
        Ok(response.into_inner().average)
    }

    /// Streams `values` and receives every new maximum as it is observed.
    pub async fn running_max<S>(&mut self, values: S) -> Result<ResultStream<i32>>
    where
        S: Stream<Item = i32> + Send + 'static,
    {
        let outbound = values.map(|x| RunningMaxRequest { x });
        let response = self.inner.running_max(outbound).await?;
        Ok(into_result_stream(response.into_inner(), |msg| msg.max))
    }
}

/// Client for `quadrant.greet.GreetService`.
#[derive(Clone, Debug)]
pub struct Greeter {
    inner: GreetServiceClient<Channel>,
}

impl Greeter {
    pub fn new(channel: Channel) -> Self {
        Self {
            inner: GreetServiceClient::new(channel),
        }
    }

    pub async fn connect(addr: impl Into<String>) -> Result<Self> {
        Ok(Self::new(connect(addr).await?))
    }

    #[must_use]
    pub fn compressed(mut self, encoding: CompressionEncoding) -> Self {
        self.inner = self
            .inner
            .send_compressed(encoding)
            .accept_compressed(encoding);
        self
    }

    pub async fn greet(&mut self, first_name: &str, last_name: &str) -> Result<String> {
        let request = GreetRequest {
            greeting: Some(Greeting::new(first_name, last_name)),
        };
        let response = self.inner.greet(request).await?;
        Ok(response.into_inner().result)
    }

    /// Calls `GreetWithDeadline` with a time budget.
    ///
    /// The budget travels to the server as the `grpc-timeout` header and is
    /// also enforced here: once it runs out the call is abandoned and
    /// [`Error::DeadlineExceeded`] is returned, whatever the server is doing.
    pub async fn greet_with_deadline(
        &mut self,
        first_name: &str,
        last_name: &str,
        budget: Duration,
    ) -> Result<String> {
        let mut request = Request::new(GreetWithDeadlineRequest {
            greeting: Some(Greeting::new(first_name, last_name)),
        });
        request.set_timeout(budget);

        match tokio::time::timeout(budget, self.inner.greet_with_deadline(request)).await {
            Ok(response) => Ok(response?.into_inner().result),
            Err(_) => Err(Error::DeadlineExceeded),
        }
    }

    pub async fn greet_many_times(
        &mut self,
        first_name: &str,
        last_name: &str,
    ) -> Result<ResultStream<String>> {
        let request = GreetManyTimesRequest {
            greeting: Some(Greeting::new(first_name, last_name)),
        };
        let response = self.inner.greet_many_times(request).await?;
        Ok(into_result_stream(response.into_inner(), |msg| msg.result))
    }

    /// Streams first names and returns the combined greeting after the
    /// stream ends.
    pub async fn long_greet<S>(&mut self, first_names: S) -> Result<String>
    where
        S: Stream<Item = String> + Send + 'static,
    {
        let outbound = first_names.map(|name| LongGreetRequest {
            greeting: Some(Greeting::first(name)),
        });
        let response = self.inner.long_greet(outbound).await?;
        Ok(response.into_inner().result)
    }

    pub async fn greet_everyone<S>(&mut self, first_names: S) -> Result<ResultStream<String>>
    where
        S: Stream<Item = String> + Send + 'static,
    {
        let outbound = first_names.map(|name| GreetEveryoneRequest {
            greeting: Some(Greeting::first(name)),
        });
        let response = self.inner.greet_everyone(outbound).await?;
        Ok(into_result_stream(response.into_inner(), |msg| msg.result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[tokio::test]
    async fn invalid_address_is_a_transport_error() {
        let err = Calculator::connect("not a uri")
            .await
            .expect_err("connect must fail");
        assert_eq!(err.kind(), ErrorKind::Unavailable);
    }

    #[tokio::test]
    async fn refused_connection_is_a_transport_error() {
        // Port 9 (discard) is reserved and nothing listens on it in test
        // environments.
        let err = Greeter::connect("http://127.0.0.1:9")
            .await
            .expect_err("connect must fail");
        assert!(err.kind().is_transport());
    }
}
