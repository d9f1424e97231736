//! `quadrant.calculator.CalculatorService`.
//!
//! Unary calls compute inline. `PrimeFactors` and `RunningMax` hand their
//! session to a spawned task that feeds the response channel; `Average` folds
//! the inbound stream on the request task and answers once the client closes
//! its side.

use super::{
    ResponseStream,
    math::{self, Average, PrimeFactors, RunningMax},
};
use crate::server::{
    config::ServerConfig,
    streaming::{
        collector::collect_stream, producer::feed_stream, relay::relay_stream, spawn_stream,
    },
    tracker::CallTracker,
};
use quadrant_core::{
    Operation,
    proto::calculator::calculator_service_server::CalculatorService,
    types::{
        AverageRequest, AverageResponse, PrimeFactorsRequest, PrimeFactorsResponse,
        RunningMaxRequest, RunningMaxResponse, SquareRootRequest, SquareRootResponse, SumRequest,
        SumResponse,
    },
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status, Streaming};

#[derive(Clone, Debug)]
pub struct CalculatorHandler {
    config: ServerConfig,
    tracker: Arc<CallTracker>,
}

impl CalculatorHandler {
    pub const fn new(config: ServerConfig, tracker: Arc<CallTracker>) -> Self {
        Self { config, tracker }
    }
}

#[tonic::async_trait]
impl CalculatorService for CalculatorHandler {
    type PrimeFactorsStream = ResponseStream<PrimeFactorsResponse>;
    type RunningMaxStream = ResponseStream<RunningMaxResponse>;

    async fn sum(&self, req: Request<SumRequest>) -> Result<Response<SumResponse>, Status> {
        let _call = self.tracker.begin(Operation::Sum)?;
        let SumRequest { x, y } = req.into_inner();

        Ok(Response::new(SumResponse {
            sum: math::sum(x, y),
        }))
    }

    #[tracing::instrument(level = "debug", skip_all, fields(number = req.get_ref().number))]
    async fn square_root(
        &self,
        req: Request<SquareRootRequest>,
    ) -> Result<Response<SquareRootResponse>, Status> {
        let call = self.tracker.begin(Operation::SquareRoot)?;
        let number_root = math::square_root(req.into_inner().number).map_err(|e| call.fail(e))?;

        Ok(Response::new(SquareRootResponse { number_root }))
    }

    #[tracing::instrument(level = "debug", skip_all, fields(n = req.get_ref().n))]
    async fn prime_factors(
        &self,
        req: Request<PrimeFactorsRequest>,
    ) -> Result<Response<Self::PrimeFactorsStream>, Status> {
        let call = self.tracker.begin(Operation::PrimeFactors)?;
        let ctx = self.tracker.context(req.metadata());
        let producer = PrimeFactors::new(req.get_ref().n).map_err(|e| call.fail(e))?;

        let (tx, rx) = mpsc::channel(self.config.stream_buffer_size);
        let driver = feed_stream(
            producer,
            tx.clone(),
            ctx,
            Operation::PrimeFactors,
            None,
            |factor| PrimeFactorsResponse { factor },
        );
        spawn_stream(call, tx, driver);

        Ok(Response::new(Box::pin(ReceiverStream::new(rx))))
    }

    async fn average(
        &self,
        req: Request<Streaming<AverageRequest>>,
    ) -> Result<Response<AverageResponse>, Status> {
        let call = self.tracker.begin(Operation::Average)?;
        let ctx = self.tracker.context(req.metadata());

        let session = collect_stream(
            req.into_inner(),
            &ctx,
            Average::default(),
            |session, msg: AverageRequest| {
                session.push(msg.x);
                Ok(())
            },
        )
        .await
        .map_err(|e| call.fail(e))?;
        let average = session.finish().map_err(|e| call.fail(e))?;

        Ok(Response::new(AverageResponse { average }))
    }

    async fn running_max(
        &self,
        req: Request<Streaming<RunningMaxRequest>>,
    ) -> Result<Response<Self::RunningMaxStream>, Status> {
        let call = self.tracker.begin(Operation::RunningMax)?;
        let ctx = self.tracker.context(req.metadata());
        let inbound = req.into_inner();

        let (tx, rx) = mpsc::channel(self.config.stream_buffer_size);
        let mut session = RunningMax::default();
        let driver = relay_stream(
            inbound,
            tx.clone(),
            ctx,
            Operation::RunningMax,
            move |msg: RunningMaxRequest| {
                Ok(session.observe(msg.x).map(|max| RunningMaxResponse { max }))
            },
        );
        spawn_stream(call, tx, driver);

        Ok(Response::new(Box::pin(ReceiverStream::new(rx))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::service::build_calculator_service;
    use core::time::Duration;
    use futures::TryStreamExt;
    use quadrant_core::{
        CALCULATOR_SERVICE, proto::calculator::calculator_service_server::CalculatorServiceServer,
    };
    use tonic::{Code, server::NamedService};

    fn handler() -> CalculatorHandler {
        let config = ServerConfig {
            stream_buffer_size: 2,
            greet_repeat_count: 3,
            greet_interval: Duration::from_millis(1),
            slow_greeting_delay: Duration::from_millis(1),
            shutdown_timeout: Duration::from_secs(1),
            server_addr: "127.0.0.1:0".to_string(),
            uds: false,
        };
        CalculatorHandler::new(config, CallTracker::new(Duration::from_secs(1)))
    }

    #[test]
    fn router_serves_the_calculator_name() {
        assert_eq!(
            <CalculatorServiceServer<CalculatorHandler> as NamedService>::NAME,
            CALCULATOR_SERVICE
        );
        let _server = build_calculator_service(handler());
    }

    #[tokio::test]
    async fn sum_adds() {
        let res = handler()
            .sum(Request::new(SumRequest { x: 3, y: 10 }))
            .await
            .unwrap();
        assert_eq!(res.into_inner().sum, 13);
    }

    #[tokio::test]
    async fn square_root_of_negative_is_invalid_argument() {
        let status = handler()
            .square_root(Request::new(SquareRootRequest { number: -2 }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
        assert_eq!(status.message(), "Received a negative number: -2");
    }

    #[tokio::test]
    async fn square_root_of_perfect_square() {
        let res = handler()
            .square_root(Request::new(SquareRootRequest { number: 81 }))
            .await
            .unwrap();
        assert_eq!(res.into_inner().number_root, 9.0);
    }

    #[tokio::test]
    async fn prime_factors_stream_in_order() {
        let res = handler()
            .prime_factors(Request::new(PrimeFactorsRequest { n: 120 }))
            .await
            .unwrap();
        let factors: Vec<i64> = res
            .into_inner()
            .map_ok(|msg| msg.factor)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(factors, vec![2, 2, 2, 3, 5]);
    }

    #[tokio::test]
    async fn prime_factors_of_one_is_an_empty_stream() {
        let res = handler()
            .prime_factors(Request::new(PrimeFactorsRequest { n: 1 }))
            .await
            .unwrap();
        let factors: Vec<PrimeFactorsResponse> = res.into_inner().try_collect().await.unwrap();
        assert!(factors.is_empty());
    }

    #[tokio::test]
    async fn prime_factors_rejects_zero_before_streaming() {
        let status = handler()
            .prime_factors(Request::new(PrimeFactorsRequest { n: 0 }))
            .await
            .err()
            .unwrap();
        assert_eq!(status.code(), Code::InvalidArgument);
    }

    #[tokio::test]
    async fn calls_are_refused_after_shutdown() {
        let handler = handler();
        handler.tracker.shutdown().await;

        let status = handler
            .sum(Request::new(SumRequest { x: 1, y: 1 }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::Unavailable);
    }
}
