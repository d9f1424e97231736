//! `quadrant.greet.GreetService`.

use super::ResponseStream;
use crate::server::{
    config::ServerConfig,
    streaming::{
        collector::collect_stream,
        producer::{Produced, Producer, feed_stream},
        relay::relay_stream,
        spawn_stream,
    },
    tracker::CallTracker,
};
use quadrant_core::{
    Error, Operation,
    proto::greet::greet_service_server::GreetService,
    types::{
        GreetEveryoneRequest, GreetEveryoneResponse, GreetManyTimesRequest,
        GreetManyTimesResponse, GreetRequest, GreetResponse, GreetWithDeadlineRequest,
        GreetWithDeadlineResponse, Greeting, LongGreetRequest, LongGreetResponse,
    },
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status, Streaming};

/// Extracts the first name a greeting is addressed to.
fn first_name(greeting: Option<Greeting>) -> quadrant_core::Result<String> {
    let greeting = greeting.ok_or_else(|| Error::invalid_argument("greeting is required"))?;
    if greeting.first_name.trim().is_empty() {
        return Err(Error::invalid_argument("first_name must not be empty"));
    }
    Ok(greeting.first_name)
}

/// `GreetManyTimes` output: `count` numbered greetings.
#[derive(Debug)]
struct Greetings {
    first_name: String,
    next: u32,
    count: u32,
}

impl Producer for Greetings {
    type Item = String;

    fn step(&mut self) -> Produced<String> {
        if self.next == self.count {
            return Produced::Done;
        }
        let greeting = format!("Hello {} number {}", self.first_name, self.next);
        self.next += 1;
        Produced::Ready(greeting)
    }
}

#[derive(Clone, Debug)]
pub struct GreetHandler {
    config: ServerConfig,
    tracker: Arc<CallTracker>,
}

impl GreetHandler {
    pub const fn new(config: ServerConfig, tracker: Arc<CallTracker>) -> Self {
        Self { config, tracker }
    }
}

#[tonic::async_trait]
impl GreetService for GreetHandler {
    type GreetManyTimesStream = ResponseStream<GreetManyTimesResponse>;
    type GreetEveryoneStream = ResponseStream<GreetEveryoneResponse>;

    async fn greet(&self, req: Request<GreetRequest>) -> Result<Response<GreetResponse>, Status> {
        let call = self.tracker.begin(Operation::Greet)?;
        let first = first_name(req.into_inner().greeting).map_err(|e| call.fail(e))?;

        Ok(Response::new(GreetResponse {
            result: format!("Hello {first}"),
        }))
    }

    /// Simulates slow work for `slow_greeting_delay`, giving up as soon as the
    /// caller's deadline passes or the call is cancelled.
    async fn greet_with_deadline(
        &self,
        req: Request<GreetWithDeadlineRequest>,
    ) -> Result<Response<GreetWithDeadlineResponse>, Status> {
        let call = self.tracker.begin(Operation::GreetWithDeadline)?;
        let ctx = self.tracker.context(req.metadata());
        let first = first_name(req.into_inner().greeting).map_err(|e| call.fail(e))?;

        tracing::debug!(deadline = ?ctx.deadline(), "Working on a slow greeting");
        ctx.sleep(self.config.slow_greeting_delay)
            .await
            .map_err(|e| call.fail(e))?;

        Ok(Response::new(GreetWithDeadlineResponse {
            result: format!("Hello {first}"),
        }))
    }

    async fn greet_many_times(
        &self,
        req: Request<GreetManyTimesRequest>,
    ) -> Result<Response<Self::GreetManyTimesStream>, Status> {
        let call = self.tracker.begin(Operation::GreetManyTimes)?;
        let ctx = self.tracker.context(req.metadata());
        let first = first_name(req.into_inner().greeting).map_err(|e| call.fail(e))?;

        let producer = Greetings {
            first_name: first,
            next: 0,
            count: self.config.greet_repeat_count,
        };
        let (tx, rx) = mpsc::channel(self.config.stream_buffer_size);
        let driver = feed_stream(
            producer,
            tx.clone(),
            ctx,
            Operation::GreetManyTimes,
            Some(self.config.greet_interval),
            |result| GreetManyTimesResponse { result },
        );
        spawn_stream(call, tx, driver);

        Ok(Response::new(Box::pin(ReceiverStream::new(rx))))
    }

    async fn long_greet(
        &self,
        req: Request<Streaming<LongGreetRequest>>,
    ) -> Result<Response<LongGreetResponse>, Status> {
        let call = self.tracker.begin(Operation::LongGreet)?;
        let ctx = self.tracker.context(req.metadata());

        let result = collect_stream(
            req.into_inner(),
            &ctx,
            String::new(),
            |result, msg: LongGreetRequest| {
                let first = first_name(msg.greeting)?;
                result.push_str("Hello ");
                result.push_str(&first);
                result.push_str("! ");
                Ok(())
            },
        )
        .await
        .map_err(|e| call.fail(e))?;

        Ok(Response::new(LongGreetResponse { result }))
    }

    async fn greet_everyone(
        &self,
        req: Request<Streaming<GreetEveryoneRequest>>,
    ) -> Result<Response<Self::GreetEveryoneStream>, Status> {
        let call = self.tracker.begin(Operation::GreetEveryone)?;
        let ctx = self.tracker.context(req.metadata());
        let inbound = req.into_inner();

        let (tx, rx) = mpsc::channel(self.config.stream_buffer_size);
        let driver = relay_stream(
            inbound,
            tx.clone(),
            ctx,
            Operation::GreetEveryone,
            |msg: GreetEveryoneRequest| {
                let first = first_name(msg.greeting)?;
                Ok(Some(GreetEveryoneResponse {
                    result: format!("Hello {first}! "),
                }))
            },
        );
        spawn_stream(call, tx, driver);

        Ok(Response::new(Box::pin(ReceiverStream::new(rx))))
    }
}
