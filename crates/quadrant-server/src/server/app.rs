//! Server assembly: routers, middleware, health and the shutdown sequence.

use crate::server::{
    config::ServerConfig,
    service::{
        build_calculator_service, build_greet_service, calculator::CalculatorHandler,
        greet::GreetHandler,
    },
    tracker::CallTracker,
};
use core::future::Future;
use futures::Stream;
use quadrant_core::{
    Operation,
    proto::{
        calculator::calculator_service_server::CalculatorServiceServer,
        greet::greet_service_server::GreetServiceServer,
    },
};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tonic::{
    codegen::http,
    transport::{Server, server::Connected},
};
use tonic_health::server::HealthReporter;
use tonic_web::GrpcWebLayer;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultOnFailure, MakeSpan, TraceLayer},
};
use tracing::{Level, Span};

/// Opens one span per HTTP/2 request, named after the gRPC operation.
#[derive(Clone, Copy, Debug, Default)]
pub struct CallSpan;

impl<B> MakeSpan<B> for CallSpan {
    fn make_span(&mut self, request: &http::Request<B>) -> Span {
        let path = request.uri().path();
        match Operation::from_path(path) {
            Some(op) => tracing::info_span!(
                "call",
                otel.name = %path,
                rpc.system = "grpc",
                rpc.service = op.service(),
                rpc.method = op.method(),
                rpc.shape = %op.shape(),
            ),
            None => tracing::debug_span!("request", otel.name = %path),
        }
    }
}

/// Serves both services on `incoming` until `signal` resolves, then shuts
/// down gracefully.
///
/// After the signal both services report `NOT_SERVING`, new calls are
/// refused, in-flight calls get `config.shutdown_timeout` to finish and any
/// that remain are cancelled. The function returns once every connection is
/// closed.
pub async fn serve_with_incoming<I, IO, IE, F>(
    incoming: I,
    config: ServerConfig,
    signal: F,
) -> anyhow::Result<()>
where
    I: Stream<Item = Result<IO, IE>>,
    IO: AsyncRead + AsyncWrite + Connected + Unpin + Send + 'static,
    IE: Into<tower::BoxError>,
    F: Future<Output = ()>,
{
    let (health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<CalculatorServiceServer<CalculatorHandler>>()
        .await;
    health_reporter
        .set_serving::<GreetServiceServer<GreetHandler>>()
        .await;

    let tracker = CallTracker::new(config.shutdown_timeout);
    let calculator = CalculatorHandler::new(config.clone(), Arc::clone(&tracker));
    let greet = GreetHandler::new(config, Arc::clone(&tracker));

    Server::builder()
        .accept_http1(true)
        .http2_adaptive_window(Some(true))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_grpc()
                        .make_span_with(CallSpan)
                        .on_failure(DefaultOnFailure::new().level(Level::DEBUG)),
                )
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(GrpcWebLayer::new()),
        )
        .add_service(health_service)
        .add_service(build_calculator_service(calculator))
        .add_service(build_greet_service(greet))
        .serve_with_incoming_shutdown(incoming, shutdown(signal, tracker, health_reporter))
        .await?;

    tracing::info!("Service shut down successfully");
    Ok(())
}

async fn shutdown<F>(signal: F, tracker: Arc<CallTracker>, health_reporter: HealthReporter)
where
    F: Future<Output = ()>,
{
    signal.await;
    tracing::info!("Shutdown signal received, terminating gracefully...");

    // 1. Publish the status
    health_reporter
        .set_not_serving::<CalculatorServiceServer<CalculatorHandler>>()
        .await;
    health_reporter
        .set_not_serving::<GreetServiceServer<GreetHandler>>()
        .await;

    // 2. Drain, then cancel what is left
    tracker.shutdown().await;
}

