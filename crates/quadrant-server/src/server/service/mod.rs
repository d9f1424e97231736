//! gRPC service implementations.
//!
//! ## Structure
//!
//! - [`calculator`] - `CalculatorService` handlers.
//! - [`greet`] - `GreetService` handlers.
//! - [`math`] - the arithmetic and per-call sessions behind the calculator.

pub mod calculator;
pub mod greet;
pub mod math;

use calculator::CalculatorHandler;
use core::pin::Pin;
use futures::Stream;
use greet::GreetHandler;
use quadrant_core::proto::{
    calculator::calculator_service_server::CalculatorServiceServer,
    greet::greet_service_server::GreetServiceServer,
};
use tonic::{Status, codec::CompressionEncoding};

/// Response stream handed to the transport by every streaming handler.
pub type ResponseStream<T> = Pin<Box<dyn Stream<Item = Result<T, Status>> + Send>>;

const ENCODINGS: [CompressionEncoding; 3] = [
    CompressionEncoding::Zstd,
    CompressionEncoding::Gzip,
    CompressionEncoding::Deflate,
];

pub fn build_calculator_service(
    handler: CalculatorHandler,
) -> CalculatorServiceServer<CalculatorHandler> {
    ENCODINGS
        .into_iter()
        .fold(CalculatorServiceServer::new(handler), |server, encoding| {
            server.send_compressed(encoding).accept_compressed(encoding)
        })
}

pub fn build_greet_service(handler: GreetHandler) -> GreetServiceServer<GreetHandler> {
    ENCODINGS
        .into_iter()
        .fold(GreetServiceServer::new(handler), |server, encoding| {
            server.send_compressed(encoding).accept_compressed(encoding)
        })
}
