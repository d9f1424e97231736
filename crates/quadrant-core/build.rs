/// Builds the gRPC client and server bindings for the `CalculatorService` and
/// `GreetService` definitions using `tonic-build`.
///
/// The message types are declared in Rust (`src/common/types.rs`) with `prost`
/// derives, so the services are described with the manual builder instead of a
/// `.proto` file. This keeps `protoc` out of the build while producing the
/// same client and server modules `tonic` would generate from a schema.
///
/// # Codec
///
/// Every method uses [`tonic_prost::ProstCodec`], so the wire format is plain
/// protobuf and any gRPC client can talk to the server.
///
/// # Output
///
/// One file per service is written to `OUT_DIR`, named
/// `{package}.{service}.rs`, and included from `src/common/mod.rs`:
///
/// ```rust,ignore
/// pub mod calculator {
///     include!(concat!(env!("OUT_DIR"), "/quadrant.calculator.CalculatorService.rs"));
/// }
/// ```
use tonic_build::manual::{Builder, Method, Service};

const CODEC: &str = "tonic_prost::ProstCodec";
const TYPES: &str = "crate::common::types";

#[derive(Clone, Copy)]
enum Shape {
    Unary,
    ServerStreaming,
    ClientStreaming,
    Bidirectional,
}

fn method(name: &str, route: &str, input: &str, output: &str, shape: Shape) -> Method {
    let builder = Method::builder()
        .name(name)
        .route_name(route)
        .input_type(&format!("{TYPES}::{input}"))
        .output_type(&format!("{TYPES}::{output}"))
        .codec_path(CODEC);

    let builder = match shape {
        Shape::Unary => builder,
        Shape::ServerStreaming => builder.server_streaming(),
        Shape::ClientStreaming => builder.client_streaming(),
        Shape::Bidirectional => builder.client_streaming().server_streaming(),
    };

    builder.build()
}

fn main() {
    let calculator = Service::builder()
        .name("CalculatorService")
        .package("quadrant.calculator")
        .method(method("sum", "Sum", "SumRequest", "SumResponse", Shape::Unary))
        .method(method(
            "square_root",
            "SquareRoot",
            "SquareRootRequest",
            "SquareRootResponse",
            Shape::Unary,
        ))
        .method(method(
            "prime_factors",
            "PrimeFactors",
            "PrimeFactorsRequest",
            "PrimeFactorsResponse",
            Shape::ServerStreaming,
        ))
        .method(method(
            "average",
            "Average",
            "AverageRequest",
            "AverageResponse",
            Shape::ClientStreaming,
        ))
        .method(method(
            "running_max",
            "RunningMax",
            "RunningMaxRequest",
            "RunningMaxResponse",
            Shape::Bidirectional,
        ))
        .build();

    let greet = Service::builder()
        .name("GreetService")
        .package("quadrant.greet")
        .method(method(
            "greet",
            "Greet",
            "GreetRequest",
            "GreetResponse",
            Shape::Unary,
        ))
        .method(method(
            "greet_with_deadline",
            "GreetWithDeadline",
            "GreetWithDeadlineRequest",
            "GreetWithDeadlineResponse",
            Shape::Unary,
        ))
        .method(method(
            "greet_many_times",
            "GreetManyTimes",
            "GreetManyTimesRequest",
            "GreetManyTimesResponse",
            Shape::ServerStreaming,
        ))
        .method(method(
            "long_greet",
            "LongGreet",
            "LongGreetRequest",
            "LongGreetResponse",
            Shape::ClientStreaming,
        ))
        .method(method(
            "greet_everyone",
            "GreetEveryone",
            "GreetEveryoneRequest",
            "GreetEveryoneResponse",
            Shape::Bidirectional,
        ))
        .build();

    Builder::new().compile(&[calculator, greet]);
}
