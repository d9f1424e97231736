//! # Protobuf Message Types
//!
//! Request and response messages for the `quadrant.calculator` and
//! `quadrant.greet` packages. Field numbers are part of the wire contract and
//! must not be reused.
//!
//! ## Calculator
//!
//! | Method | Request | Response |
//! |---|---|---|
//! | `Sum` | [`SumRequest`] | [`SumResponse`] |
//! | `SquareRoot` | [`SquareRootRequest`] | [`SquareRootResponse`] |
//! | `PrimeFactors` | [`PrimeFactorsRequest`] | stream of [`PrimeFactorsResponse`] |
//! | `Average` | stream of [`AverageRequest`] | [`AverageResponse`] |
//! | `RunningMax` | stream of [`RunningMaxRequest`] | stream of [`RunningMaxResponse`] |
//!
//! ## Greet
//!
//! Every greet request wraps a [`Greeting`]. Streaming requests only need the
//! first name.

/// Operands for `Sum`.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct SumRequest {
    #[prost(int32, tag = "1")]
    pub x: i32,
    #[prost(int32, tag = "2")]
    pub y: i32,
}

/// `x + y` with two's-complement wrapping.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct SumResponse {
    #[prost(int32, tag = "1")]
    pub sum: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct SquareRootRequest {
    #[prost(int32, tag = "1")]
    pub number: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct SquareRootResponse {
    #[prost(double, tag = "1")]
    pub number_root: f64,
}

/// Number to factorize. Must be at least 1.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct PrimeFactorsRequest {
    #[prost(int64, tag = "1")]
    pub n: i64,
}

/// One prime factor, streamed in non-decreasing order.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct PrimeFactorsResponse {
    #[prost(int64, tag = "1")]
    pub factor: i64,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct AverageRequest {
    #[prost(int32, tag = "1")]
    pub x: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct AverageResponse {
    #[prost(double, tag = "1")]
    pub average: f64,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct RunningMaxRequest {
    #[prost(int32, tag = "1")]
    pub x: i32,
}

/// Sent only when an inbound value exceeds every value seen before it.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct RunningMaxResponse {
    #[prost(int32, tag = "1")]
    pub max: i32,
}

/// Name of the person being greeted.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct Greeting {
    #[prost(string, tag = "1")]
    pub first_name: String,
    #[prost(string, tag = "2")]
    pub last_name: String,
}

impl Greeting {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    /// A greeting that only carries a first name, as used by the streaming
    /// greet methods.
    pub fn first(first_name: impl Into<String>) -> Self {
        Self::new(first_name, String::new())
    }
}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct GreetRequest {
    #[prost(message, optional, tag = "1")]
    pub greeting: Option<Greeting>,
}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct GreetResponse {
    #[prost(string, tag = "1")]
    pub result: String,
}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct GreetWithDeadlineRequest {
    #[prost(message, optional, tag = "1")]
    pub greeting: Option<Greeting>,
}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct GreetWithDeadlineResponse {
    #[prost(string, tag = "1")]
    pub result: String,
}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct GreetManyTimesRequest {
    #[prost(message, optional, tag = "1")]
    pub greeting: Option<Greeting>,
}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct GreetManyTimesResponse {
    #[prost(string, tag = "1")]
    pub result: String,
}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct LongGreetRequest {
    #[prost(message, optional, tag = "1")]
    pub greeting: Option<Greeting>,
}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct LongGreetResponse {
    #[prost(string, tag = "1")]
    pub result: String,
}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct GreetEveryoneRequest {
    #[prost(message, optional, tag = "1")]
    pub greeting: Option<Greeting>,
}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct GreetEveryoneResponse {
    #[prost(string, tag = "1")]
    pub result: String,
}
