//! Static routing table for every RPC exposed by the two services.
//!
//! The generated routers already dispatch on the request path; this table
//! gives the rest of the system the same view without a handler instance, so
//! spans, metrics and clients can name an operation and its [`CallShape`].

use core::fmt;

/// Fully qualified name of the calculator service.
pub const CALCULATOR_SERVICE: &str = "quadrant.calculator.CalculatorService";

/// Fully qualified name of the greet service.
pub const GREET_SERVICE: &str = "quadrant.greet.GreetService";

/// How many messages flow in each direction of a call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallShape {
    /// One request, one response.
    Unary,
    /// One request, many responses.
    ServerStreaming,
    /// Many requests, one response.
    ClientStreaming,
    /// Many requests and many responses, independent directions.
    Bidirectional,
}

impl CallShape {
    pub const fn client_streams(self) -> bool {
        matches!(self, Self::ClientStreaming | Self::Bidirectional)
    }

    pub const fn server_streams(self) -> bool {
        matches!(self, Self::ServerStreaming | Self::Bidirectional)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unary => "unary",
            Self::ServerStreaming => "server_streaming",
            Self::ClientStreaming => "client_streaming",
            Self::Bidirectional => "bidi_streaming",
        }
    }
}

impl fmt::Display for CallShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every RPC served by `quadrant`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Sum,
    SquareRoot,
    PrimeFactors,
    Average,
    RunningMax,
    Greet,
    GreetWithDeadline,
    GreetManyTimes,
    LongGreet,
    GreetEveryone,
}

impl Operation {
    pub const ALL: [Self; 10] = [
        Self::Sum,
        Self::SquareRoot,
        Self::PrimeFactors,
        Self::Average,
        Self::RunningMax,
        Self::Greet,
        Self::GreetWithDeadline,
        Self::GreetManyTimes,
        Self::LongGreet,
        Self::GreetEveryone,
    ];

    /// Fully qualified service this operation belongs to.
    pub const fn service(self) -> &'static str {
        match self {
            Self::Sum
            | Self::SquareRoot
            | Self::PrimeFactors
            | Self::Average
            | Self::RunningMax => CALCULATOR_SERVICE,
            Self::Greet
            | Self::GreetWithDeadline
            | Self::GreetManyTimes
            | Self::LongGreet
            | Self::GreetEveryone => GREET_SERVICE,
        }
    }

    /// Method name as it appears on the wire.
    pub const fn method(self) -> &'static str {
        match self {
            Self::Sum => "Sum",
            Self::SquareRoot => "SquareRoot",
            Self::PrimeFactors => "PrimeFactors",
            Self::Average => "Average",
            Self::RunningMax => "RunningMax",
            Self::Greet => "Greet",
            Self::GreetWithDeadline => "GreetWithDeadline",
            Self::GreetManyTimes => "GreetManyTimes",
            Self::LongGreet => "LongGreet",
            Self::GreetEveryone => "GreetEveryone",
        }
    }

    pub const fn shape(self) -> CallShape {
        match self {
            Self::Sum | Self::SquareRoot | Self::Greet | Self::GreetWithDeadline => {
                CallShape::Unary
            }
            Self::PrimeFactors | Self::GreetManyTimes => CallShape::ServerStreaming,
            Self::Average | Self::LongGreet => CallShape::ClientStreaming,
            Self::RunningMax | Self::GreetEveryone => CallShape::Bidirectional,
        }
    }

    /// HTTP/2 request path, e.g. `/quadrant.calculator.CalculatorService/Sum`.
    pub fn path(self) -> String {
        format!("/{}/{}", self.service(), self.method())
    }

    /// Resolves a request path back to its operation.
    ///
    /// Returns `None` for paths outside both services (health checks, typos,
    /// unknown methods).
    pub fn from_path(path: &str) -> Option<Self> {
        let (service, method) = path.strip_prefix('/')?.split_once('/')?;
        Self::ALL
            .into_iter()
            .find(|op| op.service() == service && op.method() == method)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method())
    }
}
