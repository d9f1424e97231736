//! Shared types and error definitions used by the `quadrant` server and its
//! clients.
//!
//! ## Submodules
//!
//! - [`error`] - Centralized error type and its mapping onto gRPC status
//!   codes.
//! - [`types`] - Protobuf message types for both services.
//! - [`dispatch`] - Static table of every operation, its gRPC path and call
//!   shape.
//! - [`proto`] - Generated client and server bindings.

pub mod dispatch;
pub mod error;
pub mod types;

pub use dispatch::{CALCULATOR_SERVICE, CallShape, GREET_SERVICE, Operation};
pub use error::{Error, ErrorKind, Result};

/// gRPC service bindings generated by `build.rs`.
///
/// Each submodule holds a `*_client` module with the typed client and a
/// `*_server` module with the service trait and its router.
pub mod proto {
    /// `quadrant.calculator.CalculatorService`
    pub mod calculator {
        include!(concat!(
            env!("OUT_DIR"),
            "/quadrant.calculator.CalculatorService.rs"
        ));
    }

    /// `quadrant.greet.GreetService`
    pub mod greet {
        include!(concat!(env!("OUT_DIR"), "/quadrant.greet.GreetService.rs"));
    }
}
