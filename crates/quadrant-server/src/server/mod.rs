//! gRPC server internals.
//!
//! ## Structure
//!
//! - [`app`] - server assembly and graceful shutdown.
//! - [`config`] - CLI and environment configuration.
//! - [`context`] - per-call deadline and cancellation.
//! - [`service`] - calculator and greet handlers.
//! - [`streaming`] - drivers for the three streaming call shapes.
//! - [`telemetry`] - logging, tracing and metrics setup.
//! - [`tracker`] - in-flight call accounting and shutdown phases.

pub mod app;
pub mod config;
pub mod context;
pub mod service;
pub mod streaming;
pub mod telemetry;
pub mod tracker;
