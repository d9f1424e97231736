#![doc = include_str!("../README.md")]

pub mod client;
mod common;
pub use common::*;
