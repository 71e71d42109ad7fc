//! High-level operations.
//!
//! This module contains the implementation of the commands that are more
//! than a single library call.

pub mod configure;
pub mod env_report;

pub use configure::{configure, ConfigureOptions};
pub use env_report::{format_report, inspect, EnvReport};
