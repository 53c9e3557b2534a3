//! Runtime glue: provider configuration and tracing/stats telemetry.

pub mod config;
pub mod telemetry;
