//! Observability for relaybot: tracing subscriber setup and OTel export.

pub mod tracing_setup;
