//! Inference client abstractions for relaybot.
//!
//! - `InferenceClient`: RPITIT trait for concrete backends
//! - `BoxInferenceClient`: object-safe wrapper for dynamic dispatch

pub mod box_client;
pub mod provider;
