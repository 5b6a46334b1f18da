//! Runtime layer for the WiFi session tools.
//!
//! Runs a batch of inputs through the session pipeline off the async
//! executor and streams progress back to the caller.

pub mod orchestrator;

pub use session_core as core;
pub use session_data as data;
