//! Shared building blocks for the WiFi session tools.
//!
//! Holds the data model (raw tables, signal records, sessions), the error
//! taxonomy, timestamp and cell parsing, rounding and label helpers, and the
//! command-line settings.

pub mod data_processors;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
