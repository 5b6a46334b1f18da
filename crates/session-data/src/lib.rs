//! Data layer for the WiFi session tools.
//!
//! Discovers and reads input tables, runs the session pipeline (loading,
//! segmentation, aggregation, assembly) and writes the results out as a
//! workbook or JSON.

pub mod aggregator;
pub mod analysis;
pub mod assembler;
pub mod loader;
pub mod reader;
pub mod segmenter;
pub mod writer;

pub use session_core as core;
