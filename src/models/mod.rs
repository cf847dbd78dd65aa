//! Models Module - Data Structures & Configuration
//!
//! Snapshot types, report types, error taxonomy and engine configuration.

pub mod config;
pub mod errors;
pub mod types;

pub use config::*;
pub use errors::*;
pub use types::*;
