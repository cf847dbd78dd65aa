//! Utils Module - Helper Functions & Shared Utilities
//!
//! Constants table and the retry helper shared by every upstream client.

pub mod constants;
pub mod retry;

pub use constants::*;
pub use retry::*;
