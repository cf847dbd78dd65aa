//! Token Score Library
//!
//! Deterministic risk scoring for a single ERC-20 style token from three
//! independent angles:
//! - Holder concentration (top-10 share, Gini)
//! - Genuine-user activity (EOA ratio, bot / wash detection)
//! - Contract permissions (owner, proxy, dangerous privileged functions)
//!
//! The three category scores are combined into a 0-100 total, a risk tier,
//! display tags and an integer payload for an on-chain score registry.

pub mod core;
pub mod models;
pub mod providers;
pub mod utils;

pub use crate::core::{ScoreComposer, ScoringEngine};
pub use models::{
    AnalysisOptions, AppError, AppResult, EngineConfig, ErrorCode, ScoreReport, ScoringPolicy,
};
pub use providers::{ChainReader, DataSource};
