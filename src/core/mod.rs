//! Core Module - Scoring Logic
//!
//! Analyzers are pure functions over immutable snapshots; the engine owns
//! collaborator I/O and the request lifecycle.

pub mod activity;
pub mod classifier;
pub mod composer;
pub mod engine;
pub mod holder;
pub mod permission;

pub use activity::{analyze_activity, shape_risk, shape_tier};
pub use classifier::{build_records, is_bot, AddressClassifier};
pub use composer::ScoreComposer;
pub use engine::{parse_token_address, ScoringEngine};
pub use holder::{analyze_holders, gini_coefficient, top10_percentage};
pub use permission::{assess_permissions, collect_facts, inspect_permissions, PermissionFacts};
