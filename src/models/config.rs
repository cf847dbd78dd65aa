//! Configuration module for the scoring engine
//!
//! Runtime endpoints come from the environment; every weight and threshold the
//! analyzers use lives in [`ScoringPolicy`] so callers can inject their own.
//! Defaults are taken from utils/constants.rs.

use std::time::Duration;
use tracing::info;

use super::errors::{AppError, AppResult};
use super::types::{CategoryRisk, RiskTier, WashLevel};
use crate::utils::constants::{
    DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_INDEXER_BASE_URL, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_RPC_URL, RETRY_BASE_DELAY_MS, RETRY_JITTER_PERCENT, RETRY_MAX_ATTEMPTS,
    RETRY_MAX_DELAY_MS,
};

// ============================================
// BOT HEURISTIC
// ============================================

/// Thresholds of the behavioral bot rule. An address is a bot only when every
/// condition holds.
#[derive(Debug, Clone, PartialEq)]
pub struct BotHeuristic {
    /// Minimum transactions in the window
    pub min_tx_count: u64,
    /// Maximum average seconds between transactions
    pub max_avg_interval_secs: f64,
    /// Maximum balance as a fraction of inbound volume
    pub max_holding_ratio: f64,
    /// Maximum distinct counterparties
    pub max_counterparties: u64,
}

impl Default for BotHeuristic {
    fn default() -> Self {
        Self {
            min_tx_count: 50,
            max_avg_interval_secs: 60.0,
            max_holding_ratio: 0.01,
            max_counterparties: 5,
        }
    }
}

// ============================================
// SCORING POLICY
// ============================================

/// Category weights, curve breakpoints and tier thresholds
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringPolicy {
    pub eoa_max: f64,
    pub holder_max: f64,
    pub permission_max: f64,

    /// Top-10 share at or below which holders are well distributed
    pub holder_low_pct: f64,
    /// Top-10 share above which holders are highly concentrated
    pub holder_high_pct: f64,

    /// EOA share below which activity is high risk
    pub eoa_low_pct: f64,
    /// EOA share at which activity earns full points
    pub eoa_high_pct: f64,

    /// Bot volume share that raises a MEDIUM wash warning
    pub wash_medium_pct: f64,
    /// Bot volume share that raises a HIGH wash warning
    pub wash_high_pct: f64,

    pub eoa_owner_penalty: f64,
    pub multisig_owner_penalty: f64,
    pub category_penalty: f64,
    pub decode_failure_penalty: f64,
    /// Permission score at or above which the contract is low risk
    pub permission_low_risk: f64,
    /// Permission score at or above which the contract is medium risk
    pub permission_medium_risk: f64,

    pub tier_safe: f64,
    pub tier_medium: f64,
    pub tier_high: f64,

    pub bot: BotHeuristic,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            eoa_max: 40.0,
            holder_max: 30.0,
            permission_max: 30.0,
            holder_low_pct: 50.0,
            holder_high_pct: 80.0,
            eoa_low_pct: 50.0,
            eoa_high_pct: 85.0,
            wash_medium_pct: 20.0,
            wash_high_pct: 50.0,
            eoa_owner_penalty: 15.0,
            multisig_owner_penalty: 5.0,
            category_penalty: 5.0,
            decode_failure_penalty: 10.0,
            permission_low_risk: 25.0,
            permission_medium_risk: 15.0,
            tier_safe: 80.0,
            tier_medium: 60.0,
            tier_high: 40.0,
            bot: BotHeuristic::default(),
        }
    }
}

impl ScoringPolicy {
    pub fn max_total(&self) -> f64 {
        self.eoa_max + self.holder_max + self.permission_max
    }

    /// Overall tier for a total score
    pub fn tier(&self, total: f64) -> RiskTier {
        if total >= self.tier_safe {
            RiskTier::Safe
        } else if total >= self.tier_medium {
            RiskTier::Medium
        } else if total >= self.tier_high {
            RiskTier::High
        } else {
            RiskTier::Extreme
        }
    }

    /// Holder points for a top-10 share, non-increasing and clamped to `[0, holder_max]`
    pub fn holder_points(&self, top10_pct: f64) -> f64 {
        let p = top10_pct.clamp(0.0, 100.0);
        let max = self.holder_max;
        // Breakpoint values scale with holder_max: 30 -> 28 -> 10 -> 0
        let at_low = max * 28.0 / 30.0;
        let at_high = max * 10.0 / 30.0;

        let points = if p <= self.holder_low_pct {
            max - (max - at_low) * p / self.holder_low_pct
        } else if p <= self.holder_high_pct {
            at_low - (at_low - at_high) * (p - self.holder_low_pct)
                / (self.holder_high_pct - self.holder_low_pct)
        } else {
            at_high - at_high * (p - self.holder_high_pct) / (100.0 - self.holder_high_pct)
        };
        points.clamp(0.0, max)
    }

    pub fn holder_risk(&self, top10_pct: f64) -> CategoryRisk {
        if top10_pct < self.holder_low_pct {
            CategoryRisk::LowRisk
        } else if top10_pct <= self.holder_high_pct {
            CategoryRisk::MediumRisk
        } else {
            CategoryRisk::HighRisk
        }
    }

    /// EOA points for a genuine-user share, non-decreasing, max `eoa_max`
    pub fn eoa_points(&self, eoa_pct: f64) -> f64 {
        let p = eoa_pct.clamp(0.0, 100.0);
        let half = self.eoa_max / 2.0;
        let points = if p < self.eoa_low_pct {
            half * p / self.eoa_low_pct
        } else if p < self.eoa_high_pct {
            half + (p - self.eoa_low_pct) * half / (self.eoa_high_pct - self.eoa_low_pct)
        } else {
            self.eoa_max
        };
        points.clamp(0.0, self.eoa_max)
    }

    pub fn eoa_risk(&self, eoa_pct: f64) -> CategoryRisk {
        if eoa_pct > self.eoa_high_pct {
            CategoryRisk::LowRisk
        } else if eoa_pct >= self.eoa_low_pct {
            CategoryRisk::MediumRisk
        } else {
            CategoryRisk::HighRisk
        }
    }

    pub fn wash_level(&self, bot_volume_pct: f64) -> WashLevel {
        if bot_volume_pct >= self.wash_high_pct {
            WashLevel::High
        } else if bot_volume_pct >= self.wash_medium_pct {
            WashLevel::Medium
        } else {
            WashLevel::Low
        }
    }

    pub fn permission_risk(&self, score: f64) -> CategoryRisk {
        if score >= self.permission_low_risk {
            CategoryRisk::LowRisk
        } else if score >= self.permission_medium_risk {
            CategoryRisk::MediumRisk
        } else {
            CategoryRisk::HighRisk
        }
    }

    /// Reject policies whose breakpoints would break curve monotonicity
    pub fn validate(&self) -> AppResult<()> {
        let ordered = 0.0 < self.holder_low_pct
            && self.holder_low_pct < self.holder_high_pct
            && self.holder_high_pct < 100.0
            && 0.0 < self.eoa_low_pct
            && self.eoa_low_pct < self.eoa_high_pct
            && self.eoa_high_pct <= 100.0
            && self.wash_medium_pct <= self.wash_high_pct
            && self.tier_high <= self.tier_medium
            && self.tier_medium <= self.tier_safe
            && self.permission_medium_risk <= self.permission_low_risk;
        if !ordered {
            return Err(AppError::invalid_config(
                "scoring policy thresholds are not ordered",
            ));
        }
        if self.max_total() > 100.0
            || self.eoa_max < 0.0
            || self.holder_max < 0.0
            || self.permission_max < 0.0
        {
            return Err(AppError::invalid_config(
                "category maxima must be non-negative and sum to at most 100",
            ));
        }
        Ok(())
    }
}

// ============================================
// RETRY POLICY
// ============================================

/// Bounded exponential backoff with jitter for upstream fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter_percent: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: RETRY_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
            max_delay: Duration::from_millis(RETRY_MAX_DELAY_MS),
            jitter_percent: RETRY_JITTER_PERCENT,
        }
    }
}

// ============================================
// ENGINE CONFIG
// ============================================

/// Endpoints, timeouts and policies for one engine instance
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// JSON-RPC endpoint for chain reads
    pub rpc_url: String,
    /// Optional public fallback endpoint
    pub rpc_fallback_url: Option<String>,
    /// REST indexer base URL
    pub indexer_base_url: String,
    /// Indexer API key (never logged)
    pub indexer_api_key: Option<String>,
    /// Timeout of a single upstream call
    pub fetch_timeout: Duration,
    /// Deadline of a whole `analyze` call
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    pub policy: ScoringPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            rpc_fallback_url: None,
            indexer_base_url: DEFAULT_INDEXER_BASE_URL.to_string(),
            indexer_api_key: None,
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
            policy: ScoringPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Build config from environment variables, falling back to defaults
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = get("SCORE_RPC_URL") {
            config.rpc_url = url;
        }
        config.rpc_fallback_url = get("SCORE_RPC_FALLBACK_URL");
        if let Some(url) = get("INDEXER_BASE_URL") {
            config.indexer_base_url = url.trim_end_matches('/').to_string();
        }

        config.indexer_api_key = get("INDEXER_API_KEY").filter(|k| k != "YOUR_API_KEY");
        if config.indexer_api_key.is_some() {
            info!("🔑 INDEXER_API_KEY configured (key hidden)");
        }

        if let Some(raw) = get("SCORE_FETCH_TIMEOUT_SECS") {
            config.fetch_timeout =
                Duration::from_secs(parse_positive("SCORE_FETCH_TIMEOUT_SECS", &raw)?);
        }
        if let Some(raw) = get("SCORE_REQUEST_TIMEOUT_SECS") {
            config.request_timeout =
                Duration::from_secs(parse_positive("SCORE_REQUEST_TIMEOUT_SECS", &raw)?);
        }
        if let Some(raw) = get("SCORE_MAX_RETRIES") {
            let attempts = parse_positive("SCORE_MAX_RETRIES", &raw)?;
            config.retry.max_attempts = u32::try_from(attempts)
                .map_err(|_| AppError::invalid_config("SCORE_MAX_RETRIES is too large"))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        for (key, url) in [
            ("SCORE_RPC_URL", &self.rpc_url),
            ("INDEXER_BASE_URL", &self.indexer_base_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(AppError::invalid_config(format!(
                    "{} must be an http(s) URL",
                    key
                )));
            }
        }
        if self.fetch_timeout > self.request_timeout {
            return Err(AppError::invalid_config(
                "fetch timeout must not exceed request timeout",
            ));
        }
        self.policy.validate()
    }

    /// RPC URL with any path credentials masked, safe for logs
    pub fn masked_rpc_url(&self) -> String {
        mask_url(&self.rpc_url)
    }
}

fn parse_positive(key: &str, raw: &str) -> AppResult<u64> {
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(AppError::invalid_config(format!(
            "{} must be a positive integer, got {:?}",
            key, raw
        ))),
    }
}

/// Hide everything after the host, API keys usually live in the path
pub fn mask_url(url: &str) -> String {
    let scheme_end = url.find("://").map(|i| i + 3).unwrap_or(0);
    match url[scheme_end..].find('/') {
        Some(slash) if scheme_end + slash + 1 < url.len() => {
            format!("{}/***HIDDEN***", &url[..scheme_end + slash])
        }
        _ => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::errors::ErrorCode;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_holder_curve_breakpoints() {
        let policy = ScoringPolicy::default();
        assert!((policy.holder_points(0.0) - 30.0).abs() < 1e-9);
        assert!((policy.holder_points(50.0) - 28.0).abs() < 1e-9);
        assert!((policy.holder_points(80.0) - 10.0).abs() < 1e-9);
        assert!((policy.holder_points(100.0) - 0.0).abs() < 1e-9);
        assert!((policy.holder_points(45.2) - 28.192).abs() < 1e-9);
        assert!((policy.holder_points(65.0) - 19.0).abs() < 1e-9);
    }

    #[test]
    fn test_holder_curve_non_increasing() {
        let policy = ScoringPolicy::default();
        let mut last = f64::MAX;
        for step in 0..=1000 {
            let points = policy.holder_points(step as f64 / 10.0);
            assert!(points <= last + 1e-12);
            assert!((0.0..=30.0).contains(&points));
            last = points;
        }
    }

    #[test]
    fn test_eoa_curve() {
        let policy = ScoringPolicy::default();
        assert_eq!(policy.eoa_points(0.0), 0.0);
        assert!((policy.eoa_points(25.0) - 10.0).abs() < 1e-9);
        assert!((policy.eoa_points(50.0) - 20.0).abs() < 1e-9);
        assert!((policy.eoa_points(67.5) - 30.0).abs() < 1e-9);
        assert_eq!(policy.eoa_points(85.0), 40.0);
        assert_eq!(policy.eoa_points(100.0), 40.0);
    }

    #[test]
    fn test_tiers() {
        let policy = ScoringPolicy::default();
        assert_eq!(policy.tier(100.0), RiskTier::Safe);
        assert_eq!(policy.tier(80.0), RiskTier::Safe);
        assert_eq!(policy.tier(79.99), RiskTier::Medium);
        assert_eq!(policy.tier(60.0), RiskTier::Medium);
        assert_eq!(policy.tier(45.0), RiskTier::High);
        assert_eq!(policy.tier(39.0), RiskTier::Extreme);
    }

    #[test]
    fn test_category_levels() {
        let policy = ScoringPolicy::default();
        assert_eq!(policy.holder_risk(45.2), CategoryRisk::LowRisk);
        assert_eq!(policy.holder_risk(80.0), CategoryRisk::MediumRisk);
        assert_eq!(policy.holder_risk(80.1), CategoryRisk::HighRisk);
        assert_eq!(policy.eoa_risk(90.3), CategoryRisk::LowRisk);
        assert_eq!(policy.eoa_risk(85.0), CategoryRisk::MediumRisk);
        assert_eq!(policy.eoa_risk(49.9), CategoryRisk::HighRisk);
        assert_eq!(policy.permission_risk(30.0), CategoryRisk::LowRisk);
        assert_eq!(policy.permission_risk(15.0), CategoryRisk::MediumRisk);
        assert_eq!(policy.permission_risk(5.0), CategoryRisk::HighRisk);
        assert_eq!(policy.wash_level(55.0), WashLevel::High);
        assert_eq!(policy.wash_level(20.0), WashLevel::Medium);
        assert_eq!(policy.wash_level(3.0), WashLevel::Low);
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(120));
        assert_eq!(config.retry.max_attempts, 3);
        assert!(config.indexer_api_key.is_none());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("SCORE_RPC_URL", "https://rpc.example.org/v2/secret"),
            ("INDEXER_BASE_URL", "https://indexer.example.org/v2/"),
            ("INDEXER_API_KEY", "k"),
            ("SCORE_MAX_RETRIES", "5"),
            ("SCORE_FETCH_TIMEOUT_SECS", "3"),
        ]))
        .unwrap();
        assert_eq!(config.indexer_base_url, "https://indexer.example.org/v2");
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.fetch_timeout, Duration::from_secs(3));
        assert_eq!(config.masked_rpc_url(), "https://rpc.example.org/***HIDDEN***");
    }

    #[test]
    fn test_from_lookup_rejects_bad_values() {
        let err = EngineConfig::from_lookup(lookup(&[("SCORE_MAX_RETRIES", "zero")])).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidValue);

        let err = EngineConfig::from_lookup(lookup(&[("SCORE_RPC_URL", "ftp://x")])).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidValue);
    }
}
