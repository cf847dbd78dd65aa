//! Scoring Engine
//!
//! Entry point of a scoring request. Parses the token address, runs the three
//! analyzer pipelines concurrently against their collaborators and hands the
//! results to the [`ScoreComposer`]. Fail-fast: the first pipeline error
//! cancels the others and is returned tagged with its analyzer.

use alloy_primitives::Address;
use futures_util::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use super::activity::analyze_activity;
use super::classifier::{build_records, AddressClassifier};
use super::composer::ScoreComposer;
use super::holder::analyze_holders;
use super::permission::inspect_permissions;
use crate::models::config::{EngineConfig, ScoringPolicy};
use crate::models::errors::{Analyzer, AppError, AppResult};
use crate::models::types::{AnalysisOptions, EoaScore, HolderScore, PermissionScore, ScoreReport};
use crate::providers::{ChainReader, DataSource, IndexerClient, RpcProvider};
use crate::utils::constants::{DEFAULT_REQUEST_TIMEOUT_SECS, LABEL_LOOKUP_CONCURRENCY};

/// Parse a `0x`-prefixed 40-hex-digit address
pub fn parse_token_address(input: &str) -> AppResult<Address> {
    let trimmed = input.trim();
    let hex_part = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| AppError::invalid_address(format!("missing 0x prefix: {}", input)))?;

    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AppError::invalid_address(format!(
            "expected 40 hex digits: {}",
            input
        )));
    }

    Address::from_str(hex_part).map_err(|e| AppError::invalid_address(format!("{}: {}", input, e)))
}

/// Token risk scoring engine
#[derive(Clone)]
pub struct ScoringEngine {
    data: Arc<dyn DataSource>,
    chain: Arc<dyn ChainReader>,
    classifier: AddressClassifier,
    composer: ScoreComposer,
    policy: ScoringPolicy,
    request_timeout: Duration,
}

impl ScoringEngine {
    pub fn new(data: Arc<dyn DataSource>, chain: Arc<dyn ChainReader>) -> Self {
        Self::build(data, chain, ScoringPolicy::default())
    }

    /// Engine with a custom policy; rejects policies that fail validation
    pub fn with_policy(
        data: Arc<dyn DataSource>,
        chain: Arc<dyn ChainReader>,
        policy: ScoringPolicy,
    ) -> AppResult<Self> {
        policy.validate()?;
        Ok(Self::build(data, chain, policy))
    }

    fn build(
        data: Arc<dyn DataSource>,
        chain: Arc<dyn ChainReader>,
        policy: ScoringPolicy,
    ) -> Self {
        Self {
            data,
            chain,
            classifier: AddressClassifier::new(policy.bot.clone()),
            composer: ScoreComposer::new(policy.clone()),
            policy,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Overall deadline of one `analyze` call
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Engine backed by the REST indexer and JSON-RPC provider
    pub fn from_config(config: &EngineConfig) -> AppResult<Self> {
        config.validate()?;
        let data = Arc::new(IndexerClient::new(config)?);
        let chain = Arc::new(RpcProvider::new(config)?);
        Ok(Self::with_policy(data, chain, config.policy.clone())?
            .with_request_timeout(config.request_timeout))
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    /// Score one token
    pub async fn analyze(&self, token: &str, options: AnalysisOptions) -> AppResult<ScoreReport> {
        let token = parse_token_address(token)?;
        let request_id = Uuid::new_v4();
        let span = info_span!("analyze", %request_id, %token);

        let deadline = self.request_timeout;
        tokio::time::timeout(deadline, self.run(token, options))
            .instrument(span)
            .await
            .map_err(|_| {
                AppError::request_timeout(format!("analysis of {} exceeded {:?}", token, deadline))
            })?
    }

    async fn run(&self, token: Address, options: AnalysisOptions) -> AppResult<ScoreReport> {
        let start = Instant::now();
        info!("🔍 Scoring token...");

        let (eoa, holder, permission) = tokio::try_join!(
            self.activity_pipeline(token, &options),
            self.holder_pipeline(token, &options),
            self.permission_pipeline(token),
        )?;

        let timestamp = chrono::Utc::now().to_rfc3339();
        let report = self.composer.compose(token, timestamp, eoa, holder, permission);

        info!(
            total = report.overview.total_score,
            tier = report.overview.risk_level.as_str(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "✅ Token scored"
        );
        Ok(report)
    }

    async fn activity_pipeline(
        &self,
        token: Address,
        options: &AnalysisOptions,
    ) -> AppResult<EoaScore> {
        self.score_activity(token, options)
            .await
            .map_err(|e| e.in_analyzer(Analyzer::Activity))
    }

    async fn score_activity(
        &self,
        token: Address,
        options: &AnalysisOptions,
    ) -> AppResult<EoaScore> {
        let transfers = self
            .data
            .fetch_transfers(token, options.transfer_window())
            .await?;
        let mut records = build_records(token, &transfers);
        debug!(
            transfers = transfers.len(),
            addresses = records.len(),
            "built address records"
        );

        let labels: BTreeMap<_, _> = stream::iter(records.iter().map(|r| r.address))
            .map(move |address| async move {
                self.data
                    .classify_label(address)
                    .await
                    .map(|label| (address, label))
            })
            .buffered(LABEL_LOOKUP_CONCURRENCY)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect::<AppResult<_>>()?;

        self.classifier.classify_all(&mut records, &labels);
        Ok(analyze_activity(&records, transfers.len() as u64, &self.policy))
    }

    async fn holder_pipeline(
        &self,
        token: Address,
        options: &AnalysisOptions,
    ) -> AppResult<HolderScore> {
        let holders = self
            .data
            .fetch_holders(token, options.holder_scope())
            .await
            .map_err(|e| e.in_analyzer(Analyzer::Holder))?;
        debug!(
            fetched = holders.entries().len(),
            total = holders.total_holders(),
            "fetched holders"
        );
        Ok(analyze_holders(&holders, &self.policy))
    }

    async fn permission_pipeline(&self, token: Address) -> AppResult<PermissionScore> {
        inspect_permissions(self.chain.as_ref(), token, &self.policy)
            .await
            .map_err(|e| e.in_analyzer(Analyzer::Permission))
    }
}
