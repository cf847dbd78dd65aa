//! Integration tests for the scoring engine against in-memory collaborators

use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use token_score::models::{
    Analyzer, CategoryRisk, DecodeStatus, FetchScope, HolderEntry, HolderSet, KnownLabel,
    PermissionCategory, RetryPolicy, RiskTier, TransferRecord, TransferWindow,
};
use token_score::providers::encode_submit_score;
use token_score::utils::{selector_of, with_retry, DEAD_ADDRESS};
use token_score::{
    AnalysisOptions, AppError, AppResult, ChainReader, DataSource, ErrorCode, ScoreReport,
    ScoringEngine, ScoringPolicy,
};

// ============================================
// Mock collaborators
// ============================================

#[derive(Default)]
struct MockData {
    holders: Vec<HolderEntry>,
    total_holders: u64,
    transfers: Vec<TransferRecord>,
    labels: HashMap<Address, KnownLabel>,
    holder_calls: AtomicU32,
}

#[async_trait]
impl DataSource for MockData {
    async fn fetch_holders(&self, _token: Address, _scope: FetchScope) -> AppResult<HolderSet> {
        self.holder_calls.fetch_add(1, Ordering::SeqCst);
        HolderSet::new(self.holders.clone(), self.total_holders)
    }

    async fn fetch_transfers(
        &self,
        _token: Address,
        _window: TransferWindow,
    ) -> AppResult<Vec<TransferRecord>> {
        Ok(self.transfers.clone())
    }

    async fn classify_label(&self, address: Address) -> AppResult<Option<KnownLabel>> {
        Ok(self.labels.get(&address).copied())
    }
}

/// Indexer whose holder endpoint is down, retried with the production policy
#[derive(Default)]
struct DownIndexer {
    attempts: AtomicU32,
}

#[async_trait]
impl DataSource for DownIndexer {
    async fn fetch_holders(&self, _token: Address, _scope: FetchScope) -> AppResult<HolderSet> {
        let attempts = &self.attempts;
        with_retry(
            &RetryPolicy::default(),
            Duration::from_secs(10),
            "fetch_holders",
            move || async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<HolderSet, _>(AppError::upstream_unavailable("connection refused"))
            },
        )
        .await
    }

    async fn fetch_transfers(
        &self,
        _token: Address,
        _window: TransferWindow,
    ) -> AppResult<Vec<TransferRecord>> {
        Ok(Vec::new())
    }

    async fn classify_label(&self, _address: Address) -> AppResult<Option<KnownLabel>> {
        Ok(None)
    }
}

#[derive(Default)]
struct MockChain {
    owner: Option<Address>,
    implementation: Option<Address>,
    admin: Option<Address>,
    code: HashMap<Address, Bytes>,
    /// Contracts missing here fail to decode
    selectors: HashMap<Address, Vec<[u8; 4]>>,
}

#[async_trait]
impl ChainReader for MockChain {
    async fn get_owner(&self, _contract: Address) -> AppResult<Option<Address>> {
        Ok(self.owner)
    }

    async fn get_code(&self, address: Address) -> AppResult<Bytes> {
        Ok(self.code.get(&address).cloned().unwrap_or_default())
    }

    async fn get_implementation_slot(&self, _contract: Address) -> AppResult<Option<Address>> {
        Ok(self.implementation)
    }

    async fn get_admin_slot(&self, _contract: Address) -> AppResult<Option<Address>> {
        Ok(self.admin)
    }

    async fn decode_abi(&self, contract: Address) -> AppResult<Vec<[u8; 4]>> {
        self.selectors
            .get(&contract)
            .cloned()
            .ok_or_else(|| AppError::decode_failure("no PUSH4 dispatcher"))
    }
}

// ============================================
// Fixtures
// ============================================

fn addr(n: u32) -> Address {
    let mut bytes = [0u8; 20];
    bytes[16..].copy_from_slice(&n.to_be_bytes());
    Address::from(bytes)
}

fn token() -> Address {
    Address::repeat_byte(0x77)
}

fn erc20_selectors() -> Vec<[u8; 4]> {
    [
        "transfer(address,uint256)",
        "transferFrom(address,address,uint256)",
        "approve(address,uint256)",
        "balanceOf(address)",
        "owner()",
    ]
    .iter()
    .map(|s| selector_of(s))
    .collect()
}

/// 1000 receivers minted once each; the first `contracts` of them have code
fn mint_feed(count: u32, contracts: u32) -> Vec<TransferRecord> {
    (0..count)
        .map(|i| TransferRecord {
            hash: format!("0x{:064x}", i),
            block_number: 1_000 + i as u64,
            timestamp: 1_700_000_000 + i as u64,
            from: Address::ZERO,
            to: addr(i + 1),
            value: 10.0,
            from_is_contract: false,
            to_is_contract: i < contracts,
            method: Some("transfer".to_string()),
        })
        .collect()
}

/// Ten holders at 4.52% each
fn distributed_holders() -> Vec<HolderEntry> {
    (0..10)
        .map(|i| HolderEntry {
            address: addr(i + 1),
            balance: 4_520.0,
            percentage: 4.52,
            is_contract: false,
        })
        .collect()
}

fn clean_data() -> MockData {
    MockData {
        holders: distributed_holders(),
        total_holders: 1_000,
        transfers: mint_feed(1_000, 97),
        ..Default::default()
    }
}

fn renounced_chain() -> MockChain {
    MockChain {
        owner: Some(DEAD_ADDRESS),
        selectors: HashMap::from([(token(), erc20_selectors())]),
        ..Default::default()
    }
}

fn engine(data: MockData, chain: MockChain) -> ScoringEngine {
    ScoringEngine::new(Arc::new(data), Arc::new(chain))
}

async fn analyze(engine: &ScoringEngine) -> AppResult<ScoreReport> {
    engine
        .analyze(&token().to_string(), AnalysisOptions::default())
        .await
}

fn tag_keys(report: &ScoreReport) -> Vec<&'static str> {
    report.risk_tags.iter().map(|t| t.key).collect()
}

// ============================================
// Scenarios
// ============================================

#[tokio::test]
async fn test_organic_distributed_renounced_token_is_safe() {
    let report = analyze(&engine(clean_data(), renounced_chain())).await.unwrap();

    let eoa = &report.scores.eoa;
    assert_eq!(eoa.metrics.total_addresses, 1_000);
    assert_eq!(eoa.metrics.unique_eoa_count, 903);
    assert_eq!(eoa.metrics.eoa_percentage, 90.3);
    assert_eq!(eoa.score, 40.0);

    let holder = &report.scores.holder;
    assert_eq!(holder.metrics.top10_percentage, 45.2);
    assert_eq!(holder.score, 28.19);

    let permission = &report.scores.permission;
    assert_eq!(permission.score, 30.0);
    assert!(permission.metrics.is_renounced);
    assert!(permission.metrics.dangerous_functions.is_empty());

    assert_eq!(report.overview.total_score, 98.19);
    assert_eq!(report.overview.risk_level, RiskTier::Safe);
    assert_eq!(
        tag_keys(&report),
        vec!["ORGANIC_GROWTH", "DISTRIBUTED", "SAFE_CONTRACT"]
    );

    let submit = report.submit_data;
    assert_eq!(submit.target, token());
    assert_eq!(submit.total_score, 98);
    assert_eq!(submit.risk_level, 0);
}

#[tokio::test]
async fn test_active_owner_with_mint_and_blacklist() {
    let mut selectors = erc20_selectors();
    selectors.push(selector_of("mint(address,uint256)"));
    selectors.push(selector_of("blacklist(address)"));
    let chain = MockChain {
        owner: Some(addr(0xbeef)),
        selectors: HashMap::from([(token(), selectors)]),
        ..Default::default()
    };

    let report = analyze(&engine(clean_data(), chain)).await.unwrap();
    let permission = &report.scores.permission;

    assert!(permission.score < 30.0);
    assert_eq!(permission.score, 5.0);
    assert_eq!(permission.risk_level, CategoryRisk::HighRisk);
    assert_eq!(
        permission.metrics.categories(),
        vec![PermissionCategory::Minting, PermissionCategory::Blacklist]
    );

    let summary = &permission.metrics.risk_summary;
    assert_eq!(summary.len(), 3);
    assert!(summary[0].starts_with("Active owner"));
    assert!(summary[1].starts_with("MINTING"));
    assert!(summary[2].starts_with("BLACKLIST"));

    assert!(tag_keys(&report).contains(&"RUG_RISK"));
}

#[tokio::test]
async fn test_empty_holder_set() {
    let data = MockData {
        holders: Vec::new(),
        total_holders: 0,
        transfers: mint_feed(10, 0),
        ..Default::default()
    };
    let report = analyze(&engine(data, renounced_chain())).await.unwrap();

    let holder = &report.scores.holder;
    assert_eq!(holder.score, 0.0);
    assert_eq!(holder.metrics.top10_percentage, 0.0);
    assert_eq!(holder.metrics.total_holders, 0);
    assert!(holder.metrics.top10_holders.is_empty());
    assert_eq!(holder.risk_level, CategoryRisk::Unknown);
    assert_eq!(report.overview.total_score, 70.0);
}

#[tokio::test(start_paused = true)]
async fn test_upstream_down_fails_whole_request() {
    let data = Arc::new(DownIndexer::default());
    let engine = ScoringEngine::new(data.clone(), Arc::new(renounced_chain()));

    let err = analyze(&engine).await.unwrap_err();

    assert_eq!(err.code, ErrorCode::UpstreamUnavailable);
    assert_eq!(err.analyzer, Some(Analyzer::Holder));
    assert!(err.to_string().contains("holder"));
    assert_eq!(data.attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_analysis_is_idempotent() {
    let engine = engine(clean_data(), renounced_chain());

    let mut first = analyze(&engine).await.unwrap();
    let mut second = analyze(&engine).await.unwrap();
    first.timestamp.clear();
    second.timestamp.clear();

    assert_eq!(first, second);
    assert_eq!(
        encode_submit_score(&first.submit_data),
        encode_submit_score(&second.submit_data)
    );
}

#[tokio::test]
async fn test_invalid_address_rejected_before_fetch() {
    let data = Arc::new(clean_data());
    let engine = ScoringEngine::new(data.clone(), Arc::new(renounced_chain()));

    let err = engine
        .analyze("0x1234", AnalysisOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::InvalidAddress);
    assert_eq!(err.code.exit_code(), 2);
    assert_eq!(data.holder_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_inconsistent_holder_shares() {
    let mut data = clean_data();
    data.holders[0].percentage = 80.0;

    let err = analyze(&engine(data, renounced_chain())).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InconsistentData);
    assert_eq!(err.analyzer, Some(Analyzer::Holder));
    assert_eq!(err.code.exit_code(), 3);
}

#[tokio::test]
async fn test_undecodable_interface() {
    let chain = MockChain {
        owner: Some(DEAD_ADDRESS),
        ..Default::default()
    };
    let report = analyze(&engine(clean_data(), chain)).await.unwrap();
    let permission = &report.scores.permission;

    assert_eq!(permission.metrics.decode_status, DecodeStatus::Failed);
    assert_eq!(permission.score, 20.0);
    assert_eq!(permission.risk_level, CategoryRisk::Unknown);
    assert!(tag_keys(&report).contains(&"UNVERIFIED_INTERFACE"));
}

#[tokio::test]
async fn test_proxy_inspects_implementation() {
    let implementation = addr(0x1111);
    let multisig = addr(0x2222);
    let admin = addr(0x3333);
    let chain = MockChain {
        owner: Some(multisig),
        implementation: Some(implementation),
        admin: Some(admin),
        code: HashMap::from([(multisig, Bytes::from_static(&[0x60, 0x80]))]),
        selectors: HashMap::from([
            (token(), vec![selector_of("upgradeTo(address)")]),
            (implementation, erc20_selectors()),
        ]),
    };
    let report = analyze(&engine(clean_data(), chain)).await.unwrap();
    let profile = &report.scores.permission.metrics;

    assert!(profile.is_proxy);
    assert!(profile.is_multisig);
    assert_eq!(profile.implementation, Some(implementation));
    assert_eq!(profile.proxy_admin, Some(admin));
    assert_eq!(profile.categories(), vec![PermissionCategory::Upgrade]);
    // 30 - 5 (multisig) - 5 (upgrade)
    assert_eq!(report.scores.permission.score, 20.0);

    let summary = &profile.risk_summary;
    assert!(summary[0].starts_with("Active owner"));
    assert!(summary[1].contains("multisig"));
    assert!(summary[2].starts_with("Upgradeable proxy"));
    assert!(summary[3].starts_with("Proxy admin"));
    assert!(summary[4].starts_with("UPGRADE"));

    let keys = tag_keys(&report);
    assert!(keys.contains(&"RUG_RISK"));
    assert!(keys.contains(&"UPGRADEABLE"));
}

#[tokio::test]
async fn test_fallback_proxy_exposes_implementation_mint() {
    let implementation = addr(0x1111);
    // proxy bytecode has no dispatcher; only the implementation decodes
    let chain = MockChain {
        owner: Some(DEAD_ADDRESS),
        implementation: Some(implementation),
        selectors: HashMap::from([(
            implementation,
            vec![
                selector_of("mint(address,uint256)"),
                selector_of("transfer(address,uint256)"),
            ],
        )]),
        ..Default::default()
    };
    let report = analyze(&engine(clean_data(), chain)).await.unwrap();
    let permission = &report.scores.permission;

    assert_eq!(permission.metrics.decode_status, DecodeStatus::Decoded);
    assert_eq!(
        permission.metrics.categories(),
        vec![PermissionCategory::Minting]
    );
    // 30 - 5 (minting)
    assert_eq!(permission.score, 25.0);

    let keys = tag_keys(&report);
    assert!(keys.contains(&"RUG_RISK"));
    assert!(keys.contains(&"UPGRADEABLE"));
    assert!(!keys.contains(&"UNVERIFIED_INTERFACE"));
}

#[tokio::test]
async fn test_undecodable_implementation() {
    let implementation = addr(0x1111);
    let chain = MockChain {
        owner: Some(DEAD_ADDRESS),
        implementation: Some(implementation),
        selectors: HashMap::from([(token(), erc20_selectors())]),
        ..Default::default()
    };
    let report = analyze(&engine(clean_data(), chain)).await.unwrap();
    let permission = &report.scores.permission;

    assert_eq!(permission.metrics.decode_status, DecodeStatus::Failed);
    assert_eq!(permission.score, 20.0);
    assert!(tag_keys(&report).contains(&"UNVERIFIED_INTERFACE"));
}

#[tokio::test]
async fn test_labelled_addresses_are_not_users() {
    let mut data = clean_data();
    data.transfers = mint_feed(4, 0);
    data.labels = HashMap::from([(addr(1), KnownLabel::Dex), (addr(2), KnownLabel::SmartMoney)]);

    let report = analyze(&engine(data, renounced_chain())).await.unwrap();
    let metrics = &report.scores.eoa.metrics;

    // addr(1) DEX, addr(2) smart money, addr(3..4) plain EOAs
    assert_eq!(metrics.total_addresses, 4);
    assert_eq!(metrics.unique_eoa_count, 2);
    assert_eq!(metrics.eoa_percentage, 50.0);
}

#[test]
fn test_policy_over_100_rejected() {
    let policy = ScoringPolicy {
        eoa_max: 50.0,
        ..Default::default()
    };
    let err = ScoringEngine::with_policy(
        Arc::new(clean_data()),
        Arc::new(renounced_chain()),
        policy,
    )
    .err()
    .unwrap();
    assert_eq!(err.code, ErrorCode::ConfigInvalidValue);

    assert!(ScoringEngine::with_policy(
        Arc::new(clean_data()),
        Arc::new(renounced_chain()),
        ScoringPolicy::default(),
    )
    .is_ok());
}

#[tokio::test]
async fn test_request_deadline() {
    struct SlowChain;

    #[async_trait]
    impl ChainReader for SlowChain {
        async fn get_owner(&self, _contract: Address) -> AppResult<Option<Address>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(None)
        }
        async fn get_code(&self, _address: Address) -> AppResult<Bytes> {
            Ok(Bytes::new())
        }
        async fn get_implementation_slot(&self, _contract: Address) -> AppResult<Option<Address>> {
            Ok(None)
        }
        async fn get_admin_slot(&self, _contract: Address) -> AppResult<Option<Address>> {
            Ok(None)
        }
        async fn decode_abi(&self, _contract: Address) -> AppResult<Vec<[u8; 4]>> {
            Ok(erc20_selectors())
        }
    }

    tokio::time::pause();
    let engine = ScoringEngine::new(Arc::new(clean_data()), Arc::new(SlowChain))
        .with_request_timeout(Duration::from_secs(5));

    let err = analyze(&engine).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::RequestTimeout);
}
