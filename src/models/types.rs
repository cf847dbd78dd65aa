//! Type definitions for the token scoring engine
//! All snapshot entities, analyzer outputs and the final report

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::errors::{AppError, AppResult};
use crate::utils::constants::HOLDER_PERCENT_TOLERANCE;

// ============================================
// ADDRESS CLASSIFICATION
// ============================================

/// Behavioral class assigned to an address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressClass {
    Eoa,
    Bot,
    Dex,
    Cex,
    SmartMoney,
    Contract,
    Unknown,
}

impl AddressClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eoa => "eoa",
            Self::Bot => "bot",
            Self::Dex => "dex",
            Self::Cex => "cex",
            Self::SmartMoney => "smart_money",
            Self::Contract => "contract",
            Self::Unknown => "unknown",
        }
    }
}

/// Label supplied by an external labeling service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnownLabel {
    Dex,
    Cex,
    SmartMoney,
}

impl KnownLabel {
    pub fn class(&self) -> AddressClass {
        match self {
            Self::Dex => AddressClass::Dex,
            Self::Cex => AddressClass::Cex,
            Self::SmartMoney => AddressClass::SmartMoney,
        }
    }
}

/// Behavioral features of one address, aggregated from the transfer feed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddressRecord {
    pub address: Address,
    pub balance: f64,
    pub inbound_volume: f64,
    pub outbound_volume: f64,
    pub tx_count: u64,
    /// Unix seconds
    pub first_seen: u64,
    /// Unix seconds
    pub last_seen: u64,
    pub counterparties: u64,
    pub has_code: bool,
    pub label: Option<KnownLabel>,
    pub class: AddressClass,
}

impl AddressRecord {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            balance: 0.0,
            inbound_volume: 0.0,
            outbound_volume: 0.0,
            tx_count: 0,
            first_seen: u64::MAX,
            last_seen: 0,
            counterparties: 0,
            has_code: false,
            label: None,
            class: AddressClass::Unknown,
        }
    }

    /// Seconds between first and last seen, zero for a single sighting
    pub fn active_span_secs(&self) -> u64 {
        self.last_seen.saturating_sub(self.first_seen)
    }
}

// ============================================
// RAW FEED RECORDS
// ============================================

/// One token transfer / interaction from the indexer feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub hash: String,
    pub block_number: u64,
    /// Unix seconds
    pub timestamp: u64,
    pub from: Address,
    pub to: Address,
    /// Token units (decimals applied)
    pub value: f64,
    pub from_is_contract: bool,
    pub to_is_contract: bool,
    pub method: Option<String>,
}

/// One holder row as returned by the data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolderEntry {
    pub address: Address,
    /// Token units (decimals applied)
    pub balance: f64,
    /// Share of the total-supply denominator, 0-100
    pub percentage: f64,
    pub is_contract: bool,
}

/// Holders sorted descending by balance
///
/// Construction validates the snapshot: every balance and share must be finite
/// and non-negative and the shares may not sum above 100% plus tolerance.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HolderSet {
    entries: Vec<HolderEntry>,
    /// Total number of holders reported by the source (may exceed `entries.len()`)
    total_holders: u64,
}

impl HolderSet {
    pub fn new(mut entries: Vec<HolderEntry>, total_holders: u64) -> AppResult<Self> {
        let mut share_sum = 0.0;
        for entry in &entries {
            if !entry.balance.is_finite() || entry.balance < 0.0 {
                return Err(AppError::inconsistent(format!(
                    "holder {} has invalid balance {}",
                    entry.address, entry.balance
                )));
            }
            if !entry.percentage.is_finite() || entry.percentage < 0.0 {
                return Err(AppError::inconsistent(format!(
                    "holder {} has invalid share {}",
                    entry.address, entry.percentage
                )));
            }
            share_sum += entry.percentage;
        }

        if share_sum > 100.0 + HOLDER_PERCENT_TOLERANCE {
            return Err(AppError::inconsistent(format!(
                "holder shares sum to {:.4}%",
                share_sum
            )));
        }

        // Stable sort keeps source order for equal balances
        entries.sort_by(|a, b| b.balance.total_cmp(&a.balance));

        let total_holders = total_holders.max(entries.len() as u64);
        Ok(Self {
            entries,
            total_holders,
        })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[HolderEntry] {
        &self.entries
    }

    /// First `n` holders by balance
    pub fn top(&self, n: usize) -> &[HolderEntry] {
        &self.entries[..n.min(self.entries.len())]
    }

    pub fn total_holders(&self) -> u64 {
        self.total_holders
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================
// FETCH PARAMETERS
// ============================================

/// How many holders to pull from the data source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchScope {
    /// First page(s) up to this many holders
    Limit(usize),
    /// Paginate until exhausted (capped)
    All,
}

/// Transfer feed window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferWindow {
    /// Only transfers newer than `now - hours`; `None` = no time bound
    pub hours: Option<u64>,
    /// Maximum records to pull
    pub limit: usize,
}

/// Caller-facing options for one analysis request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisOptions {
    /// Holder / transfer page budget
    pub limit: usize,
    /// Paginate holders until exhausted
    pub fetch_all: bool,
    /// Restrict the transfer feed to the last N hours
    pub window_hours: Option<u64>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            limit: crate::utils::constants::DEFAULT_FETCH_LIMIT,
            fetch_all: false,
            window_hours: None,
        }
    }
}

impl AnalysisOptions {
    pub fn holder_scope(&self) -> FetchScope {
        if self.fetch_all {
            FetchScope::All
        } else {
            FetchScope::Limit(self.limit)
        }
    }

    pub fn transfer_window(&self) -> TransferWindow {
        TransferWindow {
            hours: self.window_hours,
            limit: self.limit,
        }
    }
}

// ============================================
// PERMISSIONS
// ============================================

/// Privileged capability families that let an owner hurt holders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionCategory {
    Minting,
    Blacklist,
    Pausing,
    FeeSetting,
    Upgrade,
}

impl PermissionCategory {
    /// Table order, also the order of summary lines
    pub const ALL: [PermissionCategory; 5] = [
        Self::Minting,
        Self::Blacklist,
        Self::Pausing,
        Self::FeeSetting,
        Self::Upgrade,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minting => "MINTING",
            Self::Blacklist => "BLACKLIST",
            Self::Pausing => "PAUSING",
            Self::FeeSetting => "FEE_SETTING",
            Self::Upgrade => "UPGRADE",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Minting => "owner can mint new supply",
            Self::Blacklist => "owner can blacklist holders",
            Self::Pausing => "owner can pause transfers",
            Self::FeeSetting => "owner can change transfer fees",
            Self::Upgrade => "contract logic can be replaced",
        }
    }
}

impl fmt::Display for PermissionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dangerous function found in the bytecode dispatcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DangerousFunction {
    pub category: PermissionCategory,
    pub signature: String,
    /// 0x-prefixed 4-byte selector
    pub selector: String,
}

/// Whether the contract interface could be recovered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeStatus {
    Decoded,
    Failed,
}

/// Result of permission inspection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PermissionProfile {
    pub owner: Option<Address>,
    pub has_owner: bool,
    pub is_renounced: bool,
    pub is_multisig: bool,
    pub is_proxy: bool,
    pub implementation: Option<Address>,
    /// EIP-1967 proxy admin, when set
    pub proxy_admin: Option<Address>,
    pub dangerous_functions: Vec<DangerousFunction>,
    pub decode_status: DecodeStatus,
    pub risk_summary: Vec<String>,
}

impl PermissionProfile {
    /// Distinct categories in table order
    pub fn categories(&self) -> Vec<PermissionCategory> {
        PermissionCategory::ALL
            .into_iter()
            .filter(|c| self.dangerous_functions.iter().any(|f| f.category == *c))
            .collect()
    }
}

// ============================================
// SCORES
// ============================================

/// Risk level of one scoring category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryRisk {
    LowRisk,
    MediumRisk,
    HighRisk,
    Unknown,
}

impl CategoryRisk {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LowRisk => "low_risk",
            Self::MediumRisk => "medium_risk",
            Self::HighRisk => "high_risk",
            Self::Unknown => "unknown",
        }
    }
}

/// Wash-activity warning level derived from bot volume share
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WashLevel {
    Low,
    Medium,
    High,
}

/// One scored category with its metrics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryScore<M> {
    pub name: &'static str,
    pub name_cn: &'static str,
    pub score: f64,
    pub max_score: f64,
    pub risk_level: CategoryRisk,
    pub metrics: M,
}

/// How interaction counts spread across addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InteractionShape {
    Distributed,
    Moderate,
    Concentrated,
    HighlyConcentrated,
}

impl InteractionShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Distributed => "DISTRIBUTED",
            Self::Moderate => "MODERATE",
            Self::Concentrated => "CONCENTRATED",
            Self::HighlyConcentrated => "HIGHLY_CONCENTRATED",
        }
    }

    pub fn label_cn(&self) -> &'static str {
        match self {
            Self::Distributed => "分散型",
            Self::Moderate => "适度分散型",
            Self::Concentrated => "集中型",
            Self::HighlyConcentrated => "高度集中型",
        }
    }
}

/// Risk read from the interaction shape, raised by bot volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShapeRisk {
    Low,
    Medium,
    MediumHigh,
    High,
}

/// One row of the top-interactor table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopInteractor {
    pub address: Address,
    pub interaction_count: u64,
    pub class: AddressClass,
}

/// Activity / EOA metrics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EoaMetrics {
    pub total_addresses: u64,
    pub unique_eoa_count: u64,
    pub eoa_percentage: f64,
    pub events_count: u64,
    pub bot_address_ratio: f64,
    pub bot_volume_ratio: f64,
    pub wash_level: WashLevel,
    pub class_distribution: BTreeMap<AddressClass, u64>,
    /// Share of all interactions made by the most active address
    pub top1_ratio: f64,
    /// Share of all interactions made by the most active 10% of addresses
    pub top10_percent_ratio: f64,
    pub shape: InteractionShape,
    pub shape_risk: ShapeRisk,
    pub top_interactors: Vec<TopInteractor>,
}

/// One row of the top-holder table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopHolder {
    pub rank: usize,
    pub address: Address,
    pub address_short: String,
    pub balance: f64,
    pub percentage: f64,
}

/// Holder concentration metrics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HolderMetrics {
    pub total_holders: u64,
    pub top10_percentage: f64,
    pub gini_coefficient: f64,
    pub contract_holders: u64,
    pub top10_holders: Vec<TopHolder>,
}

pub type EoaScore = CategoryScore<EoaMetrics>;
pub type HolderScore = CategoryScore<HolderMetrics>;
pub type PermissionScore = CategoryScore<PermissionProfile>;

// ============================================
// REPORT
// ============================================

/// Overall risk tier of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Safe,
    Medium,
    High,
    Extreme,
}

impl RiskTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Extreme => "extreme",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Safe => "Low Risk",
            Self::Medium => "Medium Risk",
            Self::High => "High Risk",
            Self::Extreme => "Extreme Risk",
        }
    }

    pub fn label_cn(&self) -> &'static str {
        match self {
            Self::Safe => "低风险",
            Self::Medium => "中等风险",
            Self::High => "高风险",
            Self::Extreme => "极高风险",
        }
    }

    /// Get color code for UI
    pub fn color(&self) -> &'static str {
        match self {
            Self::Safe => "#22c55e",    // Green
            Self::Medium => "#eab308",  // Yellow
            Self::High => "#f97316",    // Orange
            Self::Extreme => "#ef4444", // Red
        }
    }

    /// Numeric level used by the on-chain registry
    pub fn as_u8(&self) -> u8 {
        match self {
            Self::Safe => 0,
            Self::Medium => 1,
            Self::High => 2,
            Self::Extreme => 3,
        }
    }
}

/// Badge style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TagType {
    Success,
    Warning,
    Danger,
}

/// Category a tag belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TagCategory {
    Activity,
    Holder,
    Permission,
}

/// A display badge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskTag {
    pub key: &'static str,
    pub label: &'static str,
    pub label_cn: &'static str,
    #[serde(rename = "type")]
    pub tag_type: TagType,
    pub category: TagCategory,
}

/// Headline of the report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub total_score: f64,
    pub max_score: f64,
    pub risk_level: RiskTier,
    pub risk_label: &'static str,
    pub risk_label_cn: &'static str,
    pub risk_color: &'static str,
}

/// Per-category breakdown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scores {
    pub eoa: EoaScore,
    pub holder: HolderScore,
    pub permission: PermissionScore,
}

/// Integer payload for the on-chain score registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitPayload {
    pub target: Address,
    pub total_score: u8,
    pub eoa_score: u8,
    pub holder_score: u8,
    pub permission_score: u8,
    pub risk_level: u8,
}

/// Full scoring report for one token
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreReport {
    pub token_address: Address,
    /// RFC 3339 generation time
    pub timestamp: String,
    pub overview: Overview,
    pub risk_tags: Vec<RiskTag>,
    pub scores: Scores,
    pub submit_data: SubmitPayload,
}
