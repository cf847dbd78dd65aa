//! Constants Module - Single Source of Truth
//!
//! Every address, selector, endpoint default and threshold used across the
//! crate is defined here. Other modules import from this file instead of
//! hardcoding values.

use alloy_primitives::{address, b256, keccak256, Address, B256};
use lazy_static::lazy_static;

use crate::models::types::PermissionCategory;

// ============================================
// APPLICATION CONSTANTS
// ============================================

/// Application name
pub const APP_NAME: &str = "TokenScore";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent for HTTP requests
pub const USER_AGENT: &str = concat!("TokenScore/", env!("CARGO_PKG_VERSION"));

// ============================================
// ENDPOINT DEFAULTS
// ============================================

/// Public JSON-RPC endpoint used when SCORE_RPC_URL is unset
pub const DEFAULT_RPC_URL: &str = "https://ethereum-rpc.publicnode.com";

/// REST indexer used when INDEXER_BASE_URL is unset
pub const DEFAULT_INDEXER_BASE_URL: &str = "https://api.blockvision.org/v2/monad";

/// Indexer auth header
pub const INDEXER_API_KEY_HEADER: &str = "x-api-key";

// ============================================
// TIMEOUTS & RETRY
// ============================================

/// Timeout of a single upstream call (seconds)
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

/// Deadline of a whole analysis request (seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// First retry delay (ms)
pub const RETRY_BASE_DELAY_MS: u64 = 500;

/// Retry delay cap (ms)
pub const RETRY_MAX_DELAY_MS: u64 = 4_000;

/// Total attempts per upstream call, first try included
pub const RETRY_MAX_ATTEMPTS: u32 = 3;

/// Jitter applied to every retry delay (±percent)
pub const RETRY_JITTER_PERCENT: u64 = 20;

// ============================================
// FETCH LIMITS
// ============================================

/// Default holder / transfer budget per request
pub const DEFAULT_FETCH_LIMIT: usize = 100;

/// Indexer page size ceiling
pub const INDEXER_MAX_PAGE_SIZE: usize = 100;

/// Hard cap when paginating "all" records
pub const FETCH_ALL_CAP: usize = 10_000;

/// Label lookups in flight at once
pub const LABEL_LOOKUP_CONCURRENCY: usize = 8;

// ============================================
// SCORING CONSTANTS
// ============================================

/// Holders counted in the concentration share
pub const TOP_HOLDER_COUNT: usize = 10;

/// Allowed rounding slack on summed holder shares (percent points)
pub const HOLDER_PERCENT_TOLERANCE: f64 = 0.5;

/// Rows in the top-interactor table
pub const TOP_INTERACTOR_COUNT: usize = 10;

/// Top-10%-of-addresses interaction share thresholds for the shape tiers
pub const SHAPE_MODERATE_PCT: f64 = 40.0;
pub const SHAPE_CONCENTRATED_PCT: f64 = 60.0;
pub const SHAPE_HIGHLY_CONCENTRATED_PCT: f64 = 80.0;

// ============================================
// CHAIN CONSTANTS
// ============================================

/// Burn address commonly used for renounced ownership
pub const DEAD_ADDRESS: Address = address!("000000000000000000000000000000000000dEaD");

/// EIP-1967 implementation slot: bytes32(uint256(keccak256("eip1967.proxy.implementation")) - 1)
pub const EIP1967_IMPLEMENTATION_SLOT: B256 =
    b256!("360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc");

/// EIP-1967 admin slot: bytes32(uint256(keccak256("eip1967.proxy.admin")) - 1)
pub const EIP1967_ADMIN_SLOT: B256 =
    b256!("b53127684a568b3173ae13b9f8a6016e243e63b6e8ee1178d6a717850b5d6103");

/// PUSH4 opcode, precedes selectors in the Solidity dispatcher
pub const OP_PUSH4: u8 = 0x63;

/// PUSH1..PUSH32 opcode range
pub const OP_PUSH1: u8 = 0x60;
pub const OP_PUSH32: u8 = 0x7f;

/// Owner counts as renounced when it is one of these
#[inline]
pub fn is_burn_address(address: &Address) -> bool {
    *address == Address::ZERO || *address == DEAD_ADDRESS
}

// ============================================
// DANGEROUS FUNCTION TABLE
// ============================================

/// Signatures of privileged functions, grouped by category in table order
pub const DANGEROUS_SIGNATURES: &[(PermissionCategory, &[&str])] = &[
    (
        PermissionCategory::Minting,
        &["mint(address,uint256)", "mint(uint256)", "mintTo(address,uint256)"],
    ),
    (
        PermissionCategory::Blacklist,
        &[
            "blacklist(address)",
            "addToBlacklist(address)",
            "setBlacklist(address,bool)",
            "blacklistAddress(address)",
            "setBots(address[],bool)",
            "setBot(address,bool)",
            "addBot(address)",
        ],
    ),
    (
        PermissionCategory::Pausing,
        &["pause()", "unpause()", "setTradingEnabled(bool)"],
    ),
    (
        PermissionCategory::FeeSetting,
        &[
            "setTaxFee(uint256)",
            "setTax(uint256)",
            "setFee(uint256)",
            "setFees(uint256,uint256)",
        ],
    ),
    (
        PermissionCategory::Upgrade,
        &["upgradeTo(address)", "upgradeToAndCall(address,bytes)"],
    ),
];

/// Entry of the precomputed selector table
#[derive(Debug, Clone, Copy)]
pub struct SelectorEntry {
    pub category: PermissionCategory,
    pub signature: &'static str,
    pub selector: [u8; 4],
}

/// First four bytes of keccak256(signature)
pub fn selector_of(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

lazy_static! {
    /// Dangerous selectors in table order
    pub static ref DANGEROUS_SELECTORS: Vec<SelectorEntry> = DANGEROUS_SIGNATURES
        .iter()
        .flat_map(|(category, signatures)| {
            signatures.iter().map(move |signature| SelectorEntry {
                category: *category,
                signature,
                selector: selector_of(signature),
            })
        })
        .collect();
}

/// Shorten an address for display: 0x1234...abcd
pub fn short_address(address: &Address) -> String {
    let full = address.to_checksum(None);
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}
