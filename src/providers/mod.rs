//! Providers Module - External Data Sources
//!
//! The engine consumes two collaborators through async traits:
//! - [`DataSource`]: holder lists, transfer feed, address labels (REST indexer)
//! - [`ChainReader`]: owner, code, proxy slots, dispatcher selectors (JSON-RPC)
//!
//! Concrete clients live in the submodules; tests plug in in-memory mocks.

pub mod bytecode;
pub mod indexer;
pub mod registry;
pub mod rpc;

use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;

use crate::models::errors::AppResult;
use crate::models::types::{FetchScope, HolderSet, KnownLabel, TransferRecord, TransferWindow};

pub use bytecode::scan_selectors;
pub use indexer::IndexerClient;
pub use registry::encode_submit_score;
pub use rpc::RpcProvider;

/// Indexed token data
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Holders of `token`, sorted descending by balance
    async fn fetch_holders(&self, token: Address, scope: FetchScope) -> AppResult<HolderSet>;

    /// Transfers touching `token` inside `window`
    async fn fetch_transfers(
        &self,
        token: Address,
        window: TransferWindow,
    ) -> AppResult<Vec<TransferRecord>>;

    /// External label for `address`, `None` when unlabeled
    async fn classify_label(&self, address: Address) -> AppResult<Option<KnownLabel>>;
}

/// Read-only chain state
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Result of `owner()`; `None` when the contract has no owner function
    async fn get_owner(&self, contract: Address) -> AppResult<Option<Address>>;

    /// Deployed bytecode, empty for EOAs
    async fn get_code(&self, address: Address) -> AppResult<Bytes>;

    /// Address stored in the EIP-1967 implementation slot, `None` when unset
    async fn get_implementation_slot(&self, contract: Address) -> AppResult<Option<Address>>;

    /// Address stored in the EIP-1967 admin slot, `None` when unset
    async fn get_admin_slot(&self, contract: Address) -> AppResult<Option<Address>>;

    /// Function selectors found in the contract dispatcher.
    /// Fails with `DECODE_FAILURE` when no interface can be recovered.
    async fn decode_abi(&self, contract: Address) -> AppResult<Vec<[u8; 4]>>;
}
