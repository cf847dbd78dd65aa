//! RPC Client Module - JSON-RPC chain reader
//!
//! 1. Primary endpoint with optional public fallback
//! 2. Exponential backoff retry with jitter (utils/retry.rs)
//! 3. User-Agent header, gzip compression
//! 4. `eth_call`, `eth_getCode`, `eth_getStorageAt` behind the [`ChainReader`] trait

use alloy_primitives::{Address, Bytes, B256};
use alloy_sol_types::{sol, SolCall};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, USER_AGENT};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::bytecode::scan_selectors;
use super::ChainReader;
use crate::models::config::{mask_url, EngineConfig, RetryPolicy};
use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::utils::constants::{
    EIP1967_ADMIN_SLOT, EIP1967_IMPLEMENTATION_SLOT, USER_AGENT as USER_AGENT_CONST,
};
use crate::utils::retry::with_retry;

sol! {
    function owner() external view returns (address);
}

/// RPC Provider with retry logic and fallback support
#[derive(Clone)]
pub struct RpcProvider {
    /// Primary RPC URL
    primary_url: String,
    /// Fallback RPC URL (public)
    fallback_url: Option<String>,
    /// HTTP client with custom headers (gzip enabled)
    client: reqwest::Client,
    retry: RetryPolicy,
    fetch_timeout: Duration,
}

impl RpcProvider {
    /// Create a provider from engine config
    pub fn new(config: &EngineConfig) -> AppResult<Self> {
        let client = Self::build_client(config.fetch_timeout)?;
        info!(
            "✅ Initialized RPC ({}){}",
            mask_url(&config.rpc_url),
            if config.rpc_fallback_url.is_some() { " with fallback" } else { "" }
        );

        Ok(Self {
            primary_url: config.rpc_url.clone(),
            fallback_url: config.rpc_fallback_url.clone(),
            client,
            retry: config.retry,
            fetch_timeout: config.fetch_timeout,
        })
    }

    /// Build HTTP client with custom headers (gzip compression)
    fn build_client(timeout: Duration) -> AppResult<reqwest::Client> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_CONST));
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));

        reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .gzip(true)
            .build()
            .map_err(|e| {
                AppError::with_source(
                    ErrorCode::ConfigInvalidValue,
                    "Failed to build HTTP client",
                    e,
                )
            })
    }

    /// Execute JSON-RPC call with retry logic and fallback
    pub async fn call<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> AppResult<T> {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let payload = &payload;
        let primary_url = self.primary_url.as_str();
        let primary = with_retry(&self.retry, self.fetch_timeout, method, move || {
            self.execute_call::<T>(primary_url, payload)
        })
        .await;

        let err = match primary {
            Ok(result) => return Ok(result),
            // Only exhausted upstream failures fall through to the fallback
            Err(e) if e.code != ErrorCode::UpstreamUnavailable => return Err(e),
            Err(e) => e,
        };

        let Some(fallback) = self.fallback_url.as_deref() else {
            return Err(err);
        };

        warn!(method, error = %err, "⚠️ Primary RPC failed, trying fallback");
        with_retry(&self.retry, self.fetch_timeout, method, move || {
            self.execute_call::<T>(fallback, payload)
        })
        .await
    }

    /// Execute single RPC call
    async fn execute_call<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> AppResult<T> {
        let response = self.client.post(url).json(payload).send().await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(AppError::upstream_rate_limited());
        }
        if status.is_server_error() {
            return Err(AppError::upstream_unavailable(format!("HTTP error: {}", status)));
        }
        if !status.is_success() {
            return Err(AppError::invalid_response(format!("HTTP error: {}", status)));
        }

        let json: RpcResponse<T> = response.json().await?;

        if let Some(error) = json.error {
            return Err(error.into_app_error());
        }

        json.result
            .ok_or_else(|| AppError::invalid_response("No result in response"))
    }

    /// Execute eth_call against latest state, returns raw return data
    pub async fn eth_call(&self, to: Address, data: &[u8]) -> AppResult<Bytes> {
        let params = serde_json::json!([
            { "to": to, "data": format!("0x{}", hex::encode(data)) },
            "latest"
        ]);
        let raw: String = self.call("eth_call", params).await?;
        decode_hex(&raw)
    }

    /// Read one storage slot
    pub async fn get_storage_at(&self, address: Address, slot: B256) -> AppResult<B256> {
        let params = serde_json::json!([address, slot, "latest"]);
        let raw: String = self.call("eth_getStorageAt", params).await?;
        let bytes = decode_hex(&raw)?;
        if bytes.len() > 32 {
            return Err(AppError::invalid_response(format!(
                "storage word is {} bytes",
                bytes.len()
            )));
        }
        // Left-pad short words
        let mut word = [0u8; 32];
        word[32 - bytes.len()..].copy_from_slice(&bytes);
        Ok(B256::from(word))
    }

    /// Read an address-valued slot, `None` when zero
    async fn get_address_slot(&self, contract: Address, slot: B256) -> AppResult<Option<Address>> {
        let address = Address::from_word(self.get_storage_at(contract, slot).await?);
        Ok((address != Address::ZERO).then_some(address))
    }
}

#[async_trait]
impl ChainReader for RpcProvider {
    async fn get_owner(&self, contract: Address) -> AppResult<Option<Address>> {
        let calldata = ownerCall {}.abi_encode();
        owner_from_call(contract, self.eth_call(contract, &calldata).await)
    }

    async fn get_code(&self, address: Address) -> AppResult<Bytes> {
        let params = serde_json::json!([address, "latest"]);
        let raw: String = self.call("eth_getCode", params).await?;
        decode_hex(&raw)
    }

    async fn get_implementation_slot(&self, contract: Address) -> AppResult<Option<Address>> {
        self.get_address_slot(contract, EIP1967_IMPLEMENTATION_SLOT).await
    }

    async fn get_admin_slot(&self, contract: Address) -> AppResult<Option<Address>> {
        self.get_address_slot(contract, EIP1967_ADMIN_SLOT).await
    }

    async fn decode_abi(&self, contract: Address) -> AppResult<Vec<[u8; 4]>> {
        let code = self.get_code(contract).await?;
        scan_selectors(&code)
    }
}

/// A revert means the contract has no `owner()`; every other failure propagates
fn owner_from_call(contract: Address, result: AppResult<Bytes>) -> AppResult<Option<Address>> {
    match result {
        Ok(data) => Ok(decode_owner(&data)),
        Err(e) if e.code == ErrorCode::ExecutionReverted => {
            debug!(%contract, error = %e, "owner() reverted");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Decode `owner()` return data; anything but a single address word means no owner
fn decode_owner(data: &[u8]) -> Option<Address> {
    ownerCall::abi_decode_returns(data, true)
        .ok()
        .map(|ret| ret._0)
}

fn decode_hex(raw: &str) -> AppResult<Bytes> {
    let stripped = raw.strip_prefix("0x").unwrap_or(raw);
    hex::decode(stripped)
        .map(Bytes::from)
        .map_err(|e| {
            AppError::with_source(
                ErrorCode::UpstreamInvalidResponse,
                "invalid hex in RPC result",
                e,
            )
        })
}

/// JSON-RPC response structure
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

/// JSON-RPC error structure
#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    /// Check if this is a rate limit error (HTTP 429 equivalent or code -32005)
    pub fn is_rate_limit(&self) -> bool {
        self.code == -32005 || self.message.to_lowercase().contains("rate limit")
    }

    /// Check if the call reverted (code 3 or an "execution reverted" message)
    pub fn is_revert(&self) -> bool {
        self.code == 3 || self.message.to_lowercase().contains("execution reverted")
    }

    fn into_app_error(self) -> AppError {
        let message = format!("RPC error: {} (code: {})", self.message, self.code);
        if self.is_rate_limit() {
            AppError::upstream_rate_limited()
        } else if self.is_revert() {
            AppError::execution_reverted(message)
        } else {
            AppError::invalid_response(message)
        }
    }
}
