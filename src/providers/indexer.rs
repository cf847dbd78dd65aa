//! Indexer Client Module - REST token indexer
//!
//! Endpoints (all `GET`, envelope `{code, message, result}`, auth via `x-api-key`):
//! - `token/holders?contractAddress&pageIndex&pageSize` - paginated holder list
//! - `account/transactions?address&limit&cursor` - cursor-paginated interactions, newest first
//! - `account/labels?address` - external labels for one address

use alloy_primitives::Address;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use super::DataSource;
use crate::models::config::{EngineConfig, RetryPolicy};
use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::models::types::{
    FetchScope, HolderEntry, HolderSet, KnownLabel, TransferRecord, TransferWindow,
};
use crate::utils::constants::{
    FETCH_ALL_CAP, INDEXER_API_KEY_HEADER, INDEXER_MAX_PAGE_SIZE, USER_AGENT as USER_AGENT_CONST,
};
use crate::utils::retry::with_retry;

/// Response envelope shared by every endpoint
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    result: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
struct HolderPage {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    data: Vec<HolderItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HolderItem {
    #[serde(alias = "accountAddress")]
    holder: String,
    #[serde(default)]
    amount: serde_json::Value,
    #[serde(default)]
    percentage: serde_json::Value,
    #[serde(default)]
    is_contract: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionPage {
    #[serde(default)]
    data: Vec<TransactionItem>,
    #[serde(default)]
    next_page_cursor: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddressInfo {
    #[serde(default)]
    is_contract: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionItem {
    #[serde(default)]
    hash: String,
    #[serde(default)]
    block_number: u64,
    /// Milliseconds
    #[serde(default)]
    timestamp: u64,
    #[serde(default)]
    from: String,
    #[serde(default)]
    to: String,
    #[serde(default)]
    value: serde_json::Value,
    #[serde(default)]
    from_address: AddressInfo,
    #[serde(default)]
    to_address: AddressInfo,
    #[serde(default)]
    method_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LabelResult {
    #[serde(default)]
    labels: Vec<String>,
}

/// REST indexer client implementing [`DataSource`]
#[derive(Clone)]
pub struct IndexerClient {
    base_url: String,
    client: reqwest::Client,
    retry: RetryPolicy,
    fetch_timeout: Duration,
}

impl IndexerClient {
    /// Create a client from engine config; requires `INDEXER_API_KEY`
    pub fn new(config: &EngineConfig) -> AppResult<Self> {
        let api_key = config
            .indexer_api_key
            .as_deref()
            .ok_or_else(|| AppError::missing_env("INDEXER_API_KEY"))?;

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_CONST));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let mut key = HeaderValue::from_str(api_key)
            .map_err(|_| AppError::invalid_config("INDEXER_API_KEY contains invalid characters"))?;
        key.set_sensitive(true);
        headers.insert(INDEXER_API_KEY_HEADER, key);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.fetch_timeout)
            .gzip(true)
            .build()
            .map_err(|e| {
                AppError::with_source(
                    ErrorCode::ConfigInvalidValue,
                    "Failed to build HTTP client",
                    e,
                )
            })?;

        info!("✅ Initialized indexer client ({})", config.indexer_base_url);
        Ok(Self {
            base_url: config.indexer_base_url.trim_end_matches('/').to_string(),
            client,
            retry: config.retry,
            fetch_timeout: config.fetch_timeout,
        })
    }

    /// GET an endpoint with retry and unwrap the envelope
    async fn get<T: DeserializeOwned + Default>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> AppResult<T> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let url = url.as_str();
        with_retry(&self.retry, self.fetch_timeout, endpoint, move || {
            self.execute_get::<T>(url, query)
        })
        .await
    }

    async fn execute_get<T: DeserializeOwned + Default>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> AppResult<T> {
        let response = self.client.get(url).query(query).send().await?;

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

        let envelope: Envelope<T> = response.json().await?;
        unwrap_envelope(envelope)
    }

    async fn holder_page(
        &self,
        token: Address,
        page_index: usize,
        page_size: usize,
    ) -> AppResult<HolderPage> {
        self.get(
            "token/holders",
            &[
                ("contractAddress", token.to_string()),
                ("pageIndex", page_index.to_string()),
                ("pageSize", page_size.to_string()),
            ],
        )
        .await
    }

    async fn transaction_page(
        &self,
        token: Address,
        limit: usize,
        cursor: Option<&str>,
    ) -> AppResult<TransactionPage> {
        let mut query = vec![("address", token.to_string()), ("limit", limit.to_string())];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_string()));
        }
        self.get("account/transactions", &query).await
    }
}

#[async_trait]
impl DataSource for IndexerClient {
    async fn fetch_holders(&self, token: Address, scope: FetchScope) -> AppResult<HolderSet> {
        let wanted = match scope {
            FetchScope::Limit(n) => n.min(FETCH_ALL_CAP),
            FetchScope::All => FETCH_ALL_CAP,
        };
        let page_size = wanted.clamp(1, INDEXER_MAX_PAGE_SIZE);

        let mut entries: Vec<HolderEntry> = Vec::new();
        let mut total = 0u64;
        let mut page_index = 1usize;

        while entries.len() < wanted {
            let page = self.holder_page(token, page_index, page_size).await?;
            total = total.max(page.total);
            let fetched = page.data.len();
            for item in page.data {
                entries.push(holder_from_item(item)?);
            }
            debug!(%token, page_index, fetched, "holder page");

            if fetched < page_size || (total > 0 && entries.len() as u64 >= total) {
                break;
            }
            page_index += 1;
        }

        entries.truncate(wanted);
        HolderSet::new(entries, total)
    }

    async fn fetch_transfers(
        &self,
        token: Address,
        window: TransferWindow,
    ) -> AppResult<Vec<TransferRecord>> {
        let wanted = window.limit.min(FETCH_ALL_CAP);
        let since = window.hours.map(|hours| {
            let now = chrono::Utc::now().timestamp().max(0) as u64;
            now.saturating_sub(hours.saturating_mul(3600))
        });

        let mut records: Vec<TransferRecord> = Vec::new();
        let mut cursor: Option<String> = None;

        'pages: while records.len() < wanted {
            let page_limit = (wanted - records.len()).clamp(1, INDEXER_MAX_PAGE_SIZE);
            let page = self.transaction_page(token, page_limit, cursor.as_deref()).await?;
            if page.data.is_empty() {
                break;
            }

            for item in page.data {
                let record = transfer_from_item(item)?;
                if let Some(since) = since {
                    // Newest first: the first record outside the window ends the scan
                    if record.timestamp < since {
                        break 'pages;
                    }
                }
                records.push(record);
                if records.len() >= wanted {
                    break 'pages;
                }
            }

            cursor = page.next_page_cursor.filter(|c| !c.is_empty());
            if cursor.is_none() {
                break;
            }
        }

        debug!(%token, count = records.len(), "transfer feed fetched");
        Ok(records)
    }

    async fn classify_label(&self, address: Address) -> AppResult<Option<KnownLabel>> {
        let result: LabelResult = self
            .get("account/labels", &[("address", address.to_string())])
            .await?;
        Ok(label_from_tags(&result.labels))
    }
}

fn unwrap_envelope<T: Default>(envelope: Envelope<T>) -> AppResult<T> {
    if envelope.code != 0 {
        return Err(AppError::invalid_response(format!(
            "indexer error {}: {}",
            envelope.code, envelope.message
        )));
    }
    Ok(envelope.result.unwrap_or_default())
}

/// Numeric field that may arrive as a JSON number or a decimal string
fn parse_decimal(field: &str, value: &serde_json::Value) -> AppResult<f64> {
    match value {
        serde_json::Value::Null => Ok(0.0),
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| AppError::invalid_response(format!("{} is not a number", field))),
        serde_json::Value::String(s) if s.trim().is_empty() => Ok(0.0),
        serde_json::Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| AppError::invalid_response(format!("{} is not a number: {:?}", field, s))),
        other => Err(AppError::invalid_response(format!(
            "{} has unexpected type: {}",
            field, other
        ))),
    }
}

fn parse_address(field: &str, raw: &str) -> AppResult<Address> {
    if raw.is_empty() {
        return Ok(Address::ZERO);
    }
    Address::from_str(raw)
        .map_err(|_| AppError::invalid_response(format!("{} is not an address: {:?}", field, raw)))
}

fn holder_from_item(item: HolderItem) -> AppResult<HolderEntry> {
    Ok(HolderEntry {
        address: parse_address("holder", &item.holder)?,
        balance: parse_decimal("amount", &item.amount)?,
        percentage: parse_decimal("percentage", &item.percentage)?,
        is_contract: item.is_contract,
    })
}

fn transfer_from_item(item: TransactionItem) -> AppResult<TransferRecord> {
    Ok(TransferRecord {
        hash: item.hash,
        block_number: item.block_number,
        timestamp: item.timestamp / 1000,
        from: parse_address("from", &item.from)?,
        to: parse_address("to", &item.to)?,
        value: parse_decimal("value", &item.value)?,
        from_is_contract: item.from_address.is_contract,
        to_is_contract: item.to_address.is_contract,
        method: item.method_name.filter(|m| !m.is_empty()),
    })
}

/// Map free-form indexer tags onto the label classes the classifier knows
fn label_from_tags(tags: &[String]) -> Option<KnownLabel> {
    let lowered: Vec<String> = tags.iter().map(|t| t.to_lowercase()).collect();
    let has = |needles: &[&str]| lowered.iter().any(|t| needles.iter().any(|n| t.contains(n)));

    if has(&["dex", "pool", "router", "amm", "pair"]) {
        Some(KnownLabel::Dex)
    } else if has(&["cex", "exchange", "hot wallet", "deposit"]) {
        Some(KnownLabel::Cex)
    } else if has(&["smart money", "smart_money", "fund", "whale"]) {
        Some(KnownLabel::SmartMoney)
    } else {
        None
    }
}
