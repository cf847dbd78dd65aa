//! Permission Inspector
//!
//! Reads owner, proxy slot and dispatcher selectors through a [`ChainReader`]
//! and scores how much control a privileged party retains over holders.
//!
//! Scoring starts at the category max and subtracts:
//! - active EOA owner: `eoa_owner_penalty`
//! - active contract owner (multisig / DAO): `multisig_owner_penalty`
//! - each distinct dangerous category: `category_penalty`
//! - undecodable interface: `decode_failure_penalty`
//!
//! Proxies are flagged but not penalized on their own. Their implementation's
//! selectors are inspected alongside whatever the proxy's own bytecode exposes;
//! a bare fallback proxy only needs a decodable implementation.

use alloy_primitives::Address;
use std::collections::BTreeSet;
use std::future::Future;
use tracing::{debug, warn};

use crate::models::config::ScoringPolicy;
use crate::models::errors::{AppResult, ErrorCode};
use crate::models::types::{
    CategoryRisk, DangerousFunction, DecodeStatus, PermissionCategory, PermissionProfile,
    PermissionScore,
};
use crate::providers::ChainReader;
use crate::utils::constants::{is_burn_address, DANGEROUS_SELECTORS};

/// Raw chain facts the score is computed from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PermissionFacts {
    pub owner: Option<Address>,
    /// Owner address has deployed code
    pub owner_has_code: bool,
    pub implementation: Option<Address>,
    pub proxy_admin: Option<Address>,
    /// `None` when the interface could not be decoded
    pub selectors: Option<BTreeSet<[u8; 4]>>,
}

/// Gather permission facts for `token`
pub async fn collect_facts(reader: &dyn ChainReader, token: Address) -> AppResult<PermissionFacts> {
    let (owner, implementation, own_selectors) = tokio::try_join!(
        reader.get_owner(token),
        reader.get_implementation_slot(token),
        absorb_decode_failure(token, reader.decode_abi(token)),
    )?;

    let active_owner = owner.filter(|o| !is_burn_address(o));
    let (owner_has_code, impl_selectors, proxy_admin) = tokio::try_join!(
        async {
            match active_owner {
                Some(o) => reader.get_code(o).await.map(|code| !code.is_empty()),
                None => Ok(false),
            }
        },
        async {
            match implementation {
                Some(i) => absorb_decode_failure(i, reader.decode_abi(i)).await.map(Some),
                None => Ok(None),
            }
        },
        async {
            match implementation {
                Some(_) => reader.get_admin_slot(token).await,
                None => Ok(None),
            }
        },
    )?;

    Ok(PermissionFacts {
        owner,
        owner_has_code,
        implementation,
        proxy_admin,
        selectors: merge_selectors(own_selectors, impl_selectors),
    })
}

/// Interface of the token. A proxy is judged by its implementation, plus any
/// selectors its own bytecode exposes.
fn merge_selectors(
    own: Option<Vec<[u8; 4]>>,
    implementation: Option<Option<Vec<[u8; 4]>>>,
) -> Option<BTreeSet<[u8; 4]>> {
    match implementation {
        None => own.map(|own| own.into_iter().collect()),
        Some(None) => None,
        Some(Some(implementation)) => Some(
            own.unwrap_or_default()
                .into_iter()
                .chain(implementation)
                .collect(),
        ),
    }
}

/// Map `DECODE_FAILURE` to `None`, propagate every other error
async fn absorb_decode_failure<F>(contract: Address, decode: F) -> AppResult<Option<Vec<[u8; 4]>>>
where
    F: Future<Output = AppResult<Vec<[u8; 4]>>>,
{
    match decode.await {
        Ok(selectors) => {
            debug!(%contract, count = selectors.len(), "decoded dispatcher");
            Ok(Some(selectors))
        }
        Err(e) if e.code == ErrorCode::DecodeFailure => {
            warn!(%contract, error = %e, "⚠️ Interface not decodable");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Dangerous functions present in `selectors`, in table order
pub fn match_dangerous(selectors: &BTreeSet<[u8; 4]>) -> Vec<DangerousFunction> {
    DANGEROUS_SELECTORS
        .iter()
        .filter(|entry| selectors.contains(&entry.selector))
        .map(|entry| DangerousFunction {
            category: entry.category,
            signature: entry.signature.to_string(),
            selector: format!("0x{}", hex::encode(entry.selector)),
        })
        .collect()
}

/// Score permission facts
pub fn assess_permissions(facts: &PermissionFacts, policy: &ScoringPolicy) -> PermissionScore {
    let has_owner = facts.owner.is_some();
    let is_renounced = facts.owner.map(|o| is_burn_address(&o)).unwrap_or(false);
    let active_owner = facts.owner.filter(|_| !is_renounced);
    let is_multisig = active_owner.is_some() && facts.owner_has_code;
    let is_proxy = facts.implementation.is_some();
    let decode_status = if facts.selectors.is_some() {
        DecodeStatus::Decoded
    } else {
        DecodeStatus::Failed
    };
    let dangerous_functions = facts
        .selectors
        .as_ref()
        .map(match_dangerous)
        .unwrap_or_default();

    let mut score = policy.permission_max;
    let mut risk_summary = Vec::new();

    // owner
    if let Some(owner) = active_owner {
        score -= if is_multisig {
            policy.multisig_owner_penalty
        } else {
            policy.eoa_owner_penalty
        };
        risk_summary.push(format!(
            "Active owner {} can call privileged functions",
            owner
        ));
    }

    // renounce
    if let (true, Some(owner)) = (is_renounced, facts.owner) {
        risk_summary.push(format!("Ownership renounced to {}", owner));
    }

    // multisig
    if let (true, Some(owner)) = (is_multisig, active_owner) {
        risk_summary.push(format!("Owner {} is a contract (multisig or DAO)", owner));
    }

    // proxy
    if let Some(implementation) = facts.implementation {
        risk_summary.push(format!(
            "Upgradeable proxy, implementation at {}",
            implementation
        ));
        if let Some(admin) = facts.proxy_admin {
            risk_summary.push(format!("Proxy admin {} can swap the implementation", admin));
        }
    }

    // decode
    if decode_status == DecodeStatus::Failed {
        score -= policy.decode_failure_penalty;
        risk_summary.push("Contract interface could not be decoded".to_string());
    }

    // one line per category, table order
    for category in PermissionCategory::ALL
        .iter()
        .filter(|c| dangerous_functions.iter().any(|f| f.category == **c))
    {
        score -= policy.category_penalty;
        let signatures: Vec<&str> = dangerous_functions
            .iter()
            .filter(|f| f.category == *category)
            .map(|f| f.signature.as_str())
            .collect();
        risk_summary.push(format!(
            "{}: {} ({})",
            category,
            category.description(),
            signatures.join(", ")
        ));
    }

    let score = score.clamp(0.0, policy.permission_max);
    let risk_level = match decode_status {
        DecodeStatus::Failed => CategoryRisk::Unknown,
        DecodeStatus::Decoded => policy.permission_risk(score),
    };

    PermissionScore {
        name: "Contract Permissions",
        name_cn: "合约权限",
        score,
        max_score: policy.permission_max,
        risk_level,
        metrics: PermissionProfile {
            owner: facts.owner,
            has_owner,
            is_renounced,
            is_multisig,
            is_proxy,
            implementation: facts.implementation,
            proxy_admin: facts.proxy_admin,
            dangerous_functions,
            decode_status,
            risk_summary,
        },
    }
}

/// Collect facts and score them
pub async fn inspect_permissions(
    reader: &dyn ChainReader,
    token: Address,
    policy: &ScoringPolicy,
) -> AppResult<PermissionScore> {
    let facts = collect_facts(reader, token).await?;
    Ok(assess_permissions(&facts, policy))
}
