//! Score registry call encoding
//!
//! Builds `submitScore` calldata for the on-chain registry from a report's
//! [`SubmitPayload`]. Signing and sending are left to the caller's wallet.

use alloy_primitives::Bytes;
use alloy_sol_types::{sol, SolCall};

use crate::models::types::SubmitPayload;

sol! {
    function submitScore(
        address target,
        uint8 totalScore,
        uint8 eoaScore,
        uint8 holderScore,
        uint8 permissionScore,
        uint8 riskLevel
    ) external;
}

/// ABI-encoded `submitScore(address,uint8,uint8,uint8,uint8,uint8)` call
pub fn encode_submit_score(payload: &SubmitPayload) -> Bytes {
    submitScoreCall {
        target: payload.target,
        totalScore: payload.total_score,
        eoaScore: payload.eoa_score,
        holderScore: payload.holder_score,
        permissionScore: payload.permission_score,
        riskLevel: payload.risk_level,
    }
    .abi_encode()
    .into()
}
