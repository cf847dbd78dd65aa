//! Holder Concentration Analyzer
//!
//! Scores how much of the supply the ten largest holders control. Also reports a
//! Gini coefficient over every fetched balance and the number of contract holders.

use crate::models::config::ScoringPolicy;
use crate::models::types::{CategoryRisk, HolderMetrics, HolderScore, HolderSet, TopHolder};
use crate::utils::constants::{short_address, TOP_HOLDER_COUNT};

/// Gini coefficient of a balance distribution, in [0, 1].
/// 0 = perfectly equal, 1 = one address holds everything.
pub fn gini_coefficient(balances: &[f64]) -> f64 {
    let n = balances.len();
    if n == 0 {
        return 0.0;
    }

    let mut sorted = balances.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let total: f64 = sorted.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }

    let n_f = n as f64;
    let weighted: f64 = sorted
        .iter()
        .enumerate()
        .map(|(i, balance)| (2.0 * (i as f64 + 1.0) - n_f - 1.0) * balance)
        .sum();

    (weighted / (n_f * total)).abs().min(1.0)
}

/// Share of supply held by the first `TOP_HOLDER_COUNT` holders
pub fn top10_percentage(holders: &HolderSet) -> f64 {
    let sum: f64 = holders.top(TOP_HOLDER_COUNT).iter().map(|h| h.percentage).sum();
    sum.clamp(0.0, 100.0)
}

pub fn analyze_holders(holders: &HolderSet, policy: &ScoringPolicy) -> HolderScore {
    let top10 = top10_percentage(holders);

    let balances: Vec<f64> = holders.entries().iter().map(|h| h.balance).collect();
    let top10_holders = holders
        .top(TOP_HOLDER_COUNT)
        .iter()
        .enumerate()
        .map(|(i, h)| TopHolder {
            rank: i + 1,
            address: h.address,
            address_short: short_address(&h.address),
            balance: h.balance,
            percentage: round2(h.percentage),
        })
        .collect();

    let metrics = HolderMetrics {
        total_holders: holders.total_holders(),
        top10_percentage: round2(top10),
        gini_coefficient: round4(gini_coefficient(&balances)),
        contract_holders: holders.entries().iter().filter(|h| h.is_contract).count() as u64,
        top10_holders,
    };

    // No holders is no evidence of distribution
    let (score, risk_level) = if holders.is_empty() {
        (0.0, CategoryRisk::Unknown)
    } else {
        (policy.holder_points(top10), policy.holder_risk(top10))
    };

    HolderScore {
        name: "Holder Distribution",
        name_cn: "持仓分布",
        score: round2(score),
        max_score: policy.holder_max,
        risk_level,
        metrics,
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
