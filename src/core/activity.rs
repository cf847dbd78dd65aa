//! Activity / EOA Analyzer
//!
//! Measures how much of the observed activity comes from genuine users and
//! flags wash trading when bots carry a large share of the volume. Also
//! reports the interaction shape: how concentrated transaction counts are
//! across the most active addresses.

use std::collections::BTreeMap;

use super::holder::round2;
use crate::models::config::ScoringPolicy;
use crate::models::types::{
    AddressClass, AddressRecord, EoaMetrics, EoaScore, InteractionShape, ShapeRisk,
    TopInteractor, WashLevel,
};
use crate::utils::constants::{
    SHAPE_CONCENTRATED_PCT, SHAPE_HIGHLY_CONCENTRATED_PCT, SHAPE_MODERATE_PCT,
    TOP_INTERACTOR_COUNT,
};

/// Score classified records. `events_count` is the size of the raw feed.
pub fn analyze_activity(
    records: &[AddressRecord],
    events_count: u64,
    policy: &ScoringPolicy,
) -> EoaScore {
    let total = records.len() as u64;
    let unique_eoa = records
        .iter()
        .filter(|r| r.class == AddressClass::Eoa)
        .count() as u64;
    let eoa_pct = percentage(unique_eoa as f64, total as f64);

    let mut class_distribution: BTreeMap<AddressClass, u64> = BTreeMap::new();
    for record in records {
        *class_distribution.entry(record.class).or_default() += 1;
    }

    let bots: Vec<&AddressRecord> = records
        .iter()
        .filter(|r| r.class == AddressClass::Bot)
        .collect();
    let bot_address_pct = percentage(bots.len() as f64, total as f64);
    let bot_volume_pct = bot_volume_share(records, &bots);
    let wash_level = policy.wash_level(bot_volume_pct);

    let ranked = rank_by_interactions(records);
    let (top1_pct, top10_pct) = interaction_concentration(&ranked);
    let shape = shape_tier(top10_pct);

    let metrics = EoaMetrics {
        total_addresses: total,
        unique_eoa_count: unique_eoa,
        eoa_percentage: round2(eoa_pct),
        events_count,
        bot_address_ratio: round2(bot_address_pct),
        bot_volume_ratio: round2(bot_volume_pct),
        wash_level,
        class_distribution,
        top1_ratio: round2(top1_pct),
        top10_percent_ratio: round2(top10_pct),
        shape,
        shape_risk: shape_risk(shape, wash_level),
        top_interactors: ranked
            .iter()
            .take(TOP_INTERACTOR_COUNT)
            .map(|r| TopInteractor {
                address: r.address,
                interaction_count: r.tx_count,
                class: r.class,
            })
            .collect(),
    };

    EoaScore {
        name: "User Activity",
        name_cn: "用户活跃度",
        score: round2(policy.eoa_points(eoa_pct)),
        max_score: policy.eoa_max,
        risk_level: policy.eoa_risk(eoa_pct),
        metrics,
    }
}

/// Bot share of traded volume; falls back to transaction share when the feed
/// carries no transfer values.
fn bot_volume_share(records: &[AddressRecord], bots: &[&AddressRecord]) -> f64 {
    let volume = |r: &AddressRecord| r.inbound_volume + r.outbound_volume;
    let total_volume: f64 = records.iter().map(volume).sum();
    if total_volume > 0.0 {
        let bot_volume: f64 = bots.iter().map(|r| volume(*r)).sum();
        return percentage(bot_volume, total_volume);
    }

    let total_tx: u64 = records.iter().map(|r| r.tx_count).sum();
    let bot_tx: u64 = bots.iter().map(|r| r.tx_count).sum();
    percentage(bot_tx as f64, total_tx as f64)
}

/// Most active first, address order breaks ties
fn rank_by_interactions(records: &[AddressRecord]) -> Vec<&AddressRecord> {
    let mut ranked: Vec<&AddressRecord> = records.iter().collect();
    ranked.sort_by(|a, b| b.tx_count.cmp(&a.tx_count).then(a.address.cmp(&b.address)));
    ranked
}

/// Interaction share of the top address and of the top 10% of addresses
fn interaction_concentration(ranked: &[&AddressRecord]) -> (f64, f64) {
    let total: u64 = ranked.iter().map(|r| r.tx_count).sum();
    if total == 0 {
        return (0.0, 0.0);
    }
    let top1 = ranked.first().map(|r| r.tx_count).unwrap_or(0);
    let top_count = (ranked.len() / 10).max(1);
    let top10: u64 = ranked.iter().take(top_count).map(|r| r.tx_count).sum();
    (
        percentage(top1 as f64, total as f64),
        percentage(top10 as f64, total as f64),
    )
}

pub fn shape_tier(top10_percent_ratio: f64) -> InteractionShape {
    if top10_percent_ratio >= SHAPE_HIGHLY_CONCENTRATED_PCT {
        InteractionShape::HighlyConcentrated
    } else if top10_percent_ratio >= SHAPE_CONCENTRATED_PCT {
        InteractionShape::Concentrated
    } else if top10_percent_ratio >= SHAPE_MODERATE_PCT {
        InteractionShape::Moderate
    } else {
        InteractionShape::Distributed
    }
}

/// Shape risk, raised one step by MEDIUM wash and forced HIGH by HIGH wash
pub fn shape_risk(shape: InteractionShape, wash: WashLevel) -> ShapeRisk {
    let base = match shape {
        InteractionShape::Distributed => ShapeRisk::Low,
        InteractionShape::Moderate => ShapeRisk::Medium,
        InteractionShape::Concentrated => ShapeRisk::MediumHigh,
        InteractionShape::HighlyConcentrated => ShapeRisk::High,
    };
    match (wash, base) {
        (WashLevel::High, _) => ShapeRisk::High,
        (WashLevel::Medium, ShapeRisk::Low) => ShapeRisk::Medium,
        (WashLevel::Medium, ShapeRisk::Medium) => ShapeRisk::MediumHigh,
        (_, risk) => risk,
    }
}

fn percentage(part: f64, whole: f64) -> f64 {
    if whole <= 0.0 {
        0.0
    } else {
        (part / whole * 100.0).clamp(0.0, 100.0)
    }
}
