//! Score Composer
//!
//! Sums the three category scores, maps the total to a risk tier, derives
//! display tags and builds the integer payload for the on-chain registry.

use alloy_primitives::Address;
use tracing::debug;

use super::holder::round2;
use crate::models::config::ScoringPolicy;
use crate::models::types::{
    CategoryRisk, DecodeStatus, EoaScore, HolderScore, Overview, PermissionScore, RiskTag,
    ScoreReport, Scores, SubmitPayload, TagCategory, TagType, WashLevel,
};

const fn tag(
    key: &'static str,
    label: &'static str,
    label_cn: &'static str,
    tag_type: TagType,
    category: TagCategory,
) -> RiskTag {
    RiskTag {
        key,
        label,
        label_cn,
        tag_type,
        category,
    }
}

// Activity
const ORGANIC_GROWTH: RiskTag = tag(
    "ORGANIC_GROWTH",
    "Organic Growth",
    "真实用户增长",
    TagType::Success,
    TagCategory::Activity,
);
const MODERATE_ACTIVITY: RiskTag = tag(
    "MODERATE_ACTIVITY",
    "Moderate Activity",
    "中等活跃",
    TagType::Warning,
    TagCategory::Activity,
);
const LOW_ACTIVITY: RiskTag = tag(
    "LOW_ACTIVITY",
    "Low Activity",
    "低活跃/疑似刷量",
    TagType::Danger,
    TagCategory::Activity,
);
const BOT_ACTIVITY: RiskTag = tag(
    "BOT_ACTIVITY",
    "Bot Activity",
    "机器人活跃",
    TagType::Warning,
    TagCategory::Activity,
);
const BOT_DOMINATED: RiskTag = tag(
    "BOT_DOMINATED",
    "Bot Dominated",
    "机器人主导",
    TagType::Danger,
    TagCategory::Activity,
);

// Holder
const DISTRIBUTED: RiskTag = tag(
    "DISTRIBUTED",
    "Distributed",
    "持仓分散",
    TagType::Success,
    TagCategory::Holder,
);
const CONCENTRATED: RiskTag = tag(
    "CONCENTRATED",
    "Concentrated",
    "持仓集中",
    TagType::Warning,
    TagCategory::Holder,
);
const CONCENTRATION_RISK: RiskTag = tag(
    "CONCENTRATION_RISK",
    "Concentration Risk",
    "大户控盘",
    TagType::Danger,
    TagCategory::Holder,
);

// Permission
const SAFE_CONTRACT: RiskTag = tag(
    "SAFE_CONTRACT",
    "Safe Contract",
    "安全合约",
    TagType::Success,
    TagCategory::Permission,
);
const LIMITED_RISK: RiskTag = tag(
    "LIMITED_RISK",
    "Limited Risk",
    "有限风险",
    TagType::Warning,
    TagCategory::Permission,
);
const RUG_RISK: RiskTag = tag(
    "RUG_RISK",
    "Rug Risk",
    "跑路风险",
    TagType::Danger,
    TagCategory::Permission,
);
const UNVERIFIED_INTERFACE: RiskTag = tag(
    "UNVERIFIED_INTERFACE",
    "Unverified Interface",
    "接口无法验证",
    TagType::Warning,
    TagCategory::Permission,
);
const UPGRADEABLE: RiskTag = tag(
    "UPGRADEABLE",
    "Upgradeable",
    "可升级合约",
    TagType::Warning,
    TagCategory::Permission,
);

/// Combines category scores into a [`ScoreReport`]
#[derive(Debug, Clone, Default)]
pub struct ScoreComposer {
    policy: ScoringPolicy,
}

impl ScoreComposer {
    pub fn new(policy: ScoringPolicy) -> Self {
        Self { policy }
    }

    pub fn compose(
        &self,
        token: Address,
        timestamp: String,
        eoa: EoaScore,
        holder: HolderScore,
        permission: PermissionScore,
    ) -> ScoreReport {
        let sum = eoa.score + holder.score + permission.score;
        let total = round2(sum.clamp(0.0, self.policy.max_total()));
        let tier = self.policy.tier(total);

        let mut risk_tags = activity_tags(&eoa);
        risk_tags.extend(holder_tags(&holder));
        risk_tags.extend(permission_tags(&permission));

        let submit_data = SubmitPayload {
            target: token,
            total_score: to_u8(total),
            eoa_score: to_u8(eoa.score),
            holder_score: to_u8(holder.score),
            permission_score: to_u8(permission.score),
            risk_level: tier.as_u8(),
        };

        debug!(
            %token,
            total,
            tier = tier.as_str(),
            tags = risk_tags.len(),
            "composed report"
        );

        ScoreReport {
            token_address: token,
            timestamp,
            overview: Overview {
                total_score: total,
                max_score: self.policy.max_total(),
                risk_level: tier,
                risk_label: tier.label(),
                risk_label_cn: tier.label_cn(),
                risk_color: tier.color(),
            },
            risk_tags,
            scores: Scores {
                eoa,
                holder,
                permission,
            },
            submit_data,
        }
    }
}

fn activity_tags(eoa: &EoaScore) -> Vec<RiskTag> {
    let mut tags = Vec::new();
    match eoa.risk_level {
        CategoryRisk::LowRisk => tags.push(ORGANIC_GROWTH),
        CategoryRisk::MediumRisk => tags.push(MODERATE_ACTIVITY),
        CategoryRisk::HighRisk => tags.push(LOW_ACTIVITY),
        CategoryRisk::Unknown => {}
    }
    match eoa.metrics.wash_level {
        WashLevel::Medium => tags.push(BOT_ACTIVITY),
        WashLevel::High => tags.push(BOT_DOMINATED),
        WashLevel::Low => {}
    }
    tags
}

fn holder_tags(holder: &HolderScore) -> Vec<RiskTag> {
    match holder.risk_level {
        CategoryRisk::LowRisk => vec![DISTRIBUTED],
        CategoryRisk::MediumRisk => vec![CONCENTRATED],
        CategoryRisk::HighRisk => vec![CONCENTRATION_RISK],
        CategoryRisk::Unknown => Vec::new(),
    }
}

fn permission_tags(permission: &PermissionScore) -> Vec<RiskTag> {
    let profile = &permission.metrics;
    let mut tags = Vec::new();

    if !profile.dangerous_functions.is_empty() {
        tags.push(RUG_RISK);
    } else {
        match permission.risk_level {
            CategoryRisk::LowRisk => tags.push(SAFE_CONTRACT),
            CategoryRisk::MediumRisk => tags.push(LIMITED_RISK),
            CategoryRisk::HighRisk => tags.push(RUG_RISK),
            CategoryRisk::Unknown => {}
        }
    }
    if profile.decode_status == DecodeStatus::Failed {
        tags.push(UNVERIFIED_INTERFACE);
    }
    if profile.is_proxy {
        tags.push(UPGRADEABLE);
    }
    tags
}

fn to_u8(score: f64) -> u8 {
    score.round().clamp(0.0, u8::MAX as f64) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::permission::{assess_permissions, PermissionFacts};
    use crate::models::types::{EoaMetrics, HolderMetrics, InteractionShape, RiskTier, ShapeRisk};
    use crate::utils::constants::{selector_of, DEAD_ADDRESS};
    use std::collections::BTreeMap;

    fn eoa(score: f64, risk_level: CategoryRisk, wash_level: WashLevel) -> EoaScore {
        EoaScore {
            name: "User Activity",
            name_cn: "用户活跃度",
            score,
            max_score: 40.0,
            risk_level,
            metrics: EoaMetrics {
                total_addresses: 0,
                unique_eoa_count: 0,
                eoa_percentage: 0.0,
                events_count: 0,
                bot_address_ratio: 0.0,
                bot_volume_ratio: 0.0,
                wash_level,
                class_distribution: BTreeMap::new(),
                top1_ratio: 0.0,
                top10_percent_ratio: 0.0,
                shape: InteractionShape::Distributed,
                shape_risk: ShapeRisk::Low,
                top_interactors: Vec::new(),
            },
        }
    }

    fn holder(score: f64, risk_level: CategoryRisk) -> HolderScore {
        HolderScore {
            name: "Holder Distribution",
            name_cn: "持仓分布",
            score,
            max_score: 30.0,
            risk_level,
            metrics: HolderMetrics {
                total_holders: 0,
                top10_percentage: 0.0,
                gini_coefficient: 0.0,
                contract_holders: 0,
                top10_holders: Vec::new(),
            },
        }
    }

    fn permission(facts: PermissionFacts) -> PermissionScore {
        assess_permissions(&facts, &ScoringPolicy::default())
    }

    fn renounced() -> PermissionScore {
        permission(PermissionFacts {
            owner: Some(DEAD_ADDRESS),
            selectors: Some([selector_of("transfer(address,uint256)")].into()),
            ..Default::default()
        })
    }

    fn keys(report: &ScoreReport) -> Vec<&'static str> {
        report.risk_tags.iter().map(|t| t.key).collect()
    }

    #[test]
    fn test_safe_report() {
        let composer = ScoreComposer::default();
        let report = composer.compose(
            Address::repeat_byte(1),
            "2026-01-01T00:00:00+00:00".to_string(),
            eoa(40.0, CategoryRisk::LowRisk, WashLevel::Low),
            holder(28.19, CategoryRisk::LowRisk),
            renounced(),
        );

        assert_eq!(report.overview.total_score, 98.19);
        assert_eq!(report.overview.max_score, 100.0);
        assert_eq!(report.overview.risk_level, RiskTier::Safe);
        assert_eq!(report.overview.risk_label, "Low Risk");
        assert_eq!(report.overview.risk_color, "#22c55e");
        assert_eq!(keys(&report), vec!["ORGANIC_GROWTH", "DISTRIBUTED", "SAFE_CONTRACT"]);

        let submit = report.submit_data;
        assert_eq!(submit.total_score, 98);
        assert_eq!(submit.eoa_score, 40);
        assert_eq!(submit.holder_score, 28);
        assert_eq!(submit.permission_score, 30);
        assert_eq!(submit.risk_level, 0);
    }

    #[test]
    fn test_tier_boundaries() {
        let composer = ScoreComposer::default();
        let cases = [
            (40.0, 25.0, RiskTier::Safe),
            (40.0, 20.0, RiskTier::Medium),
            (25.0, 19.99, RiskTier::High),
            (25.0, 0.0, RiskTier::High),
            (24.0, 0.0, RiskTier::Extreme),
        ];
        for (activity, holders, tier) in cases {
            let report = composer.compose(
                Address::ZERO,
                String::new(),
                eoa(activity, CategoryRisk::MediumRisk, WashLevel::Low),
                holder(holders, CategoryRisk::MediumRisk),
                permission(PermissionFacts {
                    owner: Some(Address::repeat_byte(2)),
                    selectors: Some(Default::default()),
                    ..Default::default()
                }),
            );
            // owner penalty leaves 15 permission points
            assert_eq!(report.overview.risk_level, tier, "total {}", report.overview.total_score);
            assert_eq!(report.submit_data.risk_level, tier.as_u8());
        }
    }

    #[test]
    fn test_danger_tags() {
        let composer = ScoreComposer::default();
        let report = composer.compose(
            Address::ZERO,
            String::new(),
            eoa(5.0, CategoryRisk::HighRisk, WashLevel::High),
            holder(2.0, CategoryRisk::HighRisk),
            permission(PermissionFacts {
                owner: Some(Address::repeat_byte(3)),
                implementation: Some(Address::repeat_byte(4)),
                selectors: Some([selector_of("mint(address,uint256)")].into()),
                ..Default::default()
            }),
        );
        assert_eq!(
            keys(&report),
            vec![
                "LOW_ACTIVITY",
                "BOT_DOMINATED",
                "CONCENTRATION_RISK",
                "RUG_RISK",
                "UPGRADEABLE"
            ]
        );
        assert_eq!(report.overview.risk_level, RiskTier::Extreme);
    }

    #[test]
    fn test_unknown_levels_emit_no_level_tag() {
        let composer = ScoreComposer::default();
        let report = composer.compose(
            Address::ZERO,
            String::new(),
            eoa(20.0, CategoryRisk::MediumRisk, WashLevel::Medium),
            holder(0.0, CategoryRisk::Unknown),
            permission(PermissionFacts::default()),
        );
        assert_eq!(
            keys(&report),
            vec!["MODERATE_ACTIVITY", "BOT_ACTIVITY", "UNVERIFIED_INTERFACE"]
        );
    }

    #[test]
    fn test_report_json_shape() {
        let report = ScoreComposer::default().compose(
            Address::repeat_byte(1),
            "2026-01-01T00:00:00+00:00".to_string(),
            eoa(40.0, CategoryRisk::LowRisk, WashLevel::Low),
            holder(30.0, CategoryRisk::LowRisk),
            renounced(),
        );
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["overview"]["risk_level"], "safe");
        assert_eq!(json["risk_tags"][0]["type"], "success");
        assert_eq!(json["risk_tags"][0]["category"], "activity");
        assert_eq!(json["scores"]["eoa"]["risk_level"], "low_risk");
        assert_eq!(json["scores"]["eoa"]["metrics"]["shape"], "DISTRIBUTED");
        assert_eq!(json["scores"]["eoa"]["metrics"]["shape_risk"], "LOW");
        assert_eq!(json["submit_data"]["totalScore"], 100);
        assert_eq!(json["submit_data"]["permissionScore"], 30);
        assert!(json["submit_data"]["target"].is_string());
    }
}
