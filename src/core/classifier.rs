//! Address Classifier
//!
//! Builds per-address behavioral features from the transfer feed and assigns
//! exactly one [`AddressClass`] to each address. Classification walks an
//! ordered rule list and returns the first match:
//!
//! 1. external label (DEX / CEX / SmartMoney)
//! 2. code presence (Contract)
//! 3. bot heuristic (Bot)
//! 4. default (EOA)

use alloy_primitives::Address;
use std::collections::{BTreeMap, BTreeSet};

use crate::models::config::BotHeuristic;
use crate::models::types::{AddressClass, AddressRecord, KnownLabel, TransferRecord};

/// A classification rule: returns a class when it matches
type Rule = fn(&AddressRecord, &BotHeuristic) -> Option<AddressClass>;

/// Rules in precedence order, highest first
const RULES: [(&str, Rule); 4] = [
    ("external_label", rule_external_label),
    ("code_presence", rule_code_presence),
    ("bot_behavior", rule_bot_behavior),
    ("default_eoa", rule_default_eoa),
];

fn rule_external_label(record: &AddressRecord, _: &BotHeuristic) -> Option<AddressClass> {
    record.label.map(|label| label.class())
}

fn rule_code_presence(record: &AddressRecord, _: &BotHeuristic) -> Option<AddressClass> {
    record.has_code.then_some(AddressClass::Contract)
}

fn rule_bot_behavior(record: &AddressRecord, heuristic: &BotHeuristic) -> Option<AddressClass> {
    is_bot(record, heuristic).then_some(AddressClass::Bot)
}

fn rule_default_eoa(_: &AddressRecord, _: &BotHeuristic) -> Option<AddressClass> {
    Some(AddressClass::Eoa)
}

/// All bot conditions must hold
pub fn is_bot(record: &AddressRecord, heuristic: &BotHeuristic) -> bool {
    if record.tx_count < heuristic.min_tx_count || record.tx_count == 0 {
        return false;
    }

    let avg_interval = record.active_span_secs() as f64 / record.tx_count as f64;
    let near_zero_holding = record.balance <= record.inbound_volume * heuristic.max_holding_ratio;

    avg_interval <= heuristic.max_avg_interval_secs
        && near_zero_holding
        && record.counterparties <= heuristic.max_counterparties
}

/// Ordered-rule classifier
#[derive(Debug, Clone, Default)]
pub struct AddressClassifier {
    heuristic: BotHeuristic,
}

impl AddressClassifier {
    pub fn new(heuristic: BotHeuristic) -> Self {
        Self { heuristic }
    }

    /// First matching rule wins
    pub fn classify(&self, record: &AddressRecord) -> AddressClass {
        RULES
            .iter()
            .find_map(|(_, rule)| rule(record, &self.heuristic))
            .unwrap_or(AddressClass::Unknown)
    }

    /// Attach labels and assign a class to every record
    pub fn classify_all(
        &self,
        records: &mut [AddressRecord],
        labels: &BTreeMap<Address, Option<KnownLabel>>,
    ) {
        for record in records.iter_mut() {
            if let Some(label) = labels.get(&record.address).copied().flatten() {
                record.label = Some(label);
            }
            record.class = self.classify(record);
        }
    }
}

#[derive(Default)]
struct Accumulator {
    record: Option<AddressRecord>,
    counterparties: BTreeSet<Address>,
}

/// Aggregate the transfer feed into one record per participating address,
/// ordered by address. The zero address and `subject` (the token itself) are
/// left out; balances are net inflow floored at zero.
pub fn build_records(subject: Address, transfers: &[TransferRecord]) -> Vec<AddressRecord> {
    let mut acc: BTreeMap<Address, Accumulator> = BTreeMap::new();
    let skip = |a: &Address| *a == Address::ZERO || *a == subject;

    for transfer in transfers {
        let self_transfer = transfer.from == transfer.to;
        let sides = [
            (transfer.from, transfer.to, transfer.from_is_contract, false),
            (transfer.to, transfer.from, transfer.to_is_contract, true),
        ];

        for (address, other, is_contract, inbound) in sides {
            if skip(&address) {
                continue;
            }
            // Self-transfer: one interaction, no volume either way
            if inbound && self_transfer {
                continue;
            }

            let entry = acc.entry(address).or_default();
            let record = entry.record.get_or_insert_with(|| AddressRecord::new(address));
            record.tx_count += 1;
            record.first_seen = record.first_seen.min(transfer.timestamp);
            record.last_seen = record.last_seen.max(transfer.timestamp);
            record.has_code |= is_contract;
            if inbound {
                record.inbound_volume += transfer.value;
            } else if !self_transfer {
                record.outbound_volume += transfer.value;
            }
            if other != address {
                entry.counterparties.insert(other);
            }
        }
    }

    acc.into_values()
        .filter_map(|entry| {
            let mut record = entry.record?;
            record.counterparties = entry.counterparties.len() as u64;
            record.balance = (record.inbound_volume - record.outbound_volume).max(0.0);
            Some(record)
        })
        .collect()
}
