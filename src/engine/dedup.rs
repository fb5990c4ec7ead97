// ==========================================
// Repooler - Structure Deduplicator
// ==========================================
// Lanes with the same sample composition collapse into one
// structure whose yields are the mean over its copies
// ==========================================

use crate::domain::structure::{StructureKey, StructureMap, UniqueStructure};
use crate::domain::types::LaneId;
use crate::engine::aggregator::LaneSamples;
use std::collections::BTreeMap;
use tracing::info;

pub struct StructureDeduplicator;

impl StructureDeduplicator {
    pub fn new() -> Self {
        Self
    }

    pub fn deduplicate(&self, lanes: &BTreeMap<LaneId, LaneSamples>) -> StructureMap {
        // key -> (summed yields, copies)
        let mut sums: BTreeMap<StructureKey, (Vec<u128>, usize)> = BTreeMap::new();

        for samples in lanes.values() {
            let key = StructureKey::from_samples(samples.keys().cloned());
            let entry = sums
                .entry(key.clone())
                .or_insert_with(|| (vec![0; key.len()], 0));
            for (slot, sample) in entry.0.iter_mut().zip(key.samples()) {
                *slot += u128::from(samples.get(sample).copied().unwrap_or(0));
            }
            entry.1 += 1;
        }

        let structures: StructureMap = sums
            .into_iter()
            .map(|(key, (totals, copies))| {
                let mean_yields = totals
                    .iter()
                    .map(|total| *total as f64 / copies as f64)
                    .collect();
                let structure = UniqueStructure {
                    key: key.clone(),
                    mean_yields,
                    copies,
                };
                (key, structure)
            })
            .collect();

        info!(
            lanes = lanes.len(),
            structures = structures.len(),
            "lane structures deduplicated"
        );
        structures
    }
}

impl Default for StructureDeduplicator {
    fn default() -> Self {
        Self::new()
    }
}
