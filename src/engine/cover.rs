// ==========================================
// Repooler - Unique-Cover Selector
// ==========================================
// Picks structures so that every sample still needing clusters is
// sequenced in exactly one pool
// ==========================================
// Invariant: coverage of each needed sample == 1, checked after
// selection; a violation aborts the run
// ==========================================

use crate::domain::structure::{StructureMap, UniqueStructure};
use crate::domain::types::RemainingClusters;
use crate::engine::error::{PlanError, PlanResult};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, error, info, instrument};

pub struct UniqueCoverSelector;

struct Candidate<'a> {
    structure: &'a UniqueStructure,
    needed: BTreeSet<&'a str>,
}

impl<'a> Candidate<'a> {
    fn shares_with(&self, samples: &BTreeSet<&str>) -> bool {
        self.needed.iter().any(|s| samples.contains(s))
    }
}

impl UniqueCoverSelector {
    pub fn new() -> Self {
        Self
    }

    /// Greedy cover, richest structures first
    ///
    /// A candidate is rejected when one of its needed samples is already
    /// claimed, or when taking it would leave another unclaimed needed
    /// sample with no usable structure. Accepting a candidate blocks every
    /// remaining structure that shares a needed sample with it.
    #[instrument(skip_all, fields(structures = structures.len()))]
    pub fn select<'a>(
        &self,
        structures: &'a StructureMap,
        remaining: &RemainingClusters,
    ) -> PlanResult<Vec<&'a UniqueStructure>> {
        let mut candidates: Vec<Candidate<'a>> = structures
            .values()
            .map(|structure| Candidate {
                structure,
                needed: structure
                    .samples()
                    .iter()
                    .map(String::as_str)
                    .filter(|s| remaining.needs_more(s))
                    .collect(),
            })
            .filter(|c| !c.needed.is_empty())
            .collect();

        // ascending by needed count, popped from the end; among equals the
        // smallest key is popped first
        candidates.sort_by(|a, b| {
            a.needed
                .len()
                .cmp(&b.needed.len())
                .then_with(|| b.structure.key.cmp(&a.structure.key))
        });

        let mut claimed: BTreeSet<&'a str> = BTreeSet::new();
        let mut selected: Vec<&'a UniqueStructure> = Vec::new();

        while let Some(candidate) = candidates.pop() {
            if candidate.needed.iter().any(|s| claimed.contains(s)) {
                debug!(structure = %candidate.structure.key, "rejected: sample already covered");
                continue;
            }

            if let Some(stranded) = self.stranded_sample(&candidate, &candidates, &claimed) {
                debug!(
                    structure = %candidate.structure.key,
                    stranded,
                    "rejected: would strand another sample"
                );
                continue;
            }

            candidates.retain(|other| !other.shares_with(&candidate.needed));
            claimed.extend(candidate.needed.iter().copied());
            debug!(structure = %candidate.structure.key, "accepted");
            selected.push(candidate.structure);
        }

        verify_cover(&selected, remaining)?;

        info!(selected = selected.len(), "unique cover selected");
        Ok(selected)
    }

    /// First unclaimed needed sample (outside `candidate`) whose every
    /// remaining occurrence would be blocked by accepting `candidate`
    fn stranded_sample<'a>(
        &self,
        candidate: &Candidate<'a>,
        open: &[Candidate<'a>],
        claimed: &BTreeSet<&'a str>,
    ) -> Option<&'a str> {
        let reachable: BTreeSet<&'a str> = open
            .iter()
            .flat_map(|c| c.needed.iter().copied())
            .filter(|s| !claimed.contains(s) && !candidate.needed.contains(s))
            .collect();

        reachable.into_iter().find(|sample| {
            open.iter()
                .filter(|c| c.needed.contains(sample))
                .all(|c| c.shares_with(&candidate.needed))
        })
    }
}

impl Default for UniqueCoverSelector {
    fn default() -> Self {
        Self::new()
    }
}

/// Every needed sample appears in exactly one selected structure
pub fn verify_cover(
    selected: &[&UniqueStructure],
    remaining: &RemainingClusters,
) -> PlanResult<()> {
    let mut coverage: BTreeMap<&str, usize> =
        remaining.needed_samples().map(|s| (s, 0)).collect();

    for structure in selected {
        for sample in structure.samples() {
            if let Some(count) = coverage.get_mut(sample.as_str()) {
                *count += 1;
            }
        }
    }

    if let Some((sample, occurrences)) = coverage.into_iter().find(|(_, n)| *n != 1) {
        error!(sample, occurrences, "structure cover invariant violated");
        return Err(PlanError::CoverInvariant {
            sample: sample.to_string(),
            occurrences,
        });
    }
    Ok(())
}
