// ==========================================
// Repooler - Lane Structure Model
// ==========================================
// A structure is the set of samples loaded together in one lane.
// Lanes with the same sample names share one structure key.
// ==========================================

use crate::domain::types::is_undetermined;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ==========================================
// StructureKey - composite key of a lane composition
// ==========================================
// Sample names sorted descending; the order is the index order of
// every per-sample vector attached to the structure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StructureKey(Vec<String>);

impl StructureKey {
    pub fn from_samples<I, S>(samples: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = samples.into_iter().map(Into::into).collect();
        names.sort_unstable_by(|a, b| b.cmp(a));
        names.dedup();
        Self(names)
    }

    pub fn samples(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn position(&self, sample: &str) -> Option<usize> {
        self.0.iter().position(|s| s == sample)
    }

    pub fn contains(&self, sample: &str) -> bool {
        self.position(sample).is_some()
    }
}

impl fmt::Display for StructureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(", "))
    }
}

// ==========================================
// UniqueStructure - deduplicated lane composition
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniqueStructure {
    pub key: StructureKey,
    pub mean_yields: Vec<f64>, // element-wise mean over copies, key order
    pub copies: usize,         // lanes that contributed
}

impl UniqueStructure {
    pub fn samples(&self) -> &[String] {
        self.key.samples()
    }

    pub fn mean_yield(&self, sample: &str) -> Option<f64> {
        self.key.position(sample).map(|i| self.mean_yields[i])
    }

    /// Sample names excluding the Undetermined slot
    pub fn real_samples(&self) -> impl Iterator<Item = &str> {
        self.samples()
            .iter()
            .map(String::as_str)
            .filter(|s| !is_undetermined(s))
    }
}

/// Structures indexed by their composite key
pub type StructureMap = BTreeMap<StructureKey, UniqueStructure>;
