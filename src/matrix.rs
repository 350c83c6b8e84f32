use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque identifier for an embedding provider+model (e.g.
/// "BAAI/bge-small-en-v1.5"). Treated as a whole value; never split on
/// separators, since model names routinely contain them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModelId(String);

impl ModelId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModelId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// State of one (pair, model) distance slot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum DistanceEntry {
    /// Not computed, or invalidated by an edit. Also the state for pairs that
    /// are not applicable (empty text).
    #[default]
    Unset,
    /// A computation is in flight.
    Pending,
    /// Cosine distance, correct as of the pair's current texts and the model.
    Value(f64),
    /// The computation failed; the reason is shown to the user.
    Error(String),
}

impl DistanceEntry {
    pub fn value(&self) -> Option<f64> {
        match self {
            DistanceEntry::Value(v) => Some(*v),
            _ => None,
        }
    }
}

/// In-memory store of distance measurements keyed by (pair index, model).
///
/// The key is a structured tuple; the ordered map makes per-model iteration
/// come out in ascending pair-index order.
#[derive(Debug, Default)]
pub struct DistanceMatrix {
    entries: BTreeMap<(usize, ModelId), DistanceEntry>,
}

impl DistanceMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry state for a slot. Unknown keys read as `Unset`; never fails.
    pub fn get(&self, pair: usize, model: &ModelId) -> &DistanceEntry {
        static UNSET: DistanceEntry = DistanceEntry::Unset;
        self.entries
            .get(&(pair, model.clone()))
            .unwrap_or(&UNSET)
    }

    pub fn set_pending(&mut self, pair: usize, model: &ModelId) {
        self.entries
            .insert((pair, model.clone()), DistanceEntry::Pending);
    }

    pub fn set_value(&mut self, pair: usize, model: &ModelId, value: f64) {
        self.entries
            .insert((pair, model.clone()), DistanceEntry::Value(value));
    }

    pub fn set_error(&mut self, pair: usize, model: &ModelId, reason: impl Into<String>) {
        self.entries
            .insert((pair, model.clone()), DistanceEntry::Error(reason.into()));
    }

    /// Reset every entry for `pair` across all models to `Unset`.
    pub fn invalidate(&mut self, pair: usize) {
        self.entries.retain(|(p, _), _| *p != pair);
    }

    /// Reset every entry for `model` across all pairs to `Unset`.
    pub fn invalidate_model(&mut self, model: &ModelId) {
        self.entries.retain(|(_, m), _| m != model);
    }

    /// Distances currently in `Value` state for `model`, ascending by pair
    /// index, restricted to pairs accepted by `keep`. Restartable: call again
    /// for a fresh pass.
    pub fn values_for<'a>(
        &'a self,
        model: &'a ModelId,
        keep: impl Fn(usize) -> bool + 'a,
    ) -> impl Iterator<Item = f64> + 'a {
        self.entries
            .iter()
            .filter(move |((pair, m), entry)| {
                m == model && keep(*pair) && matches!(entry, DistanceEntry::Value(_))
            })
            .filter_map(|(_, entry)| entry.value())
    }
}
