use std::collections::BTreeMap;

/// Ground-truth relatedness labels, keyed by pair index. Labels are inputs to
/// threshold derivation, never inferred from distances.
#[derive(Debug, Default, Clone)]
pub struct RelatednessLabels {
    related: BTreeMap<usize, bool>,
}

impl RelatednessLabels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unknown indices read as unrelated.
    pub fn get(&self, pair: usize) -> bool {
        self.related.get(&pair).copied().unwrap_or(false)
    }

    pub fn set(&mut self, pair: usize, related: bool) {
        self.related.insert(pair, related);
    }

    pub fn remove(&mut self, pair: usize) {
        self.related.remove(&pair);
    }

    /// Replace the entire label set atomically. Any pair index absent from
    /// `mapping` resets to false.
    pub fn bulk_load(&mut self, mapping: BTreeMap<usize, bool>) {
        self.related = mapping;
    }
}

/// Import truthiness policy: the literal strings "yes" or "related",
/// case-insensitively, mean related; everything else (empty, "no", arbitrary
/// text) means unrelated. Preserved exactly for compatibility with existing
/// CSV inputs.
pub fn parse_related(s: &str) -> bool {
    let s = s.trim();
    s.eq_ignore_ascii_case("yes") || s.eq_ignore_ascii_case("related")
}
