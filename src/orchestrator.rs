use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::boxplot::{self, BoxPlotStats};
use crate::embed::EmbeddingProvider;
use crate::labels::RelatednessLabels;
use crate::matrix::{DistanceEntry, DistanceMatrix, ModelId};
use crate::threshold;
use crate::vector::cosine_distance;

/// One (query text, stored text) row under comparison. `index` is stable for
/// the life of the session and never reused after removal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextPair {
    pub index: usize,
    pub query_text: String,
    pub stored_text: String,
}

/// A recompute captured at `begin_recompute` time. Carries the slot
/// generation so a result arriving after an invalidating edit is discarded
/// instead of written.
#[derive(Debug, Clone)]
pub struct FetchJob {
    pub pair: usize,
    pub model: ModelId,
    pub query_text: String,
    pub stored_text: String,
    generation: u64,
}

/// Outcome counters for a full recompute pass.
#[derive(Debug, Default, PartialEq)]
pub struct RecomputeStats {
    pub computed: usize,
    pub failed: usize,
    /// Slots left alone: empty text, unchanged inputs, or no row.
    pub skipped: usize,
}

/// Owns the rows, model slots, labels, and distance matrix, and is the only
/// writer to any of them. All mutation flows through here so invalidation is
/// never missed.
#[derive(Debug, Default)]
pub struct ComparisonOrchestrator {
    rows: BTreeMap<usize, TextPair>,
    next_index: usize,
    /// UI slot -> bound model. An absent slot means no model selected there.
    slots: BTreeMap<usize, ModelId>,
    matrix: DistanceMatrix,
    labels: RelatednessLabels,
    /// Per-slot versions, bumped on every invalidation.
    generations: BTreeMap<(usize, ModelId), u64>,
    /// Last (query, stored) a slot successfully computed for, used to
    /// short-circuit recomputes with unchanged inputs. Cleared on edit so it
    /// can never mask stale data.
    computed_for: BTreeMap<(usize, ModelId), (String, String)>,
}

impl ComparisonOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Rows ────────────────────────────────────────────────────────────

    pub fn add_pair(&mut self, query: impl Into<String>, stored: impl Into<String>) -> usize {
        let index = self.next_index;
        self.next_index += 1;
        self.rows.insert(
            index,
            TextPair {
                index,
                query_text: query.into(),
                stored_text: stored.into(),
            },
        );
        index
    }

    pub fn pair(&self, index: usize) -> Option<&TextPair> {
        self.rows.get(&index)
    }

    /// Rows in ascending index order.
    pub fn pairs(&self) -> impl Iterator<Item = &TextPair> {
        self.rows.values()
    }

    pub fn pair_count(&self) -> usize {
        self.rows.len()
    }

    pub fn edit_query(&mut self, index: usize, text: impl Into<String>) -> bool {
        let Some(row) = self.rows.get_mut(&index) else {
            return false;
        };
        row.query_text = text.into();
        self.invalidate_pair(index);
        true
    }

    pub fn edit_stored(&mut self, index: usize, text: impl Into<String>) -> bool {
        let Some(row) = self.rows.get_mut(&index) else {
            return false;
        };
        row.stored_text = text.into();
        self.invalidate_pair(index);
        true
    }

    pub fn remove_pair(&mut self, index: usize) -> bool {
        if self.rows.remove(&index).is_none() {
            return false;
        }
        self.invalidate_pair(index);
        self.labels.remove(index);
        true
    }

    /// Replace all rows and labels from a bulk import. Indices are reassigned
    /// from zero; the matrix and all per-slot bookkeeping reset with them.
    pub fn load_rows(&mut self, rows: impl IntoIterator<Item = (String, String, bool)>) {
        self.rows.clear();
        self.matrix = DistanceMatrix::new();
        self.bump_all();
        self.computed_for.clear();
        self.next_index = 0;

        let mut related = BTreeMap::new();
        for (query, stored, is_related) in rows {
            let index = self.add_pair(query, stored);
            if is_related {
                related.insert(index, true);
            }
        }
        self.labels.bulk_load(related);
    }

    /// Restore rows with their original indices (session reload).
    pub fn restore_rows(&mut self, pairs: Vec<TextPair>, related: BTreeMap<usize, bool>) {
        self.rows.clear();
        self.matrix = DistanceMatrix::new();
        self.bump_all();
        self.computed_for.clear();
        self.next_index = 0;
        for pair in pairs {
            self.next_index = self.next_index.max(pair.index + 1);
            self.rows.insert(pair.index, pair);
        }
        self.labels.bulk_load(related);
    }

    // ── Labels ──────────────────────────────────────────────────────────

    pub fn set_label(&mut self, index: usize, related: bool) {
        self.labels.set(index, related);
    }

    pub fn labels(&self) -> &RelatednessLabels {
        &self.labels
    }

    // ── Model slots ─────────────────────────────────────────────────────

    /// Bind a model to a UI slot, or clear the slot with `None`. Entries for
    /// the previously bound model are invalidated, unless another slot still
    /// shows that model (the matrix is keyed by model, so its entries stay
    /// correct for the remaining slot).
    pub fn set_slot_model(&mut self, slot: usize, model: Option<ModelId>) {
        let old = self.slots.get(&slot).cloned();
        if old == model {
            return;
        }
        match model {
            Some(m) => self.slots.insert(slot, m),
            None => self.slots.remove(&slot),
        };
        if let Some(old) = old {
            if !self.slots.values().any(|m| *m == old) {
                self.invalidate_model_entries(&old);
            }
        }
    }

    /// Bound models in slot order, deduplicated.
    pub fn active_models(&self) -> Vec<ModelId> {
        let mut models = Vec::new();
        for model in self.slots.values() {
            if !models.contains(model) {
                models.push(model.clone());
            }
        }
        models
    }

    // ── Views ───────────────────────────────────────────────────────────

    pub fn matrix(&self) -> &DistanceMatrix {
        &self.matrix
    }

    pub fn entry(&self, pair: usize, model: &ModelId) -> &DistanceEntry {
        self.matrix.get(pair, model)
    }

    /// Current separating threshold for one model; recomputed on every call.
    pub fn threshold(&self, model: &ModelId) -> Option<f64> {
        threshold::compute_threshold(&self.matrix, &self.labels, model)
    }

    /// Box-plot summary over one relatedness class for one model.
    pub fn box_plot(&self, model: &ModelId, related: bool) -> Option<BoxPlotStats> {
        let distances: Vec<f64> = self
            .matrix
            .values_for(model, |pair| self.labels.get(pair) == related)
            .collect();
        boxplot::summarize(&distances)
    }

    // ── Recompute ───────────────────────────────────────────────────────

    /// Start a recompute for one slot. Returns `None` when there is nothing
    /// to do: unknown row, empty query or stored text (not applicable), or
    /// inputs unchanged since the last successful computation. Otherwise the
    /// slot goes `Pending` and the returned job must be finished with
    /// [`complete`](Self::complete).
    pub fn begin_recompute(&mut self, pair: usize, model: &ModelId) -> Option<FetchJob> {
        let row = self.rows.get(&pair)?;
        if row.query_text.is_empty() || row.stored_text.is_empty() {
            return None;
        }

        let key = (pair, model.clone());
        if let Some((query, stored)) = self.computed_for.get(&key) {
            let unchanged = *query == row.query_text && *stored == row.stored_text;
            if unchanged && matches!(self.matrix.get(pair, model), DistanceEntry::Value(_)) {
                return None;
            }
        }

        // Materialize the generation entry so every later invalidation path
        // sees this slot.
        let generation = *self.generations.entry(key).or_insert(0);
        let job = FetchJob {
            pair,
            model: model.clone(),
            query_text: row.query_text.clone(),
            stored_text: row.stored_text.clone(),
            generation,
        };
        self.matrix.set_pending(pair, model);
        Some(job)
    }

    /// Finish a recompute. The result is written only if the slot's
    /// generation still matches the one captured at begin time; a result for
    /// an invalidated slot is discarded. Returns whether the write happened.
    pub fn complete(&mut self, job: FetchJob, outcome: Result<f64, String>) -> bool {
        let key = (job.pair, job.model.clone());
        let current = self.generations.get(&key).copied().unwrap_or(0);
        if current != job.generation {
            return false;
        }
        match outcome {
            Ok(distance) => {
                self.matrix.set_value(job.pair, &job.model, distance);
                self.computed_for
                    .insert(key, (job.query_text, job.stored_text));
            }
            Err(reason) => {
                self.matrix.set_error(job.pair, &job.model, reason);
            }
        }
        true
    }

    /// Recompute every eligible slot against every bound model. Per-slot
    /// order is fetch query embedding, fetch stored embedding, compute
    /// distance; a failure in one slot never touches any other.
    pub fn recompute_all(&mut self, provider: &dyn EmbeddingProvider) -> RecomputeStats {
        let pairs: Vec<usize> = self.rows.keys().copied().collect();
        let models = self.active_models();

        let mut stats = RecomputeStats::default();
        for pair in pairs {
            for model in &models {
                let Some(job) = self.begin_recompute(pair, model) else {
                    stats.skipped += 1;
                    continue;
                };
                let outcome = run_job(provider, &job);
                let failed = outcome.is_err();
                if self.complete(job, outcome) {
                    if failed {
                        stats.failed += 1;
                    } else {
                        stats.computed += 1;
                    }
                }
            }
        }
        stats
    }

    // ── Invalidation ────────────────────────────────────────────────────

    fn invalidate_pair(&mut self, pair: usize) {
        self.matrix.invalidate(pair);
        for ((p, _), generation) in self.generations.iter_mut() {
            if *p == pair {
                *generation += 1;
            }
        }
        self.computed_for.retain(|(p, _), _| *p != pair);
    }

    fn invalidate_model_entries(&mut self, model: &ModelId) {
        self.matrix.invalidate_model(model);
        for ((_, m), generation) in self.generations.iter_mut() {
            if m == model {
                *generation += 1;
            }
        }
        self.computed_for.retain(|(_, m), _| m != model);
    }

    /// Invalidate every slot that ever began a compute. Jobs begun before a
    /// bulk replacement must not land in the fresh matrix.
    fn bump_all(&mut self) {
        for generation in self.generations.values_mut() {
            *generation += 1;
        }
    }
}

/// Drive the provider for one job: two embedding fetches, then the distance.
fn run_job(provider: &dyn EmbeddingProvider, job: &FetchJob) -> Result<f64, String> {
    let query = provider
        .generate(&job.query_text, &job.model)
        .map_err(|e| e.to_string())?;
    let stored = provider
        .generate(&job.stored_text, &job.model)
        .map_err(|e| e.to_string())?;
    cosine_distance(&query, &stored).map_err(|e| e.to_string())
}
