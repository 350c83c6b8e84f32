use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::orchestrator::{ComparisonOrchestrator, TextPair};

/// Persisted session state: rows and labels only. Distances are never
/// persisted; they are recomputed from current texts on demand.
#[derive(Debug, Serialize, Deserialize)]
struct Session {
    pairs: Vec<TextPair>,
    related: Vec<usize>,
}

/// Load the saved session into `orch`, if one exists.
pub fn load(orch: &mut ComparisonOrchestrator, storage_dir: &Path) -> Result<()> {
    let path = storage_dir.join("session.json");
    if !path.exists() {
        return Ok(());
    }
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("reading session from {}", path.display()))?;
    let session: Session = serde_json::from_str(&contents)
        .with_context(|| format!("parsing session from {}", path.display()))?;

    let related: BTreeMap<usize, bool> =
        session.related.into_iter().map(|i| (i, true)).collect();
    orch.restore_rows(session.pairs, related);
    Ok(())
}

/// Save the session's rows and labels.
pub fn save(orch: &ComparisonOrchestrator, storage_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(storage_dir)
        .with_context(|| format!("creating storage dir {}", storage_dir.display()))?;

    let session = Session {
        pairs: orch.pairs().cloned().collect(),
        related: orch
            .pairs()
            .map(|p| p.index)
            .filter(|&i| orch.labels().get(i))
            .collect(),
    };

    let path = storage_dir.join("session.json");
    let contents = serde_json::to_string_pretty(&session)?;
    std::fs::write(&path, contents)
        .with_context(|| format!("writing session to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_round_trips_rows_and_labels() {
        let dir = tempfile::tempdir().unwrap();

        let mut orch = ComparisonOrchestrator::new();
        orch.add_pair("cat", "feline");
        orch.add_pair("cat", "car");
        orch.set_label(0, true);
        orch.remove_pair(1);
        orch.add_pair("dog", "canine");
        save(&orch, dir.path()).unwrap();

        let mut restored = ComparisonOrchestrator::new();
        load(&mut restored, dir.path()).unwrap();

        assert_eq!(restored.pair_count(), 2);
        assert_eq!(restored.pair(0).unwrap().stored_text, "feline");
        assert!(restored.pair(1).is_none());
        assert_eq!(restored.pair(2).unwrap().query_text, "dog");
        assert!(restored.labels().get(0));
        assert!(!restored.labels().get(2));
        // Indices keep advancing past the restored ones.
        assert_eq!(restored.add_pair("new", "row"), 3);
    }

    #[test]
    fn missing_session_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut orch = ComparisonOrchestrator::new();
        load(&mut orch, dir.path()).unwrap();
        assert_eq!(orch.pair_count(), 0);
    }
}
