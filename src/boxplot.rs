/// Five-number summary of a set of distances, plus the sample count.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxPlotStats {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub count: usize,
}

/// Summarize a set of distances for box-plot rendering. Empty input → `None`.
///
/// Quartiles use the nearest-rank estimator on the ascending sort:
/// `sorted[floor(n*q)]`, zero-indexed. Not interpolated; downstream consumers
/// depend on this exact method.
pub fn summarize(distances: &[f64]) -> Option<BoxPlotStats> {
    if distances.is_empty() {
        return None;
    }

    let mut sorted = distances.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();

    Some(BoxPlotStats {
        min: sorted[0],
        q1: sorted[(n as f64 * 0.25).floor() as usize],
        median: sorted[(n as f64 * 0.5).floor() as usize],
        q3: sorted[(n as f64 * 0.75).floor() as usize],
        max: sorted[n - 1],
        count: n,
    })
}
