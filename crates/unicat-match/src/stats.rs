use serde::Serialize;

use crate::cluster::Cluster;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceStats {
    pub label: String,
    /// Records decoded and clustered.
    pub read: u64,
    /// Records that failed to decode and were left out.
    pub skipped: u64,
}

impl SourceStats {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClusterStats {
    pub records: u64,
    pub strong_matches: u64,
    pub fuzzy_matches: u64,
    pub new_clusters: u64,
    /// Similarity computations performed by the fuzzy scan.
    pub fuzzy_comparisons: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SizeBucket {
    pub label: &'static str,
    pub clusters: u64,
}

const BUCKETS: [(&str, usize, usize); 6] = [
    ("1", 1, 1),
    ("2", 2, 2),
    ("3-5", 3, 5),
    ("6-10", 6, 10),
    ("11-50", 11, 50),
    ("51+", 51, usize::MAX),
];

/// Cluster counts per member-count bucket, all buckets present.
pub fn size_histogram(clusters: &[Cluster]) -> Vec<SizeBucket> {
    let mut counts = [0u64; BUCKETS.len()];
    for cluster in clusters {
        let size = cluster.members.len();
        if let Some(i) = BUCKETS.iter().position(|&(_, lo, hi)| (lo..=hi).contains(&size)) {
            counts[i] += 1;
        }
    }
    BUCKETS
        .iter()
        .zip(counts)
        .map(|(&(label, _, _), clusters)| SizeBucket { label, clusters })
        .collect()
}
