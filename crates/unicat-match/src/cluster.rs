//! Incremental clustering over the ordered multi-source record stream.
//!
//! Every record is matched first by strong key, then (when enabled) by the
//! best-scoring fuzzy key seen so far. Both indices are overwritten by every
//! member that carries a key, so a cluster's catchment grows as it gains
//! members and later records can join through any member's key.

use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;
use tracing::{debug, info, warn};
use unicat_core::{MarcError, MatchingConfig, Record, SourceSpec};

use crate::error::{Result, UnionError};
use crate::keys::{self, KeyExtractor};
use crate::similarity::{PreparedKey, Similarity, sort_tokens};
use crate::stats::{ClusterStats, SourceStats};

const READ_PROGRESS_EVERY: u64 = 5000;

/// One input record with its provenance and keys.
#[derive(Debug, Clone)]
pub struct SourceRecord {
    pub lib: String,
    pub local_id: String,
    pub record: Record,
    pub strong_key: Option<String>,
    pub fuzzy_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Cluster {
    /// Sequential from 1 in creation order.
    pub id: usize,
    /// Stream order.
    pub members: Vec<SourceRecord>,
    pub strong_keys: BTreeSet<String>,
    pub fuzzy_keys: BTreeSet<String>,
}

impl Cluster {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            members: Vec::new(),
            strong_keys: BTreeSet::new(),
            fuzzy_keys: BTreeSet::new(),
        }
    }

    /// Distinct source labels, sorted.
    pub fn libraries(&self) -> BTreeSet<&str> {
        self.members.iter().map(|m| m.lib.as_str()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Strong,
    Fuzzy,
    New,
}

/// Where a record was placed and why.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub cluster_id: usize,
    pub kind: MatchKind,
    /// Winning score for fuzzy matches.
    pub similarity: Option<Similarity>,
}

#[derive(Debug, Clone)]
struct FuzzyEntry {
    sorted: String,
    cluster: usize,
}

/// Owns the cluster list and both key indices for one run.
#[derive(Debug)]
pub struct ClusterSession {
    extractor: KeyExtractor,
    fuzzy_matching: bool,
    threshold: u8,
    clusters: Vec<Cluster>,
    strong_index: HashMap<String, usize>,
    /// Insertion-ordered; re-inserting a key moves its cluster, not its position.
    fuzzy_index: IndexMap<String, FuzzyEntry>,
    stats: ClusterStats,
}

impl ClusterSession {
    pub fn new(matching: &MatchingConfig) -> Self {
        Self {
            extractor: KeyExtractor::new(matching),
            fuzzy_matching: matching.fuzzy_matching(),
            threshold: matching.fuzzy_threshold,
            clusters: Vec::new(),
            strong_index: HashMap::new(),
            fuzzy_index: IndexMap::new(),
            stats: ClusterStats::default(),
        }
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn stats(&self) -> &ClusterStats {
        &self.stats
    }

    /// Assign one record and update both indices.
    pub fn add_record(&mut self, lib: &str, record: Record) -> Assignment {
        let found = self.extractor.extract(&record);
        let local_id = keys::local_id(&record);
        self.stats.records += 1;

        let prepared = found.fuzzy.as_deref().map(PreparedKey::new);

        let strong_hit = found
            .strong
            .as_ref()
            .and_then(|k| self.strong_index.get(k))
            .copied();

        let (index, kind, similarity) = if let Some(index) = strong_hit {
            self.stats.strong_matches += 1;
            (index, MatchKind::Strong, None)
        } else if let Some((index, sim)) = prepared.as_ref().and_then(|p| self.best_fuzzy(p)) {
            self.stats.fuzzy_matches += 1;
            (index, MatchKind::Fuzzy, Some(sim))
        } else {
            self.stats.new_clusters += 1;
            let index = self.clusters.len();
            self.clusters.push(Cluster::new(index + 1));
            (index, MatchKind::New, None)
        };

        let cluster = &mut self.clusters[index];
        if let Some(sk) = &found.strong {
            self.strong_index.insert(sk.clone(), index);
            cluster.strong_keys.insert(sk.clone());
        }
        if let Some(fk) = &found.fuzzy {
            let sorted = match &prepared {
                Some(p) => p.sorted().to_string(),
                None => sort_tokens(fk),
            };
            self.fuzzy_index.insert(
                fk.clone(),
                FuzzyEntry {
                    sorted,
                    cluster: index,
                },
            );
            cluster.fuzzy_keys.insert(fk.clone());
        }

        debug!(
            "{} record '{}' -> cluster {} ({:?})",
            lib, local_id, cluster.id, kind
        );

        cluster.members.push(SourceRecord {
            lib: lib.to_string(),
            local_id,
            record,
            strong_key: found.strong,
            fuzzy_key: found.fuzzy,
        });

        Assignment {
            cluster_id: cluster.id,
            kind,
            similarity,
        }
    }

    /// Best fuzzy candidate at or above the threshold. The earliest indexed
    /// key wins ties; an all-zero scan matches nothing.
    fn best_fuzzy(&mut self, query: &PreparedKey) -> Option<(usize, Similarity)> {
        if !self.fuzzy_matching {
            return None;
        }
        self.stats.fuzzy_comparisons += self.fuzzy_index.len() as u64;

        let mut best: Option<usize> = None;
        let mut best_score = Similarity::ZERO;
        for entry in self.fuzzy_index.values() {
            let score = query.similarity(&entry.sorted);
            if score > best_score {
                best_score = score;
                best = Some(entry.cluster);
            }
        }

        best.filter(|_| best_score.meets(self.threshold))
            .map(|index| (index, best_score))
    }

    /// Feed one source's record stream in order. Undecodable records are
    /// logged and counted; an I/O failure stops the stream.
    pub fn ingest<I>(&mut self, label: &str, records: I) -> std::result::Result<SourceStats, MarcError>
    where
        I: IntoIterator<Item = std::result::Result<Record, MarcError>>,
    {
        let mut stats = SourceStats::new(label);
        for (i, item) in records.into_iter().enumerate() {
            let ordinal = i as u64 + 1;
            match item {
                Ok(record) => {
                    stats.read += 1;
                    self.add_record(label, record);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("{}: skipping record #{}: {}", label, ordinal, e);
                    stats.skipped += 1;
                }
            }
            if ordinal % READ_PROGRESS_EVERY == 0 {
                info!("{}: {} records processed", label, ordinal);
            }
        }
        Ok(stats)
    }

    pub fn finish(self, sources: Vec<SourceStats>) -> Clustering {
        Clustering {
            clusters: self.clusters,
            stats: self.stats,
            sources,
        }
    }
}

/// Finalized clusters in id order, with run counters.
#[derive(Debug)]
pub struct Clustering {
    pub clusters: Vec<Cluster>,
    pub stats: ClusterStats,
    pub sources: Vec<SourceStats>,
}

/// Cluster every record of `sources`, in the given source order and file
/// order within each source. All sources are opened before any is read, so
/// a bad path or extension fails the run up front.
pub fn build_clusters(sources: &[SourceSpec], matching: &MatchingConfig) -> Result<Clustering> {
    let readers = sources
        .iter()
        .map(|src| {
            src.open()
                .map(|reader| (src, reader))
                .map_err(|e| UnionError::read(&src.label, &src.path, e))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut session = ClusterSession::new(matching);
    let mut source_stats = Vec::with_capacity(readers.len());

    for (src, reader) in readers {
        info!("Reading {} ({})", src.path.display(), src.label);
        let stats = session
            .ingest(&src.label, reader)
            .map_err(|e| UnionError::read(&src.label, &src.path, e))?;
        info!(
            "{}: {} records read, {} skipped",
            stats.label, stats.read, stats.skipped
        );
        source_stats.push(stats);
    }

    let clustering = session.finish(source_stats);
    info!(
        "Clustering done: {} records in {} clusters",
        clustering.stats.records,
        clustering.clusters.len()
    );
    Ok(clustering)
}
