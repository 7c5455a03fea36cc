pub mod cluster;
pub mod error;
pub mod identifiers;
pub mod keys;
pub mod merge;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod scoring;
pub mod similarity;
pub mod stats;

pub use cluster::{Assignment, Cluster, ClusterSession, Clustering, MatchKind, SourceRecord, build_clusters};
pub use error::{Result, Stage, UnionError};
pub use keys::{KeyExtractor, RecordKeys};
pub use merge::{MergeOutcome, merge_cluster};
pub use pipeline::{OutputPaths, RunSummary, run};
pub use report::{ClusterManifest, MemberRef};
pub use similarity::{Similarity, token_sort_ratio};
pub use stats::{ClusterStats, SourceStats, size_histogram};
