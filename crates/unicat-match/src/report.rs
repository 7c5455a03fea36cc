//! Per-cluster CSV report and JSON manifest.

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::cluster::Cluster;

pub const REPORT_HEADER: [&str; 4] = ["cluster_id", "size", "strong_keys", "libraries"];

/// One manifest entry. Downstream tooling reads this shape, so field names
/// and ordering are fixed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterManifest {
    pub cluster_id: usize,
    /// Sorted.
    pub strong_keys: Vec<String>,
    /// Stream order.
    pub members: Vec<MemberRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRef {
    pub lib: String,
    pub local_id: String,
}

impl From<&Cluster> for ClusterManifest {
    fn from(cluster: &Cluster) -> Self {
        Self {
            cluster_id: cluster.id,
            strong_keys: cluster.strong_keys.iter().cloned().collect(),
            members: cluster
                .members
                .iter()
                .map(|m| MemberRef {
                    lib: m.lib.clone(),
                    local_id: m.local_id.clone(),
                })
                .collect(),
        }
    }
}

/// One row per cluster: id, member count, `;`-joined sorted strong keys,
/// `;`-joined sorted distinct source labels.
pub fn write_csv_report<W: Write>(clusters: &[Cluster], out: W) -> csv::Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(out);
    writer.write_record(REPORT_HEADER)?;
    for cluster in clusters {
        let strong_keys: Vec<&str> = cluster.strong_keys.iter().map(String::as_str).collect();
        let libraries: Vec<&str> = cluster.libraries().into_iter().collect();
        writer.write_record([
            cluster.id.to_string(),
            cluster.members.len().to_string(),
            strong_keys.join(";"),
            libraries.join(";"),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_json_manifest<W: Write>(clusters: &[Cluster], out: W) -> serde_json::Result<()> {
    let manifest: Vec<ClusterManifest> = clusters.iter().map(ClusterManifest::from).collect();
    serde_json::to_writer_pretty(out, &manifest)
}
