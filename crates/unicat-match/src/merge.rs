//! Builds one union record per cluster.

use unicat_core::marc::BLANK;
use unicat_core::{DataField, MergeConfig, Record};

use crate::cluster::Cluster;
use crate::error::{Result, UnionError};
use crate::scoring::choose_primary;

#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub record: Record,
    /// Index of the primary member within the cluster.
    pub primary: usize,
    pub score: u32,
}

/// Merge a finished cluster into a new record.
///
/// The result starts as a copy of the primary member, then gains one
/// provenance and one holdings field per member, has each preferred tag
/// replaced by every instance from a single donor (the first member whose
/// record carries that tag), and ends with a merge note. Member records are
/// only read.
pub fn merge_cluster(cluster: &Cluster, policy: &MergeConfig) -> Result<MergeOutcome> {
    let (primary, score) =
        choose_primary(&cluster.members, &policy.prefer_sources).ok_or_else(|| UnionError::Merge {
            cluster_id: cluster.id,
            reason: "cluster has no members".to_string(),
        })?;

    let mut record = cluster.members[primary].record.clone();

    for member in &cluster.members {
        record.push_field(
            DataField::new(policy.provenance_tag.as_str(), BLANK, BLANK)
                .with_subfield('a', format!("({}){}", member.lib, member.local_id)),
        );

        let mut holdings =
            DataField::new(policy.holdings_tag.as_str(), BLANK, BLANK).with_subfield('a', member.lib.as_str());
        if !member.local_id.is_empty() {
            holdings = holdings.with_subfield('b', member.local_id.as_str());
        }
        record.push_field(holdings);
    }

    for tag in policy.prefer_fields.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        let Some(donor) = cluster.members.iter().find(|m| m.record.has_tag(tag)) else {
            continue;
        };
        record.remove_tag(tag);
        for field in donor.record.fields_with_tag(tag) {
            record.push_field(field.clone());
        }
    }

    let libraries: Vec<&str> = cluster.libraries().into_iter().collect();
    record.push_field(DataField::new(policy.merge_note_tag.as_str(), BLANK, BLANK).with_subfield(
        'a',
        format!(
            "Union record of {} records. Libraries: {}",
            cluster.members.len(),
            libraries.join(", ")
        ),
    ));

    Ok(MergeOutcome {
        record,
        primary,
        score,
    })
}
