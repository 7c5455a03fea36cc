//! End-to-end union build: cluster, merge, write artifacts.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};
use unicat_core::{CatalogError, CollectionWriter, OutputFormat, SourceSpec, UnionConfig};

use crate::cluster::build_clusters;
use crate::error::{Result, UnionError};
use crate::merge::merge_cluster;
use crate::report::{write_csv_report, write_json_manifest};
use crate::stats::{ClusterStats, SizeBucket, SourceStats, size_histogram};

const WRITE_PROGRESS_EVERY: usize = 2000;

const COLLECTION: &str = "merged collection";
const CSV_REPORT: &str = "CSV report";
const JSON_MANIFEST: &str = "JSON manifest";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    /// `.xml` for MARCXML, an ISO 2709 extension otherwise.
    pub collection: PathBuf,
    pub report: PathBuf,
    pub manifest: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub sources: Vec<SourceStats>,
    pub clustering: ClusterStats,
    pub clusters: usize,
    pub merged_records: usize,
    /// Clusters whose merged record does not fit ISO 2709; still reported.
    pub oversized_clusters: Vec<usize>,
    pub size_histogram: Vec<SizeBucket>,
}

fn create_output(path: &Path) -> io::Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(BufWriter::new(File::create(path)?))
}

/// Run a full build. Configuration and source problems are reported before
/// any record is read; any output failure aborts naming the artifact. A merged
/// record too large for ISO 2709 is left out of the collection with a warning
/// and its cluster still appears in the report and manifest.
pub fn run(config: &UnionConfig, sources: &[SourceSpec], outputs: &OutputPaths) -> Result<RunSummary> {
    let config = config.clone().validate()?;
    if sources.is_empty() {
        return Err(CatalogError::Config("at least one source is required".to_string()).into());
    }
    OutputFormat::from_path(&outputs.collection)?;
    debug!("Effective configuration: {:?}", config);

    let clustering = build_clusters(sources, &config.matching)?;
    let clusters = &clustering.clusters;

    info!("Writing {} ({})", COLLECTION, outputs.collection.display());
    let write_err = |e: unicat_core::MarcError| UnionError::write(COLLECTION, &outputs.collection, e);
    let mut writer = CollectionWriter::create(&outputs.collection)
        .map_err(|e| UnionError::write(COLLECTION, &outputs.collection, e))?;
    let mut oversized_clusters = Vec::new();
    for (i, cluster) in clusters.iter().enumerate() {
        let merged = merge_cluster(cluster, &config.merge)?;
        match writer.write_record(&merged.record) {
            Ok(()) => {}
            Err(e) if e.is_oversized() => {
                warn!(
                    "Cluster {} ({} members) left out of {}: {}; write .xml output to keep it",
                    cluster.id,
                    cluster.members.len(),
                    COLLECTION,
                    e
                );
                oversized_clusters.push(cluster.id);
            }
            Err(e) => return Err(write_err(e)),
        }
        let done = i + 1;
        if done % WRITE_PROGRESS_EVERY == 0 {
            info!("{}/{} records written", done, clusters.len());
        }
    }
    writer.finish().map_err(write_err)?;

    info!("Writing {} ({})", CSV_REPORT, outputs.report.display());
    let csv_err = |e: csv::Error| UnionError::write(CSV_REPORT, &outputs.report, e);
    let out = create_output(&outputs.report).map_err(|e| UnionError::write(CSV_REPORT, &outputs.report, e))?;
    write_csv_report(clusters, out).map_err(csv_err)?;

    if let Some(path) = &outputs.manifest {
        info!("Writing {} ({})", JSON_MANIFEST, path.display());
        let mut out = create_output(path).map_err(|e| UnionError::write(JSON_MANIFEST, path, e))?;
        write_json_manifest(clusters, &mut out).map_err(|e| UnionError::write(JSON_MANIFEST, path, e))?;
        out.flush().map_err(|e| UnionError::write(JSON_MANIFEST, path, e))?;
    }

    let summary = RunSummary {
        sources: clustering.sources.clone(),
        clustering: clustering.stats.clone(),
        clusters: clusters.len(),
        merged_records: clusters.len() - oversized_clusters.len(),
        oversized_clusters,
        size_histogram: size_histogram(clusters),
    };
    log_summary(&summary);
    Ok(summary)
}

fn log_summary(summary: &RunSummary) {
    for source in &summary.sources {
        info!(
            "{}: {} records read, {} skipped",
            source.label, source.read, source.skipped
        );
    }
    let stats = &summary.clustering;
    info!(
        "{} records -> {} clusters ({} strong, {} fuzzy, {} new; {} fuzzy comparisons)",
        stats.records,
        summary.clusters,
        stats.strong_matches,
        stats.fuzzy_matches,
        stats.new_clusters,
        stats.fuzzy_comparisons
    );
    if !summary.oversized_clusters.is_empty() {
        warn!(
            "{} merged records too large for ISO 2709 were not written: clusters {:?}",
            summary.oversized_clusters.len(),
            summary.oversized_clusters
        );
    }
    for bucket in &summary.size_histogram {
        info!("  size {:>5}: {}", bucket.label, bucket.clusters);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Stage;
    use crate::report::ClusterManifest;
    use std::io::BufReader;
    use tempfile::TempDir;
    use unicat_core::marc::iso2709;
    use unicat_core::{DataField, Field, Record};

    fn book(id: &str, isbn: &str, title: &str) -> Record {
        Record::new()
            .with_field(Field::control("001", id))
            .with_field(DataField::new("020", ' ', ' ').with_subfield('a', isbn))
            .with_field(DataField::new("245", '1', '0').with_subfield('a', title))
    }

    fn write_source(dir: &Path, name: &str, records: &[Record]) -> PathBuf {
        let path = dir.join(name);
        let mut writer = iso2709::Writer::new(File::create(&path).unwrap());
        for r in records {
            writer.write_record(r).unwrap();
        }
        writer.finish().unwrap();
        path
    }

    fn two_libraries(dir: &Path) -> Vec<SourceSpec> {
        let lib1 = write_source(
            dir,
            "lib1.mrc",
            &[
                book("A1", "9780306406157", "Understanding physics"),
                book("A2", "", "Cien años de soledad"),
            ],
        );
        let lib2 = write_source(
            dir,
            "lib2.mrc",
            &[
                book("B7", "978-0-306-40615-7", "Understanding physics /"),
                book("B8", "", "Cien anos de soledad."),
                book("B9", "", "Something else entirely"),
            ],
        );
        vec![SourceSpec::new("LIB1", lib1), SourceSpec::new("LIB2", lib2)]
    }

    fn outputs(dir: &Path, collection: &str) -> OutputPaths {
        OutputPaths {
            collection: dir.join(collection),
            report: dir.join("report.csv"),
            manifest: Some(dir.join("clusters.json")),
        }
    }

    #[test]
    fn test_full_run_writes_all_artifacts() {
        let dir = TempDir::new().unwrap();
        let sources = two_libraries(dir.path());
        let out = outputs(dir.path(), "union.mrc");

        let summary = run(&UnionConfig::default(), &sources, &out).unwrap();
        assert_eq!(summary.clusters, 3);
        assert_eq!(summary.clustering.records, 5);
        assert_eq!(summary.clustering.strong_matches, 1);
        assert_eq!(summary.clustering.fuzzy_matches, 1);

        let manifest: Vec<ClusterManifest> =
            serde_json::from_str(&fs::read_to_string(out.manifest.as_ref().unwrap()).unwrap()).unwrap();
        assert_eq!(manifest.len(), 3);
        assert_eq!(manifest[0].strong_keys, vec!["ISBN:9780306406157"]);
        let members: Vec<(&str, &str)> = manifest[0]
            .members
            .iter()
            .map(|m| (m.lib.as_str(), m.local_id.as_str()))
            .collect();
        assert_eq!(members, vec![("LIB1", "A1"), ("LIB2", "B7")]);

        let report = fs::read_to_string(&out.report).unwrap();
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[0], "cluster_id,size,strong_keys,libraries");
        assert_eq!(lines[1], "1,2,ISBN:9780306406157,LIB1;LIB2");
        assert_eq!(lines.len(), 4);

        let merged: Vec<Record> = iso2709::Reader::new(BufReader::new(File::open(&out.collection).unwrap()))
            .collect::<std::result::Result<_, _>>()
            .unwrap();
        assert_eq!(merged.len(), 3);
        let note = merged[0].data_fields("948").next().and_then(|f| f.first_subfield('a'));
        assert_eq!(note, Some("Union record of 2 records. Libraries: LIB1, LIB2"));
        assert_eq!(merged[0].data_fields("910").count(), 2);
    }

    #[test]
    fn test_marcxml_output_and_no_manifest() {
        let dir = TempDir::new().unwrap();
        let sources = two_libraries(dir.path());
        let mut out = outputs(dir.path(), "nested/union.xml");
        out.manifest = None;

        run(&UnionConfig::default(), &sources, &out).unwrap();
        let xml = fs::read_to_string(&out.collection).unwrap();
        assert!(xml.contains("<collection"));
        assert_eq!(xml.matches("<record").count(), 3);
        assert!(!dir.path().join("clusters.json").exists());
    }

    #[test]
    fn test_runs_are_reproducible() {
        let dir = TempDir::new().unwrap();
        let sources = two_libraries(dir.path());
        let first = outputs(dir.path(), "first.mrc");
        let second = OutputPaths {
            collection: dir.path().join("second.mrc"),
            report: dir.path().join("second.csv"),
            manifest: Some(dir.path().join("second.json")),
        };
        run(&UnionConfig::default(), &sources, &first).unwrap();
        run(&UnionConfig::default(), &sources, &second).unwrap();

        for (a, b) in [
            (&first.collection, &second.collection),
            (&first.report, &second.report),
        ] {
            assert_eq!(fs::read(a).unwrap(), fs::read(b).unwrap());
        }
        assert_eq!(
            fs::read(first.manifest.unwrap()).unwrap(),
            fs::read(second.manifest.unwrap()).unwrap()
        );
    }

    #[test]
    fn test_no_fuzzy_keeps_title_matches_apart() {
        let dir = TempDir::new().unwrap();
        let sources = two_libraries(dir.path());
        let mut config = UnionConfig::default();
        config.matching.fuzzy = false;

        let summary = run(&config, &sources, &outputs(dir.path(), "union.mrc")).unwrap();
        assert_eq!(summary.clusters, 4);
        assert_eq!(summary.clustering.fuzzy_comparisons, 0);
    }

    #[test]
    fn test_configuration_errors_come_first() {
        let dir = TempDir::new().unwrap();
        let sources = two_libraries(dir.path());

        let err = run(&UnionConfig::default(), &sources, &outputs(dir.path(), "union.txt")).unwrap_err();
        assert!(matches!(err, UnionError::Config(CatalogError::UnknownOutputFormat(_))));
        assert!(!dir.path().join("report.csv").exists());

        let err = run(&UnionConfig::default(), &[], &outputs(dir.path(), "union.mrc")).unwrap_err();
        assert!(matches!(err, UnionError::Config(_)));

        let mut config = UnionConfig::default();
        config.merge.provenance_tag = "35".to_string();
        let err = run(&config, &sources, &outputs(dir.path(), "union.mrc")).unwrap_err();
        assert!(matches!(err, UnionError::Config(_)));
    }

    #[test]
    fn test_write_failure_names_artifact() {
        let dir = TempDir::new().unwrap();
        let sources = two_libraries(dir.path());
        // A directory where the report file should go.
        let blocked = dir.path().join("report.csv");
        fs::create_dir(&blocked).unwrap();

        let err = run(&UnionConfig::default(), &sources, &outputs(dir.path(), "union.mrc")).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Write));
        assert!(err.to_string().contains("CSV report"));
    }

    #[test]
    fn test_malformed_records_are_skipped_and_counted() {
        let dir = TempDir::new().unwrap();
        let good = write_source(dir.path(), "lib1.mrc", &[book("A1", "9780306406157", "Title")]);
        let mut bytes = fs::read(&good).unwrap();
        bytes.extend_from_slice(b"garbage that is not a record\x1d");
        let noisy = dir.path().join("noisy.mrc");
        fs::write(&noisy, bytes).unwrap();

        let sources = vec![SourceSpec::new("LIB1", noisy)];
        let summary = run(&UnionConfig::default(), &sources, &outputs(dir.path(), "union.mrc")).unwrap();
        assert_eq!(summary.sources[0].read, 1);
        assert_eq!(summary.sources[0].skipped, 1);
        assert_eq!(summary.clusters, 1);
    }

    #[test]
    fn test_oversized_cluster_is_left_out_of_iso2709_only() {
        let dir = TempDir::new().unwrap();
        let mut records: Vec<Record> = (0..2_500)
            .map(|i| book(&format!("A{i}"), "9780306406157", "Understanding physics"))
            .collect();
        records.push(book("Z1", "9780140449136", "The odyssey"));
        let lib1 = write_source(dir.path(), "lib1.mrc", &records);
        let sources = vec![SourceSpec::new("LIB1", lib1)];

        let out = outputs(dir.path(), "union.mrc");
        let summary = run(&UnionConfig::default(), &sources, &out).unwrap();
        assert_eq!(summary.clusters, 2);
        assert_eq!(summary.oversized_clusters, vec![1]);
        assert_eq!(summary.merged_records, 1);

        let merged: Vec<Record> = iso2709::Reader::new(BufReader::new(File::open(&out.collection).unwrap()))
            .collect::<std::result::Result<_, _>>()
            .unwrap();
        assert_eq!(merged.len(), 1);
        let report = fs::read_to_string(&out.report).unwrap();
        assert!(report.lines().any(|l| l.starts_with("1,2500,")));
        assert!(out.manifest.as_ref().unwrap().exists());

        let xml_out = OutputPaths {
            collection: dir.path().join("union.xml"),
            report: dir.path().join("xml-report.csv"),
            manifest: None,
        };
        let summary = run(&UnionConfig::default(), &sources, &xml_out).unwrap();
        assert!(summary.oversized_clusters.is_empty());
        assert_eq!(summary.merged_records, 2);
    }
}
