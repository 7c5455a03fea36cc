use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use unicat_core::config::parse_list;
use unicat_core::error::ExitCode;
use unicat_core::{CatalogError, SourceSpec, UnionConfig};
use unicat_match::identifiers::{Isbn, Issn};
use unicat_match::{KeyExtractor, OutputPaths, UnionError, keys};

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "unicat",
    about = "Union catalog builder for ISO 2709 MARC sources",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format (for scripts).
    /// Also enabled by setting UNICAT_JSON=1.
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file. Defaults to $UNICAT_CONFIG, then ~/.config/unicat/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Cluster all sources and write the merged collection and reports.
    Build(BuildArgs),

    /// Print the identity keys extracted from each record of one source.
    Keys {
        #[arg(value_name = "LIB=PATH")]
        source: String,
        #[arg(long)]
        no_checksum: bool,
    },

    /// Validate and normalize an ISBN (or an ISSN with --issn).
    CheckId {
        value: String,
        #[arg(long)]
        issn: bool,
        #[arg(long)]
        no_checksum: bool,
    },
}

#[derive(Args)]
struct BuildArgs {
    /// Input source, repeatable. Order decides cluster ids and tie-breaks.
    #[arg(long = "src", required = true, value_name = "LIB=PATH")]
    sources: Vec<String>,

    /// Merged collection (.xml for MARCXML, .mrc/.marc/.dat/.iso2709 for ISO 2709).
    #[arg(long)]
    out: PathBuf,

    /// Per-cluster CSV report.
    #[arg(long)]
    report: PathBuf,

    /// Per-cluster JSON manifest.
    #[arg(long)]
    clusters_json: Option<PathBuf>,

    /// Minimum fuzzy similarity, inclusive (0-100).
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    weak_threshold: Option<u8>,

    #[arg(long)]
    no_fuzzy: bool,

    #[arg(long)]
    strong_only: bool,

    #[arg(long)]
    no_checksum: bool,

    /// Comma-separated source labels that win score ties, in order.
    #[arg(long)]
    prefer: Option<String>,

    /// Comma-separated tags copied whole from one donor record.
    #[arg(long)]
    prefer_fields: Option<String>,

    #[arg(long)]
    provenance_tag: Option<String>,

    #[arg(long)]
    holdings_tag: Option<String>,

    #[arg(long)]
    merge_note_tag: Option<String>,

    /// Reserved; accepted for compatibility.
    #[arg(long = "keep-9xx")]
    keep_9xx: bool,
}

// ─── Main ────────────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let json_output = cli.json || std::env::var("UNICAT_JSON").as_deref() == Ok("1");

    if let Err(err) = run(cli, json_output) {
        if json_output {
            let _ = print_json(&serde_json::json!({"status":"error","message":format!("{err:#}")}));
        } else {
            eprintln!("error: {err:#}");
        }
        std::process::exit(exit_code(&err) as i32);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli, json_output: bool) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Build(args) => cmd_build(config, &args, json_output),
        Commands::Keys {
            source,
            no_checksum,
        } => cmd_keys(config, &source, no_checksum, json_output),
        Commands::CheckId {
            value,
            issn,
            no_checksum,
        } => cmd_check_id(&value, issn, !no_checksum, json_output),
    }
}

fn load_config(path: Option<&Path>) -> Result<UnionConfig> {
    match path {
        Some(path) if !path.exists() => Err(CatalogError::Config(format!(
            "config file not found: {}",
            path.display()
        ))
        .into()),
        Some(path) => Ok(UnionConfig::load_from(path)?),
        None => Ok(UnionConfig::load()?),
    }
}

/// Command-line flags win over file values.
fn apply_overrides(mut config: UnionConfig, args: &BuildArgs) -> UnionConfig {
    if let Some(threshold) = args.weak_threshold {
        config.matching.fuzzy_threshold = threshold;
    }
    if args.no_fuzzy {
        config.matching.fuzzy = false;
    }
    if args.strong_only {
        config.matching.strong_only = true;
    }
    if args.no_checksum {
        config.matching.checksums = false;
    }
    if let Some(prefer) = &args.prefer {
        config.merge.prefer_sources = parse_list(prefer);
    }
    if let Some(fields) = &args.prefer_fields {
        config.merge.prefer_fields = parse_list(fields);
    }
    if let Some(tag) = &args.provenance_tag {
        config.merge.provenance_tag = tag.trim().to_string();
    }
    if let Some(tag) = &args.holdings_tag {
        config.merge.holdings_tag = tag.trim().to_string();
    }
    if let Some(tag) = &args.merge_note_tag {
        config.merge.merge_note_tag = tag.trim().to_string();
    }
    if args.keep_9xx {
        config.merge.keep_legacy_fields = true;
    }
    config
}

// ─── Commands ───────────────────────────────────────────────────────────────

fn cmd_build(config: UnionConfig, args: &BuildArgs, json_output: bool) -> Result<()> {
    let start = Instant::now();
    let config = apply_overrides(config, args);
    let sources = args
        .sources
        .iter()
        .map(|s| SourceSpec::parse(s))
        .collect::<Result<Vec<_>, _>>()
        .map_err(UnionError::from)?;
    let outputs = OutputPaths {
        collection: args.out.clone(),
        report: args.report.clone(),
        manifest: args.clusters_json.clone(),
    };

    let summary = unicat_match::run(&config, &sources, &outputs)?;
    let dur = start.elapsed().as_millis() as u64;

    if json_output {
        print_json(&serde_json::json!({"status":"ok","data":summary,"meta":{"duration_ms":dur}}))?;
    } else {
        println!(
            "{} records from {} sources -> {} union records",
            summary.clustering.records,
            summary.sources.len(),
            summary.merged_records
        );
        if !summary.oversized_clusters.is_empty() {
            println!(
                "  {} clusters too large for ISO 2709 were left out; use .xml output",
                summary.oversized_clusters.len()
            );
        }
        println!("  collection: {}", outputs.collection.display());
        println!("  report:     {}", outputs.report.display());
        if let Some(manifest) = &outputs.manifest {
            println!("  manifest:   {}", manifest.display());
        }
    }
    Ok(())
}

fn cmd_keys(config: UnionConfig, source: &str, no_checksum: bool, json_output: bool) -> Result<()> {
    let spec = SourceSpec::parse(source)?;
    let reader = spec.open()?;

    let mut matching = config.matching;
    matching.fuzzy = true;
    if no_checksum {
        matching.checksums = false;
    }
    let extractor = KeyExtractor::new(&matching);

    let mut rows = Vec::new();
    for (i, item) in reader.enumerate() {
        let record = match item {
            Ok(record) => record,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                warn!("{}: skipping record #{}: {}", spec.label, i + 1, e);
                continue;
            }
        };
        let found = extractor.extract(&record);
        let local_id = keys::local_id(&record);

        if json_output {
            rows.push(serde_json::json!({
                "local_id": local_id,
                "strong_key": found.strong,
                "fuzzy_key": found.fuzzy,
            }));
        } else {
            println!(
                "{}\t{}\t{}",
                local_id,
                found.strong.as_deref().unwrap_or("-"),
                found.fuzzy.as_deref().unwrap_or("")
            );
        }
    }

    if json_output {
        print_json(&serde_json::json!({"status":"ok","data":rows}))?;
    }
    Ok(())
}

fn cmd_check_id(value: &str, issn: bool, checksums: bool, json_output: bool) -> Result<()> {
    let data = if issn {
        let issn = Issn::parse(value, checksums)?;
        serde_json::json!({
            "type": "ISSN",
            "normalized": issn.normalized,
            "formatted": issn.hyphenated(),
        })
    } else {
        let isbn = Isbn::parse(value, checksums)?;
        serde_json::json!({
            "type": "ISBN",
            "normalized": isbn.normalized,
            "isbn13": isbn.isbn13(),
        })
    };

    if json_output {
        print_json(&serde_json::json!({"status":"ok","data":data}))?;
    } else {
        println!("{}", data["normalized"].as_str().unwrap_or_default());
    }
    Ok(())
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn print_json(val: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}

fn exit_code(err: &anyhow::Error) -> ExitCode {
    if let Some(e) = err.downcast_ref::<UnionError>() {
        return match e {
            UnionError::Config(_) | UnionError::InvalidIsbn(_) | UnionError::InvalidIssn(_) => {
                ExitCode::InvalidArgs
            }
            UnionError::Source { source, .. } if source.downcast_ref::<CatalogError>().is_some() => {
                ExitCode::InvalidArgs
            }
            UnionError::Write { .. } => ExitCode::FileSystemError,
            _ => ExitCode::GeneralError,
        };
    }
    if err.downcast_ref::<CatalogError>().is_some() {
        return ExitCode::InvalidArgs;
    }
    ExitCode::GeneralError
}
