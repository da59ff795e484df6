//! Citation Resolution CLI
//!
//! Runs the citation kernel over one main text and its corpus.
//!
//! ## Subcommands
//!
//! - `run`: full pipeline (continuation, corpus scan, inference, outputs)
//! - `segment`: milestone count and ids of a text
//! - `extend`: continuation only, over a citation map or a corpus-hit table
//! - `analyse`: source counts, uncited reusers, agreement filter, lost sources
//! - `ingest`: merge evaluated citations (JSON lines) into a citation map
//!
//! ## Configuration
//!
//! Environment variables:
//! - `RUST_LOG`: Log level filter (default: `citation_resolve=info,citation_kernel=info`)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//! - `CITATION_CORPUS_ROOT`: corpus root for `run` when `--corpus-root` is not given
//!
//! ## Usage
//!
//! ```bash
//! LOG_FORMAT=pretty cargo run --bin citation_resolve -- run \
//!     --citation-map data/cit_map.json --main-text data/0845Maqrizi.Mawaciz.mARkdown \
//!     --cluster-table data/minified_clusters.csv --metadata data/metadata.tsv \
//!     --corpus-root /corpus --main-uri 0845Maqrizi.Mawaciz
//! ```

use std::collections::BTreeSet;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use citation_kernel::analysis::{lost_sources, source_counts, uncited_reusers};
use citation_kernel::config::{ResumeTables, RunPaths};
use citation_kernel::segmenter::{milestone_ids, read_text};
use citation_kernel::table::{read_rows, write_rows};
use citation_kernel::{
    load_cluster_store, AgreementFilter, AttributionFilter, AttributionRecord, CitationMap, CitationRun,
    ContinuationResolver, CorpusHit, EvaluatedCitation, HeavyArabicNormalizer, InputMode, MetadataTable,
    ResolverPolicy, RunConfig, SourceUri, WalkMode,
};

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "citation_resolve=info,citation_kernel=info".into());

    if log_format == "pretty" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_span_events(FmtSpan::CLOSE))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .flatten_event(true),
            )
            .init();
    }
}

#[derive(Parser)]
#[command(name = "citation_resolve", version, about = "Resolve and extend citations across a text-reuse corpus")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline.
    Run(RunArgs),
    /// Print the milestone count and ids of a text.
    Segment {
        /// Text to segment.
        #[arg(long)]
        text: PathBuf,
    },
    /// Run continuation only.
    Extend(ExtendArgs),
    /// Analyse a finished attribution table.
    Analyse(AnalyseArgs),
    /// Merge evaluated citations into a citation map.
    Ingest {
        /// Citation map to update.
        #[arg(long)]
        citation_map: PathBuf,
        /// JSON-lines file of evaluated citations.
        #[arg(long)]
        evaluations: PathBuf,
        /// Write the merged map here instead of in place.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct PolicyArgs {
    /// Only extend sources known to be in the corpus.
    #[arg(long)]
    in_corpus_only: bool,
    /// Milestone advance rule: next-id or next-segment.
    #[arg(long)]
    walk_mode: Option<String>,
}

impl PolicyArgs {
    fn apply(&self, policy: &mut ResolverPolicy) -> Result<(), Box<dyn std::error::Error>> {
        if self.in_corpus_only {
            policy.in_corpus_only = true;
        }
        if let Some(mode) = &self.walk_mode {
            policy.walk_mode = mode.parse::<WalkMode>()?;
        }
        Ok(())
    }
}

#[derive(Args)]
struct RunArgs {
    /// JSON run configuration; flags override it.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    citation_map: Option<PathBuf>,
    #[arg(long)]
    main_text: Option<PathBuf>,
    #[arg(long)]
    cluster_table: Option<PathBuf>,
    #[arg(long)]
    metadata: Option<PathBuf>,
    /// Corpus root directory.
    #[arg(long, env = "CITATION_CORPUS_ROOT")]
    corpus_root: Option<PathBuf>,
    #[arg(long)]
    main_uri: Option<String>,
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Reuse a verified attribution table.
    #[arg(long)]
    resume_verified: Option<PathBuf>,
    /// Reuse a corpus hit table.
    #[arg(long)]
    resume_corpus_citations: Option<PathBuf>,
    /// Reuse an extended corpus citation table.
    #[arg(long)]
    resume_continuous: Option<PathBuf>,
    /// Scan corpus texts one at a time.
    #[arg(long)]
    sequential: bool,
    /// Worker pool size for the corpus scan.
    #[arg(long)]
    workers: Option<usize>,
    #[command(flatten)]
    policy: PolicyArgs,
}

#[derive(Args)]
struct ExtendArgs {
    /// cit-map or corpus-hits.
    #[arg(long)]
    input_mode: String,
    /// Citation map (cit-map) or corpus hit table (corpus-hits).
    #[arg(long)]
    input: PathBuf,
    #[arg(long)]
    cluster_table: PathBuf,
    #[arg(long)]
    metadata: PathBuf,
    /// Main text URI (cit-map mode).
    #[arg(long)]
    main_uri: Option<String>,
    /// Main text, for segment walks.
    #[arg(long)]
    main_text: Option<PathBuf>,
    #[arg(long)]
    output: PathBuf,
    #[command(flatten)]
    policy: PolicyArgs,
}

#[derive(Args)]
struct AnalyseArgs {
    /// Final attribution table.
    #[arg(long)]
    attributions: PathBuf,
    #[arg(long)]
    main_text: PathBuf,
    #[arg(long)]
    main_uri: String,
    #[arg(long)]
    cluster_table: PathBuf,
    #[arg(long)]
    metadata: PathBuf,
    /// Agreement thresholds to export.
    #[arg(long, value_delimiter = ',', default_value = "2,3,4")]
    min_origins: Vec<usize>,
    #[arg(long, default_value = "outputs")]
    output_dir: PathBuf,
}

fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    if let Some(dir) = args.output_dir {
        config.output.dir = dir;
    }
    if args.sequential {
        config.scan.parallel = false;
    }
    if let Some(workers) = args.workers {
        config.scan.worker_count = workers;
    }
    args.policy.apply(&mut config.resolver)?;

    let inputs = RunPaths {
        citation_map: args.citation_map,
        main_text: args.main_text,
        cluster_table: args.cluster_table,
        metadata: args.metadata,
        corpus_root: args.corpus_root,
        main_uri: args.main_uri,
        resume: ResumeTables {
            verified: args.resume_verified,
            corpus_citations: args.resume_corpus_citations,
            continuous_corpus_citations: args.resume_continuous,
        },
    }
    .validate()?;

    let report = CitationRun::new(inputs, config).execute()?;
    if report.skipped_texts() > 0 {
        warn!(skipped = report.skipped_texts(), "some corpus texts were skipped");
    }
    println!("{}", serde_json::to_string_pretty(&report.manifest)?);
    Ok(())
}

fn segment(text: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let content = read_text(text)?;
    let ids = milestone_ids(&content);
    if ids.is_empty() {
        warn!(path = %text.display(), "no milestone markers found");
    }
    let summary = serde_json::json!({
        "path": text.display().to_string(),
        "milestones": ids.len(),
        "ids": ids,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn extend(args: ExtendArgs) -> Result<(), Box<dyn std::error::Error>> {
    // Unknown modes abort before any input is read.
    let mode: InputMode = args.input_mode.parse()?;
    let mut policy = ResolverPolicy::default();
    args.policy.apply(&mut policy)?;

    let metadata = MetadataTable::load_tsv(&args.metadata)?;
    let store = load_cluster_store(&args.cluster_table, &metadata)?;
    let mut resolver = ContinuationResolver::new(&store, policy);
    if let Some(path) = &args.main_text {
        resolver = resolver.with_segments(milestone_ids(&read_text(path)?));
    }

    match mode {
        InputMode::CitationMap => {
            let main_uri = args
                .main_uri
                .map(SourceUri::new)
                .ok_or(citation_kernel::ConfigError::MissingPath { field: "main_uri" })?;
            let map = CitationMap::load(&args.input)?.normalize(&HeavyArabicNormalizer::new());
            let records = resolver.resolve_citation_map(&main_uri, &map);
            write_rows(&args.output, &records)?;
            info!(records = records.len(), output = %args.output.display(), "verified attributions written");
        }
        InputMode::CorpusHits => {
            let hits: Vec<CorpusHit> = read_rows(&args.input)?;
            let citations = resolver.resolve_corpus_hits(&hits);
            write_rows(&args.output, &citations)?;
            info!(citations = citations.len(), output = %args.output.display(), "corpus citations written");
        }
    }
    Ok(())
}

fn analyse(args: AnalyseArgs) -> Result<(), Box<dyn std::error::Error>> {
    let records: Vec<AttributionRecord> = read_rows(&args.attributions)?;
    let metadata = MetadataTable::load_tsv(&args.metadata)?;
    let store = load_cluster_store(&args.cluster_table, &metadata)?;
    let milestones = milestone_ids(&read_text(&args.main_text)?);
    let matched: BTreeSet<_> = records.iter().map(|r| r.ms).collect();
    let main_uri = SourceUri::new(args.main_uri);

    write_rows(&args.output_dir.join("cited_source_counts.csv"), &source_counts(&records))?;
    write_rows(
        &args.output_dir.join("uncited_ms_reusers.csv"),
        &uncited_reusers(&milestones, &matched, &store, &main_uri),
    )?;
    for min_origins in &args.min_origins {
        let filtered = AgreementFilter::new(*min_origins).apply(&records);
        write_rows(
            &args.output_dir.join(format!("citations_filtered_by_agreement_of_{min_origins}.csv")),
            &filtered,
        )?;
    }

    let lost = lost_sources(&records, &metadata);
    let lost_path = args.output_dir.join("lost_sources.json");
    std::fs::write(&lost_path, serde_json::to_string_pretty(&lost)?)?;
    info!(output_dir = %args.output_dir.display(), "analysis written");
    Ok(())
}

fn ingest(citation_map: &Path, evaluations: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let mut map = CitationMap::load(citation_map)?;

    let file = std::fs::File::open(evaluations)?;
    let mut records = Vec::new();
    for line in std::io::BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str::<EvaluatedCitation>(&line)?);
    }

    let incidents = map.apply_evaluations(&records);
    let target = output.unwrap_or(citation_map);
    map.save(target)?;
    info!(
        records = records.len(),
        skipped = incidents.len(),
        sources = map.len(),
        output = %target.display(),
        "evaluations merged"
    );
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let cli = Cli::parse();
    info!(version = env!("CARGO_PKG_VERSION"), "citation_resolve starting");

    let result = match cli.command {
        Command::Run(args) => run(args),
        Command::Segment { text } => segment(&text),
        Command::Extend(args) => extend(args),
        Command::Analyse(args) => analyse(args),
        Command::Ingest {
            citation_map,
            evaluations,
            output,
        } => ingest(&citation_map, &evaluations, output.as_deref()),
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "citation_resolve failed");
    }
    result
}
