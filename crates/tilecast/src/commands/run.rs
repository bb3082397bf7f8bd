use crate::cli::RunArgs;
use anyhow::Context;
use tilecast_aggregate::{Enricher, Pipeline, RunReport};
use tilecast_core::Config;
use tilecast_storage::{FileStore, MetadataStore};
use tilecast_text::{load_keywords, LexiconScorer, ScriptLanguageIdentifier};

pub fn run(args: &RunArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => Config::default(),
    };
    args.apply(&mut config);

    let lexicon = LexiconScorer::from_file(&args.lexicon)
        .with_context(|| format!("failed to read lexicon {}", args.lexicon.display()))?;
    let metadata = MetadataStore::open(&args.metadata)?;
    let (matcher, filter) = load_keywords(&metadata)?;
    if matcher.languages().is_empty() {
        tracing::warn!("no keywords defined; every record will be dropped");
    }

    let language = ScriptLanguageIdentifier;
    let storage = FileStore::new(&args.root);
    let enricher = Enricher::new(&language, &lexicon, &matcher, &filter);
    let pipeline = Pipeline::new(config, &storage, enricher);

    let report = match &args.run_id {
        Some(run_id) => pipeline.run_with_id(run_id)?,
        None => pipeline.run()?,
    };

    println!("{}", summary(&report));
    Ok(())
}

fn summary(report: &RunReport) -> serde_json::Value {
    let stats = &report.stats;
    serde_json::json!({
        "run_id": report.run_id,
        "valid": stats.get("valid_tile"),
        "enriched": stats.get("enriched_records"),
        "noise_filtered": stats.get("noise_filtered"),
        "segment_errors": stats.get("segment_errors"),
        "snapshot_keys": report.snapshot.len(),
        "delta_keys": report.delta.len(),
        "rollup_keys": report.rollups.len(),
    })
}
