//! One batch run: ingest, enrich, expand, reduce, merge, persist

use crate::key::{accumulate, combine, Aggregates};
use crate::keygen::{Emission, KeyGenerator};
use crate::merge::{
    delta_line, encode_lines, merge, LoadedSnapshot, MergeOutcome, SnapshotStore, PART_FILE,
};
use crate::rollup::{rollup_line, RollupEngine, Rollups};
use chrono::Utc;
use rayon::prelude::*;
use std::collections::BTreeMap;
use thiserror::Error;
use tilecast_core::{Config, EnrichedRecord, Record};
use tilecast_storage::{RunStats, Storage, StorageError};
use tilecast_text::{KeywordMatcher, LanguageIdentifier, LexiconScorer, NoiseFilter};

pub const RUN_ID_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("storage failure while {stage}: {source}")]
    Storage {
        stage: &'static str,
        #[source]
        source: StorageError,
    },
    #[error("run id '{0}' is already the current snapshot")]
    RunIdInUse(String),
}

fn storage_err(stage: &'static str) -> impl FnOnce(StorageError) -> PipelineError {
    move |source| PipelineError::Storage { stage, source }
}

/// What enrichment made of a validated record
#[derive(Debug)]
pub enum Enrichment {
    Enriched(EnrichedRecord),
    /// Matched a noise filter group
    Filtered,
    NoKeywords,
}

/// Language, noise filter, sentiment and keywords, in that order.
/// Tables are borrowed and shared read-only across workers.
#[derive(Clone, Copy)]
pub struct Enricher<'a> {
    language: &'a dyn LanguageIdentifier,
    lexicon: &'a LexiconScorer,
    matcher: &'a KeywordMatcher,
    filter: &'a NoiseFilter,
}

impl<'a> Enricher<'a> {
    pub fn new(
        language: &'a dyn LanguageIdentifier,
        lexicon: &'a LexiconScorer,
        matcher: &'a KeywordMatcher,
        filter: &'a NoiseFilter,
    ) -> Self {
        Self {
            language,
            lexicon,
            matcher,
            filter,
        }
    }

    pub fn enrich(&self, record: Record) -> Enrichment {
        let language = record
            .language
            .clone()
            .or_else(|| self.language.identify(&record.text));

        if !self.filter.passes(&record.text) {
            return Enrichment::Filtered;
        }

        let sentiment = self.lexicon.score(&record.text);
        let keywords = self
            .matcher
            .extract_keywords(language.as_deref(), &record.text);
        if keywords.is_empty() {
            return Enrichment::NoKeywords;
        }

        Enrichment::Enriched(EnrichedRecord {
            record,
            language,
            sentiment,
            keywords,
        })
    }
}

/// Per-worker partial result of the map phase
#[derive(Debug, Default)]
struct Batch {
    aggregates: Aggregates,
    counts: BTreeMap<String, u64>,
    messages: Vec<String>,
}

impl Batch {
    fn incr(&mut self, key: &str) {
        self.add(key, 1);
    }

    fn add(&mut self, key: &str, value: u64) {
        *self.counts.entry(key.to_string()).or_insert(0) += value;
    }

    fn merge(mut self, other: Batch) -> Batch {
        self.aggregates = combine(self.aggregates, other.aggregates);
        for (key, value) in other.counts {
            self.add(&key, value);
        }
        self.messages.extend(other.messages);
        self
    }
}

/// Outcome of a successful run
#[derive(Debug)]
pub struct RunReport {
    pub run_id: String,
    pub stats: RunStats,
    pub snapshot: Aggregates,
    pub delta: Aggregates,
    pub rollups: Rollups,
}

pub struct Pipeline<'a> {
    config: Config,
    storage: &'a dyn Storage,
    enricher: Enricher<'a>,
    keygen: KeyGenerator,
    rollup: RollupEngine,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: Config, storage: &'a dyn Storage, enricher: Enricher<'a>) -> Self {
        let keygen = KeyGenerator::from_config(&config);
        let rollup = RollupEngine::from_config(&config);
        Self {
            config,
            storage,
            enricher,
            keygen,
            rollup,
        }
    }

    /// Run with an id derived from the current UTC time
    pub fn run(&self) -> Result<RunReport, PipelineError> {
        let run_id = Utc::now().format(RUN_ID_FORMAT).to_string();
        self.run_with_id(&run_id)
    }

    /// Run under an explicit id. Statistics are saved whether or not the
    /// run succeeds.
    pub fn run_with_id(&self, run_id: &str) -> Result<RunReport, PipelineError> {
        let mut stats = RunStats::start(run_id);
        tracing::info!(run_id, incremental = self.config.incremental, "starting run");

        let result = self.execute(run_id, &mut stats);
        if let Err(err) = &result {
            tracing::warn!(run_id, error = %err, "run failed");
            stats.record_failure(err);
        }
        stats.finish();
        stats.save(self.storage, &self.config.containers.tiles);

        let (snapshot, delta, rollups) = result?;
        tracing::info!(
            run_id,
            snapshot_keys = snapshot.len(),
            delta_keys = delta.len(),
            "run complete"
        );
        Ok(RunReport {
            run_id: run_id.to_string(),
            stats,
            snapshot,
            delta,
            rollups,
        })
    }

    fn execute(
        &self,
        run_id: &str,
        stats: &mut RunStats,
    ) -> Result<(Aggregates, Aggregates, Rollups), PipelineError> {
        let containers = &self.config.containers;
        let snapshots = SnapshotStore::new(self.storage, &containers.snapshots);

        let previous = if self.config.incremental {
            snapshots.load().map_err(storage_err("loading snapshot"))?
        } else {
            LoadedSnapshot {
                run_id: snapshots
                    .current_run_id()
                    .map_err(storage_err("reading snapshot pointer"))?,
                ..LoadedSnapshot::default()
            }
        };
        if previous.run_id.as_deref() == Some(run_id) {
            return Err(PipelineError::RunIdInUse(run_id.to_string()));
        }
        stats.set("snapshot_keys_previous", previous.aggregates.len() as u64);
        stats.set("snapshot_parse_errors", previous.parse_errors);

        let batch = self.map_phase()?;
        stats.add_all(&batch.counts);
        stats.set("aggregate_keys", batch.aggregates.len() as u64);

        let mut messages = batch.messages.into_iter();
        self.storage
            .save_lines(
                &mut messages,
                &containers.messages,
                &format!("{}/{}", run_id, PART_FILE),
            )
            .map_err(storage_err("saving messages"))?;

        let outcome = if self.config.incremental {
            merge(batch.aggregates, previous.aggregates)
        } else {
            MergeOutcome {
                snapshot: batch.aggregates.clone(),
                delta: batch.aggregates,
            }
        };
        stats.set("snapshot_keys", outcome.snapshot.len() as u64);
        stats.set("delta_keys", outcome.delta.len() as u64);

        snapshots
            .save(run_id, &outcome.snapshot)
            .map_err(storage_err("saving snapshot"))?;

        {
            let mut delta_lines = encode_lines(&outcome.delta, delta_line);
            self.storage
                .save_lines(
                    &mut delta_lines,
                    &containers.tiles,
                    &format!("associations/{}/{}", run_id, PART_FILE),
                )
                .map_err(storage_err("saving delta"))?;
        }

        let rollups = if self.config.rollup {
            let (rollups, rollup_errors) = self.rollup.rollup_all(&outcome.delta);
            stats.set("rollup_keys", rollups.len() as u64);
            stats.set("rollup_errors", rollup_errors);

            let mut lines = rollups
                .iter()
                .filter_map(|(key, bucket)| match rollup_line(key, bucket) {
                    Ok(line) => Some(line),
                    Err(err) => {
                        tracing::warn!(key = %key, error = %err, "failed to encode rollup");
                        None
                    }
                });
            self.storage
                .save_lines(
                    &mut lines,
                    &containers.tiles,
                    &format!("rollups/{}/{}", run_id, PART_FILE),
                )
                .map_err(storage_err("saving rollups"))?;
            rollups
        } else {
            Rollups::new()
        };

        snapshots
            .switch(run_id)
            .map_err(storage_err("switching snapshot"))?;
        stats.set("snapshots_deleted", snapshots.retain_only(run_id));

        Ok((outcome.snapshot, outcome.delta, rollups))
    }

    /// Validate, enrich, expand and reduce every input line in parallel
    fn map_phase(&self) -> Result<Batch, PipelineError> {
        let containers = &self.config.containers;
        let lines = self
            .storage
            .load(&containers.input, &self.config.input_pattern)
            .map_err(storage_err("loading input"))?;

        let suffix = self.config.stats_suffix.as_str();
        let valid_key = format!("valid_{}", suffix);

        let batch = lines
            .par_bridge()
            .fold(Batch::default, |mut batch, line| {
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        tracing::warn!(error = %err, "failed to read input line");
                        batch.incr("input_read_errors");
                        return batch;
                    }
                };
                if line.trim().is_empty() {
                    return batch;
                }

                let record = match Record::parse_line(&line) {
                    Ok(record) => record,
                    Err(err) => {
                        tracing::debug!(error = %err, "dropping record");
                        batch.incr(&err.stat_key(suffix));
                        return batch;
                    }
                };
                batch.incr(&valid_key);

                let enriched = match self.enricher.enrich(record) {
                    Enrichment::Enriched(enriched) => enriched,
                    Enrichment::Filtered => {
                        batch.incr("noise_filtered");
                        return batch;
                    }
                    Enrichment::NoKeywords => {
                        batch.incr("no_keywords");
                        return batch;
                    }
                };
                batch.incr("enriched_records");

                match serde_json::to_string(&enriched.to_json()) {
                    Ok(message) => batch.messages.push(message),
                    Err(err) => tracing::warn!(error = %err, "failed to encode message"),
                }

                let mut emitted = 0;
                for emission in self.keygen.emissions(&enriched) {
                    match emission {
                        Emission::Entry(key, value) => {
                            accumulate(&mut batch.aggregates, key, value);
                            emitted += 1;
                        }
                        Emission::Error(err) => {
                            tracing::debug!(kind = err.kind(), error = %err, "skipping location");
                            batch.incr("segment_errors");
                        }
                    }
                }
                batch.add("emissions", emitted);
                batch
            })
            .reduce(Batch::default, Batch::merge);

        Ok(batch)
    }
}
