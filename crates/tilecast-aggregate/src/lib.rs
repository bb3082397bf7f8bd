//! Aggregation engine: key fan-out, rollups, incremental merge, batch runs

mod key;
mod keygen;
mod merge;
mod pipeline;
mod rollup;

pub use key::{
    accumulate, combine, merge_sentiment, weighted_means, AggregationKey, AggregationValue,
    Aggregates, KEYWORD_TAG,
};
pub use keygen::{keyword_pairs, Emission, KeyError, KeyGenerator, KeywordPairs, RecordEmissions};
pub use merge::{
    delta_line, encode_lines, merge, parse_line, snapshot_line, LoadedSnapshot, MergeOutcome,
    SnapshotPointer, SnapshotStore, CURRENT_FILE, PART_FILE,
};
pub use pipeline::{Enricher, Enrichment, Pipeline, PipelineError, RunReport, RUN_ID_FORMAT};
pub use rollup::{rollup_line, RollupBucket, RollupEngine, Rollups};
