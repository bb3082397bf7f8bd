use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tilecast_core::Config;

#[derive(Parser)]
#[command(name = "tilecast")]
#[command(version)]
#[command(about = "Geo-temporal keyword co-occurrence aggregation")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute one batch aggregation run
    Run(RunArgs),

    /// Tile geometry lookups
    Tile {
        #[command(subcommand)]
        action: TileAction,
    },

    /// Score text against a sentiment lexicon
    Score {
        /// Lexicon file, one JSON entry per line
        #[arg(long, env = "SENTIMENT_LEXICON")]
        lexicon: PathBuf,

        text: String,
    },

    /// Print the statistics of the last run
    Stats {
        /// Storage root directory
        #[arg(long, env = "TILECAST_ROOT", default_value = ".")]
        root: PathBuf,

        /// Container holding stats.json
        #[arg(long, env = "TILE_OUTPUT_CONTAINER", default_value = "tiles")]
        container: String,
    },

    /// Maintain the keyword and noise-filter tables
    Keywords {
        /// SQLite metadata database
        #[arg(long, env = "TILECAST_METADATA")]
        metadata: PathBuf,

        #[command(subcommand)]
        action: KeywordAction,
    },
}

#[derive(Args)]
pub struct RunArgs {
    /// Storage root directory; containers are sub-directories
    #[arg(long, env = "TILECAST_ROOT", default_value = ".")]
    pub root: PathBuf,

    /// Glob of input files inside the input container
    #[arg(long, env = "TILE_INPUT_PATTERN")]
    pub input: Option<String>,

    /// Sentiment lexicon file
    #[arg(long, env = "SENTIMENT_LEXICON")]
    pub lexicon: PathBuf,

    /// SQLite metadata database with keyword and filter tables
    #[arg(long, env = "TILECAST_METADATA")]
    pub metadata: PathBuf,

    /// JSON config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Replace history instead of merging with the previous snapshot
    #[arg(long)]
    pub full: bool,

    /// Skip writing coarse-tile rollups
    #[arg(long)]
    pub no_rollup: bool,

    /// Explicit run id (defaults to the current UTC time)
    #[arg(long)]
    pub run_id: Option<String>,

    #[arg(long, env = "INPUT_CONTAINER")]
    pub input_container: Option<String>,

    #[arg(long, env = "MESSAGE_CONTAINER")]
    pub message_container: Option<String>,

    #[arg(long, env = "TILE_PREV_CONTAINER")]
    pub snapshot_container: Option<String>,

    #[arg(long, env = "TILE_OUTPUT_CONTAINER")]
    pub tile_container: Option<String>,
}

impl RunArgs {
    /// Command-line values take precedence over the config file
    pub fn apply(&self, config: &mut Config) {
        if let Some(input) = &self.input {
            config.input_pattern = input.clone();
        }
        if self.full {
            config.incremental = false;
        }
        if self.no_rollup {
            config.rollup = false;
        }

        let containers = &mut config.containers;
        let overrides = [
            (&self.input_container, &mut containers.input),
            (&self.message_container, &mut containers.messages),
            (&self.snapshot_container, &mut containers.snapshots),
            (&self.tile_container, &mut containers.tiles),
        ];
        for (value, target) in overrides {
            if let Some(value) = value {
                *target = value.clone();
            }
        }
    }
}

#[derive(Subcommand)]
pub enum TileAction {
    /// Tile id containing a point
    Id {
        #[arg(allow_negative_numbers = true)]
        latitude: f64,

        #[arg(allow_negative_numbers = true)]
        longitude: f64,

        #[arg(long, default_value_t = 15)]
        zoom: u8,
    },

    /// Bounds, center, parent and children of a tile
    Info { id: String },
}

#[derive(Subcommand)]
pub enum KeywordAction {
    /// Add or replace a keyword
    Add {
        /// English term; its lowercase form is the canonical keyword
        en_term: String,

        /// Arabic translation
        #[arg(long)]
        ar: Option<String>,
    },

    /// Remove a keyword
    Remove { en_term: String },

    /// Add a noise filter group; records matching every term are dropped
    Filter {
        #[arg(required = true)]
        terms: Vec<String>,
    },

    /// List keywords and filters
    List,
}
