mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands, KeywordAction, TileAction};

fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries command output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => commands::run::run(&args),
        Commands::Tile { action } => match action {
            TileAction::Id {
                latitude,
                longitude,
                zoom,
            } => commands::tile::run_id(latitude, longitude, zoom),
            TileAction::Info { id } => commands::tile::run_info(&id),
        },
        Commands::Score { lexicon, text } => commands::score::run(&lexicon, &text),
        Commands::Stats { root, container } => commands::stats::run(&root, &container),
        Commands::Keywords { metadata, action } => match action {
            KeywordAction::Add { en_term, ar } => {
                commands::keywords::run_add(&metadata, &en_term, ar.as_deref())
            }
            KeywordAction::Remove { en_term } => commands::keywords::run_remove(&metadata, &en_term),
            KeywordAction::Filter { terms } => commands::keywords::run_filter(&metadata, &terms),
            KeywordAction::List => commands::keywords::run_list(&metadata),
        },
    }
}
