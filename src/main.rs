//! reflexmem - command-line entry point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use serde::Serialize;
use std::fs;
use tracing_subscriber::EnvFilter;

use reflexion_memory::{
    cli::{Args, Commands, EpisodeCommand, Verbosity},
    memory::{EpisodeContent, EpisodeQuery, PatternDraft, ReflexionMemory},
    MemoryError,
};

fn main() {
    let args = Args::parse();
    init_tracing(args.verbosity());

    if let Err(err) = run(&args) {
        eprintln!("{}: {:#}", "Error".red().bold(), err);
        let code = err.downcast_ref::<MemoryError>().map_or(1, MemoryError::exit_code);
        std::process::exit(code);
    }
}

/// Logs to stderr; RUST_LOG wins over the -v/-q flags
fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn emit<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(args: &Args) -> Result<()> {
    let memory = ReflexionMemory::open(args.memory_config()?);

    match &args.command {
        Commands::Status => emit(&memory.status()?),

        Commands::InitSchemas => {
            let written = memory.install_schemas()?;
            eprintln!(
                "{} {} schema file(s) in {}",
                "Installed".green().bold(),
                written.len(),
                memory.config().schemas_dir.display()
            );
            emit(&written)
        }

        Commands::Episode(command) => run_episode(&memory, command),

        Commands::Node { node_type, label, episode } => {
            emit(&memory.graph().add_causal_node(*node_type, label, episode.as_deref())?)
        }

        Commands::Edge { source, target, edge_type, weight } => {
            emit(&memory.graph().add_causal_edge(source, target, *edge_type, *weight)?)
        }

        Commands::Path { from, to, max_depth, by_id } => {
            let result = if *by_id {
                memory.graph().get_causal_path_by_id(from, to, *max_depth)?
            } else {
                memory.graph().get_causal_path(from, to, *max_depth)?
            };
            emit(&result)
        }

        Commands::Pattern(pattern) => {
            let draft = PatternDraft::new(&pattern.name, &pattern.trigger, &pattern.action)
                .description(&pattern.description)
                .success_rate(pattern.success_rate);
            emit(&memory.patterns().add_pattern(draft)?)
        }

        Commands::Patterns { min_success_rate, min_occurrences } => {
            emit(&memory.patterns().get_patterns(*min_success_rate, *min_occurrences)?)
        }

        Commands::AntiPatterns { max_success_rate } => {
            emit(&memory.patterns().get_anti_patterns(*max_success_rate)?)
        }

        Commands::Ingest { since, dry_run } => {
            if *dry_run {
                eprintln!("{}", "[DRY RUN] No changes will be made".yellow());
            }
            emit(&memory.ingest(*since, *dry_run)?)
        }
    }
}

fn run_episode(memory: &ReflexionMemory, command: &EpisodeCommand) -> Result<()> {
    let episodes = memory.episodes();

    match command {
        EpisodeCommand::Show { session_id } => match episodes.get_episode(session_id)? {
            Some(episode) => emit(&episode),
            None => {
                eprintln!("{} no episode for session '{}'", "Not found:".yellow(), session_id);
                emit(&serde_json::Value::Null)
            }
        },

        EpisodeCommand::List { outcome, task, since, max_results } => {
            let query = EpisodeQuery {
                outcome: *outcome,
                task: task.clone(),
                since: *since,
                max_results: *max_results,
            };
            let listing = episodes.list_episodes(&query)?;
            if listing.skipped > 0 {
                eprintln!(
                    "{} skipped {} unreadable episode file(s)",
                    "Warning:".yellow(),
                    listing.skipped
                );
            }
            emit(&listing.episodes)
        }

        EpisodeCommand::Decisions { episode_id } => emit(&episodes.get_decision_sequence(episode_id)?),

        EpisodeCommand::New { session_id, task, outcome, content } => {
            let content = match content {
                Some(path) => {
                    let json = fs::read_to_string(path)
                        .with_context(|| format!("Failed to read episode content '{}'", path.display()))?;
                    serde_json::from_str::<EpisodeContent>(&json)
                        .with_context(|| format!("Failed to parse episode content '{}'", path.display()))?
                }
                None => EpisodeContent::default(),
            };
            emit(&episodes.new_episode(session_id, task, *outcome, content)?)
        }
    }
}
