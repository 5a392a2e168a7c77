//! Command-line argument parsing for reflexmem
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use chrono::{DateTime, Utc};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::MemoryConfig;
use crate::errors::Result;
use crate::memory::types::{EdgeType, EpisodeOutcome, NodeType};

/// reflexmem - episodic and causal memory for autonomous agents
#[derive(Parser, Debug)]
#[command(name = "reflexmem")]
#[command(version)]
#[command(about = "Record session episodes and learn causal patterns across them", long_about = None)]
pub struct Args {
    /// Project root holding .agents/memory (current directory by default)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Configuration file path (overrides <root>/.agents/reflexmem.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level: default (warnings), -v (debug), -vv (trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show stored episode and graph counts
    Status,

    /// Write the default schema documents if missing
    InitSchemas,

    /// Episode operations
    #[command(subcommand)]
    Episode(EpisodeCommand),

    /// Record a causal node
    Node {
        /// decision, event, outcome, pattern or error
        #[arg(value_parser = parse_node_type)]
        node_type: NodeType,
        label: String,
        #[arg(long)]
        episode: Option<String>,
    },

    /// Record a causal edge between node ids
    Edge {
        source: String,
        target: String,
        /// causes, enables, prevents or correlates
        #[arg(value_parser = parse_edge_type)]
        edge_type: EdgeType,
        #[arg(long, default_value_t = 0.5)]
        weight: f64,
    },

    /// Find the shortest causal path between two concepts
    Path {
        /// Substring of the source label (or node id with --by-id)
        from: String,
        /// Substring of the target label (or node id with --by-id)
        to: String,
        #[arg(long, default_value_t = 5)]
        max_depth: usize,
        /// Treat FROM and TO as exact node ids
        #[arg(long)]
        by_id: bool,
    },

    /// Record a pattern observation
    Pattern(PatternArgs),

    /// List patterns, best first
    Patterns {
        #[arg(long, default_value_t = 0.0)]
        min_success_rate: f64,
        #[arg(long, default_value_t = 1)]
        min_occurrences: u64,
    },

    /// List anti-patterns, worst first
    AntiPatterns {
        #[arg(long, default_value_t = 0.3)]
        max_success_rate: f64,
    },

    /// Fold stored episodes into the causal graph
    ///
    /// Not idempotent: episodes already ingested are counted again, so use
    /// --since to fold only newer episodes on repeat runs.
    Ingest {
        /// Only episodes at or after this RFC 3339 time
        #[arg(long)]
        since: Option<DateTime<Utc>>,
        /// Report what would change without saving
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum EpisodeCommand {
    /// Print one episode
    Show { session_id: String },

    /// List episodes, most recent first
    List {
        #[arg(long, value_parser = parse_outcome)]
        outcome: Option<EpisodeOutcome>,
        /// Case-insensitive task substring
        #[arg(long)]
        task: Option<String>,
        #[arg(long)]
        since: Option<DateTime<Utc>>,
        #[arg(long, default_value_t = 20)]
        max_results: usize,
    },

    /// Print an episode's decisions in timestamp order
    Decisions { episode_id: String },

    /// Record an episode from a JSON file with decisions/events/lessons/metrics
    New {
        session_id: String,
        task: String,
        #[arg(value_parser = parse_outcome)]
        outcome: EpisodeOutcome,
        #[arg(long)]
        content: Option<PathBuf>,
    },
}

#[derive(ClapArgs, Debug)]
pub struct PatternArgs {
    pub name: String,
    pub trigger: String,
    pub action: String,
    #[arg(long, default_value = "")]
    pub description: String,
    #[arg(long, default_value_t = 1.0)]
    pub success_rate: f64,
}

fn parse_outcome(s: &str) -> std::result::Result<EpisodeOutcome, String> {
    s.parse().map_err(|e: crate::errors::MemoryError| e.to_string())
}

fn parse_node_type(s: &str) -> std::result::Result<NodeType, String> {
    s.parse().map_err(|e: crate::errors::MemoryError| e.to_string())
}

fn parse_edge_type(s: &str) -> std::result::Result<EdgeType, String> {
    s.parse().map_err(|e: crate::errors::MemoryError| e.to_string())
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }

    /// Project root (current dir if not specified)
    pub fn root_dir(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(|| {
            std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
        })
    }

    /// Resolve storage configuration from flags
    pub fn memory_config(&self) -> Result<MemoryConfig> {
        match &self.config {
            Some(path) => MemoryConfig::load_from(path),
            None => MemoryConfig::discover(self.root_dir()),
        }
    }
}

impl Verbosity {
    /// Default `tracing` filter for this level
    pub fn filter_directive(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "reflexion_memory=debug,warn",
            Verbosity::VeryVerbose => "trace",
        }
    }
}
