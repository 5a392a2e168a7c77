//! Episodic and causal memory
//!
//! Components:
//! - Episode Store: per-session traces of decisions, events and outcomes
//! - Causal Graph: shared nodes and weighted edges, with path search
//! - Pattern Library: trigger -> action rules with tracked success rates
//! - Ingestor: folds stored episodes into the graph
//! - ReflexionMemory: one handle over all of the above

pub mod causal;
pub mod episodic;
pub mod graph;
pub mod ingest;
pub mod patterns;
pub mod reflexion;
pub mod types;

pub use causal::{CausalGraphStore, LoadMode};
pub use episodic::{EpisodeListing, EpisodeStore};
pub use ingest::{EpisodeIngestor, IngestReport};
pub use patterns::PatternLibrary;
pub use reflexion::{MemoryStatus, ReflexionMemory};
pub use types::{
    CausalGraph, Edge, EdgeType, Episode, EpisodeContent, EpisodeOutcome, EpisodeQuery, Node, NodeType,
    PathResult, Pattern, PatternDraft,
};
