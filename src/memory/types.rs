//! Core data types for episodic and causal memory
//!
//! Field names here are the on-disk wire contract; any collaborator reading
//! previously written files depends on them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::errors::MemoryError;

/// Prefix joining a session id into an episode id
pub const EPISODE_ID_PREFIX: &str = "episode-";

/// Current version of the causal graph document
pub const GRAPH_VERSION: &str = "1.0";

/// Episode outcome classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpisodeOutcome {
    Success,
    Partial,
    Failure,
}

impl EpisodeOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            EpisodeOutcome::Success => "success",
            EpisodeOutcome::Partial => "partial",
            EpisodeOutcome::Failure => "failure",
        }
    }
}

impl FromStr for EpisodeOutcome {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(EpisodeOutcome::Success),
            "partial" => Ok(EpisodeOutcome::Partial),
            "failure" => Ok(EpisodeOutcome::Failure),
            other => Err(MemoryError::invalid(format!(
                "Invalid outcome: {}. Must be success, partial, or failure.",
                other
            ))),
        }
    }
}

impl fmt::Display for EpisodeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Episode: the recorded trace of one working session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    /// `episode-<session_id>`
    pub id: String,
    /// Originating session; also the file name key
    #[serde(alias = "session")]
    pub session_id: String,
    /// Set by the store at creation
    pub timestamp: DateTime<Utc>,
    pub outcome: EpisodeOutcome,
    pub task: String,
    /// Opaque decision records, each expected to carry a `timestamp`
    #[serde(default)]
    pub decisions: Vec<Value>,
    /// Opaque event records, each expected to carry a `timestamp`
    #[serde(default)]
    pub events: Vec<Value>,
    #[serde(default)]
    pub metrics: Map<String, Value>,
    #[serde(default)]
    pub lessons: Vec<String>,
}

impl Episode {
    /// Episode id for a session
    pub fn id_for(session_id: &str) -> String {
        format!("{}{}", EPISODE_ID_PREFIX, session_id)
    }

    /// Session id behind an episode id (bare session ids pass through)
    pub fn session_for(episode_id: &str) -> &str {
        episode_id.strip_prefix(EPISODE_ID_PREFIX).unwrap_or(episode_id)
    }
}

/// Optional body of a new episode
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EpisodeContent {
    pub decisions: Vec<Value>,
    pub events: Vec<Value>,
    pub lessons: Vec<String>,
    pub metrics: Map<String, Value>,
}

/// Filters for listing episodes
#[derive(Debug, Clone)]
pub struct EpisodeQuery {
    pub outcome: Option<EpisodeOutcome>,
    /// Case-insensitive substring of the task
    pub task: Option<String>,
    pub since: Option<DateTime<Utc>>,
    /// 1..=100
    pub max_results: usize,
}

impl Default for EpisodeQuery {
    fn default() -> Self {
        Self {
            outcome: None,
            task: None,
            since: None,
            max_results: 20,
        }
    }
}

/// Causal node kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Decision,
    Event,
    Outcome,
    Pattern,
    Error,
}

impl FromStr for NodeType {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "decision" => Ok(NodeType::Decision),
            "event" => Ok(NodeType::Event),
            "outcome" => Ok(NodeType::Outcome),
            "pattern" => Ok(NodeType::Pattern),
            "error" => Ok(NodeType::Error),
            other => Err(MemoryError::invalid(format!(
                "Invalid node type: {}. Must be one of decision, event, outcome, pattern, error.",
                other
            ))),
        }
    }
}

/// Causal relationship kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeType {
    Causes,
    Enables,
    Prevents,
    Correlates,
}

impl FromStr for EdgeType {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "causes" => Ok(EdgeType::Causes),
            "enables" => Ok(EdgeType::Enables),
            "prevents" => Ok(EdgeType::Prevents),
            "correlates" => Ok(EdgeType::Correlates),
            other => Err(MemoryError::invalid(format!(
                "Invalid edge type: {}. Must be one of causes, enables, prevents, correlates.",
                other
            ))),
        }
    }
}

/// A recurring concept, deduplicated by exact label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// `n001`-style, never reused
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub label: String,
    /// Episodes that produced or reinforced this node, without duplicates
    #[serde(default)]
    pub episodes: Vec<String>,
    pub frequency: u64,
    /// Caller-maintained; initialized to 1.0
    pub success_rate: f64,
}

/// Directed, typed, weighted relationship; identity is (source, target, type)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
    /// Running average of every observed weight, in [0, 1]
    pub weight: f64,
    pub evidence_count: u64,
}

/// Named trigger -> action rule with an empirical success rate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    /// `p001`-style, never reused
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub trigger: String,
    pub action: String,
    pub success_rate: f64,
    pub occurrences: u64,
    pub last_used: DateTime<Utc>,
}

/// Observation fed into the pattern library
#[derive(Debug, Clone, PartialEq)]
pub struct PatternDraft {
    pub name: String,
    pub trigger: String,
    pub action: String,
    pub description: String,
    pub success_rate: f64,
}

impl PatternDraft {
    pub fn new(name: impl Into<String>, trigger: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            trigger: trigger.into(),
            action: action.into(),
            description: String::new(),
            success_rate: 1.0,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn success_rate(mut self, success_rate: f64) -> Self {
        self.success_rate = success_rate;
        self
    }
}

/// The single shared document of nodes, edges and patterns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CausalGraph {
    pub version: String,
    /// Refreshed on every save
    pub updated: DateTime<Utc>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub patterns: Vec<Pattern>,
}

impl Default for CausalGraph {
    fn default() -> Self {
        Self {
            version: GRAPH_VERSION.to_string(),
            updated: Utc::now(),
            nodes: Vec::new(),
            edges: Vec::new(),
            patterns: Vec::new(),
        }
    }
}

/// Result of a path search between two concepts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathResult {
    pub found: bool,
    /// Full node records from source to target
    pub path: Vec<Node>,
    /// Hop count of `path`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PathResult {
    pub fn found(path: Vec<Node>) -> Self {
        let depth = path.len().saturating_sub(1);
        Self {
            found: true,
            path,
            depth: Some(depth),
            error: None,
        }
    }

    pub fn not_found(error: impl Into<String>) -> Self {
        Self {
            found: false,
            path: Vec::new(),
            depth: None,
            error: Some(error.into()),
        }
    }
}
