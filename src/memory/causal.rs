//! Causal Graph Engine: the single shared graph file
//!
//! Every mutating call is a full load, merge and save of one JSON document.
//! There is no locking: two processes writing concurrently can lose
//! updates, the last full-file write wins. Callers are expected to run one
//! writer at a time.

use chrono::Utc;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::config::MemoryConfig;
use crate::errors::{MemoryError, Result};
use crate::memory::graph::{check_max_depth, check_unit_interval};
use crate::memory::types::{CausalGraph, Edge, EdgeType, Node, NodeType, PathResult};
use crate::schema;

/// How to treat an unparsable graph file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Corruption is an error
    Strict,
    /// Corruption yields an empty graph and a warning; for read-only reporting
    Tolerant,
}

/// File-backed causal graph
#[derive(Debug, Clone)]
pub struct CausalGraphStore {
    graph_file: PathBuf,
    schema_file: PathBuf,
    validate: bool,
}

impl CausalGraphStore {
    pub fn new(config: &MemoryConfig) -> Self {
        Self {
            graph_file: config.graph_file(),
            schema_file: config.graph_schema_file(),
            validate: true,
        }
    }

    #[cfg(test)]
    pub(crate) fn without_validation(mut self) -> Self {
        self.validate = false;
        self
    }

    /// Location of the graph document
    pub fn path(&self) -> &Path {
        &self.graph_file
    }

    /// Read the graph; a missing or blank file is an empty graph
    pub fn load(&self, mode: LoadMode) -> Result<CausalGraph> {
        let contents = match fs::read_to_string(&self.graph_file) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(CausalGraph::default()),
            Err(e) => return self.recover(mode, e.to_string()),
        };

        if contents.trim().is_empty() {
            return Ok(CausalGraph::default());
        }

        match serde_json::from_str(&contents) {
            Ok(graph) => Ok(graph),
            Err(e) => self.recover(mode, e.to_string()),
        }
    }

    fn recover(&self, mode: LoadMode, reason: String) -> Result<CausalGraph> {
        let err = MemoryError::Corrupted {
            path: self.graph_file.clone(),
            reason,
        };
        match mode {
            LoadMode::Strict => Err(err),
            LoadMode::Tolerant => {
                tracing::warn!(error = %err, "using empty causal graph");
                Ok(CausalGraph::default())
            }
        }
    }

    /// Stamp, validate and write the graph as pretty JSON
    pub fn save(&self, graph: &mut CausalGraph) -> Result<()> {
        graph.updated = Utc::now();

        if self.validate {
            schema::validate(graph, &self.schema_file, "causal graph")?;
        }

        if let Some(parent) = self.graph_file.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(graph)?;
        fs::write(&self.graph_file, json)?;

        tracing::debug!(
            path = %self.graph_file.display(),
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            patterns = graph.patterns.len(),
            "saved causal graph"
        );
        Ok(())
    }

    /// Record an observation of a concept, merging by exact label
    pub fn add_causal_node(&self, node_type: NodeType, label: &str, episode_id: Option<&str>) -> Result<Node> {
        let mut graph = self.load(LoadMode::Strict)?;
        let node = graph.upsert_node(node_type, label, episode_id);
        self.save(&mut graph)?;

        tracing::debug!(id = %node.id, frequency = node.frequency, "upserted causal node");
        Ok(node)
    }

    /// Record an observation of a relationship, averaging its weight
    pub fn add_causal_edge(&self, source_id: &str, target_id: &str, edge_type: EdgeType, weight: f64) -> Result<Edge> {
        check_unit_interval("Weight", weight)?;

        let mut graph = self.load(LoadMode::Strict)?;
        let edge = graph.upsert_edge(source_id, target_id, edge_type, weight)?;
        self.save(&mut graph)?;

        tracing::debug!(
            source = %edge.source,
            target = %edge.target,
            evidence = edge.evidence_count,
            weight = edge.weight,
            "upserted causal edge"
        );
        Ok(edge)
    }

    /// Shortest path between the first nodes whose labels contain the fragments
    pub fn get_causal_path(&self, from_label: &str, to_label: &str, max_depth: usize) -> Result<PathResult> {
        check_max_depth(max_depth)?;
        self.load(LoadMode::Strict)?.find_path(from_label, to_label, max_depth)
    }

    /// Shortest path between exact node ids
    pub fn get_causal_path_by_id(&self, from_id: &str, to_id: &str, max_depth: usize) -> Result<PathResult> {
        check_max_depth(max_depth)?;
        self.load(LoadMode::Strict)?.find_path_by_id(from_id, to_id, max_depth)
    }

    pub fn get_node(&self, id: &str) -> Result<Option<Node>> {
        Ok(self.load(LoadMode::Strict)?.node(id).cloned())
    }

    pub fn find_node_by_label(&self, label: &str) -> Result<Option<Node>> {
        Ok(self.load(LoadMode::Strict)?.node_by_label(label).cloned())
    }

    /// Edges referencing ids that are not stored nodes
    pub fn dangling_edges(&self) -> Result<Vec<Edge>> {
        let graph = self.load(LoadMode::Strict)?;
        Ok(graph.dangling_edges().into_iter().cloned().collect())
    }

    /// Overwrite a node's success rate; the engine never aggregates it
    pub fn set_node_success_rate(&self, node_id: &str, success_rate: f64) -> Result<Node> {
        check_unit_interval("success_rate", success_rate)?;

        let mut graph = self.load(LoadMode::Strict)?;
        let node = graph
            .nodes
            .iter_mut()
            .find(|n| n.id == node_id)
            .ok_or_else(|| MemoryError::invalid(format!("Unknown node id: {}", node_id)))?;
        node.success_rate = success_rate;
        let node = node.clone();

        self.save(&mut graph)?;
        Ok(node)
    }
}
