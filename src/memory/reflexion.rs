//! Reflexion memory facade: one handle over episodes, graph and patterns

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

use crate::config::MemoryConfig;
use crate::errors::Result;
use crate::memory::causal::{CausalGraphStore, LoadMode};
use crate::memory::episodic::EpisodeStore;
use crate::memory::ingest::{EpisodeIngestor, IngestReport};
use crate::memory::patterns::PatternLibrary;
use crate::schema;

/// Snapshot of what is stored and where
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MemoryStatus {
    pub episodes: EpisodesStatus,
    pub causal_graph: GraphStatus,
    pub configuration: MemoryConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EpisodesStatus {
    pub path: PathBuf,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GraphStatus {
    pub path: PathBuf,
    pub version: String,
    pub updated: DateTime<Utc>,
    pub nodes: usize,
    pub edges: usize,
    pub patterns: usize,
}

/// Stores sharing one configuration
pub struct ReflexionMemory {
    config: MemoryConfig,
    episodes: EpisodeStore,
    graph: CausalGraphStore,
    patterns: PatternLibrary,
}

impl ReflexionMemory {
    pub fn open(config: MemoryConfig) -> Self {
        let graph = CausalGraphStore::new(&config);
        Self {
            episodes: EpisodeStore::new(&config),
            patterns: PatternLibrary::new(graph.clone()),
            graph,
            config,
        }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn episodes(&self) -> &EpisodeStore {
        &self.episodes
    }

    pub fn graph(&self) -> &CausalGraphStore {
        &self.graph
    }

    pub fn patterns(&self) -> &PatternLibrary {
        &self.patterns
    }

    /// Write missing shape documents into the configured schemas directory
    pub fn install_schemas(&self) -> Result<Vec<PathBuf>> {
        schema::install_default_schemas(&self.config.schemas_dir)
    }

    /// Fold stored episodes (optionally only recent ones) into the graph
    ///
    /// Not idempotent: no record is kept of what was already ingested, so a
    /// second run over the same episodes raises node frequencies, edge
    /// evidence and pattern occurrences again. Pass `since` to fold only
    /// episodes newer than the previous run.
    pub fn ingest(&self, since: Option<DateTime<Utc>>, dry_run: bool) -> Result<IngestReport> {
        let episodes = self.episodes.list_since(since);
        EpisodeIngestor::new(self.graph.clone()).ingest(&episodes, dry_run)
    }

    /// Status report; a corrupt graph is reported as empty
    pub fn status(&self) -> Result<MemoryStatus> {
        let graph = self.graph.load(LoadMode::Tolerant)?;

        Ok(MemoryStatus {
            episodes: EpisodesStatus {
                path: self.episodes.episodes_dir().to_path_buf(),
                count: self.episodes.count(),
            },
            causal_graph: GraphStatus {
                path: self.graph.path().to_path_buf(),
                version: graph.version,
                updated: graph.updated,
                nodes: graph.nodes.len(),
                edges: graph.edges.len(),
                patterns: graph.patterns.len(),
            },
            configuration: self.config.clone(),
        })
    }
}
