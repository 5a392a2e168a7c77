//! Episode Store: one JSON file per working session
//!
//! Files are named `episode-<session_id>.json`. Single reads treat a
//! corrupt file as an error; bulk listing skips it with a warning so one
//! bad file cannot hide the rest.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use crate::config::MemoryConfig;
use crate::errors::{MemoryError, Result};
use crate::memory::types::{Episode, EpisodeContent, EpisodeOutcome, EpisodeQuery, EPISODE_ID_PREFIX};
use crate::schema;

/// Upper bound on `EpisodeQuery::max_results`
pub const MAX_RESULTS_LIMIT: usize = 100;

/// Symlink hops followed before giving up on a chain
const MAX_LINK_HOPS: usize = 8;

/// Episodes returned by a listing, plus how many files were unusable
#[derive(Debug, Clone, Default)]
pub struct EpisodeListing {
    pub episodes: Vec<Episode>,
    pub skipped: usize,
}

/// File-backed episode storage
#[derive(Debug, Clone)]
pub struct EpisodeStore {
    episodes_dir: PathBuf,
    schema_file: PathBuf,
    validate: bool,
}

impl EpisodeStore {
    pub fn new(config: &MemoryConfig) -> Self {
        Self {
            episodes_dir: config.episodes_dir.clone(),
            schema_file: config.episode_schema_file(),
            validate: true,
        }
    }

    #[cfg(test)]
    pub(crate) fn without_validation(mut self) -> Self {
        self.validate = false;
        self
    }

    /// Get storage directory
    pub fn episodes_dir(&self) -> &Path {
        &self.episodes_dir
    }

    /// Resolve the file for a session, refusing anything outside the directory
    fn episode_path(&self, session_id: &str) -> Result<PathBuf> {
        let traversal = || MemoryError::PathTraversal {
            session_id: session_id.to_string(),
        };

        if session_id.is_empty() {
            return Err(MemoryError::invalid("session_id must not be empty"));
        }

        let file_name = format!("{}{}.json", EPISODE_ID_PREFIX, session_id);
        let mut components = Path::new(&file_name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) if name == file_name.as_str() => {}
            _ => return Err(traversal()),
        }
        if file_name.contains('\0') {
            return Err(traversal());
        }

        let path = self.episodes_dir.join(&file_name);

        // A symlink inside the directory may still point elsewhere, even
        // when its target does not exist yet
        if fs::symlink_metadata(&path).is_ok() {
            let root = fs::canonicalize(&self.episodes_dir)?;
            match resolve_location(&path) {
                Some(resolved) if resolved.starts_with(&root) => {}
                _ => return Err(traversal()),
            }
        }

        Ok(path)
    }

    /// Load one episode; `None` when the session has no file
    pub fn get_episode(&self, session_id: &str) -> Result<Option<Episode>> {
        let path = self.episode_path(session_id)?;

        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(MemoryError::Corrupted {
                    path,
                    reason: e.to_string(),
                })
            }
        };

        serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| MemoryError::Corrupted {
                path,
                reason: e.to_string(),
            })
    }

    /// Matching episodes, most recent first
    pub fn get_episodes(&self, query: &EpisodeQuery) -> Result<Vec<Episode>> {
        Ok(self.list_episodes(query)?.episodes)
    }

    /// Like [`get_episodes`](Self::get_episodes) but also reports skipped files
    ///
    /// Files are scanned in name order and the scan stops once
    /// `max_results` matches are collected; sorting happens afterwards.
    pub fn list_episodes(&self, query: &EpisodeQuery) -> Result<EpisodeListing> {
        if query.max_results < 1 || query.max_results > MAX_RESULTS_LIMIT {
            return Err(MemoryError::invalid(format!(
                "max_results must be between 1 and {}, got {}",
                MAX_RESULTS_LIMIT, query.max_results
            )));
        }

        let task = query.task.as_ref().map(|t| t.to_lowercase());
        let mut listing = EpisodeListing::default();

        for path in self.episode_files() {
            let episode = match read_episode(&path) {
                Ok(episode) => episode,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping corrupted episode file");
                    listing.skipped += 1;
                    continue;
                }
            };

            if query.outcome.is_some_and(|o| o != episode.outcome) {
                continue;
            }
            if let Some(task) = &task {
                if !episode.task.to_lowercase().contains(task.as_str()) {
                    continue;
                }
            }
            if query.since.is_some_and(|since| episode.timestamp < since) {
                continue;
            }

            listing.episodes.push(episode);
            if listing.episodes.len() >= query.max_results {
                break;
            }
        }

        if listing.skipped > 0 {
            tracing::warn!(skipped = listing.skipped, "skipped corrupted or invalid episode file(s)");
        }

        listing.episodes.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(listing)
    }

    /// Every readable episode at or after `since`, oldest file name first
    pub fn list_since(&self, since: Option<DateTime<Utc>>) -> Vec<Episode> {
        self.episode_files()
            .into_iter()
            .filter_map(|path| match read_episode(&path) {
                Ok(episode) => Some(episode),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping malformed episode file");
                    None
                }
            })
            .filter(|episode| since.map_or(true, |since| episode.timestamp >= since))
            .collect()
    }

    /// Write a new episode, replacing any previous file for the session
    pub fn new_episode(
        &self,
        session_id: &str,
        task: &str,
        outcome: EpisodeOutcome,
        content: EpisodeContent,
    ) -> Result<Episode> {
        let episode = Episode {
            id: Episode::id_for(session_id),
            session_id: session_id.to_string(),
            timestamp: Utc::now(),
            outcome,
            task: task.to_string(),
            decisions: content.decisions,
            events: content.events,
            metrics: content.metrics,
            lessons: content.lessons,
        };

        let path = self.episode_path(session_id)?;

        if self.validate {
            schema::validate(&episode, &self.schema_file, "episode")?;
        }

        fs::create_dir_all(&self.episodes_dir)?;

        let json = serde_json::to_string_pretty(&episode)?;
        fs::write(&path, json)?;

        tracing::debug!(id = %episode.id, path = %path.display(), "saved episode");
        Ok(episode)
    }

    /// Decisions of an episode sorted by their own `timestamp` field
    ///
    /// Accepts `episode-<session>` or a bare session id. Entries without a
    /// timestamp sort first.
    pub fn get_decision_sequence(&self, episode_id: &str) -> Result<Vec<Value>> {
        let Some(episode) = self.get_episode(Episode::session_for(episode_id))? else {
            return Ok(Vec::new());
        };

        let mut decisions = episode.decisions;
        decisions.sort_by(|a, b| timestamp_key(a).cmp(timestamp_key(b)));
        Ok(decisions)
    }

    /// Number of episode files on disk
    pub fn count(&self) -> usize {
        self.episode_files().len()
    }

    /// Episode files in name order; an unreadable directory is logged and empty
    fn episode_files(&self) -> Vec<PathBuf> {
        if !self.episodes_dir.is_dir() {
            return Vec::new();
        }

        let entries = match fs::read_dir(&self.episodes_dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!(
                    path = %self.episodes_dir.display(),
                    error = %e,
                    "failed to enumerate episodes"
                );
                return Vec::new();
            }
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(EPISODE_ID_PREFIX) && n.ends_with(".json"))
            })
            .collect();

        files.sort();
        files
    }
}

fn read_episode(path: &Path) -> Result<Episode> {
    let json = fs::read_to_string(path)?;
    serde_json::from_str(&json).map_err(|e| MemoryError::Corrupted {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Where a write to `path` would land, following symlinks (dangling ones too)
///
/// `None` when the chain loops, is too long, or leads into a missing directory.
fn resolve_location(path: &Path) -> Option<PathBuf> {
    let mut current = path.to_path_buf();

    for _ in 0..MAX_LINK_HOPS {
        match fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() => {
                let target = fs::read_link(&current).ok()?;
                current = current.parent()?.join(target);
            }
            Ok(_) => return fs::canonicalize(&current).ok(),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let name = current.file_name()?;
                return fs::canonicalize(current.parent()?).ok().map(|dir| dir.join(name));
            }
            Err(_) => return None,
        }
    }

    None
}

fn timestamp_key(record: &Value) -> &str {
    record.get("timestamp").and_then(Value::as_str).unwrap_or("")
}
