//! Bundled shape documents for episodes and the causal graph

use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{CAUSAL_GRAPH_SCHEMA_FILE, EPISODE_SCHEMA_FILE};
use crate::errors::Result;

/// Shape of a persisted episode
pub fn episode_shape() -> Value {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "title": "Episode",
        "type": "object",
        "required": ["id", "session_id", "timestamp", "outcome", "task"],
        "properties": {
            "id": { "type": "string" },
            "session_id": { "type": "string" },
            "timestamp": { "type": "string" },
            "outcome": { "type": "string", "enum": ["success", "partial", "failure"] },
            "task": { "type": "string" },
            "decisions": { "type": "array" },
            "events": { "type": "array" },
            "metrics": { "type": "object" },
            "lessons": { "type": "array" }
        }
    })
}

/// Shape of the persisted causal graph document
pub fn causal_graph_shape() -> Value {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "title": "Causal Graph",
        "type": "object",
        "required": ["version", "updated", "nodes", "edges", "patterns"],
        "properties": {
            "version": { "type": "string" },
            "updated": { "type": "string" },
            "nodes": { "type": "array" },
            "edges": { "type": "array" },
            "patterns": { "type": "array" }
        }
    })
}

/// Write the bundled shape documents into `dir`, leaving existing files alone
///
/// Returns the paths that were newly written.
pub fn install_default_schemas(dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;

    let mut written = Vec::new();
    for (name, shape) in [
        (EPISODE_SCHEMA_FILE, episode_shape()),
        (CAUSAL_GRAPH_SCHEMA_FILE, causal_graph_shape()),
    ] {
        let path = dir.join(name);
        if path.exists() {
            continue;
        }
        fs::write(&path, serde_json::to_string_pretty(&shape)?)?;
        tracing::debug!(path = %path.display(), "installed schema");
        written.push(path);
    }

    Ok(written)
}
