//! Folds stored episodes into the causal graph
//!
//! Decisions, events and the outcome become nodes; error recoveries and
//! decision-to-event mentions become `causes` edges; each decision also
//! feeds the pattern library. One load and one save per batch.

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use crate::errors::Result;
use crate::memory::causal::{CausalGraphStore, LoadMode};
use crate::memory::types::{CausalGraph, EdgeType, Episode, NodeType, PatternDraft};

/// Events after an error searched for its recovery
const RECOVERY_WINDOW: usize = 5;

/// Words that mark a milestone as a recovery
const RECOVERY_WORDS: [&str; 3] = ["fix", "recover", "resolve"];

/// Leading words of a decision matched against event content
const DECISION_KEYWORDS: usize = 3;

const RECOVERY_WEIGHT: f64 = 0.8;
const MENTION_WEIGHT: f64 = 0.6;

/// Counts of merges performed during one ingestion
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    pub episodes_processed: usize,
    pub nodes: usize,
    pub edges: usize,
    pub patterns: usize,
    pub dry_run: bool,
}

/// A directed link derived from episode content
#[derive(Debug, Clone, PartialEq)]
struct CausalChain {
    from_type: NodeType,
    from_label: String,
    to_type: NodeType,
    to_label: String,
    weight: f64,
}

pub struct EpisodeIngestor {
    store: CausalGraphStore,
}

impl EpisodeIngestor {
    pub fn new(store: CausalGraphStore) -> Self {
        Self { store }
    }

    /// Merge every episode into the graph; `dry_run` leaves the file untouched
    pub fn ingest(&self, episodes: &[Episode], dry_run: bool) -> Result<IngestReport> {
        let mut graph = self.store.load(LoadMode::Strict)?;
        let mut report = IngestReport {
            dry_run,
            ..Default::default()
        };

        for episode in episodes {
            fold_episode(&mut graph, episode, &mut report)?;
            tracing::debug!(id = %episode.id, "ingested episode");
        }

        if !dry_run && !episodes.is_empty() {
            self.store.save(&mut graph)?;
        }

        tracing::info!(
            episodes = report.episodes_processed,
            nodes = report.nodes,
            edges = report.edges,
            patterns = report.patterns,
            dry_run,
            "causal graph ingestion complete"
        );
        Ok(report)
    }
}

fn fold_episode(graph: &mut CausalGraph, episode: &Episode, report: &mut IngestReport) -> Result<()> {
    let episode_id = Some(episode.id.as_str());

    for decision in &episode.decisions {
        let label = format!("{}: {}", field(decision, "type", "unknown"), field(decision, "chosen", ""));
        graph.upsert_node(NodeType::Decision, &label, episode_id);
        report.nodes += 1;
    }

    for event in &episode.events {
        let kind = field(event, "type", "unknown");
        let label = format!("{}: {}", kind, field(event, "content", ""));
        graph.upsert_node(event_node_type(kind), &label, episode_id);
        report.nodes += 1;
    }

    let outcome_label = format!("Outcome: {} - {}", episode.outcome, episode.task);
    graph.upsert_node(NodeType::Outcome, &outcome_label, episode_id);
    report.nodes += 1;

    for chain in causal_chains(episode) {
        let from = graph.upsert_node(chain.from_type, &chain.from_label, episode_id);
        let to = graph.upsert_node(chain.to_type, &chain.to_label, episode_id);
        graph.upsert_edge(&from.id, &to.id, EdgeType::Causes, chain.weight)?;
        report.nodes += 2;
        report.edges += 1;
    }

    let now = Utc::now();
    for draft in decision_patterns(episode) {
        graph.upsert_pattern(&draft, now)?;
        report.patterns += 1;
    }

    report.episodes_processed += 1;
    Ok(())
}

fn field<'a>(record: &'a Value, key: &str, default: &'a str) -> &'a str {
    record.get(key).and_then(Value::as_str).unwrap_or(default)
}

fn event_node_type(kind: &str) -> NodeType {
    if kind == "error" {
        NodeType::Error
    } else {
        NodeType::Event
    }
}

/// Error -> recovery and decision -> mentioning-event links
fn causal_chains(episode: &Episode) -> Vec<CausalChain> {
    let mut chains = Vec::new();
    let events = &episode.events;

    for (idx, event) in events.iter().enumerate() {
        if field(event, "type", "") != "error" {
            continue;
        }

        let recovery = events.iter().skip(idx + 1).take(RECOVERY_WINDOW).find(|candidate| {
            let content = field(candidate, "content", "").to_lowercase();
            field(candidate, "type", "") == "milestone"
                && RECOVERY_WORDS.iter().any(|word| content.contains(word))
        });

        if let Some(recovery) = recovery {
            chains.push(CausalChain {
                from_type: NodeType::Error,
                from_label: field(event, "content", "").to_string(),
                to_type: NodeType::Outcome,
                to_label: field(recovery, "content", "").to_string(),
                weight: RECOVERY_WEIGHT,
            });
        }
    }

    for decision in &episode.decisions {
        let chosen = field(decision, "chosen", "");
        let keywords: Vec<String> = chosen
            .split_whitespace()
            .take(DECISION_KEYWORDS)
            .map(str::to_lowercase)
            .collect();
        if keywords.is_empty() {
            continue;
        }

        for event in events {
            let content = field(event, "content", "");
            let lowered = content.to_lowercase();
            if keywords.iter().any(|kw| lowered.contains(kw.as_str())) {
                chains.push(CausalChain {
                    from_type: NodeType::Decision,
                    from_label: chosen.to_string(),
                    to_type: event_node_type(field(event, "type", "unknown")),
                    to_label: content.to_string(),
                    weight: MENTION_WEIGHT,
                });
            }
        }
    }

    chains
}

/// One pattern (or anti-pattern) per decision, scored by its outcome
fn decision_patterns(episode: &Episode) -> Vec<PatternDraft> {
    episode
        .decisions
        .iter()
        .map(|decision| {
            let kind = field(decision, "type", "unknown");
            let chosen = field(decision, "chosen", "");
            let trigger = match field(decision, "context", "") {
                "" => format!("When {} decision needed", kind),
                context => context.to_string(),
            };

            if field(decision, "outcome", "") == "success" {
                PatternDraft::new(format!("{} pattern", kind), trigger, chosen)
                    .description(format!("Pattern from {}", episode.id))
                    .success_rate(1.0)
            } else {
                PatternDraft::new(format!("{} anti-pattern", kind), trigger, format!("AVOID: {}", chosen))
                    .description(format!("Anti-pattern from {}", episode.id))
                    .success_rate(0.0)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryConfig;
    use crate::memory::types::EpisodeOutcome;
    use serde_json::json;
    use tempfile::TempDir;

    fn episode(decisions: Vec<Value>, events: Vec<Value>) -> Episode {
        Episode {
            id: "episode-s1".to_string(),
            session_id: "s1".to_string(),
            timestamp: Utc::now(),
            outcome: EpisodeOutcome::Success,
            task: "stabilize build".to_string(),
            decisions,
            events,
            metrics: Default::default(),
            lessons: vec![],
        }
    }

    #[test]
    fn test_error_recovery_chain() {
        let ep = episode(
            vec![],
            vec![
                json!({"type": "error", "content": "linker failed"}),
                json!({"type": "tool_call", "content": "cargo clean"}),
                json!({"type": "milestone", "content": "Resolved linker issue"}),
            ],
        );
        let chains = causal_chains(&ep);
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].from_label, "linker failed");
        assert_eq!(chains[0].to_label, "Resolved linker issue");
        assert_eq!(chains[0].weight, RECOVERY_WEIGHT);
    }

    #[test]
    fn test_recovery_outside_window_ignored() {
        let mut events = vec![json!({"type": "error", "content": "boom"})];
        for i in 0..RECOVERY_WINDOW {
            events.push(json!({"type": "tool_call", "content": format!("step {i}")}));
        }
        events.push(json!({"type": "milestone", "content": "fixed boom"}));

        let chains = causal_chains(&episode(vec![], events));
        assert!(chains.iter().all(|c| c.from_type != NodeType::Error));
    }

    #[test]
    fn test_decision_mention_chain() {
        let ep = episode(
            vec![json!({"type": "design", "chosen": "Switch to sqlite storage backend"})],
            vec![json!({"type": "error", "content": "SQLITE busy timeout"})],
        );
        let chains = causal_chains(&ep);
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].from_type, NodeType::Decision);
        assert_eq!(chains[0].to_type, NodeType::Error);
        assert_eq!(chains[0].weight, MENTION_WEIGHT);
    }

    #[test]
    fn test_decision_patterns() {
        let ep = episode(
            vec![
                json!({"type": "tooling", "chosen": "use nextest", "outcome": "success"}),
                json!({"type": "tooling", "chosen": "skip tests", "context": "deadline"}),
            ],
            vec![],
        );
        let drafts = decision_patterns(&ep);
        assert_eq!(drafts[0].name, "tooling pattern");
        assert_eq!(drafts[0].trigger, "When tooling decision needed");
        assert_eq!(drafts[1].name, "tooling anti-pattern");
        assert_eq!(drafts[1].action, "AVOID: skip tests");
        assert_eq!(drafts[1].trigger, "deadline");
        assert_eq!(drafts[1].success_rate, 0.0);
    }

    #[test]
    fn test_ingest_persists_and_dry_run_does_not() {
        let temp = TempDir::new().unwrap();
        let store = CausalGraphStore::new(&MemoryConfig::under(temp.path())).without_validation();
        let ingestor = EpisodeIngestor::new(store.clone());
        let ep = episode(
            vec![json!({"type": "cache", "chosen": "cache-first read", "outcome": "success"})],
            vec![json!({"type": "milestone", "content": "Cache-first read served hot keys"})],
        );

        let report = ingestor.ingest(std::slice::from_ref(&ep), true).unwrap();
        assert_eq!(report.episodes_processed, 1);
        assert!(report.dry_run);
        assert!(!store.path().exists());

        let report = ingestor.ingest(&[ep], false).unwrap();
        assert_eq!(report.edges, 1);
        assert_eq!(report.patterns, 1);

        let graph = store.load(LoadMode::Strict).unwrap();
        assert!(graph.node_by_label("cache: cache-first read").is_some());
        assert!(graph.node_by_label("Outcome: success - stabilize build").is_some());
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.patterns[0].name, "cache pattern");
    }
}
