//! Integration tests for episodic and causal memory against temp storage

use reflexion_memory::memory::{
    EdgeType, EpisodeContent, EpisodeOutcome, EpisodeQuery, LoadMode, NodeType, PatternDraft,
};
use reflexion_memory::{MemoryConfig, MemoryError, ReflexionMemory};
use serde_json::json;
use std::fs;
use tempfile::TempDir;

fn setup() -> (ReflexionMemory, TempDir) {
    let temp = TempDir::new().unwrap();
    let memory = ReflexionMemory::open(MemoryConfig::under(temp.path()));
    memory.install_schemas().unwrap();
    (memory, temp)
}

/// A -> B -> C -> D, each edge a different type and weight
fn chain(memory: &ReflexionMemory) {
    let graph = memory.graph();
    for label in ["A", "B", "C", "D"] {
        graph.add_causal_node(NodeType::Event, label, None).unwrap();
    }
    graph.add_causal_edge("n001", "n002", EdgeType::Causes, 0.9).unwrap();
    graph.add_causal_edge("n002", "n003", EdgeType::Enables, 0.6).unwrap();
    graph.add_causal_edge("n003", "n004", EdgeType::Correlates, 0.3).unwrap();
}

#[test]
fn test_episode_round_trip_orders_decisions() {
    let (memory, _temp) = setup();
    let content = EpisodeContent {
        decisions: vec![json!({"timestamp": "t2", "x": 1}), json!({"timestamp": "t1", "x": 2})],
        ..Default::default()
    };
    memory
        .episodes()
        .new_episode("s1", "fix bug", EpisodeOutcome::Success, content)
        .unwrap();

    let decisions = memory.episodes().get_decision_sequence("episode-s1").unwrap();
    assert_eq!(decisions.len(), 2);
    assert_eq!(decisions[0]["timestamp"], "t1");
    assert_eq!(decisions[1]["timestamp"], "t2");
}

#[test]
fn test_episode_file_is_pretty_json_with_wire_names() {
    let (memory, _temp) = setup();
    memory
        .episodes()
        .new_episode("2026-01-01-session-7", "ship", EpisodeOutcome::Partial, EpisodeContent::default())
        .unwrap();

    let path = memory
        .config()
        .episodes_dir
        .join("episode-2026-01-01-session-7.json");
    let text = fs::read_to_string(path).unwrap();
    assert!(text.contains('\n'));

    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["id"], "episode-2026-01-01-session-7");
    assert_eq!(value["session_id"], "2026-01-01-session-7");
    assert_eq!(value["outcome"], "partial");
    assert!(value["metrics"].is_object());
}

#[test]
fn test_new_episode_requires_schema_files() {
    let temp = TempDir::new().unwrap();
    let memory = ReflexionMemory::open(MemoryConfig::under(temp.path()));

    let err = memory
        .episodes()
        .new_episode("s1", "t", EpisodeOutcome::Success, EpisodeContent::default())
        .unwrap_err();
    assert!(matches!(err, MemoryError::SchemaMissing { .. }));
    assert!(!memory.config().episodes_dir.join("episode-s1.json").exists());
}

#[test]
fn test_graph_writes_require_schema_files() {
    let temp = TempDir::new().unwrap();
    let memory = ReflexionMemory::open(MemoryConfig::under(temp.path()));

    let err = memory
        .graph()
        .add_causal_node(NodeType::Decision, "x", None)
        .unwrap_err();
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_corrupt_file_does_not_break_listing() {
    let (memory, _temp) = setup();
    let episodes = memory.episodes();
    episodes
        .new_episode("a", "one", EpisodeOutcome::Success, EpisodeContent::default())
        .unwrap();
    episodes
        .new_episode("b", "two", EpisodeOutcome::Failure, EpisodeContent::default())
        .unwrap();
    fs::write(memory.config().episodes_dir.join("episode-c.json"), "{ broken").unwrap();

    let listed = episodes.get_episodes(&EpisodeQuery::default()).unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed[0].timestamp >= listed[1].timestamp);

    assert!(matches!(
        episodes.get_episode("c").unwrap_err(),
        MemoryError::Corrupted { .. }
    ));
}

#[test]
fn test_node_dedup_by_label() {
    let (memory, _temp) = setup();
    let graph = memory.graph();

    graph.add_causal_node(NodeType::Decision, "Use cache-first read", Some("e1")).unwrap();
    graph.add_causal_node(NodeType::Decision, "Use cache-first read", Some("e2")).unwrap();
    let node = graph
        .add_causal_node(NodeType::Decision, "Use cache-first read", Some("e1"))
        .unwrap();

    assert_eq!(node.id, "n001");
    assert_eq!(node.frequency, 3);
    assert_eq!(node.episodes, vec!["e1", "e2"]);
    assert_eq!(graph.load(LoadMode::Strict).unwrap().nodes.len(), 1);
}

#[test]
fn test_label_match_is_exact() {
    let (memory, _temp) = setup();
    let graph = memory.graph();
    graph.add_causal_node(NodeType::Event, "Build failed", None).unwrap();
    let other = graph.add_causal_node(NodeType::Event, "build failed", None).unwrap();
    assert_eq!(other.id, "n002");
}

#[test]
fn test_edge_merge_keeps_single_identity() {
    let (memory, _temp) = setup();
    let graph = memory.graph();
    graph.add_causal_edge("n001", "n002", EdgeType::Causes, 0.2).unwrap();
    graph.add_causal_edge("n001", "n002", EdgeType::Causes, 0.8).unwrap();
    let edge = graph.add_causal_edge("n001", "n002", EdgeType::Causes, 0.5).unwrap();

    assert_eq!(edge.evidence_count, 3);
    assert!((edge.weight - 0.5).abs() < 1e-12);

    let stored = graph.load(LoadMode::Strict).unwrap();
    assert_eq!(stored.edges.len(), 1);
    // Dangling endpoints are allowed and reported
    assert_eq!(graph.dangling_edges().unwrap().len(), 1);
}

#[test]
fn test_bfs_returns_direct_edge_over_longer_route() {
    let (memory, _temp) = setup();
    chain(&memory);
    memory
        .graph()
        .add_causal_edge("n001", "n004", EdgeType::Prevents, 0.1)
        .unwrap();

    let result = memory.graph().get_causal_path("A", "D", 5).unwrap();
    assert!(result.found);
    assert_eq!(result.depth, Some(1));
    let ids: Vec<_> = result.path.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["n001", "n004"]);
}

#[test]
fn test_zero_depth_is_not_found() {
    let (memory, _temp) = setup();
    chain(&memory);

    let result = memory.graph().get_causal_path("A", "D", 0).unwrap();
    assert!(!result.found);
    assert!(result.path.is_empty());
    assert!(result.error.unwrap().contains("depth"));
}

#[test]
fn test_path_by_id() {
    let (memory, _temp) = setup();
    chain(&memory);

    let result = memory.graph().get_causal_path_by_id("n002", "n004", 5).unwrap();
    assert!(result.found);
    assert_eq!(result.depth, Some(2));
    assert!(!memory.graph().get_causal_path_by_id("n004", "n002", 5).unwrap().found);
}

#[test]
fn test_pattern_mean_and_anti_pattern_threshold() {
    let (memory, _temp) = setup();
    let patterns = memory.patterns();

    patterns
        .add_pattern(PatternDraft::new("force push", "branch diverged", "push --force").success_rate(0.1))
        .unwrap();
    assert!(patterns.get_anti_patterns(0.3).unwrap().is_empty());

    let second = patterns
        .add_pattern(PatternDraft::new("force push", "branch diverged", "push --force").success_rate(0.2))
        .unwrap();
    assert_eq!(second.occurrences, 2);
    assert!((second.success_rate - 0.15).abs() < 1e-12);

    let anti = patterns.get_anti_patterns(0.3).unwrap();
    assert_eq!(anti.len(), 1);
    assert_eq!(anti[0].name, "force push");
}

#[test]
fn test_patterns_sorted_and_filtered() {
    let (memory, _temp) = setup();
    let patterns = memory.patterns();
    for (name, rate) in [("low", 0.2), ("high", 0.95), ("mid", 0.6)] {
        patterns
            .add_pattern(PatternDraft::new(name, "t", "a").success_rate(rate))
            .unwrap();
    }
    patterns.add_pattern(PatternDraft::new("mid", "t", "a").success_rate(0.6)).unwrap();

    let names: Vec<_> = patterns
        .get_patterns(0.0, 1)
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, vec!["high", "mid", "low"]);

    let frequent = patterns.get_patterns(0.5, 2).unwrap();
    assert_eq!(frequent.len(), 1);
    assert_eq!(frequent[0].id, "p003");
}

#[test]
fn test_ingest_then_status() {
    let (memory, _temp) = setup();
    let content = EpisodeContent {
        decisions: vec![json!({
            "timestamp": "2026-01-01T10:00:00Z",
            "type": "retry",
            "chosen": "retry flaky upload",
            "outcome": "failure"
        })],
        events: vec![
            json!({"type": "error", "content": "upload timed out"}),
            json!({"type": "milestone", "content": "Fixed upload with retry"}),
        ],
        ..Default::default()
    };
    memory
        .episodes()
        .new_episode("s1", "publish release", EpisodeOutcome::Partial, content)
        .unwrap();

    let report = memory.ingest(None, false).unwrap();
    assert_eq!(report.episodes_processed, 1);
    assert!(report.edges >= 2);

    // Substring lookup would stop at the "error: ..." event node, so resolve exact labels
    let graph = memory.graph();
    let error = graph.find_node_by_label("upload timed out").unwrap().unwrap();
    let recovery = graph.find_node_by_label("Fixed upload with retry").unwrap().unwrap();
    assert_eq!(error.node_type, NodeType::Error);
    let path = graph.get_causal_path_by_id(&error.id, &recovery.id, 3).unwrap();
    assert!(path.found);
    assert_eq!(path.depth, Some(1));

    let anti = memory.patterns().get_patterns(0.0, 1).unwrap();
    assert_eq!(anti[0].name, "retry anti-pattern");
    assert_eq!(anti[0].action, "AVOID: retry flaky upload");

    let status = memory.status().unwrap();
    assert_eq!(status.episodes.count, 1);
    assert!(status.causal_graph.nodes > 0);
    assert_eq!(status.causal_graph.patterns, 1);
}
