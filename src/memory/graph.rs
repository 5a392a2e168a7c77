//! In-memory operations on the causal graph document
//!
//! Everything here is free of I/O. The store loads a [`CausalGraph`],
//! applies one of these merges, and persists the result.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet, VecDeque};

use crate::errors::{MemoryError, Result};
use crate::memory::types::{CausalGraph, Edge, EdgeType, Node, NodeType, PathResult, Pattern, PatternDraft};

/// Upper bound on path search depth
pub const MAX_PATH_DEPTH: usize = 10;

/// Incremental mean: every observation carries equal weight
///
/// `n` is the observation count including `sample`.
pub fn running_average(previous: f64, sample: f64, n: u64) -> f64 {
    if n <= 1 {
        return sample;
    }
    let n = n as f64;
    (previous * (n - 1.0) + sample) / n
}

/// Reject anything outside [0, 1], including NaN
pub fn check_unit_interval(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(MemoryError::invalid(format!(
            "{} must be between 0 and 1, got {}.",
            name, value
        )))
    }
}

pub fn check_max_depth(max_depth: usize) -> Result<()> {
    if max_depth > MAX_PATH_DEPTH {
        return Err(MemoryError::invalid(format!(
            "max_depth must be at most {}, got {}",
            MAX_PATH_DEPTH, max_depth
        )));
    }
    Ok(())
}

/// Next `<prefix>NNN` id: highest numeric suffix plus one
fn next_id<'a>(prefix: char, ids: impl Iterator<Item = &'a str>) -> String {
    let highest = ids
        .filter_map(|id| id.strip_prefix(prefix))
        .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|digits| digits.parse::<u64>().ok())
        .max()
        .unwrap_or(0);

    format!("{}{:03}", prefix, highest + 1)
}

fn by_rate(a: &Pattern, b: &Pattern) -> Ordering {
    a.success_rate.partial_cmp(&b.success_rate).unwrap_or(Ordering::Equal)
}

impl CausalGraph {
    pub fn next_node_id(&self) -> String {
        next_id('n', self.nodes.iter().map(|n| n.id.as_str()))
    }

    pub fn next_pattern_id(&self) -> String {
        next_id('p', self.patterns.iter().map(|p| p.id.as_str()))
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_by_label(&self, label: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.label == label)
    }

    /// First node, in stored order, whose label contains `fragment`
    pub fn node_containing(&self, fragment: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.label.contains(fragment))
    }

    /// Merge an observation of `label` into the graph
    ///
    /// An existing node keeps its type; its frequency grows by one and the
    /// episode is recorded once.
    pub fn upsert_node(&mut self, node_type: NodeType, label: &str, episode_id: Option<&str>) -> Node {
        if let Some(existing) = self.nodes.iter_mut().find(|n| n.label == label) {
            existing.frequency += 1;
            if let Some(episode_id) = episode_id {
                if !existing.episodes.iter().any(|e| e == episode_id) {
                    existing.episodes.push(episode_id.to_string());
                }
            }
            return existing.clone();
        }

        let node = Node {
            id: self.next_node_id(),
            node_type,
            label: label.to_string(),
            episodes: episode_id.map(|e| vec![e.to_string()]).unwrap_or_default(),
            frequency: 1,
            success_rate: 1.0,
        };
        self.nodes.push(node.clone());
        node
    }

    /// Merge an observation of `source -> target` into the graph
    ///
    /// Endpoints are not required to exist.
    pub fn upsert_edge(&mut self, source: &str, target: &str, edge_type: EdgeType, weight: f64) -> Result<Edge> {
        check_unit_interval("Weight", weight)?;

        if let Some(existing) = self
            .edges
            .iter_mut()
            .find(|e| e.source == source && e.target == target && e.edge_type == edge_type)
        {
            existing.evidence_count += 1;
            existing.weight = running_average(existing.weight, weight, existing.evidence_count);
            return Ok(existing.clone());
        }

        let edge = Edge {
            source: source.to_string(),
            target: target.to_string(),
            edge_type,
            weight,
            evidence_count: 1,
        };
        self.edges.push(edge.clone());
        Ok(edge)
    }

    /// Merge a pattern observation, keyed by exact name
    ///
    /// A repeat keeps the original trigger, action and description.
    pub fn upsert_pattern(&mut self, draft: &PatternDraft, now: DateTime<Utc>) -> Result<Pattern> {
        check_unit_interval("success_rate", draft.success_rate)?;

        if let Some(existing) = self.patterns.iter_mut().find(|p| p.name == draft.name) {
            existing.occurrences += 1;
            existing.success_rate =
                running_average(existing.success_rate, draft.success_rate, existing.occurrences);
            existing.last_used = now;
            return Ok(existing.clone());
        }

        let pattern = Pattern {
            id: self.next_pattern_id(),
            name: draft.name.clone(),
            description: draft.description.clone(),
            trigger: draft.trigger.clone(),
            action: draft.action.clone(),
            success_rate: draft.success_rate,
            occurrences: 1,
            last_used: now,
        };
        self.patterns.push(pattern.clone());
        Ok(pattern)
    }

    /// Shortest path between the first nodes whose labels contain the fragments
    pub fn find_path(&self, from_label: &str, to_label: &str, max_depth: usize) -> Result<PathResult> {
        check_max_depth(max_depth)?;

        let from = self.node_containing(from_label);
        let to = self.node_containing(to_label);

        match (from, to) {
            (Some(from), Some(to)) => Ok(self.breadth_first(from, to, max_depth)),
            (None, _) => Ok(PathResult::not_found(format!(
                "Node not found: no label contains '{}'",
                from_label
            ))),
            (_, None) => Ok(PathResult::not_found(format!(
                "Node not found: no label contains '{}'",
                to_label
            ))),
        }
    }

    /// Shortest path between two exact node ids
    pub fn find_path_by_id(&self, from_id: &str, to_id: &str, max_depth: usize) -> Result<PathResult> {
        check_max_depth(max_depth)?;

        match (self.node(from_id), self.node(to_id)) {
            (Some(from), Some(to)) => Ok(self.breadth_first(from, to, max_depth)),
            (None, _) => Ok(PathResult::not_found(format!("Node not found: {}", from_id))),
            (_, None) => Ok(PathResult::not_found(format!("Node not found: {}", to_id))),
        }
    }

    /// BFS over directed edges, at most `max_depth` hops from `from`
    ///
    /// Edges into ids that are not stored nodes are not traversed.
    fn breadth_first(&self, from: &Node, to: &Node, max_depth: usize) -> PathResult {
        let known: HashSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
        let mut outgoing: HashMap<&str, Vec<&str>> = HashMap::new();
        for edge in &self.edges {
            if known.contains(edge.target.as_str()) {
                outgoing
                    .entry(edge.source.as_str())
                    .or_default()
                    .push(edge.target.as_str());
            }
        }

        let mut parents: HashMap<&str, &str> = HashMap::new();
        let mut visited: HashSet<&str> = HashSet::from([from.id.as_str()]);
        let mut queue: VecDeque<(&str, usize)> = VecDeque::from([(from.id.as_str(), 0)]);

        while let Some((current, hops)) = queue.pop_front() {
            if current == to.id {
                let mut ids = vec![current];
                let mut cursor = current;
                while let Some(&parent) = parents.get(cursor) {
                    ids.push(parent);
                    cursor = parent;
                }
                ids.reverse();

                let path = ids.into_iter().filter_map(|id| self.node(id)).cloned().collect();
                return PathResult::found(path);
            }

            if hops >= max_depth {
                continue;
            }

            for &next in outgoing.get(current).into_iter().flatten() {
                if visited.insert(next) {
                    parents.insert(next, current);
                    queue.push_back((next, hops + 1));
                }
            }
        }

        PathResult::not_found(format!("No path found within depth {}", max_depth))
    }

    /// Edges whose source or target is not a stored node
    pub fn dangling_edges(&self) -> Vec<&Edge> {
        let known: HashSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
        self.edges
            .iter()
            .filter(|e| !known.contains(e.source.as_str()) || !known.contains(e.target.as_str()))
            .collect()
    }

    /// Patterns at or above both thresholds, best first
    pub fn patterns_matching(&self, min_success_rate: f64, min_occurrences: u64) -> Vec<Pattern> {
        let mut result: Vec<Pattern> = self
            .patterns
            .iter()
            .filter(|p| p.success_rate >= min_success_rate && p.occurrences >= min_occurrences)
            .cloned()
            .collect();

        result.sort_by(|a, b| by_rate(b, a));
        result
    }

    /// Low-scoring patterns seen at least twice, worst first
    pub fn anti_patterns(&self, max_success_rate: f64) -> Vec<Pattern> {
        let mut result: Vec<Pattern> = self
            .patterns
            .iter()
            .filter(|p| p.success_rate <= max_success_rate && p.occurrences >= 2)
            .cloned()
            .collect();

        result.sort_by(by_rate);
        result
    }
}
