//! Pattern Library: reusable trigger -> action rules
//!
//! Patterns live in the causal graph document but are scored on their own:
//! each repeat observation folds into a running-average success rate.

use chrono::Utc;

use crate::errors::Result;
use crate::memory::causal::{CausalGraphStore, LoadMode};
use crate::memory::graph::check_unit_interval;
use crate::memory::types::{Pattern, PatternDraft};

/// Default ceiling for anti-pattern success rates
pub const DEFAULT_ANTI_PATTERN_RATE: f64 = 0.3;

/// Pattern operations over the shared graph file
#[derive(Debug, Clone)]
pub struct PatternLibrary {
    store: CausalGraphStore,
}

impl PatternLibrary {
    pub fn new(store: CausalGraphStore) -> Self {
        Self { store }
    }

    /// Record a pattern observation, merging by exact name
    pub fn add_pattern(&self, draft: PatternDraft) -> Result<Pattern> {
        check_unit_interval("success_rate", draft.success_rate)?;

        let mut graph = self.store.load(LoadMode::Strict)?;
        let pattern = graph.upsert_pattern(&draft, Utc::now())?;
        self.store.save(&mut graph)?;

        tracing::debug!(
            id = %pattern.id,
            occurrences = pattern.occurrences,
            success_rate = pattern.success_rate,
            "upserted pattern"
        );
        Ok(pattern)
    }

    /// Patterns meeting both thresholds, highest success rate first
    pub fn get_patterns(&self, min_success_rate: f64, min_occurrences: u64) -> Result<Vec<Pattern>> {
        check_unit_interval("min_success_rate", min_success_rate)?;
        let graph = self.store.load(LoadMode::Strict)?;
        Ok(graph.patterns_matching(min_success_rate, min_occurrences))
    }

    /// Patterns at or below `max_success_rate` with two or more occurrences, worst first
    pub fn get_anti_patterns(&self, max_success_rate: f64) -> Result<Vec<Pattern>> {
        check_unit_interval("max_success_rate", max_success_rate)?;
        let graph = self.store.load(LoadMode::Strict)?;
        Ok(graph.anti_patterns(max_success_rate))
    }
}
