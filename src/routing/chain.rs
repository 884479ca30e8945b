//! Ordered fallback chains and their pre-emptive triggers.

use std::collections::HashSet;

use super::config::PreemptiveChainConfig;
use super::ResolvedTarget;

/// Immutable, deduplicated sequence of candidate targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackChain {
    name: String,
    candidates: Vec<ResolvedTarget>,
}

impl FallbackChain {
    /// Build a chain. Repeated identifiers keep only their first position.
    pub fn new(name: &str, candidates: &[String]) -> Self {
        let mut seen = HashSet::new();
        let candidates = candidates
            .iter()
            .filter(|c| seen.insert(c.as_str()))
            .map(ResolvedTarget::new)
            .collect();
        Self {
            name: name.to_string(),
            candidates,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn candidates(&self) -> &[ResolvedTarget] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Routing identifiers in order, for logs and error messages.
    pub fn describe(&self) -> Vec<String> {
        self.candidates.iter().map(|c| c.routing_id.clone()).collect()
    }
}

/// Chain taken *instead of* direct dispatch when the requested identifier matches.
#[derive(Debug, Clone)]
pub struct PreemptiveRule {
    pub chain: FallbackChain,
    match_substrings: Vec<String>,
    match_exact: Vec<String>,
}

impl PreemptiveRule {
    pub fn from_config(config: &PreemptiveChainConfig) -> Self {
        Self {
            chain: FallbackChain::new(&config.name, &config.candidates),
            match_substrings: config
                .match_substrings
                .iter()
                .map(|s| s.to_lowercase())
                .collect(),
            match_exact: config.match_exact.clone(),
        }
    }

    /// Exact identifiers compare verbatim; substrings compare case-insensitively.
    pub fn matches(&self, requested: &str) -> bool {
        if self.match_exact.iter().any(|e| e == requested) {
            return true;
        }
        let lower = requested.to_lowercase();
        self.match_substrings
            .iter()
            .any(|s| lower.contains(s.as_str()))
    }
}
