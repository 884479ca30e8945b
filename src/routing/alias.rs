//! Model alias resolution.
//!
//! Resolution order:
//! 1. passthrough prefixes (already routed identifiers are returned untouched)
//! 2. exact alias match
//! 3. substring match against alias keys, in declaration order
//! 4. family default by lowercase substring membership
//! 5. the input identifier, unchanged
//!
//! Absence of a mapping is a valid outcome; nothing here returns an error.

use tracing::{debug, info};

use super::config::GatewayConfig;
use super::ResolvedTarget;

#[derive(Debug, Clone)]
pub struct AliasResolver {
    passthrough_prefixes: Vec<String>,
    aliases: Vec<(String, String)>,
    family_defaults: Vec<(Vec<String>, String)>,
}

impl AliasResolver {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            passthrough_prefixes: config.passthrough_prefixes.clone(),
            aliases: config
                .aliases
                .iter()
                .map(|a| (a.from.clone(), a.to.clone()))
                .collect(),
            family_defaults: config
                .family_defaults
                .iter()
                .map(|d| {
                    let needles = d.contains.iter().map(|n| n.to_lowercase()).collect();
                    (needles, d.route.clone())
                })
                .collect(),
        }
    }

    /// Map a caller-supplied identifier to a routing identifier.
    pub fn resolve(&self, model: &str) -> String {
        if self
            .passthrough_prefixes
            .iter()
            .any(|p| model.starts_with(p.as_str()))
        {
            debug!(model, "model already routed, skipping alias resolution");
            return model.to_string();
        }

        if let Some((_, to)) = self.aliases.iter().find(|(from, _)| from == model) {
            info!(model, routed = to.as_str(), "mapping model via alias table");
            return to.clone();
        }

        if let Some((from, to)) = self.aliases.iter().find(|(from, _)| model.contains(from.as_str())) {
            info!(
                model,
                alias = from.as_str(),
                routed = to.as_str(),
                "mapping model via partial alias match"
            );
            return to.clone();
        }

        let lower = model.to_lowercase();
        for (needles, route) in &self.family_defaults {
            if needles.iter().any(|n| lower.contains(n.as_str())) {
                info!(model, routed = route.as_str(), "mapping model to family default route");
                return route.clone();
            }
        }

        model.to_string()
    }

    pub fn resolve_target(&self, model: &str) -> ResolvedTarget {
        ResolvedTarget::new(self.resolve(model))
    }
}
