//! Missing-include correction
//!
//! Some DST2k headers use types from headers they never include. The
//! correction rules add those edges to the dependency graph.

use dstbind_tables::CorrectionRule;
use tracing::debug;

/// Applies correction rules to a header's direct dependencies
#[derive(Debug, Clone, Default)]
pub struct DependencyCorrector {
    rules: Vec<CorrectionRule>,
}

impl DependencyCorrector {
    pub fn new(rules: Vec<CorrectionRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[CorrectionRule] {
        &self.rules
    }

    /// Append the headers required by every rule `header` or its
    /// dependencies trigger.
    ///
    /// Rules run once, in order; a header added by one rule can trigger a
    /// later one, but no rule is revisited. A header never gains itself.
    pub fn correct(&self, header: &str, dependencies: &mut Vec<String>) {
        for rule in &self.rules {
            if rule.requires == header || dependencies.contains(&rule.requires) {
                continue;
            }
            if rule.applies_to(header, dependencies) {
                debug!("Correcting {}: adding {}", header, rule.requires);
                dependencies.push(rule.requires.clone());
            }
        }
    }
}
