//! Transitive dependency resolution
//!
//! Builds the header dependency graph from scanned includes, implied
//! includes and correction rules, and walks it with an explicit stack.

use dstbind_core::{Error, HeaderSource, Result};
use dstbind_parser::{scan_includes, HeaderLocator};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::corrector::DependencyCorrector;

/// Non-flattened dependencies of a header, for inspection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyTree {
    pub header: String,
    pub dependencies: Vec<DependencyTree>,
}

impl DependencyTree {
    /// Indented text rendering, one header per line
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let mut stack = vec![(self, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            out.push_str(&"  ".repeat(depth));
            out.push_str(&node.header);
            out.push('\n');
            for child in node.dependencies.iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        out
    }
}

/// Result of [`DependencyResolver::resolve`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dependencies {
    Flat(Vec<String>),
    Tree(DependencyTree),
}

/// Dependency resolver with per-run caches
pub struct DependencyResolver {
    locator: HeaderLocator,
    corrector: DependencyCorrector,
    sources: HashMap<String, HeaderSource>,
    direct: HashMap<String, Vec<String>>,
    flat: HashMap<String, Vec<String>>,
}

impl DependencyResolver {
    pub fn new(locator: HeaderLocator, corrector: DependencyCorrector) -> Self {
        Self {
            locator,
            corrector,
            sources: HashMap::new(),
            direct: HashMap::new(),
            flat: HashMap::new(),
        }
    }

    pub fn locator(&self) -> &HeaderLocator {
        &self.locator
    }

    /// Located header, read once per run
    pub fn source(&mut self, name: &str) -> Result<&HeaderSource> {
        if !self.sources.contains_key(name) {
            let source = self.locator.locate(name)?;
            self.sources.insert(name.to_string(), source);
        }
        self.sources
            .get(name)
            .ok_or_else(|| Error::HeaderNotFound(name.to_string()))
    }

    /// Scanned includes of the header (implied ones first), corrected
    pub fn direct_dependencies(&mut self, name: &str) -> Result<Vec<String>> {
        if let Some(deps) = self.direct.get(name) {
            return Ok(deps.clone());
        }

        let text = self.source(name)?.text_with_implied();
        let mut deps = scan_includes(&text, Some(name));
        self.corrector.correct(name, &mut deps);

        debug!("Direct dependencies of {}: {:?}", name, deps);
        self.direct.insert(name.to_string(), deps.clone());
        Ok(deps)
    }

    /// Transitive dependencies: direct ones first, then each dependency's
    /// own closure in declaration order, without duplicates or `name`.
    pub fn flatten(&mut self, name: &str) -> Result<Vec<String>> {
        if let Some(flat) = self.flat.get(name) {
            return Ok(flat.clone());
        }

        for header in self.post_order(name)? {
            if self.flat.contains_key(&header) {
                continue;
            }
            let direct = self.direct_dependencies(&header)?;
            let mut flat = direct.clone();
            for dep in &direct {
                let nested = self.flat.get(dep).cloned().unwrap_or_default();
                for n in nested {
                    if n != header && !flat.contains(&n) {
                        flat.push(n);
                    }
                }
            }
            self.flat.insert(header, flat);
        }

        Ok(self.flat.get(name).cloned().unwrap_or_default())
    }

    /// Transitive dependencies with every header after its own
    /// dependencies. Same set as [`flatten`](Self::flatten).
    pub fn include_order(&mut self, name: &str) -> Result<Vec<String>> {
        let mut order = self.post_order(name)?;
        order.pop();
        Ok(order)
    }

    /// Dependency tree of a header. Shared dependencies appear under every
    /// header that needs them.
    pub fn tree(&mut self, name: &str) -> Result<DependencyTree> {
        let mut built: HashMap<String, DependencyTree> = HashMap::new();

        for header in self.post_order(name)? {
            let dependencies = self
                .direct_dependencies(&header)?
                .iter()
                .filter_map(|d| built.get(d).cloned())
                .collect();
            built.insert(
                header.clone(),
                DependencyTree {
                    header,
                    dependencies,
                },
            );
        }

        built
            .remove(name)
            .ok_or_else(|| Error::HeaderNotFound(name.to_string()))
    }

    /// Flattened list or tree, as requested
    pub fn resolve(&mut self, name: &str, flatten: bool) -> Result<Dependencies> {
        if flatten {
            Ok(Dependencies::Flat(self.flatten(name)?))
        } else {
            Ok(Dependencies::Tree(self.tree(name)?))
        }
    }

    /// Every header reachable from `root`, dependencies first, `root` last.
    ///
    /// Fails with [`Error::DependencyCycle`] when a header is reached again
    /// while still on the current path.
    fn post_order(&mut self, root: &str) -> Result<Vec<String>> {
        let mut order = Vec::new();
        let mut done: HashSet<String> = HashSet::new();
        let mut path: Vec<String> = vec![root.to_string()];
        let mut stack: Vec<(String, Vec<String>, usize)> =
            vec![(root.to_string(), self.direct_dependencies(root)?, 0)];

        while let Some(frame) = stack.last_mut() {
            if frame.2 < frame.1.len() {
                let child = frame.1[frame.2].clone();
                frame.2 += 1;

                if done.contains(&child) {
                    continue;
                }
                if let Some(start) = path.iter().position(|p| *p == child) {
                    let mut cycle = path[start..].to_vec();
                    cycle.push(child);
                    return Err(Error::DependencyCycle(cycle));
                }

                let deps = self.direct_dependencies(&child)?;
                path.push(child.clone());
                stack.push((child, deps, 0));
            } else if let Some((header, _, _)) = stack.pop() {
                path.pop();
                done.insert(header.clone());
                order.push(header);
            }
        }

        Ok(order)
    }
}
