use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

use strata_core::{GenerationError, Result};

/// Read-only dataset nesting: composite ids and the ids they cover.
///
/// Built once and injected into resolvers; there is no process-wide
/// instance. Every node has at most one parent and the nesting is acyclic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "BTreeMap<String, Vec<String>>")]
pub struct DatasetHierarchy {
    children: BTreeMap<String, Vec<String>>,
    parents: BTreeMap<String, String>,
}

impl TryFrom<BTreeMap<String, Vec<String>>> for DatasetHierarchy {
    type Error = GenerationError;

    fn try_from(value: BTreeMap<String, Vec<String>>) -> Result<Self> {
        let mut builder = HierarchyBuilder::default();
        for (id, children) in value {
            builder = builder.composite(id, children);
        }
        builder.build()
    }
}

impl DatasetHierarchy {
    pub fn builder() -> HierarchyBuilder {
        HierarchyBuilder::default()
    }

    /// Parse the properties-style set format.
    ///
    /// One composite per line, `id=child_a,child_b`. Blank lines and lines
    /// starting with `#` or `!` are skipped.
    pub fn parse_properties(text: &str, source: &str) -> Result<Self> {
        let mut builder = HierarchyBuilder::default();
        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let Some((id, children)) = line.split_once('=') else {
                return Err(GenerationError::configuration(
                    format!("{source}:{}", index + 1),
                    format!("expected 'id=child,...', got '{line}'"),
                ));
            };
            let id = id.trim();
            if id.is_empty() {
                return Err(GenerationError::configuration(
                    format!("{source}:{}", index + 1),
                    "empty dataset id",
                ));
            }
            let children: Vec<String> = children
                .split(',')
                .map(str::trim)
                .filter(|child| !child.is_empty())
                .map(str::to_string)
                .collect();
            builder = builder.composite(id, children);
        }
        builder.build()
    }

    pub fn parent(&self, id: &str) -> Option<&str> {
        self.parents.get(id).map(String::as_str)
    }

    pub fn children(&self, id: &str) -> &[String] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_composite(&self, id: &str) -> bool {
        !self.children(id).is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.children.contains_key(id) || self.parents.contains_key(id)
    }

    /// Parent, grandparent, ... up to the root.
    pub fn ancestors(&self, id: &str) -> Vec<&str> {
        let mut ancestors = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            ancestors.push(parent);
            current = parent;
        }
        ancestors
    }

    /// Leaf ids covered by `id`, depth-first in declaration order.
    ///
    /// A leaf (or an id the hierarchy does not know) covers only itself.
    pub fn leaves(&self, id: &str) -> Vec<String> {
        let mut leaves = Vec::new();
        let mut seen = BTreeSet::new();
        self.collect_leaves(id, &mut leaves, &mut seen);
        leaves
    }

    fn collect_leaves(&self, id: &str, leaves: &mut Vec<String>, seen: &mut BTreeSet<String>) {
        let children = self.children(id);
        if children.is_empty() {
            if seen.insert(id.to_string()) {
                leaves.push(id.to_string());
            }
            return;
        }
        for child in children {
            self.collect_leaves(child, leaves, seen);
        }
    }
}

/// Incremental constructor for [`DatasetHierarchy`].
#[derive(Debug, Clone, Default)]
pub struct HierarchyBuilder {
    children: BTreeMap<String, Vec<String>>,
}

impl HierarchyBuilder {
    /// Declare `id` as covering `children`, appended in order.
    pub fn composite<I, S>(mut self, id: impl Into<String>, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self.children.entry(id.into()).or_default();
        for child in children {
            let child = child.into();
            if !entry.contains(&child) {
                entry.push(child);
            }
        }
        self
    }

    pub fn build(self) -> Result<DatasetHierarchy> {
        let mut parents: BTreeMap<String, String> = BTreeMap::new();
        for (id, children) in &self.children {
            for child in children {
                if child == id {
                    return Err(GenerationError::configuration(
                        format!("dataset '{id}'"),
                        "dataset cannot contain itself",
                    ));
                }
                if let Some(existing) = parents.insert(child.clone(), id.clone())
                    && existing != *id
                {
                    return Err(GenerationError::configuration(
                        format!("dataset '{child}'"),
                        format!("dataset has two parents: '{existing}' and '{id}'"),
                    ));
                }
            }
        }

        if let Err(cycle) = toposort(&self.children) {
            return Err(GenerationError::configuration(
                format!("datasets {}", cycle.join(", ")),
                "dataset hierarchy contains a cycle",
            ));
        }

        Ok(DatasetHierarchy {
            children: self.children,
            parents,
        })
    }
}

fn toposort(
    graph: &BTreeMap<String, Vec<String>>,
) -> std::result::Result<Vec<String>, Vec<String>> {
    let mut indegree: BTreeMap<&str, usize> = BTreeMap::new();
    for (node, targets) in graph {
        indegree.entry(node.as_str()).or_insert(0);
        for target in targets {
            *indegree.entry(target.as_str()).or_insert(0) += 1;
        }
    }

    let mut ready: BTreeSet<&str> = indegree
        .iter()
        .filter_map(|(node, count)| (*count == 0).then_some(*node))
        .collect();
    let mut order = Vec::with_capacity(indegree.len());

    while let Some(node) = ready.pop_first() {
        order.push(node.to_string());
        if let Some(targets) = graph.get(node) {
            for target in targets {
                if let Some(count) = indegree.get_mut(target.as_str()) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        ready.insert(target.as_str());
                    }
                }
            }
        }
    }

    if order.len() == indegree.len() {
        Ok(order)
    } else {
        Err(indegree
            .into_iter()
            .filter_map(|(node, count)| (count > 0).then(|| node.to_string()))
            .collect())
    }
}
