//! Connected components ("batches") of the module dependency graph.
//!
//! Dependencies are treated as undirected edges. Dangling references and
//! self-dependencies do not affect the partition.

use crate::ir::{Module, authoritative_modules};
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub id: usize,
    pub name: String,
    /// Member filenames, ascending by priority (input order on ties).
    pub members: Vec<String>,
    pub min_priority: i64,
    pub color: String,
}

impl Batch {
    pub fn contains(&self, filename: &str) -> bool {
        self.members.iter().any(|m| m == filename)
    }
}

/// Union-find over dense indices with path compression and union by rank.
#[derive(Debug, Clone)]
pub struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    pub fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cur = x;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    pub fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}

pub fn compute_batches(modules: &[Module]) -> Vec<Batch> {
    compute_batches_with_theme(modules, &Theme::modern())
}

pub fn compute_batches_with_theme(modules: &[Module], theme: &Theme) -> Vec<Batch> {
    let modules = authoritative_modules(modules);
    if modules.is_empty() {
        return Vec::new();
    }

    let index: HashMap<&str, usize> = modules
        .iter()
        .enumerate()
        .map(|(idx, m)| (m.filename.as_str(), idx))
        .collect();

    let mut sets = DisjointSet::new(modules.len());
    for (idx, module) in modules.iter().enumerate() {
        for dep in &module.dependencies {
            if let Some(&dep_idx) = index.get(dep.as_str()) {
                sets.union(idx, dep_idx);
            }
        }
    }

    // Components in order of first appearance so the later stable sorts are
    // independent of hash iteration order.
    let mut component_of_root: HashMap<usize, usize> = HashMap::new();
    let mut components: Vec<Vec<usize>> = Vec::new();
    for idx in 0..modules.len() {
        let root = sets.find(idx);
        let slot = *component_of_root.entry(root).or_insert_with(|| {
            components.push(Vec::new());
            components.len() - 1
        });
        components[slot].push(idx);
    }

    let mut raw: Vec<(i64, Vec<String>)> = components
        .into_iter()
        .map(|mut members| {
            members.sort_by_key(|&idx| modules[idx].priority);
            let min_priority = modules[members[0]].priority;
            let names = members
                .into_iter()
                .map(|idx| modules[idx].filename.clone())
                .collect();
            (min_priority, names)
        })
        .collect();
    raw.sort_by_key(|(min_priority, _)| *min_priority);

    let batches: Vec<Batch> = raw
        .into_iter()
        .enumerate()
        .map(|(id, (min_priority, members))| Batch {
            id,
            name: format!("Batch {}", id + 1),
            members,
            min_priority,
            color: theme.batch_color(id),
        })
        .collect();
    tracing::debug!(
        modules = modules.len(),
        batches = batches.len(),
        "computed batches"
    );
    batches
}

/// Batch id containing `filename`.
pub fn batch_of(batches: &[Batch], filename: &str) -> Option<usize> {
    batches.iter().find(|b| b.contains(filename)).map(|b| b.id)
}

/// Selection of batches used to filter the visible module set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchFilter {
    selected: BTreeSet<usize>,
}

impl BatchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle(&mut self, batch_id: usize) {
        if !self.selected.remove(&batch_id) {
            self.selected.insert(batch_id);
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn is_active(&self) -> bool {
        !self.selected.is_empty()
    }

    /// Filenames left visible by the filter, or `None` when no batch is selected.
    pub fn visible(&self, batches: &[Batch]) -> Option<BTreeSet<String>> {
        if !self.is_active() {
            return None;
        }
        Some(
            batches
                .iter()
                .filter(|b| self.selected.contains(&b.id))
                .flat_map(|b| b.members.iter().cloned())
                .collect(),
        )
    }
}
