//! Evolution graph module.
//!
//! Provides the `EvolutionGraph` type, which holds the catalog's evolution
//! links as a directed graph (`from -> to`). Used to validate the catalog
//! (no cycles, no shared targets, chains of at most three stages with rising
//! rarity) and to walk a species' chain.

use crate::catalog::Catalog;
use crate::creature_key::CreatureKey;
use crate::error::CatalogError;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

/// Longest allowed chain: common -> rare -> epic.
pub const MAX_CHAIN_LENGTH: usize = 3;

/// Directed graph of evolution links. Edge weights are evolution levels.
///
/// # Examples
///
/// ```rust
/// use idledex::evolution::EvolutionGraph;
/// use idledex::{Catalog, CreatureKey};
///
/// let catalog = Catalog::standard();
/// let graph = EvolutionGraph::from_catalog(&catalog).unwrap();
///
/// let chain = graph.chain(&CreatureKey::new("kadabra"));
/// let names: Vec<&str> = chain.iter().map(|k| k.as_str()).collect();
/// assert_eq!(names, ["abra", "kadabra", "alakazam"]);
/// ```
pub struct EvolutionGraph {
    graph: DiGraph<CreatureKey, u32>,
    node_map: HashMap<CreatureKey, NodeIndex>,
}

impl EvolutionGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
        }
    }

    /// Build the graph from every catalog entry.
    ///
    /// Fails when an entry evolves into a key the catalog lacks.
    pub fn from_catalog(catalog: &Catalog) -> Result<Self, CatalogError> {
        let mut graph = Self::new();
        for (key, _) in catalog.iter() {
            graph.add_node(key.clone());
        }
        for (key, entry) in catalog.iter() {
            if let Some((target, level)) = entry.evolution() {
                if !catalog.contains(target.as_str()) {
                    return Err(CatalogError::UnknownEvolutionTarget {
                        from: key.clone(),
                        to: target.clone(),
                    });
                }
                graph.add_link(key.clone(), target.clone(), level);
            }
        }
        Ok(graph)
    }

    /// Add a node if it doesn't exist and return its index.
    pub fn add_node(&mut self, key: CreatureKey) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(&key) {
            idx
        } else {
            let idx = self.graph.add_node(key.clone());
            self.node_map.insert(key, idx);
            idx
        }
    }

    /// Record that `from` evolves into `to` at `level`.
    pub fn add_link(&mut self, from: CreatureKey, to: CreatureKey, level: u32) {
        let from_idx = self.add_node(from);
        let to_idx = self.add_node(to);
        self.graph.add_edge(from_idx, to_idx, level);
    }

    pub fn contains(&self, key: &CreatureKey) -> bool {
        self.node_map.contains_key(key)
    }

    /// Run every structural check against `catalog`.
    pub fn validate(&self, catalog: &Catalog) -> Result<(), CatalogError> {
        self.detect_shared_targets()?;
        self.detect_cycles()?;

        for root in self.roots() {
            let chain = self.chain_from(&root);
            if chain.len() > MAX_CHAIN_LENGTH {
                return Err(CatalogError::ChainTooLong {
                    root,
                    length: chain.len(),
                });
            }
            for pair in chain.windows(2) {
                let rising = match (catalog.get(pair[0].as_str()), catalog.get(pair[1].as_str())) {
                    (Some(from), Some(to)) => from.rarity < to.rarity,
                    _ => false,
                };
                if !rising {
                    return Err(CatalogError::RarityNotIncreasing {
                        from: pair[0].clone(),
                        to: pair[1].clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn detect_shared_targets(&self) -> Result<(), CatalogError> {
        for idx in self.graph.node_indices() {
            let mut sources = self.graph.neighbors_directed(idx, Direction::Incoming);
            if let (Some(first), Some(second)) = (sources.next(), sources.next()) {
                return Err(CatalogError::SharedEvolutionTarget {
                    target: self.graph[idx].clone(),
                    first: self.graph[first].clone(),
                    second: self.graph[second].clone(),
                });
            }
        }
        Ok(())
    }

    /// Detect evolution loops.
    ///
    /// Each species has at most one target, so a cycle is found by walking
    /// forward from the node petgraph's toposort reports until a key repeats.
    pub fn detect_cycles(&self) -> Result<(), CatalogError> {
        match toposort(&self.graph, None) {
            Ok(_) => Ok(()),
            Err(cycle) => {
                let mut path = Vec::new();
                let mut seen = HashSet::new();
                let mut current = Some(cycle.node_id());
                while let Some(idx) = current {
                    let key = self.graph[idx].clone();
                    if !seen.insert(idx) {
                        // Trim the lead-in so the path starts where the loop does.
                        if let Some(start) = path.iter().position(|k| k == &key) {
                            path.drain(..start);
                        }
                        path.push(key);
                        break;
                    }
                    path.push(key);
                    current = self.graph.neighbors_directed(idx, Direction::Outgoing).next();
                }
                Err(CatalogError::Cycle { path })
            }
        }
    }

    /// Species nothing evolves into, sorted by key.
    pub fn roots(&self) -> Vec<CreatureKey> {
        let mut roots: Vec<CreatureKey> = self
            .graph
            .node_indices()
            .filter(|&idx| {
                self.graph
                    .neighbors_directed(idx, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(|idx| self.graph[idx].clone())
            .collect();
        roots.sort();
        roots
    }

    /// Whether `key` starts its chain.
    pub fn is_root(&self, key: &CreatureKey) -> bool {
        self.node_map.get(key).is_some_and(|&idx| {
            self.graph
                .neighbors_directed(idx, Direction::Incoming)
                .next()
                .is_none()
        })
    }

    /// The full chain containing `key`, from its root to its final form.
    ///
    /// Empty for keys outside the graph.
    pub fn chain(&self, key: &CreatureKey) -> Vec<CreatureKey> {
        let Some(&start) = self.node_map.get(key) else {
            return Vec::new();
        };

        let mut root = start;
        let mut steps = 0;
        while let Some(prev) = self.graph.neighbors_directed(root, Direction::Incoming).next() {
            root = prev;
            steps += 1;
            if steps > self.graph.node_count() {
                break;
            }
        }
        self.chain_from(&self.graph[root].clone())
    }

    /// Walk forward from `key` until a final form.
    fn chain_from(&self, key: &CreatureKey) -> Vec<CreatureKey> {
        let mut chain = Vec::new();
        let mut current = self.node_map.get(key).copied();
        while let Some(idx) = current {
            if chain.len() > self.graph.node_count() {
                break;
            }
            chain.push(self.graph[idx].clone());
            current = self.graph.neighbors_directed(idx, Direction::Outgoing).next();
        }
        chain
    }
}

impl Default for EvolutionGraph {
    fn default() -> Self {
        Self::new()
    }
}
