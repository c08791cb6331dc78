//! In-memory view of the relation graph.
//!
//! Built from a snapshot of relations and their types; rebuild it after the
//! store changes. Edge `A -> B` under a dependency relation type means
//! "A depends on B" (A embeds or links to B).

#![allow(clippy::must_use_candidate, clippy::module_name_repetitions)]

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use crate::model::relation::{Relation, RelationType};

#[derive(Debug, Clone, Default)]
pub struct RelationGraph {
    graph: DiGraph<i64, String>,
    nodes: HashMap<i64, NodeIndex>,
    dependency_aliases: HashSet<String>,
}

impl RelationGraph {
    /// Relations whose alias has no entry in `types` become plain,
    /// non-dependency edges.
    pub fn from_relations(relations: &[Relation], types: &[RelationType]) -> Self {
        let mut graph = Self {
            dependency_aliases: types
                .iter()
                .filter(|t| t.is_dependency)
                .map(|t| t.alias.clone())
                .collect(),
            ..Self::default()
        };
        for relation in relations {
            let parent = graph.node(relation.parent_id);
            let child = graph.node(relation.child_id);
            graph
                .graph
                .add_edge(parent, child, relation.relation_type_alias.clone());
        }
        graph
    }

    fn node(&mut self, id: i64) -> NodeIndex {
        let Self { graph, nodes, .. } = self;
        *nodes.entry(id).or_insert_with(|| graph.add_node(id))
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Everything `id` depends on, directly or transitively.
    pub fn dependencies_of(&self, id: i64) -> Vec<i64> {
        self.reachable(id, Direction::Outgoing)
    }

    /// Everything that depends on `id`, directly or transitively.
    pub fn dependents_of(&self, id: i64) -> Vec<i64> {
        self.reachable(id, Direction::Incoming)
    }

    /// Whether anything holds a dependency on `id`.
    pub fn is_referenced(&self, id: i64) -> bool {
        self.nodes.get(&id).is_some_and(|&idx| {
            self.graph
                .edges_directed(idx, Direction::Incoming)
                .any(|edge| self.dependency_aliases.contains(edge.weight()))
        })
    }

    /// Direct neighbours of `id` over any relation type, with the alias.
    pub fn related(&self, id: i64) -> Vec<(i64, &str)> {
        let Some(&idx) = self.nodes.get(&id) else {
            return Vec::new();
        };
        let mut out: Vec<(i64, &str)> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|edge| (self.graph[edge.target()], edge.weight().as_str()))
            .chain(
                self.graph
                    .edges_directed(idx, Direction::Incoming)
                    .map(|edge| (self.graph[edge.source()], edge.weight().as_str())),
            )
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    fn reachable(&self, id: i64, direction: Direction) -> Vec<i64> {
        let Some(&start) = self.nodes.get(&id) else {
            return Vec::new();
        };

        let mut seen: HashSet<NodeIndex> = HashSet::from([start]);
        let mut found = BTreeSet::new();
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            for edge in self.graph.edges_directed(current, direction) {
                if !self.dependency_aliases.contains(edge.weight()) {
                    continue;
                }
                let next = match direction {
                    Direction::Outgoing => edge.target(),
                    Direction::Incoming => edge.source(),
                };
                if seen.insert(next) {
                    found.insert(self.graph[next]);
                    queue.push_back(next);
                }
            }
        }
        found.into_iter().collect()
    }
}
