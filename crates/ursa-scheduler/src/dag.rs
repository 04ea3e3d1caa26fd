//! DAG resolution for image builds.

use petgraph::Direction;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use tracing::debug;
use ursa_core::{Base, Error, ImageId, ImageNode, ImageSet, Result};

/// Directed graph of "is the base of" edges within an [`ImageSet`].
///
/// Node indices equal positions in the set, so ordering ties can be broken
/// by the set's order. Bases outside the set are treated as already
/// available and add no edge.
#[derive(Debug)]
pub struct BuildGraph<'a> {
    set: ImageSet<'a>,
    graph: DiGraph<ImageId, ()>,
    index_of: HashMap<ImageId, NodeIndex>,
}

impl<'a> BuildGraph<'a> {
    pub fn new(set: &ImageSet<'a>) -> Self {
        let mut graph = DiGraph::new();
        let mut index_of = HashMap::new();

        // Add all images as nodes, first occurrence wins
        for &id in set.ids() {
            if !index_of.contains_key(&id) {
                let idx = graph.add_node(id);
                index_of.insert(id, idx);
            }
        }

        // Add edges from base to child
        let edges: Vec<(NodeIndex, NodeIndex)> = graph
            .node_indices()
            .filter_map(|idx| {
                let image = set.collection().get(graph[idx])?;
                match image.base() {
                    Base::Image(base_id) => index_of.get(base_id).map(|&base_idx| (base_idx, idx)),
                    Base::External(_) => None,
                }
            })
            .collect();
        for (base_idx, idx) in edges {
            graph.add_edge(base_idx, idx, ());
        }

        Self {
            set: set.clone(),
            graph,
            index_of,
        }
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    fn sorted(&self, mut indices: Vec<NodeIndex>) -> Vec<ImageId> {
        indices.sort();
        indices.dedup();
        indices.into_iter().map(|idx| self.graph[idx]).collect()
    }

    /// Images whose base is external or outside the set.
    pub fn roots(&self) -> Vec<ImageId> {
        self.sorted(
            self.graph
                .node_indices()
                .filter(|&idx| {
                    self.graph
                        .neighbors_directed(idx, Direction::Incoming)
                        .next()
                        .is_none()
                })
                .collect(),
        )
    }

    /// Images built directly on top of `id`, in set order.
    pub fn dependents(&self, id: ImageId) -> Vec<ImageId> {
        self.index_of
            .get(&id)
            .map(|&idx| {
                self.sorted(
                    self.graph
                        .neighbors_directed(idx, Direction::Outgoing)
                        .collect(),
                )
            })
            .unwrap_or_default()
    }

    /// The in-set base `id` has to wait for, if any.
    pub fn base_of(&self, id: ImageId) -> Option<ImageId> {
        let idx = self.index_of.get(&id)?;
        self.graph
            .neighbors_directed(*idx, Direction::Incoming)
            .next()
            .map(|base| self.graph[base])
    }

    /// Position of `id` in the set, used as the scheduling priority.
    pub fn position(&self, id: ImageId) -> Option<usize> {
        self.index_of.get(&id).map(|idx| idx.index())
    }

    /// Check if an image can start given the images built so far.
    pub fn is_ready(&self, id: ImageId, completed: &HashSet<ImageId>) -> bool {
        self.base_of(id).is_none_or(|base| completed.contains(&base))
    }

    /// Kahn's algorithm; among images that are ready at the same time the
    /// one earliest in the set goes first.
    pub fn topological_order(&self) -> Result<Vec<ImageId>> {
        let mut in_degree: Vec<usize> = self
            .graph
            .node_indices()
            .map(|idx| self.graph.neighbors_directed(idx, Direction::Incoming).count())
            .collect();

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree == 0)
            .map(|(pos, _)| Reverse(pos))
            .collect();

        let mut order = Vec::with_capacity(self.len());
        while let Some(Reverse(pos)) = ready.pop() {
            let idx = NodeIndex::new(pos);
            order.push(self.graph[idx]);
            for child in self.graph.neighbors_directed(idx, Direction::Outgoing) {
                let degree = &mut in_degree[child.index()];
                *degree -= 1;
                if *degree == 0 {
                    ready.push(Reverse(child.index()));
                }
            }
        }

        if order.len() < self.len() {
            return Err(self.cycle_error());
        }

        debug!(images = order.len(), "Resolved build order");
        Ok(order)
    }

    /// Name the members of every cycle. Images that only sit downstream of
    /// a cycle are left out.
    fn cycle_error(&self) -> Error {
        let members: Vec<NodeIndex> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || component
                        .first()
                        .is_some_and(|&idx| self.graph.contains_edge(idx, idx))
            })
            .flatten()
            .collect();

        let images = self
            .sorted(members)
            .into_iter()
            .filter_map(|id| self.set.collection().get(id))
            .map(ImageNode::qualified_name)
            .collect();

        Error::CyclicDependency { images }
    }
}
