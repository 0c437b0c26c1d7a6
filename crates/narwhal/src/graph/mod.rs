use crate::error::{Error, Result};
use indexmap::{IndexMap, IndexSet};
use nalgebra::Vector2;
use rustc_hash::FxBuildHasher;
use serde::{Deserialize, Serialize};

/// One graph vertex as seen by the force simulation.
///
/// `displacement` accumulates forces for the current tick and `previous_displacement` keeps the
/// last tick's value so the speed controller can measure oscillation.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub mass: f64,
    pub position: Vector2<f64>,
    pub displacement: Vector2<f64>,
    pub previous_displacement: Vector2<f64>,
    /// Extent used by overlap repulsion only; zero for point-like nodes.
    pub width: f64,
    pub height: f64,
}

impl Node {
    pub fn new(mass: f64, x: f64, y: f64) -> Self {
        Self {
            mass,
            position: Vector2::new(x, y),
            displacement: Vector2::zeros(),
            previous_displacement: Vector2::zeros(),
            width: 0.0,
            height: 0.0,
        }
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn x(&self) -> f64 {
        self.position.x
    }

    pub fn y(&self) -> f64 {
        self.position.y
    }

    /// Mass-weighted change of displacement between the previous and the current tick.
    pub fn swinging(&self) -> f64 {
        self.mass * (self.displacement - self.previous_displacement).norm()
    }

    /// Mass-weighted net movement shared by the previous and the current tick.
    pub fn effective_traction(&self) -> f64 {
        0.5 * self.mass * (self.displacement + self.previous_displacement).norm()
    }

    pub fn begin_tick(&mut self) {
        self.previous_displacement = self.displacement;
        self.displacement = Vector2::zeros();
    }
}

/// Moves every node's displacement into `previous_displacement` and clears the accumulator.
pub fn reset_displacements(nodes: &mut [Node]) {
    for n in nodes {
        n.begin_tick();
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub node1: usize,
    pub node2: usize,
    pub weight: f64,
}

impl Edge {
    pub fn new(node1: usize, node2: usize, weight: f64) -> Self {
        Self {
            node1,
            node2,
            weight,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    pub fn validate(&self) -> Result<()> {
        let node_count = self.nodes.len();
        for (idx, n) in self.nodes.iter().enumerate() {
            if !n.mass.is_finite() || n.mass < 0.0 {
                return Err(Error::InvalidMass {
                    node: idx,
                    mass: n.mass,
                });
            }
            let finite = n.position.iter().all(|v| v.is_finite())
                && n.width.is_finite()
                && n.height.is_finite();
            if !finite {
                return Err(Error::NonFiniteNode { node: idx });
            }
        }
        for (idx, e) in self.edges.iter().enumerate() {
            if !e.weight.is_finite() || e.weight < 0.0 {
                return Err(Error::InvalidWeight {
                    edge: idx,
                    weight: e.weight,
                });
            }
            for node in [e.node1, e.node2] {
                if node >= node_count {
                    return Err(Error::EdgeOutOfRange {
                        edge: idx,
                        node,
                        node_count,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn positions(&self) -> Vec<Point> {
        self.nodes.iter().map(|n| Point::from(n.position)).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl From<Vector2<f64>> for Point {
    fn from(v: Vector2<f64>) -> Self {
        Self { x: v.x, y: v.y }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LayoutResult {
    pub positions: IndexMap<String, Point>,
}

#[derive(Debug, Clone, Default)]
struct PendingNode {
    position: Option<(f64, f64)>,
    width: f64,
    height: f64,
}

/// Builds a [`Graph`] from string node ids, treating edges as undirected.
///
/// Self loops are dropped and a repeated node pair keeps the weight of its last insertion. Node
/// masses are `1 + degree`.
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    nodes: IndexMap<String, PendingNode>,
    edges: IndexMap<(usize, usize), f64, FxBuildHasher>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node without an initial position; returns its index.
    pub fn add_node(&mut self, id: impl Into<String>) -> usize {
        let entry = self.nodes.entry(id.into());
        let idx = entry.index();
        entry.or_default();
        idx
    }

    pub fn add_node_at(&mut self, id: impl Into<String>, x: f64, y: f64) -> usize {
        let entry = self.nodes.entry(id.into());
        let idx = entry.index();
        entry.or_default().position = Some((x, y));
        idx
    }

    pub fn set_size(&mut self, id: &str, width: f64, height: f64) -> Result<()> {
        let node = self.nodes.get_mut(id).ok_or_else(|| Error::MissingEndpoint {
            id: id.to_string(),
        })?;
        node.width = width;
        node.height = height;
        Ok(())
    }

    pub fn add_edge(&mut self, a: &str, b: &str, weight: f64) -> Result<()> {
        let lookup = |id: &str| {
            self.nodes
                .get_index_of(id)
                .ok_or_else(|| Error::MissingEndpoint { id: id.to_string() })
        };
        let (a, b) = (lookup(a)?, lookup(b)?);
        if a == b {
            return Ok(());
        }
        self.edges.insert((a.min(b), a.max(b)), weight);
        Ok(())
    }

    pub fn build(self) -> LabeledGraph {
        let mut degree = vec![0usize; self.nodes.len()];
        let edges: Vec<Edge> = self
            .edges
            .into_iter()
            .map(|((a, b), weight)| {
                degree[a] += 1;
                degree[b] += 1;
                Edge::new(a, b, weight)
            })
            .collect();

        let mut ids = IndexSet::with_capacity(self.nodes.len());
        let mut positioned = Vec::with_capacity(self.nodes.len());
        let mut nodes = Vec::with_capacity(self.nodes.len());
        for (idx, (id, pending)) in self.nodes.into_iter().enumerate() {
            let (x, y) = pending.position.unwrap_or((0.0, 0.0));
            positioned.push(pending.position.is_some());
            nodes.push(
                Node::new(1.0 + degree[idx] as f64, x, y).with_size(pending.width, pending.height),
            );
            ids.insert(id);
        }

        LabeledGraph {
            graph: Graph::new(nodes, edges),
            ids,
            positioned,
        }
    }
}

/// A [`Graph`] together with the string id of every node (by index).
#[derive(Debug, Clone, Default)]
pub struct LabeledGraph {
    pub graph: Graph,
    pub ids: IndexSet<String>,
    /// Whether the node at each index was given an initial position.
    pub positioned: Vec<bool>,
}

impl LabeledGraph {
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.ids.get_index_of(id)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index_of(id).map(|idx| &self.graph.nodes[idx])
    }

    pub fn to_result(&self) -> LayoutResult {
        let positions = self
            .ids
            .iter()
            .zip(&self.graph.nodes)
            .map(|(id, n)| (id.clone(), Point::from(n.position)))
            .collect();
        LayoutResult { positions }
    }
}

#[cfg(test)]
mod tests {
    use super::{Edge, Graph, GraphBuilder, Node};
    use crate::error::Error;

    #[test]
    fn builder_assigns_degree_masses_and_drops_self_loops() {
        let mut b = GraphBuilder::new();
        b.add_node("hub");
        b.add_node_at("a", 1.0, 0.0);
        b.add_node("b");
        b.add_edge("hub", "a", 1.0).unwrap();
        b.add_edge("b", "hub", 2.0).unwrap();
        b.add_edge("a", "a", 5.0).unwrap();
        let g = b.build();

        assert_eq!(g.graph.edges.len(), 2);
        assert_eq!(g.node("hub").unwrap().mass, 3.0);
        assert_eq!(g.node("a").unwrap().mass, 2.0);
        assert_eq!(g.positioned, vec![false, true, false]);
    }

    #[test]
    fn builder_keeps_last_weight_for_repeated_pairs() {
        let mut b = GraphBuilder::new();
        b.add_node("a");
        b.add_node("b");
        b.add_edge("a", "b", 1.0).unwrap();
        b.add_edge("b", "a", 4.0).unwrap();
        let g = b.build();
        assert_eq!(g.graph.edges, vec![Edge::new(0, 1, 4.0)]);
        assert_eq!(g.node("a").unwrap().mass, 2.0);
    }

    #[test]
    fn builder_rejects_unknown_endpoints() {
        let mut b = GraphBuilder::new();
        b.add_node("a");
        let err = b.add_edge("a", "missing", 1.0).unwrap_err();
        assert!(matches!(err, Error::MissingEndpoint { id } if id == "missing"));
    }

    #[test]
    fn validate_reports_out_of_range_edges() {
        let g = Graph::new(vec![Node::new(1.0, 0.0, 0.0)], vec![Edge::new(0, 3, 1.0)]);
        assert!(matches!(
            g.validate(),
            Err(Error::EdgeOutOfRange {
                edge: 0,
                node: 3,
                node_count: 1
            })
        ));
    }

    #[test]
    fn validate_reports_negative_mass() {
        let g = Graph::new(vec![Node::new(-1.0, 0.0, 0.0)], Vec::new());
        assert!(matches!(g.validate(), Err(Error::InvalidMass { node: 0, .. })));
    }

    #[test]
    fn validate_reports_negative_and_nan_weights() {
        let nodes = vec![Node::new(1.0, 0.0, 0.0), Node::new(1.0, 1.0, 0.0)];
        for weight in [-1.0, f64::NAN, f64::INFINITY] {
            let g = Graph::new(nodes.clone(), vec![Edge::new(0, 1, weight)]);
            assert!(matches!(
                g.validate(),
                Err(Error::InvalidWeight { edge: 0, .. })
            ));
        }
        let g = Graph::new(nodes, vec![Edge::new(0, 1, 0.0)]);
        assert!(g.validate().is_ok());
    }

    #[test]
    fn begin_tick_moves_displacement_into_previous() {
        let mut n = Node::new(1.0, 0.0, 0.0);
        n.displacement.x = 3.0;
        n.begin_tick();
        assert_eq!(n.previous_displacement.x, 3.0);
        assert_eq!(n.displacement.x, 0.0);
    }
}
