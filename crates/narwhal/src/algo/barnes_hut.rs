//! Barnes-Hut region tree used to approximate all-pairs repulsion.
//!
//! Regions live in a flat arena and refer to each other (and to nodes) by index only. The tree
//! is rebuilt from the current positions every tick; [`RegionTree::rebuild`] reuses the arena.

use crate::algo::forces::{repel_region, repulsion_between};
use crate::graph::Node;
use nalgebra::Vector2;

pub type RegionId = usize;

#[derive(Debug, Clone, Default)]
pub struct Region {
    pub mass: f64,
    pub center_of_mass: Vector2<f64>,
    /// Twice the distance from the center of mass to the farthest member.
    pub size: f64,
    pub members: Vec<usize>,
    pub children: Vec<RegionId>,
}

impl Region {
    fn new(nodes: &[Node], members: Vec<usize>) -> Self {
        let mut mass = 0.0;
        let mut weighted = Vector2::zeros();
        let mut sum = Vector2::zeros();
        for &m in &members {
            let n = &nodes[m];
            mass += n.mass;
            weighted += n.position * n.mass;
            sum += n.position;
        }
        // Massless members have no centroid of their own; fall back to the plain mean so the
        // split point stays finite.
        let center_of_mass = if mass > 0.0 {
            weighted / mass
        } else if members.is_empty() {
            Vector2::zeros()
        } else {
            sum / members.len() as f64
        };
        let size = members
            .iter()
            .map(|&m| 2.0 * (nodes[m].position - center_of_mass).norm())
            .fold(0.0, f64::max);

        Self {
            mass,
            center_of_mass,
            size,
            members,
            children: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.members.len() < 2
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegionTree {
    regions: Vec<Region>,
}

pub fn build_region_tree(nodes: &[Node]) -> RegionTree {
    let mut tree = RegionTree::default();
    tree.rebuild(nodes);
    tree
}

impl RegionTree {
    pub const ROOT: RegionId = 0;

    pub fn build(nodes: &[Node]) -> Self {
        build_region_tree(nodes)
    }

    pub fn rebuild(&mut self, nodes: &[Node]) {
        self.regions.clear();
        if nodes.is_empty() {
            return;
        }
        self.regions.push(Region::new(nodes, (0..nodes.len()).collect()));

        let mut pending: Vec<RegionId> = vec![Self::ROOT];
        while let Some(id) = pending.pop() {
            if self.regions[id].is_leaf() {
                continue;
            }
            let members = std::mem::take(&mut self.regions[id].members);
            let center = self.regions[id].center_of_mass;

            // Strict `<` on both axes: members on the split point land top-right.
            let mut top_left = Vec::new();
            let mut bottom_left = Vec::new();
            let mut top_right = Vec::new();
            let mut bottom_right = Vec::new();
            for &m in &members {
                let p = nodes[m].position;
                match (p.x < center.x, p.y < center.y) {
                    (true, true) => bottom_left.push(m),
                    (true, false) => top_left.push(m),
                    (false, true) => bottom_right.push(m),
                    (false, false) => top_right.push(m),
                }
            }

            let mut children = Vec::with_capacity(4);
            for quadrant in [top_left, bottom_left, top_right, bottom_right] {
                if quadrant.is_empty() {
                    continue;
                }
                if quadrant.len() < members.len() {
                    let child = self.regions.len();
                    self.regions.push(Region::new(nodes, quadrant));
                    children.push(child);
                    pending.push(child);
                } else {
                    // Every member fell on the same side of the centroid (coincident or
                    // degenerate positions); stop splitting and hang each member off directly.
                    for m in quadrant {
                        children.push(self.regions.len());
                        self.regions.push(Region::new(nodes, vec![m]));
                    }
                }
            }

            let region = &mut self.regions[id];
            region.members = members;
            region.children = children;
        }
    }

    pub fn root(&self) -> Option<&Region> {
        self.regions.first()
    }

    pub fn region(&self, id: RegionId) -> &Region {
        &self.regions[id]
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Approximate repulsion felt by node `n` from every region of the tree.
    ///
    /// A region whose distance times `theta` exceeds its size is treated as a single body at its
    /// center of mass; closer regions are opened. `theta == 0` opens every region.
    pub fn repulsion_on(
        &self,
        nodes: &[Node],
        n: usize,
        theta: f64,
        coefficient: f64,
    ) -> Vector2<f64> {
        let mut stack = Vec::new();
        self.repulsion_on_with(&mut stack, nodes, n, theta, coefficient)
    }

    fn repulsion_on_with(
        &self,
        stack: &mut Vec<RegionId>,
        nodes: &[Node],
        n: usize,
        theta: f64,
        coefficient: f64,
    ) -> Vector2<f64> {
        // A detached copy of the node collects the force so the shared slice stays read-only.
        let mut body = Node {
            displacement: Vector2::zeros(),
            ..nodes[n].clone()
        };
        if self.regions.is_empty() {
            return body.displacement;
        }
        stack.clear();
        stack.push(Self::ROOT);
        while let Some(id) = stack.pop() {
            let region = &self.regions[id];
            if region.is_leaf() {
                if let Some(&m) = region.members.first() {
                    let other = &nodes[m];
                    if let Some(f) = repulsion_between(
                        body.position,
                        body.mass,
                        other.position,
                        other.mass,
                        coefficient,
                    ) {
                        body.displacement += f;
                    }
                }
                continue;
            }
            let distance = (body.position - region.center_of_mass).norm();
            if distance * theta > region.size {
                repel_region(&mut body, region, coefficient);
            } else {
                stack.extend(region.children.iter().rev());
            }
        }
        body.displacement
    }

    pub fn apply_force(&self, nodes: &mut [Node], n: usize, theta: f64, coefficient: f64) {
        let force = self.repulsion_on(nodes, n, theta, coefficient);
        nodes[n].displacement += force;
    }

    /// Barnes-Hut repulsion for every node against this tree.
    ///
    /// Each node only accumulates its own share, so the result does not depend on the order in
    /// which nodes are visited.
    pub fn apply_force_on_nodes(&self, nodes: &mut [Node], theta: f64, coefficient: f64) {
        let forces = self.collect_forces(nodes, theta, coefficient);
        for (n, force) in nodes.iter_mut().zip(forces) {
            n.displacement += force;
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn collect_forces(&self, nodes: &[Node], theta: f64, coefficient: f64) -> Vec<Vector2<f64>> {
        let mut stack = Vec::new();
        (0..nodes.len())
            .map(|n| self.repulsion_on_with(&mut stack, nodes, n, theta, coefficient))
            .collect()
    }

    #[cfg(feature = "parallel")]
    fn collect_forces(&self, nodes: &[Node], theta: f64, coefficient: f64) -> Vec<Vector2<f64>> {
        use rayon::prelude::*;

        (0..nodes.len())
            .into_par_iter()
            .map_init(Vec::new, |stack, n| {
                self.repulsion_on_with(stack, nodes, n, theta, coefficient)
            })
            .collect()
    }
}
