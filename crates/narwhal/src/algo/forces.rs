//! Pairwise force kernels and the loops that apply them over a whole graph.
//!
//! Kernels only add to `displacement`; positions are committed later by the speed controller.

use crate::algo::OverlapSettings;
use crate::algo::barnes_hut::Region;
use crate::graph::{Edge, Node};
use nalgebra::Vector2;

/// Repulsion felt by a body at `position` from a body at `other`, or `None` when they coincide.
#[inline]
pub(crate) fn repulsion_between(
    position: Vector2<f64>,
    mass: f64,
    other: Vector2<f64>,
    other_mass: f64,
    coefficient: f64,
) -> Option<Vector2<f64>> {
    let delta = position - other;
    let distance2 = delta.norm_squared();
    if distance2 > 0.0 {
        let factor = coefficient * mass * other_mass / distance2;
        Some(delta * factor)
    } else {
        None
    }
}

pub fn repel(n1: &mut Node, n2: &mut Node, coefficient: f64) {
    if let Some(force) = repulsion_between(n1.position, n1.mass, n2.position, n2.mass, coefficient)
    {
        n1.displacement += force;
        n2.displacement -= force;
    }
}

/// Repels `n` from the aggregate mass of `region`. Only `n` is affected.
pub fn repel_region(n: &mut Node, region: &Region, coefficient: f64) {
    if let Some(force) = repulsion_between(
        n.position,
        n.mass,
        region.center_of_mass,
        region.mass,
        coefficient,
    ) {
        n.displacement += force;
    }
}

pub fn gravity_linear(n: &mut Node, g: f64) {
    let distance = n.position.norm();
    if distance > 0.0 {
        let factor = n.mass * g / distance;
        n.displacement -= n.position * factor;
    }
}

/// Distance-independent pull toward the origin.
///
/// Nodes lying exactly on either axis are left alone.
pub fn gravity_strong(n: &mut Node, g: f64, coefficient: f64) {
    if n.position.x != 0.0 && n.position.y != 0.0 {
        let factor = coefficient * n.mass * g;
        n.displacement -= n.position * factor;
    }
}

pub fn attract(
    n1: &mut Node,
    n2: &mut Node,
    edge_weight: f64,
    distributed: bool,
    coefficient: f64,
) {
    let factor = attraction_factor(n1, edge_weight, distributed, coefficient);
    let force = (n1.position - n2.position) * factor;
    n1.displacement += force;
    n2.displacement -= force;
}

fn attraction_factor(source: &Node, edge_weight: f64, distributed: bool, coefficient: f64) -> f64 {
    if distributed {
        -coefficient * edge_weight / source.mass
    } else {
        -coefficient * edge_weight
    }
}

/// Pulls `left` and `right` toward sitting side by side: `right` to the right of `left`,
/// `x_spacing` apart between their boxes, on the same height.
pub fn attract_sides(
    left: &mut Node,
    right: &mut Node,
    edge_weight: f64,
    distributed: bool,
    coefficient: f64,
    x_spacing: f64,
) {
    let factor = attraction_factor(left, edge_weight, distributed, coefficient);
    let gap = Vector2::new(
        right.position.x - left.position.x - x_spacing - left.width / 2.0 - right.width / 2.0,
        right.position.y - left.position.y,
    );
    let force = gap * factor;
    left.displacement -= force;
    right.displacement += force;
}

/// Pushes `left` and `right` apart along x only, while `right` is not yet `x_spacing` (plus half
/// of both widths) to the right of `left`.
pub fn order_on_x_axis(
    left: &mut Node,
    right: &mut Node,
    edge_weight: f64,
    distributed: bool,
    coefficient: f64,
    x_spacing: f64,
) {
    let spacing = x_spacing + left.width / 2.0 + right.width / 2.0;
    let shortfall = left.position.x + spacing - right.position.x;
    if shortfall > 0.0 {
        let push = shortfall * attraction_factor(left, edge_weight, distributed, coefficient);
        left.displacement.x += push;
        right.displacement.x -= push;
    }
}

fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

fn sigmoid(v: f64) -> f64 {
    1.0 / (1.0 + (-v).exp())
}

/// Pushes apart two sized nodes whose boxes (grown by the configured spacing) overlap.
pub fn overlap_repel(n1: &mut Node, n2: &mut Node, coefficient: f64, overlap: &OverlapSettings) {
    let dx = n1.position.x - n2.position.x;
    let big_x = overlap.x_spacing + overlap.buffer_zone + n1.width / 2.0 + n2.width / 2.0;
    if dx.abs() > big_x {
        return;
    }
    let dy = n1.position.y - n2.position.y;
    let big_y = overlap.y_spacing + overlap.buffer_zone + n1.height / 2.0 + n2.height / 2.0;
    if dy.abs() > big_y {
        return;
    }

    let ox = sign(dx) * big_x - dx;
    let oy = sign(dy) * big_y - dy;
    let factor = coefficient
        * n1.mass
        * n2.mass
        * sigmoid(ox.min(oy) / overlap.buffer_zone / 6.0 + 1.0);
    let force = Vector2::new(sign(ox) * oy.abs(), sign(oy) * ox.abs()) * factor;
    n1.displacement += force;
    n2.displacement -= force;
}

/// Mutable access to two distinct nodes of the same slice.
fn pair_mut(nodes: &mut [Node], i: usize, j: usize) -> (&mut Node, &mut Node) {
    debug_assert_ne!(i, j);
    if i < j {
        let (head, tail) = nodes.split_at_mut(j);
        (&mut head[i], &mut tail[0])
    } else {
        let (head, tail) = nodes.split_at_mut(i);
        (&mut tail[0], &mut head[j])
    }
}

pub fn apply_gravity(
    nodes: &mut [Node],
    gravity: f64,
    scaling_ratio: f64,
    use_strong_gravity: bool,
) {
    if use_strong_gravity {
        for n in nodes {
            gravity_strong(n, gravity, scaling_ratio);
        }
    } else {
        for n in nodes {
            gravity_linear(n, gravity);
        }
    }
}

/// Edge weight raised to `influence`. Influence is almost always 0 or 1; avoid `powf` for those.
fn influenced_weight(weight: f64, influence: f64) -> f64 {
    if influence == 0.0 {
        1.0
    } else if influence == 1.0 {
        weight
    } else {
        weight.powf(influence)
    }
}

pub fn apply_attraction(
    nodes: &mut [Node],
    edges: &[Edge],
    distributed: bool,
    coefficient: f64,
    edge_weight_influence: f64,
) {
    for e in edges {
        if e.node1 == e.node2 {
            continue;
        }
        let (n1, n2) = pair_mut(nodes, e.node1, e.node2);
        let weight = influenced_weight(e.weight, edge_weight_influence);
        attract(n1, n2, weight, distributed, coefficient);
    }
}

/// Endpoints of `e` ordered by node index: `(left, right)`.
fn left_right_mut<'a>(nodes: &'a mut [Node], e: &Edge) -> (&'a mut Node, &'a mut Node) {
    pair_mut(nodes, e.node1.min(e.node2), e.node1.max(e.node2))
}

/// Side-by-side attraction along every edge; the endpoint with the lower index goes left.
pub fn apply_attraction_to_sides(
    nodes: &mut [Node],
    edges: &[Edge],
    distributed: bool,
    coefficient: f64,
    edge_weight_influence: f64,
    x_spacing: f64,
) {
    for e in edges {
        if e.node1 == e.node2 {
            continue;
        }
        let (left, right) = left_right_mut(nodes, e);
        let weight = influenced_weight(e.weight, edge_weight_influence);
        attract_sides(left, right, weight, distributed, coefficient, x_spacing);
    }
}

/// Keeps connected nodes ordered by index along x, `x_spacing` apart.
pub fn apply_directional_attraction(
    nodes: &mut [Node],
    edges: &[Edge],
    distributed: bool,
    coefficient: f64,
    edge_weight_influence: f64,
    x_spacing: f64,
) {
    for e in edges {
        if e.node1 == e.node2 {
            continue;
        }
        let (left, right) = left_right_mut(nodes, e);
        let weight = influenced_weight(e.weight, edge_weight_influence);
        order_on_x_axis(left, right, weight, distributed, coefficient, x_spacing);
    }
}

/// Exact all-pairs repulsion.
pub fn apply_repulsion(nodes: &mut [Node], coefficient: f64) {
    for i in 1..nodes.len() {
        for j in 0..i {
            let (n1, n2) = pair_mut(nodes, i, j);
            repel(n1, n2, coefficient);
        }
    }
}

pub fn apply_overlap_repulsion(nodes: &mut [Node], coefficient: f64, overlap: &OverlapSettings) {
    let max_width = nodes.iter().map(|n| n.width).fold(0.0, f64::max);
    let max_height = nodes.iter().map(|n| n.height).fold(0.0, f64::max);
    let max_dx = max_width + overlap.x_spacing + overlap.buffer_zone;
    let max_dy = max_height + overlap.y_spacing + overlap.buffer_zone;
    for i in 1..nodes.len() {
        for j in 0..i {
            let (n1, n2) = pair_mut(nodes, i, j);
            if (n1.position.x - n2.position.x).abs() < max_dx
                && (n1.position.y - n2.position.y).abs() < max_dy
            {
                overlap_repel(n1, n2, coefficient, overlap);
            }
        }
    }
}
