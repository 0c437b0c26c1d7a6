//! ForceAtlas2 tick driver.

use crate::algo::{AttractionMode, Settings};
use crate::algo::barnes_hut::RegionTree;
use crate::algo::forces;
use crate::algo::speed::{Speed, adjust_speed_and_apply_forces};
use crate::error::Result;
use crate::graph::{Graph, LabeledGraph, reset_displacements};
use crate::rng::XorShift64Star;
use nalgebra::Vector2;
use std::time::{Duration, Instant};

#[derive(Debug, Default, Clone)]
struct TickTimings {
    region_tree: Duration,
    repulsion: Duration,
    overlap: Duration,
    gravity: Duration,
    attraction: Duration,
    speed: Duration,
}

fn record(slot: Option<&mut Duration>, start: Option<Instant>) {
    if let (Some(slot), Some(start)) = (slot, start) {
        *slot += start.elapsed();
    }
}

/// Runs ForceAtlas2 ticks over a caller-owned [`Graph`].
///
/// The driver only keeps the speed controller state, the outbound attraction compensation and
/// a region-tree arena that is reused between ticks. The compensation is derived from the first
/// graph the driver ticks unless [`ForceAtlas2::prepare`] set it explicitly.
#[derive(Debug, Clone)]
pub struct ForceAtlas2 {
    settings: Settings,
    speed: Speed,
    outbound_compensation: Option<f64>,
    tree: RegionTree,
    timings: Option<TickTimings>,
}

impl ForceAtlas2 {
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            speed: Speed::default(),
            outbound_compensation: None,
            tree: RegionTree::default(),
            timings: None,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn speed(&self) -> Speed {
        self.speed
    }

    pub fn region_tree(&self) -> &RegionTree {
        &self.tree
    }

    /// Derives per-graph constants for `graph`. Ticking a different graph later requires
    /// calling this again.
    pub fn prepare(&mut self, graph: &Graph) {
        self.outbound_compensation = Some(outbound_compensation(&self.settings, graph));
    }

    /// One tick: gravity, attraction, repulsion and overlap repulsion, then the speed
    /// adjustment that commits new positions.
    ///
    /// `iteration` and `iterations` only feed the force schedules.
    pub fn tick(&mut self, graph: &mut Graph, iteration: usize, iterations: usize) {
        let compensation = *self
            .outbound_compensation
            .get_or_insert_with(|| outbound_compensation(&self.settings, graph));
        let settings = &self.settings;
        let schedule = &settings.schedule;
        let timing_enabled = self.timings.is_some();
        let mut timings = self.timings.as_mut();

        reset_displacements(&mut graph.nodes);

        let start = timing_enabled.then(Instant::now);
        let strength = schedule.gravity.strength_at(iteration, iterations);
        if strength > 0.0 {
            forces::apply_gravity(
                &mut graph.nodes,
                settings.gravity * strength,
                settings.scaling_ratio,
                settings.strong_gravity_mode,
            );
        }
        record(timings.as_mut().map(|t| &mut t.gravity), start);

        let start = timing_enabled.then(Instant::now);
        let strength = schedule.attraction.strength_at(iteration, iterations);
        if strength > 0.0 {
            match settings.attraction_mode {
                AttractionMode::Classic => forces::apply_attraction(
                    &mut graph.nodes,
                    &graph.edges,
                    settings.distributed_attraction,
                    compensation * strength,
                    settings.edge_weight_influence,
                ),
                AttractionMode::Sides => forces::apply_attraction_to_sides(
                    &mut graph.nodes,
                    &graph.edges,
                    settings.distributed_attraction,
                    compensation * strength,
                    settings.edge_weight_influence,
                    settings.horizontal_spacing,
                ),
            }
        }
        if settings.attraction_mode == AttractionMode::Sides {
            let strength = schedule.order_on_x_axis.strength_at(iteration, iterations);
            if strength > 0.0 {
                forces::apply_directional_attraction(
                    &mut graph.nodes,
                    &graph.edges,
                    settings.distributed_attraction,
                    strength,
                    settings.edge_weight_influence,
                    settings.horizontal_spacing,
                );
            }
        }
        record(timings.as_mut().map(|t| &mut t.attraction), start);

        let strength = schedule.repulsion.strength_at(iteration, iterations);
        if strength > 0.0 {
            let coefficient = settings.scaling_ratio * strength;
            if settings.barnes_hut {
                let start = timing_enabled.then(Instant::now);
                self.tree.rebuild(&graph.nodes);
                record(timings.as_mut().map(|t| &mut t.region_tree), start);

                let start = timing_enabled.then(Instant::now);
                self.tree
                    .apply_force_on_nodes(&mut graph.nodes, settings.theta, coefficient);
                record(timings.as_mut().map(|t| &mut t.repulsion), start);
            } else {
                let start = timing_enabled.then(Instant::now);
                forces::apply_repulsion(&mut graph.nodes, coefficient);
                record(timings.as_mut().map(|t| &mut t.repulsion), start);
            }
        }

        if let Some(overlap) = &settings.overlap {
            let start = timing_enabled.then(Instant::now);
            let strength = schedule.overlap_repulsion.strength_at(iteration, iterations);
            if strength > 0.0 {
                forces::apply_overlap_repulsion(
                    &mut graph.nodes,
                    settings.scaling_ratio * strength,
                    overlap,
                );
            }
            record(timings.as_mut().map(|t| &mut t.overlap), start);
        }

        let start = timing_enabled.then(Instant::now);
        self.speed =
            adjust_speed_and_apply_forces(&mut graph.nodes, self.speed, settings.jitter_tolerance);
        record(timings.as_mut().map(|t| &mut t.speed), start);

        tracing::trace!(
            iteration,
            speed = self.speed.speed,
            speed_efficiency = self.speed.efficiency,
            "forceatlas2 tick"
        );
    }

    /// Prepares the driver for `graph` and runs `iterations` ticks.
    pub fn run(&mut self, graph: &mut Graph, iterations: usize) {
        let timing_enabled = tracing::enabled!(tracing::Level::DEBUG);
        self.timings = timing_enabled.then(TickTimings::default);
        let total_start = timing_enabled.then(Instant::now);

        self.prepare(graph);
        for iteration in 0..iterations {
            self.tick(graph, iteration, iterations);
        }

        if let (Some(t), Some(s)) = (self.timings.take(), total_start) {
            tracing::debug!(
                total = ?s.elapsed(),
                region_tree = ?t.region_tree,
                repulsion = ?t.repulsion,
                overlap = ?t.overlap,
                gravity = ?t.gravity,
                attraction = ?t.attraction,
                speed = ?t.speed,
                nodes = graph.nodes.len(),
                edges = graph.edges.len(),
                iterations,
                barnes_hut = self.settings.barnes_hut,
                "forceatlas2 layout timings"
            );
        }
    }
}

/// Mean node mass with distributed attraction, otherwise `1.0`.
fn outbound_compensation(settings: &Settings, graph: &Graph) -> f64 {
    if settings.distributed_attraction && !graph.nodes.is_empty() {
        graph.nodes.iter().map(|n| n.mass).sum::<f64>() / graph.nodes.len() as f64
    } else {
        1.0
    }
}

/// Gives every node without an initial position a seeded position in the unit square, then
/// jitters all positions by up to `random_offset` on each axis.
pub fn seed_positions(graph: &mut LabeledGraph, settings: &Settings) {
    let mut rng = XorShift64Star::new(settings.random_seed);
    for (n, &positioned) in graph.graph.nodes.iter_mut().zip(&graph.positioned) {
        if !positioned {
            n.position = Vector2::new(rng.next_f64_unit(), rng.next_f64_unit());
        }
    }
    if settings.random_offset != 0.0 {
        for n in &mut graph.graph.nodes {
            n.position += Vector2::new(rng.next_f64_signed(), rng.next_f64_signed())
                * settings.random_offset;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ForceAtlas2;
    use crate::algo::{AttractionMode, Settings};
    use crate::graph::{Edge, Graph, Node};

    fn weighted_pair() -> Graph {
        Graph::new(
            vec![Node::new(3.0, 0.0, 0.0), Node::new(1.0, 4.0, 1.0)],
            vec![Edge::new(0, 1, 1.0)],
        )
    }

    #[test]
    fn tick_without_prepare_uses_graph_compensation() {
        let settings = Settings {
            distributed_attraction: true,
            barnes_hut: false,
            ..Settings::default()
        };

        let mut prepared = weighted_pair();
        let mut fa2 = ForceAtlas2::new(settings.clone()).unwrap();
        fa2.prepare(&prepared);
        for i in 0..5 {
            fa2.tick(&mut prepared, i, 5);
        }

        let mut lazy = weighted_pair();
        let mut fa2 = ForceAtlas2::new(settings).unwrap();
        for i in 0..5 {
            fa2.tick(&mut lazy, i, 5);
        }

        assert_eq!(prepared.positions(), lazy.positions());
    }

    #[test]
    fn prepare_recomputes_compensation_for_a_new_graph() {
        let settings = Settings {
            distributed_attraction: true,
            ..Settings::default()
        };
        let mut fa2 = ForceAtlas2::new(settings).unwrap();
        fa2.prepare(&weighted_pair());
        assert_eq!(fa2.outbound_compensation, Some(2.0));
        fa2.prepare(&Graph::new(vec![Node::new(5.0, 0.0, 0.0)], Vec::new()));
        assert_eq!(fa2.outbound_compensation, Some(5.0));
    }

    #[test]
    fn sides_mode_orders_connected_nodes_by_index() {
        // A path whose nodes start in reverse x order.
        let nodes = (0..4).map(|i| Node::new(2.0, 30.0 - 10.0 * i as f64, i as f64)).collect();
        let edges = (1..4).map(|i| Edge::new(i - 1, i, 1.0)).collect();
        let mut g = Graph::new(nodes, edges);
        let mut fa2 = ForceAtlas2::new(Settings {
            attraction_mode: AttractionMode::Sides,
            horizontal_spacing: 5.0,
            gravity: 0.0,
            ..Settings::default()
        })
        .unwrap();
        fa2.run(&mut g, 300);

        for pair in g.nodes.windows(2) {
            assert!(
                pair[0].position.x < pair[1].position.x,
                "positions: {:?}",
                g.positions()
            );
        }
    }
}
