#![forbid(unsafe_code)]

//! Headless ForceAtlas2 graph layout.
//!
//! `narwhal` computes 2-D coordinates for a weighted graph by simulating repulsion between all
//! nodes (exactly or through a Barnes-Hut region tree), attraction along edges and gravity toward
//! the origin, with an adaptive step size that keeps the simulation convergent.
//!
//! Callers either drive ticks themselves with [`ForceAtlas2`] over a [`Graph`], or use
//! [`layout`] for a complete run over a [`LabeledGraph`].

pub mod algo;
pub mod error;
pub mod graph;
pub mod rng;

pub use algo::barnes_hut::{Region, RegionId, RegionTree, build_region_tree};
pub use algo::forceatlas2::{ForceAtlas2, seed_positions};
pub use algo::forces::{
    apply_attraction, apply_attraction_to_sides, apply_directional_attraction, apply_gravity,
    apply_overlap_repulsion, apply_repulsion,
};
pub use algo::schedule::{ForceRule, ForceSchedule, Importance, IterationWindow};
pub use algo::speed::{Speed, adjust_speed_and_apply_forces};
pub use algo::{AttractionMode, OverlapSettings, Settings};
pub use error::{Error, Result};
pub use graph::{
    Edge, Graph, GraphBuilder, LabeledGraph, LayoutResult, Node, Point, reset_displacements,
};

/// Headless layout entry point: runs `iterations` ticks on a copy of `graph`.
pub fn layout(
    graph: &LabeledGraph,
    settings: &Settings,
    iterations: usize,
) -> Result<LayoutResult> {
    graph.graph.validate()?;
    let mut driver = ForceAtlas2::new(settings.clone())?;

    let mut working = graph.clone();
    seed_positions(&mut working, settings);
    driver.run(&mut working.graph, iterations);

    Ok(working.to_result())
}
