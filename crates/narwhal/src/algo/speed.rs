//! Adaptive step-size controller and position commit.

use crate::graph::Node;

const MIN_SPEED_EFFICIENCY: f64 = 0.05;
const MAX_JITTER_TOLERANCE: f64 = 10.0;
/// Largest relative increase of `speed` within one tick.
const MAX_RISE: f64 = 0.5;
const OSCILLATION_RATIO: f64 = 2.0;

/// Controller state threaded from one tick into the next.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Speed {
    pub speed: f64,
    pub efficiency: f64,
}

impl Default for Speed {
    fn default() -> Self {
        Self {
            speed: 1.0,
            efficiency: 1.0,
        }
    }
}

/// Tunes the global speed from the total swinging and traction of the current tick, then moves
/// every node by its displacement scaled by the new speed.
///
/// Nodes that swing a lot individually are damped further:
/// `factor = speed / (1 + sqrt(speed * swinging))`.
pub fn adjust_speed_and_apply_forces(
    nodes: &mut [Node],
    state: Speed,
    jitter_tolerance: f64,
) -> Speed {
    if nodes.is_empty() {
        return state;
    }
    let Speed {
        mut speed,
        efficiency: mut speed_efficiency,
    } = state;

    let mut total_swinging = 0.0;
    let mut total_effective_traction = 0.0;
    for n in nodes.iter() {
        total_swinging += n.swinging();
        total_effective_traction += n.effective_traction();
    }

    // Bigger graphs need more tolerance, denser ones less. Empirical.
    let node_count = nodes.len() as f64;
    let estimated_optimal = 0.05 * node_count.sqrt();
    let min_jt = estimated_optimal.sqrt();
    let mut jt = jitter_tolerance
        * min_jt.max(
            MAX_JITTER_TOLERANCE
                .min(estimated_optimal * total_effective_traction / (node_count * node_count)),
        );

    if total_effective_traction != 0.0
        && total_swinging / total_effective_traction > OSCILLATION_RATIO
    {
        if speed_efficiency > MIN_SPEED_EFFICIENCY {
            speed_efficiency *= 0.5;
        }
        jt = jt.max(jitter_tolerance);
    }

    let target_speed = if total_swinging == 0.0 {
        f64::INFINITY
    } else {
        jt * speed_efficiency * total_effective_traction / total_swinging
    };

    if total_swinging > jt * total_effective_traction {
        if speed_efficiency > MIN_SPEED_EFFICIENCY {
            speed_efficiency *= 0.7;
        }
    } else if speed < 1000.0 {
        speed_efficiency *= 1.3;
    }

    speed += (target_speed - speed).min(MAX_RISE * speed);

    for n in nodes.iter_mut() {
        let factor = speed / (1.0 + (speed * n.swinging()).sqrt());
        n.position += n.displacement * factor;
    }

    Speed {
        speed,
        efficiency: speed_efficiency,
    }
}
