pub mod barnes_hut;
pub mod forceatlas2;
pub mod forces;
pub mod schedule;
pub mod speed;

use crate::error::{Error, Result};
use schedule::ForceSchedule;
use serde::{Deserialize, Serialize};

/// Tunables read by the [`forceatlas2::ForceAtlas2`] driver on every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Pull toward the origin.
    pub gravity: f64,
    /// Repulsion multiplier; also scales strong gravity.
    pub scaling_ratio: f64,
    /// Distance-independent gravity instead of the linear pull.
    pub strong_gravity_mode: bool,
    /// Use the Barnes-Hut region tree for repulsion instead of the exact all-pairs loop.
    pub barnes_hut: bool,
    /// Barnes-Hut accuracy threshold: smaller is more exact and slower.
    pub theta: f64,
    /// How much swinging the speed controller tolerates before slowing down.
    pub jitter_tolerance: f64,
    /// Divide attraction by the source node's mass ("dissuade hubs").
    pub distributed_attraction: bool,
    pub attraction_mode: AttractionMode,
    /// Gap kept between the boxes of connected nodes in [`AttractionMode::Sides`].
    pub horizontal_spacing: f64,
    /// Exponent applied to edge weights before attraction.
    pub edge_weight_influence: f64,
    /// Seed for placing nodes that have no initial position.
    pub random_seed: u64,
    /// Uniform jitter applied to every initial position, in layout units.
    pub random_offset: f64,
    /// Keep sized nodes from overlapping.
    pub overlap: Option<OverlapSettings>,
    pub schedule: ForceSchedule,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gravity: 1.0,
            scaling_ratio: 2.0,
            strong_gravity_mode: false,
            barnes_hut: true,
            theta: 1.2,
            jitter_tolerance: 1.0,
            distributed_attraction: false,
            attraction_mode: AttractionMode::Classic,
            horizontal_spacing: 50.0,
            edge_weight_influence: 1.0,
            random_seed: 0,
            random_offset: 0.0,
            overlap: None,
            schedule: ForceSchedule::default(),
        }
    }
}

impl Settings {
    pub fn from_json(text: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        fn check(name: &'static str, value: f64, ok: bool) -> Result<()> {
            if value.is_finite() && ok {
                Ok(())
            } else {
                Err(Error::InvalidSetting { name, value })
            }
        }

        check("gravity", self.gravity, true)?;
        check("scalingRatio", self.scaling_ratio, self.scaling_ratio >= 0.0)?;
        check("theta", self.theta, self.theta >= 0.0)?;
        check(
            "jitterTolerance",
            self.jitter_tolerance,
            self.jitter_tolerance > 0.0,
        )?;
        check("edgeWeightInfluence", self.edge_weight_influence, true)?;
        check("horizontalSpacing", self.horizontal_spacing, true)?;
        check("randomOffset", self.random_offset, self.random_offset >= 0.0)?;
        for rule in [
            &self.schedule.repulsion,
            &self.schedule.overlap_repulsion,
            &self.schedule.gravity,
            &self.schedule.attraction,
            &self.schedule.order_on_x_axis,
        ] {
            check("schedule.strength", rule.strength, true)?;
            check("schedule.curve", rule.curve, true)?;
        }
        if let Some(overlap) = &self.overlap {
            check("overlap.xSpacing", overlap.x_spacing, true)?;
            check("overlap.ySpacing", overlap.y_spacing, true)?;
            check(
                "overlap.bufferZone",
                overlap.buffer_zone,
                overlap.buffer_zone > 0.0,
            )?;
        }
        Ok(())
    }
}

/// How edges pull their endpoints together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttractionMode {
    /// Linear spring between the two centers.
    #[default]
    Classic,
    /// Pull the higher-index endpoint to the right of the lower-index one, `horizontal_spacing`
    /// apart, and keep connected nodes ordered by index along x.
    Sides,
}

/// Spacing kept between sized nodes by overlap repulsion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OverlapSettings {
    pub x_spacing: f64,
    pub y_spacing: f64,
    /// Soft margin over which the push ramps up; must be positive.
    pub buffer_zone: f64,
}

impl Default for OverlapSettings {
    fn default() -> Self {
        Self {
            x_spacing: 50.0,
            y_spacing: 0.0,
            buffer_zone: 50.0,
        }
    }
}
