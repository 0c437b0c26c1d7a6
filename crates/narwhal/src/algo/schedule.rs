//! Per-force strength schedules over the course of a layout run.

use crate::error::Error;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a force's strength evolves across its iteration window.
///
/// Serializes as the lowercase variant name. Parsing is case-insensitive and accepts the usual
/// synonyms (`"on"`, `"off"`, `"dec"`, `"mirror"`, `"1"`, ...), booleans and the integers `0`/`1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    Disabled,
    #[default]
    Constant,
    Increasing,
    Decreasing,
    /// Peaks halfway through the window.
    Middle,
    /// Strongest at both ends of the window.
    Outsides,
}

impl FromStr for Importance {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let importance = match s.trim().to_ascii_lowercase().as_str() {
            "disabled" | "disable" | "never" | "off" | "none" | "zero" | "0" | "x"
            | "deactivated" | "inactive" | "no" => Self::Disabled,
            "constant" | "enabled" | "enable" | "always" | "active" | "activated" | "1" | "on"
            | "one" | "yes" => Self::Constant,
            "increasing" | "increase" | "inc" | "+" | "more" | "up" => Self::Increasing,
            "decreasing" | "decrease" | "dec" | "-" | "less" | "down" => Self::Decreasing,
            "middle" | "mid" | "midway" | "half" | "center" | "mirror" | "mirrored" => Self::Middle,
            "outsides" | "outside" | "antimirror" => Self::Outsides,
            _ => {
                return Err(Error::UnknownImportance {
                    value: s.to_string(),
                });
            }
        };
        Ok(importance)
    }
}

struct ImportanceVisitor;

impl Visitor<'_> for ImportanceVisitor {
    type Value = Importance;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a force importance such as \"constant\" or \"decreasing\"")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Importance, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Importance, E> {
        Ok(if v {
            Importance::Constant
        } else {
            Importance::Disabled
        })
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Importance, E> {
        match v {
            0 => Ok(Importance::Disabled),
            1 => Ok(Importance::Constant),
            _ => Err(E::invalid_value(de::Unexpected::Unsigned(v), &self)),
        }
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Importance, E> {
        match u64::try_from(v) {
            Ok(v) => self.visit_u64(v),
            Err(_) => Err(E::invalid_value(de::Unexpected::Signed(v), &self)),
        }
    }
}

impl<'de> Deserialize<'de> for Importance {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ImportanceVisitor)
    }
}

/// Half-open iteration window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationWindow {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ForceRule {
    pub importance: Importance,
    pub strength: f64,
    /// Exponential curve factor: `0` is linear, larger values bend the ramp harder.
    pub curve: f64,
    /// Iterations in which the force is active; `None` means the whole run.
    pub within: Option<IterationWindow>,
}

impl Default for ForceRule {
    fn default() -> Self {
        Self {
            importance: Importance::Constant,
            strength: 1.0,
            curve: 0.0,
            within: None,
        }
    }
}

impl ForceRule {
    pub fn constant(strength: f64) -> Self {
        Self {
            strength,
            ..Self::default()
        }
    }

    pub fn disabled() -> Self {
        Self {
            importance: Importance::Disabled,
            ..Self::default()
        }
    }

    /// Strength to use at `iteration` of a run with `iterations` ticks.
    pub fn strength_at(&self, iteration: usize, iterations: usize) -> f64 {
        let window = self.within.unwrap_or(IterationWindow {
            start: 0,
            end: iterations,
        });
        if window.end <= window.start || !(window.start..window.end).contains(&iteration) {
            return 0.0;
        }
        let last = window.end - 1;
        let progress = (last > window.start)
            .then(|| (iteration - window.start) as f64 / (last - window.start) as f64);

        let x = match (self.importance, progress) {
            (Importance::Disabled, _) => return 0.0,
            (Importance::Constant, _) | (_, None) => return self.strength,
            (Importance::Increasing, Some(x)) => x,
            (Importance::Decreasing, Some(x)) => 1.0 - x,
            (Importance::Middle, Some(x)) => x.min(1.0 - x) * 2.0,
            (Importance::Outsides, Some(x)) => (x - 0.5).max(0.5 - x) * 2.0,
        };
        self.strength * exponential_curve(x, self.curve)
    }
}

/// Maps `[0, 1]` onto `[0, 1]`; linear for `factor == 0`, convex for positive factors.
pub fn exponential_curve(x: f64, factor: f64) -> f64 {
    if factor == 0.0 {
        return x;
    }
    let e = std::f64::consts::E;
    ((factor * x).exp() / e - 1.0 / e) / (factor.exp() / e - 1.0 / e)
}

/// Strength schedule for each force of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ForceSchedule {
    pub repulsion: ForceRule,
    pub overlap_repulsion: ForceRule,
    pub gravity: ForceRule,
    pub attraction: ForceRule,
    /// Directional push that keeps connected nodes ordered by index along x. Only used with
    /// [`crate::algo::AttractionMode::Sides`].
    pub order_on_x_axis: ForceRule,
}
