use crate::geometry::RoiExtents;
use anyhow::ensure;
use serde::{Deserialize, Serialize};

/// Smoothing law of the detection radius.
///
/// Each tick the radius moves a weighted step toward one of two attractors:
/// `found_pull` when a threat was in range, `baseline` otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RadiusConfig {
    pub baseline: f64,
    pub found_pull: f64,
    pub found_weight: f64,
    pub relax_weight: f64,
    /// Hard bounds applied after every update.
    pub floor: f64,
    pub ceiling: f64,
}

impl Default for RadiusConfig {
    fn default() -> Self {
        Self {
            baseline: 70.0,
            found_pull: 5.0,
            found_weight: 29.0,
            relax_weight: 59.0,
            floor: 5.0,
            ceiling: 70.0,
        }
    }
}

impl RadiusConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.found_weight >= 0.0, "found_weight must be non-negative");
        ensure!(
            self.relax_weight > self.found_weight,
            "relax_weight ({}) must exceed found_weight ({})",
            self.relax_weight,
            self.found_weight
        );
        ensure!(
            self.found_pull > 0.0 && self.found_pull <= self.baseline,
            "found_pull must lie in (0, baseline]"
        );
        ensure!(
            self.floor <= self.found_pull && self.ceiling >= self.baseline,
            "clamp [{}, {}] must contain [found_pull, baseline]",
            self.floor,
            self.ceiling
        );
        Ok(())
    }
}

/// Exponentially smoothed detection radius, the only state carried across ticks.
#[derive(Debug, Clone)]
pub struct DetectionRadius {
    config: RadiusConfig,
    radius: f64,
}

impl DetectionRadius {
    pub fn new(config: RadiusConfig) -> Self {
        let radius = config.baseline;
        Self { config, radius }
    }

    pub fn with_radius(config: RadiusConfig, radius: f64) -> Self {
        Self { config, radius }
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Applies one tick of the smoothing law and returns the new radius.
    pub fn update(&mut self, threat_found: bool) -> f64 {
        let c = &self.config;
        let next = if threat_found {
            (self.radius * c.found_weight + c.found_pull) / (c.found_weight + 1.0)
        } else {
            (self.radius * c.relax_weight + c.baseline) / (c.relax_weight + 1.0)
        };
        self.radius = next.clamp(c.floor, c.ceiling);
        self.radius
    }

    pub fn contains(&self, dist_sq: f64) -> bool {
        dist_sq < self.radius * self.radius
    }

    /// Square segmentation window reaching one radius from the player on each side.
    pub fn extents(&self) -> RoiExtents {
        RoiExtents::square(self.radius.ceil() as i32)
    }
}
