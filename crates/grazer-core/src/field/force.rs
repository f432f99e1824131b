use crate::geometry::{CaptureBox, Rect, Vec2};
use crate::scene::Blob;
use serde::{Deserialize, Serialize};

/// Coefficients of the potential field.
///
/// Coulomb coefficients are signed: positive attracts the player toward the source,
/// negative repels it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForceConfig {
    pub power_coulomb: f64,
    pub bullet_coulomb: f64,
    pub corner_coulomb: f64,
    pub borders: BorderConfig,
    /// Constant magnitude of the pull toward the assist point.
    pub assist_pull: f64,
}

/// Push away from one playfield edge, applied while the player is within `margin` of it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EdgeRepulsion {
    pub margin: f64,
    pub strength: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BorderConfig {
    pub left: EdgeRepulsion,
    pub right: EdgeRepulsion,
    pub top: EdgeRepulsion,
    pub bottom: EdgeRepulsion,
}

impl Default for ForceConfig {
    fn default() -> Self {
        Self {
            power_coulomb: 4000.0,
            bullet_coulomb: -5000.0,
            corner_coulomb: -2000.0,
            borders: BorderConfig::default(),
            assist_pull: 2.0,
        }
    }
}

impl Default for BorderConfig {
    fn default() -> Self {
        // The player sits near the bottom, so that margin is the tightest.
        Self {
            left: EdgeRepulsion { margin: 120.0, strength: 4000.0 },
            right: EdgeRepulsion { margin: 120.0, strength: 4000.0 },
            top: EdgeRepulsion { margin: 200.0, strength: 2000.0 },
            bottom: EdgeRepulsion { margin: 50.0, strength: 2000.0 },
        }
    }
}

/// Everything the field needs from one tick, all in game space.
#[derive(Debug, Clone, Copy)]
pub struct FieldInput<'a> {
    pub player: Vec2,
    /// Center of the matched power-up, if any.
    pub power_up: Option<Vec2>,
    /// Region the blobs were segmented from; their contours are local to it.
    pub blob_roi: Rect,
    pub blobs: &'a [Blob],
    /// Assist target, present only while assist mode is on.
    pub assist: Option<Vec2>,
}

/// The individual contributions to one tick's force.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ForceTerms {
    pub power_up: Vec2,
    pub threats: Vec2,
    pub borders: Vec2,
    pub corners: Vec2,
    pub assist: Vec2,
}

impl ForceTerms {
    pub fn total(&self) -> Vec2 {
        [self.power_up, self.threats, self.borders, self.corners, self.assist]
            .into_iter()
            .sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldReport {
    pub terms: ForceTerms,
    /// Blobs whose nearest contour point lies inside the detection radius.
    pub threats_in_range: usize,
    /// Distance to the closest in-range threat.
    pub nearest_threat: Option<f64>,
}

impl FieldReport {
    pub fn force(&self) -> Vec2 {
        self.terms.total()
    }
}

/// Inverse-square potential field over the playfield.
#[derive(Debug, Clone)]
pub struct ForceModel {
    config: ForceConfig,
    width: f64,
    height: f64,
}

impl ForceModel {
    pub fn new(config: ForceConfig, capture_box: &CaptureBox) -> Self {
        Self {
            config,
            width: capture_box.width(),
            height: capture_box.height(),
        }
    }

    pub fn config(&self) -> &ForceConfig {
        &self.config
    }

    /// Sums every term for this tick. `radius` gates which blobs count as threats.
    pub fn compute(&self, input: &FieldInput<'_>, radius: f64) -> FieldReport {
        let (threats, threats_in_range, nearest_threat) =
            self.threat_term(input.player, input.blob_roi, input.blobs, radius);

        let terms = ForceTerms {
            power_up: input
                .power_up
                .map(|center| self.power_term(input.player, center))
                .unwrap_or_default(),
            threats,
            borders: self.border_term(input.player),
            corners: self.corner_term(input.player),
            assist: input
                .assist
                .map(|target| self.assist_term(input.player, target))
                .unwrap_or_default(),
        };

        FieldReport {
            terms,
            threats_in_range,
            nearest_threat,
        }
    }

    pub fn power_term(&self, player: Vec2, power_center: Vec2) -> Vec2 {
        Vec2::coulomb(power_center, player, self.config.power_coulomb)
    }

    /// Repulsion from every blob whose nearest contour point is inside `radius`.
    /// Returns the summed force, the number of contributing blobs and the closest distance.
    pub fn threat_term(
        &self,
        player: Vec2,
        roi: Rect,
        blobs: &[Blob],
        radius: f64,
    ) -> (Vec2, usize, Option<f64>) {
        let radius_sq = radius * radius;
        let mut force = Vec2::ZERO;
        let mut count = 0;
        let mut nearest: Option<f64> = None;

        for blob in blobs {
            let Some((point, dist_sq)) = blob.nearest_point(roi, player) else {
                continue;
            };
            if dist_sq >= radius_sq {
                continue;
            }
            force += Vec2::coulomb(point, player, self.config.bullet_coulomb);
            count += 1;
            let dist = dist_sq.sqrt();
            if nearest.is_none_or(|d| dist < d) {
                nearest = Some(dist);
            }
        }

        (force, count, nearest)
    }

    /// Inward push from each edge the player is closer to than that edge's margin.
    pub fn border_term(&self, player: Vec2) -> Vec2 {
        let b = &self.config.borders;
        let mut force = Vec2::ZERO;

        let left = player.x;
        if left < b.left.margin {
            force.x += Vec2::coulomb_1d(left, b.left.strength);
        }
        let right = self.width - player.x;
        if right < b.right.margin {
            force.x -= Vec2::coulomb_1d(right, b.right.strength);
        }
        let top = player.y;
        if top < b.top.margin {
            force.y += Vec2::coulomb_1d(top, b.top.strength);
        }
        let bottom = self.height - player.y;
        if bottom < b.bottom.margin {
            force.y -= Vec2::coulomb_1d(bottom, b.bottom.strength);
        }

        force
    }

    /// Unconditional push from all four corners, so no corner is an equilibrium.
    pub fn corner_term(&self, player: Vec2) -> Vec2 {
        let k = self.config.corner_coulomb;
        [
            Vec2::new(0.0, 0.0),
            Vec2::new(self.width, 0.0),
            Vec2::new(0.0, self.height),
            Vec2::new(self.width, self.height),
        ]
        .into_iter()
        .map(|corner| Vec2::coulomb(corner, player, k))
        .sum()
    }

    /// Fixed-magnitude pull toward the assist target; nothing once the player is on it.
    pub fn assist_term(&self, player: Vec2, target: Vec2) -> Vec2 {
        (target - player)
            .normalized()
            .map(|unit| unit * self.config.assist_pull)
            .unwrap_or_default()
    }
}
