//! Pilot configuration, loaded once at startup

use anyhow::{ensure, Context, Result};
use grazer_core::player::{builtin_profiles, find_profile};
use grazer_core::{CaptureBox, ForceConfig, GameProfile, KeyBindings, MovementConfig, RadiusConfig};
use grazer_cv::DetectionConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Minimum pause between two ticks.
    pub tick_interval_ms: u64,
    /// How long one tick waits for a frame before giving up.
    pub capture_timeout_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1,
            capture_timeout_ms: 1000,
        }
    }
}

impl TimingConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_millis(self.capture_timeout_ms)
    }
}

/// Everything tunable about one run. Missing JSON fields keep their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PilotConfig {
    /// Id of the entry in `games` to attach to.
    pub game: String,
    pub capture_box: CaptureBox,
    pub timing: TimingConfig,
    pub force: ForceConfig,
    pub radius: RadiusConfig,
    pub movement: MovementConfig,
    pub keys: KeyBindings,
    pub detection: DetectionConfig,
    pub games: Vec<GameProfile>,
}

impl Default for PilotConfig {
    fn default() -> Self {
        Self {
            game: "th10".to_string(),
            capture_box: CaptureBox::default(),
            timing: TimingConfig::default(),
            force: ForceConfig::default(),
            radius: RadiusConfig::default(),
            movement: MovementConfig::default(),
            keys: KeyBindings::default(),
            detection: DetectionConfig::default(),
            games: builtin_profiles(),
        }
    }
}

impl PilotConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }

    /// Defaults when no path is given.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize config")
    }

    /// The selected game's memory layout.
    pub fn profile(&self) -> Result<&GameProfile> {
        find_profile(&self.games, &self.game).with_context(|| {
            let known: Vec<&str> = self.games.iter().map(|g| g.id.as_str()).collect();
            format!("unknown game '{}' (known: {})", self.game, known.join(", "))
        })
    }

    pub fn validate(&self) -> Result<()> {
        let frame_rect = self.capture_box.frame_rect();
        ensure!(!frame_rect.is_empty(), "capture box {:?} is empty", frame_rect);
        ensure!(
            frame_rect.x >= 0 && frame_rect.y >= 0,
            "capture box {:?} starts off-frame",
            frame_rect
        );
        ensure!(self.timing.capture_timeout_ms > 0, "capture timeout must be positive");

        self.radius.validate().context("invalid radius config")?;
        self.movement.validate().context("invalid movement config")?;
        self.detection.validate().context("invalid detection config")?;
        self.profile()?;
        Ok(())
    }
}
