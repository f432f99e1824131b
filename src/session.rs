//! The tick loop: capture, locate, detect, push, steer.

use crate::config::{PilotConfig, TimingConfig};
use grazer_core::control::MovementReport;
use grazer_core::field::FieldInput;
use grazer_core::{
    CaptureBox, DetectionRadius, ForceModel, KeySink, MemoryReadError, MovementController, OperatorControls,
    PlayerReader, Vec2,
};
use grazer_cv::traits::FrameSource;
use grazer_cv::{Annotator, CaptureError, FrameDetector, OverlayScene, Playfield};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use thiserror::Error;
use tracing::{debug, info, warn};

/// How many playfield sizes a read may stray outside the playfield before it is
/// treated as a torn read.
const PLAUSIBLE_MARGIN: f64 = 1.0;

/// Cooperative stop flag, checked once at the top of every tick.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Why a tick gave up. The loop logs it and carries on with the next tick.
#[derive(Debug, Error)]
pub enum TickError {
    #[error("capture failed: {0}")]
    Capture(#[from] CaptureError),

    #[error("player read failed: {0}")]
    Memory(#[from] MemoryReadError),

    #[error("vision stage failed: {0:#}")]
    Vision(anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct TickReport {
    pub tick: u64,
    /// Game space.
    pub player: Vec2,
    pub power_up: Option<Vec2>,
    pub blobs: usize,
    pub threats_in_range: usize,
    pub nearest_threat: Option<f64>,
    pub force: Vec2,
    /// Radius used this tick, before the update.
    pub radius: f64,
    pub next_radius: f64,
    /// `None` while movement is switched off.
    pub movement: Option<MovementReport>,
    pub overlay: Option<PathBuf>,
}

#[derive(Debug)]
pub enum TickOutcome {
    Completed(TickReport),
    Aborted(TickError),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionSummary {
    pub ticks: u64,
    pub completed: u64,
    pub capture_errors: u64,
    pub memory_errors: u64,
    pub vision_errors: u64,
    pub panics: u64,
    pub final_radius: f64,
}

impl SessionSummary {
    pub fn aborted(&self) -> u64 {
        self.capture_errors + self.memory_errors + self.vision_errors
    }
}

/// One attached run. Owns every collaborator; nothing is global.
pub struct Session<S, R, K> {
    source: S,
    reader: R,
    sink: K,
    capture_box: CaptureBox,
    detector: FrameDetector,
    force: ForceModel,
    radius: DetectionRadius,
    movement: MovementController,
    controls: Arc<OperatorControls>,
    annotator: Annotator,
    timing: TimingConfig,
    movement_was_enabled: bool,
    summary: SessionSummary,
}

impl<S, R, K> Session<S, R, K>
where
    S: FrameSource,
    R: PlayerReader,
    K: KeySink,
{
    pub fn new(
        config: &PilotConfig,
        detector: FrameDetector,
        source: S,
        reader: R,
        sink: K,
        controls: Arc<OperatorControls>,
    ) -> Self {
        let radius = DetectionRadius::new(config.radius.clone());
        Self {
            source,
            reader,
            sink,
            capture_box: config.capture_box,
            detector,
            force: ForceModel::new(config.force.clone(), &config.capture_box),
            movement: MovementController::new(config.movement.clone()),
            controls,
            annotator: Annotator::new(config.detection.visualization.clone()),
            timing: config.timing.clone(),
            movement_was_enabled: false,
            summary: SessionSummary {
                final_radius: radius.radius(),
                ..Default::default()
            },
            radius,
        }
    }

    pub fn radius(&self) -> f64 {
        self.radius.radius()
    }

    pub fn movement(&self) -> &MovementController {
        &self.movement
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn summary(&self) -> &SessionSummary {
        &self.summary
    }

    /// Runs one tick. Errors abort only the rest of this tick.
    pub fn tick(&mut self) -> TickOutcome {
        let tick = self.summary.ticks;
        self.summary.ticks += 1;

        match self.run_tick(tick) {
            Ok(report) => {
                self.summary.completed += 1;
                self.summary.panics = self.movement.panics();
                self.summary.final_radius = report.next_radius;
                TickOutcome::Completed(report)
            }
            Err(err) => {
                match &err {
                    TickError::Capture(_) => self.summary.capture_errors += 1,
                    TickError::Memory(_) => self.summary.memory_errors += 1,
                    TickError::Vision(_) => self.summary.vision_errors += 1,
                }
                TickOutcome::Aborted(err)
            }
        }
    }

    fn run_tick(&mut self, tick: u64) -> Result<TickReport, TickError> {
        let controls = self.controls.snapshot();

        let frame = self.source.capture(self.timing.capture_timeout())?;
        let player = self.capture_box.to_game_space(self.reader.read_player_position()?);
        if !self.capture_box.is_plausible(player, PLAUSIBLE_MARGIN) {
            return Err(MemoryReadError::Implausible {
                x: player.x,
                y: player.y,
            }
            .into());
        }

        let playfield = Playfield::extract(&frame, &self.capture_box).map_err(TickError::Vision)?;
        let radius = self.radius.radius();
        let detections = self
            .detector
            .detect(&playfield, player, self.radius.extents())
            .map_err(TickError::Vision)?;

        let power_up = detections.power_up.map(|m| m.center());
        let field = self.force.compute(
            &FieldInput {
                player,
                power_up,
                blob_roi: detections.blob_roi,
                blobs: &detections.blobs,
                assist: controls.assist_target,
            },
            radius,
        );
        let force = field.force();
        let next_radius = self.radius.update(field.threats_in_range > 0);

        let movement = if controls.movement_enabled {
            Some(self.movement.steer(force, &mut self.sink))
        } else {
            if self.movement_was_enabled {
                info!("movement disabled, releasing keys");
                self.movement.release_all(&mut self.sink);
            }
            None
        };
        self.movement_was_enabled = controls.movement_enabled;

        let overlay = if self.annotator.should_dump(tick) {
            let scene = OverlayScene {
                tick,
                player,
                radius,
                force,
                detections: &detections,
                movement_enabled: controls.movement_enabled,
                assist_target: controls.assist_target,
            };
            match self.annotator.dump(&playfield, &scene) {
                Ok(path) => Some(path),
                Err(err) => {
                    warn!(tick, error = ?err, "overlay dump failed");
                    None
                }
            }
        } else {
            None
        };

        Ok(TickReport {
            tick,
            player,
            power_up,
            blobs: detections.blobs.len(),
            threats_in_range: field.threats_in_range,
            nearest_threat: field.nearest_threat,
            force,
            radius,
            next_radius,
            movement,
            overlay,
        })
    }

    /// Ticks until `stop` is raised or `max_ticks` have run, then releases every key.
    pub fn run(&mut self, stop: &StopSignal, max_ticks: Option<u64>) -> SessionSummary {
        info!(
            capture_box = ?self.capture_box.frame_rect(),
            power_template = self.detector.has_template(),
            "session started"
        );

        while !stop.is_stopped() && max_ticks.map_or(true, |max| self.summary.ticks < max) {
            match self.tick() {
                TickOutcome::Completed(report) => debug!(
                    tick = report.tick,
                    player = %report.player,
                    force = %report.force,
                    threats = report.threats_in_range,
                    radius = report.next_radius,
                    "tick"
                ),
                TickOutcome::Aborted(err) => {
                    warn!(tick = self.summary.ticks - 1, error = %err, "tick aborted")
                }
            }
            thread::sleep(self.timing.tick_interval());
        }

        self.shutdown();
        info!(
            ticks = self.summary.ticks,
            aborted = self.summary.aborted(),
            panics = self.summary.panics,
            "session stopped"
        );
        self.summary.clone()
    }

    /// Leaves no key held.
    pub fn shutdown(&mut self) {
        self.movement.release_all(&mut self.sink);
    }

    pub fn into_parts(self) -> (S, R, K) {
        (self.source, self.reader, self.sink)
    }
}
