// tests/core_tests.rs
use grazer::sim::{power_icon, SimConfig, SimFrameSource, SimKeySink, SimMemory, Simulation};
use grazer::{PilotConfig, Session, StopSignal, TickOutcome};
use grazer_core::control::KeyCommand;
use grazer_core::field::FieldInput;
use grazer_core::{
    CaptureBox, DetectionRadius, ForceConfig, ForceModel, Key, MovementConfig, MovementController,
    OperatorControls, PointerChainReader, RadiusConfig, Rect, Vec2,
};
use grazer_cv::{DetectionConfig, Frame, FrameDetector, Playfield, TemplateLoader};
use std::sync::Arc;

const FRAME_W: u32 = 448;
const FRAME_H: u32 = 480;

/// Dark frame with white squares given in game space as (x, y, side).
fn frame_with_squares(capture_box: &CaptureBox, squares: &[(i32, i32, i32)]) -> Frame {
    let mut data = vec![0u8; (FRAME_W * FRAME_H * 4) as usize];
    let origin = capture_box.frame_rect().origin();
    for &(gx, gy, side) in squares {
        for y in gy..gy + side {
            for x in gx..gx + side {
                let (fx, fy) = ((x + origin.x) as u32, (y + origin.y) as u32);
                let i = ((fy * FRAME_W + fx) * 4) as usize;
                data[i..i + 4].copy_from_slice(&[255, 255, 255, 255]);
            }
        }
    }
    Frame::from_bgra(FRAME_W, FRAME_H, data).unwrap()
}

#[test]
fn test_blob_at_thirty_pixels_repels_toward_player() {
    let cbox = CaptureBox::default();
    let player = Vec2::new(100.0, 100.0);
    // After the blur only the inner 5x5 survives; its nearest point is (130, 100).
    let frame = frame_with_squares(&cbox, &[(129, 97, 7)]);
    let playfield = Playfield::extract(&frame, &cbox).unwrap();

    let radius = DetectionRadius::new(RadiusConfig::default());
    let detector = FrameDetector::new(&DetectionConfig::default(), None);
    let found = detector.detect(&playfield, player, radius.extents()).unwrap();
    assert_eq!(found.blobs.len(), 1);

    let model = ForceModel::new(ForceConfig::default(), &cbox);
    let (threat, count, nearest) = model.threat_term(player, found.blob_roi, &found.blobs, radius.radius());
    assert_eq!(count, 1);
    assert!((nearest.unwrap() - 30.0).abs() < 1e-9);
    assert!((threat.length() - 5000.0 / 900.0).abs() < 1e-9);
    assert!(threat.x < 0.0);
    assert!(threat.y.abs() < 1e-12);
}

#[test]
fn test_left_edge_pushes_right_without_top_push() {
    let cbox = CaptureBox::default();
    let model = ForceModel::new(ForceConfig::default(), &cbox);
    let border = model.border_term(Vec2::new(5.0, 200.0));
    assert!(border.x > 0.0);
    assert_eq!(border.y, 0.0);
}

#[test]
fn test_large_force_bombs_once_per_tick() {
    let mut controller = MovementController::new(MovementConfig {
        panic_delay_ms: 0,
        ..Default::default()
    });
    let mut sink: Vec<KeyCommand> = Vec::new();
    controller.steer(Vec2::new(4000.0, 0.0), &mut sink);

    let bombs = sink.iter().filter(|c| c.key == Key::Bomb && c.pressed).count();
    assert_eq!(bombs, 1);
    assert_eq!(controller.panics(), 1);
}

#[test]
fn test_net_force_ignores_term_order() {
    let cbox = CaptureBox::default();
    let model = ForceModel::new(ForceConfig::default(), &cbox);
    let frame = frame_with_squares(&cbox, &[(60, 300, 7), (120, 330, 7)]);
    let playfield = Playfield::extract(&frame, &cbox).unwrap();
    let player = Vec2::new(90.0, 320.0);
    let found = FrameDetector::new(&DetectionConfig::default(), None)
        .detect(&playfield, player, DetectionRadius::new(RadiusConfig::default()).extents())
        .unwrap();

    let report = model.compute(
        &FieldInput {
            player,
            power_up: Some(Vec2::new(200.0, 100.0)),
            blob_roi: found.blob_roi,
            blobs: &found.blobs,
            assist: Some(Vec2::new(10.0, 10.0)),
        },
        70.0,
    );
    let t = report.terms;
    let reversed = t.assist + t.corners + t.borders + t.threats + t.power_up;
    assert!((report.force() - reversed).length() < 1e-9);
    assert_eq!(report.threats_in_range, 2);
}

type SimSession = Session<SimFrameSource, PointerChainReader<SimMemory>, SimKeySink>;

fn sim_session(
    config: &PilotConfig,
    sim_config: SimConfig,
    controls: Arc<OperatorControls>,
) -> (Simulation, SimSession) {
    let profile = config.profile().unwrap().clone();
    let sim = Simulation::new(sim_config, config.capture_box, profile.clone());
    let template = TemplateLoader::from_gray("power", &power_icon()).unwrap();
    let session = Session::new(
        config,
        FrameDetector::new(&config.detection, Some(template)),
        sim.frame_source(),
        PointerChainReader::new(sim.memory(), profile),
        sim.key_sink(),
        controls,
    );
    (sim, session)
}

fn fast_config() -> PilotConfig {
    let mut config = PilotConfig::default();
    config.timing.tick_interval_ms = 0;
    config.movement.panic_delay_ms = 0;
    config
}

#[test]
fn test_simulated_run_completes_every_tick() {
    let config = fast_config();
    let (sim, mut session) = sim_session(&config, SimConfig::default(), Arc::new(OperatorControls::default()));

    let summary = session.run(&StopSignal::new(), Some(40));
    assert_eq!(summary.ticks, 40);
    assert_eq!(summary.completed, 40);
    assert!(summary.final_radius >= 5.0 && summary.final_radius <= 70.0);
    assert_eq!(sim.stats().frames, 40);
    // Stopping leaves nothing held.
    assert!(Key::ALL.iter().all(|&k| !sim.with_world(|w| w.is_held(k))));
}

#[test]
fn test_dropped_frames_abort_only_their_tick() {
    let config = fast_config();
    let sim_config = SimConfig {
        drop_every: 5,
        ..Default::default()
    };
    let (_sim, mut session) = sim_session(&config, sim_config, Arc::new(OperatorControls::default()));

    let summary = session.run(&StopSignal::new(), Some(20));
    assert_eq!(summary.capture_errors, 4);
    assert_eq!(summary.completed, 16);
}

#[test]
fn test_position_bias_round_trips_through_session() {
    let mut config = fast_config();
    config.game = "th15".to_string();
    let quiet = SimConfig {
        bullets: 0,
        power_up_interval: u64::MAX,
        ..Default::default()
    };
    let controls = Arc::new(OperatorControls::new(false));
    let (sim, mut session) = sim_session(&config, quiet, controls);
    sim.with_world(|w| w.set_player(Vec2::new(150.0, 250.0)));

    match session.tick() {
        TickOutcome::Completed(report) => assert_eq!(report.player, Vec2::new(150.0, 250.0)),
        TickOutcome::Aborted(err) => panic!("tick aborted: {err}"),
    }
}

#[test]
fn test_assist_point_pulls_player() {
    let config = fast_config();
    let quiet = SimConfig {
        bullets: 0,
        power_up_interval: u64::MAX,
        ..Default::default()
    };
    let controls = Arc::new(OperatorControls::default());
    let (sim, mut session) = sim_session(&config, quiet, Arc::clone(&controls));
    // Middle of the playfield, where corners cancel.
    sim.with_world(|w| w.set_player(Vec2::new(192.0, 224.0)));
    controls.set_assist_point(Some(Vec2::new(192.0, 100.0)));
    controls.set_assist(true);

    let TickOutcome::Completed(report) = session.tick() else {
        panic!("tick should complete");
    };
    assert!(report.force.y < 0.0);
    assert!(sim.with_world(|w| w.is_held(Key::Up)));
}

#[test]
fn test_config_file_drives_capture_box() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pilot.json");
    std::fs::write(&path, r#"{ "capture_box": { "x": 16, "y": 8, "width": 384, "height": 448 } }"#).unwrap();

    let config = PilotConfig::load(&path).unwrap();
    config.validate().unwrap();
    assert_eq!(config.capture_box.frame_rect(), Rect::new(16, 8, 384, 448));
}
