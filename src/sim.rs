//! Offline stand-in for the game: renders frames, serves the player position
//! through the profile's memory layout and reacts to key presses.

use grazer_core::player::PositionLocation;
use grazer_core::control::ScanCodeSink;
use grazer_core::{CaptureBox, GameProfile, Key, KeyBindings, MemoryReadError, ProcessMemory, Vec2};
use grazer_cv::traits::FrameSource;
use grazer_cv::utils::ImageUtils;
use grazer_cv::{CaptureError, DetectionConfig, Frame, FrameDetector, TemplateLoader};
use image::{GrayImage, Luma};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

/// Where the simulated player struct lives for pointer layouts.
const PLAYER_STRUCT: u32 = 0x0100_0000;
const ICON_SIZE: u32 = 12;
const BULLET_SIZE: i32 = 7;
const BACKGROUND: u8 = 24;
/// Dimmer than the bullet cutoff so the player never segments as a threat.
const PLAYER_SHADE: u8 = 150;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub seed: u64,
    pub frame_width: u32,
    pub frame_height: u32,
    pub bullets: usize,
    pub bullet_speed: (f64, f64),
    /// Pixels per tick while a direction key is held.
    pub player_speed: f64,
    /// A new power-up appears this many ticks after the last one left.
    pub power_up_interval: u64,
    /// Fail every n-th capture with a timeout; 0 never fails.
    pub drop_every: u64,
    /// Scan codes the simulated game listens for.
    pub keys: KeyBindings,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 7,
            frame_width: 448,
            frame_height: 480,
            bullets: 24,
            bullet_speed: (0.5, 2.5),
            player_speed: 3.0,
            power_up_interval: 120,
            drop_every: 0,
            keys: KeyBindings::default(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Bullet {
    pos: Vec2,
    vel: Vec2,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SimStats {
    pub frames: u64,
    pub dropped_frames: u64,
    pub hits: u64,
    pub bombs: u64,
    pub power_ups: u64,
}

/// The simulated playfield, in game space.
pub struct SimWorld {
    config: SimConfig,
    capture_box: CaptureBox,
    profile: GameProfile,
    rng: StdRng,
    player: Vec2,
    bullets: Vec<Bullet>,
    power_up: Option<Vec2>,
    power_up_timer: u64,
    held: [bool; 6],
    icon: GrayImage,
    stats: SimStats,
}

/// Grayscale power-up icon; the renderer draws exactly these values.
pub fn power_icon() -> GrayImage {
    GrayImage::from_fn(ICON_SIZE, ICON_SIZE, |x, y| {
        let edge = x == 0 || y == 0 || x == ICON_SIZE - 1 || y == ICON_SIZE - 1;
        if edge {
            Luma([200])
        } else if (x / 3 + y / 3) % 2 == 0 {
            Luma([170])
        } else {
            Luma([70])
        }
    })
}

fn key_index(key: Key) -> usize {
    match key {
        Key::Left => 0,
        Key::Right => 1,
        Key::Up => 2,
        Key::Down => 3,
        Key::Shoot => 4,
        Key::Bomb => 5,
    }
}

impl SimWorld {
    pub fn new(config: SimConfig, capture_box: CaptureBox, profile: GameProfile) -> Self {
        let mut world = Self {
            rng: StdRng::seed_from_u64(config.seed),
            player: Vec2::new(capture_box.width() / 2.0, capture_box.height() - 40.0),
            bullets: Vec::new(),
            power_up: None,
            power_up_timer: 0,
            held: [false; 6],
            icon: power_icon(),
            stats: SimStats::default(),
            config,
            capture_box,
            profile,
        };
        for _ in 0..world.config.bullets {
            let bullet = world.spawn_bullet(true);
            world.bullets.push(bullet);
        }
        world
    }

    pub fn player(&self) -> Vec2 {
        self.player
    }

    pub fn set_player(&mut self, player: Vec2) {
        self.player = player;
    }

    pub fn stats(&self) -> SimStats {
        self.stats
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held[key_index(key)]
    }

    pub fn icon(&self) -> &GrayImage {
        &self.icon
    }

    /// Replaces the power-up sprite drawn from now on.
    pub fn set_icon(&mut self, icon: GrayImage) {
        self.icon = icon;
    }

    /// Applies one keyboard event. Codes the game does not bind are ignored.
    pub fn key_event(&mut self, code: u16, pressed: bool) {
        let Some(key) = self.config.keys.key_for(code) else {
            debug!(code, "unbound scan code");
            return;
        };
        let was_held = self.held[key_index(key)];
        self.held[key_index(key)] = pressed;
        if pressed && key == Key::Bomb && !was_held {
            self.bomb();
        }
    }

    fn spawn_bullet(&mut self, anywhere: bool) -> Bullet {
        let (w, h) = (self.capture_box.width(), self.capture_box.height());
        let y = if anywhere {
            self.rng.gen_range(0.0..h * 0.6)
        } else {
            0.0
        };
        let speed = self.rng.gen_range(self.config.bullet_speed.0..=self.config.bullet_speed.1);
        let drift = self.rng.gen_range(-0.5..=0.5);
        Bullet {
            pos: Vec2::new(self.rng.gen_range(0.0..w), y),
            vel: Vec2::new(drift, 1.0) * speed,
        }
    }

    /// Advances one tick.
    pub fn step(&mut self) {
        let mut dir = Vec2::ZERO;
        if self.is_held(Key::Left) {
            dir.x -= 1.0;
        }
        if self.is_held(Key::Right) {
            dir.x += 1.0;
        }
        if self.is_held(Key::Up) {
            dir.y -= 1.0;
        }
        if self.is_held(Key::Down) {
            dir.y += 1.0;
        }
        let moved = self.player + dir * self.config.player_speed;
        self.player = Vec2::new(
            moved.x.clamp(0.0, self.capture_box.width() - 1.0),
            moved.y.clamp(0.0, self.capture_box.height() - 1.0),
        );

        let (w, h) = (self.capture_box.width(), self.capture_box.height());
        for i in 0..self.bullets.len() {
            let mut bullet = self.bullets[i];
            bullet.pos += bullet.vel;
            if bullet.pos.y > h || bullet.pos.x < 0.0 || bullet.pos.x > w {
                bullet = self.spawn_bullet(false);
            } else if bullet.pos.distance_sq(self.player) < 9.0 {
                self.stats.hits += 1;
                bullet = self.spawn_bullet(false);
            }
            self.bullets[i] = bullet;
        }

        match self.power_up {
            Some(pos) if pos.distance_sq(self.player) < 100.0 => {
                self.stats.power_ups += 1;
                self.power_up = None;
                self.power_up_timer = 0;
            }
            Some(pos) if pos.y > h => self.power_up = None,
            Some(pos) => self.power_up = Some(pos + Vec2::new(0.0, 0.5)),
            None => {
                self.power_up_timer += 1;
                if self.power_up_timer >= self.config.power_up_interval {
                    self.power_up_timer = 0;
                    let x = self.rng.gen_range(20.0..w - 20.0);
                    self.power_up = Some(Vec2::new(x, h * 0.3));
                }
            }
        }

        self.stats.frames += 1;
    }

    fn bomb(&mut self) {
        self.stats.bombs += 1;
        let respawned: Vec<Bullet> = (0..self.bullets.len()).map(|_| self.spawn_bullet(false)).collect();
        self.bullets = respawned;
        debug!(bombs = self.stats.bombs, "bomb cleared the screen");
    }

    /// Renders the whole frame, BGRA, with the playfield at the capture box.
    pub fn render(&self) -> Result<Frame, CaptureError> {
        let (fw, fh) = (self.config.frame_width as i32, self.config.frame_height as i32);
        let origin = self.capture_box.frame_rect().origin();
        let mut data = vec![0u8; (fw * fh * 4) as usize];
        for px in data.chunks_exact_mut(4) {
            px.copy_from_slice(&[BACKGROUND, BACKGROUND, BACKGROUND, 255]);
        }

        let mut put = |gx: i32, gy: i32, v: u8| {
            let (x, y) = (gx + origin.x, gy + origin.y);
            if x >= 0 && y >= 0 && x < fw && y < fh {
                let i = ((y * fw + x) * 4) as usize;
                data[i..i + 4].copy_from_slice(&[v, v, v, 255]);
            }
        };

        let p = self.player;
        for dy in -2..=2 {
            for dx in -2..=2 {
                put(p.x as i32 + dx, p.y as i32 + dy, PLAYER_SHADE);
            }
        }

        if let Some(pos) = self.power_up {
            let (hw, hh) = (self.icon.width() as i32 / 2, self.icon.height() as i32 / 2);
            for (x, y, px) in self.icon.enumerate_pixels() {
                put(pos.x as i32 - hw + x as i32, pos.y as i32 - hh + y as i32, px.0[0]);
            }
        }

        let half = BULLET_SIZE / 2;
        for bullet in &self.bullets {
            for dy in -half..=half {
                for dx in -half..=half {
                    put(bullet.pos.x as i32 + dx, bullet.pos.y as i32 + dy, 255);
                }
            }
        }

        Frame::from_bgra(self.config.frame_width, self.config.frame_height, data)
    }

    /// Bytes the game would hold at `address`, if it maps to the position layout.
    fn read(&self, address: u64, buf: &mut [u8]) -> Result<(), MemoryReadError> {
        let frame_pos = self.capture_box.to_frame_space(self.player) - self.profile.position_bias;
        let mut pair = [0u8; 8];
        pair[..4].copy_from_slice(&(frame_pos.x as f32).to_le_bytes());
        pair[4..].copy_from_slice(&(frame_pos.y as f32).to_le_bytes());

        let mut regions: Vec<(u64, Vec<u8>)> = Vec::with_capacity(2);
        match self.profile.location {
            PositionLocation::Direct { address } => regions.push((address, pair.to_vec())),
            PositionLocation::Pointer {
                static_offset,
                field_offset,
            } => {
                let slot = self.profile.base_address + static_offset;
                regions.push((slot, PLAYER_STRUCT.to_le_bytes().to_vec()));
                regions.push((PLAYER_STRUCT as u64 + field_offset, pair.to_vec()));
            }
        }

        let end = address + buf.len() as u64;
        for (start, bytes) in regions {
            if address >= start && end <= start + bytes.len() as u64 {
                let at = (address - start) as usize;
                buf.copy_from_slice(&bytes[at..at + buf.len()]);
                return Ok(());
            }
        }
        Err(MemoryReadError::Unreadable {
            address,
            len: buf.len(),
        })
    }
}

/// Detector for a simulated run, plus the sprite the world should draw for it.
///
/// A power-up template found in `config.template_dirs` is used for both, so the
/// simulated game shows what the detector looks for. Without one, both fall back
/// to [`power_icon`].
pub fn load_detector(config: &DetectionConfig) -> anyhow::Result<(FrameDetector, GrayImage)> {
    let detector = FrameDetector::from_config(config)?;
    if let Some(template) = detector.template() {
        let icon = ImageUtils::mat_to_gray_image(&template.image)?;
        return Ok((detector, icon));
    }

    info!(dirs = ?config.template_dirs, "using the built-in power-up icon");
    let icon = power_icon();
    let template = TemplateLoader::from_gray("power", &icon)?;
    Ok((FrameDetector::new(config, Some(template)), icon))
}

type Shared = Arc<Mutex<SimWorld>>;

fn lock(world: &Shared) -> MutexGuard<'_, SimWorld> {
    world.lock().unwrap_or_else(|e| e.into_inner())
}

/// Handle to a running simulation; hands out the three collaborator views.
#[derive(Clone)]
pub struct Simulation {
    world: Shared,
}

impl Simulation {
    pub fn new(config: SimConfig, capture_box: CaptureBox, profile: GameProfile) -> Self {
        Self {
            world: Arc::new(Mutex::new(SimWorld::new(config, capture_box, profile))),
        }
    }

    pub fn frame_source(&self) -> SimFrameSource {
        SimFrameSource {
            world: Arc::clone(&self.world),
        }
    }

    pub fn memory(&self) -> SimMemory {
        SimMemory {
            world: Arc::clone(&self.world),
        }
    }

    /// A keyboard bound with the same scan codes the game listens for.
    pub fn key_sink(&self) -> SimKeySink {
        let world = Arc::clone(&self.world);
        let bindings = lock(&self.world).config.keys;
        let emit: Box<dyn FnMut(u16, bool) + Send> =
            Box::new(move |code: u16, pressed: bool| lock(&world).key_event(code, pressed));
        ScanCodeSink::new(bindings, emit)
    }

    pub fn stats(&self) -> SimStats {
        lock(&self.world).stats()
    }

    /// Runs `f` against the world, for scripting scenarios.
    pub fn with_world<T>(&self, f: impl FnOnce(&mut SimWorld) -> T) -> T {
        f(&mut lock(&self.world))
    }
}

pub struct SimFrameSource {
    world: Shared,
}

impl FrameSource for SimFrameSource {
    fn capture(&mut self, timeout: Duration) -> Result<Frame, CaptureError> {
        let mut world = lock(&self.world);
        world.step();
        let drop_every = world.config.drop_every;
        if drop_every > 0 && world.stats.frames % drop_every == 0 {
            world.stats.dropped_frames += 1;
            return Err(CaptureError::Timeout(timeout));
        }
        world.render()
    }
}

pub struct SimMemory {
    world: Shared,
}

impl ProcessMemory for SimMemory {
    fn read_bytes(&self, address: u64, buf: &mut [u8]) -> Result<(), MemoryReadError> {
        lock(&self.world).read(address, buf)
    }
}

pub type SimKeySink = ScanCodeSink<Box<dyn FnMut(u16, bool) + Send>>;

#[cfg(test)]
mod tests {
    use super::*;
    use grazer_core::player::{builtin_profiles, find_profile};
    use grazer_core::{KeySink, PlayerReader, PointerChainReader};

    fn profile(id: &str) -> GameProfile {
        find_profile(&builtin_profiles(), id).unwrap().clone()
    }

    fn quiet_config() -> SimConfig {
        SimConfig {
            bullets: 0,
            power_up_interval: u64::MAX,
            ..Default::default()
        }
    }

    #[test]
    fn test_memory_serves_every_profile_layout() {
        for game in builtin_profiles() {
            let sim = Simulation::new(quiet_config(), CaptureBox::default(), game.clone());
            sim.with_world(|w| w.set_player(Vec2::new(100.0, 200.0)));

            let mut reader = PointerChainReader::new(sim.memory(), game.clone());
            let frame_pos = reader.read_player_position().unwrap();
            assert_eq!(
                CaptureBox::default().to_game_space(frame_pos),
                Vec2::new(100.0, 200.0),
                "{}",
                game.id
            );
        }
    }

    #[test]
    fn test_unmapped_read_fails() {
        let sim = Simulation::new(quiet_config(), CaptureBox::default(), profile("th10"));
        let mut buf = [0u8; 4];
        assert!(matches!(
            sim.memory().read_bytes(0x1234, &mut buf),
            Err(MemoryReadError::Unreadable { .. })
        ));
    }

    #[test]
    fn test_held_keys_move_the_player() {
        let sim = Simulation::new(quiet_config(), CaptureBox::default(), profile("th10"));
        let start = sim.with_world(|w| w.player());
        let mut keys = sim.key_sink();
        keys.press(Key::Left);
        keys.press(Key::Up);
        sim.frame_source().capture(Duration::from_millis(1)).unwrap();
        assert_eq!(sim.with_world(|w| w.player()), start + Vec2::new(-3.0, -3.0));

        keys.release(Key::Left);
        keys.release(Key::Up);
        sim.frame_source().capture(Duration::from_millis(1)).unwrap();
        assert_eq!(sim.with_world(|w| w.player()), start + Vec2::new(-3.0, -3.0));
    }

    #[test]
    fn test_bomb_counts_once_per_press() {
        let sim = Simulation::new(SimConfig::default(), CaptureBox::default(), profile("th10"));
        let mut keys = sim.key_sink();
        keys.press(Key::Bomb);
        keys.press(Key::Bomb);
        keys.release(Key::Bomb);
        keys.press(Key::Bomb);
        assert_eq!(sim.stats().bombs, 2);
    }

    #[test]
    fn test_unbound_scan_code_is_ignored() {
        let sim = Simulation::new(quiet_config(), CaptureBox::default(), profile("th10"));
        sim.with_world(|w| {
            w.key_event(0x01, true);
            w.key_event(KeyBindings::default().left, true);
        });
        assert!(sim.with_world(|w| w.is_held(Key::Left)));
        assert!(Key::ALL.iter().filter(|&&k| k != Key::Left).all(|&k| !sim.with_world(|w| w.is_held(k))));
    }

    #[test]
    fn test_load_detector_falls_back_to_builtin_icon() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let config = DetectionConfig {
            template_dirs: vec![dir.path().to_path_buf()],
            ..Default::default()
        };
        let (detector, icon) = load_detector(&config)?;
        assert!(detector.has_template());
        assert_eq!(icon, power_icon());
        Ok(())
    }

    #[test]
    fn test_load_detector_uses_configured_template() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let custom = GrayImage::from_fn(8, 6, |x, y| Luma([if (x + y) % 2 == 0 { 250 } else { 40 }]));
        custom.save(dir.path().join("star.png"))?;
        let config = DetectionConfig {
            template_dirs: vec![dir.path().to_path_buf()],
            power_template: "star".to_string(),
            ..Default::default()
        };

        let (detector, icon) = load_detector(&config)?;
        let template = detector.template().expect("template should load");
        assert_eq!((template.width(), template.height()), (8, 6));
        assert_eq!(icon, custom);

        let sim = Simulation::new(quiet_config(), CaptureBox::default(), profile("th10"));
        sim.with_world(|w| w.set_icon(icon));
        assert_eq!(sim.with_world(|w| w.icon().dimensions()), (8, 6));
        Ok(())
    }

    #[test]
    fn test_drop_every_times_out() {
        let config = SimConfig {
            drop_every: 2,
            ..quiet_config()
        };
        let sim = Simulation::new(config, CaptureBox::default(), profile("th10"));
        let mut source = sim.frame_source();
        assert!(source.capture(Duration::from_millis(5)).is_ok());
        assert!(matches!(
            source.capture(Duration::from_millis(5)),
            Err(CaptureError::Timeout(_))
        ));
        assert_eq!(sim.stats().dropped_frames, 1);
    }

    #[test]
    fn test_render_places_player_inside_capture_box() {
        let sim = Simulation::new(quiet_config(), CaptureBox::default(), profile("th10"));
        sim.with_world(|w| w.set_player(Vec2::new(10.0, 20.0)));
        let frame = sim.with_world(|w| w.render()).unwrap();
        // Game (10, 20) is frame (42, 36).
        assert_eq!(frame.pixel(42, 36), Some([PLAYER_SHADE, PLAYER_SHADE, PLAYER_SHADE, 255]));
        assert_eq!(frame.pixel(0, 0), Some([BACKGROUND, BACKGROUND, BACKGROUND, 255]));
    }
}
