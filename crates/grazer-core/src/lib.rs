//! Grazer core
//!
//! Geometry, the potential-field force model and the input controller for the
//! dodging loop. Everything here is pure computation over plain data; pixels and
//! live processes are reached only through the traits in [`control`] and [`player`].

pub mod assist;
pub mod control;
pub mod field;
pub mod geometry;
pub mod player;
pub mod scene;

pub use assist::{ControlSnapshot, OperatorControls};
pub use control::{Key, KeyBindings, KeySink, MovementConfig, MovementController};
pub use field::{DetectionRadius, ForceConfig, ForceModel, RadiusConfig};
pub use geometry::{CaptureBox, Point, Rect, RoiExtents, Vec2};
pub use player::{GameProfile, MemoryReadError, PlayerReader, PointerChainReader, ProcessMemory};
pub use scene::Blob;
