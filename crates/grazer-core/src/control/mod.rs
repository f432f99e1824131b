//! Turning the net force into key commands.

pub mod keys;
pub mod movement;

pub use keys::{Key, KeyBindings, KeyCommand, KeySink, ScanCodeSink};
pub use movement::{AxisState, MovementConfig, MovementController, MovementReport};
