//! Grazer: keeps a bullet-hell player alive by steering along a potential field.
//!
//! The loop lives in [`session`]; [`sim`] provides an offline game so the loop
//! can run without attaching to anything.

pub mod config;
pub mod session;
pub mod sim;

pub use config::{PilotConfig, TimingConfig};
pub use session::{Session, SessionSummary, StopSignal, TickError, TickOutcome, TickReport};
