//! Reading the player's position out of the running game.

pub mod memory;
pub mod profile;
pub mod reader;

pub use memory::{MemoryReadError, ProcessMemory};
pub use profile::{GameProfile, PositionLocation, builtin_profiles, find_profile};
pub use reader::{PlayerReader, PointerChainReader};
