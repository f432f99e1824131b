use super::memory::{MemoryReadError, ProcessMemory};
use super::profile::{GameProfile, PositionLocation};
use crate::geometry::Vec2;

/// Source of the player's position for the current tick, in frame space.
///
/// Never cached: the game moves the player between any two reads.
pub trait PlayerReader {
    fn read_player_position(&mut self) -> Result<Vec2, MemoryReadError>;
}

/// Follows a [`GameProfile`] layout through process memory.
pub struct PointerChainReader<M> {
    memory: M,
    profile: GameProfile,
}

impl<M: ProcessMemory> PointerChainReader<M> {
    pub fn new(memory: M, profile: GameProfile) -> Self {
        Self { memory, profile }
    }

    pub fn profile(&self) -> &GameProfile {
        &self.profile
    }

    /// Address of the x component; y follows 4 bytes later.
    pub fn position_address(&self) -> Result<u64, MemoryReadError> {
        match self.profile.location {
            PositionLocation::Direct { address } => Ok(address),
            PositionLocation::Pointer {
                static_offset,
                field_offset,
            } => {
                let slot = self.profile.base_address + static_offset;
                let pointer = self.memory.read_u32_le(slot)?;
                if pointer == 0 {
                    return Err(MemoryReadError::NullPointer { address: slot });
                }
                Ok(pointer as u64 + field_offset)
            }
        }
    }
}

impl<M: ProcessMemory> PlayerReader for PointerChainReader<M> {
    fn read_player_position(&mut self) -> Result<Vec2, MemoryReadError> {
        let address = self.position_address()?;
        let x = self.memory.read_f32_le(address)?;
        let y = self.memory.read_f32_le(address + 4)?;
        Ok(Vec2::new(x as f64, y as f64) + self.profile.position_bias)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::profile::{builtin_profiles, find_profile};
    use std::collections::HashMap;

    /// Sparse byte-addressed memory.
    #[derive(Default)]
    struct FakeMemory {
        bytes: HashMap<u64, u8>,
    }

    impl FakeMemory {
        fn write(&mut self, address: u64, data: &[u8]) {
            for (i, b) in data.iter().enumerate() {
                self.bytes.insert(address + i as u64, *b);
            }
        }
    }

    impl ProcessMemory for FakeMemory {
        fn read_bytes(&self, address: u64, buf: &mut [u8]) -> Result<(), MemoryReadError> {
            let len = buf.len();
            for (i, slot) in buf.iter_mut().enumerate() {
                *slot = *self
                    .bytes
                    .get(&(address + i as u64))
                    .ok_or(MemoryReadError::Unreadable { address, len })?;
            }
            Ok(())
        }
    }

    fn profile(id: &str) -> GameProfile {
        find_profile(&builtin_profiles(), id).unwrap().clone()
    }

    #[test]
    fn test_follows_pointer_chain() {
        let mut mem = FakeMemory::default();
        mem.write(0x40_0000 + 0x77834, &0x0200_0000u32.to_le_bytes());
        mem.write(0x0200_0000 + 0x354, &132.5f32.to_le_bytes());
        mem.write(0x0200_0000 + 0x358, &416.0f32.to_le_bytes());

        let mut reader = PointerChainReader::new(mem, profile("th10"));
        assert_eq!(reader.read_player_position().unwrap(), Vec2::new(132.5, 416.0));
    }

    #[test]
    fn test_applies_position_bias() {
        let mut mem = FakeMemory::default();
        mem.write(0x40_0000 + 0xE9BB8, &0x0100_0000u32.to_le_bytes());
        mem.write(0x0100_0000 + 0x508, &200.0f32.to_le_bytes());
        mem.write(0x0100_0000 + 0x50C, &300.0f32.to_le_bytes());

        let mut reader = PointerChainReader::new(mem, profile("th15"));
        assert_eq!(reader.read_player_position().unwrap(), Vec2::new(120.0, 320.0));
    }

    #[test]
    fn test_direct_address() {
        let mut mem = FakeMemory::default();
        mem.write(0x006C_AA68, &10.0f32.to_le_bytes());
        mem.write(0x006C_AA6C, &20.0f32.to_le_bytes());

        let mut reader = PointerChainReader::new(mem, profile("th06"));
        assert_eq!(reader.read_player_position().unwrap(), Vec2::new(10.0, 20.0));
    }

    #[test]
    fn test_null_pointer_is_an_error() {
        let mut mem = FakeMemory::default();
        mem.write(0x40_0000 + 0x77834, &0u32.to_le_bytes());
        let mut reader = PointerChainReader::new(mem, profile("th10"));
        assert_eq!(
            reader.read_player_position(),
            Err(MemoryReadError::NullPointer { address: 0x40_0000 + 0x77834 })
        );
    }

    #[test]
    fn test_unmapped_memory_is_an_error() {
        let mut reader = PointerChainReader::new(FakeMemory::default(), profile("th10"));
        assert!(matches!(
            reader.read_player_position(),
            Err(MemoryReadError::Unreadable { .. })
        ));
    }

    #[test]
    fn test_non_finite_float_is_rejected() {
        let mut mem = FakeMemory::default();
        mem.write(0x006C_AA68, &f32::NAN.to_le_bytes());
        mem.write(0x006C_AA6C, &1.0f32.to_le_bytes());
        let mut reader = PointerChainReader::new(mem, profile("th06"));
        assert!(matches!(
            reader.read_player_position(),
            Err(MemoryReadError::NotFinite { .. })
        ));
    }
}
