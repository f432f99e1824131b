use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MemoryReadError {
    #[error("failed to read {len} bytes at {address:#x}")]
    Unreadable { address: u64, len: usize },

    #[error("pointer at {address:#x} is null")]
    NullPointer { address: u64 },

    #[error("value at {address:#x} is not a finite float ({value})")]
    NotFinite { address: u64, value: f32 },

    #[error("target process is not attached")]
    Detached,

    #[error("player position ({x}, {y}) is nowhere near the playfield")]
    Implausible { x: f64, y: f64 },
}

/// Out-of-process memory access. Implementations wrap the platform read call.
pub trait ProcessMemory {
    /// Fills `buf` with the bytes at `address`, or fails without partial results.
    fn read_bytes(&self, address: u64, buf: &mut [u8]) -> Result<(), MemoryReadError>;

    fn read_u32_le(&self, address: u64) -> Result<u32, MemoryReadError> {
        let mut buf = [0u8; 4];
        self.read_bytes(address, &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_f32_le(&self, address: u64) -> Result<f32, MemoryReadError> {
        let mut buf = [0u8; 4];
        self.read_bytes(address, &mut buf)?;
        let value = f32::from_le_bytes(buf);
        if value.is_finite() {
            Ok(value)
        } else {
            Err(MemoryReadError::NotFinite { address, value })
        }
    }
}

impl<M: ProcessMemory + ?Sized> ProcessMemory for &M {
    fn read_bytes(&self, address: u64, buf: &mut [u8]) -> Result<(), MemoryReadError> {
        (**self).read_bytes(address, buf)
    }
}
