//! In-memory block device implementation

use crate::filesys::{BlockDevice, FsError, SECTOR_SIZE};
use alloc::vec;
use alloc::vec::Vec;
use core::result::Result;

/// Block device that stores sectors in memory.
///
/// Backs the test suite and doubles as a RAM disk.
pub struct MemoryBlockDevice {
    /// Sector contents, each `SECTOR_SIZE` bytes
    sectors: Vec<Vec<u8>>,
}

impl MemoryBlockDevice {
    /// Creates a zero-filled device with the given sector count
    pub fn new(total_sectors: u32) -> Self {
        let sectors = (0..total_sectors).map(|_| vec![0; SECTOR_SIZE]).collect();
        Self { sectors }
    }

    /// Returns total number of sectors
    pub fn total_sectors(&self) -> u32 {
        self.sectors.len() as u32
    }

    /// Validates the transfer range and buffer length
    fn validate(&self, lba: u32, count: u8, buf_len: usize) -> Result<(), FsError> {
        if lba as usize + count as usize > self.sectors.len() {
            return Err(FsError::DeviceError);
        }
        if buf_len != count as usize * SECTOR_SIZE {
            return Err(FsError::DeviceError);
        }
        Ok(())
    }
}

impl BlockDevice for MemoryBlockDevice {
    /// Copies `count` sectors starting at `lba` into the buffer
    fn read_sectors(&self, lba: u32, count: u8, buf: &mut [u8]) -> Result<(), FsError> {
        self.validate(lba, count, buf.len())?;
        for (i, chunk) in buf.chunks_exact_mut(SECTOR_SIZE).enumerate() {
            chunk.copy_from_slice(&self.sectors[lba as usize + i]);
        }
        Ok(())
    }

    /// Copies the buffer over `count` sectors starting at `lba`
    fn write_sectors(&mut self, lba: u32, count: u8, buf: &[u8]) -> Result<(), FsError> {
        self.validate(lba, count, buf.len())?;
        for (i, chunk) in buf.chunks_exact(SECTOR_SIZE).enumerate() {
            self.sectors[lba as usize + i].copy_from_slice(chunk);
        }
        Ok(())
    }
}
