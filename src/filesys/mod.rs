use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::result::Result;

pub mod block;
pub mod fat32;

/// Size of a disk sector in bytes, fixed for every device this stack drives.
pub const SECTOR_SIZE: usize = 512;

// Define error types for the storage operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    /// Hardware transfer failed, or a buffer did not match the transfer size.
    DeviceError,
    /// Name absent from the current directory.
    NotFound,
    /// The current directory has no free entry slot.
    NoFreeSlot,
    /// Transient buffer acquisition failed.
    AllocationFailure,
    /// On-disk state contradicts itself (e.g. a sized entry with a reserved cluster).
    InvalidState,
    /// Operation outside the implemented contract.
    Unsupported,
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsError::DeviceError => write!(f, "device error"),
            FsError::NotFound => write!(f, "not found"),
            FsError::NoFreeSlot => write!(f, "directory full"),
            FsError::AllocationFailure => write!(f, "out of memory"),
            FsError::InvalidState => write!(f, "invalid on-disk state"),
            FsError::Unsupported => write!(f, "not supported"),
        }
    }
}

/// Represents a disk that transfers whole sectors.
///
/// Buffers must be exactly `count * 512` bytes. Calls block the current
/// execution context for the full transfer; nothing on this path suspends,
/// retries or times out.
pub trait BlockDevice: Send + Sync {
    fn read_sectors(&self, lba: u32, count: u8, buf: &mut [u8]) -> Result<(), FsError>;
    fn write_sectors(&mut self, lba: u32, count: u8, buf: &[u8]) -> Result<(), FsError>;
}

/// One row of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    pub is_dir: bool,
    pub size: u32,
}

/// Acquires a zero-filled transfer buffer from the heap.
///
/// Exhaustion surfaces as [`FsError::AllocationFailure`] so the operation
/// aborts with the volume exactly as the last committed write left it.
pub(crate) fn alloc_buffer(len: usize) -> Result<Vec<u8>, FsError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| FsError::AllocationFailure)?;
    buf.resize(len, 0);
    Ok(buf)
}
