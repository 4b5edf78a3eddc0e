//! Free-cluster search over the file allocation table

use log::warn;

use crate::filesys::{BlockDevice, FsError, SECTOR_SIZE};

use super::constants::{ALLOC_SEARCH_WINDOW, FAT_ENTRY_SIZE, FIRST_ALLOCATABLE_CLUSTER};
use super::fat_entry::{fat_location, FatEntry};

/// Monotonic free-cluster cursor.
///
/// Nothing in this stack ever frees a cluster, so the cursor only advances.
/// Outside the exhaustion fallback, consecutive allocations return strictly
/// increasing cluster numbers.
#[derive(Debug)]
pub struct ClusterAllocator {
    next_free: u32,
}

impl Default for ClusterAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl ClusterAllocator {
    pub fn new() -> Self {
        ClusterAllocator {
            next_free: FIRST_ALLOCATABLE_CLUSTER,
        }
    }

    /// Claims a cluster and records it in the FAT as allocated/end-of-chain.
    ///
    /// Scans up to [`ALLOC_SEARCH_WINDOW`] candidates starting at the cursor;
    /// candidates whose FAT sector fails to read are skipped. When the whole
    /// window is in use, the cursor's value is handed out anyway without
    /// re-checking the FAT, which can alias a cluster that is already owned
    /// by another entry.
    pub fn allocate(
        &mut self,
        device: &mut dyn BlockDevice,
        fat_start: u32,
    ) -> Result<u32, FsError> {
        let mut fat_buffer = [0u8; SECTOR_SIZE];

        for step in 0..ALLOC_SEARCH_WINDOW {
            let cluster = self.next_free + step;
            let (sector, offset) = fat_location(fat_start, cluster);
            if device.read_sectors(sector, 1, &mut fat_buffer).is_err() {
                continue;
            }

            let entry = FatEntry::from_le_bytes([
                fat_buffer[offset],
                fat_buffer[offset + 1],
                fat_buffer[offset + 2],
                fat_buffer[offset + 3],
            ]);
            if entry.is_free() {
                fat_buffer[offset..offset + FAT_ENTRY_SIZE]
                    .copy_from_slice(&FatEntry::end_of_chain().to_le_bytes());
                device.write_sectors(sector, 1, &fat_buffer)?;
                self.next_free = cluster + 1;
                return Ok(cluster);
            }
        }

        // Window exhausted: hand out the cursor without re-checking the FAT.
        // The sentinel write is best-effort here.
        let cluster = self.next_free;
        self.next_free += 1;
        warn!(
            "fat32: no free cluster within {} candidates, force-assigning {}",
            ALLOC_SEARCH_WINDOW, cluster
        );
        let (sector, offset) = fat_location(fat_start, cluster);
        if device.read_sectors(sector, 1, &mut fat_buffer).is_ok() {
            fat_buffer[offset..offset + FAT_ENTRY_SIZE]
                .copy_from_slice(&FatEntry::end_of_chain().to_le_bytes());
            let _ = device.write_sectors(sector, 1, &fat_buffer);
        }
        Ok(cluster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesys::block::MemoryBlockDevice;
    use crate::filesys::fat32::constants::FAT_END_OF_CHAIN;

    const FAT_START: u32 = 0;

    fn fat_value(device: &MemoryBlockDevice, cluster: u32) -> u32 {
        let (sector, offset) = fat_location(FAT_START, cluster);
        let mut buf = [0u8; SECTOR_SIZE];
        device.read_sectors(sector, 1, &mut buf).unwrap();
        u32::from_le_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
    }

    #[test]
    fn returns_strictly_increasing_clusters() {
        let mut device = MemoryBlockDevice::new(16);
        let mut allocator = ClusterAllocator::new();

        let a = allocator.allocate(&mut device, FAT_START).unwrap();
        let b = allocator.allocate(&mut device, FAT_START).unwrap();
        let c = allocator.allocate(&mut device, FAT_START).unwrap();
        assert_eq!((a, b, c), (3, 4, 5));
        assert_eq!(fat_value(&device, 3), FAT_END_OF_CHAIN);
        assert_eq!(fat_value(&device, 4), FAT_END_OF_CHAIN);
        assert_eq!(fat_value(&device, 5), FAT_END_OF_CHAIN);
    }

    #[test]
    fn skips_clusters_already_in_use() {
        let mut device = MemoryBlockDevice::new(16);
        let mut sector = [0u8; SECTOR_SIZE];
        // Mark clusters 3 and 4 allocated by hand.
        sector[12..16].copy_from_slice(&FAT_END_OF_CHAIN.to_le_bytes());
        sector[16..20].copy_from_slice(&FAT_END_OF_CHAIN.to_le_bytes());
        device.write_sectors(FAT_START, 1, &sector).unwrap();

        let mut allocator = ClusterAllocator::new();
        assert_eq!(allocator.allocate(&mut device, FAT_START).unwrap(), 5);
    }

    #[test]
    fn force_assigns_cursor_when_window_is_exhausted() {
        // Fill every FAT entry the search window can reach.
        let mut device = MemoryBlockDevice::new(16);
        let full = [0xFFu8; SECTOR_SIZE];
        for sector in 0..9 {
            device.write_sectors(sector, 1, &full).unwrap();
        }

        let mut allocator = ClusterAllocator::new();
        let a = allocator.allocate(&mut device, FAT_START).unwrap();
        let b = allocator.allocate(&mut device, FAT_START).unwrap();

        // The cursor value is returned despite being in use, and keeps
        // advancing across calls.
        assert_eq!((a, b), (3, 4));
        assert_eq!(fat_value(&device, 3), FAT_END_OF_CHAIN);
    }
}
