//! FAT32 filesystem implementation
//!
//! Single-cluster volume driver: every file and directory occupies at most
//! one cluster's worth of sectors, and the FAT only ever records the
//! allocated/end-of-chain sentinel. Content past one cluster is silently
//! truncated; there is no chain following. Each operation re-reads the
//! current directory from the device, so there is no directory cache to
//! invalidate.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use log::{info, warn};

use super::{alloc_buffer, BlockDevice, FileInfo, FsError, SECTOR_SIZE};

mod allocator;
mod boot_sector;
mod constants;
mod dir_entry;
mod fat_entry;

pub use allocator::ClusterAllocator;
pub use boot_sector::{BootSector, BPB_SIZE};
use constants::*;
pub use dir_entry::{format_name, match_name, pack_name, DirEntry, MAX_NAME_LENGTH};
use fat_entry::fat_location;
pub use fat_entry::FatEntry;

/// FAT32 volume session over a single block device.
pub struct Fat32<'a> {
    /// Underlying block device
    pub device: Box<dyn BlockDevice + 'a>,
    /// Boot parameter block, read once at mount
    boot_sector: BootSector,
    /// First sector of the FAT region
    fat_start: u32,
    /// First sector of the data region
    data_start: u32,
    /// Cluster of the root directory
    root_cluster: u32,
    /// Cluster currently treated as the working directory
    current_cluster: u32,
    /// Display-only path; never consulted for lookups
    current_path: String,
    /// Free-cluster cursor
    allocator: ClusterAllocator,
}

impl<'a> Fat32<'a> {
    /// Mounts the volume found at sector 0 of `device`.
    ///
    /// Parses the BPB, derives the region offsets and runs the FAT repair
    /// scan over the root directory before returning the session.
    pub fn mount(device: Box<dyn BlockDevice + 'a>) -> Result<Self, FsError> {
        let mut sector = [0u8; SECTOR_SIZE];
        device.read_sectors(0, 1, &mut sector)?;
        let boot_sector = BootSector::parse(&sector)?;

        let fat_start = boot_sector.reserved_sectors as u32;
        let data_start = fat_start + boot_sector.fat_count as u32 * boot_sector.sectors_per_fat_32;
        let root_cluster = boot_sector.root_cluster;

        let mut fs = Fat32 {
            device,
            boot_sector,
            fat_start,
            data_start,
            root_cluster,
            current_cluster: root_cluster,
            current_path: String::from("/"),
            allocator: ClusterAllocator::new(),
        };

        info!(
            "fat32: mounted, {} bytes/sector, {} sectors/cluster, root cluster {}",
            fs.boot_sector.bytes_per_sector, fs.boot_sector.sectors_per_cluster, root_cluster
        );

        fs.repair_fat();
        Ok(fs)
    }

    /// Writes a minimal FAT32 layout onto `device` and mounts it.
    ///
    /// One reserved sector, a single FAT sized for `total_sectors`, root
    /// directory at cluster 2. Volumes produced by external tooling mount
    /// the same way; this exists so tests and image tools need no such tool.
    pub fn format(
        mut device: Box<dyn BlockDevice + 'a>,
        total_sectors: u32,
        sectors_per_cluster: u8,
    ) -> Result<Self, FsError> {
        let reserved_sectors: u16 = 1;
        let fat_count: u8 = 1;

        // Clusters number from 2, so the FAT must cover two extra slots.
        let total_clusters =
            (total_sectors - reserved_sectors as u32) / sectors_per_cluster as u32;
        let sectors_per_fat =
            ((total_clusters as usize + 2) * FAT_ENTRY_SIZE).div_ceil(SECTOR_SIZE) as u32;

        let boot_sector = BootSector {
            jump_boot: [0xEB, 0x58, 0x90],
            oem_name: *b"MKFS.FAT",
            bytes_per_sector: SECTOR_SIZE as u16,
            sectors_per_cluster,
            reserved_sectors,
            fat_count,
            root_dir_entries: 0,
            total_sectors_16: 0,
            media_type: 0xF8, // Fixed disk
            sectors_per_fat_16: 0,
            sectors_per_track: 63,
            head_count: 255,
            hidden_sectors: 0,
            total_sectors_32: total_sectors,
            sectors_per_fat_32: sectors_per_fat,
            flags: 0,
            version: 0,
            root_cluster: 2,
            fsinfo_sector: 0,
            backup_boot_sector: 0,
            drive_number: 0x80, // Hard disk
            boot_signature: 0x29,
            volume_id: 0x1234_5678,
            volume_label: *b"NO NAME    ",
            fs_type: *b"FAT32   ",
        };

        let mut sector = [0u8; SECTOR_SIZE];
        boot_sector.serialize(&mut sector)?;
        sector[510] = 0x55; // Boot signature
        sector[511] = 0xAA;
        device.write_sectors(0, 1, &sector)?;

        // Clear the FAT, then mark the media, reserved and root entries.
        let zero = [0u8; SECTOR_SIZE];
        for i in 0..sectors_per_fat {
            device.write_sectors(reserved_sectors as u32 + i, 1, &zero)?;
        }
        let mut fat_first = [0u8; SECTOR_SIZE];
        fat_first[0..4].copy_from_slice(&0x0FFF_FFF8u32.to_le_bytes());
        fat_first[4..8].copy_from_slice(&FAT_END_OF_CHAIN.to_le_bytes());
        fat_first[8..12].copy_from_slice(&FAT_END_OF_CHAIN.to_le_bytes());
        device.write_sectors(reserved_sectors as u32, 1, &fat_first)?;

        // Empty root directory: all-zero cluster, terminated at entry 0.
        let data_start = reserved_sectors as u32 + sectors_per_fat;
        for i in 0..sectors_per_cluster as u32 {
            device.write_sectors(data_start + i, 1, &zero)?;
        }

        Fat32::mount(device)
    }

    /// First sector of `cluster`. Defined only for `cluster >= 2`.
    fn cluster_to_lba(&self, cluster: u32) -> u32 {
        self.data_start + (cluster - 2) * self.boot_sector.sectors_per_cluster as u32
    }

    fn cluster_bytes(&self) -> usize {
        self.boot_sector.sectors_per_cluster as usize * SECTOR_SIZE
    }

    fn read_dir_cluster(&self, cluster: u32) -> Result<Vec<u8>, FsError> {
        let mut buf = alloc_buffer(self.cluster_bytes())?;
        self.device.read_sectors(
            self.cluster_to_lba(cluster),
            self.boot_sector.sectors_per_cluster,
            &mut buf,
        )?;
        Ok(buf)
    }

    fn write_dir_cluster(&mut self, cluster: u32, buf: &[u8]) -> Result<(), FsError> {
        let lba = self.cluster_to_lba(cluster);
        self.device
            .write_sectors(lba, self.boot_sector.sectors_per_cluster, buf)
    }

    /// One-time pass run on every mount: root directory entries that point
    /// at a cluster the FAT still records as free get that cluster marked
    /// allocated. Covers volumes whose FAT was never initialized by the
    /// imaging tool; only clusters in [REPAIR_MIN_CLUSTER, REPAIR_MAX_CLUSTER)
    /// are checked, and failures leave the volume as it was.
    fn repair_fat(&mut self) {
        let cluster_buf = match self.read_dir_cluster(self.root_cluster) {
            Ok(buf) => buf,
            Err(_) => return,
        };

        let mut fat_buffer = [0u8; SECTOR_SIZE];
        for raw in cluster_buf.chunks_exact(DIR_ENTRY_SIZE) {
            if raw[0] == 0x00 {
                break;
            }
            if raw[0] == DELETED_ENTRY_MARKER {
                continue;
            }

            let entry = DirEntry::decode(raw);
            let cluster = entry.first_cluster;
            if !(REPAIR_MIN_CLUSTER..REPAIR_MAX_CLUSTER).contains(&cluster) {
                continue;
            }

            let (sector, offset) = fat_location(self.fat_start, cluster);
            if self.device.read_sectors(sector, 1, &mut fat_buffer).is_err() {
                continue;
            }
            let fat = FatEntry::from_le_bytes([
                fat_buffer[offset],
                fat_buffer[offset + 1],
                fat_buffer[offset + 2],
                fat_buffer[offset + 3],
            ]);
            if fat.is_free() {
                warn!(
                    "fat32: marking cluster {} (referenced by {}) as allocated",
                    cluster,
                    format_name(&entry.name)
                );
                fat_buffer[offset..offset + FAT_ENTRY_SIZE]
                    .copy_from_slice(&FatEntry::end_of_chain().to_le_bytes());
                let _ = self.device.write_sectors(sector, 1, &fat_buffer);
            }
        }
    }

    /// Scans a directory cluster for `name`, falling back to the first free
    /// or deleted slot. Returns the chosen slot and the matched entry's
    /// cluster (0 when the slot was free).
    fn find_slot(cluster_buf: &[u8], name: &str) -> (Option<usize>, u32) {
        let mut slot = None;
        for (i, raw) in cluster_buf.chunks_exact(DIR_ENTRY_SIZE).enumerate() {
            if raw[0] == 0x00 || raw[0] == DELETED_ENTRY_MARKER {
                if slot.is_none() {
                    slot = Some(i);
                }
                continue;
            }
            let entry = DirEntry::decode(raw);
            if match_name(&entry.name, name) {
                return (Some(i), entry.first_cluster);
            }
        }
        (slot, 0)
    }

    /// Lists the current directory in on-disk scan order.
    pub fn list(&self) -> Result<Vec<FileInfo>, FsError> {
        let cluster_buf = self.read_dir_cluster(self.current_cluster)?;

        let mut entries = Vec::new();
        for raw in cluster_buf.chunks_exact(DIR_ENTRY_SIZE) {
            if raw[0] == 0x00 {
                break;
            }
            if raw[0] == DELETED_ENTRY_MARKER {
                continue;
            }
            let entry = DirEntry::decode(raw);
            if entry.is_volume_label() || entry.is_long_name() {
                continue;
            }
            entries.push(FileInfo {
                name: String::from(format_name(&entry.name).as_str()),
                is_dir: entry.is_directory(),
                size: entry.size,
            });
        }
        Ok(entries)
    }

    /// Reads a file from the current directory.
    ///
    /// An entry with cluster 0 or size 0 yields an empty buffer, not an
    /// error. At most one cluster is read; an oversized size field returns
    /// the cluster's worth of bytes.
    pub fn read_file(&self, name: &str) -> Result<Vec<u8>, FsError> {
        let cluster_buf = self.read_dir_cluster(self.current_cluster)?;

        for raw in cluster_buf.chunks_exact(DIR_ENTRY_SIZE) {
            if raw[0] == 0x00 {
                break;
            }
            if raw[0] == DELETED_ENTRY_MARKER {
                continue;
            }
            let entry = DirEntry::decode(raw);
            if !match_name(&entry.name, name) {
                continue;
            }

            if entry.first_cluster == 0 || entry.size == 0 {
                return Ok(Vec::new());
            }
            if entry.first_cluster < 2 {
                return Err(FsError::InvalidState);
            }

            let spc = self.boot_sector.sectors_per_cluster as u32;
            let sectors = entry.size.div_ceil(SECTOR_SIZE as u32).min(spc);
            let mut data = alloc_buffer(sectors as usize * SECTOR_SIZE)?;
            self.device
                .read_sectors(self.cluster_to_lba(entry.first_cluster), sectors as u8, &mut data)?;
            data.truncate(entry.size as usize);
            return Ok(data);
        }

        Err(FsError::NotFound)
    }

    /// Writes a file into the current directory, creating or replacing its
    /// entry.
    ///
    /// The directory entry commits before the data cluster; a failure
    /// between the two leaves the entry pointing at stale content. Data past
    /// one cluster is silently truncated. Appending is not implemented and
    /// always fails.
    pub fn write_file(&mut self, name: &str, data: &[u8], append: bool) -> Result<(), FsError> {
        if append {
            return Err(FsError::Unsupported);
        }

        let mut cluster_buf = self.read_dir_cluster(self.current_cluster)?;
        let (slot, existing_cluster) = Self::find_slot(&cluster_buf, name);
        let slot = slot.ok_or(FsError::NoFreeSlot)?;

        let data_cluster = if existing_cluster != 0 {
            existing_cluster
        } else if data.is_empty() {
            0
        } else {
            self.allocator
                .allocate(&mut *self.device, self.fat_start)?
        };

        let entry = DirEntry {
            name: pack_name(name),
            attributes: ATTR_ARCHIVE,
            first_cluster: data_cluster,
            size: data.len() as u32,
        };
        let offset = slot * DIR_ENTRY_SIZE;
        entry.encode(&mut cluster_buf[offset..offset + DIR_ENTRY_SIZE]);
        self.write_dir_cluster(self.current_cluster, &cluster_buf)?;

        if !data.is_empty() {
            if data_cluster < 2 {
                return Err(FsError::InvalidState);
            }
            let spc = self.boot_sector.sectors_per_cluster as u32;
            let sectors = (data.len() as u32).div_ceil(SECTOR_SIZE as u32).min(spc);
            let capacity = sectors as usize * SECTOR_SIZE;
            if data.len() > capacity {
                warn!(
                    "fat32: '{}' is {} bytes, keeping the first {}",
                    name,
                    data.len(),
                    capacity
                );
            }
            let mut write_buf = alloc_buffer(capacity)?;
            let copied = data.len().min(capacity);
            write_buf[..copied].copy_from_slice(&data[..copied]);
            let lba = self.cluster_to_lba(data_cluster);
            self.device.write_sectors(lba, sectors as u8, &write_buf)?;
        }

        Ok(())
    }

    /// Creates an empty file: size 0, no cluster unless one is reused.
    pub fn create_file(&mut self, name: &str) -> Result<(), FsError> {
        self.write_file(name, &[], false)
    }

    /// Creates an empty directory in the current directory.
    ///
    /// A fresh cluster is always allocated, even when an existing entry is
    /// replaced. The parent entry commits first, then the zeroed cluster
    /// body; the 0x00-terminator rule makes the all-zero cluster a valid
    /// empty directory.
    pub fn create_directory(&mut self, name: &str) -> Result<(), FsError> {
        let mut cluster_buf = self.read_dir_cluster(self.current_cluster)?;
        let (slot, _) = Self::find_slot(&cluster_buf, name);
        let slot = slot.ok_or(FsError::NoFreeSlot)?;

        let dir_cluster = self
            .allocator
            .allocate(&mut *self.device, self.fat_start)?;

        let entry = DirEntry {
            name: pack_name(name),
            attributes: ATTR_DIRECTORY,
            first_cluster: dir_cluster,
            size: 0,
        };
        let offset = slot * DIR_ENTRY_SIZE;
        entry.encode(&mut cluster_buf[offset..offset + DIR_ENTRY_SIZE]);
        self.write_dir_cluster(self.current_cluster, &cluster_buf)?;

        let body = alloc_buffer(self.cluster_bytes())?;
        self.write_dir_cluster(dir_cluster, &body)?;
        Ok(())
    }

    /// Changes the working directory.
    ///
    /// `"/"` resets to the root. `".."` also resets straight to the root
    /// regardless of depth: navigation is flat, there is no parent walk.
    /// Anything else must name a directory entry in the current cluster.
    pub fn change_directory(&mut self, name: &str) -> Result<(), FsError> {
        if name == "/" || name == ".." {
            self.current_cluster = self.root_cluster;
            self.current_path.clear();
            self.current_path.push('/');
            return Ok(());
        }

        let cluster_buf = self.read_dir_cluster(self.current_cluster)?;
        for raw in cluster_buf.chunks_exact(DIR_ENTRY_SIZE) {
            if raw[0] == 0x00 {
                break;
            }
            if raw[0] == DELETED_ENTRY_MARKER {
                continue;
            }
            let entry = DirEntry::decode(raw);
            if !entry.is_directory() {
                continue;
            }
            if match_name(&entry.name, name) {
                self.current_cluster = entry.first_cluster;
                self.current_path.push('/');
                self.current_path.push_str(name);
                return Ok(());
            }
        }

        Err(FsError::NotFound)
    }

    /// Display path of the working directory. Never used for lookups.
    pub fn current_path(&self) -> &str {
        &self.current_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesys::block::MemoryBlockDevice;

    const TOTAL_SECTORS: u32 = 4096;
    const SECTORS_PER_CLUSTER: u8 = 4;

    fn test_fs() -> Fat32<'static> {
        let device = Box::new(MemoryBlockDevice::new(TOTAL_SECTORS));
        Fat32::format(device, TOTAL_SECTORS, SECTORS_PER_CLUSTER).unwrap()
    }

    fn read_sector(fs: &Fat32<'_>, lba: u32) -> [u8; SECTOR_SIZE] {
        let mut buf = [0u8; SECTOR_SIZE];
        fs.device.read_sectors(lba, 1, &mut buf).unwrap();
        buf
    }

    fn write_sector(fs: &mut Fat32<'_>, lba: u32, buf: &[u8; SECTOR_SIZE]) {
        fs.device.write_sectors(lba, 1, buf).unwrap();
    }

    #[test]
    fn cluster_to_lba_follows_the_data_region() {
        let fs = test_fs();
        for cluster in 2..10 {
            assert_eq!(
                fs.cluster_to_lba(cluster),
                fs.data_start + (cluster - 2) * SECTORS_PER_CLUSTER as u32
            );
        }
    }

    #[test]
    fn write_then_read_round_trips_within_a_cluster() {
        let mut fs = test_fs();
        let data: Vec<u8> = (0..1500u32).map(|i| (i % 251) as u8).collect();
        fs.write_file("A.TXT", &data, false).unwrap();
        assert_eq!(fs.read_file("A.TXT").unwrap(), data);
    }

    #[test]
    fn lookup_folds_ascii_case() {
        let mut fs = test_fs();
        fs.write_file("FOO.TXT", b"contents", false).unwrap();
        assert_eq!(fs.read_file("foo.txt").unwrap(), b"contents");
        assert_eq!(fs.read_file("Foo.Txt").unwrap(), b"contents");
        assert_eq!(fs.read_file("FOO.TX"), Err(FsError::NotFound));
    }

    #[test]
    fn created_file_reads_back_empty() {
        let mut fs = test_fs();
        fs.create_file("B.TXT").unwrap();
        assert_eq!(fs.read_file("B.TXT").unwrap(), Vec::<u8>::new());

        let listing = fs.list().unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].name, "B.TXT");
        assert_eq!(listing[0].size, 0);
        assert!(!listing[0].is_dir);
    }

    #[test]
    fn rewriting_a_file_reuses_its_cluster() {
        let mut fs = test_fs();
        fs.write_file("A.TXT", b"first", false).unwrap();
        let before = fs.read_dir_cluster(fs.root_cluster).unwrap();
        let cluster_before = DirEntry::decode(&before[..DIR_ENTRY_SIZE]).first_cluster;

        fs.write_file("A.TXT", b"second contents", false).unwrap();
        let after = fs.read_dir_cluster(fs.root_cluster).unwrap();
        let entry = DirEntry::decode(&after[..DIR_ENTRY_SIZE]);
        assert_eq!(entry.first_cluster, cluster_before);
        assert_eq!(fs.read_file("A.TXT").unwrap(), b"second contents");
    }

    #[test]
    fn deleted_slot_is_the_next_creation_target() {
        let mut fs = test_fs();
        fs.write_file("A.TXT", b"aaa", false).unwrap();
        fs.write_file("B.TXT", b"bbb", false).unwrap();

        // Mark A's slot deleted the way a deletion tool would.
        let lba = fs.cluster_to_lba(fs.root_cluster);
        let mut sector = read_sector(&fs, lba);
        sector[0] = DELETED_ENTRY_MARKER;
        write_sector(&mut fs, lba, &sector);

        fs.write_file("C.TXT", b"ccc", false).unwrap();
        let listing = fs.list().unwrap();
        assert_eq!(listing[0].name, "C.TXT");
        assert_eq!(listing[1].name, "B.TXT");
    }

    #[test]
    fn oversized_writes_truncate_to_one_cluster() {
        let mut fs = test_fs();
        let cluster_bytes = SECTORS_PER_CLUSTER as usize * SECTOR_SIZE;
        let data: Vec<u8> = (0..2 * cluster_bytes).map(|i| (i % 253) as u8).collect();

        fs.write_file("BIG.DAT", &data, false).unwrap();
        let back = fs.read_file("BIG.DAT").unwrap();
        assert_eq!(back.len(), cluster_bytes);
        assert_eq!(back[..], data[..cluster_bytes]);
    }

    #[test]
    fn append_reports_failure() {
        let mut fs = test_fs();
        fs.write_file("A.TXT", b"x", false).unwrap();
        assert_eq!(
            fs.write_file("A.TXT", b"y", true),
            Err(FsError::Unsupported)
        );
        assert_eq!(fs.read_file("A.TXT").unwrap(), b"x");
    }

    #[test]
    fn listing_stops_at_the_terminator_entry() {
        let mut fs = test_fs();
        fs.write_file("A.TXT", b"a", false).unwrap();
        fs.write_file("B.TXT", b"b", false).unwrap();
        fs.write_file("C.TXT", b"c", false).unwrap();

        // Zero B's slot: C is still on disk but unreachable from a scan.
        let lba = fs.cluster_to_lba(fs.root_cluster);
        let mut sector = read_sector(&fs, lba);
        sector[DIR_ENTRY_SIZE] = 0x00;
        write_sector(&mut fs, lba, &sector);

        let listing = fs.list().unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].name, "A.TXT");
        assert_eq!(fs.read_file("C.TXT"), Err(FsError::NotFound));
    }

    #[test]
    fn listing_hides_volume_labels_and_long_names() {
        let mut fs = test_fs();
        fs.write_file("A.TXT", b"a", false).unwrap();

        let lba = fs.cluster_to_lba(fs.root_cluster);
        let mut sector = read_sector(&fs, lba);
        let label = DirEntry {
            name: *b"MYVOLUME   ",
            attributes: ATTR_VOLUME_ID,
            first_cluster: 0,
            size: 0,
        };
        label.encode(&mut sector[DIR_ENTRY_SIZE..2 * DIR_ENTRY_SIZE]);
        let lfn = DirEntry {
            name: *b"Afragment  ",
            attributes: ATTR_LONG_NAME,
            first_cluster: 0,
            size: 0,
        };
        lfn.encode(&mut sector[2 * DIR_ENTRY_SIZE..3 * DIR_ENTRY_SIZE]);
        write_sector(&mut fs, lba, &sector);

        let listing = fs.list().unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].name, "A.TXT");
    }

    #[test]
    fn directories_flatten_back_to_root() {
        let mut fs = test_fs();
        fs.create_directory("SUB").unwrap();

        fs.change_directory("SUB").unwrap();
        assert_ne!(fs.current_cluster, fs.root_cluster);
        assert_eq!(fs.current_path(), "//SUB");
        assert!(fs.list().unwrap().is_empty());

        // ".." is not a parent walk: it lands on the root from any depth.
        fs.change_directory("..").unwrap();
        assert_eq!(fs.current_cluster, fs.root_cluster);
        assert_eq!(fs.current_path(), "/");

        fs.change_directory("SUB").unwrap();
        fs.change_directory("/").unwrap();
        assert_eq!(fs.current_cluster, fs.root_cluster);
    }

    #[test]
    fn change_directory_ignores_plain_files() {
        let mut fs = test_fs();
        fs.write_file("A.TXT", b"a", false).unwrap();
        assert_eq!(fs.change_directory("A.TXT"), Err(FsError::NotFound));
    }

    #[test]
    fn files_in_a_subdirectory_stay_there() {
        let mut fs = test_fs();
        fs.create_directory("SUB").unwrap();
        fs.change_directory("SUB").unwrap();
        fs.write_file("INNER.TXT", b"inner", false).unwrap();

        assert_eq!(fs.read_file("INNER.TXT").unwrap(), b"inner");
        fs.change_directory("..").unwrap();
        assert_eq!(fs.read_file("INNER.TXT"), Err(FsError::NotFound));
        let names: Vec<_> = fs.list().unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, ["SUB"]);
    }

    #[test]
    fn mount_repairs_fat_entries_the_root_claims() {
        let fs = test_fs();
        let fat_start = fs.fat_start;
        let root_lba = fs.cluster_to_lba(fs.root_cluster);

        // Hand-craft a root entry that references cluster 5 while the FAT
        // still records cluster 5 as free.
        let mut sector = read_sector(&fs, root_lba);
        let ghost = DirEntry {
            name: pack_name("GHOST.TXT"),
            attributes: ATTR_ARCHIVE,
            first_cluster: 5,
            size: 100,
        };
        ghost.encode(&mut sector[..DIR_ENTRY_SIZE]);
        let mut fs = fs;
        write_sector(&mut fs, root_lba, &sector);

        let fat_sector = read_sector(&fs, fat_start);
        assert_eq!(u32::from_le_bytes(fat_sector[20..24].try_into().unwrap()), 0);

        // Remount over the same device: the repair pass runs again.
        let device = fs.device;
        let fs = Fat32::mount(device).unwrap();
        let fat_sector = read_sector(&fs, fat_start);
        assert_eq!(
            u32::from_le_bytes(fat_sector[20..24].try_into().unwrap()),
            FAT_END_OF_CHAIN
        );
    }

    #[test]
    fn repair_ignores_clusters_outside_the_window() {
        let fs = test_fs();
        let fat_start = fs.fat_start;
        let root_lba = fs.cluster_to_lba(fs.root_cluster);

        let mut sector = read_sector(&fs, root_lba);
        let far = DirEntry {
            name: pack_name("FAR.TXT"),
            attributes: ATTR_ARCHIVE,
            first_cluster: 2000,
            size: 1,
        };
        far.encode(&mut sector[..DIR_ENTRY_SIZE]);
        let mut fs = fs;
        write_sector(&mut fs, root_lba, &sector);

        let device = fs.device;
        let fs = Fat32::mount(device).unwrap();
        let (sector_lba, offset) = fat_location(fat_start, 2000);
        let fat_sector = read_sector(&fs, sector_lba);
        assert_eq!(
            u32::from_le_bytes(fat_sector[offset..offset + 4].try_into().unwrap()),
            0
        );
    }

    #[test]
    fn full_directory_reports_no_free_slot() {
        let mut fs = test_fs();
        let max_entries = fs.cluster_bytes() / DIR_ENTRY_SIZE;
        for i in 0..max_entries {
            let name = alloc::format!("F{}.TXT", i);
            fs.write_file(&name, b"x", false).unwrap();
        }
        assert_eq!(
            fs.write_file("ONEMORE.TXT", b"x", false),
            Err(FsError::NoFreeSlot)
        );
    }
}
