//! FAT32 filesystem constants

/// Size of a FAT entry in bytes (32-bit)
pub const FAT_ENTRY_SIZE: usize = 4;

/// Size of an on-disk directory entry in bytes
pub const DIR_ENTRY_SIZE: usize = 32;

/// Only the low 28 bits of a FAT32 entry are significant
pub const FAT_ENTRY_MASK: u32 = 0x0FFF_FFFF;

/// The one value this stack ever writes into the FAT: allocated, end of chain
pub const FAT_END_OF_CHAIN: u32 = 0x0FFF_FFFF;

/// First cluster the allocator hands out; clusters 0-2 are reserved/root
pub const FIRST_ALLOCATABLE_CLUSTER: u32 = 3;

/// Candidate clusters one allocation scans before the force-assign fallback
pub const ALLOC_SEARCH_WINDOW: u32 = 1024;

/// Lower bound (inclusive) of the post-mount FAT repair scan
pub const REPAIR_MIN_CLUSTER: u32 = 3;

/// Upper bound (exclusive) of the post-mount FAT repair scan
pub const REPAIR_MAX_CLUSTER: u32 = 1000;

/// File attribute: Read-only
pub const ATTR_READ_ONLY: u8 = 0x01;

/// File attribute: Volume label. Invisible to listing and lookup
pub const ATTR_VOLUME_ID: u8 = 0x08;

/// File attribute: Directory
pub const ATTR_DIRECTORY: u8 = 0x10;

/// File attribute: Archive
pub const ATTR_ARCHIVE: u8 = 0x20;

/// Long-name entries carry all four low attribute bits
pub const ATTR_LONG_NAME: u8 = 0x0F;

/// Marker for deleted directory entries
pub const DELETED_ENTRY_MARKER: u8 = 0xE5;
