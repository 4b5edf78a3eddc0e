//! FAT32 directory entry codec
//!
//! 32-byte on-disk entries and 8.3 name handling. Pure byte-slice
//! encode/decode, no device I/O.

use arrayvec::ArrayString;

use super::constants::*;

/// Longest display form of an 8.3 name: 8 base bytes, a dot, 3 extension bytes.
pub const MAX_NAME_LENGTH: usize = 12;

/// Decoded 32-byte directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    /// 8.3 name, space padded, case stored as typed
    pub name: [u8; 11],

    /// Attribute bitmask
    pub attributes: u8,

    /// First cluster number, assembled from the split 16-bit halves
    pub first_cluster: u32,

    /// File size in bytes
    pub size: u32,
}

impl DirEntry {
    /// Decodes an entry from its raw on-disk bytes.
    pub fn decode(raw: &[u8]) -> Self {
        let mut name = [0u8; 11];
        name.copy_from_slice(&raw[0..11]);
        let high = u16::from_le_bytes([raw[20], raw[21]]) as u32;
        let low = u16::from_le_bytes([raw[26], raw[27]]) as u32;
        DirEntry {
            name,
            attributes: raw[11],
            first_cluster: (high << 16) | low,
            size: u32::from_le_bytes([raw[28], raw[29], raw[30], raw[31]]),
        }
    }

    /// Encodes the entry over a 32-byte slot, zeroing the timestamp fields
    /// this stack does not model.
    pub fn encode(&self, raw: &mut [u8]) {
        raw[..DIR_ENTRY_SIZE].fill(0);
        raw[0..11].copy_from_slice(&self.name);
        raw[11] = self.attributes;
        let high = ((self.first_cluster >> 16) & 0xFFFF) as u16;
        let low = (self.first_cluster & 0xFFFF) as u16;
        raw[20..22].copy_from_slice(&high.to_le_bytes());
        raw[26..28].copy_from_slice(&low.to_le_bytes());
        raw[28..32].copy_from_slice(&self.size.to_le_bytes());
    }

    /// Returns true if entry is a directory
    pub fn is_directory(&self) -> bool {
        self.attributes & ATTR_DIRECTORY != 0
    }

    /// Returns true for volume-label entries, which listing and lookup skip
    pub fn is_volume_label(&self) -> bool {
        self.attributes & ATTR_VOLUME_ID != 0
    }

    /// Returns true for long-name entries (all four low attribute bits set)
    pub fn is_long_name(&self) -> bool {
        self.attributes & ATTR_LONG_NAME == ATTR_LONG_NAME
    }
}

/// Renders an 8.3 name for display: the non-space base bytes, then `.` and
/// the non-space extension bytes when the extension field is used.
pub fn format_name(raw: &[u8; 11]) -> ArrayString<MAX_NAME_LENGTH> {
    let mut out = ArrayString::new();
    for &b in raw[..8].iter().take_while(|&&b| b != b' ') {
        out.push(b as char);
    }
    if raw[8] != b' ' {
        out.push('.');
        for &b in raw[8..11].iter().take_while(|&&b| b != b' ') {
            out.push(b as char);
        }
    }
    out
}

/// Compares an on-disk name against a query, folding ASCII case.
///
/// Both sides must be consumed in lock-step; a query that is a prefix of
/// the formatted name (or the reverse) does not match.
pub fn match_name(raw: &[u8; 11], query: &str) -> bool {
    format_name(raw).as_str().eq_ignore_ascii_case(query)
}

/// Packs a query string into the fixed 11-byte on-disk form.
///
/// Up to 8 bytes before the first `.` fill the base field; when the byte
/// after the copied base is a `.`, up to 3 following bytes fill the
/// extension field. No case folding is applied, so packing a lowercase name
/// and formatting it back is not an identity.
pub fn pack_name(query: &str) -> [u8; 11] {
    let mut raw = [b' '; 11];
    let bytes = query.as_bytes();
    let mut j = 0;

    for slot in raw.iter_mut().take(8) {
        if j >= bytes.len() || bytes[j] == b'.' {
            break;
        }
        *slot = bytes[j];
        j += 1;
    }

    if bytes.get(j) == Some(&b'.') {
        j += 1;
        for slot in raw.iter_mut().skip(8) {
            match bytes.get(j) {
                Some(&b) => {
                    *slot = b;
                    j += 1;
                }
                None => break,
            }
        }
    }

    raw
}
