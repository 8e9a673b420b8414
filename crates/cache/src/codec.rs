//! Record codec for the `texture.entries` index file.
//!
//! The index is a 44-byte little-endian header followed by `entry_count`
//! fixed 28-byte records. Entries are positional: the Nth record maps to the
//! Nth 600-byte slot of the `texture.cache` fixed-slot store.
//!
//! Decoding performs no validation beyond structural completeness. Unknown
//! version numbers and encoder strings are passed through verbatim; it is the
//! caller's job to decide whether it trusts them.

use crate::error::{ErrorKind, Result};
use std::fmt;
use uuid::Uuid;

/// Byte length of the index header.
pub const HEADER_BYTE_COUNT: usize = 44;
/// Byte length of one index entry record.
pub const ENTRY_BYTE_COUNT: usize = 28;
/// Byte length of one fixed slot in the secondary store.
pub const SLOT_BYTE_COUNT: usize = 600;

/// The decoded index header. Read once per snapshot generation; immutable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    /// Cache format version. Rendered with two decimal places, matching how
    /// the viewer writes it into its logs.
    pub version: f32,
    pub address_size: u32,
    /// Name of the codestream encoder the viewer was built with, e.g.
    /// "KDU" or "OpenJPEG". Null padding is stripped.
    pub encoder: String,
    /// Number of entry records that follow the header.
    pub entry_count: u32,
}

impl Header {
    /// Version rendered the way the viewer does ("1.00", "8.01", ...).
    pub fn version_string(&self) -> String {
        format!("{:.2}", self.version)
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "version={} address_size={} encoder={:?} entry_count={}",
            self.version_string(),
            self.address_size,
            self.encoder,
            self.entry_count
        )
    }
}

/// One decoded index record.
///
/// Equality is deliberately *not* field-by-field: two entries compare equal
/// when `(id, captured_at, body_size)` match. `image_size` is excluded from
/// the key because corrupted zero-length reads of that field are common and
/// would otherwise make every refresh look like a change.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Texture identifier: 16 raw bytes interpreted as a big-endian integer,
    /// rendered in canonical UUID form.
    pub id: Uuid,
    /// Declared total size of the codestream. `<= 0` means the slot is
    /// empty/unused and has no recoverable bytes.
    pub image_size: i32,
    /// Size in bytes of the overflow portion, `0` when the image fits
    /// entirely in the fixed slot.
    pub body_size: i32,
    /// Unix timestamp of when the viewer cached the texture.
    pub captured_at: u32,
}

impl Entry {
    /// Whether this slot holds no recoverable texture.
    pub fn is_empty(&self) -> bool {
        self.image_size <= 0
    }

    /// Capture time as a UTC datetime.
    pub fn captured(&self) -> time::OffsetDateTime {
        time::OffsetDateTime::from_unix_timestamp(i64::from(self.captured_at))
            .unwrap_or(time::OffsetDateTime::UNIX_EPOCH)
    }

    fn decode(bytes: &[u8]) -> Self {
        // Callers guarantee a full 28-byte record; chunks_exact upholds it.
        let id = Uuid::from_bytes(bytes[0..16].try_into().expect("16-byte uuid slice"));
        let image_size = i32::from_le_bytes(bytes[16..20].try_into().expect("4-byte slice"));
        let body_size = i32::from_le_bytes(bytes[20..24].try_into().expect("4-byte slice"));
        let captured_at = u32::from_le_bytes(bytes[24..28].try_into().expect("4-byte slice"));
        Self { id, image_size, body_size, captured_at }
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.captured_at == other.captured_at && self.body_size == other.body_size
    }
}
impl Eq for Entry {}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "{} empty", self.id)
        } else {
            write!(f, "{} {} {}", self.id, self.captured().date(), human_size(self.image_size as u64))
        }
    }
}

/// Decode the fixed 44-byte header from the start of the index bytes.
///
/// # Errors
///
/// Returns [`ErrorKind::MalformedHeader`] if fewer than 44 bytes are present.
pub fn decode_header(index: &[u8]) -> Result<Header> {
    if index.len() < HEADER_BYTE_COUNT {
        exn::bail!(ErrorKind::MalformedHeader);
    }
    let version = f32::from_le_bytes(index[0..4].try_into().expect("4-byte slice"));
    let address_size = u32::from_le_bytes(index[4..8].try_into().expect("4-byte slice"));
    let encoder = String::from_utf8_lossy(&index[8..40]).trim_end_matches('\0').to_string();
    let entry_count = u32::from_le_bytes(index[40..44].try_into().expect("4-byte slice"));
    Ok(Header { version, address_size, encoder, entry_count })
}

/// Decode `entry_count` records from the bytes immediately after the header.
///
/// # Errors
///
/// Returns [`ErrorKind::TruncatedEntries`] if fewer than `entry_count`
/// complete 28-byte records exist before end of input. A short index is
/// reported, never silently padded.
pub fn decode_entries(index: &[u8], entry_count: u32) -> Result<Vec<Entry>> {
    let records = index.get(HEADER_BYTE_COUNT..).unwrap_or_default();
    let entries: Vec<Entry> =
        records.chunks_exact(ENTRY_BYTE_COUNT).take(entry_count as usize).map(Entry::decode).collect();
    if entries.len() != entry_count as usize {
        exn::bail!(ErrorKind::TruncatedEntries {
            expected: entry_count,
            read: entries.len() as u32,
        });
    }
    Ok(entries)
}

/// Render a byte count for humans, rounding up like the viewer's own
/// cache statistics output.
pub fn human_size(size: u64) -> String {
    const LABELS: [&str; 5] = ["bytes", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut power = 0;
    while size > 1024.0 && power < LABELS.len() - 1 {
        size /= 1024.0;
        power += 1;
    }
    format!("{} {}", size.ceil() as u64, LABELS[power])
}
