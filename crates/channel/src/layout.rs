//! On-wire layout of a channel region.
//!
//! A region is a single shared-memory segment:
//!
//! ```text
//! offset 0      RegionHeader (128 bytes, cache-line multiple)
//! offset 128    data area (ring_size bytes, power of two)
//! ```
//!
//! The two cursors in the header are the only cross-process synchronization
//! points. The producer publishes frames with a release store on
//! `write_index`; the consumer acknowledges consumption with a release store
//! on `read_index`. Everything else in the header is written once during
//! initialization (before the magic is published) or is advisory.

use std::fmt;
use std::ptr;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Alignment of the data area within the region.
pub const CACHE_LINE_SIZE: usize = 64;

/// Sentinel for both the region header and every frame header ("SWIF").
pub const REGION_MAGIC: u32 = 0x5357_4946;

/// Fixed size of the region header.
pub const REGION_HEADER_SIZE: usize = 128;

/// Fixed size of the per-message frame header.
pub const FRAME_HEADER_SIZE: usize = 32;

/// Frames are padded so every frame starts 8-byte aligned.
pub const FRAME_ALIGN: usize = 8;

pub const fn align_up(value: usize, alignment: usize) -> usize {
    (value + alignment - 1) & !(alignment - 1)
}

pub const fn is_power_of_two(value: usize) -> bool {
    value != 0 && value & (value - 1) == 0
}

/// Total on-ring length of a frame carrying `payload_len` bytes.
pub const fn frame_len(payload_len: usize) -> usize {
    FRAME_HEADER_SIZE + align_up(payload_len, FRAME_ALIGN)
}

/// Protocol version, packed into the region header as
/// `(major << 16) | (minor << 8) | patch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolVersion {
    pub major: u16,
    pub minor: u8,
    pub patch: u8,
}

impl ProtocolVersion {
    pub const CURRENT: Self = Self {
        major: 1,
        minor: 0,
        patch: 0,
    };

    pub const fn pack(self) -> u32 {
        (self.major as u32) << 16 | (self.minor as u32) << 8 | self.patch as u32
    }

    pub const fn unpack(raw: u32) -> Self {
        Self {
            major: (raw >> 16) as u16,
            minor: (raw >> 8) as u8,
            patch: raw as u8,
        }
    }

    /// Major versions must match exactly; minor/patch may differ.
    pub const fn is_compatible_with(self, other: Self) -> bool {
        self.major == other.major
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Region header at offset 0 of the shared segment.
///
/// `magic` is stored last during initialization with release ordering, so an
/// attacher that observes the sentinel with an acquire load also observes
/// `version`, `ring_size` and `flags`. The PIDs are advisory diagnostics and
/// may be overwritten after publication.
#[repr(C)]
pub struct RegionHeader {
    pub(crate) magic: AtomicU32,
    pub(crate) version: u32,
    pub(crate) ring_size: u64,
    pub(crate) write_index: AtomicU64,
    pub(crate) read_index: AtomicU64,
    pub(crate) sender_pid: AtomicU32,
    pub(crate) receiver_pid: AtomicU32,
    pub(crate) flags: u64,
    reserved: [u8; 80],
}

const _: () = assert!(std::mem::size_of::<RegionHeader>() == REGION_HEADER_SIZE);
const _: () = assert!(REGION_HEADER_SIZE % CACHE_LINE_SIZE == 0);

impl RegionHeader {
    /// Creator-side initialization. The magic store is the publication
    /// point: it must come last, and the caller must hold the only writable
    /// view until it lands.
    ///
    /// # Safety
    ///
    /// `this` must point to at least `REGION_HEADER_SIZE` writable bytes,
    /// suitably aligned for `RegionHeader`.
    pub(crate) unsafe fn initialize(this: *mut RegionHeader, ring_size: u64, flags: u64) {
        unsafe {
            ptr::addr_of_mut!((*this).version).write(ProtocolVersion::CURRENT.pack());
            ptr::addr_of_mut!((*this).ring_size).write(ring_size);
            ptr::addr_of_mut!((*this).flags).write(flags);
            ptr::addr_of_mut!((*this).reserved).write([0; 80]);
            (*this).write_index.store(0, Ordering::Relaxed);
            (*this).read_index.store(0, Ordering::Relaxed);
            (*this).sender_pid.store(0, Ordering::Relaxed);
            (*this).receiver_pid.store(0, Ordering::Relaxed);
            (*this).magic.store(REGION_MAGIC, Ordering::Release);
        }
    }

    pub fn magic(&self) -> u32 {
        self.magic.load(Ordering::Acquire)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn ring_size(&self) -> u64 {
        self.ring_size
    }

    pub fn write_index(&self) -> u64 {
        self.write_index.load(Ordering::Acquire)
    }

    pub fn read_index(&self) -> u64 {
        self.read_index.load(Ordering::Acquire)
    }

    pub fn sender_pid(&self) -> u32 {
        self.sender_pid.load(Ordering::Relaxed)
    }

    pub fn receiver_pid(&self) -> u32 {
        self.receiver_pid.load(Ordering::Relaxed)
    }

    pub fn flags(&self) -> u64 {
        self.flags
    }

    /// Bytes currently occupied by published, unconsumed frames.
    pub fn used_bytes(&self) -> u64 {
        let read = self.read_index.load(Ordering::Acquire);
        let write = self.write_index.load(Ordering::Acquire);
        write.saturating_sub(read)
    }

    #[cfg(test)]
    pub(crate) fn zeroed() -> Self {
        Self {
            magic: AtomicU32::new(0),
            version: 0,
            ring_size: 0,
            write_index: AtomicU64::new(0),
            read_index: AtomicU64::new(0),
            sender_pid: AtomicU32::new(0),
            receiver_pid: AtomicU32::new(0),
            flags: 0,
            reserved: [0; 80],
        }
    }
}

/// Per-message frame header, written immediately before each payload in the
/// data area. Multi-byte fields are little-endian byte arrays so the struct
/// has no padding and can be copied through the ring as plain bytes.
#[repr(C)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct FrameHeader {
    magic: [u8; 4],
    size: [u8; 4],
    sequence: [u8; 8],
    timestamp: [u8; 8],
    checksum: [u8; 4],
    reserved: [u8; 4],
}

const _: () = assert!(std::mem::size_of::<FrameHeader>() == FRAME_HEADER_SIZE);

impl FrameHeader {
    pub const MAGIC: u32 = REGION_MAGIC;

    pub fn new(size: u32, sequence: u64, timestamp: u64) -> Self {
        Self {
            magic: Self::MAGIC.to_le_bytes(),
            size: size.to_le_bytes(),
            sequence: sequence.to_le_bytes(),
            timestamp: timestamp.to_le_bytes(),
            checksum: 0u32.to_le_bytes(),
            reserved: 0u32.to_le_bytes(),
        }
    }

    pub fn to_bytes(self) -> [u8; FRAME_HEADER_SIZE] {
        zerocopy::transmute!(self)
    }

    pub fn from_bytes(bytes: [u8; FRAME_HEADER_SIZE]) -> Self {
        zerocopy::transmute!(bytes)
    }

    pub fn magic(&self) -> u32 {
        u32::from_le_bytes(self.magic)
    }

    pub fn size(&self) -> u32 {
        u32::from_le_bytes(self.size)
    }

    pub fn sequence(&self) -> u64 {
        u64::from_le_bytes(self.sequence)
    }

    pub fn timestamp(&self) -> u64 {
        u64::from_le_bytes(self.timestamp)
    }

    pub fn checksum(&self) -> u32 {
        u32::from_le_bytes(self.checksum)
    }
}

impl fmt::Debug for FrameHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameHeader")
            .field("magic", &format_args!("{:#010x}", self.magic()))
            .field("size", &self.size())
            .field("sequence", &self.sequence())
            .field("timestamp", &self.timestamp())
            .field("checksum", &self.checksum())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_header_field_offsets() {
        assert_eq!(std::mem::offset_of!(RegionHeader, magic), 0x00);
        assert_eq!(std::mem::offset_of!(RegionHeader, version), 0x04);
        assert_eq!(std::mem::offset_of!(RegionHeader, ring_size), 0x08);
        assert_eq!(std::mem::offset_of!(RegionHeader, write_index), 0x10);
        assert_eq!(std::mem::offset_of!(RegionHeader, read_index), 0x18);
        assert_eq!(std::mem::offset_of!(RegionHeader, sender_pid), 0x20);
        assert_eq!(std::mem::offset_of!(RegionHeader, receiver_pid), 0x24);
        assert_eq!(std::mem::offset_of!(RegionHeader, flags), 0x28);
        assert_eq!(std::mem::offset_of!(RegionHeader, reserved), 0x30);
    }

    #[test]
    fn test_frame_header_round_trip() {
        let header = FrameHeader::new(512, 4096, 1_700_000_000_000_000_000);
        let bytes = header.to_bytes();

        assert_eq!(&bytes[0..4], &REGION_MAGIC.to_le_bytes());
        assert_eq!(&bytes[4..8], &512u32.to_le_bytes());

        let parsed = FrameHeader::from_bytes(bytes);
        assert_eq!(parsed.magic(), FrameHeader::MAGIC);
        assert_eq!(parsed.size(), 512);
        assert_eq!(parsed.sequence(), 4096);
        assert_eq!(parsed.timestamp(), 1_700_000_000_000_000_000);
        assert_eq!(parsed.checksum(), 0);
    }

    #[test]
    fn test_version_packing() {
        let version = ProtocolVersion::CURRENT;
        assert_eq!(version.pack(), 0x0001_0000);
        assert_eq!(ProtocolVersion::unpack(0x0001_0000), version);

        let other = ProtocolVersion {
            major: 1,
            minor: 2,
            patch: 3,
        };
        assert_eq!(ProtocolVersion::unpack(other.pack()), other);
        assert!(version.is_compatible_with(other));

        let next_major = ProtocolVersion {
            major: 2,
            minor: 0,
            patch: 0,
        };
        assert!(!version.is_compatible_with(next_major));
        assert_eq!(next_major.to_string(), "2.0.0");
    }

    #[test]
    fn test_alignment_helpers() {
        assert_eq!(align_up(0, 8), 0);
        assert_eq!(align_up(1, 8), 8);
        assert_eq!(align_up(8, 8), 8);
        assert_eq!(align_up(9, 8), 16);

        assert!(is_power_of_two(4096));
        assert!(!is_power_of_two(0));
        assert!(!is_power_of_two(1000));

        assert_eq!(frame_len(0), 32);
        assert_eq!(frame_len(1), 40);
        assert_eq!(frame_len(64), 96);
        assert_eq!(frame_len(500), 536);
    }

    #[test]
    fn test_initialize_publishes_magic_last() {
        let header = Box::new(RegionHeader::zeroed());
        let ptr = Box::into_raw(header);

        unsafe { RegionHeader::initialize(ptr, 65536, 0b0001) };

        let header = unsafe { Box::from_raw(ptr) };
        assert_eq!(header.magic(), REGION_MAGIC);
        assert_eq!(header.version(), ProtocolVersion::CURRENT.pack());
        assert_eq!(header.ring_size(), 65536);
        assert_eq!(header.flags(), 0b0001);
        assert_eq!(header.write_index(), 0);
        assert_eq!(header.read_index(), 0);
        assert_eq!(header.used_bytes(), 0);
    }
}
