//! Frame header with zero-copy parsing.
//!
//! The `FrameHeader` is a fixed 12-byte structure serialized as raw binary
//! (Big Endian). Parsing casts the network bytes directly onto the struct, so
//! routing a frame to the right handler never allocates.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::errors::{ProtocolError, Result};

/// Transport primitive carried by a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameKind {
    /// Bind a client identity to the connection (payload: 8-byte client id)
    Open = 0x01,
    /// Release the bound client identity
    Close = 0x02,
    /// Streaming write (payload interpreted by session phase)
    Write = 0x03,
    /// Streaming read (`code` carries the caller's buffer length)
    Read = 0x04,
    /// Command call (`code` carries the command, payload the argument)
    Invoke = 0x05,
    /// Server response (`code` carries the status, payload the result)
    Reply = 0x06,
}

impl FrameKind {
    /// Parse a frame kind byte. `None` if unrecognized.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::Open),
            0x02 => Some(Self::Close),
            0x03 => Some(Self::Write),
            0x04 => Some(Self::Read),
            0x05 => Some(Self::Invoke),
            0x06 => Some(Self::Reply),
            _ => None,
        }
    }

    /// Raw kind byte.
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// Fixed 12-byte frame header (Big Endian network byte order)
///
/// Fields are stored as raw byte arrays so that every 12-byte pattern is a
/// valid value and the struct has no alignment requirement.
///
/// # Layout
///
/// ```text
/// 0..4   magic          0x50515545 ("PQUE")
/// 4      version        0x01
/// 5      kind           FrameKind
/// 6..8   code           command / status / read length
/// 8..12  payload_size   u32, at most MAX_PAYLOAD_SIZE
/// ```
#[repr(C, packed)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct FrameHeader {
    magic: [u8; 4],
    version: u8,
    kind: u8,
    code: [u8; 2],
    pub(crate) payload_size: [u8; 4],
}

impl FrameHeader {
    /// Size of the serialized header (12 bytes)
    pub const SIZE: usize = 12;

    /// Magic number: "PQUE" in ASCII (0x50515545)
    pub const MAGIC: u32 = 0x5051_5545;

    /// Current protocol version
    pub const VERSION: u8 = 0x01;

    /// Maximum payload size. The largest legitimate payload is 8 bytes
    /// (client id, queue info); anything near this limit is garbage.
    pub const MAX_PAYLOAD_SIZE: u32 = 64;

    /// Create a new header for the given frame kind.
    #[must_use]
    pub fn new(kind: FrameKind) -> Self {
        Self {
            magic: Self::MAGIC.to_be_bytes(),
            version: Self::VERSION,
            kind: kind.to_u8(),
            code: [0; 2],
            payload_size: [0; 4],
        }
    }

    /// Parse header from network bytes (zero-copy)
    ///
    /// Validates cheapest properties first: length, magic, version, kind,
    /// then payload size.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::FrameTooShort` if buffer is shorter than 12 bytes
    /// - `ProtocolError::InvalidMagic` if magic number is invalid
    /// - `ProtocolError::UnsupportedVersion` if version is unsupported
    /// - `ProtocolError::UnknownFrameKind` if the kind byte is unrecognized
    /// - `ProtocolError::PayloadTooLarge` if payload size exceeds maximum
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        let header = Self::ref_from_prefix(bytes)
            .map_err(|_| ProtocolError::FrameTooShort {
                expected: Self::SIZE,
                actual: bytes.len(),
            })?
            .0;

        if u32::from_be_bytes(header.magic) != Self::MAGIC {
            return Err(ProtocolError::InvalidMagic);
        }

        if header.version != Self::VERSION {
            return Err(ProtocolError::UnsupportedVersion(header.version));
        }

        if FrameKind::from_u8(header.kind).is_none() {
            return Err(ProtocolError::UnknownFrameKind(header.kind));
        }

        let payload_size = u32::from_be_bytes(header.payload_size);
        if payload_size > Self::MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: payload_size as usize,
                max: Self::MAX_PAYLOAD_SIZE as usize,
            });
        }

        Ok(header)
    }

    /// Serialize header to bytes (zero-copy)
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let bytes = IntoBytes::as_bytes(self);
        let mut arr = [0u8; Self::SIZE];
        arr.copy_from_slice(bytes);
        arr
    }

    /// Protocol magic number.
    #[must_use]
    pub fn magic(&self) -> u32 {
        u32::from_be_bytes(self.magic)
    }

    /// Protocol version byte.
    #[must_use]
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Frame kind. `None` if unrecognized (only possible for headers that
    /// bypassed [`Self::from_bytes`]).
    #[must_use]
    pub fn kind(&self) -> Option<FrameKind> {
        FrameKind::from_u8(self.kind)
    }

    /// Kind-dependent code field as raw u16.
    #[must_use]
    pub fn code(&self) -> u16 {
        u16::from_be_bytes(self.code)
    }

    /// Payload size in bytes.
    #[must_use]
    pub fn payload_size(&self) -> u32 {
        u32::from_be_bytes(self.payload_size)
    }

    /// Update the kind-dependent code field.
    pub fn set_code(&mut self, code: u16) {
        self.code = code.to_be_bytes();
    }
}

impl std::fmt::Debug for FrameHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameHeader")
            .field("version", &self.version())
            .field("kind", &self.kind())
            .field("code", &self.code())
            .field("payload_size", &self.payload_size())
            .finish()
    }
}

impl PartialEq for FrameHeader {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for FrameHeader {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_size_is_twelve_bytes() {
        assert_eq!(std::mem::size_of::<FrameHeader>(), FrameHeader::SIZE);
    }

    #[test]
    fn new_header_parses_back() {
        let mut header = FrameHeader::new(FrameKind::Invoke);
        header.set_code(0x1031);

        let bytes = header.to_bytes();
        let parsed = FrameHeader::from_bytes(&bytes).unwrap();

        assert_eq!(parsed.magic(), FrameHeader::MAGIC);
        assert_eq!(parsed.version(), FrameHeader::VERSION);
        assert_eq!(parsed.kind(), Some(FrameKind::Invoke));
        assert_eq!(parsed.code(), 0x1031);
        assert_eq!(parsed.payload_size(), 0);
    }

    #[test]
    fn magic_is_ascii_pque() {
        let bytes = FrameHeader::new(FrameKind::Open).to_bytes();
        assert_eq!(&bytes[..4], b"PQUE");
    }

    #[test]
    fn reject_short_buffer() {
        let result = FrameHeader::from_bytes(&[0u8; 11]);
        assert!(matches!(result, Err(ProtocolError::FrameTooShort { expected: 12, actual: 11 })));
    }

    #[test]
    fn reject_invalid_magic() {
        let mut bytes = FrameHeader::new(FrameKind::Read).to_bytes();
        bytes[0] = b'X';
        assert!(matches!(FrameHeader::from_bytes(&bytes), Err(ProtocolError::InvalidMagic)));
    }

    #[test]
    fn reject_unsupported_version() {
        let mut bytes = FrameHeader::new(FrameKind::Read).to_bytes();
        bytes[4] = 0x02;
        assert!(matches!(
            FrameHeader::from_bytes(&bytes),
            Err(ProtocolError::UnsupportedVersion(0x02))
        ));
    }

    #[test]
    fn reject_unknown_kind() {
        let mut bytes = FrameHeader::new(FrameKind::Read).to_bytes();
        bytes[5] = 0x7f;
        assert!(matches!(
            FrameHeader::from_bytes(&bytes),
            Err(ProtocolError::UnknownFrameKind(0x7f))
        ));
    }

    #[test]
    fn reject_oversized_payload_claim() {
        let mut bytes = FrameHeader::new(FrameKind::Write).to_bytes();
        bytes[8..12].copy_from_slice(&65u32.to_be_bytes());
        assert!(matches!(
            FrameHeader::from_bytes(&bytes),
            Err(ProtocolError::PayloadTooLarge { size: 65, max: 64 })
        ));
    }

    #[test]
    fn frame_kind_round_trips_through_byte() {
        for kind in [
            FrameKind::Open,
            FrameKind::Close,
            FrameKind::Write,
            FrameKind::Read,
            FrameKind::Invoke,
            FrameKind::Reply,
        ] {
            assert_eq!(FrameKind::from_u8(kind.to_u8()), Some(kind));
        }
        assert_eq!(FrameKind::from_u8(0), None);
    }
}
