//! Frame type combining header and payload.
//!
//! A `Frame` is the transport-layer packet consisting of:
//! - 12-byte raw binary header (Big Endian)
//! - Variable-length raw payload (at most 64 bytes)
//!
//! This is a pure data holder. Interpreting the payload against a session's
//! protocol phase happens in the core adapters.

use bytes::{BufMut, Bytes};

use crate::{
    Command, FrameHeader, FrameKind, StatusCode,
    errors::{ProtocolError, Result},
};

/// Complete protocol frame (transport layer)
///
/// Layout on the wire:
/// `[FrameHeader: 12 bytes] + [payload: payload_size bytes]`
///
/// # Invariants
///
/// - Size Consistency: `payload.len()` MUST match `header.payload_size()`.
///   Enforced by [`Frame::new`] and verified by [`Frame::decode`].
/// - Size Limit: `payload.len()` MUST NOT exceed
///   [`FrameHeader::MAX_PAYLOAD_SIZE`]. Violations are rejected during
///   encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame header (12 bytes)
    pub header: FrameHeader,

    /// Raw payload bytes
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame with automatic `payload_size` calculation
    ///
    /// The header's `payload_size` field is set to match the payload length.
    /// Oversized payloads are not rejected here; [`Frame::encode`] does that.
    #[must_use]
    pub fn new(mut header: FrameHeader, payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();

        // Saturates so an oversized payload is still rejected by `encode`.
        let payload_len = u32::try_from(payload.len()).unwrap_or(u32::MAX);
        header.payload_size = payload_len.to_be_bytes();

        Self { header, payload }
    }

    /// `Open` frame binding `client_id` to the connection.
    #[must_use]
    pub fn open(client_id: u64) -> Self {
        Self::new(FrameHeader::new(FrameKind::Open), client_id.to_be_bytes().to_vec())
    }

    /// `Close` frame releasing the bound client.
    #[must_use]
    pub fn close() -> Self {
        Self::new(FrameHeader::new(FrameKind::Close), Bytes::new())
    }

    /// Streaming `Write` frame.
    #[must_use]
    pub fn write(payload: impl Into<Bytes>) -> Self {
        Self::new(FrameHeader::new(FrameKind::Write), payload)
    }

    /// Streaming `Read` frame asking for `len` bytes.
    #[must_use]
    pub fn read(len: u16) -> Self {
        let mut header = FrameHeader::new(FrameKind::Read);
        header.set_code(len);
        Self::new(header, Bytes::new())
    }

    /// Command `Invoke` frame.
    #[must_use]
    pub fn invoke(command: Command, arg: impl Into<Bytes>) -> Self {
        Self::invoke_raw(command.to_u16(), arg)
    }

    /// Command `Invoke` frame with an arbitrary code (for unknown-command
    /// handling and tests).
    #[must_use]
    pub fn invoke_raw(code: u16, arg: impl Into<Bytes>) -> Self {
        let mut header = FrameHeader::new(FrameKind::Invoke);
        header.set_code(code);
        Self::new(header, arg)
    }

    /// `Reply` frame with a status and result payload.
    #[must_use]
    pub fn reply(status: StatusCode, payload: impl Into<Bytes>) -> Self {
        let mut header = FrameHeader::new(FrameKind::Reply);
        header.set_code(status.to_u16());
        Self::new(header, payload)
    }

    /// Frame kind. `None` only for headers that bypassed validation.
    #[must_use]
    pub fn kind(&self) -> Option<FrameKind> {
        self.header.kind()
    }

    /// Reply status, for `Reply` frames.
    pub fn status(&self) -> Result<StatusCode> {
        StatusCode::try_from(self.header.code())
    }

    /// Encoded length on the wire.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        FrameHeader::SIZE + self.payload.len()
    }

    /// Encode frame into buffer
    ///
    /// Writes: `[header (12 bytes)] + [payload (variable)]`
    ///
    /// # Errors
    ///
    /// - `ProtocolError::PayloadTooLarge` if payload exceeds `MAX_PAYLOAD_SIZE`
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        if self.payload.len() > FrameHeader::MAX_PAYLOAD_SIZE as usize {
            return Err(ProtocolError::PayloadTooLarge {
                size: self.payload.len(),
                max: FrameHeader::MAX_PAYLOAD_SIZE as usize,
            });
        }

        debug_assert_eq!(self.payload.len(), self.header.payload_size() as usize);

        dst.put_slice(&self.header.to_bytes());
        dst.put_slice(&self.payload);

        Ok(())
    }

    /// Decode frame from wire format
    ///
    /// # Errors
    ///
    /// - `ProtocolError` if header parsing fails (invalid magic, version,
    ///   kind, or size limits)
    /// - `ProtocolError::FrameTruncated` if payload is shorter than the header
    ///   claims
    ///
    /// Trailing bytes beyond the claimed payload are ignored.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let header = FrameHeader::from_bytes(bytes)?;

        let payload_size = header.payload_size() as usize;
        let total_size = FrameHeader::SIZE + payload_size;

        let Some(payload) = bytes.get(FrameHeader::SIZE..total_size) else {
            return Err(ProtocolError::FrameTruncated {
                expected: payload_size,
                actual: bytes.len().saturating_sub(FrameHeader::SIZE),
            });
        };

        Ok(Self { header: *header, payload: Bytes::copy_from_slice(payload) })
    }
}
