//! Command codes for the command-coded request shape.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::errors::{ProtocolError, Result};

/// Command carried by an `Invoke` frame.
///
/// Codes are laid out as type `0x10` in the high byte and command number
/// `0x31..=0x36` in the low byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Command {
    /// Declare queue capacity (arg: i32)
    SetCapacity = 0x1031,
    /// Submit the value half of an element (arg: i32)
    InsertValue = 0x1032,
    /// Submit the priority half of an element (arg: i32)
    InsertPriority = 0x1033,
    /// Query current size and capacity (result: [`QueueInfo`])
    GetInfo = 0x1034,
    /// Extract the minimum-priority value (result: i32)
    GetMin = 0x1035,
    /// Extract the maximum-priority value (result: i32)
    GetMax = 0x1036,
}

impl Command {
    /// Every command, in code order.
    pub const ALL: [Self; 6] = [
        Self::SetCapacity,
        Self::InsertValue,
        Self::InsertPriority,
        Self::GetInfo,
        Self::GetMin,
        Self::GetMax,
    ];

    /// Parse a command code. `None` if unrecognized.
    #[must_use]
    pub fn from_u16(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|cmd| cmd.to_u16() == code)
    }

    /// Raw command code.
    #[must_use]
    pub fn to_u16(self) -> u16 {
        self as u16
    }

    /// Exact argument size in bytes.
    #[must_use]
    pub fn arg_size(self) -> usize {
        match self {
            Self::SetCapacity | Self::InsertValue | Self::InsertPriority => 4,
            Self::GetInfo | Self::GetMin | Self::GetMax => 0,
        }
    }

    /// Exact result size in bytes.
    #[must_use]
    pub fn result_size(self) -> usize {
        match self {
            Self::SetCapacity | Self::InsertValue | Self::InsertPriority => 0,
            Self::GetInfo => QueueInfo::SIZE,
            Self::GetMin | Self::GetMax => 4,
        }
    }
}

impl TryFrom<u16> for Command {
    type Error = ProtocolError;

    fn try_from(code: u16) -> Result<Self> {
        Self::from_u16(code).ok_or(ProtocolError::UnknownCommand(code))
    }
}

/// Result of [`Command::GetInfo`]: `{ size: i32, capacity: i32 }`, Big Endian.
#[repr(C, packed)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct QueueInfo {
    size: [u8; 4],
    capacity: [u8; 4],
}

impl QueueInfo {
    /// Size of the serialized struct (8 bytes)
    pub const SIZE: usize = 8;

    /// Build from element count and capacity.
    #[must_use]
    pub fn new(size: i32, capacity: i32) -> Self {
        Self { size: size.to_be_bytes(), capacity: capacity.to_be_bytes() }
    }

    /// Parse from exactly [`Self::SIZE`] bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        Self::ref_from_bytes(bytes)
            .map_err(|_| ProtocolError::PayloadSize { expected: Self::SIZE, actual: bytes.len() })
    }

    /// Serialize to bytes.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut arr = [0u8; Self::SIZE];
        arr.copy_from_slice(IntoBytes::as_bytes(self));
        arr
    }

    /// Number of elements currently queued.
    #[must_use]
    pub fn size(&self) -> i32 {
        i32::from_be_bytes(self.size)
    }

    /// Declared queue capacity.
    #[must_use]
    pub fn capacity(&self) -> i32 {
        i32::from_be_bytes(self.capacity)
    }
}

impl std::fmt::Debug for QueueInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueInfo")
            .field("size", &self.size())
            .field("capacity", &self.capacity())
            .finish()
    }
}
