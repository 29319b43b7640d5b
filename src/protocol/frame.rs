//! Fixed-layout command frame.
//!
//! Wire format (64 bytes, little-endian multi-byte fields):
//! ```text
//! ┌─────┬─────┬─────────┬──────┬─────┬─────────┬──────────────┬─────────┐
//! │ SFD │ len │ seq u16 │ kind │ cmd │ err u16 │ args [u8;54] │ crc u16 │
//! │  0  │  1  │  2..4   │  4   │  5  │  6..8   │    8..62     │ 62..64  │
//! └─────┴─────┴─────────┴──────┴─────┴─────────┴──────────────┴─────────┘
//! ```
//!
//! There are no variable-length fields.  An encrypted frame has the same
//! size as a plaintext one, so every byte pattern of the right length must
//! parse: unknown kinds, commands and error codes are carried through
//! losslessly so the image can be re-serialised bit-for-bit.

use crate::error::FrameError;

/// Total frame size on the wire.
pub const FRAME_LEN: usize = 64;

/// Size of the opaque argument payload.
pub const ARG_LEN: usize = 54;

/// Plaintext start-of-frame marker.
pub const SFD: u8 = 0x7F;

/// Byte offset of the argument payload inside the image.
pub const ARGS_OFFSET: usize = 8;

/// Byte offset of the checksum field inside the image.
pub const CRC_OFFSET: usize = FRAME_LEN - 2;

/// Raw frame image.
pub type FrameImage = [u8; FRAME_LEN];

// ---------------------------------------------------------------------------
// Frame kind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsgKind {
    Request,
    Reply,
    Hello,
    Async,
    /// Unrecognised raw value (typically an encrypted image).
    Other(u8),
}

impl From<u8> for MsgKind {
    fn from(raw: u8) -> Self {
        match raw {
            0x01 => Self::Request,
            0x02 => Self::Reply,
            0x03 => Self::Hello,
            0x04 => Self::Async,
            other => Self::Other(other),
        }
    }
}

impl From<MsgKind> for u8 {
    fn from(kind: MsgKind) -> Self {
        match kind {
            MsgKind::Request => 0x01,
            MsgKind::Reply => 0x02,
            MsgKind::Hello => 0x03,
            MsgKind::Async => 0x04,
            MsgKind::Other(raw) => raw,
        }
    }
}

// ---------------------------------------------------------------------------
// In-band error code
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Normal,
    UnknownCommand,
    WrongStateForHello,
    Other(u16),
}

impl From<u16> for ErrorCode {
    fn from(raw: u16) -> Self {
        match raw {
            0x0000 => Self::Normal,
            0x0001 => Self::UnknownCommand,
            0x0002 => Self::WrongStateForHello,
            other => Self::Other(other),
        }
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        match code {
            ErrorCode::Normal => 0x0000,
            ErrorCode::UnknownCommand => 0x0001,
            ErrorCode::WrongStateForHello => 0x0002,
            ErrorCode::Other(raw) => raw,
        }
    }
}

// ---------------------------------------------------------------------------
// Command code
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandCode {
    GetRfStatus,
    HelloPing,
    LedOff,
    LedOn,
    LedDim,
    GetAppKey,
    GetNwStatus,
    GetGwStatus,
    TimerOn,
    TimerOff,
    SetAppKey,
    Reboot,
    RepairRoute,
    Authenticate,
    AsyncJoined,
    AsyncAlert,
    Other(u8),
}

impl From<u8> for CommandCode {
    fn from(raw: u8) -> Self {
        match raw {
            0xFF => Self::GetRfStatus,
            0xFE => Self::HelloPing,
            0xFD => Self::LedOff,
            0xFC => Self::LedOn,
            0xFB => Self::LedDim,
            0xFA => Self::GetAppKey,
            0xF9 => Self::GetNwStatus,
            0xF8 => Self::GetGwStatus,
            0xF7 => Self::TimerOn,
            0xF6 => Self::TimerOff,
            0xF5 => Self::SetAppKey,
            0xF4 => Self::Reboot,
            0xF3 => Self::RepairRoute,
            0xF2 => Self::Authenticate,
            0xC0 => Self::AsyncJoined,
            0xC1 => Self::AsyncAlert,
            other => Self::Other(other),
        }
    }
}

impl From<CommandCode> for u8 {
    fn from(cmd: CommandCode) -> Self {
        match cmd {
            CommandCode::GetRfStatus => 0xFF,
            CommandCode::HelloPing => 0xFE,
            CommandCode::LedOff => 0xFD,
            CommandCode::LedOn => 0xFC,
            CommandCode::LedDim => 0xFB,
            CommandCode::GetAppKey => 0xFA,
            CommandCode::GetNwStatus => 0xF9,
            CommandCode::GetGwStatus => 0xF8,
            CommandCode::TimerOn => 0xF7,
            CommandCode::TimerOff => 0xF6,
            CommandCode::SetAppKey => 0xF5,
            CommandCode::Reboot => 0xF4,
            CommandCode::RepairRoute => 0xF3,
            CommandCode::Authenticate => 0xF2,
            CommandCode::AsyncJoined => 0xC0,
            CommandCode::AsyncAlert => 0xC1,
            CommandCode::Other(raw) => raw,
        }
    }
}

impl CommandCode {
    /// Network-class commands are answered by the node itself.  Everything
    /// else belongs to the actuator driver and is forwarded to it.
    pub fn is_network_command(self) -> bool {
        matches!(
            self,
            Self::GetRfStatus
                | Self::GetNwStatus
                | Self::HelloPing
                | Self::LedOn
                | Self::LedOff
                | Self::LedDim
                | Self::TimerOn
                | Self::TimerOff
                | Self::SetAppKey
                | Self::GetAppKey
                | Self::Reboot
                | Self::RepairRoute
                | Self::Authenticate
        )
    }

    /// Handshake commands skip the sequence check.
    pub fn is_handshake(self) -> bool {
        matches!(self, Self::Authenticate | Self::SetAppKey)
    }
}

// ---------------------------------------------------------------------------
// CommandFrame
// ---------------------------------------------------------------------------

/// Decoded view of one 64-byte frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandFrame {
    pub start_marker: u8,
    pub length: u8,
    pub sequence: u16,
    pub kind: MsgKind,
    pub command: CommandCode,
    pub error: ErrorCode,
    pub args: [u8; ARG_LEN],
    pub checksum: u16,
}

impl CommandFrame {
    /// A fresh plaintext frame with zeroed arguments and no checksum.
    pub fn new(kind: MsgKind, command: CommandCode) -> Self {
        Self {
            start_marker: SFD,
            length: FRAME_LEN as u8,
            sequence: 0,
            kind,
            command,
            error: ErrorCode::Normal,
            args: [0; ARG_LEN],
            checksum: 0,
        }
    }

    /// Parse a datagram.  Fails only when the byte count is not one frame.
    pub fn parse(bytes: &[u8]) -> Result<Self, FrameError> {
        let image: &FrameImage = bytes
            .try_into()
            .map_err(|_| FrameError::LengthMismatch {
                expected: FRAME_LEN,
                actual: bytes.len(),
            })?;
        Ok(Self::from_image(image))
    }

    /// Decode an image.  Infallible: every 64-byte pattern is a frame.
    pub fn from_image(image: &FrameImage) -> Self {
        let mut args = [0u8; ARG_LEN];
        args.copy_from_slice(&image[ARGS_OFFSET..CRC_OFFSET]);
        Self {
            start_marker: image[0],
            length: image[1],
            sequence: u16::from_le_bytes([image[2], image[3]]),
            kind: MsgKind::from(image[4]),
            command: CommandCode::from(image[5]),
            error: ErrorCode::from(u16::from_le_bytes([image[6], image[7]])),
            args,
            checksum: u16::from_le_bytes([image[CRC_OFFSET], image[CRC_OFFSET + 1]]),
        }
    }

    /// Serialise to the wire image.
    pub fn to_image(&self) -> FrameImage {
        let mut image = [0u8; FRAME_LEN];
        image[0] = self.start_marker;
        image[1] = self.length;
        image[2..4].copy_from_slice(&self.sequence.to_le_bytes());
        image[4] = self.kind.into();
        image[5] = self.command.into();
        image[6..8].copy_from_slice(&u16::from(self.error).to_le_bytes());
        image[ARGS_OFFSET..CRC_OFFSET].copy_from_slice(&self.args);
        image[CRC_OFFSET..].copy_from_slice(&self.checksum.to_le_bytes());
        image
    }

    /// True when the start marker matches the plaintext sentinel.  A frame
    /// that fails this check is assumed to be encrypted.
    pub fn has_plain_marker(&self) -> bool {
        self.start_marker == SFD
    }

    /// Copy of this frame re-tagged as a reply of the given kind with
    /// `error = Normal`.
    pub fn reply_as(&self, kind: MsgKind) -> Self {
        Self {
            kind,
            error: ErrorCode::Normal,
            ..*self
        }
    }
}
