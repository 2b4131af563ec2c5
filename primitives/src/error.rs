//! Response codes and codec errors for the keel ledger.
//!
//! `CodeType` is the closed set of result codes surfaced verbatim to the
//! consensus engine by `check_tx` / `deliver_tx`. The numeric values are part
//! of the external interface and must never be renumbered.

use core::fmt;

/// Transaction result codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum CodeType {
    Ok = 0,
    Internal = 1,
    DecodeError = 2,
    InvalidSequence = 3,
    Unauthorized = 4,
    InsufficientFunds = 5,
    /// Kept for numbering. The engine never returns it: message kinds are a
    /// closed set and an unregistered kind fails to decode.
    UnknownRequest = 6,
    UnknownAddress = 7,
    InvalidSignature = 8,
    InvalidCoins = 9,
    InvalidIbcPacket = 10,
}

impl CodeType {
    /// Convert from the numeric code carried in a response.
    pub fn from_u32(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Ok),
            1 => Some(Self::Internal),
            2 => Some(Self::DecodeError),
            3 => Some(Self::InvalidSequence),
            4 => Some(Self::Unauthorized),
            5 => Some(Self::InsufficientFunds),
            6 => Some(Self::UnknownRequest),
            7 => Some(Self::UnknownAddress),
            8 => Some(Self::InvalidSignature),
            9 => Some(Self::InvalidCoins),
            10 => Some(Self::InvalidIbcPacket),
            _ => None,
        }
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for CodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ok => "OK",
            Self::Internal => "INTERNAL",
            Self::DecodeError => "DECODE_ERROR",
            Self::InvalidSequence => "INVALID_SEQUENCE",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::InsufficientFunds => "INSUFFICIENT_FUNDS",
            Self::UnknownRequest => "UNKNOWN_REQUEST",
            Self::UnknownAddress => "UNKNOWN_ADDRESS",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::InvalidCoins => "INVALID_COINS",
            Self::InvalidIbcPacket => "INVALID_IBC_PACKET",
        };
        f.write_str(name)
    }
}

/// Failure to decode binary or JSON input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("unexpected end of data")]
    UnexpectedEof,

    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),

    #[error("invalid {what}: {detail}")]
    Malformed { what: &'static str, detail: String },

    /// The type tag is not in the codec's registry for this family.
    #[error("unregistered {family} type tag 0x{tag:02x}")]
    UnregisteredTag { family: &'static str, tag: u8 },

    #[error("unregistered {family} type name {name:?}")]
    UnregisteredName { family: &'static str, name: String },

    #[error("json: {0}")]
    Json(String),
}

impl CodecError {
    pub fn malformed(what: &'static str, detail: impl Into<String>) -> Self {
        Self::Malformed {
            what,
            detail: detail.into(),
        }
    }

    /// True if the failure was caused by a missing registry entry rather than
    /// malformed bytes.
    pub fn is_unregistered(&self) -> bool {
        matches!(
            self,
            Self::UnregisteredTag { .. } | Self::UnregisteredName { .. }
        )
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Convenience result type for codec operations.
pub type CodecResult<T> = core::result::Result<T, CodecError>;
