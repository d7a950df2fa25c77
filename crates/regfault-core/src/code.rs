//! The closed set of registration failure classifications.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Raised when a wire value does not map to any known [`ErrorCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown error code value: {0}")]
pub struct UnknownErrorCode(pub i32);

// ─── ErrorCode ────────────────────────────────────────────────────────────────

/// Classification of a failed registration.
///
/// Values are stable on the wire and are never reused. New variants may be
/// added, so matches outside this crate need a fallback arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
#[repr(i32)]
pub enum ErrorCode {
    /// Internal or driver error with no more specific class.
    GenericError = 0,
    /// The channel URI is malformed or names unsupported media.
    InvalidChannel = 1,
    /// Release of a subscription the driver does not know.
    UnknownSubscription = 2,
    /// Release of a publication the driver does not know.
    UnknownPublication = 3,
    /// The channel endpoint could not be created or bound.
    ChannelEndpointError = 4,
    /// Reference to a counter id the driver does not know.
    UnknownCounter = 5,
    /// The command type id is not understood by the driver.
    UnknownCommandTypeId = 6,
    /// The command could not be decoded.
    MalformedCommand = 7,
    /// The requested operation is not supported.
    NotSupported = 8,
    /// The endpoint host could not be resolved.
    UnknownHost = 9,
    /// A resource is exhausted for now; the same request may succeed later.
    ResourceTemporarilyUnavailable = 10,
    /// Release of a registration id that was never registered.
    UnknownRegistrationId = 11,
}

impl ErrorCode {
    /// Every known code, in wire-value order.
    pub const ALL: &'static [ErrorCode] = &[
        Self::GenericError,
        Self::InvalidChannel,
        Self::UnknownSubscription,
        Self::UnknownPublication,
        Self::ChannelEndpointError,
        Self::UnknownCounter,
        Self::UnknownCommandTypeId,
        Self::MalformedCommand,
        Self::NotSupported,
        Self::UnknownHost,
        Self::ResourceTemporarilyUnavailable,
        Self::UnknownRegistrationId,
    ];

    /// The stable wire value.
    pub fn value(self) -> i32 {
        self as i32
    }

    /// The canonical upper-case name, e.g. `"INVALID_CHANNEL"`.
    pub fn name(self) -> &'static str {
        match self {
            Self::GenericError => "GENERIC_ERROR",
            Self::InvalidChannel => "INVALID_CHANNEL",
            Self::UnknownSubscription => "UNKNOWN_SUBSCRIPTION",
            Self::UnknownPublication => "UNKNOWN_PUBLICATION",
            Self::ChannelEndpointError => "CHANNEL_ENDPOINT_ERROR",
            Self::UnknownCounter => "UNKNOWN_COUNTER",
            Self::UnknownCommandTypeId => "UNKNOWN_COMMAND_TYPE_ID",
            Self::MalformedCommand => "MALFORMED_COMMAND",
            Self::NotSupported => "NOT_SUPPORTED",
            Self::UnknownHost => "UNKNOWN_HOST",
            Self::ResourceTemporarilyUnavailable => "RESOURCE_TEMPORARILY_UNAVAILABLE",
            Self::UnknownRegistrationId => "UNKNOWN_REGISTRATION_ID",
        }
    }
}

impl TryFrom<i32> for ErrorCode {
    type Error = UnknownErrorCode;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.value() == value)
            .ok_or(UnknownErrorCode(value))
    }
}

impl From<ErrorCode> for i32 {
    fn from(code: ErrorCode) -> Self {
        code.value()
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
