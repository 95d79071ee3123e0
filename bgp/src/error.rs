// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use num_enum::TryFromPrimitive;

/// A protocol error as surfaced to the session layer.
///
/// Every decode failure carries the RFC 4271 §4.5 error code and subcode
/// the session FSM needs to emit a Notification before tearing the
/// connection down, plus a human-readable account of what went wrong.
/// `Cease/0` marks connection-level failures with no more specific code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} ({code}/{subcode})")]
pub struct BgpError {
    pub code: u8,
    pub subcode: u8,
    pub message: String,
}

/// Top-level notification error codes.
///
/// Ref: RFC 4271 §4.5
#[derive(Debug, Eq, PartialEq, Copy, Clone, TryFromPrimitive)]
#[repr(u8)]
pub enum ErrorCode {
    MessageHeader = 1,
    OpenMessage = 2,
    UpdateMessage = 3,
    HoldTimerExpired = 4,
    FiniteStateMachine = 5,
    Cease = 6,
}

/// Subcodes for [`ErrorCode::MessageHeader`].
///
/// Ref: RFC 4271 §6.1
#[derive(Debug, Eq, PartialEq, Copy, Clone, TryFromPrimitive)]
#[repr(u8)]
pub enum HeaderErrorSubcode {
    ConnectionNotSynchronized = 1,
    BadMessageLength = 2,
    BadMessageType = 3,
}

/// Subcodes for [`ErrorCode::OpenMessage`]. Subcode 5 was assigned to
/// authentication failure before RFC 4271 deprecated it; it is never valid
/// on the wire.
///
/// Ref: RFC 4271 §6.2
#[derive(Debug, Eq, PartialEq, Copy, Clone, TryFromPrimitive)]
#[repr(u8)]
pub enum OpenErrorSubcode {
    UnsupportedVersionNumber = 1,
    BadPeerAs = 2,
    BadBgpIdentifier = 3,
    UnsupportedOptionalParameter = 4,
    Deprecated5 = 5,
    UnacceptableHoldTime = 6,
}

/// Subcodes for [`ErrorCode::UpdateMessage`]. Subcode 7 is deprecated the
/// same way as open subcode 5.
///
/// Ref: RFC 4271 §6.3
#[derive(Debug, Eq, PartialEq, Copy, Clone, TryFromPrimitive)]
#[repr(u8)]
pub enum UpdateErrorSubcode {
    MalformedAttributeList = 1,
    UnrecognizedWellKnownAttribute = 2,
    MissingWellKnownAttribute = 3,
    AttributeFlagsError = 4,
    AttributeLengthError = 5,
    InvalidOriginAttribute = 6,
    Deprecated7 = 7,
    InvalidNextHopAttribute = 8,
    OptionalAttributeError = 9,
    InvalidNetworkField = 10,
    MalformedAsPath = 11,
}

impl BgpError {
    pub fn header(
        subcode: HeaderErrorSubcode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code: ErrorCode::MessageHeader as u8,
            subcode: subcode as u8,
            message: message.into(),
        }
    }

    pub fn open(subcode: OpenErrorSubcode, message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::OpenMessage as u8,
            subcode: subcode as u8,
            message: message.into(),
        }
    }

    pub fn update(
        subcode: UpdateErrorSubcode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code: ErrorCode::UpdateMessage as u8,
            subcode: subcode as u8,
            message: message.into(),
        }
    }

    /// A connection-level failure: the buffer gave out before the common
    /// header completed, or an outbound message cannot be framed.
    pub fn cease(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Cease as u8,
            subcode: 0,
            message: message.into(),
        }
    }

    /// Diagnostic for a received notification whose error code is outside
    /// the RFC 4271 registry. Carries the received pair.
    pub fn invalid_code(code: u8, subcode: u8) -> Self {
        Self {
            code,
            subcode,
            message: format!("invalid error code {code}"),
        }
    }

    /// Diagnostic for a received notification whose subcode is not valid
    /// for its error code. Carries the received pair.
    pub fn invalid_subcode(code: u8, subcode: u8) -> Self {
        Self {
            code,
            subcode,
            message: format!("invalid error subcode {code}/{subcode}"),
        }
    }

    /// The `(code, subcode)` pair to place in an outbound notification.
    pub fn code_pair(&self) -> (u8, u8) {
        (self.code, self.subcode)
    }
}
