// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::error::{
    BgpError, ErrorCode, HeaderErrorSubcode, OpenErrorSubcode,
    UpdateErrorSubcode,
};
use crate::wire::ReadBytes;
use num_enum::TryFromPrimitive;
use rib::Prefix4;
use std::net::Ipv4Addr;

/// BGP Message types.
///
/// Ref: RFC 4271 §4.1
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, Copy, Clone)]
#[repr(u8)]
pub enum MessageType {
    /// The first message sent by each side once a TCP connection is
    /// established.
    ///
    /// RFC 4271 §4.2
    Open = 1,

    /// Used to transfer routing information between BGP peers.
    ///
    /// RFC 4271 §4.3
    Update = 2,

    /// Sent when an error condition is detected.
    ///
    /// RFC 4271 §4.5
    Notification = 3,

    /// Exchanged between peers often enough not to cause the hold timer to
    /// expire.
    ///
    /// RFC 4271 §4.4
    KeepAlive = 4,
}

/// According to RFC 4271 §4.1 the header marker is all ones.
pub const MARKER: [u8; 16] = [0xffu8; 16];

/// Wire size of the common header, and thus the smallest legal message.
pub const HEADER_LENGTH: u16 = 19;

/// The largest legal message, header included.
pub const MAX_MESSAGE_LENGTH: u16 = 4096;

/// The version number for BGP-4.
pub const BGP4: u8 = 4;

/// Each BGP message has a fixed sized header.
///
/// ```text
/// 0                   1                   2                   3
/// 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
///   +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///   |                                                               |
///   +                                                               +
///   |                                                               |
///   +                                                               +
///   |                           Marker                              |
///   +                                                               +
///   |                                                               |
///   +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///   |          Length               |      Type     |
///   +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// This object contains the length and type fields. The marker is
/// generated when [`Header::to_wire`] is called and consumed when
/// [`Header::from_wire`] is called. The body of the message occupies
/// `length - 19` bytes after the header.
///
/// Ref: RFC 4271 §4.1
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct Header {
    /// Total length of the message, including the header. May be no larger
    /// than 4096.
    pub length: u16,

    /// Indicates the type of message.
    pub typ: MessageType,
}

impl Header {
    /// Create a new BGP message header. Length must be between 19 and 4096
    /// per RFC 4271 §4.1.
    pub fn new(length: u16, typ: MessageType) -> Result<Header, BgpError> {
        if !(HEADER_LENGTH..=MAX_MESSAGE_LENGTH).contains(&length) {
            return Err(BgpError::header(
                HeaderErrorSubcode::BadMessageLength,
                format!("invalid length for BGP header: {length}"),
            ));
        }
        Ok(Header { length, typ })
    }

    /// Serialize the header to wire format.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut buf = MARKER.to_vec();
        buf.extend_from_slice(&self.length.to_be_bytes());
        buf.push(self.typ as u8);
        buf
    }

    /// Deserialize a header from wire format. An underflow before the
    /// header completes is a connection-level failure (`Cease/0`); a
    /// malformed header gets the RFC 4271 §6.1 subcode that names the bad
    /// field.
    pub fn from_wire(buf: &mut &[u8]) -> Result<Header, BgpError> {
        let cease = |u: crate::wire::Underflow| BgpError::cease(u.to_string());

        let marker = buf.read_bytes(16, "marker").map_err(cease)?;
        if marker != MARKER {
            return Err(BgpError::header(
                HeaderErrorSubcode::ConnectionNotSynchronized,
                format!("invalid marker: {marker:x?}"),
            ));
        }

        let length = buf.read_u16("length").map_err(cease)?;
        let typ = buf.read_u8("type").map_err(cease)?;

        if !(HEADER_LENGTH..=MAX_MESSAGE_LENGTH).contains(&length) {
            return Err(BgpError::header(
                HeaderErrorSubcode::BadMessageLength,
                format!("invalid length in BGP header: {length}"),
            ));
        }

        let typ = MessageType::try_from(typ).map_err(|_| {
            BgpError::header(
                HeaderErrorSubcode::BadMessageType,
                format!("invalid message type: {typ}"),
            )
        })?;

        Ok(Header { length, typ })
    }
}

/// A BGP message as handed to the session layer.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Message {
    Open(OpenMessage),
    Update(UpdateMessage),
    Notification(NotificationMessage),
    KeepAlive,
}

impl From<&Message> for MessageType {
    fn from(m: &Message) -> MessageType {
        match m {
            Message::Open(_) => MessageType::Open,
            Message::Update(_) => MessageType::Update,
            Message::Notification(_) => MessageType::Notification,
            Message::KeepAlive => MessageType::KeepAlive,
        }
    }
}

impl Message {
    /// Deserialize one message, header included, advancing `buf` past it.
    /// Underflow inside a body surfaces as that body's malformed code; the
    /// header length field bounds how much of `buf` is consumed.
    pub fn from_wire(buf: &mut &[u8]) -> Result<Message, BgpError> {
        let header = Header::from_wire(buf)?;

        let body_len = usize::from(header.length - HEADER_LENGTH);
        let mut body =
            buf.split_to(body_len, "message body").map_err(|u| match header.typ
            {
                MessageType::Update => BgpError::update(
                    UpdateErrorSubcode::MalformedAttributeList,
                    u.to_string(),
                ),
                _ => BgpError::header(
                    HeaderErrorSubcode::BadMessageLength,
                    u.to_string(),
                ),
            })?;

        Ok(match header.typ {
            MessageType::Open => {
                Message::Open(OpenMessage::from_wire(&mut body)?)
            }
            MessageType::Update => {
                Message::Update(UpdateMessage::from_wire(&mut body)?)
            }
            MessageType::Notification => {
                Message::Notification(NotificationMessage::from_wire(&mut body)?)
            }
            MessageType::KeepAlive => {
                if body.remaining() != 0 {
                    return Err(BgpError::header(
                        HeaderErrorSubcode::BadMessageLength,
                        format!(
                            "keepalive length must be {HEADER_LENGTH}, got {}",
                            header.length
                        ),
                    ));
                }
                Message::KeepAlive
            }
        })
    }

    /// Serialize a message to wire format, header included.
    pub fn to_wire(&self) -> Result<Vec<u8>, BgpError> {
        let body = match self {
            Message::Open(m) => m.to_wire()?,
            Message::Update(m) => m.to_wire()?,
            Message::Notification(m) => m.to_wire(),
            Message::KeepAlive => Vec::new(),
        };

        let length = body.len() + usize::from(HEADER_LENGTH);
        if length > usize::from(MAX_MESSAGE_LENGTH) {
            return Err(BgpError::cease(format!(
                "message of {length} bytes exceeds {MAX_MESSAGE_LENGTH}"
            )));
        }

        let header = Header {
            length: length as u16,
            typ: MessageType::from(self),
        };
        let mut buf = header.to_wire();
        buf.extend_from_slice(&body);
        Ok(buf)
    }
}

/// Parse one BGP message out of a caller-owned buffer.
///
/// On failure the [`BgpError`] carries the code/subcode pair the session
/// layer places in its outbound Notification. Trailing bytes past the
/// message are left untouched; sessions walking a stream use
/// [`Message::from_wire`] directly to track consumption.
pub fn decode(buf: &[u8]) -> Result<Message, BgpError> {
    let mut cursor = buf;
    Message::from_wire(&mut cursor)
}

/// The first message sent by each side once a TCP connection is
/// established.
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |    Version    |     My Autonomous System      |   Hold Time   :
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// :               |                BGP Identifier                 :
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// :               | Opt Parm Len  |     Optional Parameters       :
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// :                                                               :
/// :             Optional Parameters (cont, variable)              :
/// :                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// Optional parameters are framed here but carried opaquely; capability
/// negotiation happens in the session layer.
///
/// Ref: RFC 4271 §4.2
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct OpenMessage {
    /// BGP protocol version.
    pub version: u8,

    /// Autonomous system number of the sender.
    pub asn: u16,

    /// Number of seconds the sender proposes for the hold timer.
    pub hold_time: u16,

    /// BGP identifier of the sender.
    pub id: u32,

    /// Raw optional parameter bytes, as received.
    pub opt_params: Vec<u8>,
}

impl OpenMessage {
    /// Create a new open message with no optional parameters.
    pub fn new(asn: u16, hold_time: u16, id: u32) -> OpenMessage {
        OpenMessage {
            version: BGP4,
            asn,
            hold_time,
            id,
            opt_params: Vec::new(),
        }
    }

    /// Serialize an open message to wire format.
    pub fn to_wire(&self) -> Result<Vec<u8>, BgpError> {
        if self.opt_params.len() > usize::from(u8::MAX) {
            return Err(BgpError::cease(format!(
                "optional parameters of {} bytes exceed 255",
                self.opt_params.len()
            )));
        }

        let mut buf = vec![self.version];
        buf.extend_from_slice(&self.asn.to_be_bytes());
        buf.extend_from_slice(&self.hold_time.to_be_bytes());
        buf.extend_from_slice(&self.id.to_be_bytes());
        buf.push(self.opt_params.len() as u8);
        buf.extend_from_slice(&self.opt_params);
        Ok(buf)
    }

    /// Deserialize an open message from wire format. A body shorter than
    /// its fields means the header length field lied, so truncation maps
    /// to `MessageHeader/BadMessageLength`.
    pub fn from_wire(buf: &mut &[u8]) -> Result<OpenMessage, BgpError> {
        let truncated = |u: crate::wire::Underflow| {
            BgpError::header(HeaderErrorSubcode::BadMessageLength, u.to_string())
        };

        let version = buf.read_u8("version").map_err(truncated)?;
        let asn = buf.read_u16("autonomous system").map_err(truncated)?;
        let hold_time = buf.read_u16("hold time").map_err(truncated)?;
        let id = buf.read_u32("bgp identifier").map_err(truncated)?;
        let opt_len = buf
            .read_u8("optional parameter length")
            .map_err(truncated)?;
        let opt_params = buf
            .read_bytes(usize::from(opt_len), "optional parameters")
            .map_err(truncated)?;

        if buf.remaining() != 0 {
            return Err(BgpError::header(
                HeaderErrorSubcode::BadMessageLength,
                format!(
                    "{} trailing bytes after optional parameters",
                    buf.remaining()
                ),
            ));
        }

        let msg = OpenMessage {
            version,
            asn,
            hold_time,
            id,
            opt_params,
        };
        msg.validate()?;
        Ok(msg)
    }

    fn validate(&self) -> Result<(), BgpError> {
        if self.version != BGP4 {
            return Err(BgpError::open(
                OpenErrorSubcode::UnsupportedVersionNumber,
                format!("unsupported version number: {}", self.version),
            ));
        }

        let id = Ipv4Addr::from(self.id);
        if !valid_identifier(id) {
            return Err(BgpError::open(
                OpenErrorSubcode::BadBgpIdentifier,
                format!("invalid bgp identifier: {id}"),
            ));
        }

        // Hold times of 1 and 2 seconds cannot be honored (RFC 4271 §6.2)
        if self.hold_time == 1 || self.hold_time == 2 {
            return Err(BgpError::open(
                OpenErrorSubcode::UnacceptableHoldTime,
                format!("unacceptable hold time: {}", self.hold_time),
            ));
        }

        Ok(())
    }
}

/// A BGP identifier must be a valid unicast host address: not loopback,
/// not multicast, not limited broadcast, and not inside 0.0.0.0/8.
fn valid_identifier(addr: Ipv4Addr) -> bool {
    !(addr.is_loopback()
        || addr.is_multicast()
        || addr.is_broadcast()
        || addr.octets()[0] == 0)
}

/// An update message advertises feasible routes sharing common path
/// attributes, withdraws unfeasible ones, or both.
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |        Withdrawn Length       |       Withdrawn Routes        :
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// :                                                               :
/// :                Withdrawn Routes (cont, variable)              :
/// :                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |    Path Attribute Length      |       Path Attributes         :
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// :                                                               :
/// :                Path Attributes (cont, variable)               :
/// :                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// :                                                               :
/// :       Network Layer Reachability Information (variable)       :
/// :                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// Ref: RFC 4271 §4.3
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct UpdateMessage {
    pub withdrawn: Vec<Prefix4>,
    pub path_attributes: Vec<PathAttribute>,
    pub nlri: Vec<Prefix4>,
}

impl UpdateMessage {
    pub fn to_wire(&self) -> Result<Vec<u8>, BgpError> {
        let mut buf = Vec::new();

        let mut withdrawn = Vec::new();
        for w in &self.withdrawn {
            withdrawn.extend_from_slice(&prefix4_to_wire(w));
        }
        if withdrawn.len() > usize::from(u16::MAX) {
            return Err(BgpError::cease("withdrawn routes too large"));
        }
        buf.extend_from_slice(&(withdrawn.len() as u16).to_be_bytes());
        buf.extend_from_slice(&withdrawn);

        let mut attrs = Vec::new();
        for pa in &self.path_attributes {
            attrs.extend_from_slice(&pa.to_wire()?);
        }
        if attrs.len() > usize::from(u16::MAX) {
            return Err(BgpError::cease("path attributes too large"));
        }
        buf.extend_from_slice(&(attrs.len() as u16).to_be_bytes());
        buf.extend_from_slice(&attrs);

        for n in &self.nlri {
            buf.extend_from_slice(&prefix4_to_wire(n));
        }

        Ok(buf)
    }

    /// Deserialize an update body. The withdrawn-routes and path-attribute
    /// regions are carved off by their declared lengths and must be
    /// consumed exactly; whatever remains is NLRI, and its length must be
    /// non-negative per RFC 4271 §6.3.
    pub fn from_wire(buf: &mut &[u8]) -> Result<UpdateMessage, BgpError> {
        let malformed = |u: crate::wire::Underflow| {
            BgpError::update(
                UpdateErrorSubcode::MalformedAttributeList,
                u.to_string(),
            )
        };

        let body_len = buf.remaining();

        let withdrawn_len =
            usize::from(buf.read_u16("withdrawn routes length").map_err(malformed)?);
        let mut withdrawn_buf =
            buf.split_to(withdrawn_len, "withdrawn routes").map_err(malformed)?;
        let withdrawn = prefixes_from_wire(&mut withdrawn_buf)?;

        let attrs_len = usize::from(
            buf.read_u16("total path attribute length").map_err(malformed)?,
        );
        if 4 + withdrawn_len + attrs_len > body_len {
            return Err(BgpError::update(
                UpdateErrorSubcode::MalformedAttributeList,
                format!(
                    "declared regions overrun the body: 4 + {withdrawn_len} + \
                     {attrs_len} > {body_len}"
                ),
            ));
        }
        let mut attrs_buf =
            buf.split_to(attrs_len, "path attributes").map_err(malformed)?;
        let path_attributes = path_attributes_from_wire(&mut attrs_buf)?;

        let nlri = prefixes_from_wire(buf)?;

        Ok(UpdateMessage {
            withdrawn,
            path_attributes,
            nlri,
        })
    }
}

/// Parse NLRI until the region is exhausted. Running out of bytes inside a
/// prefix is a syntax error in the network field.
fn prefixes_from_wire(buf: &mut &[u8]) -> Result<Vec<Prefix4>, BgpError> {
    let mut result = Vec::new();
    while buf.remaining() > 0 {
        result.push(prefix4_from_wire(buf)?);
    }
    Ok(result)
}

/// Decode one length-prefixed NLRI entry: a bit count followed by just
/// enough octets to hold it. Stray bits past the prefix length are zeroed.
fn prefix4_from_wire(buf: &mut &[u8]) -> Result<Prefix4, BgpError> {
    let invalid = |u: crate::wire::Underflow| {
        BgpError::update(UpdateErrorSubcode::InvalidNetworkField, u.to_string())
    };

    let bits = buf.read_u8("prefix length").map_err(invalid)?;
    if bits > 32 {
        return Err(BgpError::update(
            UpdateErrorSubcode::InvalidNetworkField,
            format!("prefix length of {bits} bits exceeds 32"),
        ));
    }

    let n = (usize::from(bits) + 7) / 8;
    let raw = buf.read_bytes(n, "prefix").map_err(invalid)?;
    let mut octets = [0u8; 4];
    octets[..n].copy_from_slice(&raw);

    Ok(Prefix4::new(Ipv4Addr::from(octets), bits))
}

fn prefix4_to_wire(p: &Prefix4) -> Vec<u8> {
    let n = (usize::from(p.length) + 7) / 8;
    let mut buf = vec![p.length];
    buf.extend_from_slice(&p.value.octets()[..n]);
    buf
}

/// Parse path attributes until the region is exhausted. Unrecognized
/// optional non-transitive attributes are dropped here, so the result may
/// hold fewer attributes than the wire did.
fn path_attributes_from_wire(
    buf: &mut &[u8],
) -> Result<Vec<PathAttribute>, BgpError> {
    let mut result = Vec::new();
    while buf.remaining() > 0 {
        if let Some(pa) = PathAttribute::from_wire(buf)? {
            result.push(pa);
        }
    }
    Ok(result)
}

/// Attribute flag bits, MSB first: optional, transitive, partial,
/// extended length. Extended length widens the length field to 16 bits.
///
/// Ref: RFC 4271 §4.3
#[derive(Debug, PartialEq, Eq, Copy, Clone, Default)]
pub struct PathAttributeFlags {
    pub optional: bool,
    pub transitive: bool,
    pub partial: bool,
    pub extended_length: bool,
}

impl PathAttributeFlags {
    const OPTIONAL: u8 = 0b1000_0000;
    const TRANSITIVE: u8 = 0b0100_0000;
    const PARTIAL: u8 = 0b0010_0000;
    const EXTENDED_LENGTH: u8 = 0b0001_0000;

    /// Flags for a well-known attribute.
    pub fn well_known() -> Self {
        Self {
            transitive: true,
            ..Default::default()
        }
    }

    pub fn optional_transitive() -> Self {
        Self {
            optional: true,
            transitive: true,
            ..Default::default()
        }
    }

    pub fn optional_non_transitive() -> Self {
        Self {
            optional: true,
            ..Default::default()
        }
    }

    pub fn from_wire(flags: u8) -> Self {
        Self {
            optional: flags & Self::OPTIONAL != 0,
            transitive: flags & Self::TRANSITIVE != 0,
            partial: flags & Self::PARTIAL != 0,
            extended_length: flags & Self::EXTENDED_LENGTH != 0,
        }
    }

    pub fn to_wire(&self) -> u8 {
        let mut flags = 0;
        if self.optional {
            flags |= Self::OPTIONAL;
        }
        if self.transitive {
            flags |= Self::TRANSITIVE;
        }
        if self.partial {
            flags |= Self::PARTIAL;
        }
        if self.extended_length {
            flags |= Self::EXTENDED_LENGTH;
        }
        flags
    }
}

/// Path attribute type codes assigned by RFC 4271 and RFC 1997.
#[derive(Debug, PartialEq, Eq, Copy, Clone, TryFromPrimitive)]
#[repr(u8)]
pub enum PathAttributeTypeCode {
    /// RFC 4271
    Origin = 1,
    AsPath = 2,
    NextHop = 3,
    MultiExitDisc = 4,
    LocalPref = 5,
    AtomicAggregate = 6,
    Aggregator = 7,

    /// RFC 1997
    Communities = 8,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct PathAttribute {
    pub flags: PathAttributeFlags,
    pub value: PathAttributeValue,
}

impl PathAttribute {
    pub fn type_code(&self) -> u8 {
        self.value.type_code()
    }

    pub fn to_wire(&self) -> Result<Vec<u8>, BgpError> {
        let value = self.value.to_wire()?;

        let mut flags = self.flags;
        // Unknown transitive attributes that passed through this speaker
        // are re-advertised with the partial bit set (RFC 4271 §5).
        if matches!(self.value, PathAttributeValue::Opaque { .. }) {
            flags.partial = true;
        }
        flags.extended_length =
            flags.extended_length || value.len() > usize::from(u8::MAX);

        let mut buf = vec![flags.to_wire(), self.type_code()];
        if flags.extended_length {
            if value.len() > usize::from(u16::MAX) {
                return Err(BgpError::cease("attribute value too large"));
            }
            buf.extend_from_slice(&(value.len() as u16).to_be_bytes());
        } else {
            buf.push(value.len() as u8);
        }
        buf.extend_from_slice(&value);
        Ok(buf)
    }

    /// Deserialize one attribute. Returns `None` for an unrecognized
    /// optional non-transitive attribute, which RFC 4271 §5 says to
    /// quietly ignore; its bytes are consumed either way.
    pub fn from_wire(
        buf: &mut &[u8],
    ) -> Result<Option<PathAttribute>, BgpError> {
        let malformed = |u: crate::wire::Underflow| {
            BgpError::update(
                UpdateErrorSubcode::MalformedAttributeList,
                u.to_string(),
            )
        };

        let flags = PathAttributeFlags::from_wire(
            buf.read_u8("attribute flags").map_err(malformed)?,
        );
        let type_code = buf.read_u8("attribute type code").map_err(malformed)?;

        let len = if flags.extended_length {
            usize::from(buf.read_u16("attribute length").map_err(malformed)?)
        } else {
            usize::from(buf.read_u8("attribute length").map_err(malformed)?)
        };
        let mut value = buf.split_to(len, "attribute value").map_err(|u| {
            BgpError::update(
                UpdateErrorSubcode::AttributeLengthError,
                u.to_string(),
            )
        })?;

        let typ = match PathAttributeTypeCode::try_from(type_code) {
            Ok(typ) => typ,
            Err(_) => {
                if flags.optional && flags.transitive {
                    return Ok(Some(PathAttribute {
                        flags,
                        value: PathAttributeValue::Opaque {
                            type_code,
                            value: value.to_vec(),
                        },
                    }));
                }
                if flags.optional {
                    return Ok(None);
                }
                return Err(BgpError::update(
                    UpdateErrorSubcode::UnrecognizedWellKnownAttribute,
                    format!("unrecognized well-known attribute {type_code}"),
                ));
            }
        };

        check_flags(typ, flags)?;
        let value = PathAttributeValue::from_wire(&mut value, typ)?;
        Ok(Some(PathAttribute { flags, value }))
    }
}

/// Flag bits required for each recognized attribute (RFC 4271 §5). A
/// recognized attribute whose optional/transitive bits conflict with its
/// type code is an attribute flags error.
fn check_flags(
    typ: PathAttributeTypeCode,
    flags: PathAttributeFlags,
) -> Result<(), BgpError> {
    use PathAttributeTypeCode::*;
    let (optional, transitive) = match typ {
        Origin | AsPath | NextHop | LocalPref | AtomicAggregate => (false, true),
        MultiExitDisc => (true, false),
        Aggregator | Communities => (true, true),
    };

    if flags.optional != optional || flags.transitive != transitive {
        return Err(BgpError::update(
            UpdateErrorSubcode::AttributeFlagsError,
            format!(
                "flags {:#04x} conflict with attribute {typ:?}",
                flags.to_wire()
            ),
        ));
    }
    Ok(())
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum PathAttributeValue {
    Origin(PathOrigin),
    AsPath(Vec<AsPathSegment>),
    NextHop(Ipv4Addr),
    MultiExitDisc(u32),
    LocalPref(u32),
    AtomicAggregate,
    Aggregator(Aggregator),
    Communities(Vec<Community>),

    /// An unrecognized optional transitive attribute, preserved verbatim
    /// for re-advertisement.
    Opaque { type_code: u8, value: Vec<u8> },
}

impl PathAttributeValue {
    pub fn type_code(&self) -> u8 {
        match self {
            Self::Origin(_) => PathAttributeTypeCode::Origin as u8,
            Self::AsPath(_) => PathAttributeTypeCode::AsPath as u8,
            Self::NextHop(_) => PathAttributeTypeCode::NextHop as u8,
            Self::MultiExitDisc(_) => {
                PathAttributeTypeCode::MultiExitDisc as u8
            }
            Self::LocalPref(_) => PathAttributeTypeCode::LocalPref as u8,
            Self::AtomicAggregate => {
                PathAttributeTypeCode::AtomicAggregate as u8
            }
            Self::Aggregator(_) => PathAttributeTypeCode::Aggregator as u8,
            Self::Communities(_) => PathAttributeTypeCode::Communities as u8,
            Self::Opaque { type_code, .. } => *type_code,
        }
    }

    pub fn to_wire(&self) -> Result<Vec<u8>, BgpError> {
        Ok(match self {
            Self::Origin(origin) => vec![*origin as u8],
            Self::AsPath(segments) => {
                let mut buf = Vec::new();
                for s in segments {
                    buf.extend_from_slice(&s.to_wire()?);
                }
                buf
            }
            Self::NextHop(addr) => addr.octets().to_vec(),
            Self::MultiExitDisc(v) => v.to_be_bytes().to_vec(),
            Self::LocalPref(v) => v.to_be_bytes().to_vec(),
            Self::AtomicAggregate => Vec::new(),
            Self::Aggregator(a) => {
                let mut buf = a.asn.to_be_bytes().to_vec();
                buf.extend_from_slice(&a.addr.octets());
                buf
            }
            Self::Communities(cs) => {
                let mut buf = Vec::new();
                for c in cs {
                    buf.extend_from_slice(&c.0.to_be_bytes());
                }
                buf
            }
            Self::Opaque { value, .. } => value.clone(),
        })
    }

    /// Deserialize the value of a recognized attribute. The declared
    /// attribute length must match exactly what the type consumes.
    pub fn from_wire(
        buf: &mut &[u8],
        typ: PathAttributeTypeCode,
    ) -> Result<PathAttributeValue, BgpError> {
        let truncated = |u: crate::wire::Underflow| {
            BgpError::update(
                UpdateErrorSubcode::AttributeLengthError,
                u.to_string(),
            )
        };

        let value = match typ {
            PathAttributeTypeCode::Origin => {
                expect_len(buf, 1, "ORIGIN")?;
                let v = buf.read_u8("origin").map_err(truncated)?;
                let origin = PathOrigin::try_from(v).map_err(|_| {
                    BgpError::update(
                        UpdateErrorSubcode::InvalidOriginAttribute,
                        format!("invalid origin value {v}"),
                    )
                })?;
                PathAttributeValue::Origin(origin)
            }
            PathAttributeTypeCode::AsPath => {
                let mut segments = Vec::new();
                while buf.remaining() > 0 {
                    segments.push(AsPathSegment::from_wire(buf)?);
                }
                PathAttributeValue::AsPath(segments)
            }
            PathAttributeTypeCode::NextHop => {
                expect_len(buf, 4, "NEXT_HOP")?;
                let addr =
                    Ipv4Addr::from(buf.read_u32("next hop").map_err(truncated)?);
                if addr.is_multicast()
                    || addr.is_broadcast()
                    || addr.is_unspecified()
                {
                    return Err(BgpError::update(
                        UpdateErrorSubcode::InvalidNextHopAttribute,
                        format!("next hop {addr} is not a unicast host"),
                    ));
                }
                PathAttributeValue::NextHop(addr)
            }
            PathAttributeTypeCode::MultiExitDisc => {
                expect_len(buf, 4, "MULTI_EXIT_DISC")?;
                PathAttributeValue::MultiExitDisc(
                    buf.read_u32("multi exit disc").map_err(truncated)?,
                )
            }
            PathAttributeTypeCode::LocalPref => {
                expect_len(buf, 4, "LOCAL_PREF")?;
                PathAttributeValue::LocalPref(
                    buf.read_u32("local pref").map_err(truncated)?,
                )
            }
            PathAttributeTypeCode::AtomicAggregate => {
                expect_len(buf, 0, "ATOMIC_AGGREGATE")?;
                PathAttributeValue::AtomicAggregate
            }
            PathAttributeTypeCode::Aggregator => {
                expect_len(buf, 6, "AGGREGATOR")?;
                let asn = buf.read_u16("aggregator as").map_err(truncated)?;
                let addr = Ipv4Addr::from(
                    buf.read_u32("aggregator address").map_err(truncated)?,
                );
                PathAttributeValue::Aggregator(Aggregator { asn, addr })
            }
            PathAttributeTypeCode::Communities => {
                if buf.remaining() % 4 != 0 {
                    return Err(BgpError::update(
                        UpdateErrorSubcode::AttributeLengthError,
                        format!(
                            "COMMUNITIES length {} is not a multiple of 4",
                            buf.remaining()
                        ),
                    ));
                }
                let mut communities = Vec::new();
                while buf.remaining() > 0 {
                    communities.push(Community(
                        buf.read_u32("community").map_err(truncated)?,
                    ));
                }
                PathAttributeValue::Communities(communities)
            }
        };

        Ok(value)
    }
}

fn expect_len(
    buf: &&[u8],
    want: usize,
    what: &str,
) -> Result<(), BgpError> {
    if buf.remaining() != want {
        return Err(BgpError::update(
            UpdateErrorSubcode::AttributeLengthError,
            format!(
                "{what} attribute must be {want} bytes, got {}",
                buf.remaining()
            ),
        ));
    }
    Ok(())
}

/// Origin of the path information carried in an update.
///
/// Ref: RFC 4271 §4.3, §5.1.1
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Copy, Clone, TryFromPrimitive)]
#[repr(u8)]
pub enum PathOrigin {
    Igp = 0,
    Egp = 1,
    Incomplete = 2,
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct Aggregator {
    pub asn: u16,
    pub addr: Ipv4Addr,
}

/// An RFC 1997 community value: the high half names an AS, the low half is
/// an operator-assigned tag.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Copy, Clone)]
pub struct Community(pub u32);

impl Community {
    pub const NO_EXPORT: Community = Community(0xffff_ff01);
    pub const NO_ADVERTISE: Community = Community(0xffff_ff02);
    pub const NO_EXPORT_SUBCONFED: Community = Community(0xffff_ff03);

    pub fn asn(&self) -> u16 {
        (self.0 >> 16) as u16
    }

    pub fn value(&self) -> u16 {
        self.0 as u16
    }
}

impl std::fmt::Display for Community {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.asn(), self.value())
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct AsPathSegment {
    pub typ: AsPathType,
    pub value: Vec<u16>,
}

impl AsPathSegment {
    pub fn to_wire(&self) -> Result<Vec<u8>, BgpError> {
        if self.value.len() > usize::from(u8::MAX) {
            return Err(BgpError::cease("AS path segment exceeds 255 entries"));
        }
        let mut buf = vec![self.typ as u8, self.value.len() as u8];
        for asn in &self.value {
            buf.extend_from_slice(&asn.to_be_bytes());
        }
        Ok(buf)
    }

    pub fn from_wire(buf: &mut &[u8]) -> Result<AsPathSegment, BgpError> {
        let malformed = |u: crate::wire::Underflow| {
            BgpError::update(UpdateErrorSubcode::MalformedAsPath, u.to_string())
        };

        let typ = buf.read_u8("segment type").map_err(malformed)?;
        let typ = AsPathType::try_from(typ).map_err(|_| {
            BgpError::update(
                UpdateErrorSubcode::MalformedAsPath,
                format!("invalid segment type {typ}"),
            )
        })?;

        let count = buf.read_u8("segment length").map_err(malformed)?;
        let mut value = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            value.push(buf.read_u16("segment value").map_err(malformed)?);
        }

        Ok(AsPathSegment { typ, value })
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, TryFromPrimitive)]
#[repr(u8)]
pub enum AsPathType {
    AsSet = 1,
    AsSequence = 2,
}

/// Sent when an error condition is detected; the sender closes the
/// connection immediately afterwards.
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  Error code   | Error subcode |           Data                :
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// :                        Data (cont, variable)                  |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// Ref: RFC 4271 §4.5
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct NotificationMessage {
    pub error_code: u8,
    pub error_subcode: u8,
    pub data: Vec<u8>,
}

impl NotificationMessage {
    pub fn to_wire(&self) -> Vec<u8> {
        let mut buf = vec![self.error_code, self.error_subcode];
        buf.extend_from_slice(&self.data);
        buf
    }

    /// Deserialize a notification body. The code/subcode pair must be a
    /// valid RFC 4271 assignment; on violation the bytes are still
    /// consumed and the diagnostic carries the received pair.
    pub fn from_wire(
        buf: &mut &[u8],
    ) -> Result<NotificationMessage, BgpError> {
        let truncated = |u: crate::wire::Underflow| {
            BgpError::header(HeaderErrorSubcode::BadMessageLength, u.to_string())
        };

        let error_code = buf.read_u8("error code").map_err(truncated)?;
        let error_subcode = buf.read_u8("error subcode").map_err(truncated)?;
        let rest = buf.remaining();
        let data = buf
            .read_bytes(rest, "notification data")
            .map_err(truncated)?;

        let msg = NotificationMessage {
            error_code,
            error_subcode,
            data,
        };
        msg.validate()?;
        Ok(msg)
    }

    fn validate(&self) -> Result<(), BgpError> {
        let code = ErrorCode::try_from(self.error_code).map_err(|_| {
            BgpError::invalid_code(self.error_code, self.error_subcode)
        })?;

        let sub = self.error_subcode;
        let valid = match code {
            ErrorCode::MessageHeader => {
                (1..=HeaderErrorSubcode::BadMessageType as u8).contains(&sub)
            }
            ErrorCode::OpenMessage => {
                (1..=OpenErrorSubcode::UnacceptableHoldTime as u8)
                    .contains(&sub)
                    && sub != OpenErrorSubcode::Deprecated5 as u8
            }
            ErrorCode::UpdateMessage => {
                (1..=UpdateErrorSubcode::MalformedAsPath as u8).contains(&sub)
                    && sub != UpdateErrorSubcode::Deprecated7 as u8
            }
            ErrorCode::HoldTimerExpired
            | ErrorCode::FiniteStateMachine
            | ErrorCode::Cease => sub == 0,
        };

        if valid {
            Ok(())
        } else {
            Err(BgpError::invalid_subcode(self.error_code, self.error_subcode))
        }
    }
}
