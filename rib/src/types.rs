// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Formatter};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// An IPv4 destination prefix. The address never carries bits past the
/// mask length; every constructor clears them.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
)]
pub struct Prefix4 {
    pub value: Ipv4Addr,
    pub length: u8,
}

impl Prefix4 {
    /// Build the /`length` prefix covering `ip`. Lengths past 32 are
    /// clamped, and address bits past the mask are cleared:
    ///
    /// ```
    /// use rib::Prefix4;
    /// use std::net::Ipv4Addr;
    /// let p = Prefix4::new(Ipv4Addr::new(10, 1, 2, 3), 8);
    /// assert_eq!(p.to_string(), "10.0.0.0/8");
    /// ```
    pub fn new(ip: Ipv4Addr, length: u8) -> Self {
        let length = length.min(32);
        Self {
            value: Ipv4Addr::from_bits(ip.to_bits() & Self::netmask(length)),
            length,
        }
    }

    // All ones over the network bits, zero over the host bits.
    fn netmask(length: u8) -> u32 {
        u32::MAX
            .checked_shl(32u32.saturating_sub(u32::from(length)))
            .unwrap_or(0)
    }

    pub fn host_bits_are_unset(&self) -> bool {
        self.value.to_bits() & !Self::netmask(self.length) == 0
    }

    pub fn unset_host_bits(&mut self) {
        *self = Self::new(self.value, self.length);
    }
}

impl fmt::Display for Prefix4 {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.value, self.length)
    }
}

impl FromStr for Prefix4 {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, len) = s
            .split_once('/')
            .ok_or_else(|| format!("expected <address>/<length>: {s}"))?;
        let addr: Ipv4Addr =
            addr.parse().map_err(|_| format!("bad address: {addr}"))?;
        let len: u8 = len.parse().map_err(|_| format!("bad length: {len}"))?;
        if len > 32 {
            return Err(format!("length {len} exceeds 32"));
        }
        Ok(Self::new(addr, len))
    }
}

/// An IPv6 destination prefix, with the same no-host-bits invariant as
/// [`Prefix4`].
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
)]
pub struct Prefix6 {
    pub value: Ipv6Addr,
    pub length: u8,
}

impl Prefix6 {
    /// Build the /`length` prefix covering `ip`, clamping the length to
    /// 128 and clearing address bits past the mask:
    ///
    /// ```
    /// use rib::Prefix6;
    /// use std::net::Ipv6Addr;
    /// let p = Prefix6::new("2001:db8::1".parse::<Ipv6Addr>().unwrap(), 64);
    /// assert_eq!(p.to_string(), "2001:db8::/64");
    /// ```
    pub fn new(ip: Ipv6Addr, length: u8) -> Self {
        let length = length.min(128);
        Self {
            value: Ipv6Addr::from_bits(ip.to_bits() & Self::netmask(length)),
            length,
        }
    }

    // All ones over the network bits, zero over the host bits.
    fn netmask(length: u8) -> u128 {
        u128::MAX
            .checked_shl(128u32.saturating_sub(u32::from(length)))
            .unwrap_or(0)
    }

    pub fn host_bits_are_unset(&self) -> bool {
        self.value.to_bits() & !Self::netmask(self.length) == 0
    }

    pub fn unset_host_bits(&mut self) {
        *self = Self::new(self.value, self.length);
    }
}

impl fmt::Display for Prefix6 {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.value, self.length)
    }
}

impl FromStr for Prefix6 {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, len) = s
            .split_once('/')
            .ok_or_else(|| format!("expected <address>/<length>: {s}"))?;
        let addr: Ipv6Addr =
            addr.parse().map_err(|_| format!("bad address: {addr}"))?;
        let len: u8 = len.parse().map_err(|_| format!("bad length: {len}"))?;
        if len > 128 {
            return Err(format!("length {len} exceeds 128"));
        }
        Ok(Self::new(addr, len))
    }
}

/// A destination prefix of either address family.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
)]
pub enum Prefix {
    V4(Prefix4),
    V6(Prefix6),
}

impl Prefix {
    pub fn new(ip: IpAddr, length: u8) -> Self {
        match ip {
            IpAddr::V4(ip4) => Self::V4(Prefix4::new(ip4, length)),
            IpAddr::V6(ip6) => Self::V6(Prefix6::new(ip6, length)),
        }
    }

    /// Mask length in bits.
    pub fn length(&self) -> u8 {
        match self {
            Self::V4(p4) => p4.length,
            Self::V6(p6) => p6.length,
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4(p) => fmt::Display::fmt(p, f),
            Self::V6(p) => fmt::Display::fmt(p, f),
        }
    }
}

impl From<Prefix4> for Prefix {
    fn from(value: Prefix4) -> Self {
        Self::V4(value)
    }
}

impl From<Prefix6> for Prefix {
    fn from(value: Prefix6) -> Self {
        Self::V6(value)
    }
}

impl FromStr for Prefix {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Only v6 textual addresses contain a colon
        if s.contains(':') {
            s.parse().map(Self::V6)
        } else {
            s.parse().map(Self::V4)
        }
    }
}

/// The protocols a path may originate from, ordered by administrative
/// preference. A locally configured static route outranks anything learned
/// from a dynamic protocol.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[repr(u8)]
pub enum Protocol {
    Static = 1,
    Bgp = 2,
    Ospf = 3,
    Isis = 4,
}

/// A candidate path to a prefix, tagged by the protocol that produced it.
///
/// Paths are immutable values. Two paths are equal iff they carry the same
/// protocol tag and all payload fields match; the route entry deduplicates
/// and withdraws by this structural equality.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
)]
pub enum Path {
    Static(StaticPath),
    Bgp(BgpPath),
    Ospf(OspfPath),
    Isis(IsisPath),
}

impl Path {
    pub fn protocol(&self) -> Protocol {
        match self {
            Self::Static(_) => Protocol::Static,
            Self::Bgp(_) => Protocol::Bgp,
            Self::Ospf(_) => Protocol::Ospf,
            Self::Isis(_) => Protocol::Isis,
        }
    }

    pub fn nexthop(&self) -> IpAddr {
        match self {
            Self::Static(p) => p.nexthop,
            Self::Bgp(p) => p.nexthop,
            Self::Ospf(p) => p.nexthop,
            Self::Isis(p) => p.nexthop,
        }
    }
}

/// A locally configured route.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
)]
pub struct StaticPath {
    pub nexthop: IpAddr,
}

/// A path learned over a BGP session, carrying the attributes the decision
/// process in [`crate::bestpath`] runs over.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
)]
pub struct BgpPath {
    pub nexthop: IpAddr,
    /// Address of the peer the path was learned from.
    pub peer: IpAddr,
    /// Router id of the peer the path was learned from.
    pub id: u32,
    /// The neighboring AS the path was learned from. MED values are only
    /// comparable between paths sharing this.
    pub neighbor_as: u32,
    pub local_pref: Option<u32>,
    pub as_path: Vec<u32>,
    pub origin: RouteOrigin,
    pub med: Option<u32>,
    pub communities: Vec<u32>,
    /// True when the session to `peer` crosses an AS boundary.
    pub ebgp: bool,
    /// IGP cost to reach `nexthop`, when the lower routing layer has one.
    pub igp_cost: Option<u32>,
}

/// Origin of a BGP path, ordered by preference: routes originated inside an
/// IGP beat those learned via EGP beat everything else.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
)]
pub enum RouteOrigin {
    Igp,
    Egp,
    Incomplete,
}

/// A path computed by the OSPF subsystem. The route entry only arbitrates
/// on the metric; SPF construction happens elsewhere.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
)]
pub struct OspfPath {
    pub nexthop: IpAddr,
    pub metric: u32,
}

/// A path computed by the IS-IS subsystem.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
)]
pub struct IsisPath {
    pub nexthop: IpAddr,
    pub metric: u32,
}
