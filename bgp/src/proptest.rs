// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Property-based tests for BGP wire format using proptest
//!
//! These tests verify that every message the encoder can produce decodes
//! back to itself, and that header validation holds for arbitrary inputs.

use crate::messages::{
    decode, AsPathSegment, AsPathType, Community, Header, Message,
    MessageType, NotificationMessage, OpenMessage, PathAttribute,
    PathAttributeFlags, PathAttributeValue, PathOrigin, UpdateMessage,
};
use proptest::prelude::*;
use rib::Prefix4;
use std::net::Ipv4Addr;

// Strategy for generating valid IPv4 prefixes
fn ipv4_prefix_strategy() -> impl Strategy<Value = Prefix4> {
    (any::<u32>(), 0u8..=32u8).prop_map(|(addr_bits, length)| {
        Prefix4::new(Ipv4Addr::from(addr_bits), length)
    })
}

// Unicast host addresses, acceptable as a NEXT_HOP
fn unicast_strategy() -> impl Strategy<Value = Ipv4Addr> {
    (1u8..=223, any::<u8>(), any::<u8>(), any::<u8>())
        .prop_map(|(a, b, c, d)| Ipv4Addr::new(a, b, c, d))
}

// Identifiers that pass open message validation
fn identifier_strategy() -> impl Strategy<Value = u32> {
    (
        prop_oneof![1u8..=126, 128u8..=223],
        any::<u8>(),
        any::<u8>(),
        any::<u8>(),
    )
        .prop_map(|(a, b, c, d)| u32::from_be_bytes([a, b, c, d]))
}

fn origin_strategy() -> impl Strategy<Value = PathOrigin> {
    prop_oneof![
        Just(PathOrigin::Igp),
        Just(PathOrigin::Egp),
        Just(PathOrigin::Incomplete),
    ]
}

fn as_path_strategy() -> impl Strategy<Value = PathAttributeValue> {
    proptest::collection::vec(
        (
            prop_oneof![Just(AsPathType::AsSet), Just(AsPathType::AsSequence)],
            proptest::collection::vec(any::<u16>(), 0..8),
        ),
        0..4,
    )
    .prop_map(|segments| {
        PathAttributeValue::AsPath(
            segments
                .into_iter()
                .map(|(typ, value)| AsPathSegment { typ, value })
                .collect(),
        )
    })
}

fn path_attribute_strategy() -> impl Strategy<Value = PathAttribute> {
    prop_oneof![
        origin_strategy().prop_map(|o| PathAttribute {
            flags: PathAttributeFlags::well_known(),
            value: PathAttributeValue::Origin(o),
        }),
        as_path_strategy().prop_map(|v| PathAttribute {
            flags: PathAttributeFlags::well_known(),
            value: v,
        }),
        unicast_strategy().prop_map(|a| PathAttribute {
            flags: PathAttributeFlags::well_known(),
            value: PathAttributeValue::NextHop(a),
        }),
        any::<u32>().prop_map(|v| PathAttribute {
            flags: PathAttributeFlags::optional_non_transitive(),
            value: PathAttributeValue::MultiExitDisc(v),
        }),
        any::<u32>().prop_map(|v| PathAttribute {
            flags: PathAttributeFlags::well_known(),
            value: PathAttributeValue::LocalPref(v),
        }),
        Just(PathAttribute {
            flags: PathAttributeFlags::well_known(),
            value: PathAttributeValue::AtomicAggregate,
        }),
        (any::<u16>(), any::<u32>()).prop_map(|(asn, addr)| PathAttribute {
            flags: PathAttributeFlags::optional_transitive(),
            value: PathAttributeValue::Aggregator(
                crate::messages::Aggregator {
                    asn,
                    addr: Ipv4Addr::from(addr),
                },
            ),
        }),
        proptest::collection::vec(any::<u32>(), 0..8).prop_map(|cs| {
            PathAttribute {
                flags: PathAttributeFlags::optional_transitive(),
                value: PathAttributeValue::Communities(
                    cs.into_iter().map(Community).collect(),
                ),
            }
        }),
    ]
}

fn open_strategy() -> impl Strategy<Value = OpenMessage> {
    (
        any::<u16>(),
        prop_oneof![Just(0u16), 3u16..],
        identifier_strategy(),
        proptest::collection::vec(any::<u8>(), 0..20),
    )
        .prop_map(|(asn, hold_time, id, opt_params)| OpenMessage {
            version: 4,
            asn,
            hold_time,
            id,
            opt_params,
        })
}

fn update_strategy() -> impl Strategy<Value = UpdateMessage> {
    (
        proptest::collection::vec(ipv4_prefix_strategy(), 0..5),
        proptest::collection::vec(path_attribute_strategy(), 0..6),
        proptest::collection::vec(ipv4_prefix_strategy(), 0..5),
    )
        .prop_map(|(withdrawn, path_attributes, nlri)| UpdateMessage {
            withdrawn,
            path_attributes,
            nlri,
        })
}

// Valid (code, subcode) pairs per the RFC 4271 registry
fn notification_strategy() -> impl Strategy<Value = NotificationMessage> {
    let pair = prop_oneof![
        (Just(1u8), 1u8..=3u8),
        (Just(2u8), prop_oneof![1u8..=4u8, Just(6u8)]),
        (
            Just(3u8),
            (1u8..=11u8).prop_filter("deprecated subcode", |s| *s != 7)
        ),
        (4u8..=6u8, Just(0u8)),
    ];

    (pair, proptest::collection::vec(any::<u8>(), 0..16)).prop_map(
        |((error_code, error_subcode), data)| NotificationMessage {
            error_code,
            error_subcode,
            data,
        },
    )
}

proptest! {
    /// Property: open message wire round-trip is identity
    #[test]
    fn prop_open_round_trip(open in open_strategy()) {
        let msg = Message::Open(open);
        let wire = msg.to_wire().expect("should encode");
        prop_assert_eq!(decode(&wire).expect("should decode"), msg);
    }

    /// Property: update message wire round-trip is identity
    #[test]
    fn prop_update_round_trip(update in update_strategy()) {
        let msg = Message::Update(update);
        let wire = msg.to_wire().expect("should encode");
        prop_assert_eq!(decode(&wire).expect("should decode"), msg);
    }

    /// Property: notification wire round-trip is identity for every valid
    /// code/subcode pair
    #[test]
    fn prop_notification_round_trip(n in notification_strategy()) {
        let msg = Message::Notification(n);
        let wire = msg.to_wire().expect("should encode");
        prop_assert_eq!(decode(&wire).expect("should decode"), msg);
    }

    /// Property: decoded NLRI always has its host bits unset
    #[test]
    fn prop_decoded_nlri_host_bits_unset(
        nlri in proptest::collection::vec(ipv4_prefix_strategy(), 0..8)
    ) {
        let msg = Message::Update(UpdateMessage {
            withdrawn: Vec::new(),
            path_attributes: Vec::new(),
            nlri,
        });
        let wire = msg.to_wire().expect("should encode");

        let decoded = decode(&wire).expect("should decode");
        if let Message::Update(update) = decoded {
            for p in &update.nlri {
                prop_assert!(p.host_bits_are_unset());
            }
        } else {
            prop_assert!(false, "expected update");
        }
    }

    /// Property: header wire round-trip is identity for in-range lengths
    #[test]
    fn prop_header_round_trip(
        length in 19u16..=4096,
        typ in prop_oneof![
            Just(MessageType::Open),
            Just(MessageType::Update),
            Just(MessageType::Notification),
            Just(MessageType::KeepAlive),
        ],
    ) {
        let header = Header::new(length, typ).expect("in-range header");
        let wire = header.to_wire();
        let decoded = Header::from_wire(&mut &wire[..]).expect("should decode");
        prop_assert_eq!(decoded, header);
    }

    /// Property: any corrupted marker byte yields ConnectionNotSynchronized
    #[test]
    fn prop_corrupted_marker_is_rejected(
        index in 0usize..16,
        byte in 0u8..=0xfe,
    ) {
        let mut wire = Header::new(19, MessageType::KeepAlive)
            .expect("keepalive header")
            .to_wire();
        wire[index] = byte;

        let err = decode(&wire).expect_err("corrupt marker should fail");
        prop_assert_eq!(err.code_pair(), (1, 1));
    }
}
