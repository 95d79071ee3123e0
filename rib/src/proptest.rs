// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Property-based tests for path selection and the route entry.
//!
//! Selection must be a pure, order-independent function of the candidate
//! set, and route entry mutations must keep the active set consistent with
//! it. Prefix host-bit invariants are covered here as well.

use crate::bestpath::bestpaths;
use crate::route::Route;
use crate::types::{
    BgpPath, IsisPath, OspfPath, Path, Prefix, Prefix4, Prefix6, Protocol,
    RouteOrigin, StaticPath,
};
use proptest::prelude::*;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

fn prefix() -> Prefix {
    "10.0.0.0/24".parse().unwrap()
}

fn ip_strategy() -> impl Strategy<Value = IpAddr> {
    any::<u32>().prop_map(|bits| IpAddr::V4(Ipv4Addr::from(bits)))
}

fn origin_strategy() -> impl Strategy<Value = RouteOrigin> {
    prop_oneof![
        Just(RouteOrigin::Igp),
        Just(RouteOrigin::Egp),
        Just(RouteOrigin::Incomplete),
    ]
}

fn static_path_strategy() -> impl Strategy<Value = Path> {
    ip_strategy().prop_map(|nexthop| Path::Static(StaticPath { nexthop }))
}

fn bgp_path_strategy() -> impl Strategy<Value = Path> {
    (
        (
            ip_strategy(),
            ip_strategy(),
            any::<u32>(),
            65000u32..65010,
            any::<bool>(),
        ),
        (
            proptest::option::of(0u32..500),
            proptest::collection::vec(1u32..65536, 0..6),
            origin_strategy(),
            proptest::option::of(0u32..100),
            proptest::option::of(0u32..50),
        ),
    )
        .prop_map(
            |(
                (nexthop, peer, id, neighbor_as, ebgp),
                (local_pref, as_path, origin, med, igp_cost),
            )| {
                Path::Bgp(BgpPath {
                    nexthop,
                    peer,
                    id,
                    neighbor_as,
                    local_pref,
                    as_path,
                    origin,
                    med,
                    communities: Vec::new(),
                    ebgp,
                    igp_cost,
                })
            },
        )
}

fn ospf_path_strategy() -> impl Strategy<Value = Path> {
    (ip_strategy(), 0u32..1000)
        .prop_map(|(nexthop, metric)| Path::Ospf(OspfPath { nexthop, metric }))
}

fn isis_path_strategy() -> impl Strategy<Value = Path> {
    (ip_strategy(), 0u32..1000)
        .prop_map(|(nexthop, metric)| Path::Isis(IsisPath { nexthop, metric }))
}

fn path_strategy() -> impl Strategy<Value = Path> {
    prop_oneof![
        static_path_strategy(),
        bgp_path_strategy(),
        ospf_path_strategy(),
        isis_path_strategy(),
    ]
}

fn paths_strategy() -> impl Strategy<Value = Vec<Path>> {
    proptest::collection::vec(path_strategy(), 0..8)
}

proptest! {
    /// Property: selection is order independent in its input
    #[test]
    fn prop_selection_is_order_independent(
        (paths, shuffled) in paths_strategy().prop_flat_map(|v| {
            (Just(v.clone()), Just(v).prop_shuffle())
        })
    ) {
        prop_assert_eq!(bestpaths(&paths), bestpaths(&shuffled));
    }

    /// Property: a static path preempts every dynamic protocol
    #[test]
    fn prop_static_paths_preempt_dynamic(
        mut paths in paths_strategy(),
        static_path in static_path_strategy(),
    ) {
        paths.push(static_path);
        let active = bestpaths(&paths);

        prop_assert!(!active.is_empty());
        prop_assert!(
            active.iter().all(|p| p.protocol() == Protocol::Static),
            "non-static path active alongside a static candidate"
        );
    }

    /// Property: the active set is drawn from the candidates and shares
    /// one protocol
    #[test]
    fn prop_active_is_subset_of_candidates(paths in paths_strategy()) {
        let active = bestpaths(&paths);

        prop_assert_eq!(active.is_empty(), paths.is_empty());
        for p in &active {
            prop_assert!(paths.contains(p));
        }
        if let Some(first) = active.first() {
            prop_assert!(
                active.iter().all(|p| p.protocol() == first.protocol())
            );
        }
    }

    /// Property: withdrawing a full copy of the entry empties it, and a
    /// second withdrawal changes nothing
    #[test]
    fn prop_withdrawal_is_idempotent(paths in paths_strategy()) {
        let mut route = Route::new(prefix(), paths.clone());
        let withdraw = Route::new(prefix(), paths);

        prop_assert!(route.remove(&withdraw));
        prop_assert!(route.paths().is_empty());
        prop_assert!(route.active_paths().is_empty());

        prop_assert!(route.remove(&withdraw));
        prop_assert!(route.paths().is_empty());
    }

    /// Property: adding a path and withdrawing it restores the entry
    #[test]
    fn prop_add_then_remove_restores_entry(
        paths in paths_strategy(),
        extra in path_strategy(),
    ) {
        prop_assume!(!paths.contains(&extra));

        let mut route = Route::new(prefix(), paths);
        let before = route.clone();

        route.add_path(extra.clone());
        route.remove(&Route::new(prefix(), vec![extra]));

        prop_assert_eq!(route, before);
    }

    /// Property: IPv4 host bits are always unset after construction
    #[test]
    fn prop_ipv4_host_bits_always_unset(
        (bits, length) in (any::<u32>(), 0u8..=32u8)
    ) {
        let prefix = Prefix4::new(Ipv4Addr::from(bits), length);
        prop_assert!(
            prefix.host_bits_are_unset(),
            "IPv4 prefix {prefix} should have host bits unset"
        );
    }

    /// Property: IPv6 host bits are always unset after construction
    #[test]
    fn prop_ipv6_host_bits_always_unset(
        (bits, length) in (any::<u128>(), 0u8..=128u8)
    ) {
        let prefix = Prefix6::new(Ipv6Addr::from(bits), length);
        prop_assert!(
            prefix.host_bits_are_unset(),
            "IPv6 prefix {prefix} should have host bits unset"
        );
    }

    /// Property: unsetting host bits is idempotent
    #[test]
    fn prop_unset_host_bits_idempotent(
        (bits, length) in (any::<u32>(), 0u8..=32u8)
    ) {
        let once = Prefix4::new(Ipv4Addr::from(bits), length);
        let mut twice = once;
        twice.unset_host_bits();

        prop_assert_eq!(once, twice);
    }
}
