// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::types::{BgpPath, Path, Protocol};
use crate::DEFAULT_LOCAL_PREF;
use itertools::Itertools;
use std::collections::BTreeMap;

/// Select the active path set from a set of candidate paths.
///
/// Arbitration runs in two steps. First the winning protocol is the lowest
/// [`Protocol`] ordinal present among the candidates. Second, a
/// protocol-specific policy picks the active subset from the winner's
/// paths: all static paths are active, BGP paths run the RFC 4271 §9.1
/// decision process, and OSPF/IS-IS keep the lowest-metric paths. Survivors
/// of every round are equal-cost and all become active.
///
/// This is a pure function of the candidate set. The result is sorted so
/// that any permutation of `paths` selects the same active sequence.
pub fn bestpaths(paths: &[Path]) -> Vec<Path> {
    let protocol = match paths.iter().map(Path::protocol).min() {
        Some(p) => p,
        None => return Vec::new(),
    };

    let mut best: Vec<Path> = match protocol {
        Protocol::Static => paths
            .iter()
            .filter(|p| matches!(p, Path::Static(_)))
            .cloned()
            .collect(),
        Protocol::Bgp => bgp_selection(
            paths
                .iter()
                .filter_map(|p| match p {
                    Path::Bgp(b) => Some(b),
                    _ => None,
                })
                .collect(),
        ),
        Protocol::Ospf => paths
            .iter()
            .filter_map(|p| match p {
                Path::Ospf(o) => Some(o),
                _ => None,
            })
            .min_set_by_key(|o| o.metric)
            .into_iter()
            .map(|o| Path::Ospf(*o))
            .collect(),
        Protocol::Isis => paths
            .iter()
            .filter_map(|p| match p {
                Path::Isis(i) => Some(i),
                _ => None,
            })
            .min_set_by_key(|i| i.metric)
            .into_iter()
            .map(|i| Path::Isis(*i))
            .collect(),
    };

    best.sort();
    best
}

/// The RFC 4271 §9.1 decision process. Each round narrows the candidate
/// set; paths surviving the last round are ECMP.
fn bgp_selection(candidates: Vec<&BgpPath>) -> Vec<Path> {
    // Highest local preference
    let candidates = candidates
        .into_iter()
        .max_set_by_key(|p| p.local_pref.unwrap_or(DEFAULT_LOCAL_PREF));

    // Shortest AS path
    let candidates = candidates.into_iter().min_set_by_key(|p| p.as_path.len());

    // Lowest origin
    let candidates = candidates.into_iter().min_set_by_key(|p| p.origin);

    // Lowest MED, compared only between paths from the same neighbor AS
    let candidates = med_selection(candidates);

    // Prefer paths learned over eBGP to paths learned over iBGP
    let candidates = if candidates.iter().any(|p| p.ebgp) {
        candidates.into_iter().filter(|p| p.ebgp).collect()
    } else {
        candidates
    };

    // Lowest IGP cost to the next hop
    let candidates = candidates
        .into_iter()
        .min_set_by_key(|p| p.igp_cost.unwrap_or(0));

    // Lowest router id, then lowest peer address
    let candidates = candidates.into_iter().min_set_by_key(|p| p.id);
    let candidates = candidates.into_iter().min_set_by_key(|p| p.peer);

    candidates.into_iter().map(|p| Path::Bgp(p.clone())).collect()
}

/// A path survives the MED round iff its MED is the minimum within its own
/// neighbor-AS group. Paths from distinct neighbor ASes never eliminate
/// each other. A missing MED counts as zero, the most preferred value.
fn med_selection(candidates: Vec<&BgpPath>) -> Vec<&BgpPath> {
    let mut lowest: BTreeMap<u32, u32> = BTreeMap::new();
    for p in &candidates {
        let med = p.med.unwrap_or(0);
        lowest
            .entry(p.neighbor_as)
            .and_modify(|m| *m = (*m).min(med))
            .or_insert(med);
    }

    candidates
        .into_iter()
        .filter(|p| p.med.unwrap_or(0) == lowest[&p.neighbor_as])
        .collect()
}
