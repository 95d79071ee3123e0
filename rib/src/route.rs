// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::bestpath::bestpaths;
use crate::types::{Path, Prefix};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A route table entry: every candidate path known for a prefix, plus the
/// currently active subset as chosen by [`bestpaths`].
///
/// The entry is owned and mutated by a single RIB writer. Every mutation
/// recomputes the active sequence and swaps it in wholesale, so a reader
/// that clones or snapshots `active_paths` always observes the selection
/// result for some past candidate set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Route {
    prefix: Prefix,
    paths: Vec<Path>,
    active: Vec<Path>,
}

impl Route {
    /// Create an entry for `prefix` holding `paths`. Structural duplicates
    /// in the initial set are dropped and selection runs once.
    pub fn new(prefix: Prefix, paths: Vec<Path>) -> Self {
        let mut route = Self {
            prefix,
            paths: Vec::new(),
            active: Vec::new(),
        };
        route.add_paths(paths);
        route
    }

    pub fn prefix(&self) -> Prefix {
        self.prefix
    }

    pub fn prefix_length(&self) -> u8 {
        self.prefix.length()
    }

    /// All candidate paths, in insertion order.
    pub fn paths(&self) -> &[Path] {
        &self.paths
    }

    /// The active path set. All entries share the winning protocol; with
    /// more than one entry the paths are equal-cost.
    pub fn active_paths(&self) -> &[Path] {
        &self.active
    }

    /// Add a candidate path and reselect. Adding a path structurally equal
    /// to one already present is a no-op, so retransmitted updates do not
    /// inflate the entry.
    pub fn add_path(&mut self, path: Path) {
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
        self.select();
    }

    /// Add a batch of candidate paths; selection runs once at the end.
    pub fn add_paths(&mut self, paths: Vec<Path>) {
        for path in paths {
            if !self.paths.contains(&path) {
                self.paths.push(path);
            }
        }
        self.select();
    }

    /// Withdraw every path of `other` from this entry, matching by value.
    /// Each path in `other` removes at most one structurally equal
    /// candidate; withdrawing an absent path is a no-op, so withdrawals
    /// are idempotent. Returns true when no candidates remain and the
    /// caller should delete the entry.
    pub fn remove(&mut self, other: &Route) -> bool {
        for del in other.paths() {
            if let Some(i) = self.paths.iter().position(|p| p == del) {
                self.paths.remove(i);
            }
        }
        self.select();

        self.paths.is_empty()
    }

    fn select(&mut self) {
        self.active = bestpaths(&self.paths);
        debug_assert!(self.active.iter().all(|a| self.paths.contains(a)));
    }
}
