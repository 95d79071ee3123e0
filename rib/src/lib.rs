// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

pub mod bestpath;
pub mod route;
pub mod types;

pub use route::Route;
pub use types::*;


#[cfg(test)]
mod proptest;

/// Local preference assumed for BGP paths that do not carry a LOCAL_PREF
/// attribute.
pub const DEFAULT_LOCAL_PREF: u32 = 100;
