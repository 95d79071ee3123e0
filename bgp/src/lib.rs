// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

pub mod error;
pub mod log;
pub mod messages;
pub mod wire;

pub use error::BgpError;
pub use messages::{decode, Message};


#[cfg(test)]
mod proptest;

pub const BGP_PORT: u16 = 179;
