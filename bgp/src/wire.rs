// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Byte-level reads over an in-memory buffer. Every read is bounds checked
//! and fails with an [`Underflow`] naming the field being read; the message
//! layer maps that onto the enclosing message's RFC 4271 error code. This
//! is the only source of I/O failure in the decoder.

use std::fmt::{self, Display, Formatter};

/// Fewer bytes remained than `field` required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Underflow {
    pub field: &'static str,
    pub expected: usize,
    pub found: usize,
}

impl Display for Underflow {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "buffer underflow reading {}: need {} bytes, have {}",
            self.field, self.expected, self.found
        )
    }
}

#[cold]
fn underflow(field: &'static str, expected: usize, found: usize) -> Underflow {
    Underflow {
        field,
        expected,
        found,
    }
}

/// Big-endian reads off a byte slice, advancing the slice as they go.
pub trait ReadBytes: Sized {
    fn remaining(&self) -> usize;
    fn read_u8(&mut self, field: &'static str) -> Result<u8, Underflow>;
    fn read_u16(&mut self, field: &'static str) -> Result<u16, Underflow>;
    fn read_u32(&mut self, field: &'static str) -> Result<u32, Underflow>;
    fn read_bytes(
        &mut self,
        n: usize,
        field: &'static str,
    ) -> Result<Vec<u8>, Underflow>;

    /// Carve off the next `n` bytes as their own reader, e.g. for a
    /// length-declared region that must be consumed exactly.
    fn split_to(
        &mut self,
        n: usize,
        field: &'static str,
    ) -> Result<Self, Underflow>;
}

impl ReadBytes for &'_ [u8] {
    #[inline]
    fn remaining(&self) -> usize {
        self.len()
    }

    #[inline]
    fn read_u8(&mut self, field: &'static str) -> Result<u8, Underflow> {
        if let Some((&value, rest)) = self.split_first() {
            *self = rest;
            return Ok(value);
        }

        Err(underflow(field, 1, 0))
    }

    #[inline]
    fn read_u16(&mut self, field: &'static str) -> Result<u16, Underflow> {
        if self.len() >= 2 {
            let (bytes, rest) = self.split_at(2);
            *self = rest;
            return Ok(u16::from_be_bytes(bytes.try_into().unwrap()));
        }

        Err(underflow(field, 2, self.len()))
    }

    #[inline]
    fn read_u32(&mut self, field: &'static str) -> Result<u32, Underflow> {
        if self.len() >= 4 {
            let (bytes, rest) = self.split_at(4);
            *self = rest;
            return Ok(u32::from_be_bytes(bytes.try_into().unwrap()));
        }

        Err(underflow(field, 4, self.len()))
    }

    #[inline]
    fn read_bytes(
        &mut self,
        n: usize,
        field: &'static str,
    ) -> Result<Vec<u8>, Underflow> {
        Ok(self.split_to(n, field)?.to_vec())
    }

    #[inline]
    fn split_to(
        &mut self,
        n: usize,
        field: &'static str,
    ) -> Result<Self, Underflow> {
        if self.len() >= n {
            let (head, rest) = self.split_at(n);
            *self = rest;
            return Ok(head);
        }

        Err(underflow(field, n, self.len()))
    }
}
