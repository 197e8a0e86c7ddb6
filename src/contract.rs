//! Random access to contract code.

use alloy_primitives::{Address, Bytes};
use std::{borrow::Cow, ops::RangeInclusive};

use crate::error::{CodeError, Result};

/// Read access to the code of a single contract.
///
/// Positions are byte offsets into the code and ranges are inclusive on both ends.
pub trait ContractCode {
    /// Get the byte at `pos`.
    fn get_byte(&self, pos: u64) -> Result<u8>;

    /// Get the bytes in `[start, end]`.
    fn get_range(&self, start: u64, end: u64) -> Result<Cow<'_, [u8]>>;

    /// Get the whole code.
    fn get_all(&self) -> Result<Cow<'_, [u8]>>;

    /// Length of the code in bytes.
    fn size(&self) -> Result<u64>;
}

impl<C: ContractCode + ?Sized> ContractCode for &C {
    fn get_byte(&self, pos: u64) -> Result<u8> {
        (**self).get_byte(pos)
    }

    fn get_range(&self, start: u64, end: u64) -> Result<Cow<'_, [u8]>> {
        (**self).get_range(start, end)
    }

    fn get_all(&self) -> Result<Cow<'_, [u8]>> {
        (**self).get_all()
    }

    fn size(&self) -> Result<u64> {
        (**self).size()
    }
}

/// Contract code held in one contiguous buffer, readable only within caller-declared ranges.
#[derive(Clone, Debug)]
pub struct FlatCode {
    address: Address,
    code: Bytes,
    allowed_ranges: Vec<RangeInclusive<u64>>,
}

impl FlatCode {
    /// Wrap `code` of `address`, authorizing reads in `allowed_ranges`.
    ///
    /// Ranges are kept as given, in order; they are neither merged nor checked for overlap.
    pub fn new(
        address: Address,
        code: impl Into<Bytes>,
        allowed_ranges: Vec<RangeInclusive<u64>>,
    ) -> Self {
        Self { address, code: code.into(), allowed_ranges }
    }

    /// The address owning this code.
    pub const fn address(&self) -> Address {
        self.address
    }

    /// The authorized ranges, in insertion order.
    pub fn allowed_ranges(&self) -> &[RangeInclusive<u64>] {
        &self.allowed_ranges
    }

    /// Whether some allowed range lets `[start, end]` through.
    ///
    /// NOTE: a range matches when `start >= lo` *or* `end <= hi`, which is looser than
    /// containment. Callers rely on this exact test; keep it until its intent is settled.
    fn is_allowed(&self, start: u64, end: u64) -> bool {
        self.allowed_ranges.iter().any(|allowed| start >= *allowed.start() || end <= *allowed.end())
    }
}

impl ContractCode for FlatCode {
    fn get_byte(&self, pos: u64) -> Result<u8> {
        let code = self.get_range(pos, pos)?;
        Ok(code[0])
    }

    fn get_range(&self, start: u64, end: u64) -> Result<Cow<'_, [u8]>> {
        if start > end {
            return Err(CodeError::InvalidRange { start, end });
        }
        if !self.is_allowed(start, end) {
            return Err(CodeError::UnauthorizedRange { address: self.address, start, end });
        }
        let len = self.code.len() as u64;
        if end >= len {
            return Err(CodeError::OutOfBounds { start, end, len });
        }
        Ok(Cow::Borrowed(&self.code[start as usize..=end as usize]))
    }

    /// Returns the whole code without consulting the allowed ranges.
    ///
    /// Contract creation charges for the full init code, so this path must stay open.
    fn get_all(&self) -> Result<Cow<'_, [u8]>> {
        Ok(Cow::Borrowed(&self.code[..]))
    }

    fn size(&self) -> Result<u64> {
        Ok(self.code.len() as u64)
    }
}
