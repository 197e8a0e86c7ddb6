//! Contract code read chunk by chunk out of the tree.

use alloy_primitives::{Address, B256};
use std::borrow::Cow;

use crate::{
    decode_code_size,
    error::{CodeError, LookupError, Result},
    AddressPoint, ContractCode, TreeReader, CODE_CHUNK_DATA_SIZE,
};

const CHUNK_SIZE: u64 = CODE_CHUNK_DATA_SIZE as u64;

/// Contract code stored as 32-byte chunks in a unified binary tree.
///
/// Every read derives the keys of the chunks it touches and looks them up individually; nothing
/// is cached between calls.
pub struct TreeCode<'a, T: ?Sized> {
    point: AddressPoint,
    tree: &'a T,
}

impl<'a, T: TreeReader + ?Sized> TreeCode<'a, T> {
    /// Read the code of the account `point` was evaluated for.
    pub fn new(point: AddressPoint, tree: &'a T) -> Self {
        Self { point, tree }
    }

    /// The address owning this code.
    pub const fn address(&self) -> Address {
        self.point.address()
    }

    /// Fetch the raw 32-byte chunk `chunk_index`, metadata byte included.
    pub fn get_chunk(&self, chunk_index: u64) -> Result<B256> {
        let key = self.point.code_chunk_key(chunk_index);
        trace!(address = %self.address(), chunk_index, ?key, "get code chunk");
        match self.tree.get(&key) {
            Ok(Some(chunk)) => Ok(chunk),
            Ok(None) => Err(self.chunk_error(chunk_index, LookupError::NotFound(key))),
            Err(source) => Err(self.chunk_error(chunk_index, source)),
        }
    }

    fn chunk_error(&self, chunk: u64, source: LookupError) -> CodeError {
        CodeError::ChunkLookup { address: self.address(), chunk, source }
    }
}

impl<T: TreeReader + ?Sized> ContractCode for TreeCode<'_, T> {
    fn get_byte(&self, pos: u64) -> Result<u8> {
        let chunk = self.get_chunk(pos / CHUNK_SIZE)?;
        // skip the leading pushdata byte
        Ok(chunk[(pos % CHUNK_SIZE) as usize + 1])
    }

    fn get_range(&self, start: u64, end: u64) -> Result<Cow<'_, [u8]>> {
        if start > end {
            return Err(CodeError::InvalidRange { start, end });
        }
        let first_chunk = start / CHUNK_SIZE;
        let last_chunk = end / CHUNK_SIZE;

        // grows with the chunks actually found, the range itself is caller controlled
        let mut aligned = Vec::new();
        for chunk_index in first_chunk..=last_chunk {
            let chunk = self.get_chunk(chunk_index)?;
            aligned.extend_from_slice(&chunk[1..]);
        }
        debug!(
            address = %self.address(),
            start,
            end,
            chunks = last_chunk - first_chunk + 1,
            "assembled code range"
        );

        let code_start = (start % CHUNK_SIZE) as usize;
        let code_end = aligned.len() - (CODE_CHUNK_DATA_SIZE - (end % CHUNK_SIZE) as usize - 1);
        aligned.truncate(code_end);
        aligned.drain(..code_start);
        Ok(Cow::Owned(aligned))
    }

    /// Always returns empty code.
    ///
    /// Reassembling the full program by chunk enumeration is not supported yet; gas accounting
    /// that asks for the whole code gets an empty answer instead of an error.
    fn get_all(&self) -> Result<Cow<'_, [u8]>> {
        Ok(Cow::Borrowed(&[]))
    }

    /// Reads the code size leaf.
    ///
    /// A deployed contract always has one, so a failed lookup is reported as
    /// [`CodeError::SizeLeafMissing`], which is fatal.
    fn size(&self) -> Result<u64> {
        let key = self.point.code_size_key();
        let source = match self.tree.get(&key) {
            Ok(Some(value)) => return Ok(decode_code_size(&value)),
            Ok(None) => LookupError::NotFound(key),
            Err(err) => err,
        };
        warn!(address = %self.address(), %source, "code size leaf missing");
        Err(CodeError::SizeLeafMissing { address: self.address(), source })
    }
}

impl<T: ?Sized> std::fmt::Debug for TreeCode<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeCode").field("point", &self.point).finish_non_exhaustive()
    }
}
