//! Read access to the tree holding chunked code.

use alloy_primitives::{Address, B256};
use std::{collections::HashMap, sync::Arc};

use crate::{chunkify_code, error::LookupError, AddressPoint, TreeKey};

/// Point lookups into a unified binary tree.
///
/// This is the only thing chunked code access needs from the tree. Implementations are expected
/// to read from a view that is not mutated while lookups are in flight.
pub trait TreeReader {
    /// Get the value stored at `key`, `Ok(None)` if there is none.
    fn get(&self, key: &TreeKey) -> Result<Option<B256>, LookupError>;
}

impl<T: TreeReader + ?Sized> TreeReader for &T {
    fn get(&self, key: &TreeKey) -> Result<Option<B256>, LookupError> {
        (**self).get(key)
    }
}

impl<T: TreeReader + ?Sized> TreeReader for Arc<T> {
    fn get(&self, key: &TreeKey) -> Result<Option<B256>, LookupError> {
        (**self).get(key)
    }
}

/// Encode a code length as stored in the code size leaf.
pub fn encode_code_size(size: u64) -> B256 {
    let mut bytes = [0u8; 32];
    bytes[..8].copy_from_slice(&size.to_be_bytes());
    B256::from(bytes)
}

/// Decode the code length from a code size leaf.
pub fn decode_code_size(value: &B256) -> u64 {
    let mut size = [0u8; 8];
    size.copy_from_slice(&value[..8]);
    u64::from_be_bytes(size)
}

/// Flat in-memory key-value view of a tree.
#[derive(Clone, Debug, Default)]
pub struct MemoryTree {
    leaves: HashMap<TreeKey, B256>,
}

impl MemoryTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored leaves.
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// Check if the tree is empty.
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Insert a value at the given key, returning the previous value.
    pub fn insert(&mut self, key: TreeKey, value: B256) -> Option<B256> {
        self.leaves.insert(key, value)
    }

    /// Remove the value at `key`.
    pub fn remove(&mut self, key: &TreeKey) -> Option<B256> {
        self.leaves.remove(key)
    }

    /// Store `code` as the code of `address`: every chunk plus the code size leaf.
    ///
    /// Returns the number of chunks written.
    pub fn insert_code(&mut self, address: Address, code: &[u8]) -> usize {
        let point = AddressPoint::new(address);
        let chunks = chunkify_code(code);
        for (chunk_idx, chunk) in chunks.iter().enumerate() {
            self.leaves.insert(point.code_chunk_key(chunk_idx as u64), chunk.encode());
        }
        self.leaves.insert(point.code_size_key(), encode_code_size(code.len() as u64));
        trace!(%address, len = code.len(), chunks = chunks.len(), "stored code");
        chunks.len()
    }
}

impl TreeReader for MemoryTree {
    fn get(&self, key: &TreeKey) -> Result<Option<B256>, LookupError> {
        Ok(self.leaves.get(key).copied())
    }
}
