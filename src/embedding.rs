//! Tree embedding for contract code.
//!
//! ## Layout Overview
//!
//! Each account has a "base stem" derived from its address. Within that stem's subtree:
//! - Subindex 0: Basic data (version, nonce, balance)
//! - Subindex 1: Code hash
//! - Subindex 2: Code size (8-byte big-endian, see [`CODE_SIZE_LEAF_KEY`])
//! - Subindexes 3-63: Reserved for future use
//! - Subindexes 64-127: First 64 storage slots (HEADER_STORAGE_OFFSET)
//! - Subindexes 128-255: First 128 code chunks (CODE_OFFSET)
//!
//! Storage slots beyond the first 64 and code chunks beyond the first 128
//! are stored in separate stems calculated from the account address and slot/chunk index.
//!
//! ## Key Derivation
//!
//! ```text
//! key = SHA256(zeroHash[:12] || address[:] || inputKey[:31])
//! key[31] = inputKey[31]  // subindex preserved
//! ```
//!
//! The `zeroHash[:12] || address` prefix is the same for every key of an account, so
//! [`AddressPoint`] absorbs it once and every further derivation only hashes the 31-byte
//! tree index.

use alloy_primitives::Address;
use sha2::{Digest, Sha256};
use std::fmt;

use crate::{Stem, SubIndex, TreeKey, STEM_LEN};

/// Subindex for basic account data
const BASIC_DATA_LEAF_KEY: SubIndex = 0;

/// Subindex for the code size leaf.
///
/// The leaf value carries the code length as a big-endian `u64` in its first 8 bytes.
pub const CODE_SIZE_LEAF_KEY: SubIndex = 2;

/// Offset for first 64 storage slots within account stem (subindexes 64-127)
pub const HEADER_STORAGE_OFFSET: SubIndex = 64;

/// Offset for first 128 code chunks within account stem (subindexes 128-255)
pub const CODE_OFFSET: SubIndex = 128;

/// Width of a stem subtree (256 values)
pub const STEM_SUBTREE_WIDTH: u64 = 256;

/// Zero hash prefix used in key derivation (12 zero bytes)
const ZERO_PREFIX: [u8; 12] = [0u8; 12];

/// The address-dependent part of every tree key of an account.
///
/// Holds a SHA-256 state that has already absorbed `zeroHash[:12] || address`. Deriving a key
/// clones the state and feeds it the tree index only.
#[derive(Clone)]
pub struct AddressPoint {
    address: Address,
    prefix: Sha256,
}

impl AddressPoint {
    /// Evaluate the key prefix for `address`.
    pub fn new(address: Address) -> Self {
        let mut prefix = Sha256::new();
        prefix.update(ZERO_PREFIX);
        prefix.update(address.as_slice());
        Self { address, prefix }
    }

    /// The address this point was evaluated for.
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Derive a tree key from a 32-byte input key (31-byte tree index + subindex).
    pub fn tree_key(&self, input_key: &[u8; 32]) -> TreeKey {
        let hash = self.prefix.clone().chain_update(&input_key[..STEM_LEN]).finalize();
        let mut stem_bytes = [0u8; STEM_LEN];
        stem_bytes.copy_from_slice(&hash[..STEM_LEN]);

        TreeKey::new(Stem::new(stem_bytes), input_key[STEM_LEN])
    }

    /// The stem holding the account header leaves.
    pub fn account_stem(&self) -> Stem {
        self.header_key(BASIC_DATA_LEAF_KEY).stem
    }

    /// Get the tree key of the code size leaf.
    pub fn code_size_key(&self) -> TreeKey {
        self.header_key(CODE_SIZE_LEAF_KEY)
    }

    /// Get the tree key for a code chunk.
    ///
    /// - First 128 chunks (pos 128-255) go in account stem at subindex 128+chunk_num
    /// - Chunks >= 128 go in separate stems calculated from stem_index
    pub fn code_chunk_key(&self, chunk_number: u64) -> TreeKey {
        let pos = CODE_OFFSET as u128 + chunk_number as u128;
        let width = STEM_SUBTREE_WIDTH as u128;

        let mut k = [0u8; 32];
        // pos / 256 always fits in the u64 tail of the tree index
        let stem_index = (pos / width) as u64;
        k[23..31].copy_from_slice(&stem_index.to_be_bytes());
        k[31] = (pos % width) as u8;
        self.tree_key(&k)
    }

    /// Get the tree key for a storage slot.
    ///
    /// - Slots 0-63: pos = HEADER_STORAGE_OFFSET + slot, stored in account stem
    /// - Slots >= 64: pos = 256^31 + slot, so tree_index = 256^30 + slot / 256 (mod 256^31)
    ///   and subindex = slot % 256
    pub fn storage_slot_key(&self, slot: &[u8; 32]) -> TreeKey {
        let mut k = [0u8; 32];
        if is_header_slot(slot) {
            k[31] = HEADER_STORAGE_OFFSET + slot[31];
        } else {
            k[1..31].copy_from_slice(&slot[1..31]);
            // Adding 256^30 touches the most significant byte only; wrap modulo 256^31.
            k[0] = slot[0].wrapping_add(1);
            k[31] = slot[31];
        }
        self.tree_key(&k)
    }

    fn header_key(&self, subindex: SubIndex) -> TreeKey {
        let mut k = [0u8; 32];
        k[31] = subindex;
        self.tree_key(&k)
    }
}

impl fmt::Debug for AddressPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddressPoint").field("address", &self.address).finish_non_exhaustive()
    }
}

/// Whether `slot` is one of the first 64 slots stored next to the account header.
pub fn is_header_slot(slot: &[u8; 32]) -> bool {
    slot[..31].iter().all(|&b| b == 0) && slot[31] < CODE_OFFSET - HEADER_STORAGE_OFFSET
}

/// Get the tree key for a code chunk.
pub fn get_code_chunk_key(address: &Address, chunk_number: u64) -> TreeKey {
    AddressPoint::new(*address).code_chunk_key(chunk_number)
}

/// Get the tree key of the code size leaf.
pub fn get_code_size_key(address: &Address) -> TreeKey {
    AddressPoint::new(*address).code_size_key()
}

/// Get the tree key for a storage slot.
pub fn get_storage_slot_key(address: &Address, slot: &[u8; 32]) -> TreeKey {
    AddressPoint::new(*address).storage_slot_key(slot)
}
