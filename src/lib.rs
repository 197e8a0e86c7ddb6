//! # UBT contract code
//!
//! Contract code addressing and segmentation for state kept in a unified binary tree
//! (EIP-7864).
//!
//! Code lives in one of two encodings while state migrates to the tree:
//!
//! - **Flat**: the whole program in one buffer, read within caller-authorized ranges
//! - **Chunked**: 32-byte leaves in the tree, each holding 31 code bytes behind one byte that
//!   counts the leading PUSH data spilled over from the previous chunk
//!
//! [`ContractCode`] reads either encoding byte-exactly, and a [`CodeResolver`] hands out the
//! right accessor per address. Chunked reads only fetch the chunks covering the requested range.
//!
//! ## Segment analysis
//!
//! [`CodeBitmap`] marks every byte that is an immediate operand of a `PUSHn`. The same bitmap
//! validates jump targets and yields the leading PUSH data count when code is chunked.
//!
//! ## Key Derivation
//!
//! Chunk and code size keys are derived from an [`AddressPoint`], the address part of the key
//! hash evaluated once per account. The tree itself is consumed through [`TreeReader`].

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

mod access;
mod analysis;
mod code;
mod contract;
mod embedding;
mod error;
mod key;
mod resolver;
mod store;
#[cfg(feature = "trace")]
mod trace;
mod tree_code;

pub use access::{AccessKind, BranchAccess, StemAccess, StemAccessTracker};
pub use analysis::{push_data_len, CodeBitmap, JUMPDEST, PUSH1, PUSH32};
pub use code::{chunk_count, chunkify_code, dechunkify_code, CodeChunk, CODE_CHUNK_DATA_SIZE};
pub use contract::{ContractCode, FlatCode};
pub use embedding::{
    get_code_chunk_key, get_code_size_key, get_storage_slot_key, is_header_slot, AddressPoint,
    CODE_OFFSET, CODE_SIZE_LEAF_KEY, HEADER_STORAGE_OFFSET, STEM_SUBTREE_WIDTH,
};
pub use error::{CodeError, LookupError, Result};
pub use key::{Stem, SubIndex, TreeKey, STEM_LEN};
pub use resolver::{CodeAccessor, CodeBackend, CodeResolver, SingleCodeResolver, TreeCodeResolver};
pub use store::{decode_code_size, encode_code_size, MemoryTree, TreeReader};
#[cfg(feature = "trace")]
pub use trace::{read_trace, PcTraceConfig, PcTracer, TraceError, TxPcTrace};
pub use tree_code::TreeCode;

/// Re-export alloy primitives for convenience
pub use alloy_primitives::{Address, Bytes, B256};
