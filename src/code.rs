//! Code chunkification.
//!
//! Contract bytecode is split into 31-byte chunks. The first byte of each stored chunk
//! indicates how many of the following bytes are PUSHDATA from a previous chunk
//! (i.e., data that should not be interpreted as opcodes).

use alloy_primitives::B256;

use crate::CodeBitmap;

/// Size of code data per chunk (31 bytes)
pub const CODE_CHUNK_DATA_SIZE: usize = 31;

/// A code chunk with leading PUSHDATA count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CodeChunk {
    /// Number of leading bytes that are PUSHDATA (0-31)
    pub leading_pushdata: u8,
    /// The 31 bytes of code/data
    pub data: [u8; CODE_CHUNK_DATA_SIZE],
}

impl CodeChunk {
    /// Create a new code chunk.
    pub const fn new(leading_pushdata: u8, data: [u8; CODE_CHUNK_DATA_SIZE]) -> Self {
        Self { leading_pushdata, data }
    }

    /// Encode to a 32-byte value.
    pub fn encode(&self) -> B256 {
        let mut bytes = [0u8; 32];
        bytes[0] = self.leading_pushdata;
        bytes[1..32].copy_from_slice(&self.data);
        B256::from(bytes)
    }

    /// Decode from a 32-byte value.
    pub fn decode(value: B256) -> Self {
        let mut data = [0u8; CODE_CHUNK_DATA_SIZE];
        data.copy_from_slice(&value[1..32]);
        Self {
            leading_pushdata: value[0],
            data,
        }
    }
}

/// Number of chunks needed to store `code_len` bytes.
pub const fn chunk_count(code_len: usize) -> usize {
    code_len.div_ceil(CODE_CHUNK_DATA_SIZE)
}

/// Chunkify bytecode into 31-byte chunks with PUSHDATA tracking.
///
/// The leading PUSHDATA count of a chunk is read off the [`CodeBitmap`]: it is the number of
/// consecutive data bytes at the chunk start, capped at 31. An operand truncated by the end of the
/// code still counts in full, so the last chunk may declare more leading data than it holds.
pub fn chunkify_code(bytecode: &[u8]) -> Vec<CodeChunk> {
    let bitmap = CodeBitmap::new(bytecode);

    bytecode
        .chunks(CODE_CHUNK_DATA_SIZE)
        .enumerate()
        .map(|(chunk_idx, chunk_data)| {
            let start = (chunk_idx * CODE_CHUNK_DATA_SIZE) as u64;
            let leading = bitmap.leading_data_len(start, CODE_CHUNK_DATA_SIZE as u64);

            let mut data = [0u8; CODE_CHUNK_DATA_SIZE];
            data[..chunk_data.len()].copy_from_slice(chunk_data);
            CodeChunk::new(leading as u8, data)
        })
        .collect()
}

/// Reconstruct bytecode from chunks.
pub fn dechunkify_code(chunks: &[CodeChunk], code_size: usize) -> Vec<u8> {
    let mut bytecode = Vec::with_capacity(code_size);

    for chunk in chunks {
        let remaining = code_size.saturating_sub(bytecode.len());
        let to_copy = remaining.min(CODE_CHUNK_DATA_SIZE);
        bytecode.extend_from_slice(&chunk.data[..to_copy]);
    }

    bytecode
}
