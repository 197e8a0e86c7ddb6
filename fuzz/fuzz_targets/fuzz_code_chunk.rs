#![no_main]

use libfuzzer_sys::fuzz_target;
use ubt_code::{chunkify_code, dechunkify_code, push_data_len, CodeBitmap, CodeChunk};

/// Fuzz code chunking with arbitrary bytecode
/// Checks the roundtrip and that leading pushdata agrees with the segment bitmap
fuzz_target!(|data: &[u8]| {
    let chunks = chunkify_code(data);
    let recovered = dechunkify_code(&chunks, data.len());
    assert_eq!(data, recovered.as_slice(), "roundtrip failed");

    let bitmap = CodeBitmap::new(data);
    for (idx, chunk) in chunks.iter().enumerate() {
        assert!(chunk.leading_pushdata <= 31, "leading_pushdata out of bounds");
        let start = idx as u64 * 31;
        assert_eq!(chunk.leading_pushdata as u64, bitmap.leading_data_len(start, 31));
        assert_eq!(CodeChunk::decode(chunk.encode()), *chunk);
    }

    // every instruction start is code, every operand byte is data
    let mut pc = 0usize;
    while pc < data.len() {
        assert!(bitmap.is_code_segment(pc as u64));
        let n = push_data_len(data[pc]) as usize;
        for i in pc + 1..=pc + n {
            assert!(bitmap.is_data(i as u64), "operand {i} of pc {pc} not data");
        }
        pc += n + 1;
    }
});
