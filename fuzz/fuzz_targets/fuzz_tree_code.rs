#![no_main]

use libfuzzer_sys::fuzz_target;
use ubt_code::{Address, AddressPoint, ContractCode, MemoryTree, TreeCode};

/// Fuzz chunked range reads against slicing the original code
/// The first four bytes pick the range, the rest is the bytecode
fuzz_target!(|data: &[u8]| {
    if data.len() < 5 {
        return;
    }
    let (range, code) = data.split_at(4);
    let a = u16::from_le_bytes([range[0], range[1]]) as u64;
    let b = u16::from_le_bytes([range[2], range[3]]) as u64;

    let address = Address::repeat_byte(0x42);
    let mut tree = MemoryTree::new();
    tree.insert_code(address, code);
    let reader = TreeCode::new(AddressPoint::new(address), &tree);
    assert_eq!(reader.size().unwrap(), code.len() as u64);

    let len = code.len() as u64;
    match reader.get_range(a, b) {
        Ok(bytes) => {
            assert_eq!(bytes.len() as u64, b - a + 1);
            // the tail of the last chunk reads back as zero padding
            if b < len {
                assert_eq!(&*bytes, &code[a as usize..=b as usize]);
            }
        }
        Err(err) => assert!(a > b || b / 31 >= (len + 30) / 31, "unexpected {err}"),
    }
});
