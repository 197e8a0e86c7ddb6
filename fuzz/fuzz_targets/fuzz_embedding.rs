#![no_main]

use libfuzzer_sys::fuzz_target;
use ubt_code::{
    get_code_chunk_key, get_code_size_key, get_storage_slot_key, Address, AddressPoint,
    CODE_SIZE_LEAF_KEY,
};

/// Fuzz key derivation with arbitrary addresses, slots and chunk numbers
/// The precomputed address point must agree with the one-shot functions
fuzz_target!(|data: &[u8]| {
    if data.len() < 60 {
        return;
    }

    let addr_bytes: [u8; 20] = data[0..20].try_into().unwrap();
    let addr = Address::from(addr_bytes);
    let slot_bytes: [u8; 32] = data[20..52].try_into().unwrap();
    let chunk_bytes: [u8; 8] = data[52..60].try_into().unwrap();
    let chunk_num = u64::from_be_bytes(chunk_bytes);

    let point = AddressPoint::new(addr);
    assert_eq!(point.storage_slot_key(&slot_bytes), get_storage_slot_key(&addr, &slot_bytes));
    assert_eq!(point.code_chunk_key(chunk_num), get_code_chunk_key(&addr, chunk_num));

    let size_key = get_code_size_key(&addr);
    assert_eq!(size_key.subindex, CODE_SIZE_LEAF_KEY);
    assert_eq!(size_key.stem, point.account_stem());

    let slot_max = [0xffu8; 32];
    let _key_max = get_storage_slot_key(&addr, &slot_max);
});
