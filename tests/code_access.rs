//! End-to-end code access through both storage encodings.

use std::sync::Arc;
use ubt_code::{
    chunkify_code, encode_code_size, get_code_chunk_key, get_code_size_key, Address,
    AddressPoint, CodeAccessor, CodeBackend, CodeBitmap, CodeChunk, CodeError, CodeResolver,
    ContractCode, FlatCode, LookupError, MemoryTree, SingleCodeResolver, TreeCode,
    TreeCodeResolver, TreeKey, TreeReader, B256,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Bytecode of `len` bytes where every 5th position starts a PUSH4.
fn push4_code(len: usize) -> Vec<u8> {
    (0..len).map(|i| if i % 5 == 0 { 0x63 } else { (i % 256) as u8 }).collect()
}

#[test]
fn push1_spills_nothing_into_next_chunk() {
    init_tracing();
    let address = Address::repeat_byte(0x42);
    let code = [0x60u8, 0xaa, 0x01];

    let bitmap = CodeBitmap::new(&code);
    assert!(bitmap.is_code_segment(0));
    assert!(bitmap.is_data(1));
    assert!(bitmap.is_code_segment(2));

    let chunks = chunkify_code(&code);
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].leading_pushdata, 0);

    let mut tree = MemoryTree::new();
    assert_eq!(tree.insert_code(address, &code), 1);
    let leaf = tree.get(&get_code_chunk_key(&address, 0)).unwrap().unwrap();
    assert_eq!(leaf[0], 0);
    assert_eq!(&leaf[1..4], &code);
    assert_eq!(tree.get(&get_code_size_key(&address)).unwrap(), Some(encode_code_size(3)));

    let reader = TreeCode::new(AddressPoint::new(address), &tree);
    assert_eq!(reader.get_range(0, 2).unwrap().as_ref(), &code);
    assert_eq!(reader.get_byte(1).unwrap(), 0xaa);
    assert_eq!(reader.size().unwrap(), 3);
}

#[test]
fn leading_pushdata_crosses_chunk_boundary() {
    // PUSH32 at 29 covers 30..=61; chunk 1 starts at 31
    let mut code = vec![0x5b; 100];
    code[29] = 0x7f;
    let chunks = chunkify_code(&code);
    assert_eq!(chunks[0].leading_pushdata, 0);
    assert_eq!(chunks[1].leading_pushdata, 31);
    assert_eq!(chunks[2].leading_pushdata, 0);

    let mut tree = MemoryTree::new();
    tree.insert_code(Address::ZERO, &code);
    let leaf = tree.get(&get_code_chunk_key(&Address::ZERO, 1)).unwrap().unwrap();
    assert_eq!(CodeChunk::decode(leaf), chunks[1]);
}

#[test]
fn range_spanning_many_chunks() {
    let address = Address::repeat_byte(7);
    let code = push4_code(1000);
    let mut tree = MemoryTree::new();
    tree.insert_code(address, &code);
    let reader = TreeCode::new(AddressPoint::new(address), &tree);

    for (start, end) in [(0, 999), (30, 31), (31, 61), (62, 62), (100, 500), (961, 999)] {
        assert_eq!(
            reader.get_range(start, end).unwrap().as_ref(),
            &code[start as usize..=end as usize],
            "range {start}..={end}"
        );
    }
}

#[test]
fn chunked_reads_past_code_end_fail() {
    let address = Address::repeat_byte(7);
    let mut tree = MemoryTree::new();
    tree.insert_code(address, &[0u8; 31]);
    let reader = TreeCode::new(AddressPoint::new(address), &tree);

    let err = reader.get_range(20, 40).unwrap_err();
    assert!(
        matches!(err, CodeError::ChunkLookup { chunk: 1, source: LookupError::NotFound(_), .. }),
        "{err}"
    );
    assert!(!err.is_fatal());
    assert!(matches!(reader.get_range(5, 4), Err(CodeError::InvalidRange { start: 5, end: 4 })));
}

#[test]
fn missing_size_leaf_is_fatal() {
    let address = Address::repeat_byte(9);
    let mut tree = MemoryTree::new();
    tree.insert_code(address, &[1u8, 2, 3]);
    let removed: Option<B256> = tree.remove(&get_code_size_key(&address));
    assert!(removed.is_some());

    let reader = TreeCode::new(AddressPoint::new(address), &tree);
    assert_eq!(reader.get_byte(2).unwrap(), 3);
    let err = reader.size().unwrap_err();
    assert!(matches!(err, CodeError::SizeLeafMissing { .. }));
    assert!(err.is_fatal());
}

#[test]
fn flat_code_authorization() {
    let address = Address::repeat_byte(1);
    let code = push4_code(64);
    let flat = FlatCode::new(address, code.clone(), vec![10..=20]);

    assert_eq!(flat.get_range(12, 15).unwrap().as_ref(), &code[12..=15]);
    // either bound inside the allowed range is enough
    assert_eq!(flat.get_range(30, 40).unwrap().as_ref(), &code[30..=40]);
    assert_eq!(flat.get_range(0, 5).unwrap().as_ref(), &code[0..=5]);
    assert!(matches!(
        flat.get_range(2, 25),
        Err(CodeError::UnauthorizedRange { start: 2, end: 25, .. })
    ));
    assert!(matches!(flat.get_range(30, 70), Err(CodeError::OutOfBounds { len: 64, .. })));
    assert_eq!(flat.get_all().unwrap().as_ref(), code.as_slice());
    assert_eq!(flat.size().unwrap(), 64);
}

#[test]
fn backends_serve_identical_bytes() {
    init_tracing();
    let address = Address::repeat_byte(0x33);
    let code = push4_code(500);
    let mut tree = MemoryTree::new();
    tree.insert_code(address, &code);

    let flat: CodeBackend<Arc<MemoryTree>> =
        CodeBackend::Single(SingleCodeResolver::new(code.clone(), address, vec![0..=499]));
    let chunked = CodeBackend::Tree(TreeCodeResolver::new(Arc::new(tree)));

    let a = flat.resolve(address);
    let b = chunked.resolve(address);
    assert!(matches!(a, CodeAccessor::Flat(_)));
    assert!(matches!(b, CodeAccessor::Tree(_)));
    for (start, end) in [(0, 0), (0, 499), (123, 321), (496, 499)] {
        assert_eq!(a.get_range(start, end).unwrap(), b.get_range(start, end).unwrap());
    }
    assert_eq!(a.size().unwrap(), b.size().unwrap());
}

#[test]
fn custom_tree_reader() {
    /// Serves a single contract, failing on anything else.
    struct OneContract {
        address: Address,
        leaves: Vec<(TreeKey, B256)>,
    }

    impl TreeReader for OneContract {
        fn get(&self, key: &TreeKey) -> Result<Option<B256>, LookupError> {
            if *key == get_code_size_key(&self.address) {
                return Ok(Some(encode_code_size(31)));
            }
            self.leaves
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| Some(*v))
                .ok_or_else(|| LookupError::Backend("unknown key".into()))
        }
    }

    let address = Address::repeat_byte(5);
    let code = [0x5bu8; 31];
    let chunk = chunkify_code(&code)[0];
    let tree =
        OneContract { address, leaves: vec![(get_code_chunk_key(&address, 0), chunk.encode())] };

    let resolver = TreeCodeResolver::new(&tree);
    assert_eq!(resolver.resolve(address).get_range(0, 30).unwrap().as_ref(), &code);
    assert_eq!(resolver.resolve(address).size().unwrap(), 31);
    let err = resolver.resolve(Address::ZERO).get_byte(0).unwrap_err();
    assert!(matches!(err, CodeError::ChunkLookup { source: LookupError::Backend(_), .. }));
}

#[cfg(feature = "trace")]
#[test]
fn pc_trace_replays_onto_chunks() {
    use ubt_code::{read_trace, PcTraceConfig, PcTracer};

    let dir = tempfile::tempdir().unwrap();
    let mut tracer = PcTracer::create(PcTraceConfig::new(dir.path())).unwrap();
    let address = Address::repeat_byte(0x11);
    let mut code = vec![0x00u8; 64];
    code[29] = 0x7f;

    tracer.on_tx_start(B256::repeat_byte(0xee), Some(address));
    tracer.on_opcode(address, 29, 0x7f);
    tracer.on_opcode(address, 62, 0x00);
    let path = tracer.on_tx_end(50_000, false, |_| code.clone()).unwrap().unwrap();

    let trace = read_trace(&path).unwrap();
    let pcs = &trace.contracts_pcs[&address];
    assert_eq!(pcs.len(), 34);
    let mut touched: Vec<u64> = pcs.iter().map(|pc| pc / 31).collect();
    touched.dedup();
    assert_eq!(touched, vec![0, 1, 2]);
}
