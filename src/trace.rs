//! Per-transaction program counter traces.
//!
//! Records which code bytes every contract touched during a transaction (opcodes plus their
//! PUSH operands) and persists the result together with the bytecode of each contract, so chunk
//! access patterns can be replayed offline.

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashSet},
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

use crate::push_data_len;

/// Name of the bytecode directory below the output directory.
const CODE_DIR: &str = "code";

/// Errors raised while persisting traces.
#[derive(Debug, Error)]
pub enum TraceError {
    /// Filesystem failure.
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The trace could not be serialized.
    #[error("encode trace: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Where the tracer writes its output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcTraceConfig {
    /// Directory receiving one trace file per transaction and a `code/` directory of bytecodes.
    pub output_dir: PathBuf,
}

impl PcTraceConfig {
    /// Write traces below `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self { output_dir: output_dir.into() }
    }

    /// Directory holding one file per traced contract's bytecode.
    pub fn code_dir(&self) -> PathBuf {
        self.output_dir.join(CODE_DIR)
    }

    /// Path of the trace of transaction `tx_hash`.
    pub fn trace_path(&self, tx_hash: &B256) -> PathBuf {
        self.output_dir.join(format!("{tx_hash}.json"))
    }
}

/// Code positions touched by one transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxPcTrace {
    /// Every executed position per contract, in execution order.
    pub contracts_pcs: BTreeMap<Address, Vec<u64>>,
    /// Gas used according to the receipt.
    pub receipt_gas: u64,
    /// Recipient of the transaction.
    pub to: Address,
}

/// Collects program counters while a transaction runs and writes them out when it ends.
#[derive(Debug)]
pub struct PcTracer {
    config: PcTraceConfig,
    saved_bytecodes: HashSet<Address>,
    pending_bytecodes: HashSet<Address>,
    skip: bool,
    current_tx: B256,
    output: TxPcTrace,
}

impl PcTracer {
    /// Create a tracer, making sure its output directories exist.
    pub fn create(config: PcTraceConfig) -> Result<Self, TraceError> {
        let code_dir = config.code_dir();
        fs::create_dir_all(&code_dir).map_err(|source| TraceError::Io { path: code_dir, source })?;
        debug!(dir = %config.output_dir.display(), "pc tracer ready");
        Ok(Self {
            config,
            saved_bytecodes: HashSet::new(),
            pending_bytecodes: HashSet::new(),
            skip: true,
            current_tx: B256::ZERO,
            output: TxPcTrace::default(),
        })
    }

    /// The tracer's configuration.
    pub const fn config(&self) -> &PcTraceConfig {
        &self.config
    }

    /// Start tracing `tx_hash`. Contract creations (`to == None`) are not traced.
    pub fn on_tx_start(&mut self, tx_hash: B256, to: Option<Address>) {
        self.skip = to.is_none();
        self.pending_bytecodes.clear();
        self.output = TxPcTrace::default();
        let Some(to) = to else { return };

        self.current_tx = tx_hash;
        self.output.to = to;
    }

    /// Record the execution of `op` at `pc` in the code of `address`.
    pub fn on_opcode(&mut self, address: Address, pc: u64, op: u8) {
        if self.skip {
            return;
        }
        if !self.saved_bytecodes.contains(&address) {
            self.pending_bytecodes.insert(address);
        }
        let end_pc = pc.saturating_add(push_data_len(op) as u64);
        self.output.contracts_pcs.entry(address).or_default().extend(pc..=end_pc);
    }

    /// Finish the current transaction and persist its trace.
    ///
    /// `code_of` supplies the bytecode of every contract seen for the first time; contracts
    /// without code are dropped from the trace. Returns the path of the written trace, or `None`
    /// when there was nothing to write.
    pub fn on_tx_end<F>(
        &mut self,
        receipt_gas: u64,
        failed: bool,
        mut code_of: F,
    ) -> Result<Option<PathBuf>, TraceError>
    where
        F: FnMut(Address) -> Vec<u8>,
    {
        if self.skip || failed || self.output.contracts_pcs.is_empty() {
            return Ok(None);
        }

        let code_dir = self.config.code_dir();
        for address in std::mem::take(&mut self.pending_bytecodes) {
            let bytecode = code_of(address);
            if bytecode.is_empty() {
                self.output.contracts_pcs.remove(&address);
                continue;
            }
            write_file(&code_dir.join(address.to_string()), &bytecode)?;
            self.saved_bytecodes.insert(address);
        }

        self.output.receipt_gas = receipt_gas;
        let path = self.config.trace_path(&self.current_tx);
        let encoded = serde_json::to_vec(&self.output).map_err(|err| {
            warn!(tx = %self.current_tx, %err, "failed to encode pc trace");
            TraceError::from(err)
        })?;
        write_file(&path, &encoded)?;
        debug!(
            tx = %self.current_tx,
            contracts = self.output.contracts_pcs.len(),
            "wrote pc trace"
        );
        Ok(Some(path))
    }
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), TraceError> {
    fs::write(path, contents).map_err(|source| {
        warn!(path = %path.display(), %source, "failed to write pc trace output");
        TraceError::Io { path: path.to_path_buf(), source }
    })
}

/// Read back a trace written by [`PcTracer`].
pub fn read_trace(path: &Path) -> Result<TxPcTrace, TraceError> {
    let bytes =
        fs::read(path).map_err(|source| TraceError::Io { path: path.to_path_buf(), source })?;
    Ok(serde_json::from_slice(&bytes)?)
}
