//! Code segment analysis.
//!
//! Classifies every byte of a program as either an opcode or immediate PUSH data. The result is
//! needed both for jump target validation and for splitting code into chunks, where each chunk
//! records how many of its leading bytes are data spilled over from the previous chunk.

/// `PUSH1`, the first opcode with an immediate operand.
pub const PUSH1: u8 = 0x60;

/// `PUSH32`, the last opcode with an immediate operand.
pub const PUSH32: u8 = 0x7f;

/// `JUMPDEST`, the only valid jump target.
pub const JUMPDEST: u8 = 0x5b;

const WORD_BITS: u64 = u64::BITS as u64;

const SET_2_BITS_MASK: u64 = 0b11;
const SET_3_BITS_MASK: u64 = 0b111;
const SET_4_BITS_MASK: u64 = 0b1111;
const SET_5_BITS_MASK: u64 = 0b1_1111;
const SET_6_BITS_MASK: u64 = 0b11_1111;
const SET_7_BITS_MASK: u64 = 0b111_1111;

/// Masks for operand widths 8..=32, `WIDE_MASKS[n - 8]` has the low `n` bits set.
const WIDE_MASKS: [u64; 25] = {
    let mut masks = [0u64; 25];
    let mut width = 8;
    while width <= 32 {
        masks[width - 8] = u64::MAX >> (64 - width);
        width += 1;
    }
    masks
};

/// Number of immediate bytes following `op`, zero for everything but `PUSH1..=PUSH32`.
#[inline]
pub const fn push_data_len(op: u8) -> u8 {
    if op >= PUSH1 && op <= PUSH32 {
        op - PUSH1 + 1
    } else {
        0
    }
}

/// Bit vector mapping the bytes of a program.
///
/// An unset bit means the byte may be an opcode, a set bit means it's data (an argument of
/// `PUSHn`). The vector carries one spare word so a `PUSH32` at the very end of the code can mark
/// its operand without bounds checks.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct CodeBitmap {
    bits: Vec<u64>,
}

impl CodeBitmap {
    /// Collect the data locations in `code`.
    pub fn new(code: &[u8]) -> Self {
        let words = code.len().div_ceil(WORD_BITS as usize) + 1;
        let mut bitmap = Self { bits: vec![0; words] };
        bitmap.fill(code);
        bitmap
    }

    fn fill(&mut self, code: &[u8]) {
        let len = code.len() as u64;
        let mut pc = 0u64;
        while pc < len {
            let op = code[pc as usize];
            pc += 1;
            let numbits = push_data_len(op) as u64;
            match numbits {
                0 => continue,
                1 => self.set1(pc),
                2 => self.set_n(SET_2_BITS_MASK, 2, pc),
                3 => self.set_n(SET_3_BITS_MASK, 3, pc),
                4 => self.set_n(SET_4_BITS_MASK, 4, pc),
                5 => self.set_n(SET_5_BITS_MASK, 5, pc),
                6 => self.set_n(SET_6_BITS_MASK, 6, pc),
                7 => self.set_n(SET_7_BITS_MASK, 7, pc),
                _ => self.set_n(WIDE_MASKS[numbits as usize - 8], numbits, pc),
            }
            pc += numbits;
        }
    }

    #[inline]
    fn set1(&mut self, pos: u64) {
        self.bits[(pos / WORD_BITS) as usize] |= 1 << (pos % WORD_BITS);
    }

    /// Set `numbits` bits starting at `pc`, spilling into the next word when the run crosses a
    /// word boundary.
    #[inline]
    fn set_n(&mut self, flag: u64, numbits: u64, pc: u64) {
        let word = (pc / WORD_BITS) as usize;
        let bit_idx = pc % WORD_BITS;
        self.bits[word] |= flag << bit_idx;
        if numbits + bit_idx > WORD_BITS {
            self.bits[word + 1] |= flag >> (WORD_BITS - bit_idx);
        }
    }

    /// Returns `true` if the byte at `pos` is not PUSH data.
    ///
    /// Positions past the end of the bitmap read as code.
    #[inline]
    pub fn is_code_segment(&self, pos: u64) -> bool {
        !self.is_data(pos)
    }

    /// Returns `true` if the byte at `pos` is an operand of a preceding `PUSHn`.
    #[inline]
    pub fn is_data(&self, pos: u64) -> bool {
        usize::try_from(pos / WORD_BITS)
            .ok()
            .and_then(|word| self.bits.get(word))
            .is_some_and(|word| (word >> (pos % WORD_BITS)) & 1 == 1)
    }

    /// Number of consecutive data bytes starting at `pos`, at most `max`.
    pub fn leading_data_len(&self, pos: u64, max: u64) -> u64 {
        (0..max).take_while(|&i| self.is_data(pos.saturating_add(i))).count() as u64
    }

    /// Returns `true` if `dest` is a `JUMPDEST` opcode of `code`.
    ///
    /// `code` must be the program this bitmap was built from.
    pub fn is_valid_jump_dest(&self, code: &[u8], dest: u64) -> bool {
        usize::try_from(dest)
            .ok()
            .and_then(|dest| code.get(dest))
            .is_some_and(|&op| op == JUMPDEST)
            && self.is_code_segment(dest)
    }

    /// The raw bitmap words, least significant bit first.
    pub fn as_words(&self) -> &[u64] {
        &self.bits
    }
}

impl std::fmt::Debug for CodeBitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.bits.iter().map(|w| format!("{w:#066b}"))).finish()
    }
}
