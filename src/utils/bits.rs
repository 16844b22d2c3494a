use bitvec::prelude::*;

use crate::error::{NalError, Result};

/// A bit-level reader for parsing binary data streams.
///
/// Implements H.264/H.265 style bit reading operations including:
/// - Reading individual bits
/// - Reading multiple bits as numbers
/// - Reading exponential Golomb codes (ue(v))
/// - Reading signed exponential Golomb codes (se(v))
///
/// A reader created with [`BitReader::new_ebsp`] drops emulation prevention
/// bytes (`00 00 03`) as it goes, so callers see RBSP bits while
/// [`BitReader::bytes_consumed`] still counts the escaped input.
///
/// The first failure is sticky: once a read has failed, every further read
/// returns the same error, and [`BitReader::first_error`] reports it.
///
/// Example:
/// ```
/// use nalkit::utils::BitReader;
///
/// let data = [0b10110011];
/// let mut reader = BitReader::new(&data);
///
/// assert_eq!(reader.read_bit().unwrap(), true);   // 1
/// assert_eq!(reader.read_bits(3).unwrap(), 0b011); // 011
/// ```
pub struct BitReader<'a> {
    data: &'a [u8],
    byte_offset: usize,
    bit_offset: u8,
    escaped: bool,
    zero_run: u8,
    bits_read: usize,
    error: Option<NalError>,
}

impl<'a> BitReader<'a> {
    /// Creates a new BitReader over RBSP data (no escape bytes)
    pub fn new(data: &'a [u8]) -> Self {
        BitReader {
            data,
            byte_offset: 0,
            bit_offset: 0,
            escaped: false,
            zero_run: 0,
            bits_read: 0,
            error: None,
        }
    }

    /// Creates a BitReader over EBSP data, removing emulation prevention
    /// bytes transparently
    pub fn new_ebsp(data: &'a [u8]) -> Self {
        BitReader {
            escaped: true,
            ..BitReader::new(data)
        }
    }

    fn fail(&mut self, err: NalError) -> NalError {
        match &self.error {
            Some(first) => first.clone(),
            None => {
                self.error = Some(err.clone());
                err
            }
        }
    }

    fn check(&self) -> Result<()> {
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Reads a single bit from the stream.
    /// Returns true for 1, false for 0.
    ///
    /// Returns error if end of data is reached.
    pub fn read_bit(&mut self) -> Result<bool> {
        self.check()?;

        if self.bit_offset == 0
            && self.escaped
            && self.zero_run >= 2
            && self.data.get(self.byte_offset) == Some(&0x03)
        {
            self.byte_offset += 1;
            self.zero_run = 0;
        }

        let byte = match self.data.get(self.byte_offset) {
            Some(&b) => b,
            None => return Err(self.fail(NalError::TooFewBits)),
        };

        let bit = (byte >> (7 - self.bit_offset)) & 1;
        self.bit_offset += 1;
        self.bits_read += 1;

        if self.bit_offset == 8 {
            self.finish_byte();
        }

        Ok(bit == 1)
    }

    /// Alias of [`BitReader::read_bit`] matching the u(1) flag syntax.
    pub fn read_flag(&mut self) -> Result<bool> {
        self.read_bit()
    }

    fn finish_byte(&mut self) {
        let byte = self.data[self.byte_offset];
        self.zero_run = if byte == 0 {
            self.zero_run.saturating_add(1)
        } else {
            0
        };
        self.bit_offset = 0;
        self.byte_offset += 1;
    }

    /// Reads n bits and returns them as a number.
    /// The bits are interpreted as big-endian.
    ///
    /// Returns error if n > 32 or end of data is reached.
    pub fn read_bits(&mut self, n: u32) -> Result<u32> {
        self.check()?;
        if n > 32 {
            return Err(self.fail(NalError::InvalidData(format!(
                "cannot read {} bits into u32",
                n
            ))));
        }

        let mut value = 0u64;
        for _ in 0..n {
            value = (value << 1) | u64::from(self.read_bit()?);
        }

        Ok(value as u32)
    }

    /// Reads an unsigned exponential Golomb code (ue(v)) as specified in H.264/H.265.
    ///
    /// Format:
    /// 1. M leading zeros followed by a 1
    /// 2. M more INFO bits
    /// 3. Value = 2^M + INFO - 1
    ///
    /// Example: "00110" (M=2, INFO=10)
    /// - Count zeros until 1: M=2
    /// - Read 2 more bits: INFO=10=2
    /// - Value = 2^2 + 2 - 1 = 4 + 2 - 1 = 5
    pub fn read_golomb(&mut self) -> Result<u32> {
        let mut leading_zeros = 0u32;
        while !self.read_bit()? {
            leading_zeros += 1;
            if leading_zeros > 31 {
                return Err(self.fail(NalError::InvalidData("invalid Golomb code".into())));
            }
        }

        if leading_zeros == 0 {
            return Ok(0);
        }

        let info = self.read_bits(leading_zeros)?;
        Ok(((1u64 << leading_zeros) - 1 + u64::from(info)) as u32)
    }

    /// Alias of [`BitReader::read_golomb`].
    pub fn read_unsigned_exp_golomb(&mut self) -> Result<u32> {
        self.read_golomb()
    }

    /// Reads a signed exponential Golomb code (se(v)) as specified in H.264/H.265.
    ///
    /// The mapping from unsigned (k) to signed is:
    /// - k=0 -> 0
    /// - For k>0:
    ///   * magnitude = (k+1)>>1
    ///   * sign from parity (odd k -> positive, even k -> negative)
    ///
    /// Example: k=4
    /// - magnitude = (4+1)>>1 = 2
    /// - k is even -> negative
    /// - value = -2
    pub fn read_signed_golomb(&mut self) -> Result<i32> {
        let k = self.read_golomb()?;
        if k == 0 {
            return Ok(0);
        }

        let magnitude = ((u64::from(k) + 1) >> 1) as i32;
        let sign = if k & 1 == 1 { 1 } else { -1 };
        Ok(sign * magnitude)
    }

    /// Alias of [`BitReader::read_signed_golomb`].
    pub fn read_signed_exp_golomb(&mut self) -> Result<i32> {
        self.read_signed_golomb()
    }

    /// Skips n bits in the stream.
    pub fn skip_bits(&mut self, n: u32) -> Result<()> {
        for _ in 0..n {
            self.read_bit()?;
        }
        Ok(())
    }

    /// Aligns reader to next byte boundary by skipping remaining bits in current byte.
    pub fn align_byte(&mut self) -> Result<()> {
        self.check()?;
        if self.bit_offset != 0 {
            self.bits_read += 8 - self.bit_offset as usize;
            self.finish_byte();
        }
        Ok(())
    }

    /// Returns true when the next read starts on a byte boundary.
    pub fn is_byte_aligned(&self) -> bool {
        self.bit_offset == 0
    }

    /// Returns number of bits available to read.
    ///
    /// For escaped input this counts escape bytes not yet reached, so it is
    /// an upper bound.
    pub fn available_bits(&self) -> usize {
        (self.data.len().saturating_sub(self.byte_offset) * 8)
            .saturating_sub(self.bit_offset as usize)
    }

    /// Number of input bytes touched so far, escape bytes included. A byte
    /// only partly read counts as consumed.
    pub fn bytes_consumed(&self) -> usize {
        self.byte_offset + usize::from(self.bit_offset != 0)
    }

    /// Number of payload bits read so far, escape bytes excluded.
    pub fn bits_read(&self) -> usize {
        self.bits_read
    }

    /// Position in the escaped input, in bits.
    pub fn bit_position(&self) -> usize {
        self.byte_offset * 8 + self.bit_offset as usize
    }

    /// The first error hit by this reader, if any.
    pub fn first_error(&self) -> Option<NalError> {
        self.error.clone()
    }

    /// Reads the bits left in the current byte, returning `(value, count)`.
    /// `count` is zero when the reader is byte aligned.
    pub fn read_to_byte_boundary(&mut self) -> Result<(u8, u8)> {
        if self.bit_offset == 0 {
            self.check()?;
            return Ok((0, 0));
        }
        let count = 8 - self.bit_offset;
        let value = self.read_bits(u32::from(count))? as u8;
        Ok((value, count))
    }

    /// Whole bytes after the current position. Only meaningful for RBSP
    /// readers; escape bytes are not removed from the returned slice.
    pub fn remaining_bytes(&self) -> &'a [u8] {
        let start = self.bytes_consumed().min(self.data.len());
        &self.data[start..]
    }

    /// True while syntax bits remain before the rbsp_stop_one_bit, i.e. the
    /// last set bit of the buffer.
    pub fn more_rbsp_data(&self) -> bool {
        let Some(last) = self.data.iter().rposition(|&b| b != 0) else {
            return false;
        };
        let stop_bit = last * 8 + 7 - self.data[last].trailing_zeros() as usize;
        self.byte_offset * 8 + (self.bit_offset as usize) < stop_bit
    }
}

/// Ceil(Log2(x)) in exact integer arithmetic; 0 for x <= 1.
pub fn ceil_log2(x: u32) -> u32 {
    if x <= 1 {
        0
    } else {
        32 - (x - 1).leading_zeros()
    }
}

/// A bit-level writer producing MSB-first bytes, the inverse of
/// [`BitReader`] over RBSP data.
///
/// Example:
/// ```
/// use nalkit::utils::{BitReader, BitWriter};
///
/// let mut writer = BitWriter::new();
/// writer.write_golomb(5);
/// writer.write_signed_golomb(-2);
/// let data = writer.into_bytes();
///
/// let mut reader = BitReader::new(&data);
/// assert_eq!(reader.read_golomb().unwrap(), 5);
/// assert_eq!(reader.read_signed_golomb().unwrap(), -2);
/// ```
#[derive(Debug, Default, Clone)]
pub struct BitWriter {
    bits: BitVec<u8, Msb0>,
}

impl BitWriter {
    /// An empty writer.
    pub fn new() -> Self {
        Self { bits: BitVec::new() }
    }

    /// Appends one bit.
    pub fn write_bit(&mut self, bit: bool) {
        self.bits.push(bit);
    }

    /// Writes the low `n` bits of `value`, most significant first.
    pub fn write_bits(&mut self, value: u32, n: u32) -> Result<()> {
        if n > 32 {
            return Err(NalError::InvalidData(format!("cannot write {} bits from u32", n)));
        }
        for i in (0..n).rev() {
            self.bits.push((value >> i) & 1 == 1);
        }
        Ok(())
    }

    fn write_golomb_u64(&mut self, value: u64) {
        let coded = value + 1;
        let len = 64 - coded.leading_zeros();
        for _ in 1..len {
            self.bits.push(false);
        }
        for i in (0..len).rev() {
            self.bits.push((coded >> i) & 1 == 1);
        }
    }

    /// Writes `value` as ue(v).
    pub fn write_golomb(&mut self, value: u32) {
        self.write_golomb_u64(u64::from(value));
    }

    /// Writes `value` as se(v).
    pub fn write_signed_golomb(&mut self, value: i32) {
        let value = i64::from(value);
        let k = if value > 0 { 2 * value - 1 } else { -2 * value };
        self.write_golomb_u64(k as u64);
    }

    /// Appends whole bytes at the current bit position.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            for i in (0..8).rev() {
                self.bits.push((byte >> i) & 1 == 1);
            }
        }
    }

    /// Bits written so far.
    pub fn bit_len(&self) -> usize {
        self.bits.len()
    }

    /// True when the bit count is a multiple of 8.
    pub fn is_byte_aligned(&self) -> bool {
        self.bits.len() % 8 == 0
    }

    /// Pads with zero bits up to the next byte boundary.
    pub fn align_zero(&mut self) {
        while !self.is_byte_aligned() {
            self.bits.push(false);
        }
    }

    /// Writes rbsp_stop_one_bit and zero alignment bits.
    pub fn write_trailing_bits(&mut self) {
        self.bits.push(true);
        self.align_zero();
    }

    /// Zero-pads to a byte boundary and returns the bytes.
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.align_zero();
        self.bits.into_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_read_bits() {
        // Simple pattern within a byte
        let data = [0b10110011];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bits(3).unwrap(), 0b101);
        assert_eq!(reader.read_bits(5).unwrap(), 0b10011);

        // Cross-byte boundary
        let data = [0b10110011, 0b01011010];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bits(3).unwrap(), 0b101);
        assert_eq!(reader.read_bits(8).unwrap(), 0b10011010);

        // Reading zero bits
        let data = [0b10101010];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bits(0).unwrap(), 0);

        // Full 32 bits
        let data = [0xde, 0xad, 0xbe, 0xef];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bits(32).unwrap(), 0xdeadbeef);

        // Error on too many bits
        let data = [0xFF];
        let mut reader = BitReader::new(&data);
        assert!(reader.read_bits(33).is_err());
    }

    #[test]
    fn test_read_golomb() {
        // Known ue(v) codewords
        let test_cases = [
            ([0b10000000], 0, "1"),
            ([0b01000000], 1, "010"),
            ([0b01100000], 2, "011"),
            ([0b00100000], 3, "00100"),
            ([0b00101000], 4, "00101"),
            ([0b00110000], 5, "00110"),
            ([0b00111000], 6, "00111"),
            ([0b00010000], 7, "0001000"),
            ([0b00010010], 8, "0001001"),
        ];

        for (input, expected, pattern) in test_cases.iter() {
            let mut reader = BitReader::new(input);
            let result = reader.read_golomb().unwrap();
            assert_eq!(result, *expected, "Failed for pattern {}", pattern);

            let mut writer = BitWriter::new();
            writer.write_golomb(*expected);
            assert_eq!(&writer.into_bytes()[..], &input[..], "Encoding {} gave wrong pattern", expected);
        }

        // 40 zeros is not a valid code
        let data = vec![0; 5];
        let mut reader = BitReader::new(&data);
        assert!(matches!(reader.read_golomb(), Err(NalError::InvalidData(_))));
    }

    #[test]
    fn test_signed_golomb() {
        let test_cases = [
            ([0b10000000], 0, "k=0 -> 0"),
            ([0b01000000], 1, "k=1 -> +1"),
            ([0b01100000], -1, "k=2 -> -1"),
            ([0b00100000], 2, "k=3 -> +2"),
            ([0b00101000], -2, "k=4 -> -2"),
            ([0b00110000], 3, "k=5 -> +3"),
            ([0b00111000], -3, "k=6 -> -3"),
        ];

        for (input, expected, desc) in test_cases.iter() {
            let mut reader = BitReader::new(input);
            assert_eq!(reader.read_signed_golomb().unwrap(), *expected, "{}", desc);
        }
    }

    #[test]
    fn test_sticky_error() {
        let data = [0xFF];
        let mut reader = BitReader::new(&data);
        reader.read_bits(8).unwrap();
        assert!(reader.first_error().is_none());

        assert!(matches!(reader.read_bit(), Err(NalError::TooFewBits)));
        assert!(matches!(reader.first_error(), Some(NalError::TooFewBits)));

        // Later reads keep reporting the first failure
        assert!(matches!(reader.read_golomb(), Err(NalError::TooFewBits)));
        assert!(matches!(reader.align_byte(), Err(NalError::TooFewBits)));
        assert_eq!(reader.bytes_consumed(), 1);
    }

    #[test]
    fn test_escape_bytes_removed() {
        // 00 00 03 01 carries RBSP bytes 00 00 01
        let data = [0x00, 0x00, 0x03, 0x01, 0x80];
        let mut reader = BitReader::new_ebsp(&data);
        assert_eq!(reader.read_bits(24).unwrap(), 0x000001);
        assert_eq!(reader.bytes_consumed(), 4);
        assert_eq!(reader.read_bits(8).unwrap(), 0x80);
        assert_eq!(reader.bits_read(), 32);
        assert_eq!(reader.bytes_consumed(), 5);

        // The escape byte is only consumed once the next byte is needed
        let data = [0x00, 0x00, 0x03, 0x00];
        let mut reader = BitReader::new_ebsp(&data);
        reader.read_bits(16).unwrap();
        assert_eq!(reader.bytes_consumed(), 2);
        assert_eq!(reader.read_bits(8).unwrap(), 0);
        assert_eq!(reader.bytes_consumed(), 4);

        // Plain readers keep 0x03
        let data = [0x00, 0x00, 0x03];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bits(24).unwrap(), 0x000003);
    }

    #[test]
    fn test_escape_run_restarts_after_removal() {
        // 00 00 03 00 00 03 00 -> 00 00 00 00 00
        let data = [0x00, 0x00, 0x03, 0x00, 0x00, 0x03, 0x00];
        let mut reader = BitReader::new_ebsp(&data);
        for _ in 0..5 {
            assert_eq!(reader.read_bits(8).unwrap(), 0);
        }
        assert!(reader.read_bit().is_err());
    }

    #[test]
    fn test_partial_byte_counts_as_consumed() {
        let data = [0xAA, 0xBB];
        let mut reader = BitReader::new(&data);
        reader.read_bits(9).unwrap();
        assert_eq!(reader.bytes_consumed(), 2);
        assert_eq!(reader.read_to_byte_boundary().unwrap(), (0xBB & 0x7F, 7));
        assert_eq!(reader.read_to_byte_boundary().unwrap(), (0, 0));
        assert!(reader.remaining_bytes().is_empty());
    }

    #[test]
    fn test_align_byte() {
        let data = [0xFF, 0x00];
        let mut reader = BitReader::new(&data);
        reader.read_bits(3).unwrap();
        assert!(!reader.is_byte_aligned());
        reader.align_byte().unwrap();
        assert!(reader.is_byte_aligned());
        assert_eq!(reader.bytes_consumed(), 1);
        assert_eq!(reader.read_bits(8).unwrap(), 0);
    }

    #[test]
    fn test_writer_trailing_bits() {
        let mut writer = BitWriter::new();
        writer.write_bits(0b101, 3).unwrap();
        writer.write_trailing_bits();
        assert_eq!(writer.into_bytes(), vec![0b10110000]);

        let mut writer = BitWriter::new();
        writer.write_bytes(&[0x12, 0x34]);
        writer.write_bit(true);
        assert_eq!(writer.bit_len(), 17);
        assert_eq!(writer.into_bytes(), vec![0x12, 0x34, 0x80]);
    }

    #[test]
    fn test_more_rbsp_data() {
        // 1 | 1 | stop bit
        let data = [0b1110_0000];
        let mut reader = BitReader::new(&data);
        assert!(reader.more_rbsp_data());
        reader.read_bits(2).unwrap();
        assert!(!reader.more_rbsp_data());

        let data = [0x40, 0x80, 0x00];
        let mut reader = BitReader::new(&data);
        reader.read_bits(8).unwrap();
        assert!(!reader.more_rbsp_data());
    }

    #[test]
    fn test_ceil_log2_boundaries() {
        let cases = [(0, 0), (1, 0), (2, 1), (3, 2), (4, 2), (5, 3), (8, 3), (9, 4), (1 << 31, 31)];
        for (x, expected) in cases {
            assert_eq!(ceil_log2(x), expected, "ceil_log2({})", x);
        }
        assert_eq!(ceil_log2(u32::MAX), 32);
    }

    #[quickcheck]
    fn prop_ceil_log2_brackets_value(x: u32) -> bool {
        if x <= 1 {
            return ceil_log2(x) == 0;
        }
        let bits = ceil_log2(x);
        let upper = 1u64 << bits;
        let lower = 1u64 << (bits - 1);
        (x as u64) <= upper && (x as u64) > lower
    }

    #[quickcheck]
    fn prop_read_bits_matches_manual(data: Vec<u8>, n: u8) -> bool {
        if data.is_empty() {
            return true;
        }

        let mut reader = BitReader::new(&data);
        let n = n % 33;

        match reader.read_bits(n as u32) {
            Ok(result) => {
                let mut expected = 0u64;
                for i in 0..n as usize {
                    let bit = (data[i / 8] >> (7 - (i % 8))) & 1;
                    expected = (expected << 1) | bit as u64;
                }
                result as u64 == expected
            }
            Err(_) => (n as usize) > data.len() * 8,
        }
    }

    #[quickcheck]
    fn prop_golomb_round_trip(values: Vec<u32>, signed: Vec<i32>) -> bool {
        // ue(v) tops out at 2^32 - 2 with a 31-zero prefix
        let values: Vec<u32> = values.into_iter().map(|v| v.min(u32::MAX - 1)).collect();
        let signed: Vec<i32> = signed.into_iter().map(|v| v.max(-i32::MAX)).collect();

        let mut writer = BitWriter::new();
        for &v in &values {
            writer.write_golomb(v);
        }
        for &v in &signed {
            writer.write_signed_golomb(v);
        }
        let encoded = writer.into_bytes();
        let mut reader = BitReader::new(&encoded);

        values.iter().all(|&v| reader.read_golomb().ok() == Some(v))
            && signed.iter().all(|&v| reader.read_signed_golomb().ok() == Some(v))
    }
}
