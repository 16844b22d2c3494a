use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use super::pps::{parse_pps, Pps};
use super::slice::{parse_slice_header_with, peek_pic_parameter_set_id, SliceHeader};
use super::sps::{parse_sps, Sps};
use super::types::{NALUnit, NALUnitType};
use crate::config::Config;
use crate::error::{NalError, Result};

#[derive(Debug, Default)]
struct ParserState {
    sps: HashMap<u32, Sps>,
    pps: HashMap<u32, Pps>,
}

/// Stateful H.264 parser that remembers parameter sets by id and resolves
/// the SPS/PPS pair governing each slice.
///
/// Clones share the same parameter set tables.
#[derive(Debug, Clone, Default)]
pub struct H264Parser {
    state: Arc<Mutex<ParserState>>,
}

impl H264Parser {
    /// A parser with no parameter sets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps one NAL unit, storing it when it is an SPS or PPS.
    pub fn parse_nalu(&self, data: &[u8]) -> Result<NALUnit> {
        let nalu = NALUnit::new(Bytes::copy_from_slice(data))?;
        log::debug!("NAL unit {} ({} bytes)", nalu.unit_type(), data.len());

        match nalu.unit_type() {
            NALUnitType::SPS => {
                let sps = parse_sps(data)?;
                let mut state = self.state.lock();
                state.sps.insert(sps.seq_parameter_set_id, sps);
            }
            NALUnitType::PPS => {
                let mut state = self.state.lock();
                let pps = parse_pps(data, &state.sps)?;
                state.pps.insert(pps.pic_parameter_set_id, pps);
            }
            _ => {}
        }

        Ok(nalu)
    }

    /// Parses every NAL unit of an Annex B byte stream.
    pub fn parse_annexb(&self, data: &[u8]) -> Result<Vec<NALUnit>> {
        split_annexb(data)
            .into_iter()
            .map(|nal| self.parse_nalu(nal))
            .collect()
    }

    /// Parses a slice header using the stored parameter sets.
    pub fn parse_slice_header(&self, nal: &[u8]) -> Result<SliceHeader> {
        self.parse_slice_header_with(nal, &Config::current())
    }

    /// Like [`H264Parser::parse_slice_header`] with explicit limits.
    pub fn parse_slice_header_with(&self, nal: &[u8], config: &Config) -> Result<SliceHeader> {
        let pps_id = peek_pic_parameter_set_id(nal)?;
        let state = self.state.lock();
        let pps = state
            .pps
            .get(&pps_id)
            .ok_or_else(|| NalError::UnknownParameterSet(format!("pps id {}", pps_id)))?;
        let sps = state.sps.get(&pps.seq_parameter_set_id).ok_or_else(|| {
            NalError::UnknownParameterSet(format!("sps id {}", pps.seq_parameter_set_id))
        })?;
        parse_slice_header_with(nal, sps, pps, config)
    }

    /// A copy of the stored SPS with this id.
    pub fn sps(&self, id: u32) -> Option<Sps> {
        self.state.lock().sps.get(&id).cloned()
    }

    /// A copy of the stored PPS with this id.
    pub fn pps(&self, id: u32) -> Option<Pps> {
        self.state.lock().pps.get(&id).cloned()
    }

    /// Cropped dimensions from the lowest-numbered SPS.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        let state = self.state.lock();
        state
            .sps
            .iter()
            .min_by_key(|(id, _)| **id)
            .map(|(_, sps)| (sps.width(), sps.height()))
    }

    /// See [`NALUnit::is_keyframe`].
    pub fn is_keyframe(&self, nalu: &NALUnit) -> bool {
        nalu.is_keyframe()
    }
}

/// Splits a sample of 4-byte big-endian length-prefixed NAL units.
pub fn nalus_from_sample(sample: &[u8]) -> Result<Vec<&[u8]>> {
    nalus_from_sample_with_length_size(sample, 4)
}

/// Splits a sample of length-prefixed NAL units, `length_size` being 1, 2
/// or 4 as signalled in the avcC record.
pub fn nalus_from_sample_with_length_size(sample: &[u8], length_size: usize) -> Result<Vec<&[u8]>> {
    if !matches!(length_size, 1 | 2 | 4) {
        return Err(NalError::InvalidData(format!(
            "unsupported NAL length size {}",
            length_size
        )));
    }
    if sample.len() < length_size {
        return Err(NalError::InvalidData(format!(
            "sample of {} bytes holds no NAL units",
            sample.len()
        )));
    }

    let mut nalus = Vec::new();
    let mut pos = 0;
    while pos + length_size <= sample.len() {
        let length = sample[pos..pos + length_size]
            .iter()
            .fold(0usize, |acc, &b| (acc << 8) | usize::from(b));
        pos += length_size;
        let end = pos
            .checked_add(length)
            .filter(|&end| end <= sample.len())
            .ok_or_else(|| {
                NalError::InvalidData(format!(
                    "NAL length {} at offset {} exceeds sample of {} bytes",
                    length,
                    pos - length_size,
                    sample.len()
                ))
            })?;
        nalus.push(&sample[pos..end]);
        pos = end;
    }

    if pos != sample.len() {
        return Err(NalError::InvalidData(format!(
            "{} trailing bytes after last NAL unit",
            sample.len() - pos
        )));
    }

    Ok(nalus)
}

/// Splits an Annex B byte stream on `00 00 01` and `00 00 00 01` start codes.
/// Trailing zero bytes before a start code are dropped.
pub fn split_annexb(data: &[u8]) -> Vec<&[u8]> {
    let mut starts = Vec::new();
    let mut i = 0;
    while i + 3 <= data.len() {
        if data[i] == 0 && data[i + 1] == 0 && data[i + 2] == 1 {
            starts.push((i, i + 3));
            i += 3;
        } else {
            i += 1;
        }
    }

    let mut nalus = Vec::with_capacity(starts.len());
    for (n, &(_, payload_start)) in starts.iter().enumerate() {
        let mut end = starts.get(n + 1).map_or(data.len(), |&(code, _)| code);
        while end > payload_start && data[end - 1] == 0 {
            end -= 1;
        }
        if end > payload_start {
            nalus.push(&data[payload_start..end]);
        }
    }
    nalus
}
