use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::config::Config;
use crate::error::{NalError, Result};
use crate::utils::{insert_emulation_prevention, remove_emulation_prevention};

use super::message::SeiMessage;
use super::{Codec, SeiData};

/// Messages found in one SEI RBSP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeiExtraction {
    /// Messages in bitstream order
    pub messages: Vec<SeiData>,
    /// The buffer ended after the last message without rbsp_trailing_bits.
    /// The messages are still complete.
    pub trailing_bits_missing: bool,
}

impl SeiExtraction {
    /// Splits into the messages and [`NalError::TrailingBitsMissing`] when
    /// the trailing bits were absent.
    pub fn into_result(self) -> (Vec<SeiData>, Result<()>) {
        let status = if self.trailing_bits_missing {
            Err(NalError::TrailingBitsMissing)
        } else {
            Ok(())
        };
        (self.messages, status)
    }
}

/// Returns the SEI RBSP of `nal` after checking its NAL unit type: 6 for
/// AVC, 39 (prefix) or 40 (suffix) for HEVC.
pub fn sei_nalu_payload(nal: &[u8], codec: Codec) -> Result<&[u8]> {
    let header = *nal.first().ok_or(NalError::TooFewBits)?;
    match codec {
        Codec::Avc => {
            let nal_type = header & 0x1F;
            if nal_type != 6 {
                return Err(NalError::InvalidData(format!(
                    "AVC NAL unit type {} is not SEI",
                    nal_type
                )));
            }
            Ok(&nal[1..])
        }
        Codec::Hevc => {
            let nal_type = (header >> 1) & 0x3F;
            if nal_type != 39 && nal_type != 40 {
                return Err(NalError::InvalidData(format!(
                    "HEVC NAL unit type {} is not SEI",
                    nal_type
                )));
            }
            nal.get(2..).ok_or(NalError::TooFewBits)
        }
    }
}

/// Extracts SEI messages with the process-wide [`Config`].
pub fn extract_sei_data(data: &[u8]) -> Result<SeiExtraction> {
    extract_sei_data_with(data, &Config::current())
}

/// Extracts the SEI messages from an escaped SEI RBSP (NAL header already
/// stripped).
///
/// A truncated type or size code, or a size running past the buffer, fails
/// with [`NalError::TooFewBits`].
pub fn extract_sei_data_with(data: &[u8], config: &Config) -> Result<SeiExtraction> {
    let mut rbsp = Bytes::from(remove_emulation_prevention(data));
    let mut messages = Vec::new();

    while rbsp.has_remaining() {
        if is_trailing_bits(&rbsp) {
            return Ok(SeiExtraction {
                messages,
                trailing_bits_missing: false,
            });
        }
        if messages.len() == config.max_sei_messages {
            return Err(NalError::InvalidData(format!(
                "more than {} SEI messages",
                config.max_sei_messages
            )));
        }

        let payload_type = read_ff_coded(&mut rbsp)?;
        let payload_size = read_ff_coded(&mut rbsp)? as usize;
        if payload_size > config.max_sei_payload_size {
            return Err(NalError::InvalidData(format!(
                "SEI payload size {} exceeds limit {}",
                payload_size, config.max_sei_payload_size
            )));
        }
        if payload_size > rbsp.remaining() {
            log::debug!(
                "SEI type {} claims {} bytes, {} left",
                payload_type,
                payload_size,
                rbsp.remaining()
            );
            return Err(NalError::TooFewBits);
        }

        let payload = rbsp.split_to(payload_size);
        log::debug!("SEI message type={} size={}", payload_type, payload_size);
        messages.push(SeiData {
            payload_type,
            payload,
        });
    }

    log::warn!(
        "SEI RBSP ended after {} messages without trailing bits",
        messages.len()
    );
    Ok(SeiExtraction {
        messages,
        trailing_bits_missing: true,
    })
}

fn is_trailing_bits(rbsp: &[u8]) -> bool {
    match rbsp.split_first() {
        Some((&0x80, rest)) => rest.iter().all(|&b| b == 0),
        _ => false,
    }
}

/// Reads a type or size coded as 0xFF continuation bytes plus a final byte.
fn read_ff_coded(buf: &mut Bytes) -> Result<u32> {
    let mut value = 0u32;
    loop {
        if !buf.has_remaining() {
            return Err(NalError::TooFewBits);
        }
        let byte = buf.get_u8();
        value = value
            .checked_add(u32::from(byte))
            .ok_or_else(|| NalError::InvalidData("SEI type or size overflows u32".into()))?;
        if byte != 0xFF {
            return Ok(value);
        }
    }
}

fn put_ff_coded(buf: &mut BytesMut, mut value: u32) {
    while value >= 0xFF {
        buf.put_u8(0xFF);
        value -= 0xFF;
    }
    buf.put_u8(value as u8);
}

/// Serializes raw messages into an escaped SEI RBSP, trailing bits included.
pub fn write_sei_data(messages: &[SeiData]) -> Vec<u8> {
    let mut rbsp = BytesMut::new();
    for sei in messages {
        put_ff_coded(&mut rbsp, sei.payload_type);
        put_ff_coded(&mut rbsp, sei.payload.len() as u32);
        rbsp.put_slice(&sei.payload);
    }
    rbsp.put_u8(0x80);
    insert_emulation_prevention(&rbsp)
}

/// Serializes typed messages into an escaped SEI RBSP.
pub fn write_sei_messages(messages: &[SeiMessage]) -> Result<Vec<u8>> {
    let raw = messages
        .iter()
        .map(SeiMessage::to_sei_data)
        .collect::<Result<Vec<_>>>()?;
    Ok(write_sei_data(&raw))
}
