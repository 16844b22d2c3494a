use std::fmt;

use bytes::Bytes;

use crate::error::Result;
use crate::utils::{BitReader, BitWriter};

use super::timing::{read_signed_bits, write_signed_bits, ClockTime, PayloadTail};
use super::{SeiData, SeiType};

/// One clock of an HEVC time_code message (D.2.27).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeCodeClock {
    /// Clock units are fields rather than frames
    pub units_field_based_flag: bool,
    /// Table D-2 counting type
    pub counting_type: u8,
    /// Hours, minutes and seconds all present
    pub full_timestamp_flag: bool,
    /// Discontinuity before this timestamp
    pub discontinuity_flag: bool,
    /// Frame counts were skipped
    pub cnt_dropped_flag: bool,
    /// Frame count within the second
    pub n_frames: u16,
    /// Hours, minutes and seconds
    pub time: ClockTime,
    /// Bits in time_offset_value
    pub time_offset_length: u8,
    /// Signed offset in clock ticks
    pub time_offset_value: i32,
}

/// time_code (HEVC, payload type 136).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeCode {
    /// One slot per num_clock_ts; `None` where clock_timestamp_flag is 0.
    pub clocks: Vec<Option<TimeCodeClock>>,
    payload_size: usize,
    tail: PayloadTail,
}

/// Decodes an HEVC time_code payload. Bits after the last clock are kept
/// for [`TimeCode::payload`].
pub fn decode_time_code(sei: &SeiData) -> Result<TimeCode> {
    let mut reader = BitReader::new(&sei.payload);
    let num_clock_ts = reader.read_bits(2)? as usize;

    let mut clocks = Vec::with_capacity(num_clock_ts);
    for _ in 0..num_clock_ts {
        if !reader.read_bit()? {
            clocks.push(None);
            continue;
        }
        let units_field_based_flag = reader.read_bit()?;
        let counting_type = reader.read_bits(5)? as u8;
        let full_timestamp_flag = reader.read_bit()?;
        let discontinuity_flag = reader.read_bit()?;
        let cnt_dropped_flag = reader.read_bit()?;
        let n_frames = reader.read_bits(9)? as u16;
        let time = ClockTime::read(&mut reader, full_timestamp_flag)?;
        let time_offset_length = reader.read_bits(5)? as u8;
        let time_offset_value = read_signed_bits(&mut reader, time_offset_length)?;
        clocks.push(Some(TimeCodeClock {
            units_field_based_flag,
            counting_type,
            full_timestamp_flag,
            discontinuity_flag,
            cnt_dropped_flag,
            n_frames,
            time,
            time_offset_length,
            time_offset_value,
        }));
    }

    let tail = PayloadTail::read(&mut reader, &sei.payload)?;
    Ok(TimeCode {
        clocks,
        payload_size: sei.payload.len(),
        tail,
    })
}

impl TimeCode {
    /// Re-encodes the message; the result matches the decoded payload.
    pub fn payload(&self) -> Result<Bytes> {
        let mut writer = BitWriter::new();
        writer.write_bits(self.clocks.len() as u32, 2)?;
        for clock in &self.clocks {
            writer.write_bit(clock.is_some());
            let Some(clock) = clock else {
                continue;
            };
            writer.write_bit(clock.units_field_based_flag);
            writer.write_bits(u32::from(clock.counting_type), 5)?;
            writer.write_bit(clock.full_timestamp_flag);
            writer.write_bit(clock.discontinuity_flag);
            writer.write_bit(clock.cnt_dropped_flag);
            writer.write_bits(u32::from(clock.n_frames), 9)?;
            clock.time.write(&mut writer, clock.full_timestamp_flag)?;
            writer.write_bits(u32::from(clock.time_offset_length), 5)?;
            write_signed_bits(&mut writer, clock.time_offset_value, clock.time_offset_length)?;
        }
        self.tail.write(&mut writer)?;
        Ok(Bytes::from(writer.into_bytes()))
    }

    /// Size of the payload this was decoded from.
    pub fn payload_size(&self) -> usize {
        self.payload_size
    }
}

impl fmt::Display for TimeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, size={}", SeiType::TIME_CODE, self.payload_size)?;
        for clock in self.clocks.iter().flatten() {
            write!(f, ", time=")?;
            clock.time.fmt_with_frames(f, u32::from(clock.n_frames))?;
            write!(f, " offset={}", clock.time_offset_value)?;
        }
        Ok(())
    }
}
