use std::fmt;

use bytes::Bytes;

use crate::codec::h264::sps::Sps;
use crate::error::{NalError, Result};
use crate::utils::{BitReader, BitWriter};

use super::{hex_string, SeiData, SeiType};

/// Bits after the last decoded field of a bit-packed payload: the rest of
/// the current byte plus any whole bytes. Kept so payloads re-encode
/// byte-exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct PayloadTail {
    bits: u8,
    bit_count: u8,
    bytes: Bytes,
}

impl PayloadTail {
    pub(crate) fn read(reader: &mut BitReader, payload: &Bytes) -> Result<Self> {
        let (bits, bit_count) = reader.read_to_byte_boundary()?;
        Ok(PayloadTail {
            bits,
            bit_count,
            bytes: payload.slice_ref(reader.remaining_bytes()),
        })
    }

    pub(crate) fn write(&self, writer: &mut BitWriter) -> Result<()> {
        writer.write_bits(u32::from(self.bits), u32::from(self.bit_count))?;
        writer.write_bytes(&self.bytes);
        Ok(())
    }
}

pub(crate) fn read_signed_bits(reader: &mut BitReader, n: u8) -> Result<i32> {
    if n == 0 {
        return Ok(0);
    }
    let raw = i64::from(reader.read_bits(u32::from(n))?);
    let value = if raw >> (n - 1) & 1 == 1 {
        raw - (1i64 << n)
    } else {
        raw
    };
    Ok(value as i32)
}

pub(crate) fn write_signed_bits(writer: &mut BitWriter, value: i32, n: u8) -> Result<()> {
    if n == 0 {
        return Ok(());
    }
    let mask = if n >= 32 { u32::MAX } else { (1u32 << n) - 1 };
    writer.write_bits(value as u32 & mask, u32::from(n))
}

/// buffering_period: only the parameter set id is decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferingPeriod {
    /// SPS the buffering period applies to
    pub seq_parameter_set_id: u32,
    /// The whole payload, re-emitted unchanged
    pub payload: Bytes,
}

/// Reads the SPS id of a buffering_period payload.
pub fn decode_buffering_period(sei: &SeiData) -> Result<BufferingPeriod> {
    if sei.payload.is_empty() {
        return Err(NalError::InvalidData("empty buffering period".into()));
    }
    let mut reader = BitReader::new(&sei.payload);
    let seq_parameter_set_id = reader.read_golomb()?;
    Ok(BufferingPeriod {
        seq_parameter_set_id,
        payload: sei.payload.clone(),
    })
}

impl fmt::Display for BufferingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, size={}, \"{}\"",
            SeiType::BUFFERING_PERIOD,
            self.payload.len(),
            hex_string(&self.payload)
        )
    }
}

/// Field lengths from the VUI HRD parameters that size the delays in
/// picture timing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HrdDelayLengths {
    /// Bits in initial_cpb_removal_delay minus 1
    pub initial_cpb_removal_delay_length_minus1: u8,
    /// Bits in cpb_removal_delay minus 1
    pub cpb_removal_delay_length_minus1: u8,
    /// Bits in dpb_output_delay minus 1
    pub dpb_output_delay_length_minus1: u8,
}

impl HrdDelayLengths {
    /// Lengths from the NAL HRD parameters, or the VCL ones; `None` when
    /// the SPS carries neither, in which case pic timing has no delays.
    pub fn from_sps(sps: &Sps) -> Option<Self> {
        sps.hrd_parameters().map(|hrd| HrdDelayLengths {
            initial_cpb_removal_delay_length_minus1: hrd.initial_cpb_removal_delay_length_minus1,
            cpb_removal_delay_length_minus1: hrd.cpb_removal_delay_length_minus1,
            dpb_output_delay_length_minus1: hrd.dpb_output_delay_length_minus1,
        })
    }
}

/// CPB removal and DPB output delays of a picture timing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpbDpbDelay {
    /// cpb_removal_delay
    pub cpb_removal_delay: u32,
    /// dpb_output_delay
    pub dpb_output_delay: u32,
}

/// Hours, minutes and seconds of a clock timestamp. Without
/// full_timestamp_flag each field is optional, and a field is only present
/// when the one before it is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClockTime {
    /// seconds_value
    pub seconds: Option<u8>,
    /// minutes_value
    pub minutes: Option<u8>,
    /// hours_value
    pub hours: Option<u8>,
}

impl ClockTime {
    pub(crate) fn read(reader: &mut BitReader, full_timestamp_flag: bool) -> Result<Self> {
        let mut time = ClockTime::default();
        if full_timestamp_flag {
            time.seconds = Some(reader.read_bits(6)? as u8);
            time.minutes = Some(reader.read_bits(6)? as u8);
            time.hours = Some(reader.read_bits(5)? as u8);
        } else if reader.read_bit()? {
            time.seconds = Some(reader.read_bits(6)? as u8);
            if reader.read_bit()? {
                time.minutes = Some(reader.read_bits(6)? as u8);
                if reader.read_bit()? {
                    time.hours = Some(reader.read_bits(5)? as u8);
                }
            }
        }
        Ok(time)
    }

    pub(crate) fn write(&self, writer: &mut BitWriter, full_timestamp_flag: bool) -> Result<()> {
        if full_timestamp_flag {
            writer.write_bits(u32::from(self.seconds.unwrap_or(0)), 6)?;
            writer.write_bits(u32::from(self.minutes.unwrap_or(0)), 6)?;
            writer.write_bits(u32::from(self.hours.unwrap_or(0)), 5)?;
            return Ok(());
        }
        writer.write_bit(self.seconds.is_some());
        if let Some(seconds) = self.seconds {
            writer.write_bits(u32::from(seconds), 6)?;
            writer.write_bit(self.minutes.is_some());
            if let Some(minutes) = self.minutes {
                writer.write_bits(u32::from(minutes), 6)?;
                writer.write_bit(self.hours.is_some());
                if let Some(hours) = self.hours {
                    writer.write_bits(u32::from(hours), 5)?;
                }
            }
        }
        Ok(())
    }

    pub(crate) fn fmt_with_frames(&self, f: &mut fmt::Formatter<'_>, frames: u32) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}:{:02}",
            self.hours.unwrap_or(0),
            self.minutes.unwrap_or(0),
            self.seconds.unwrap_or(0),
            frames
        )
    }
}

/// One clock timestamp of an AVC picture timing message (D.1.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockTimestamp {
    /// 0 progressive, 1 interlaced, 2 unknown
    pub ct_type: u8,
    /// Clock units are fields rather than frames
    pub nuit_field_based_flag: bool,
    /// Table D-2 counting type
    pub counting_type: u8,
    /// Hours, minutes and seconds all present
    pub full_timestamp_flag: bool,
    /// Discontinuity before this timestamp
    pub discontinuity_flag: bool,
    /// Frame counts were skipped
    pub cnt_dropped_flag: bool,
    /// Frame count within the second
    pub n_frames: u8,
    /// Hours, minutes and seconds
    pub time: ClockTime,
    /// Signed offset, time_offset_length bits wide
    pub time_offset: i32,
}

/// pic_timing for AVC (D.1.3).
///
/// The delays are present when HRD lengths were supplied at decode time;
/// pic_struct is always assumed present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PicTimingAvc {
    /// Present when `hrd` is
    pub delays: Option<CpbDpbDelay>,
    /// Lengths the delays were decoded with
    pub hrd: Option<HrdDelayLengths>,
    /// Bits in each time_offset, from the HRD parameters
    pub time_offset_length: u8,
    /// Table D-1 picture structure
    pub pic_struct: u8,
    /// One slot per NumClockTS; `None` where clock_timestamp_flag is 0.
    pub clocks: Vec<Option<ClockTimestamp>>,
    payload_size: usize,
    tail: PayloadTail,
}

/// NumClockTS from Table D-1; reserved pic_struct values carry no clocks.
pub fn num_clock_ts(pic_struct: u8) -> usize {
    match pic_struct {
        0..=2 => 1,
        3 | 4 | 7 => 2,
        5 | 6 | 8 => 3,
        _ => 0,
    }
}

/// Decodes an AVC pic_timing payload. `hrd` comes from the active SPS
/// ([`HrdDelayLengths::from_sps`]); `time_offset_length` from its HRD
/// parameters as tracked by the caller.
pub fn decode_pic_timing_avc(
    sei: &SeiData,
    hrd: Option<HrdDelayLengths>,
    time_offset_length: u8,
) -> Result<PicTimingAvc> {
    if time_offset_length > 31 {
        return Err(NalError::InvalidData(format!(
            "time_offset_length {} out of range",
            time_offset_length
        )));
    }
    let mut reader = BitReader::new(&sei.payload);

    let delays = match hrd {
        Some(lengths) => Some(CpbDpbDelay {
            cpb_removal_delay: reader
                .read_bits(u32::from(lengths.cpb_removal_delay_length_minus1) + 1)?,
            dpb_output_delay: reader
                .read_bits(u32::from(lengths.dpb_output_delay_length_minus1) + 1)?,
        }),
        None => None,
    };

    let pic_struct = reader.read_bits(4)? as u8;
    let mut clocks = Vec::with_capacity(num_clock_ts(pic_struct));
    for _ in 0..num_clock_ts(pic_struct) {
        if !reader.read_bit()? {
            clocks.push(None);
            continue;
        }
        let ct_type = reader.read_bits(2)? as u8;
        let nuit_field_based_flag = reader.read_bit()?;
        let counting_type = reader.read_bits(5)? as u8;
        let full_timestamp_flag = reader.read_bit()?;
        let discontinuity_flag = reader.read_bit()?;
        let cnt_dropped_flag = reader.read_bit()?;
        let n_frames = reader.read_bits(8)? as u8;
        let time = ClockTime::read(&mut reader, full_timestamp_flag)?;
        let time_offset = read_signed_bits(&mut reader, time_offset_length)?;
        clocks.push(Some(ClockTimestamp {
            ct_type,
            nuit_field_based_flag,
            counting_type,
            full_timestamp_flag,
            discontinuity_flag,
            cnt_dropped_flag,
            n_frames,
            time,
            time_offset,
        }));
    }

    let tail = PayloadTail::read(&mut reader, &sei.payload)?;
    log::trace!("pic_timing pic_struct={} clocks={:?}", pic_struct, clocks);

    Ok(PicTimingAvc {
        delays,
        hrd,
        time_offset_length,
        pic_struct,
        clocks,
        payload_size: sei.payload.len(),
        tail,
    })
}

impl PicTimingAvc {
    /// Re-encodes the payload.
    pub fn payload(&self) -> Result<Bytes> {
        let mut writer = BitWriter::new();

        if let (Some(delays), Some(lengths)) = (self.delays, self.hrd) {
            writer.write_bits(
                delays.cpb_removal_delay,
                u32::from(lengths.cpb_removal_delay_length_minus1) + 1,
            )?;
            writer.write_bits(
                delays.dpb_output_delay,
                u32::from(lengths.dpb_output_delay_length_minus1) + 1,
            )?;
        }

        writer.write_bits(u32::from(self.pic_struct), 4)?;
        for clock in &self.clocks {
            writer.write_bit(clock.is_some());
            let Some(clock) = clock else {
                continue;
            };
            writer.write_bits(u32::from(clock.ct_type), 2)?;
            writer.write_bit(clock.nuit_field_based_flag);
            writer.write_bits(u32::from(clock.counting_type), 5)?;
            writer.write_bit(clock.full_timestamp_flag);
            writer.write_bit(clock.discontinuity_flag);
            writer.write_bit(clock.cnt_dropped_flag);
            writer.write_bits(u32::from(clock.n_frames), 8)?;
            clock.time.write(&mut writer, clock.full_timestamp_flag)?;
            write_signed_bits(&mut writer, clock.time_offset, self.time_offset_length)?;
        }

        self.tail.write(&mut writer)?;
        Ok(Bytes::from(writer.into_bytes()))
    }

    /// Size of the payload this was decoded from.
    pub fn payload_size(&self) -> usize {
        self.payload_size
    }
}

impl fmt::Display for PicTimingAvc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, size={}", SeiType::PIC_TIMING, self.payload_size)?;
        for clock in self.clocks.iter().flatten() {
            write!(f, ", time=")?;
            clock.time.fmt_with_frames(f, u32::from(clock.n_frames))?;
            write!(f, " offset={}", clock.time_offset)?;
        }
        Ok(())
    }
}
