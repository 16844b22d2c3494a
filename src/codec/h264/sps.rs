use crate::error::{NalError, Result};
use crate::utils::BitReader;

use super::types::{nal_type, NALUnitType};

const HIGH_PROFILES: [u8; 13] = [100, 110, 122, 244, 44, 83, 86, 118, 128, 138, 139, 134, 135];

/// Upper bound of log2_max_frame_num_minus4 and
/// log2_max_pic_order_cnt_lsb_minus4 (7.4.2.1.1).
const MAX_LOG2_MINUS4: u32 = 12;

/// Largest MaxFS of Table A-1, in macroblocks.
const MAX_FRAME_SIZE_IN_MBS: u64 = 139_264;

/// Sequence parameter set (H.264 7.3.2.1.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sps {
    /// profile_idc
    pub profile_idc: u8,
    /// constraint_set0..5 flags and the two reserved bits, MSB first
    pub constraint_flags: u8,
    /// level_idc, ten times the level number
    pub level_idc: u8,
    /// Id referenced by PPS units
    pub seq_parameter_set_id: u32,
    /// 1 (4:2:0) unless a High profile says otherwise
    pub chroma_format_idc: u32,
    /// Colour planes coded separately (4:4:4 only)
    pub separate_colour_plane_flag: bool,
    /// Luma bit depth minus 8
    pub bit_depth_luma_minus8: u32,
    /// Chroma bit depth minus 8
    pub bit_depth_chroma_minus8: u32,
    /// Lossless transform bypass at QP'Y 0
    pub qpprime_y_zero_transform_bypass_flag: bool,
    /// Scaling lists present; their values are skipped
    pub seq_scaling_matrix_present_flag: bool,
    /// 0..=12; sizes frame_num
    pub log2_max_frame_num_minus4: u32,
    /// Picture order count mode, 0..=2
    pub pic_order_cnt_type: u32,
    /// 0..=12; sizes pic_order_cnt_lsb (POC type 0)
    pub log2_max_pic_order_cnt_lsb_minus4: u32,
    /// POC type 1: delta_pic_order_cnt fields absent
    pub delta_pic_order_always_zero_flag: bool,
    /// POC type 1 offset for non-reference pictures
    pub offset_for_non_ref_pic: i32,
    /// POC type 1 offset between fields
    pub offset_for_top_to_bottom_field: i32,
    /// POC type 1 expected deltas, one per frame in the cycle
    pub offset_for_ref_frame: Vec<i32>,
    /// Size of the reference frame window
    pub max_num_ref_frames: u32,
    /// Gaps in frame_num are allowed
    pub gaps_in_frame_num_value_allowed_flag: bool,
    /// Width in macroblocks minus 1
    pub pic_width_in_mbs_minus1: u32,
    /// Height in slice group map units minus 1
    pub pic_height_in_map_units_minus1: u32,
    /// No field coding
    pub frame_mbs_only_flag: bool,
    /// MBAFF enabled
    pub mb_adaptive_frame_field_flag: bool,
    /// Direct motion vectors inferred per 8x8 block
    pub direct_8x8_inference_flag: bool,
    /// Cropping offsets, in crop units
    pub frame_cropping: Option<CropRect>,
    /// Video usability information
    pub vui: Option<Vui>,
}

/// Frame cropping offsets, in CropUnitX/CropUnitY units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CropRect {
    /// frame_crop_left_offset
    pub left: u32,
    /// frame_crop_right_offset
    pub right: u32,
    /// frame_crop_top_offset
    pub top: u32,
    /// frame_crop_bottom_offset
    pub bottom: u32,
}

/// Video usability information (Annex E.1.1).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Vui {
    /// Sample aspect ratio code, when signalled
    pub aspect_ratio_idc: Option<u8>,
    /// Explicit sample aspect ratio for aspect_ratio_idc 255
    pub sar: Option<(u16, u16)>,
    /// Overscan suitability, when signalled
    pub overscan_appropriate_flag: Option<bool>,
    /// Source video format, 5 (unspecified) when absent
    pub video_format: u8,
    /// Full-range sample values
    pub video_full_range_flag: bool,
    /// Colour primaries, transfer and matrix
    pub colour_description: Option<ColourDescription>,
    /// Chroma sample location for top and bottom fields
    pub chroma_sample_loc_type: Option<(u32, u32)>,
    /// Frame timing
    pub timing_info: Option<TimingInfo>,
    /// Type II bitstream HRD
    pub nal_hrd_parameters: Option<HrdParameters>,
    /// Type I bitstream HRD
    pub vcl_hrd_parameters: Option<HrdParameters>,
    /// Low-delay HRD operation
    pub low_delay_hrd_flag: bool,
    /// Picture timing SEI carries pic_struct
    pub pic_struct_present_flag: bool,
    /// Decoder resource limits
    pub bitstream_restriction: Option<BitstreamRestriction>,
}

/// Colour signalling from the VUI (Annex E tables E-3..E-5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColourDescription {
    /// colour_primaries
    pub colour_primaries: u8,
    /// transfer_characteristics
    pub transfer_characteristics: u8,
    /// matrix_coefficients
    pub matrix_coefficients: u8,
}

/// VUI timing information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingInfo {
    /// Clock ticks per unit
    pub num_units_in_tick: u32,
    /// Clock ticks per second
    pub time_scale: u32,
    /// Constant frame rate
    pub fixed_frame_rate_flag: bool,
}

/// HRD parameters (Annex E.1.2). The length fields size the delays in
/// buffering period and picture timing SEI messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HrdParameters {
    /// Number of CPB schedules minus 1, 0..=31
    pub cpb_cnt_minus1: u32,
    /// Bit rate scale exponent
    pub bit_rate_scale: u8,
    /// CPB size scale exponent
    pub cpb_size_scale: u8,
    /// One entry per CPB schedule
    pub schedules: Vec<CpbSchedule>,
    /// Bits in initial_cpb_removal_delay minus 1
    pub initial_cpb_removal_delay_length_minus1: u8,
    /// Bits in cpb_removal_delay minus 1
    pub cpb_removal_delay_length_minus1: u8,
    /// Bits in dpb_output_delay minus 1
    pub dpb_output_delay_length_minus1: u8,
    /// Bits in the picture timing time_offset
    pub time_offset_length: u8,
}

/// One CPB delivery schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpbSchedule {
    /// bit_rate_value_minus1
    pub bit_rate_value_minus1: u32,
    /// cpb_size_value_minus1
    pub cpb_size_value_minus1: u32,
    /// Constant bit rate
    pub cbr_flag: bool,
}

/// VUI bitstream restriction fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitstreamRestriction {
    /// Motion vectors may point outside the picture
    pub motion_vectors_over_pic_boundaries_flag: bool,
    /// max_bytes_per_pic_denom
    pub max_bytes_per_pic_denom: u32,
    /// max_bits_per_mb_denom
    pub max_bits_per_mb_denom: u32,
    /// log2_max_mv_length_horizontal
    pub log2_max_mv_length_horizontal: u32,
    /// log2_max_mv_length_vertical
    pub log2_max_mv_length_vertical: u32,
    /// Frames that may precede a frame in decoding order but follow it in output
    pub max_num_reorder_frames: u32,
    /// Required DPB size in frames
    pub max_dec_frame_buffering: u32,
}

impl Sps {
    /// ChromaArrayType: 0 with separate colour planes, else chroma_format_idc.
    pub fn chroma_array_type(&self) -> u32 {
        if self.separate_colour_plane_flag {
            0
        } else {
            self.chroma_format_idc
        }
    }

    /// PicWidthInMbs
    pub fn pic_width_in_mbs(&self) -> u32 {
        self.pic_width_in_mbs_minus1.saturating_add(1)
    }

    /// PicHeightInMapUnits
    pub fn pic_height_in_map_units(&self) -> u32 {
        self.pic_height_in_map_units_minus1.saturating_add(1)
    }

    /// PicSizeInMapUnits, saturating on corrupt geometry.
    pub fn pic_size_in_map_units(&self) -> u32 {
        self.pic_width_in_mbs()
            .saturating_mul(self.pic_height_in_map_units())
    }

    /// Bits in the frame_num slice header field.
    pub fn frame_num_bits(&self) -> u32 {
        self.log2_max_frame_num_minus4.saturating_add(4)
    }

    /// Bits in the pic_order_cnt_lsb slice header field.
    pub fn pic_order_cnt_lsb_bits(&self) -> u32 {
        self.log2_max_pic_order_cnt_lsb_minus4.saturating_add(4)
    }

    fn frame_factor(&self) -> u32 {
        if self.frame_mbs_only_flag {
            1
        } else {
            2
        }
    }

    /// CropUnitX and CropUnitY (7.4.2.1.1).
    fn crop_units(&self) -> (u32, u32) {
        match self.chroma_array_type() {
            1 => (2, 2 * self.frame_factor()),
            2 => (2, self.frame_factor()),
            _ => (1, self.frame_factor()),
        }
    }

    /// Cropped luma width in samples.
    pub fn width(&self) -> u32 {
        let width = self.pic_width_in_mbs().saturating_mul(16);
        match self.frame_cropping {
            Some(crop) => {
                let (crop_unit_x, _) = self.crop_units();
                width.saturating_sub(
                    crop_unit_x.saturating_mul(crop.left.saturating_add(crop.right)),
                )
            }
            None => width,
        }
    }

    /// Cropped luma height in samples.
    pub fn height(&self) -> u32 {
        let height = self
            .pic_height_in_map_units()
            .saturating_mul(self.frame_factor() * 16);
        match self.frame_cropping {
            Some(crop) => {
                let (_, crop_unit_y) = self.crop_units();
                height.saturating_sub(
                    crop_unit_y.saturating_mul(crop.top.saturating_add(crop.bottom)),
                )
            }
            None => height,
        }
    }

    /// HRD parameters gating SEI delay fields, NAL HRD first.
    pub fn hrd_parameters(&self) -> Option<&HrdParameters> {
        let vui = self.vui.as_ref()?;
        vui.nal_hrd_parameters
            .as_ref()
            .or(vui.vcl_hrd_parameters.as_ref())
    }
}

/// Parses an SPS NAL unit, header byte included.
pub fn parse_sps(data: &[u8]) -> Result<Sps> {
    let header = *data
        .first()
        .ok_or_else(|| NalError::InvalidData("empty SPS NAL unit".into()))?;
    if NALUnitType::from(nal_type(header)) != NALUnitType::SPS {
        return Err(NalError::InvalidData(format!(
            "NAL unit type {} is not an SPS",
            nal_type(header)
        )));
    }

    let mut reader = BitReader::new_ebsp(&data[1..]);

    let profile_idc = reader.read_bits(8)? as u8;
    let constraint_flags = reader.read_bits(8)? as u8;
    let level_idc = reader.read_bits(8)? as u8;
    let seq_parameter_set_id = reader.read_golomb()?;
    log::debug!(
        "SPS id={} profile_idc={} level_idc={}",
        seq_parameter_set_id,
        profile_idc,
        level_idc
    );

    let mut chroma_format_idc = 1;
    let mut separate_colour_plane_flag = false;
    let mut bit_depth_luma_minus8 = 0;
    let mut bit_depth_chroma_minus8 = 0;
    let mut qpprime_y_zero_transform_bypass_flag = false;
    let mut seq_scaling_matrix_present_flag = false;

    if HIGH_PROFILES.contains(&profile_idc) {
        chroma_format_idc = reader.read_golomb()?;
        if chroma_format_idc == 3 {
            separate_colour_plane_flag = reader.read_bit()?;
        }
        bit_depth_luma_minus8 = reader.read_golomb()?;
        bit_depth_chroma_minus8 = reader.read_golomb()?;
        qpprime_y_zero_transform_bypass_flag = reader.read_bit()?;

        seq_scaling_matrix_present_flag = reader.read_bit()?;
        if seq_scaling_matrix_present_flag {
            let count = if chroma_format_idc != 3 { 8 } else { 12 };
            skip_scaling_lists(&mut reader, count)?;
        }
    }

    let log2_max_frame_num_minus4 = reader.read_golomb()?;
    if log2_max_frame_num_minus4 > MAX_LOG2_MINUS4 {
        return Err(NalError::InvalidData(format!(
            "log2_max_frame_num_minus4 {} out of range",
            log2_max_frame_num_minus4
        )));
    }
    let pic_order_cnt_type = reader.read_golomb()?;

    let mut log2_max_pic_order_cnt_lsb_minus4 = 0;
    let mut delta_pic_order_always_zero_flag = false;
    let mut offset_for_non_ref_pic = 0;
    let mut offset_for_top_to_bottom_field = 0;
    let mut offset_for_ref_frame = Vec::new();

    match pic_order_cnt_type {
        0 => {
            log2_max_pic_order_cnt_lsb_minus4 = reader.read_golomb()?;
            if log2_max_pic_order_cnt_lsb_minus4 > MAX_LOG2_MINUS4 {
                return Err(NalError::InvalidData(format!(
                    "log2_max_pic_order_cnt_lsb_minus4 {} out of range",
                    log2_max_pic_order_cnt_lsb_minus4
                )));
            }
        }
        1 => {
            delta_pic_order_always_zero_flag = reader.read_bit()?;
            offset_for_non_ref_pic = reader.read_signed_golomb()?;
            offset_for_top_to_bottom_field = reader.read_signed_golomb()?;
            let num_ref_frames_in_pic_order_cnt_cycle = reader.read_golomb()?;
            if num_ref_frames_in_pic_order_cnt_cycle > 255 {
                return Err(NalError::InvalidData(format!(
                    "num_ref_frames_in_pic_order_cnt_cycle {} out of range",
                    num_ref_frames_in_pic_order_cnt_cycle
                )));
            }
            for _ in 0..num_ref_frames_in_pic_order_cnt_cycle {
                offset_for_ref_frame.push(reader.read_signed_golomb()?);
            }
        }
        2 => {}
        other => {
            return Err(NalError::InvalidData(format!(
                "pic_order_cnt_type {} out of range",
                other
            )))
        }
    }

    let max_num_ref_frames = reader.read_golomb()?;
    let gaps_in_frame_num_value_allowed_flag = reader.read_bit()?;
    let pic_width_in_mbs_minus1 = reader.read_golomb()?;
    let pic_height_in_map_units_minus1 = reader.read_golomb()?;
    let frame_mbs_only_flag = reader.read_bit()?;
    let mb_adaptive_frame_field_flag = if !frame_mbs_only_flag {
        reader.read_bit()?
    } else {
        false
    };
    let direct_8x8_inference_flag = reader.read_bit()?;

    let frame_cropping = if reader.read_bit()? {
        Some(CropRect {
            left: reader.read_golomb()?,
            right: reader.read_golomb()?,
            top: reader.read_golomb()?,
            bottom: reader.read_golomb()?,
        })
    } else {
        None
    };

    let vui = if reader.read_bit()? {
        Some(parse_vui(&mut reader)?)
    } else {
        None
    };

    let sps = Sps {
        profile_idc,
        constraint_flags,
        level_idc,
        seq_parameter_set_id,
        chroma_format_idc,
        separate_colour_plane_flag,
        bit_depth_luma_minus8,
        bit_depth_chroma_minus8,
        qpprime_y_zero_transform_bypass_flag,
        seq_scaling_matrix_present_flag,
        log2_max_frame_num_minus4,
        pic_order_cnt_type,
        log2_max_pic_order_cnt_lsb_minus4,
        delta_pic_order_always_zero_flag,
        offset_for_non_ref_pic,
        offset_for_top_to_bottom_field,
        offset_for_ref_frame,
        max_num_ref_frames,
        gaps_in_frame_num_value_allowed_flag,
        pic_width_in_mbs_minus1,
        pic_height_in_map_units_minus1,
        frame_mbs_only_flag,
        mb_adaptive_frame_field_flag,
        direct_8x8_inference_flag,
        frame_cropping,
        vui,
    };
    check_geometry(&sps)?;
    Ok(sps)
}

/// Rejects frame sizes beyond every level limit and cropping that does not
/// leave a picture.
fn check_geometry(sps: &Sps) -> Result<()> {
    let width_in_mbs = u64::from(sps.pic_width_in_mbs_minus1) + 1;
    let height_in_mbs =
        (u64::from(sps.pic_height_in_map_units_minus1) + 1) * u64::from(sps.frame_factor());
    if width_in_mbs * height_in_mbs > MAX_FRAME_SIZE_IN_MBS {
        return Err(NalError::InvalidData(format!(
            "frame of {}x{} macroblocks exceeds {} macroblocks",
            width_in_mbs, height_in_mbs, MAX_FRAME_SIZE_IN_MBS
        )));
    }

    if let Some(crop) = sps.frame_cropping {
        let (crop_unit_x, crop_unit_y) = sps.crop_units();
        let crop_x = u64::from(crop_unit_x) * (u64::from(crop.left) + u64::from(crop.right));
        let crop_y = u64::from(crop_unit_y) * (u64::from(crop.top) + u64::from(crop.bottom));
        if crop_x >= width_in_mbs * 16 || crop_y >= height_in_mbs * 16 {
            return Err(NalError::InvalidData(format!(
                "frame cropping {:?} leaves no picture",
                crop
            )));
        }
    }
    Ok(())
}

/// Skips `count` scaling_list_present_flag entries and their lists; the
/// first six lists are 4x4, the rest 8x8.
pub(crate) fn skip_scaling_lists(reader: &mut BitReader, count: usize) -> Result<()> {
    for i in 0..count {
        if reader.read_bit()? {
            let size = if i < 6 { 16 } else { 64 };
            skip_scaling_list(reader, size)?;
        }
    }
    Ok(())
}

fn skip_scaling_list(reader: &mut BitReader, size: usize) -> Result<()> {
    let mut last_scale = 8i64;
    let mut next_scale = 8i64;

    for _ in 0..size {
        if next_scale != 0 {
            let delta_scale = reader.read_signed_golomb()?;
            next_scale = (last_scale + i64::from(delta_scale) + 256).rem_euclid(256);
        }
        last_scale = if next_scale == 0 { last_scale } else { next_scale };
    }

    Ok(())
}

fn parse_vui(reader: &mut BitReader) -> Result<Vui> {
    let mut vui = Vui {
        video_format: 5,
        ..Vui::default()
    };

    if reader.read_bit()? {
        let aspect_ratio_idc = reader.read_bits(8)? as u8;
        vui.aspect_ratio_idc = Some(aspect_ratio_idc);
        // Extended_SAR
        if aspect_ratio_idc == 255 {
            let sar_width = reader.read_bits(16)? as u16;
            let sar_height = reader.read_bits(16)? as u16;
            vui.sar = Some((sar_width, sar_height));
        }
    }

    if reader.read_bit()? {
        vui.overscan_appropriate_flag = Some(reader.read_bit()?);
    }

    if reader.read_bit()? {
        vui.video_format = reader.read_bits(3)? as u8;
        vui.video_full_range_flag = reader.read_bit()?;
        if reader.read_bit()? {
            vui.colour_description = Some(ColourDescription {
                colour_primaries: reader.read_bits(8)? as u8,
                transfer_characteristics: reader.read_bits(8)? as u8,
                matrix_coefficients: reader.read_bits(8)? as u8,
            });
        }
    }

    if reader.read_bit()? {
        let top = reader.read_golomb()?;
        let bottom = reader.read_golomb()?;
        vui.chroma_sample_loc_type = Some((top, bottom));
    }

    if reader.read_bit()? {
        vui.timing_info = Some(TimingInfo {
            num_units_in_tick: reader.read_bits(32)?,
            time_scale: reader.read_bits(32)?,
            fixed_frame_rate_flag: reader.read_bit()?,
        });
    }

    if reader.read_bit()? {
        vui.nal_hrd_parameters = Some(parse_hrd(reader)?);
    }
    if reader.read_bit()? {
        vui.vcl_hrd_parameters = Some(parse_hrd(reader)?);
    }
    if vui.nal_hrd_parameters.is_some() || vui.vcl_hrd_parameters.is_some() {
        vui.low_delay_hrd_flag = reader.read_bit()?;
    }
    vui.pic_struct_present_flag = reader.read_bit()?;

    if reader.read_bit()? {
        vui.bitstream_restriction = Some(BitstreamRestriction {
            motion_vectors_over_pic_boundaries_flag: reader.read_bit()?,
            max_bytes_per_pic_denom: reader.read_golomb()?,
            max_bits_per_mb_denom: reader.read_golomb()?,
            log2_max_mv_length_horizontal: reader.read_golomb()?,
            log2_max_mv_length_vertical: reader.read_golomb()?,
            max_num_reorder_frames: reader.read_golomb()?,
            max_dec_frame_buffering: reader.read_golomb()?,
        });
    }

    Ok(vui)
}

fn parse_hrd(reader: &mut BitReader) -> Result<HrdParameters> {
    let cpb_cnt_minus1 = reader.read_golomb()?;
    if cpb_cnt_minus1 > 31 {
        return Err(NalError::InvalidData(format!(
            "cpb_cnt_minus1 {} out of range",
            cpb_cnt_minus1
        )));
    }
    let bit_rate_scale = reader.read_bits(4)? as u8;
    let cpb_size_scale = reader.read_bits(4)? as u8;

    let mut schedules = Vec::with_capacity(cpb_cnt_minus1 as usize + 1);
    for _ in 0..=cpb_cnt_minus1 {
        schedules.push(CpbSchedule {
            bit_rate_value_minus1: reader.read_golomb()?,
            cpb_size_value_minus1: reader.read_golomb()?,
            cbr_flag: reader.read_bit()?,
        });
    }

    Ok(HrdParameters {
        cpb_cnt_minus1,
        bit_rate_scale,
        cpb_size_scale,
        schedules,
        initial_cpb_removal_delay_length_minus1: reader.read_bits(5)? as u8,
        cpb_removal_delay_length_minus1: reader.read_bits(5)? as u8,
        dpb_output_delay_length_minus1: reader.read_bits(5)? as u8,
        time_offset_length: reader.read_bits(5)? as u8,
    })
}
