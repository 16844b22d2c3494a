use std::collections::HashMap;

use crate::error::{NalError, Result};
use crate::utils::{ceil_log2, BitReader};

use super::sps::{skip_scaling_lists, Sps};
use super::types::{nal_type, NALUnitType};

/// Picture parameter set (H.264 7.3.2.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pps {
    /// Id referenced by slice headers
    pub pic_parameter_set_id: u32,
    /// Id of the active SPS
    pub seq_parameter_set_id: u32,
    /// CABAC when set, CAVLC otherwise
    pub entropy_coding_mode_flag: bool,
    /// Slices carry bottom-field POC deltas
    pub bottom_field_pic_order_in_frame_present_flag: bool,
    /// Slice groups minus 1, 0..=7
    pub num_slice_groups_minus1: u32,
    /// Present when there is more than one slice group
    pub slice_group_map: Option<SliceGroupMap>,
    /// Default list 0 size minus 1
    pub num_ref_idx_l0_default_active_minus1: u32,
    /// Default list 1 size minus 1
    pub num_ref_idx_l1_default_active_minus1: u32,
    /// Explicit weighted prediction for P and SP slices
    pub weighted_pred_flag: bool,
    /// Weighted prediction mode for B slices, 0..=2
    pub weighted_bipred_idc: u8,
    /// Initial luma QP minus 26
    pub pic_init_qp_minus26: i32,
    /// Initial SP/SI QS minus 26
    pub pic_init_qs_minus26: i32,
    /// Cb QP offset
    pub chroma_qp_index_offset: i32,
    /// Slices carry deblocking controls
    pub deblocking_filter_control_present_flag: bool,
    /// Intra prediction only from intra macroblocks
    pub constrained_intra_pred_flag: bool,
    /// Slices carry redundant_pic_cnt
    pub redundant_pic_cnt_present_flag: bool,
    /// 8x8 transform allowed
    pub transform_8x8_mode_flag: bool,
    /// Scaling lists present; their values are skipped
    pub pic_scaling_matrix_present_flag: bool,
    /// Equals chroma_qp_index_offset when the High-profile tail is absent.
    pub second_chroma_qp_index_offset: i32,
}

/// Slice group geometry, keyed by slice_group_map_type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SliceGroupMap {
    /// Type 0.
    Interleaved {
        /// Run length minus 1 per slice group
        run_length_minus1: Vec<u32>,
    },
    /// Type 1.
    Dispersed,
    /// Type 2.
    Foreground {
        /// Top-left map unit per foreground group
        top_left: Vec<u32>,
        /// Bottom-right map unit per foreground group
        bottom_right: Vec<u32>,
    },
    /// Types 3 (box-out), 4 (raster scan) and 5 (wipe).
    Changing {
        /// 3, 4 or 5
        map_type: u32,
        /// Reverses the scan direction
        change_direction_flag: bool,
        /// SliceGroupChangeRate minus 1
        change_rate_minus1: u32,
    },
    /// Type 6.
    Explicit {
        /// Number of map units minus 1
        pic_size_in_map_units_minus1: u32,
        /// Slice group of each map unit
        slice_group_id: Vec<u32>,
    },
}

impl SliceGroupMap {
    /// slice_group_map_type
    pub fn map_type(&self) -> u32 {
        match self {
            SliceGroupMap::Interleaved { .. } => 0,
            SliceGroupMap::Dispersed => 1,
            SliceGroupMap::Foreground { .. } => 2,
            SliceGroupMap::Changing { map_type, .. } => *map_type,
            SliceGroupMap::Explicit { .. } => 6,
        }
    }
}

impl Pps {
    /// slice_group_map_type, when there are slice groups.
    pub fn slice_group_map_type(&self) -> Option<u32> {
        self.slice_group_map.as_ref().map(SliceGroupMap::map_type)
    }

    /// SliceGroupChangeRate for map types 3..=5.
    pub fn slice_group_change_rate(&self) -> Option<u32> {
        match self.slice_group_map {
            Some(SliceGroupMap::Changing {
                change_rate_minus1, ..
            }) => Some(change_rate_minus1.saturating_add(1)),
            _ => None,
        }
    }

    /// PicSizeInMapUnits as coded in the PPS (map type 6 only).
    pub fn pic_size_in_map_units(&self) -> Option<u32> {
        match self.slice_group_map {
            Some(SliceGroupMap::Explicit {
                pic_size_in_map_units_minus1,
                ..
            }) => Some(pic_size_in_map_units_minus1.saturating_add(1)),
            _ => None,
        }
    }
}

/// Parses a PPS NAL unit, header byte included.
///
/// `sps_map` is only consulted when the PPS carries scaling matrices, whose
/// count depends on the referenced SPS chroma format.
pub fn parse_pps(data: &[u8], sps_map: &HashMap<u32, Sps>) -> Result<Pps> {
    let header = *data
        .first()
        .ok_or_else(|| NalError::InvalidData("empty PPS NAL unit".into()))?;
    if NALUnitType::from(nal_type(header)) != NALUnitType::PPS {
        return Err(NalError::InvalidData(format!(
            "NAL unit type {} is not a PPS",
            nal_type(header)
        )));
    }

    let mut reader = BitReader::new_ebsp(&data[1..]);

    let pic_parameter_set_id = reader.read_golomb()?;
    let seq_parameter_set_id = reader.read_golomb()?;
    log::debug!(
        "PPS id={} references SPS id={}",
        pic_parameter_set_id,
        seq_parameter_set_id
    );
    let entropy_coding_mode_flag = reader.read_bit()?;
    let bottom_field_pic_order_in_frame_present_flag = reader.read_bit()?;

    let num_slice_groups_minus1 = reader.read_golomb()?;
    if num_slice_groups_minus1 > 7 {
        return Err(NalError::InvalidData(format!(
            "num_slice_groups_minus1 {} out of range",
            num_slice_groups_minus1
        )));
    }
    let slice_group_map = if num_slice_groups_minus1 > 0 {
        Some(parse_slice_group_map(&mut reader, num_slice_groups_minus1)?)
    } else {
        None
    };

    let num_ref_idx_l0_default_active_minus1 = reader.read_golomb()?;
    let num_ref_idx_l1_default_active_minus1 = reader.read_golomb()?;
    if num_ref_idx_l0_default_active_minus1 > 31 || num_ref_idx_l1_default_active_minus1 > 31 {
        return Err(NalError::InvalidData(format!(
            "default active reference counts {}/{} out of range",
            num_ref_idx_l0_default_active_minus1, num_ref_idx_l1_default_active_minus1
        )));
    }
    let weighted_pred_flag = reader.read_bit()?;
    let weighted_bipred_idc = reader.read_bits(2)? as u8;
    let pic_init_qp_minus26 = reader.read_signed_golomb()?;
    let pic_init_qs_minus26 = reader.read_signed_golomb()?;
    let chroma_qp_index_offset = reader.read_signed_golomb()?;
    let deblocking_filter_control_present_flag = reader.read_bit()?;
    let constrained_intra_pred_flag = reader.read_bit()?;
    let redundant_pic_cnt_present_flag = reader.read_bit()?;

    let mut transform_8x8_mode_flag = false;
    let mut pic_scaling_matrix_present_flag = false;
    let mut second_chroma_qp_index_offset = chroma_qp_index_offset;

    if reader.more_rbsp_data() {
        transform_8x8_mode_flag = reader.read_bit()?;
        pic_scaling_matrix_present_flag = reader.read_bit()?;
        if pic_scaling_matrix_present_flag {
            let sps = sps_map.get(&seq_parameter_set_id).ok_or_else(|| {
                NalError::UnknownParameterSet(format!("sps id {}", seq_parameter_set_id))
            })?;
            let extra = if sps.chroma_format_idc != 3 { 2 } else { 6 };
            let count = 6 + if transform_8x8_mode_flag { extra } else { 0 };
            skip_scaling_lists(&mut reader, count)?;
        }
        second_chroma_qp_index_offset = reader.read_signed_golomb()?;
    }

    Ok(Pps {
        pic_parameter_set_id,
        seq_parameter_set_id,
        entropy_coding_mode_flag,
        bottom_field_pic_order_in_frame_present_flag,
        num_slice_groups_minus1,
        slice_group_map,
        num_ref_idx_l0_default_active_minus1,
        num_ref_idx_l1_default_active_minus1,
        weighted_pred_flag,
        weighted_bipred_idc,
        pic_init_qp_minus26,
        pic_init_qs_minus26,
        chroma_qp_index_offset,
        deblocking_filter_control_present_flag,
        constrained_intra_pred_flag,
        redundant_pic_cnt_present_flag,
        transform_8x8_mode_flag,
        pic_scaling_matrix_present_flag,
        second_chroma_qp_index_offset,
    })
}

fn parse_slice_group_map(
    reader: &mut BitReader,
    num_slice_groups_minus1: u32,
) -> Result<SliceGroupMap> {
    let map_type = reader.read_golomb()?;
    let groups = num_slice_groups_minus1 as usize + 1;

    let map = match map_type {
        0 => {
            let mut run_length_minus1 = Vec::with_capacity(groups);
            for _ in 0..groups {
                run_length_minus1.push(reader.read_golomb()?);
            }
            SliceGroupMap::Interleaved { run_length_minus1 }
        }
        1 => SliceGroupMap::Dispersed,
        2 => {
            let mut top_left = Vec::with_capacity(groups - 1);
            let mut bottom_right = Vec::with_capacity(groups - 1);
            for _ in 0..num_slice_groups_minus1 {
                top_left.push(reader.read_golomb()?);
                bottom_right.push(reader.read_golomb()?);
            }
            SliceGroupMap::Foreground {
                top_left,
                bottom_right,
            }
        }
        3..=5 => SliceGroupMap::Changing {
            map_type,
            change_direction_flag: reader.read_bit()?,
            change_rate_minus1: reader.read_golomb()?,
        },
        6 => {
            let pic_size_in_map_units_minus1 = reader.read_golomb()?;
            // Each id takes at least one bit, so a size beyond the data is bogus.
            if pic_size_in_map_units_minus1 as usize >= reader.available_bits() {
                return Err(NalError::TooFewBits);
            }
            let bits = ceil_log2(num_slice_groups_minus1 + 1);
            let mut slice_group_id = Vec::with_capacity(pic_size_in_map_units_minus1 as usize + 1);
            for _ in 0..=pic_size_in_map_units_minus1 {
                slice_group_id.push(reader.read_bits(bits)?);
            }
            SliceGroupMap::Explicit {
                pic_size_in_map_units_minus1,
                slice_group_id,
            }
        }
        other => {
            return Err(NalError::InvalidData(format!(
                "slice_group_map_type {} out of range",
                other
            )))
        }
    };

    Ok(map)
}
