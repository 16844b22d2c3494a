//! Slice header parsing (H.264 7.3.3).
//!
//! Field presence is decided by the small `has_*` functions below, each a
//! pure function of the parameter sets, the NAL header and fields already
//! read from the same header.

use crate::config::Config;
use crate::error::{NalError, Result};
use crate::utils::BitReader;

use super::pps::Pps;
use super::pred_weight::PredWeightTable;
use super::ref_pic::{DecRefPicMarking, RefPicListModification};
use super::sps::Sps;
use super::types::{nal_ref_idc, nal_type, SliceType};

/// A decoded slice header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceHeader {
    /// Address of the first macroblock
    pub first_mb_in_slice: u32,
    /// Folded slice type
    pub slice_type: SliceType,
    /// Active PPS
    pub pic_parameter_set_id: u32,
    /// Colour plane when planes are coded separately
    pub colour_plane_id: u8,
    /// frame_num, SPS-sized
    pub frame_num: u32,
    /// The slice belongs to a field
    pub field_pic_flag: bool,
    /// The field is the bottom one
    pub bottom_field_flag: bool,
    /// IDR picture id
    pub idr_pic_id: u32,
    /// POC type 0 lsb, SPS-sized
    pub pic_order_cnt_lsb: u32,
    /// Bottom field POC delta (POC type 0)
    pub delta_pic_order_cnt_bottom: i32,
    /// POC deltas (POC type 1)
    pub delta_pic_order_cnt: [i32; 2],
    /// Redundant picture count
    pub redundant_pic_cnt: u32,
    /// Spatial direct prediction (B slices)
    pub direct_spatial_mv_pred_flag: bool,
    /// The PPS reference counts are overridden
    pub num_ref_idx_active_override_flag: bool,
    /// Active list 0 size minus 1
    pub num_ref_idx_l0_active_minus1: u32,
    /// Active list 1 size minus 1
    pub num_ref_idx_l1_active_minus1: u32,
    /// Present for all but I and SI slices
    pub ref_pic_list_modification: Option<RefPicListModification>,
    /// Explicit weighted prediction
    pub pred_weight_table: Option<PredWeightTable>,
    /// Present for reference pictures
    pub dec_ref_pic_marking: Option<DecRefPicMarking>,
    /// CABAC initialisation table
    pub cabac_init_idc: u32,
    /// Luma QP delta from the PPS initial QP
    pub slice_qp_delta: i32,
    /// SP switching slice
    pub sp_for_switch_flag: bool,
    /// QS delta for SP and SI slices
    pub slice_qs_delta: i32,
    /// Deblocking mode, 0..=2
    pub disable_deblocking_filter_idc: u32,
    /// Deblocking alpha and C0 offset
    pub slice_alpha_c0_offset_div2: i32,
    /// Deblocking beta offset
    pub slice_beta_offset_div2: i32,
    /// Slice group change cycle (map types 3..=5)
    pub slice_group_change_cycle: u32,
    /// Bytes of the NAL unit taken by the header, NAL header byte and
    /// emulation prevention bytes included. Slice data starts here.
    pub size: usize,
}

impl SliceHeader {
    fn new(first_mb_in_slice: u32, slice_type: SliceType, pic_parameter_set_id: u32) -> Self {
        SliceHeader {
            first_mb_in_slice,
            slice_type,
            pic_parameter_set_id,
            colour_plane_id: 0,
            frame_num: 0,
            field_pic_flag: false,
            bottom_field_flag: false,
            idr_pic_id: 0,
            pic_order_cnt_lsb: 0,
            delta_pic_order_cnt_bottom: 0,
            delta_pic_order_cnt: [0; 2],
            redundant_pic_cnt: 0,
            direct_spatial_mv_pred_flag: false,
            num_ref_idx_active_override_flag: false,
            num_ref_idx_l0_active_minus1: 0,
            num_ref_idx_l1_active_minus1: 0,
            ref_pic_list_modification: None,
            pred_weight_table: None,
            dec_ref_pic_marking: None,
            cabac_init_idc: 0,
            slice_qp_delta: 0,
            sp_for_switch_flag: false,
            slice_qs_delta: 0,
            disable_deblocking_filter_idc: 0,
            slice_alpha_c0_offset_div2: 0,
            slice_beta_offset_div2: 0,
            slice_group_change_cycle: 0,
            size: 0,
        }
    }
}

/// NAL header fields that gate slice header syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceNalHeader {
    /// nal_unit_type
    pub nal_unit_type: u8,
    /// nal_ref_idc
    pub nal_ref_idc: u8,
    /// IdrPicFlag, taken from the MVC extension for types 20 and 21
    pub idr_pic_flag: bool,
    /// 1 for plain NAL units, 4 when a 3-byte extension header follows.
    pub header_len: usize,
}

impl SliceNalHeader {
    /// Reads the NAL header at the start of `nal`, including the extension
    /// header of types 20 and 21.
    pub fn parse(nal: &[u8]) -> Result<Self> {
        let header = *nal.first().ok_or(NalError::TooFewBits)?;
        let nal_unit_type = nal_type(header);
        if !carries_slice_header(nal_unit_type) {
            return Err(NalError::NoSliceHeader(nal_unit_type));
        }

        let mut idr_pic_flag = nal_unit_type == 5;
        let mut header_len = 1;
        if is_extension_slice(nal_unit_type) {
            let ext = nal.get(1..4).ok_or(NalError::TooFewBits)?;
            // With svc_extension_flag (or avc_3d_extension_flag) clear, the
            // MVC extension follows and starts with non_idr_flag.
            if ext[0] & 0x80 == 0 {
                idr_pic_flag = ext[0] & 0x40 == 0;
            }
            header_len = 4;
        }

        Ok(SliceNalHeader {
            nal_unit_type,
            nal_ref_idc: nal_ref_idc(header),
            idr_pic_flag,
            header_len,
        })
    }
}

/// NAL unit types that start with a slice header: 1, 2, 5, 19, 20 and 21.
pub fn carries_slice_header(nal_unit_type: u8) -> bool {
    matches!(nal_unit_type, 1 | 2 | 5 | 19 | 20 | 21)
}

/// MVC and 3D-AVC slice extensions.
pub fn is_extension_slice(nal_unit_type: u8) -> bool {
    matches!(nal_unit_type, 20 | 21)
}

/// Whether the header carries colour_plane_id.
pub fn has_colour_plane_id(sps: &Sps) -> bool {
    sps.separate_colour_plane_flag
}

/// Whether the header carries field_pic_flag.
pub fn has_field_pic_flag(sps: &Sps) -> bool {
    !sps.frame_mbs_only_flag
}

/// Whether the header carries bottom_field_flag.
pub fn has_bottom_field_flag(field_pic_flag: bool) -> bool {
    field_pic_flag
}

/// Whether the header carries idr_pic_id.
pub fn has_idr_pic_id(nal: &SliceNalHeader) -> bool {
    nal.idr_pic_flag
}

/// Whether the header carries pic_order_cnt_lsb.
pub fn has_pic_order_cnt_lsb(sps: &Sps) -> bool {
    sps.pic_order_cnt_type == 0
}

/// Whether the header carries delta_pic_order_cnt_bottom.
pub fn has_delta_pic_order_cnt_bottom(sps: &Sps, pps: &Pps, field_pic_flag: bool) -> bool {
    has_pic_order_cnt_lsb(sps) && pps.bottom_field_pic_order_in_frame_present_flag && !field_pic_flag
}

/// Whether the header carries delta_pic_order_cnt[0].
pub fn has_delta_pic_order_cnt_0(sps: &Sps) -> bool {
    sps.pic_order_cnt_type == 1 && !sps.delta_pic_order_always_zero_flag
}

/// Whether the header carries delta_pic_order_cnt[1].
pub fn has_delta_pic_order_cnt_1(sps: &Sps, pps: &Pps, field_pic_flag: bool) -> bool {
    has_delta_pic_order_cnt_0(sps)
        && pps.bottom_field_pic_order_in_frame_present_flag
        && !field_pic_flag
}

/// Whether the header carries redundant_pic_cnt.
pub fn has_redundant_pic_cnt(pps: &Pps) -> bool {
    pps.redundant_pic_cnt_present_flag
}

/// Whether the header carries direct_spatial_mv_pred_flag.
pub fn has_direct_spatial_mv_pred_flag(slice_type: SliceType) -> bool {
    slice_type == SliceType::B
}

/// Whether the header carries num_ref_idx_active_override_flag.
pub fn has_num_ref_idx_active_override_flag(slice_type: SliceType) -> bool {
    slice_type.is_inter()
}

/// Whether the header carries num_ref_idx_l1_active_minus1 (when overridden).
pub fn has_num_ref_idx_l1_active(slice_type: SliceType) -> bool {
    slice_type == SliceType::B
}

/// Whether the header carries ref_pic_list_modification.
pub fn has_ref_pic_list_modification(slice_type: SliceType) -> bool {
    !slice_type.is_intra()
}

/// Whether the header carries pred_weight_table.
pub fn has_pred_weight_table(pps: &Pps, slice_type: SliceType) -> bool {
    (pps.weighted_pred_flag && slice_type.is_p_or_sp())
        || (pps.weighted_bipred_idc == 1 && slice_type == SliceType::B)
}

/// Whether the header carries dec_ref_pic_marking.
pub fn has_dec_ref_pic_marking(nal: &SliceNalHeader) -> bool {
    nal.nal_ref_idc != 0
}

/// Whether the header carries cabac_init_idc.
pub fn has_cabac_init_idc(pps: &Pps, slice_type: SliceType) -> bool {
    pps.entropy_coding_mode_flag && !slice_type.is_intra()
}

/// Whether the header carries sp_for_switch_flag.
pub fn has_sp_for_switch_flag(slice_type: SliceType) -> bool {
    slice_type == SliceType::SP
}

/// Whether the header carries slice_qs_delta.
pub fn has_slice_qs_delta(slice_type: SliceType) -> bool {
    matches!(slice_type, SliceType::SP | SliceType::SI)
}

/// Whether the header carries disable_deblocking_filter_idc.
pub fn has_deblocking_filter_idc(pps: &Pps) -> bool {
    pps.deblocking_filter_control_present_flag
}

/// Whether the header carries slice_alpha_c0_offset_div2 and slice_beta_offset_div2.
pub fn has_deblocking_offsets(disable_deblocking_filter_idc: u32) -> bool {
    disable_deblocking_filter_idc != 1
}

/// Whether the header carries slice_group_change_cycle.
pub fn has_slice_group_change_cycle(pps: &Pps) -> bool {
    pps.num_slice_groups_minus1 > 0 && matches!(pps.slice_group_map_type(), Some(3..=5))
}

/// Width of slice_group_change_cycle:
/// Ceil(Log2(PicSizeInMapUnits ÷ SliceGroupChangeRate + 1)).
pub fn slice_group_change_cycle_bits(sps: &Sps, pps: &Pps) -> u32 {
    let pic_size = pps
        .pic_size_in_map_units()
        .unwrap_or_else(|| sps.pic_size_in_map_units());
    let rate = pps.slice_group_change_rate().unwrap_or(1);
    change_cycle_bits(pic_size, rate)
}

/// Smallest `k` with `2^k >= size / rate + 1`, i.e. `rate << k >= size + rate`.
pub fn change_cycle_bits(pic_size_in_map_units: u32, slice_group_change_rate: u32) -> u32 {
    let rate = u64::from(slice_group_change_rate.max(1));
    let target = u64::from(pic_size_in_map_units) + rate;
    let mut bits = 0;
    while (rate << bits) < target {
        bits += 1;
    }
    bits
}

/// Parses a slice header with the process-wide [`Config`].
pub fn parse_slice_header(nal: &[u8], sps: &Sps, pps: &Pps) -> Result<SliceHeader> {
    parse_slice_header_with(nal, sps, pps, &Config::current())
}

/// Parses the slice header at the start of `nal`, NAL header included.
pub fn parse_slice_header_with(
    nal: &[u8],
    sps: &Sps,
    pps: &Pps,
    config: &Config,
) -> Result<SliceHeader> {
    let nal_header = SliceNalHeader::parse(nal)?;
    let mut reader = BitReader::new_ebsp(&nal[nal_header.header_len..]);

    let first_mb_in_slice = reader.read_golomb()?;
    let slice_type = SliceType::from_code(reader.read_golomb()?)?;
    let pic_parameter_set_id = reader.read_golomb()?;
    if pic_parameter_set_id != pps.pic_parameter_set_id {
        log::warn!(
            "slice references PPS {} but PPS {} was supplied",
            pic_parameter_set_id,
            pps.pic_parameter_set_id
        );
    }
    log::debug!(
        "slice header nal_type={} slice_type={} first_mb={}",
        nal_header.nal_unit_type,
        slice_type,
        first_mb_in_slice
    );

    let mut sh = SliceHeader::new(first_mb_in_slice, slice_type, pic_parameter_set_id);

    if has_colour_plane_id(sps) {
        sh.colour_plane_id = reader.read_bits(2)? as u8;
    }
    sh.frame_num = reader.read_bits(sps.frame_num_bits())?;
    if has_field_pic_flag(sps) {
        sh.field_pic_flag = reader.read_bit()?;
        if has_bottom_field_flag(sh.field_pic_flag) {
            sh.bottom_field_flag = reader.read_bit()?;
        }
    }
    if has_idr_pic_id(&nal_header) {
        sh.idr_pic_id = reader.read_golomb()?;
    }
    if has_pic_order_cnt_lsb(sps) {
        sh.pic_order_cnt_lsb = reader.read_bits(sps.pic_order_cnt_lsb_bits())?;
        if has_delta_pic_order_cnt_bottom(sps, pps, sh.field_pic_flag) {
            sh.delta_pic_order_cnt_bottom = reader.read_signed_golomb()?;
        }
    }
    if has_delta_pic_order_cnt_0(sps) {
        sh.delta_pic_order_cnt[0] = reader.read_signed_golomb()?;
        if has_delta_pic_order_cnt_1(sps, pps, sh.field_pic_flag) {
            sh.delta_pic_order_cnt[1] = reader.read_signed_golomb()?;
        }
    }
    if has_redundant_pic_cnt(pps) {
        sh.redundant_pic_cnt = reader.read_golomb()?;
    }
    if has_direct_spatial_mv_pred_flag(slice_type) {
        sh.direct_spatial_mv_pred_flag = reader.read_bit()?;
    }
    if has_num_ref_idx_active_override_flag(slice_type) {
        sh.num_ref_idx_l0_active_minus1 = pps.num_ref_idx_l0_default_active_minus1;
        sh.num_ref_idx_l1_active_minus1 = pps.num_ref_idx_l1_default_active_minus1;
        sh.num_ref_idx_active_override_flag = reader.read_bit()?;
        if sh.num_ref_idx_active_override_flag {
            sh.num_ref_idx_l0_active_minus1 = reader.read_golomb()?;
            if has_num_ref_idx_l1_active(slice_type) {
                sh.num_ref_idx_l1_active_minus1 = reader.read_golomb()?;
            }
        }
        if sh.num_ref_idx_l0_active_minus1 > 31 || sh.num_ref_idx_l1_active_minus1 > 31 {
            return Err(NalError::InvalidData(format!(
                "active reference counts {}/{} out of range",
                sh.num_ref_idx_l0_active_minus1, sh.num_ref_idx_l1_active_minus1
            )));
        }
    }

    if is_extension_slice(nal_header.nal_unit_type) {
        return Err(NalError::NotImplemented(format!(
            "ref_pic_list_mvc_modification in NAL unit type {}",
            nal_header.nal_unit_type
        )));
    }
    if has_ref_pic_list_modification(slice_type) {
        sh.ref_pic_list_modification = Some(RefPicListModification::parse(
            &mut reader,
            slice_type,
            config.max_marking_operations,
        )?);
    }
    if has_pred_weight_table(pps, slice_type) {
        sh.pred_weight_table = Some(PredWeightTable::parse(
            &mut reader,
            sps.chroma_array_type(),
            slice_type,
            sh.num_ref_idx_l0_active_minus1,
            sh.num_ref_idx_l1_active_minus1,
        )?);
    }
    if has_dec_ref_pic_marking(&nal_header) {
        sh.dec_ref_pic_marking = Some(DecRefPicMarking::parse(
            &mut reader,
            nal_header.idr_pic_flag,
            config.max_marking_operations,
        )?);
    }

    if has_cabac_init_idc(pps, slice_type) {
        sh.cabac_init_idc = reader.read_golomb()?;
    }
    sh.slice_qp_delta = reader.read_signed_golomb()?;
    if has_slice_qs_delta(slice_type) {
        if has_sp_for_switch_flag(slice_type) {
            sh.sp_for_switch_flag = reader.read_bit()?;
        }
        sh.slice_qs_delta = reader.read_signed_golomb()?;
    }
    if has_deblocking_filter_idc(pps) {
        sh.disable_deblocking_filter_idc = reader.read_golomb()?;
        if has_deblocking_offsets(sh.disable_deblocking_filter_idc) {
            sh.slice_alpha_c0_offset_div2 = reader.read_signed_golomb()?;
            sh.slice_beta_offset_div2 = reader.read_signed_golomb()?;
        }
    }
    if has_slice_group_change_cycle(pps) {
        let bits = slice_group_change_cycle_bits(sps, pps);
        sh.slice_group_change_cycle = reader.read_bits(bits)?;
    }

    if let Some(err) = reader.first_error() {
        return Err(err);
    }

    sh.size = nal_header.header_len + reader.bytes_consumed();
    log::trace!("slice header size={} bytes", sh.size);
    Ok(sh)
}

/// Reads only first_mb_in_slice and slice_type.
pub fn slice_type_from_nalu(nal: &[u8]) -> Result<SliceType> {
    if nal.len() <= 1 {
        return Err(NalError::TooFewBits);
    }
    let nal_header = SliceNalHeader::parse(nal)?;
    let mut reader = BitReader::new_ebsp(&nal[nal_header.header_len..]);
    reader.read_golomb()?;
    SliceType::from_code(reader.read_golomb()?)
}

/// Reads first_mb_in_slice, slice_type and pic_parameter_set_id, enough to
/// pick the governing parameter sets.
pub fn peek_pic_parameter_set_id(nal: &[u8]) -> Result<u32> {
    let nal_header = SliceNalHeader::parse(nal)?;
    let mut reader = BitReader::new_ebsp(&nal[nal_header.header_len..]);
    reader.read_golomb()?;
    SliceType::from_code(reader.read_golomb()?)?;
    reader.read_golomb()
}
