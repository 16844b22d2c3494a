use std::fmt;

use bytes::Bytes;

use crate::error::{NalError, Result};

/// An H.264 NAL unit with its header fields decoded. `data` still holds the
/// header byte and any emulation prevention bytes.
#[derive(Debug, Clone)]
pub struct NALUnit {
    /// nal_unit_type
    pub nal_type: u8,
    /// nal_ref_idc
    pub nal_ref_idc: u8,
    /// The whole NAL unit, header byte included
    pub data: Bytes,
}

impl NALUnit {
    /// Decodes the header byte; empty data or a set forbidden_zero_bit is `InvalidData`.
    pub fn new(data: Bytes) -> Result<Self> {
        let header = *data
            .first()
            .ok_or_else(|| NalError::InvalidData("empty NAL unit".into()))?;
        if header & 0x80 != 0 {
            return Err(NalError::InvalidData(format!(
                "forbidden_zero_bit set in NAL header {:#04x}",
                header
            )));
        }
        Ok(Self {
            nal_type: header & 0x1F,
            nal_ref_idc: (header >> 5) & 0x03,
            data,
        })
    }

    /// The NAL unit type as an enum.
    pub fn unit_type(&self) -> NALUnitType {
        NALUnitType::from(self.nal_type)
    }

    /// IDR slices and parameter sets.
    pub fn is_keyframe(&self) -> bool {
        self.nal_type == 5 || self.nal_type == 7 || self.nal_type == 8
    }
}

/// NAL unit type from bits 4..0 of the header byte.
pub fn nal_type(header: u8) -> u8 {
    header & 0x1F
}

/// nal_ref_idc from bits 6..5 of the header byte.
pub fn nal_ref_idc(header: u8) -> u8 {
    (header >> 5) & 0x03
}

/// nal_unit_type values (Table 7-1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NALUnitType {
    /// 0 and 24..=31
    Unspecified = 0,
    /// Non-IDR slice
    CodedSliceNonIDR = 1,
    /// Slice data partition A
    CodedSliceDataPartitionA = 2,
    /// Slice data partition B
    CodedSliceDataPartitionB = 3,
    /// Slice data partition C
    CodedSliceDataPartitionC = 4,
    /// IDR slice
    CodedSliceIDR = 5,
    /// Supplemental enhancement information
    SEI = 6,
    /// Sequence parameter set
    SPS = 7,
    /// Picture parameter set
    PPS = 8,
    /// Access unit delimiter
    AccessUnitDelimiter = 9,
    /// End of sequence
    EndOfSequence = 10,
    /// End of stream
    EndOfStream = 11,
    /// Filler data
    FillerData = 12,
    /// SPS extension
    SPSExtension = 13,
    /// Prefix NAL unit (SVC/MVC)
    PrefixNAL = 14,
    /// Subset SPS
    SubsetSPS = 15,
    /// Depth parameter set (3D-AVC)
    DepthParameterSet = 16,
    /// Auxiliary coded picture slice
    CodedSliceAux = 19,
    /// MVC/SVC slice extension
    CodedSliceExtension = 20,
    /// 3D-AVC depth slice extension
    CodedSliceDepthExtension = 21,
    /// 17, 18, 22 and 23
    Reserved = 17,
}

impl From<u8> for NALUnitType {
    fn from(value: u8) -> Self {
        match value & 0x1F {
            1 => NALUnitType::CodedSliceNonIDR,
            2 => NALUnitType::CodedSliceDataPartitionA,
            3 => NALUnitType::CodedSliceDataPartitionB,
            4 => NALUnitType::CodedSliceDataPartitionC,
            5 => NALUnitType::CodedSliceIDR,
            6 => NALUnitType::SEI,
            7 => NALUnitType::SPS,
            8 => NALUnitType::PPS,
            9 => NALUnitType::AccessUnitDelimiter,
            10 => NALUnitType::EndOfSequence,
            11 => NALUnitType::EndOfStream,
            12 => NALUnitType::FillerData,
            13 => NALUnitType::SPSExtension,
            14 => NALUnitType::PrefixNAL,
            15 => NALUnitType::SubsetSPS,
            16 => NALUnitType::DepthParameterSet,
            19 => NALUnitType::CodedSliceAux,
            20 => NALUnitType::CodedSliceExtension,
            21 => NALUnitType::CodedSliceDepthExtension,
            0 | 24..=31 => NALUnitType::Unspecified,
            _ => NALUnitType::Reserved,
        }
    }
}

impl fmt::Display for NALUnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NALUnitType::Unspecified => "Unspecified",
            NALUnitType::CodedSliceNonIDR => "NonIDR_1",
            NALUnitType::CodedSliceDataPartitionA => "PartitionA_2",
            NALUnitType::CodedSliceDataPartitionB => "PartitionB_3",
            NALUnitType::CodedSliceDataPartitionC => "PartitionC_4",
            NALUnitType::CodedSliceIDR => "IDR_5",
            NALUnitType::SEI => "SEI_6",
            NALUnitType::SPS => "SPS_7",
            NALUnitType::PPS => "PPS_8",
            NALUnitType::AccessUnitDelimiter => "AUD_9",
            NALUnitType::EndOfSequence => "EndOfSequence_10",
            NALUnitType::EndOfStream => "EndOfStream_11",
            NALUnitType::FillerData => "FillerData_12",
            NALUnitType::SPSExtension => "SPSExtension_13",
            NALUnitType::PrefixNAL => "Prefix_14",
            NALUnitType::SubsetSPS => "SubsetSPS_15",
            NALUnitType::DepthParameterSet => "DPS_16",
            NALUnitType::CodedSliceAux => "AuxSlice_19",
            NALUnitType::CodedSliceExtension => "SliceExtension_20",
            NALUnitType::CodedSliceDepthExtension => "SliceDepthExtension_21",
            NALUnitType::Reserved => "Reserved",
        };
        f.write_str(name)
    }
}

/// Slice type after folding raw values 5..=9 onto 0..=4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SliceType {
    /// Predicted
    P = 0,
    /// Bi-predicted
    B = 1,
    /// Intra
    I = 2,
    /// Switching P
    SP = 3,
    /// Switching I
    SI = 4,
}

impl SliceType {
    /// Folds a raw slice_type code. Values 5..=9 signal that every slice of
    /// the picture shares the type and map onto 0..=4.
    pub fn from_code(code: u32) -> Result<Self> {
        match code {
            0 | 5 => Ok(SliceType::P),
            1 | 6 => Ok(SliceType::B),
            2 | 7 => Ok(SliceType::I),
            3 | 8 => Ok(SliceType::SP),
            4 | 9 => Ok(SliceType::SI),
            _ => Err(NalError::InvalidSliceType(code)),
        }
    }

    /// I and SI slices carry no inter prediction.
    pub fn is_intra(self) -> bool {
        matches!(self, SliceType::I | SliceType::SI)
    }

    /// P, SP and B slices read num_ref_idx_active_override_flag.
    pub fn is_inter(self) -> bool {
        !self.is_intra()
    }

    /// P and SP slices, which use list 0 weights under weighted_pred_flag.
    pub fn is_p_or_sp(self) -> bool {
        matches!(self, SliceType::P | SliceType::SP)
    }
}

impl fmt::Display for SliceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SliceType::P => "P",
            SliceType::B => "B",
            SliceType::I => "I",
            SliceType::SP => "SP",
            SliceType::SI => "SI",
        };
        f.write_str(name)
    }
}
