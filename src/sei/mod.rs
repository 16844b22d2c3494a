//! # Supplemental Enhancement Information
//!
//! SEI NAL units carry a sequence of `(payload_type, payload)` messages.
//! [`extract_sei_data`] splits the escaped RBSP into raw [`SeiData`]
//! records, [`decode_sei_message`] turns a record into a typed
//! [`SeiMessage`], and [`write_sei_messages`] serializes messages back into
//! an escaped RBSP. Every message reproduces its original payload bytes.
//!
//! ```rust
//! use nalkit::sei::{decode_sei_message, extract_sei_data, write_sei_messages, Codec};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let rbsp = [0x90, 0x04, 0x03, 0xE8, 0x01, 0x90, 0x80];
//! let extraction = extract_sei_data(&rbsp)?;
//! assert!(!extraction.trailing_bits_missing);
//!
//! let message = decode_sei_message(&extraction.messages[0], Codec::Hevc)?;
//! assert_eq!(
//!     message.to_string(),
//!     "SEIContentLightLevelInformationType (144) 4B: maxContentLightLevel=1000, maxPicAverageLightLevel=400"
//! );
//! assert_eq!(write_sei_messages(&[message])?, rbsp.to_vec());
//! # Ok(())
//! # }
//! ```

use std::fmt;

use bytes::Bytes;

/// SEI RBSP splitting and writing
pub mod extract;

/// Mastering display colour volume, content light level and alternative
/// transfer characteristics
pub mod hdr;

/// Typed SEI messages and the payload type registry
pub mod message;

/// HEVC time code
pub mod time_code;

/// Buffering period and AVC picture timing
pub mod timing;

/// ITU-T T.35 registered and unregistered user data
pub mod user_data;

#[cfg(test)]
mod tests;

pub use extract::{
    extract_sei_data, extract_sei_data_with, sei_nalu_payload, write_sei_data, write_sei_messages,
    SeiExtraction,
};
pub use hdr::{
    AlternativeTransferCharacteristics, ContentLightLevelInformation, MasteringDisplayColourVolume,
};
pub use message::{decode_sei_message, SeiMessage};
pub use time_code::{decode_time_code, TimeCode, TimeCodeClock};
pub use timing::{
    decode_buffering_period, decode_pic_timing_avc, BufferingPeriod, ClockTime, ClockTimestamp,
    CpbDpbDelay, HrdDelayLengths, PicTimingAvc,
};
pub use user_data::{Cea608, UserDataRegistered, UserDataUnregistered};

/// Codec family; the two assign different meanings to some payload types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    /// H.264/AVC
    Avc,
    /// H.265/HEVC
    Hevc,
}

/// An SEI payload type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeiType(pub u32);

impl SeiType {
    /// buffering_period
    pub const BUFFERING_PERIOD: SeiType = SeiType(0);
    /// pic_timing
    pub const PIC_TIMING: SeiType = SeiType(1);
    /// user_data_registered_itu_t_t35
    pub const USER_DATA_REGISTERED_ITU_T_T35: SeiType = SeiType(4);
    /// user_data_unregistered
    pub const USER_DATA_UNREGISTERED: SeiType = SeiType(5);
    /// recovery_point
    pub const RECOVERY_POINT: SeiType = SeiType(6);
    /// time_code (HEVC)
    pub const TIME_CODE: SeiType = SeiType(136);
    /// mastering_display_colour_volume
    pub const MASTERING_DISPLAY_COLOUR_VOLUME: SeiType = SeiType(137);
    /// content_light_level_info
    pub const CONTENT_LIGHT_LEVEL_INFORMATION: SeiType = SeiType(144);
    /// alternative_transfer_characteristics
    pub const ALTERNATIVE_TRANSFER_CHARACTERISTICS: SeiType = SeiType(147);

    /// Descriptive name; `SEIReservedType` for unassigned types.
    pub fn name(self) -> &'static str {
        match self.0 {
            0 => "SEIBufferingPeriodType",
            1 => "SEIPicTimingType",
            2 => "SEIPanScanRectType",
            3 => "SEIFillerPayloadType",
            4 => "SEIUserDataRegisteredITUTT35Type",
            5 => "SEIUserDataUnregisteredType",
            6 => "SEIRecoveryPointType",
            7 => "SEIDecRefPicMarkingRepetitionType",
            8 => "SEISparePicType",
            9 => "SEISceneInfoType",
            10 => "SEISubSeqInfoType",
            11 => "SEISubSeqLayerCharacteristicsType",
            12 => "SEISubSeqCharacteristicsType",
            13 => "SEIFullFrameFreezeType",
            14 => "SEIFullFrameFreezeReleaseType",
            15 => "SEIFullFrameSnapshotType",
            16 => "SEIProgressiveRefinementSegmentStartType",
            17 => "SEIProgressiveRefinementSegmentEndType",
            18 => "SEIMotionConstrainedSliceGroupSetType",
            19 => "SEIFilmGrainCharacteristicsType",
            20 => "SEIDeblockingFilterDisplayPreferenceType",
            21 => "SEIStereoVideoInfoType",
            22 => "SEIPostFilterHintType",
            23 => "SEIToneMappingInfoType",
            45 => "SEIFramePackingArrangementType",
            47 => "SEIDisplayOrientationType",
            56 => "SEIGreenMetadataType",
            128 => "SEIStructureOfPicturesInfoType",
            129 => "SEIActiveParameterSetsType",
            130 => "SEIDecodingUnitInfoType",
            131 => "SEITemporalSubLayerZeroIndexType",
            132 => "SEIDecodedPictureHashType",
            133 => "SEIScalableNestingType",
            134 => "SEIRegionRefreshInfoType",
            135 => "SEINoDisplayType",
            136 => "SEITimeCodeType",
            137 => "SEIMasteringDisplayColourVolumeType",
            138 => "SEISegmentedRectFramePackingArrangementType",
            139 => "SEITemporalMotionConstrainedTileSetsType",
            140 => "SEIChromaResamplingFilterHintType",
            141 => "SEIKneeFunctionInfoType",
            142 => "SEIColourRemappingInfoType",
            143 => "SEIDeinterlacedFieldIdentificationType",
            144 => "SEIContentLightLevelInformationType",
            145 => "SEIDependentRapIndicationType",
            146 => "SEICodedRegionCompletionType",
            147 => "SEIAlternativeTransferCharacteristicsType",
            148 => "SEIAmbientViewingEnvironmentType",
            149 => "SEIContentColourVolumeType",
            _ => "SEIReservedType",
        }
    }
}

impl fmt::Display for SeiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.0)
    }
}

impl From<u32> for SeiType {
    fn from(value: u32) -> Self {
        SeiType(value)
    }
}

/// A raw SEI message: payload type and the unescaped payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeiData {
    /// payloadType
    pub payload_type: u32,
    /// Payload with emulation prevention removed
    pub payload: Bytes,
}

impl SeiData {
    /// Wraps a payload without copying it.
    pub fn new(payload_type: u32, payload: impl Into<Bytes>) -> Self {
        SeiData {
            payload_type,
            payload: payload.into(),
        }
    }

    /// The payload type as an [`SeiType`].
    pub fn sei_type(&self) -> SeiType {
        SeiType(self.payload_type)
    }
}

/// Lowercase hex without separators, as used in message descriptions.
pub(crate) fn hex_string(data: &[u8]) -> String {
    use std::fmt::Write;

    let mut s = String::with_capacity(data.len() * 2);
    for b in data {
        let _ = write!(s, "{:02x}", b);
    }
    s
}
