use std::fmt;

use bytes::Bytes;

use crate::error::{NalError, Result};

use super::hdr::{
    AlternativeTransferCharacteristics, ContentLightLevelInformation, MasteringDisplayColourVolume,
};
use super::time_code::{decode_time_code, TimeCode};
use super::timing::{decode_buffering_period, decode_pic_timing_avc, BufferingPeriod, PicTimingAvc};
use super::user_data::{UserDataRegistered, UserDataUnregistered};
use super::{hex_string, Codec, SeiData, SeiType};

/// A decoded SEI message. Types without a dedicated decoder, or whose
/// payload did not fit the decoder, are kept as [`SeiMessage::Raw`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeiMessage {
    /// Payload type 0
    BufferingPeriod(BufferingPeriod),
    /// Payload type 1 in AVC streams
    PicTimingAvc(PicTimingAvc),
    /// Payload type 4
    UserDataRegistered(UserDataRegistered),
    /// Payload type 5
    UserDataUnregistered(UserDataUnregistered),
    /// Payload type 136 in HEVC streams
    TimeCode(TimeCode),
    /// Payload type 137
    MasteringDisplayColourVolume(MasteringDisplayColourVolume),
    /// Payload type 144
    ContentLightLevelInformation(ContentLightLevelInformation),
    /// Payload type 147
    AlternativeTransferCharacteristics(AlternativeTransferCharacteristics),
    /// Anything else, kept as-is
    Raw(SeiData),
}

impl SeiMessage {
    /// The payload type this message is written with.
    pub fn sei_type(&self) -> SeiType {
        match self {
            SeiMessage::BufferingPeriod(_) => SeiType::BUFFERING_PERIOD,
            SeiMessage::PicTimingAvc(_) => SeiType::PIC_TIMING,
            SeiMessage::UserDataRegistered(_) => SeiType::USER_DATA_REGISTERED_ITU_T_T35,
            SeiMessage::UserDataUnregistered(_) => SeiType::USER_DATA_UNREGISTERED,
            SeiMessage::TimeCode(_) => SeiType::TIME_CODE,
            SeiMessage::MasteringDisplayColourVolume(_) => SeiType::MASTERING_DISPLAY_COLOUR_VOLUME,
            SeiMessage::ContentLightLevelInformation(_) => SeiType::CONTENT_LIGHT_LEVEL_INFORMATION,
            SeiMessage::AlternativeTransferCharacteristics(_) => {
                SeiType::ALTERNATIVE_TRANSFER_CHARACTERISTICS
            }
            SeiMessage::Raw(sei) => sei.sei_type(),
        }
    }

    /// The payload bytes; identical to the bytes the message was decoded
    /// from.
    pub fn payload(&self) -> Result<Bytes> {
        Ok(match self {
            SeiMessage::BufferingPeriod(bp) => bp.payload.clone(),
            SeiMessage::PicTimingAvc(pt) => pt.payload()?,
            SeiMessage::UserDataRegistered(ud) => ud.payload(),
            SeiMessage::UserDataUnregistered(ud) => ud.payload(),
            SeiMessage::TimeCode(tc) => tc.payload()?,
            SeiMessage::MasteringDisplayColourVolume(m) => m.payload(),
            SeiMessage::ContentLightLevelInformation(c) => c.payload(),
            SeiMessage::AlternativeTransferCharacteristics(a) => a.payload(),
            SeiMessage::Raw(sei) => sei.payload.clone(),
        })
    }

    /// Re-encodes the message as a raw [`SeiData`].
    pub fn to_sei_data(&self) -> Result<SeiData> {
        Ok(SeiData {
            payload_type: self.sei_type().0,
            payload: self.payload()?,
        })
    }
}

impl fmt::Display for SeiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeiMessage::BufferingPeriod(bp) => fmt::Display::fmt(bp, f),
            SeiMessage::PicTimingAvc(pt) => fmt::Display::fmt(pt, f),
            SeiMessage::UserDataRegistered(ud) => fmt::Display::fmt(ud, f),
            SeiMessage::UserDataUnregistered(ud) => fmt::Display::fmt(ud, f),
            SeiMessage::TimeCode(tc) => fmt::Display::fmt(tc, f),
            SeiMessage::MasteringDisplayColourVolume(m) => fmt::Display::fmt(m, f),
            SeiMessage::ContentLightLevelInformation(c) => fmt::Display::fmt(c, f),
            SeiMessage::AlternativeTransferCharacteristics(a) => fmt::Display::fmt(a, f),
            SeiMessage::Raw(sei) => write!(
                f,
                "{}, size={}, \"{}\"",
                sei.sei_type(),
                sei.payload.len(),
                hex_string(&sei.payload)
            ),
        }
    }
}

/// Decodes one raw message for the given codec family.
///
/// A payload that is the wrong shape for its type (`InvalidData`) is logged
/// and kept as [`SeiMessage::Raw`]; a payload that runs out of bits fails.
pub fn decode_sei_message(sei: &SeiData, codec: Codec) -> Result<SeiMessage> {
    let decoded = match (sei.sei_type(), codec) {
        (SeiType::BUFFERING_PERIOD, _) => {
            decode_buffering_period(sei).map(SeiMessage::BufferingPeriod)
        }
        (SeiType::PIC_TIMING, Codec::Avc) => {
            decode_pic_timing_avc(sei, None, 0).map(SeiMessage::PicTimingAvc)
        }
        (SeiType::USER_DATA_REGISTERED_ITU_T_T35, _) => {
            UserDataRegistered::decode(sei).map(SeiMessage::UserDataRegistered)
        }
        (SeiType::USER_DATA_UNREGISTERED, _) => {
            UserDataUnregistered::decode(sei).map(SeiMessage::UserDataUnregistered)
        }
        (SeiType::TIME_CODE, Codec::Hevc) => decode_time_code(sei).map(SeiMessage::TimeCode),
        (SeiType::MASTERING_DISPLAY_COLOUR_VOLUME, _) => {
            MasteringDisplayColourVolume::decode(sei).map(SeiMessage::MasteringDisplayColourVolume)
        }
        (SeiType::CONTENT_LIGHT_LEVEL_INFORMATION, _) => {
            ContentLightLevelInformation::decode(sei).map(SeiMessage::ContentLightLevelInformation)
        }
        (SeiType::ALTERNATIVE_TRANSFER_CHARACTERISTICS, _) => {
            AlternativeTransferCharacteristics::decode(sei)
                .map(SeiMessage::AlternativeTransferCharacteristics)
        }
        _ => Ok(SeiMessage::Raw(sei.clone())),
    };

    match decoded {
        Err(NalError::InvalidData(reason)) => {
            log::warn!("keeping {} as raw: {}", sei.sei_type(), reason);
            Ok(SeiMessage::Raw(sei.clone()))
        }
        other => other,
    }
}
