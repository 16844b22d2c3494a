use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{NalError, Result};

use super::{SeiData, SeiType};

fn expect_len(sei: &SeiData, len: usize) -> Result<()> {
    if sei.payload.len() != len {
        return Err(NalError::InvalidData(format!(
            "{} payload must be {} bytes, got {}",
            sei.sei_type().name(),
            len,
            sei.payload.len()
        )));
    }
    Ok(())
}

/// mastering_display_colour_volume, always 24 bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MasteringDisplayColourVolume {
    /// (x, y) per primary, in 0.00002 units.
    pub display_primaries: [(u16, u16); 3],
    /// (x, y), in 0.00002 units.
    pub white_point: (u16, u16),
    /// In 0.0001 cd/m2.
    pub max_display_mastering_luminance: u32,
    /// In 0.0001 cd/m2.
    pub min_display_mastering_luminance: u32,
}

impl MasteringDisplayColourVolume {
    /// Payload size in bytes.
    pub const SIZE: usize = 24;

    /// Fails with `InvalidData` unless the payload is exactly [`Self::SIZE`] bytes.
    pub fn decode(sei: &SeiData) -> Result<Self> {
        expect_len(sei, Self::SIZE)?;
        let mut buf = sei.payload.clone();
        let mut display_primaries = [(0u16, 0u16); 3];
        for primary in display_primaries.iter_mut() {
            *primary = (buf.get_u16(), buf.get_u16());
        }
        Ok(MasteringDisplayColourVolume {
            display_primaries,
            white_point: (buf.get_u16(), buf.get_u16()),
            max_display_mastering_luminance: buf.get_u32(),
            min_display_mastering_luminance: buf.get_u32(),
        })
    }

    /// Big-endian payload bytes.
    pub fn payload(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(Self::SIZE);
        for &(x, y) in &self.display_primaries {
            buf.put_u16(x);
            buf.put_u16(y);
        }
        buf.put_u16(self.white_point.0);
        buf.put_u16(self.white_point.1);
        buf.put_u32(self.max_display_mastering_luminance);
        buf.put_u32(self.min_display_mastering_luminance);
        buf.freeze()
    }
}

impl fmt::Display for MasteringDisplayColourVolume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [p0, p1, p2] = self.display_primaries;
        write!(
            f,
            "{} {}B: primaries=({}, {}) ({}, {}) ({}, {}), whitePoint=({}, {}), maxLum={}, minLum={}",
            SeiType::MASTERING_DISPLAY_COLOUR_VOLUME,
            Self::SIZE,
            p0.0,
            p0.1,
            p1.0,
            p1.1,
            p2.0,
            p2.1,
            self.white_point.0,
            self.white_point.1,
            self.max_display_mastering_luminance,
            self.min_display_mastering_luminance
        )
    }
}

/// content_light_level_info, always 4 bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentLightLevelInformation {
    /// MaxCLL, in cd/m2
    pub max_content_light_level: u16,
    /// MaxFALL, in cd/m2
    pub max_pic_average_light_level: u16,
}

impl ContentLightLevelInformation {
    /// Payload size in bytes.
    pub const SIZE: usize = 4;

    /// Fails with `InvalidData` unless the payload is exactly [`Self::SIZE`] bytes.
    pub fn decode(sei: &SeiData) -> Result<Self> {
        expect_len(sei, Self::SIZE)?;
        let mut buf = sei.payload.clone();
        Ok(ContentLightLevelInformation {
            max_content_light_level: buf.get_u16(),
            max_pic_average_light_level: buf.get_u16(),
        })
    }

    /// Big-endian payload bytes.
    pub fn payload(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(Self::SIZE);
        buf.put_u16(self.max_content_light_level);
        buf.put_u16(self.max_pic_average_light_level);
        buf.freeze()
    }
}

impl fmt::Display for ContentLightLevelInformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}B: maxContentLightLevel={}, maxPicAverageLightLevel={}",
            SeiType::CONTENT_LIGHT_LEVEL_INFORMATION,
            Self::SIZE,
            self.max_content_light_level,
            self.max_pic_average_light_level
        )
    }
}

/// alternative_transfer_characteristics, one byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlternativeTransferCharacteristics {
    /// Transfer characteristics code (Table E-4)
    pub preferred_transfer_characteristics: u8,
}

impl AlternativeTransferCharacteristics {
    /// Payload size in bytes.
    pub const SIZE: usize = 1;

    /// Fails with `InvalidData` unless the payload is exactly [`Self::SIZE`] bytes.
    pub fn decode(sei: &SeiData) -> Result<Self> {
        expect_len(sei, Self::SIZE)?;
        Ok(AlternativeTransferCharacteristics {
            preferred_transfer_characteristics: sei.payload[0],
        })
    }

    /// Big-endian payload bytes.
    pub fn payload(&self) -> Bytes {
        Bytes::copy_from_slice(&[self.preferred_transfer_characteristics])
    }
}

impl fmt::Display for AlternativeTransferCharacteristics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}B: preferredTransferCharacteristics={}",
            SeiType::ALTERNATIVE_TRANSFER_CHARACTERISTICS,
            Self::SIZE,
            self.preferred_transfer_characteristics
        )
    }
}
