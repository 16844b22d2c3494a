use std::fmt;

use bytes::{Buf, Bytes};

use crate::error::{NalError, Result};

use super::{hex_string, SeiData, SeiType};

const COUNTRY_CODE_USA: u8 = 0xB5;
const PROVIDER_CODE_ATSC: u16 = 0x0031;
const ATSC1_IDENTIFIER: &[u8; 4] = b"GA94";
const USER_DATA_TYPE_CC_DATA: u8 = 0x03;

/// CEA-608 byte pairs pulled out of an ATSC A/53 cc_data block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cea608 {
    /// Field 1 byte pairs
    pub field1: Vec<u8>,
    /// Field 2 byte pairs
    pub field2: Vec<u8>,
}

impl Cea608 {
    /// Parses the bytes after the T.35 country and provider codes. `None`
    /// unless this is a complete GA94 cc_data block.
    fn from_atsc(mut buf: Bytes) -> Option<Self> {
        if buf.remaining() < 7 {
            return None;
        }
        let identifier = buf.split_to(4);
        if identifier[..] != ATSC1_IDENTIFIER[..] || buf.get_u8() != USER_DATA_TYPE_CC_DATA {
            return None;
        }
        let flags = buf.get_u8();
        if flags & 0x40 == 0 {
            return None;
        }
        let cc_count = usize::from(flags & 0x1F);
        buf.advance(1); // em_data
        if buf.remaining() < cc_count * 3 {
            return None;
        }

        let mut cea = Cea608::default();
        for _ in 0..cc_count {
            let marker = buf.get_u8();
            let pair = [buf.get_u8(), buf.get_u8()];
            let cc_valid = marker & 0x04 != 0;
            match (cc_valid, marker & 0x03) {
                (true, 0) => cea.field1.extend_from_slice(&pair),
                (true, 1) => cea.field2.extend_from_slice(&pair),
                _ => {}
            }
        }
        Some(cea)
    }
}

/// user_data_registered_itu_t_t35.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDataRegistered {
    /// Country code; 0xB5 for the USA
    pub itu_t_t35_country_code: u8,
    /// Present when the country code is 0xFF
    pub itu_t_t35_country_code_extension_byte: Option<u8>,
    /// Captions from an ATSC GA94 cc_data block
    pub cea608: Option<Cea608>,
    payload: Bytes,
}

impl UserDataRegistered {
    /// Decodes the payload; `InvalidData` when it is too short.
    pub fn decode(sei: &SeiData) -> Result<Self> {
        let mut buf = sei.payload.clone();
        if !buf.has_remaining() {
            return Err(NalError::InvalidData("empty T.35 user data".into()));
        }
        let itu_t_t35_country_code = buf.get_u8();
        let itu_t_t35_country_code_extension_byte = if itu_t_t35_country_code == 0xFF {
            if !buf.has_remaining() {
                return Err(NalError::InvalidData("missing T.35 country extension".into()));
            }
            Some(buf.get_u8())
        } else {
            None
        };

        let cea608 = if itu_t_t35_country_code == COUNTRY_CODE_USA
            && buf.remaining() >= 2
            && buf.get_u16() == PROVIDER_CODE_ATSC
        {
            Cea608::from_atsc(buf)
        } else {
            None
        };
        if cea608.is_none() {
            log::trace!("T.35 user data without CEA-608 captions");
        }

        Ok(UserDataRegistered {
            itu_t_t35_country_code,
            itu_t_t35_country_code_extension_byte,
            cea608,
            payload: sei.payload.clone(),
        })
    }

    /// The payload bytes.
    pub fn payload(&self) -> Bytes {
        self.payload.clone()
    }
}

impl fmt::Display for UserDataRegistered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cea608 {
            Some(cea) => write!(
                f,
                "SEI type {} CEA-608, size={}, field1: \"{}\", field2: \"{}\"",
                SeiType::USER_DATA_REGISTERED_ITU_T_T35.0,
                self.payload.len(),
                hex_string(&cea.field1),
                hex_string(&cea.field2)
            ),
            None => write!(
                f,
                "{}, size={}, \"{}\"",
                SeiType::USER_DATA_REGISTERED_ITU_T_T35,
                self.payload.len(),
                hex_string(&self.payload)
            ),
        }
    }
}

/// user_data_unregistered: a 16-byte UUID followed by opaque data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDataUnregistered {
    /// Identifies the data format
    pub uuid_iso_iec_11578: [u8; 16],
    /// Bytes after the UUID
    pub data: Bytes,
}

impl UserDataUnregistered {
    /// Decodes the payload; `InvalidData` when it is too short.
    pub fn decode(sei: &SeiData) -> Result<Self> {
        if sei.payload.len() < 16 {
            return Err(NalError::InvalidData(format!(
                "unregistered user data of {} bytes has no UUID",
                sei.payload.len()
            )));
        }
        let mut uuid_iso_iec_11578 = [0u8; 16];
        uuid_iso_iec_11578.copy_from_slice(&sei.payload[..16]);
        Ok(UserDataUnregistered {
            uuid_iso_iec_11578,
            data: sei.payload.slice(16..),
        })
    }

    /// The payload bytes.
    pub fn payload(&self) -> Bytes {
        let mut out = Vec::with_capacity(16 + self.data.len());
        out.extend_from_slice(&self.uuid_iso_iec_11578);
        out.extend_from_slice(&self.data);
        Bytes::from(out)
    }
}

impl fmt::Display for UserDataUnregistered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, size={}, uuid={}, \"{}\"",
            SeiType::USER_DATA_UNREGISTERED,
            16 + self.data.len(),
            hex_string(&self.uuid_iso_iec_11578),
            hex_string(&self.data)
        )
    }
}
