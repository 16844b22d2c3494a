use thiserror::Error;

/// Errors returned by the parsers and SEI codecs.
#[derive(Error, Debug)]
pub enum NalError {
    /// Reading or writing a config file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The NAL unit type carries no slice header.
    #[error("no slice header in NAL unit type {0}")]
    NoSliceHeader(u8),

    /// slice_type outside 0..=9.
    #[error("invalid slice type {0}")]
    InvalidSliceType(u32),

    /// A syntax extension (MVC, 3D-AVC) that is recognised but not parsed.
    #[error("parser not implemented: {0}")]
    NotImplemented(String),

    /// The bitstream ended inside a syntax element.
    #[error("too few bits to parse symbol")]
    TooFewBits,

    /// The RBSP did not end with a stop bit.
    #[error("rbsp trailing bits missing")]
    TrailingBitsMissing,

    /// A syntax element is out of range or inconsistent.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A slice or PPS referenced a parameter set that was never seen.
    #[error("unknown parameter set: {0}")]
    UnknownParameterSet(String),
}

impl NalError {
    /// Returns true for outcomes that classify a NAL unit rather than
    /// signal a broken stream: a NAL type without a slice header, or a
    /// syntax extension this crate does not parse.
    pub fn is_classification(&self) -> bool {
        matches!(self, NalError::NoSliceHeader(_) | NalError::NotImplemented(_))
    }
}

impl Clone for NalError {
    fn clone(&self) -> Self {
        match self {
            NalError::Io(e) => NalError::Io(std::io::Error::new(e.kind(), e.to_string())),
            NalError::NoSliceHeader(t) => NalError::NoSliceHeader(*t),
            NalError::InvalidSliceType(t) => NalError::InvalidSliceType(*t),
            NalError::NotImplemented(s) => NalError::NotImplemented(s.clone()),
            NalError::TooFewBits => NalError::TooFewBits,
            NalError::TrailingBitsMissing => NalError::TrailingBitsMissing,
            NalError::InvalidData(s) => NalError::InvalidData(s.clone()),
            NalError::UnknownParameterSet(s) => NalError::UnknownParameterSet(s.clone()),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, NalError>;
