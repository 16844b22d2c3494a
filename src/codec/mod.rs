/// H.264/AVC parameter set and slice header parsing
pub mod h264;

pub use h264::{H264Parser, NALUnit, SliceHeader, SliceType};
