//! # H.264/AVC Syntax Parsing
//!
//! This module parses the H.264/AVC syntax structures that describe each
//! coded picture without decoding it:
//!
//! - NAL unit header classification
//! - Sequence and Picture Parameter Sets (SPS/PPS), including VUI and HRD
//! - Slice headers with reference list modification, prediction weight
//!   tables and decoded reference picture marking
//! - Length-prefixed and Annex B NAL unit splitting
//!
//! ## Example: Parsing a Slice Header
//!
//! ```rust
//! use nalkit::codec::h264::H264Parser;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let hex = |s: &str| -> Vec<u8> {
//!     (0..s.len()).step_by(2).map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap()).collect()
//! };
//!
//! let parser = H264Parser::new();
//! parser.parse_nalu(&hex("674d4028d900780227e59a808080a000000300c0000023c1e30649"))?;
//! parser.parse_nalu(&hex("68ebc08cf2"))?;
//!
//! let slice = hex("419a4f0864ca611f6ffe9e213ed705ab96e200580cf45006ba6fac874bbc96c4");
//! let header = parser.parse_slice_header(&slice)?;
//! assert_eq!(header.size, 9);
//! assert_eq!(parser.dimensions(), Some((1920, 1080)));
//! # Ok(())
//! # }
//! ```

/// Stateful parameter set tracking and NAL unit splitting
pub mod parser;

/// Picture parameter set parsing
pub mod pps;

/// Prediction weight table sub-syntax
pub mod pred_weight;

/// Reference list modification and reference picture marking sub-syntaxes
pub mod ref_pic;

/// Slice header parsing
pub mod slice;

/// Sequence parameter set parsing, including VUI and HRD parameters
pub mod sps;

/// NAL unit and slice type definitions
pub mod types;


pub use parser::{nalus_from_sample, nalus_from_sample_with_length_size, split_annexb, H264Parser};
pub use pps::{parse_pps, Pps, SliceGroupMap};
pub use pred_weight::{ChromaWeight, LumaWeight, PredWeightTable, WeightEntry};
pub use ref_pic::{DecRefPicMarking, MemoryManagementOp, ModificationOp, RefPicListModification};
pub use slice::{parse_slice_header, parse_slice_header_with, slice_type_from_nalu, SliceHeader};
pub use sps::{parse_sps, HrdParameters, Sps, Vui};
pub use types::{NALUnit, NALUnitType, SliceType};
