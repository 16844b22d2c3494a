#![doc(html_root_url = "https://docs.rs/nalkit/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

//! # nalkit - H.264 slice header and SEI parsing
//!
//! `nalkit` reads the syntax of H.264/AVC NAL units: sequence and picture
//! parameter sets, complete slice headers (reference list modification,
//! prediction weight tables and reference picture marking included), and
//! the SEI messages carried by AVC and HEVC streams.
//!
//! ## Features
//!
//! - Slice headers for NAL unit types 1, 2, 5 and 19, with the consumed
//!   header size in escaped bytes
//! - SPS and PPS parsing, with a [`codec::H264Parser`] that tracks them by id
//! - SEI extraction and byte-exact re-encoding
//! - Typed SEI messages: buffering period, AVC picture timing, HEVC time
//!   code, T.35 user data with CEA-608 captions, HDR metadata
//!
//! ## Quick Start
//!
//! ```rust
//! use nalkit::codec::H264Parser;
//!
//! # fn main() -> nalkit::Result<()> {
//! let parser = H264Parser::new();
//! parser.parse_nalu(&[
//!     0x67, 0x4d, 0x40, 0x28, 0xd9, 0x00, 0x78, 0x02, 0x27, 0xe5, 0x9a, 0x80,
//!     0x80, 0x80, 0xa0, 0x00, 0x00, 0x03, 0x00, 0xc0, 0x00, 0x00, 0x23, 0xc1,
//!     0xe3, 0x06, 0x49,
//! ])?;
//! parser.parse_nalu(&[0x68, 0xeb, 0xc0, 0x8c, 0xf2])?;
//!
//! let header = parser.parse_slice_header(&[
//!     0x25, 0x88, 0x80, 0x40, 0xff, 0xde, 0x08, 0xe4, 0x7a, 0x7b, 0xff, 0x05, 0xab,
//! ])?;
//! assert!(header.slice_type.is_intra());
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - `codec`: H.264 parameter sets, slice headers and NAL unit helpers
//! - `sei`: SEI message extraction, decoding and writing
//! - `config`: parser limits from the environment or `nalkit.toml`
//! - `error`: the [`NalError`] type and [`Result`] alias
//! - `utils`: bit reader and writer, emulation prevention

/// H.264 codec syntax
pub mod codec;

/// Parser limits
pub mod config;

/// Error types
pub mod error;

/// Supplemental enhancement information
pub mod sei;

/// Bitstream utilities
pub mod utils;

pub use error::{NalError, Result};
