//! # Utility Functions and Types
//!
//! Bit-level reading and writing plus emulation prevention handling,
//! shared by the H.264 syntax parsers and the SEI codecs.
//!
//! ## Bit Operations
//!
//! ```rust
//! use nalkit::utils::BitReader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = vec![0b10110011u8];
//! let mut reader = BitReader::new(&data);
//!
//! // Read specific number of bits
//! let value = reader.read_bits(3)?; // Reads first 3 bits (101)
//! assert_eq!(value, 0b101);
//! # Ok(())
//! # }
//! ```
//!
//! ## Emulation Prevention
//!
//! ```rust
//! use nalkit::utils::{insert_emulation_prevention, remove_emulation_prevention};
//!
//! let rbsp = [0x00, 0x00, 0x01];
//! let escaped = insert_emulation_prevention(&rbsp);
//! assert_eq!(escaped, vec![0x00, 0x00, 0x03, 0x01]);
//! assert_eq!(remove_emulation_prevention(&escaped), rbsp.to_vec());
//! ```

/// Bit manipulation and bitstream reading utilities
pub mod bits;

/// Emulation prevention byte removal and insertion
pub mod ebsp;

// Re-export commonly used types
pub use bits::*;
pub use ebsp::{insert_emulation_prevention, remove_emulation_prevention};
