use crate::error::Result;
use crate::utils::BitReader;

use super::types::SliceType;

/// Explicit luma weight and offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LumaWeight {
    /// luma_weight_lX
    pub weight: i32,
    /// luma_offset_lX
    pub offset: i32,
}

/// Explicit weight and offset of one chroma component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChromaWeight {
    /// chroma_weight_lX
    pub weight: i32,
    /// chroma_offset_lX
    pub offset: i32,
}

/// Explicit weights for one reference index. `None` means the flag was
/// clear and the default weight applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeightEntry {
    /// Set when luma_weight_lX_flag is
    pub luma: Option<LumaWeight>,
    /// Cb then Cr, set when chroma_weight_lX_flag is
    pub chroma: Option<[ChromaWeight; 2]>,
}

/// pred_weight_table (7.3.3.2).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PredWeightTable {
    /// Luma weight denominator, log2
    pub luma_log2_weight_denom: u32,
    /// Absent when ChromaArrayType is 0.
    pub chroma_log2_weight_denom: Option<u32>,
    /// One entry per active list 0 reference
    pub l0: Vec<WeightEntry>,
    /// One entry per active list 1 reference; empty unless B
    pub l1: Vec<WeightEntry>,
}

impl PredWeightTable {
    /// Reads the table. The entry counts come from the active reference
    /// counts already decoded in the slice header.
    pub fn parse(
        reader: &mut BitReader,
        chroma_array_type: u32,
        slice_type: SliceType,
        num_ref_idx_l0_active_minus1: u32,
        num_ref_idx_l1_active_minus1: u32,
    ) -> Result<Self> {
        let has_chroma = chroma_array_type != 0;

        let luma_log2_weight_denom = reader.read_golomb()?;
        let chroma_log2_weight_denom = if has_chroma {
            Some(reader.read_golomb()?)
        } else {
            None
        };

        let l0 = parse_entries(reader, has_chroma, num_ref_idx_l0_active_minus1)?;
        let l1 = if slice_type == SliceType::B {
            parse_entries(reader, has_chroma, num_ref_idx_l1_active_minus1)?
        } else {
            Vec::new()
        };

        Ok(PredWeightTable {
            luma_log2_weight_denom,
            chroma_log2_weight_denom,
            l0,
            l1,
        })
    }
}

fn parse_entries(
    reader: &mut BitReader,
    has_chroma: bool,
    num_ref_idx_active_minus1: u32,
) -> Result<Vec<WeightEntry>> {
    let mut entries = Vec::with_capacity(num_ref_idx_active_minus1 as usize + 1);

    for _ in 0..=num_ref_idx_active_minus1 {
        let mut entry = WeightEntry::default();

        if reader.read_bit()? {
            entry.luma = Some(LumaWeight {
                weight: reader.read_signed_golomb()?,
                offset: reader.read_signed_golomb()?,
            });
        }

        if has_chroma && reader.read_bit()? {
            let cb = ChromaWeight {
                weight: reader.read_signed_golomb()?,
                offset: reader.read_signed_golomb()?,
            };
            let cr = ChromaWeight {
                weight: reader.read_signed_golomb()?,
                offset: reader.read_signed_golomb()?,
            };
            entry.chroma = Some([cb, cr]);
        }

        entries.push(entry);
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NalError;
    use crate::utils::BitWriter;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_p_slice_table_with_chroma() {
        let mut writer = BitWriter::new();
        writer.write_golomb(6); // luma denom
        writer.write_golomb(5); // chroma denom
        // ref 0: luma and chroma
        writer.write_bit(true);
        writer.write_signed_golomb(70);
        writer.write_signed_golomb(-3);
        writer.write_bit(true);
        for v in [32, 1, 30, -1] {
            writer.write_signed_golomb(v);
        }
        // ref 1: nothing
        writer.write_bit(false);
        writer.write_bit(false);
        writer.write_trailing_bits();
        let data = writer.into_bytes();

        let mut reader = BitReader::new(&data);
        let table = PredWeightTable::parse(&mut reader, 1, SliceType::P, 1, 5).unwrap();
        assert_eq!(table.luma_log2_weight_denom, 6);
        assert_eq!(table.chroma_log2_weight_denom, Some(5));
        assert_eq!(
            table.l0,
            vec![
                WeightEntry {
                    luma: Some(LumaWeight {
                        weight: 70,
                        offset: -3
                    }),
                    chroma: Some([
                        ChromaWeight {
                            weight: 32,
                            offset: 1
                        },
                        ChromaWeight {
                            weight: 30,
                            offset: -1
                        },
                    ]),
                },
                WeightEntry::default(),
            ]
        );
        // P slices never read list 1
        assert!(table.l1.is_empty());
        assert!(reader.read_bit().unwrap());
    }

    #[test]
    fn test_b_slice_monochrome() {
        let mut writer = BitWriter::new();
        writer.write_golomb(0);
        // l0: one entry, luma only
        writer.write_bit(true);
        writer.write_signed_golomb(2);
        writer.write_signed_golomb(0);
        // l1: two entries
        writer.write_bit(false);
        writer.write_bit(true);
        writer.write_signed_golomb(-1);
        writer.write_signed_golomb(4);
        writer.write_trailing_bits();
        let data = writer.into_bytes();

        let mut reader = BitReader::new(&data);
        let table = PredWeightTable::parse(&mut reader, 0, SliceType::B, 0, 1).unwrap();
        assert_eq!(table.chroma_log2_weight_denom, None);
        assert_eq!(table.l0.len(), 1);
        assert_eq!(table.l1.len(), 2);
        assert_eq!(table.l1[0], WeightEntry::default());
        assert_eq!(
            table.l1[1].luma,
            Some(LumaWeight {
                weight: -1,
                offset: 4
            })
        );
        assert!(table.l1.iter().all(|e| e.chroma.is_none()));
    }

    #[test]
    fn test_truncated_table_fails() {
        let mut writer = BitWriter::new();
        writer.write_golomb(0);
        writer.write_golomb(0);
        writer.write_bit(true);
        let data = writer.into_bytes();

        let mut reader = BitReader::new(&data);
        let err = PredWeightTable::parse(&mut reader, 1, SliceType::P, 3, 0).unwrap_err();
        assert!(matches!(err, NalError::TooFewBits));
    }
}
