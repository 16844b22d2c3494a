//! Reference picture list modification (7.3.3.1) and decoded reference
//! picture marking (7.3.3.3).
//!
//! Both syntaxes are loops terminated by an operation code read inside the
//! loop. The terminator ends the loop and is never stored.

use crate::error::{NalError, Result};
use crate::utils::BitReader;

use super::types::SliceType;

/// One modification_of_pic_nums_idc entry with its operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModificationOp {
    /// idc 0
    SubtractAbsDiffPicNum(u32),
    /// idc 1
    AddAbsDiffPicNum(u32),
    /// idc 2
    LongTermPicNum(u32),
}

impl ModificationOp {
    /// The modification_of_pic_nums_idc code.
    pub fn idc(&self) -> u32 {
        match self {
            ModificationOp::SubtractAbsDiffPicNum(_) => 0,
            ModificationOp::AddAbsDiffPicNum(_) => 1,
            ModificationOp::LongTermPicNum(_) => 2,
        }
    }
}

/// ref_pic_list_modification for lists 0 and 1.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefPicListModification {
    /// List 0 is modified
    pub ref_pic_list_modification_flag_l0: bool,
    /// List 0 operations, without the terminator
    pub modifications_l0: Vec<ModificationOp>,
    /// List 1 is modified (B slices only)
    pub ref_pic_list_modification_flag_l1: bool,
    /// List 1 operations, without the terminator
    pub modifications_l1: Vec<ModificationOp>,
}

impl RefPicListModification {
    /// Parses the syntax for a P, SP or B slice. List 1 is only present for
    /// B slices and is read under its own flag.
    pub fn parse(
        reader: &mut BitReader,
        slice_type: SliceType,
        max_operations: usize,
    ) -> Result<Self> {
        let mut rplm = RefPicListModification::default();

        if slice_type.is_intra() {
            return Ok(rplm);
        }

        rplm.ref_pic_list_modification_flag_l0 = reader.read_bit()?;
        if rplm.ref_pic_list_modification_flag_l0 {
            rplm.modifications_l0 = parse_modification_ops(reader, max_operations)?;
        }

        if slice_type == SliceType::B {
            rplm.ref_pic_list_modification_flag_l1 = reader.read_bit()?;
            if rplm.ref_pic_list_modification_flag_l1 {
                rplm.modifications_l1 = parse_modification_ops(reader, max_operations)?;
            }
        }

        log::trace!(
            "ref_pic_list_modification l0={:?} l1={:?}",
            rplm.modifications_l0,
            rplm.modifications_l1
        );
        Ok(rplm)
    }
}

fn parse_modification_ops(
    reader: &mut BitReader,
    max_operations: usize,
) -> Result<Vec<ModificationOp>> {
    let mut ops = Vec::new();
    loop {
        let op = match reader.read_golomb()? {
            0 => ModificationOp::SubtractAbsDiffPicNum(reader.read_golomb()?),
            1 => ModificationOp::AddAbsDiffPicNum(reader.read_golomb()?),
            2 => ModificationOp::LongTermPicNum(reader.read_golomb()?),
            3 => break,
            idc => {
                return Err(NalError::InvalidData(format!(
                    "modification_of_pic_nums_idc {} out of range",
                    idc
                )))
            }
        };
        if ops.len() == max_operations {
            return Err(NalError::InvalidData(format!(
                "more than {} reference list modifications",
                max_operations
            )));
        }
        ops.push(op);
    }
    Ok(ops)
}

/// memory_management_control_operation 1..=6 with exactly its operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryManagementOp {
    /// 1: mark a short-term picture unused
    MarkShortTermUnused {
        /// Picture number distance minus 1
        difference_of_pic_nums_minus1: u32,
    },
    /// 2: mark a long-term picture unused
    MarkLongTermUnused {
        /// long_term_pic_num
        long_term_pic_num: u32,
    },
    /// 3: turn a short-term picture into a long-term one
    AssignLongTermFrameIdx {
        /// Picture number distance minus 1
        difference_of_pic_nums_minus1: u32,
        /// long_term_frame_idx
        long_term_frame_idx: u32,
    },
    /// 4: set the maximum long-term frame index
    SetMaxLongTermFrameIdx {
        /// 0 means no long-term frame indices
        max_long_term_frame_idx_plus1: u32,
    },
    /// 5: mark all reference pictures unused
    MarkAllUnused,
    /// 6: mark the current picture long-term
    MarkCurrentLongTerm {
        /// long_term_frame_idx
        long_term_frame_idx: u32,
    },
}

impl MemoryManagementOp {
    /// The memory_management_control_operation code.
    pub fn code(&self) -> u32 {
        match self {
            MemoryManagementOp::MarkShortTermUnused { .. } => 1,
            MemoryManagementOp::MarkLongTermUnused { .. } => 2,
            MemoryManagementOp::AssignLongTermFrameIdx { .. } => 3,
            MemoryManagementOp::SetMaxLongTermFrameIdx { .. } => 4,
            MemoryManagementOp::MarkAllUnused => 5,
            MemoryManagementOp::MarkCurrentLongTerm { .. } => 6,
        }
    }
}

/// dec_ref_pic_marking (7.3.3.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecRefPicMarking {
    /// IDR pictures
    Idr {
        /// Discard earlier pictures in the DPB
        no_output_of_prior_pics_flag: bool,
        /// The IDR picture becomes a long-term reference
        long_term_reference_flag: bool,
    },
    /// Non-IDR reference pictures
    Adaptive {
        /// Adaptive marking; sliding window when clear
        adaptive_ref_pic_marking_mode_flag: bool,
        /// Operations without the terminating 0
        operations: Vec<MemoryManagementOp>,
    },
}

impl DecRefPicMarking {
    /// Reads the syntax; more than `max_operations` operations is `InvalidData`.
    pub fn parse(reader: &mut BitReader, idr_pic_flag: bool, max_operations: usize) -> Result<Self> {
        if idr_pic_flag {
            return Ok(DecRefPicMarking::Idr {
                no_output_of_prior_pics_flag: reader.read_bit()?,
                long_term_reference_flag: reader.read_bit()?,
            });
        }

        let adaptive_ref_pic_marking_mode_flag = reader.read_bit()?;
        let mut operations = Vec::new();

        if adaptive_ref_pic_marking_mode_flag {
            loop {
                let op = match reader.read_golomb()? {
                    0 => break,
                    1 => MemoryManagementOp::MarkShortTermUnused {
                        difference_of_pic_nums_minus1: reader.read_golomb()?,
                    },
                    2 => MemoryManagementOp::MarkLongTermUnused {
                        long_term_pic_num: reader.read_golomb()?,
                    },
                    3 => MemoryManagementOp::AssignLongTermFrameIdx {
                        difference_of_pic_nums_minus1: reader.read_golomb()?,
                        long_term_frame_idx: reader.read_golomb()?,
                    },
                    4 => MemoryManagementOp::SetMaxLongTermFrameIdx {
                        max_long_term_frame_idx_plus1: reader.read_golomb()?,
                    },
                    5 => MemoryManagementOp::MarkAllUnused,
                    6 => MemoryManagementOp::MarkCurrentLongTerm {
                        long_term_frame_idx: reader.read_golomb()?,
                    },
                    code => {
                        return Err(NalError::InvalidData(format!(
                            "memory_management_control_operation {} out of range",
                            code
                        )))
                    }
                };
                if operations.len() == max_operations {
                    return Err(NalError::InvalidData(format!(
                        "more than {} memory management operations",
                        max_operations
                    )));
                }
                operations.push(op);
            }
            log::trace!("dec_ref_pic_marking operations={:?}", operations);
        }

        Ok(DecRefPicMarking::Adaptive {
            adaptive_ref_pic_marking_mode_flag,
            operations,
        })
    }

    /// Parsed for an IDR picture.
    pub fn is_idr(&self) -> bool {
        matches!(self, DecRefPicMarking::Idr { .. })
    }

    /// Marking operations; empty for IDR pictures and sliding-window mode.
    pub fn operations(&self) -> &[MemoryManagementOp] {
        match self {
            DecRefPicMarking::Idr { .. } => &[],
            DecRefPicMarking::Adaptive { operations, .. } => operations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::BitWriter;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_modification_terminator_not_stored() {
        let mut writer = BitWriter::new();
        writer.write_bit(true);
        writer.write_golomb(0);
        writer.write_golomb(4);
        writer.write_golomb(2);
        writer.write_golomb(1);
        writer.write_golomb(3);
        writer.write_trailing_bits();
        let data = writer.into_bytes();

        let mut reader = BitReader::new(&data);
        let rplm = RefPicListModification::parse(&mut reader, SliceType::P, 16).unwrap();
        assert!(rplm.ref_pic_list_modification_flag_l0);
        assert_eq!(
            rplm.modifications_l0,
            vec![
                ModificationOp::SubtractAbsDiffPicNum(4),
                ModificationOp::LongTermPicNum(1)
            ]
        );
        assert!(!rplm.ref_pic_list_modification_flag_l1);
    }

    #[test]
    fn test_list1_uses_its_own_flag() {
        // l0 flag set with one op, l1 flag clear
        let mut writer = BitWriter::new();
        writer.write_bit(true);
        writer.write_golomb(1);
        writer.write_golomb(0);
        writer.write_golomb(3);
        writer.write_bit(false);
        writer.write_trailing_bits();
        let data = writer.into_bytes();

        let mut reader = BitReader::new(&data);
        let rplm = RefPicListModification::parse(&mut reader, SliceType::B, 16).unwrap();
        assert_eq!(rplm.modifications_l0, vec![ModificationOp::AddAbsDiffPicNum(0)]);
        assert!(!rplm.ref_pic_list_modification_flag_l1);
        assert!(rplm.modifications_l1.is_empty());
        assert!(reader.read_bit().unwrap());

        // l0 clear, l1 set
        let mut writer = BitWriter::new();
        writer.write_bit(false);
        writer.write_bit(true);
        writer.write_golomb(2);
        writer.write_golomb(7);
        writer.write_golomb(3);
        writer.write_trailing_bits();
        let data = writer.into_bytes();

        let mut reader = BitReader::new(&data);
        let rplm = RefPicListModification::parse(&mut reader, SliceType::B, 16).unwrap();
        assert!(rplm.modifications_l0.is_empty());
        assert_eq!(rplm.modifications_l1, vec![ModificationOp::LongTermPicNum(7)]);
    }

    #[test]
    fn test_intra_slices_read_nothing() {
        let data = [0xFF];
        let mut reader = BitReader::new(&data);
        let rplm = RefPicListModification::parse(&mut reader, SliceType::SI, 16).unwrap();
        assert_eq!(rplm, RefPicListModification::default());
        assert_eq!(reader.bits_read(), 0);
    }

    #[test]
    fn test_unterminated_modification_loop_fails() {
        let mut writer = BitWriter::new();
        writer.write_bit(true);
        writer.write_golomb(0);
        writer.write_golomb(1);
        let data = writer.into_bytes();

        let mut reader = BitReader::new(&data);
        let err = RefPicListModification::parse(&mut reader, SliceType::P, 16).unwrap_err();
        assert!(matches!(err, NalError::TooFewBits));
        assert!(reader.first_error().is_some());
    }

    #[test]
    fn test_modification_cap() {
        let mut writer = BitWriter::new();
        writer.write_bit(true);
        for _ in 0..3 {
            writer.write_golomb(0);
            writer.write_golomb(0);
        }
        writer.write_golomb(3);
        let data = writer.into_bytes();

        let mut reader = BitReader::new(&data);
        let err = RefPicListModification::parse(&mut reader, SliceType::P, 2).unwrap_err();
        assert!(matches!(err, NalError::InvalidData(_)));
    }

    #[test]
    fn test_idr_marking() {
        let data = [0b0100_0000];
        let mut reader = BitReader::new(&data);
        let marking = DecRefPicMarking::parse(&mut reader, true, 16).unwrap();
        assert_eq!(
            marking,
            DecRefPicMarking::Idr {
                no_output_of_prior_pics_flag: false,
                long_term_reference_flag: true,
            }
        );
        assert!(marking.operations().is_empty());
    }

    #[test]
    fn test_all_memory_management_operations() {
        let mut writer = BitWriter::new();
        writer.write_bit(true);
        for v in [1, 3, 2, 9, 3, 0, 2, 4, 5, 5, 6, 1, 0] {
            writer.write_golomb(v);
        }
        writer.write_trailing_bits();
        let data = writer.into_bytes();

        let mut reader = BitReader::new(&data);
        let marking = DecRefPicMarking::parse(&mut reader, false, 16).unwrap();
        assert_eq!(
            marking.operations(),
            &[
                MemoryManagementOp::MarkShortTermUnused {
                    difference_of_pic_nums_minus1: 3
                },
                MemoryManagementOp::MarkLongTermUnused {
                    long_term_pic_num: 9
                },
                MemoryManagementOp::AssignLongTermFrameIdx {
                    difference_of_pic_nums_minus1: 0,
                    long_term_frame_idx: 2
                },
                MemoryManagementOp::SetMaxLongTermFrameIdx {
                    max_long_term_frame_idx_plus1: 5
                },
                MemoryManagementOp::MarkAllUnused,
                MemoryManagementOp::MarkCurrentLongTerm {
                    long_term_frame_idx: 1
                },
            ]
        );
        let codes: Vec<u32> = marking.operations().iter().map(|op| op.code()).collect();
        assert_eq!(codes, vec![1, 2, 3, 4, 5, 6]);
        assert!(reader.read_bit().unwrap());
    }

    #[test]
    fn test_sliding_window_marking() {
        let data = [0b0100_0000];
        let mut reader = BitReader::new(&data);
        let marking = DecRefPicMarking::parse(&mut reader, false, 16).unwrap();
        assert_eq!(
            marking,
            DecRefPicMarking::Adaptive {
                adaptive_ref_pic_marking_mode_flag: false,
                operations: vec![],
            }
        );
        assert_eq!(reader.bits_read(), 1);
    }

    #[test]
    fn test_memory_management_code_out_of_range() {
        let mut writer = BitWriter::new();
        writer.write_bit(true);
        writer.write_golomb(7);
        writer.write_trailing_bits();
        let data = writer.into_bytes();
        let mut reader = BitReader::new(&data);
        let err = DecRefPicMarking::parse(&mut reader, false, 16).unwrap_err();
        assert!(matches!(err, NalError::InvalidData(_)));
    }
}
