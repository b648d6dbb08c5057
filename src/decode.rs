//! Control/decode unit (4.G): maps a 32-bit instruction word to its `Op`
//! plus every field the execution driver needs to carry it out.
//!
//! Grounded on the bit layouts `instructions.h` encodes (opcode groups,
//! funct3/funct5/funct7/funct2 discriminators) and on 4.F's "Emission"
//! table for how the I/S/B/U/J/R/R4 immediate formats are packed.

use crate::constants::*;
use crate::isa::{op_from_fields, Op};

#[derive(Clone, Copy, Debug)]
pub struct Decoded {
    pub op: Op,
    pub rd: u8,
    pub rs1: u8,
    pub rs2: u8,
    pub rs3: u8,
    /// Sign- or zero-extended immediate, format-dependent (I/S/B/U/J); 0
    /// for R-type and R4-type words, which carry no immediate.
    pub imm: i64,
    /// 3-bit rounding-mode / CSR-immediate field (bits [14:12]).
    pub rm: u8,
    /// 12-bit CSR address (bits [31:20]), meaningful only for the CSR ops.
    pub csr: u16,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("word {0:#010x} does not match any known opcode/funct combination")]
    UnknownInstruction(u32),
}

fn bits(word: u32, hi: u32, lo: u32) -> u32 {
    (word >> lo) & ((1u32 << (hi - lo + 1)) - 1)
}

fn sext(value: u32, width: u32) -> i64 {
    let shift = 32 - width;
    ((value << shift) as i32 >> shift) as i64
}

pub fn decode(word: u32) -> Result<Decoded, DecodeError> {
    let opcode = bits(word, 6, 0);
    let rd = bits(word, 11, 7) as u8;
    let funct3 = bits(word, 14, 12);
    let rs1 = bits(word, 19, 15) as u8;
    let rs2 = bits(word, 24, 20) as u8;
    let funct7 = bits(word, 31, 25);
    let funct2 = bits(word, 26, 25);
    let rs3 = bits(word, 31, 27) as u8;

    // `op_from_fields` only compares a field when that `Op`'s encoding
    // marks it meaningful, so it's safe to hand it every raw field
    // unconditionally: the rs2/funct3 bits that double as a constant
    // discriminator (FCVT's rs2, the FP family's rm) are ignored by
    // every encoding that doesn't declare them.
    let op = op_from_fields(opcode, Some(funct2), Some(funct3), Some(rs2), Some(funct7))
        .ok_or(DecodeError::UnknownInstruction(word))?;

    let imm = immediate_for(op, word);

    Ok(Decoded {
        op,
        rd,
        rs1,
        rs2,
        rs3,
        imm,
        rm: funct3 as u8,
        csr: bits(word, 31, 20) as u16,
    })
}

fn immediate_for(op: Op, word: u32) -> i64 {
    use Op::*;
    match op {
        Addi | Xori | Ori | Andi | Slti | Sltiu | Addiw
        | Lb | Lh | Lw | Ld | Lbu | Lhu | Lwu | Jalr
        | Flw | Fld | Csrrw | Csrrs | Csrrc | Csrrwi | Csrrsi | Csrrci => {
            sext(bits(word, 31, 20), 12)
        }
        Slli | Srli | Srai => bits(word, 24, 20) as i64,
        Slliw | Srliw | Sraiw => bits(word, 24, 20) as i64,
        Sb | Sh | Sw | Sd | Fsw | Fsd => {
            let hi = bits(word, 31, 25);
            let lo = bits(word, 11, 7);
            sext((hi << 5) | lo, 12)
        }
        Beq | Bne | Blt | Bge | Bltu | Bgeu => {
            let b12 = bits(word, 31, 31);
            let b11 = bits(word, 7, 7);
            let b10_5 = bits(word, 30, 25);
            let b4_1 = bits(word, 11, 8);
            let packed = (b12 << 12) | (b11 << 11) | (b10_5 << 5) | (b4_1 << 1);
            sext(packed, 13)
        }
        Lui | Auipc => (bits(word, 31, 12) << 12) as i64,
        Jal => {
            let b20 = bits(word, 31, 31);
            let b19_12 = bits(word, 19, 12);
            let b11 = bits(word, 20, 20);
            let b10_1 = bits(word, 30, 21);
            let packed = (b20 << 20) | (b19_12 << 12) | (b11 << 11) | (b10_1 << 1);
            sext(packed, 21)
        }
        _ => 0,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::isa::encoding;

    fn encode_r(op: Op, rd: u8, rs1: u8, rs2: u8) -> u32 {
        let e = encoding(op);
        (e.funct7.unwrap() << 25)
            | ((rs2 as u32) << 20)
            | ((rs1 as u32) << 15)
            | (e.funct3.unwrap() << 12)
            | ((rd as u32) << 7)
            | e.opcode
    }

    #[test]
    fn decodes_r_type_add() {
        let word = encode_r(Op::Add, 1, 2, 3);
        let d = decode(word).unwrap();
        assert_eq!(d.op, Op::Add);
        assert_eq!(d.rd, 1);
        assert_eq!(d.rs1, 2);
        assert_eq!(d.rs2, 3);
    }

    #[test]
    fn decodes_sub_vs_add_by_funct7() {
        let word = encode_r(Op::Sub, 1, 2, 3);
        assert_eq!(decode(word).unwrap().op, Op::Sub);
    }

    #[test]
    fn decodes_i_type_immediate_sign_extends() {
        let e = encoding(Op::Addi);
        let word = (0xFFFu32 << 20) | (5 << 15) | (e.funct3.unwrap() << 12) | (1 << 7) | e.opcode;
        let d = decode(word).unwrap();
        assert_eq!(d.op, Op::Addi);
        assert_eq!(d.imm, -1);
    }

    #[test]
    fn decodes_branch_offset() {
        let e = encoding(Op::Beq);
        // imm = -8: b12=1,b11=1,b10_5=111111,b4_1=1100
        let word = (1 << 31) | (0b111111 << 25) | (2 << 20) | (1 << 15)
            | (e.funct3.unwrap() << 12) | (0b1100 << 8) | (1 << 7) | e.opcode;
        let d = decode(word).unwrap();
        assert_eq!(d.op, Op::Beq);
        assert_eq!(d.imm, -8);
    }

    #[test]
    fn decodes_fadd_s_not_fadd_d() {
        let e = encoding(Op::FaddS);
        let word = (e.funct7.unwrap() << 25) | (2 << 20) | (1 << 15) | (0 << 12) | (1 << 7) | e.opcode;
        let d = decode(word).unwrap();
        assert_eq!(d.op, Op::FaddS);
    }

    #[test]
    fn decodes_fcvt_w_s_by_funct5_rs2_field() {
        let e = encoding(Op::FcvtWS);
        let word = (e.funct7.unwrap() << 25) | (e.funct5.unwrap() << 20) | (1 << 15) | (0 << 12) | (1 << 7) | e.opcode;
        let d = decode(word).unwrap();
        assert_eq!(d.op, Op::FcvtWS);
    }

    #[test]
    fn unknown_combination_is_an_error() {
        assert!(decode(0b1111111_00000_00000_111_00000_1111111).is_err());
    }
}
