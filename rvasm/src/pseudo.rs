//! Pseudo-instruction expansion table (4.F): each pseudo mnemonic lowers to
//! one or two real `IcUnit`s built from already-resolved registers and the
//! raw (possibly label-valued) operand the caller parsed.

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::ic::{IcUnit, ImmOperand};
use rvcore::isa::Op;

const ZERO: u8 = 0;
const RA: u8 = 1;

fn complete(op: Op, line: u32, rd: u8, rs1: u8, rs2: u8, imm: i64) -> IcUnit {
    let mut u = IcUnit::new(op, line);
    u.rd = rd;
    u.rs1 = rs1;
    u.rs2 = rs2;
    u.imm = ImmOperand::Value(imm);
    u
}

fn branch_like(op: Op, line: u32, rs1: u8, rs2: u8, target: ImmOperand) -> IcUnit {
    let mut u = IcUnit::new(op, line);
    u.rs1 = rs1;
    u.rs2 = rs2;
    u.imm = target;
    u
}

fn jump_like(op: Op, line: u32, rd: u8, target: ImmOperand) -> IcUnit {
    let mut u = IcUnit::new(op, line);
    u.rd = rd;
    u.imm = target;
    u
}

pub fn expand_li(rd: u8, imm: i64, line: u32, source_line: &str) -> Result<Vec<IcUnit>, Diagnostic> {
    if (-2048..=2047).contains(&imm) {
        return Ok(vec![complete(Op::Addi, line, rd, ZERO, 0, imm)]);
    }
    if imm < i32::MIN as i64 || imm > i32::MAX as i64 {
        return Err(Diagnostic::new(
            line,
            1,
            source_line,
            format!("li immediate {} exceeds the supported 32-bit range", imm),
            DiagnosticKind::ImmediateOutOfRange { low: i32::MIN as i64, high: i32::MAX as i64 },
        ));
    }
    let upper = (imm + 0x800) >> 12;
    let lower = imm - (upper << 12);
    let mut lui = IcUnit::new(Op::Lui, line);
    lui.rd = rd;
    lui.imm = ImmOperand::Value(upper & 0xF_FFFF);
    let addi = complete(Op::Addi, line, rd, rd, 0, lower);
    Ok(vec![lui, addi])
}

/// Expands a pseudo-instruction given its already-classified operands.
/// `regs` holds the GP register operands in source order; `target` holds
/// a branch/jump/li operand when the pseudo takes one.
pub enum PseudoOperands {
    None,
    OneReg(u8),
    TwoReg(u8, u8),
    OneRegImm(u8, i64),
    OneRegLabel(u8, ImmOperand),
    TwoRegLabel(u8, u8, ImmOperand),
    Label(ImmOperand),
}

pub fn expand(
    name: &str,
    operands: PseudoOperands,
    line: u32,
    source_line: &str,
) -> Result<Vec<IcUnit>, Diagnostic> {
    use PseudoOperands::*;
    match (name, operands) {
        ("nop", None) => Ok(vec![complete(Op::Addi, line, ZERO, ZERO, 0, 0)]),
        ("li", OneRegImm(rd, imm)) => expand_li(rd, imm, line, source_line),
        ("mv", TwoReg(rd, rs)) => Ok(vec![complete(Op::Add, line, rd, rs, ZERO, 0)]),
        ("not", TwoReg(rd, rs)) => Ok(vec![complete(Op::Xori, line, rd, rs, 0, -1)]),
        ("neg", TwoReg(rd, rs)) => Ok(vec![complete(Op::Sub, line, rd, ZERO, rs, 0)]),
        ("seqz", TwoReg(rd, rs)) => Ok(vec![complete(Op::Sltiu, line, rd, rs, 0, 1)]),
        ("snez", TwoReg(rd, rs)) => Ok(vec![complete(Op::Sltu, line, rd, ZERO, rs, 0)]),
        ("sltz", TwoReg(rd, rs)) => Ok(vec![complete(Op::Slt, line, rd, rs, ZERO, 0)]),
        ("sgtz", TwoReg(rd, rs)) => Ok(vec![complete(Op::Slt, line, rd, ZERO, rs, 0)]),

        ("beqz", OneRegLabel(rs, target)) => Ok(vec![branch_like(Op::Beq, line, rs, ZERO, target)]),
        ("bnez", OneRegLabel(rs, target)) => Ok(vec![branch_like(Op::Bne, line, rs, ZERO, target)]),
        ("blez", OneRegLabel(rs, target)) => Ok(vec![branch_like(Op::Bge, line, ZERO, rs, target)]),
        ("bgez", OneRegLabel(rs, target)) => Ok(vec![branch_like(Op::Bge, line, rs, ZERO, target)]),
        ("bltz", OneRegLabel(rs, target)) => Ok(vec![branch_like(Op::Blt, line, rs, ZERO, target)]),
        ("bgtz", OneRegLabel(rs, target)) => Ok(vec![branch_like(Op::Blt, line, ZERO, rs, target)]),

        ("bgt", TwoRegLabel(rs, rt, target)) => Ok(vec![branch_like(Op::Blt, line, rt, rs, target)]),
        ("ble", TwoRegLabel(rs, rt, target)) => Ok(vec![branch_like(Op::Bge, line, rt, rs, target)]),
        ("bgtu", TwoRegLabel(rs, rt, target)) => Ok(vec![branch_like(Op::Bltu, line, rt, rs, target)]),
        ("bleu", TwoRegLabel(rs, rt, target)) => Ok(vec![branch_like(Op::Bgeu, line, rt, rs, target)]),

        ("j", Label(target)) => Ok(vec![jump_like(Op::Jal, line, ZERO, target)]),
        ("tail", Label(target)) => Ok(vec![jump_like(Op::Jal, line, ZERO, target)]),
        ("call", Label(target)) => Ok(vec![jump_like(Op::Jal, line, RA, target)]),

        ("jr", OneReg(rs)) => Ok(vec![complete(Op::Jalr, line, ZERO, rs, 0, 0)]),
        ("ret", None) => Ok(vec![complete(Op::Jalr, line, ZERO, RA, 0, 0)]),

        ("la", _) => Err(Diagnostic::new(
            line,
            1,
            source_line,
            "`la` is not supported: whether it should expand to an absolute lui+addi or a \
             position-independent auipc+addi sequence is an open question",
            DiagnosticKind::UnexpectedOperand,
        )),

        (other, _) => Err(Diagnostic::new(
            line,
            1,
            source_line,
            format!("'{}' operands do not match any known shape for this pseudo-instruction", other),
            DiagnosticKind::Syntax { expected: vec![] },
        )),
    }
}
