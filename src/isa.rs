//! Instruction encoding tables (4.A): for every supported mnemonic, its
//! opcode/funct fields and its canonical assembly mnemonic. Parser, encoder
//! and decoder all consult this module as the single source of truth.
//!
//! Grounded on `instructions.h`'s `Instruction` enum and
//! `compiletime_instruction_encoding_array`: same mnemonic set, same
//! opcode/funct3/funct5/funct7/funct2 values, re-expressed as a Rust `match`
//! over a dense enum rather than a `constexpr std::array` scanned linearly.

use crate::constants::*;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Op {
    Add, Sub, Sll, Slt, Sltu, Xor, Srl, Sra, Or, And,
    Addw, Subw, Sllw, Srlw, Sraw,
    Mul, Mulh, Mulhsu, Mulhu, Div, Divu, Rem, Remu,
    Mulw, Divw, Divuw, Remw, Remuw,

    Addi, Xori, Ori, Andi, Slli, Srli, Srai, Slti, Sltiu,
    Addiw, Slliw, Srliw, Sraiw,

    Lb, Lh, Lw, Ld, Lbu, Lhu, Lwu,
    Sb, Sh, Sw, Sd,

    Beq, Bne, Blt, Bge, Bltu, Bgeu,

    Lui, Auipc,
    Jal, Jalr,
    Ecall,

    Csrrw, Csrrs, Csrrc, Csrrwi, Csrrsi, Csrrci,

    Flw, Fsw,
    FmaddS, FmsubS, FnmsubS, FnmaddS,
    FaddS, FsubS, FmulS, FdivS, FsqrtS,
    FsgnjS, FsgnjnS, FsgnjxS, FminS, FmaxS,
    FcvtWS, FcvtWuS, FmvXW, FmvWX,
    FeqS, FltS, FleS, FclassS,
    FcvtSW, FcvtSWu, FcvtLS, FcvtLuS, FcvtSL, FcvtSLu,

    Fld, Fsd,
    FmaddD, FmsubD, FnmsubD, FnmaddD,
    FaddD, FsubD, FmulD, FdivD, FsqrtD,
    FsgnjD, FsgnjnD, FsgnjxD, FminD, FmaxD,
    FcvtSD, FcvtDS,
    FeqD, FltD, FleD, FclassD,
    FcvtWD, FcvtWuD, FcvtDW, FcvtDWu,
    FcvtLD, FcvtLuD, FmvXD, FcvtDL, FcvtDLu, FmvDX,
}

/// Opcode/funct fields for one mnemonic. `None` marks a field the format
/// does not use, mirroring the `-1` sentinels in `InstructionEncoding`.
#[derive(Clone, Copy, Debug)]
pub struct Encoding {
    pub opcode: u32,
    pub funct2: Option<u32>,
    pub funct3: Option<u32>,
    pub funct5: Option<u32>,
    pub funct7: Option<u32>,
}

const fn enc(opcode: u32, funct2: Option<u32>, funct3: Option<u32>, funct5: Option<u32>, funct7: Option<u32>) -> Encoding {
    Encoding { opcode, funct2, funct3, funct5, funct7 }
}

pub fn encoding(op: Op) -> Encoding {
    use Op::*;
    match op {
        Add => enc(OPCODE_RTYPE, None, Some(0b000), None, Some(0b0000000)),
        Sub => enc(OPCODE_RTYPE, None, Some(0b000), None, Some(0b0100000)),
        Sll => enc(OPCODE_RTYPE, None, Some(0b001), None, Some(0b0000000)),
        Slt => enc(OPCODE_RTYPE, None, Some(0b010), None, Some(0b0000000)),
        Sltu => enc(OPCODE_RTYPE, None, Some(0b011), None, Some(0b0000000)),
        Xor => enc(OPCODE_RTYPE, None, Some(0b100), None, Some(0b0000000)),
        Srl => enc(OPCODE_RTYPE, None, Some(0b101), None, Some(0b0000000)),
        Sra => enc(OPCODE_RTYPE, None, Some(0b101), None, Some(0b0100000)),
        Or => enc(OPCODE_RTYPE, None, Some(0b110), None, Some(0b0000000)),
        And => enc(OPCODE_RTYPE, None, Some(0b111), None, Some(0b0000000)),

        Mul => enc(OPCODE_RTYPE, None, Some(0b000), None, Some(0b0000001)),
        Mulh => enc(OPCODE_RTYPE, None, Some(0b001), None, Some(0b0000001)),
        Mulhsu => enc(OPCODE_RTYPE, None, Some(0b010), None, Some(0b0000001)),
        Mulhu => enc(OPCODE_RTYPE, None, Some(0b011), None, Some(0b0000001)),
        Div => enc(OPCODE_RTYPE, None, Some(0b100), None, Some(0b0000001)),
        Divu => enc(OPCODE_RTYPE, None, Some(0b101), None, Some(0b0000001)),
        Rem => enc(OPCODE_RTYPE, None, Some(0b110), None, Some(0b0000001)),
        Remu => enc(OPCODE_RTYPE, None, Some(0b111), None, Some(0b0000001)),

        Addw => enc(OPCODE_RTYPE_W, None, Some(0b000), None, Some(0b0000000)),
        Subw => enc(OPCODE_RTYPE_W, None, Some(0b000), None, Some(0b0100000)),
        Sllw => enc(OPCODE_RTYPE_W, None, Some(0b001), None, Some(0b0000000)),
        Srlw => enc(OPCODE_RTYPE_W, None, Some(0b101), None, Some(0b0000000)),
        Sraw => enc(OPCODE_RTYPE_W, None, Some(0b101), None, Some(0b0100000)),
        Mulw => enc(OPCODE_RTYPE_W, None, Some(0b000), None, Some(0b0000001)),
        Divw => enc(OPCODE_RTYPE_W, None, Some(0b100), None, Some(0b0000001)),
        Divuw => enc(OPCODE_RTYPE_W, None, Some(0b101), None, Some(0b0000001)),
        Remw => enc(OPCODE_RTYPE_W, None, Some(0b110), None, Some(0b0000001)),
        Remuw => enc(OPCODE_RTYPE_W, None, Some(0b111), None, Some(0b0000001)),

        Ecall => enc(OPCODE_SYSTEM, None, Some(0b000), None, Some(0b0000000)),

        Addi => enc(OPCODE_ITYPE, None, Some(0b000), None, None),
        Slli => enc(OPCODE_ITYPE, None, Some(0b001), None, Some(0b0000000)),
        Slti => enc(OPCODE_ITYPE, None, Some(0b010), None, None),
        Sltiu => enc(OPCODE_ITYPE, None, Some(0b011), None, None),
        Xori => enc(OPCODE_ITYPE, None, Some(0b100), None, None),
        Srli => enc(OPCODE_ITYPE, None, Some(0b101), None, Some(0b0000000)),
        Srai => enc(OPCODE_ITYPE, None, Some(0b101), None, Some(0b0100000)),
        Ori => enc(OPCODE_ITYPE, None, Some(0b110), None, None),
        Andi => enc(OPCODE_ITYPE, None, Some(0b111), None, None),

        Addiw => enc(OPCODE_ITYPE_W, None, Some(0b000), None, None),
        Slliw => enc(OPCODE_ITYPE_W, None, Some(0b001), None, Some(0b0000000)),
        Srliw => enc(OPCODE_ITYPE_W, None, Some(0b101), None, Some(0b0000000)),
        Sraiw => enc(OPCODE_ITYPE_W, None, Some(0b101), None, Some(0b0100000)),

        Lb => enc(OPCODE_LOAD, None, Some(0b000), None, None),
        Lh => enc(OPCODE_LOAD, None, Some(0b001), None, None),
        Lw => enc(OPCODE_LOAD, None, Some(0b010), None, None),
        Ld => enc(OPCODE_LOAD, None, Some(0b011), None, None),
        Lbu => enc(OPCODE_LOAD, None, Some(0b100), None, None),
        Lhu => enc(OPCODE_LOAD, None, Some(0b101), None, None),
        Lwu => enc(OPCODE_LOAD, None, Some(0b110), None, None),

        Jalr => enc(OPCODE_JALR, None, Some(0b000), None, None),

        Sb => enc(OPCODE_STORE, None, Some(0b000), None, None),
        Sh => enc(OPCODE_STORE, None, Some(0b001), None, None),
        Sw => enc(OPCODE_STORE, None, Some(0b010), None, None),
        Sd => enc(OPCODE_STORE, None, Some(0b011), None, None),

        Beq => enc(OPCODE_BRANCH, None, Some(0b000), None, None),
        Bne => enc(OPCODE_BRANCH, None, Some(0b001), None, None),
        Blt => enc(OPCODE_BRANCH, None, Some(0b100), None, None),
        Bge => enc(OPCODE_BRANCH, None, Some(0b101), None, None),
        Bltu => enc(OPCODE_BRANCH, None, Some(0b110), None, None),
        Bgeu => enc(OPCODE_BRANCH, None, Some(0b111), None, None),

        Lui => enc(OPCODE_LUI, None, None, None, None),
        Auipc => enc(OPCODE_AUIPC, None, None, None, None),
        Jal => enc(OPCODE_JAL, None, None, None, None),

        Csrrw => enc(OPCODE_SYSTEM, None, Some(0b001), None, None),
        Csrrs => enc(OPCODE_SYSTEM, None, Some(0b010), None, None),
        Csrrc => enc(OPCODE_SYSTEM, None, Some(0b011), None, None),
        Csrrwi => enc(OPCODE_SYSTEM, None, Some(0b101), None, None),
        Csrrsi => enc(OPCODE_SYSTEM, None, Some(0b110), None, None),
        Csrrci => enc(OPCODE_SYSTEM, None, Some(0b111), None, None),

        FsgnjS => enc(OPCODE_FP, None, Some(0b000), None, Some(0b0010000)),
        FsgnjnS => enc(OPCODE_FP, None, Some(0b001), None, Some(0b0010000)),
        FsgnjxS => enc(OPCODE_FP, None, Some(0b010), None, Some(0b0010000)),
        FminS => enc(OPCODE_FP, None, Some(0b000), None, Some(0b0010100)),
        FmaxS => enc(OPCODE_FP, None, Some(0b001), None, Some(0b0010100)),
        FleS => enc(OPCODE_FP, None, Some(0b000), None, Some(0b1010000)),
        FltS => enc(OPCODE_FP, None, Some(0b001), None, Some(0b1010000)),
        FeqS => enc(OPCODE_FP, None, Some(0b010), None, Some(0b1010000)),

        FsgnjD => enc(OPCODE_FP, None, Some(0b000), None, Some(0b0010001)),
        FsgnjnD => enc(OPCODE_FP, None, Some(0b001), None, Some(0b0010001)),
        FsgnjxD => enc(OPCODE_FP, None, Some(0b010), None, Some(0b0010001)),
        FminD => enc(OPCODE_FP, None, Some(0b000), None, Some(0b0010101)),
        FmaxD => enc(OPCODE_FP, None, Some(0b001), None, Some(0b0010101)),
        FleD => enc(OPCODE_FP, None, Some(0b000), None, Some(0b1010001)),
        FltD => enc(OPCODE_FP, None, Some(0b001), None, Some(0b1010001)),
        FeqD => enc(OPCODE_FP, None, Some(0b010), None, Some(0b1010001)),

        Flw => enc(OPCODE_FLOAD, None, Some(0b010), None, None),
        Fsw => enc(OPCODE_FSTORE, None, Some(0b010), None, None),
        Fld => enc(OPCODE_FLOAD, None, Some(0b011), None, None),
        Fsd => enc(OPCODE_FSTORE, None, Some(0b011), None, None),

        FaddS => enc(OPCODE_FP, None, None, None, Some(0b0000000)),
        FsubS => enc(OPCODE_FP, None, None, None, Some(0b0000100)),
        FmulS => enc(OPCODE_FP, None, None, None, Some(0b0001000)),
        FdivS => enc(OPCODE_FP, None, None, None, Some(0b0001100)),

        FaddD => enc(OPCODE_FP, None, None, None, Some(0b0000001)),
        FsubD => enc(OPCODE_FP, None, None, None, Some(0b0000101)),
        FmulD => enc(OPCODE_FP, None, None, None, Some(0b0001001)),
        FdivD => enc(OPCODE_FP, None, None, None, Some(0b0001101)),

        FsqrtS => enc(OPCODE_FP, None, None, Some(0b00000), Some(0b0101100)),
        FcvtWS => enc(OPCODE_FP, None, None, Some(0b00000), Some(0b1100000)),
        FcvtWuS => enc(OPCODE_FP, None, None, Some(0b00001), Some(0b1100000)),
        FcvtLS => enc(OPCODE_FP, None, None, Some(0b00010), Some(0b1100000)),
        FcvtLuS => enc(OPCODE_FP, None, None, Some(0b00011), Some(0b1100000)),
        FcvtSW => enc(OPCODE_FP, None, None, Some(0b00000), Some(0b1101000)),
        FcvtSWu => enc(OPCODE_FP, None, None, Some(0b00001), Some(0b1101000)),
        FcvtSL => enc(OPCODE_FP, None, None, Some(0b00010), Some(0b1101000)),
        FcvtSLu => enc(OPCODE_FP, None, None, Some(0b00011), Some(0b1101000)),

        FsqrtD => enc(OPCODE_FP, None, None, Some(0b00000), Some(0b0101101)),
        FcvtWD => enc(OPCODE_FP, None, None, Some(0b00000), Some(0b1100001)),
        FcvtWuD => enc(OPCODE_FP, None, None, Some(0b00001), Some(0b1100001)),
        FcvtLD => enc(OPCODE_FP, None, None, Some(0b00010), Some(0b1100001)),
        FcvtLuD => enc(OPCODE_FP, None, None, Some(0b00011), Some(0b1100001)),
        FcvtDW => enc(OPCODE_FP, None, None, Some(0b00000), Some(0b1101001)),
        FcvtDWu => enc(OPCODE_FP, None, None, Some(0b00001), Some(0b1101001)),
        FcvtDL => enc(OPCODE_FP, None, None, Some(0b00010), Some(0b1101001)),
        FcvtDLu => enc(OPCODE_FP, None, None, Some(0b00011), Some(0b1101001)),

        FcvtSD => enc(OPCODE_FP, None, None, Some(0b00001), Some(0b0100000)),
        FcvtDS => enc(OPCODE_FP, None, None, Some(0b00000), Some(0b0100001)),

        FmvXW => enc(OPCODE_FP, None, Some(0b000), Some(0b00000), Some(0b1110000)),
        FmvXD => enc(OPCODE_FP, None, Some(0b000), Some(0b00000), Some(0b1110001)),
        FmvWX => enc(OPCODE_FP, None, Some(0b000), Some(0b00000), Some(0b1111000)),
        FmvDX => enc(OPCODE_FP, None, Some(0b000), Some(0b00000), Some(0b1111001)),
        FclassS => enc(OPCODE_FP, None, Some(0b001), Some(0b00000), Some(0b1110000)),
        FclassD => enc(OPCODE_FP, None, Some(0b001), Some(0b00000), Some(0b1110001)),

        FmaddS => enc(OPCODE_FMADD, Some(0b00), None, None, None),
        FmsubS => enc(OPCODE_FMSUB, Some(0b00), None, None, None),
        FnmsubS => enc(OPCODE_FNMSUB, Some(0b00), None, None, None),
        FnmaddS => enc(OPCODE_FNMADD, Some(0b00), None, None, None),
        FmaddD => enc(OPCODE_FMADD, Some(0b01), None, None, None),
        FmsubD => enc(OPCODE_FMSUB, Some(0b01), None, None, None),
        FnmsubD => enc(OPCODE_FNMSUB, Some(0b01), None, None, None),
        FnmaddD => enc(OPCODE_FNMADD, Some(0b01), None, None, None),
    }
}

/// Canonical assembler mnemonic for a real (non-pseudo) instruction.
pub fn mnemonic(op: Op) -> &'static str {
    use Op::*;
    match op {
        Add => "add", Sub => "sub", Sll => "sll", Slt => "slt", Sltu => "sltu",
        Xor => "xor", Srl => "srl", Sra => "sra", Or => "or", And => "and",
        Addw => "addw", Subw => "subw", Sllw => "sllw", Srlw => "srlw", Sraw => "sraw",
        Mul => "mul", Mulh => "mulh", Mulhsu => "mulhsu", Mulhu => "mulhu",
        Div => "div", Divu => "divu", Rem => "rem", Remu => "remu",
        Mulw => "mulw", Divw => "divw", Divuw => "divuw", Remw => "remw", Remuw => "remuw",
        Addi => "addi", Xori => "xori", Ori => "ori", Andi => "andi",
        Slli => "slli", Srli => "srli", Srai => "srai", Slti => "slti", Sltiu => "sltiu",
        Addiw => "addiw", Slliw => "slliw", Srliw => "srliw", Sraiw => "sraiw",
        Lb => "lb", Lh => "lh", Lw => "lw", Ld => "ld", Lbu => "lbu", Lhu => "lhu", Lwu => "lwu",
        Sb => "sb", Sh => "sh", Sw => "sw", Sd => "sd",
        Beq => "beq", Bne => "bne", Blt => "blt", Bge => "bge", Bltu => "bltu", Bgeu => "bgeu",
        Lui => "lui", Auipc => "auipc", Jal => "jal", Jalr => "jalr", Ecall => "ecall",
        Csrrw => "csrrw", Csrrs => "csrrs", Csrrc => "csrrc",
        Csrrwi => "csrrwi", Csrrsi => "csrrsi", Csrrci => "csrrci",
        Flw => "flw", Fsw => "fsw",
        FmaddS => "fmadd.s", FmsubS => "fmsub.s", FnmsubS => "fnmsub.s", FnmaddS => "fnmadd.s",
        FaddS => "fadd.s", FsubS => "fsub.s", FmulS => "fmul.s", FdivS => "fdiv.s", FsqrtS => "fsqrt.s",
        FsgnjS => "fsgnj.s", FsgnjnS => "fsgnjn.s", FsgnjxS => "fsgnjx.s",
        FminS => "fmin.s", FmaxS => "fmax.s",
        FcvtWS => "fcvt.w.s", FcvtWuS => "fcvt.wu.s", FmvXW => "fmv.x.w", FmvWX => "fmv.w.x",
        FeqS => "feq.s", FltS => "flt.s", FleS => "fle.s", FclassS => "fclass.s",
        FcvtSW => "fcvt.s.w", FcvtSWu => "fcvt.s.wu", FcvtLS => "fcvt.l.s", FcvtLuS => "fcvt.lu.s",
        FcvtSL => "fcvt.s.l", FcvtSLu => "fcvt.s.lu",
        Fld => "fld", Fsd => "fsd",
        FmaddD => "fmadd.d", FmsubD => "fmsub.d", FnmsubD => "fnmsub.d", FnmaddD => "fnmadd.d",
        FaddD => "fadd.d", FsubD => "fsub.d", FmulD => "fmul.d", FdivD => "fdiv.d", FsqrtD => "fsqrt.d",
        FsgnjD => "fsgnj.d", FsgnjnD => "fsgnjn.d", FsgnjxD => "fsgnjx.d",
        FminD => "fmin.d", FmaxD => "fmax.d",
        FcvtSD => "fcvt.s.d", FcvtDS => "fcvt.d.s",
        FeqD => "feq.d", FltD => "flt.d", FleD => "fle.d", FclassD => "fclass.d",
        FcvtWD => "fcvt.w.d", FcvtWuD => "fcvt.wu.d", FcvtDW => "fcvt.d.w", FcvtDWu => "fcvt.d.wu",
        FcvtLD => "fcvt.l.d", FcvtLuD => "fcvt.lu.d", FmvXD => "fmv.x.d",
        FcvtDL => "fcvt.d.l", FcvtDLu => "fcvt.d.lu", FmvDX => "fmv.d.x",
    }
}

/// All real (non-pseudo) mnemonics, for building the lexer's opcode set and
/// the parser's mnemonic→`Op` lookup table.
pub const ALL_OPS: &[Op] = {
    use Op::*;
    &[
        Add, Sub, Sll, Slt, Sltu, Xor, Srl, Sra, Or, And,
        Addw, Subw, Sllw, Srlw, Sraw,
        Mul, Mulh, Mulhsu, Mulhu, Div, Divu, Rem, Remu,
        Mulw, Divw, Divuw, Remw, Remuw,
        Addi, Xori, Ori, Andi, Slli, Srli, Srai, Slti, Sltiu,
        Addiw, Slliw, Srliw, Sraiw,
        Lb, Lh, Lw, Ld, Lbu, Lhu, Lwu,
        Sb, Sh, Sw, Sd,
        Beq, Bne, Blt, Bge, Bltu, Bgeu,
        Lui, Auipc, Jal, Jalr, Ecall,
        Csrrw, Csrrs, Csrrc, Csrrwi, Csrrsi, Csrrci,
        Flw, Fsw,
        FmaddS, FmsubS, FnmsubS, FnmaddS,
        FaddS, FsubS, FmulS, FdivS, FsqrtS,
        FsgnjS, FsgnjnS, FsgnjxS, FminS, FmaxS,
        FcvtWS, FcvtWuS, FmvXW, FmvWX,
        FeqS, FltS, FleS, FclassS,
        FcvtSW, FcvtSWu, FcvtLS, FcvtLuS, FcvtSL, FcvtSLu,
        Fld, Fsd,
        FmaddD, FmsubD, FnmsubD, FnmaddD,
        FaddD, FsubD, FmulD, FdivD, FsqrtD,
        FsgnjD, FsgnjnD, FsgnjxD, FminD, FmaxD,
        FcvtSD, FcvtDS,
        FeqD, FltD, FleD, FclassD,
        FcvtWD, FcvtWuD, FcvtDW, FcvtDWu,
        FcvtLD, FcvtLuD, FmvXD, FcvtDL, FcvtDLu, FmvDX,
    ]
};

pub fn op_from_mnemonic(s: &str) -> Option<Op> {
    ALL_OPS.iter().copied().find(|&op| mnemonic(op) == s)
}

/// Reverse lookup used by the decoder: given the raw field values pulled
/// out of a 32-bit word, finds the one `Op` whose encoding's `Some`
/// fields all agree. Fields the instruction's encoding leaves `None` are
/// don't-cares (they may be an immediate, a rounding mode, or anything
/// else occupying those bit positions).
pub fn op_from_fields(
    opcode: u32,
    funct2: Option<u32>,
    funct3: Option<u32>,
    funct5: Option<u32>,
    funct7: Option<u32>,
) -> Option<Op> {
    fn agrees(expected: Option<u32>, actual: Option<u32>) -> bool {
        match expected {
            None => true,
            Some(e) => actual == Some(e),
        }
    }
    ALL_OPS.iter().copied().find(|&op| {
        let e = encoding(op);
        e.opcode == opcode
            && agrees(e.funct2, funct2)
            && agrees(e.funct3, funct3)
            && agrees(e.funct5, funct5)
            && agrees(e.funct7, funct7)
    })
}

/// ABI register name → GPR index, grounded on the standard RISC-V calling
/// convention (`zero`,`ra`,`sp`,`gp`,`tp`,`t0-2`,`s0/fp`,`s1`,`a0-7`,
/// `s2-11`,`t3-6`) plus numeric `x0`..`x31` forms.
pub fn resolve_gpr_name(name: &str) -> Option<u8> {
    if let Some(rest) = name.strip_prefix('x') {
        if let Ok(n) = rest.parse::<u8>() {
            if (n as usize) < NUM_GPR {
                return Some(n);
            }
        }
        return None;
    }
    let idx = match name {
        "zero" => 0, "ra" => 1, "sp" => 2, "gp" => 3, "tp" => 4,
        "t0" => 5, "t1" => 6, "t2" => 7,
        "s0" | "fp" => 8, "s1" => 9,
        "a0" => 10, "a1" => 11, "a2" => 12, "a3" => 13, "a4" => 14,
        "a5" => 15, "a6" => 16, "a7" => 17,
        "s2" => 18, "s3" => 19, "s4" => 20, "s5" => 21, "s6" => 22,
        "s7" => 23, "s8" => 24, "s9" => 25, "s10" => 26, "s11" => 27,
        "t3" => 28, "t4" => 29, "t5" => 30, "t6" => 31,
        _ => return None,
    };
    Some(idx)
}

/// ABI register name → FPR index (`ft0-7`,`fs0-1`,`fa0-7`,`fs2-11`,`ft8-11`,
/// plus numeric `f0`..`f31`).
pub fn resolve_fpr_name(name: &str) -> Option<u8> {
    if let Some(rest) = name.strip_prefix('f') {
        if let Ok(n) = rest.parse::<u8>() {
            if (n as usize) < NUM_FPR {
                return Some(n);
            }
        }
    }
    let idx = match name {
        "ft0" => 0, "ft1" => 1, "ft2" => 2, "ft3" => 3, "ft4" => 4,
        "ft5" => 5, "ft6" => 6, "ft7" => 7,
        "fs0" => 8, "fs1" => 9,
        "fa0" => 10, "fa1" => 11, "fa2" => 12, "fa3" => 13, "fa4" => 14,
        "fa5" => 15, "fa6" => 16, "fa7" => 17,
        "fs2" => 18, "fs3" => 19, "fs4" => 20, "fs5" => 21, "fs6" => 22,
        "fs7" => 23, "fs8" => 24, "fs9" => 25, "fs10" => 26, "fs11" => 27,
        "ft8" => 28, "ft9" => 29, "ft10" => 30, "ft11" => 31,
        _ => return None,
    };
    Some(idx)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trips_every_real_mnemonic() {
        for &op in ALL_OPS {
            let name = mnemonic(op);
            assert_eq!(op_from_mnemonic(name), Some(op), "mnemonic {}", name);
        }
    }

    #[test]
    fn encoding_matches_known_opcodes() {
        assert_eq!(encoding(Op::Add).opcode, OPCODE_RTYPE);
        assert_eq!(encoding(Op::Add).funct7, Some(0b0000000));
        assert_eq!(encoding(Op::Sub).funct7, Some(0b0100000));
        assert_eq!(encoding(Op::Mul).funct7, Some(0b0000001));
        assert_eq!(encoding(Op::FaddS).funct7, Some(0b0000000));
        assert_eq!(encoding(Op::FaddD).funct7, Some(0b0000001));
    }

    #[test]
    fn gpr_aliases_resolve() {
        assert_eq!(resolve_gpr_name("zero"), Some(0));
        assert_eq!(resolve_gpr_name("ra"), Some(1));
        assert_eq!(resolve_gpr_name("sp"), Some(2));
        assert_eq!(resolve_gpr_name("a0"), Some(10));
        assert_eq!(resolve_gpr_name("x10"), Some(10));
        assert_eq!(resolve_gpr_name("t6"), Some(31));
        assert_eq!(resolve_gpr_name("x32"), None);
    }

    #[test]
    fn op_from_fields_round_trips_every_encoding() {
        for &op in ALL_OPS {
            let e = encoding(op);
            assert_eq!(
                op_from_fields(e.opcode, e.funct2, e.funct3, e.funct5, e.funct7),
                Some(op),
                "op {:?}",
                op
            );
        }
    }

    #[test]
    fn fpr_aliases_resolve() {
        assert_eq!(resolve_fpr_name("ft0"), Some(0));
        assert_eq!(resolve_fpr_name("fa0"), Some(10));
        assert_eq!(resolve_fpr_name("f31"), Some(31));
        assert_eq!(resolve_fpr_name("f32"), None);
    }
}
