//! Directive-driven parser & intermediate-code emitter (4.F): drives the
//! lexer one line at a time, matches each opcode/pseudo against its
//! permitted operand shape, builds the symbol table, and runs the
//! back-patch pass that resolves forward label references into final
//! immediates before handing everything to `ic::encode_word`.

use std::collections::HashMap;

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::ic::{self, IcUnit, ImmOperand, RangeClass};
use crate::lexer::{self, Token, TokenKind};
use crate::pseudo::{self, PseudoOperands};
use crate::source_map::{SourceMap, SourceMapItem};
use rvcore::isa::Op;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Text,
    Data,
}

struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
    line: u32,
    source_line: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(tokens: &'a [Token], line: u32, source_line: &'a str) -> Cursor<'a> {
        Cursor { tokens, pos: 0, line, source_line }
    }

    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<&TokenKind> {
        let t = self.tokens.get(self.pos).map(|t| &t.kind);
        self.pos += 1;
        t
    }

    fn unexpected(&self, expected: &'static [&'static str]) -> Diagnostic {
        Diagnostic::new(
            self.line,
            self.tokens.get(self.pos).map(|t| t.column).unwrap_or(1),
            self.source_line,
            "unexpected operand shape",
            DiagnosticKind::Syntax { expected: expected.to_vec() },
        )
    }

    fn expect_comma(&mut self, expected: &'static [&'static str]) -> Result<(), Diagnostic> {
        match self.advance() {
            Some(TokenKind::Comma) => Ok(()),
            _ => Err(self.unexpected(expected)),
        }
    }

    fn expect_lparen(&mut self) -> Result<(), Diagnostic> {
        match self.advance() {
            Some(TokenKind::LParen) => Ok(()),
            _ => Err(self.unexpected(&["("])),
        }
    }

    fn expect_rparen(&mut self) -> Result<(), Diagnostic> {
        match self.advance() {
            Some(TokenKind::RParen) => Ok(()),
            _ => Err(self.unexpected(&[")"])),
        }
    }

    fn expect_gpr(&mut self) -> Result<u8, Diagnostic> {
        match self.advance() {
            Some(&TokenKind::GpRegister(r)) => Ok(r),
            _ => Err(self.unexpected(&["<gp register>"])),
        }
    }

    fn expect_fpr(&mut self) -> Result<u8, Diagnostic> {
        match self.advance() {
            Some(&TokenKind::FpRegister(r)) => Ok(r),
            _ => Err(self.unexpected(&["<fp register>"])),
        }
    }

    fn expect_integer(&mut self) -> Result<i64, Diagnostic> {
        match self.advance() {
            Some(&TokenKind::Integer(v)) => Ok(v),
            _ => Err(self.unexpected(&["<integer>"])),
        }
    }

    fn expect_integer_or_label(&mut self) -> Result<ImmOperand, Diagnostic> {
        match self.advance() {
            Some(&TokenKind::Integer(v)) => Ok(ImmOperand::Value(v)),
            Some(TokenKind::LabelRef(name)) => Ok(ImmOperand::Label(name.clone())),
            _ => Err(self.unexpected(&["<integer>", "<label>"])),
        }
    }

    fn take_rounding_mode(&mut self) -> u8 {
        if let Some(&TokenKind::RoundingMode(rm)) = self.peek() {
            self.pos += 1;
            return rm;
        }
        0b111
    }

    fn finished(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn expect_end(&self, expected: &'static [&'static str]) -> Result<(), Diagnostic> {
        if self.finished() {
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }
}

fn mk(op: Op, line: u32) -> IcUnit {
    IcUnit::new(op, line)
}

fn parse_rrr(c: &mut Cursor, op: Op) -> Result<IcUnit, Diagnostic> {
    let rd = c.expect_gpr()?;
    c.expect_comma(&["<gp>, <gp>, <gp>"])?;
    let rs1 = c.expect_gpr()?;
    c.expect_comma(&["<gp>, <gp>, <gp>"])?;
    let rs2 = c.expect_gpr()?;
    c.expect_end(&["<gp>, <gp>, <gp>"])?;
    let mut u = mk(op, c.line);
    u.rd = rd;
    u.rs1 = rs1;
    u.rs2 = rs2;
    Ok(u)
}

fn parse_rri(c: &mut Cursor, op: Op, class: RangeClass) -> Result<IcUnit, Diagnostic> {
    let rd = c.expect_gpr()?;
    c.expect_comma(&["<gp>, <gp>, <imm>"])?;
    let rs1 = c.expect_gpr()?;
    c.expect_comma(&["<gp>, <gp>, <imm>"])?;
    let imm = c.expect_integer()?;
    c.expect_end(&["<gp>, <gp>, <imm>"])?;
    ic::validate_range(class, imm, c.line, c.source_line)?;
    let mut u = mk(op, c.line);
    u.rd = rd;
    u.rs1 = rs1;
    u.imm = ImmOperand::Value(imm);
    Ok(u)
}

fn parse_load(c: &mut Cursor, op: Op, rd_is_fp: bool) -> Result<IcUnit, Diagnostic> {
    let rd = if rd_is_fp { c.expect_fpr()? } else { c.expect_gpr()? };
    c.expect_comma(&["<rd>, <imm>(<gp>)", "<rd>, <label>"])?;
    let imm = c.expect_integer_or_label()?;
    let rs1 = if let Some(TokenKind::LParen) = c.peek() {
        c.pos += 1;
        let r = c.expect_gpr()?;
        c.expect_rparen()?;
        r
    } else {
        0
    };
    c.expect_end(&["<rd>, <imm>(<gp>)", "<rd>, <label>"])?;
    if let ImmOperand::Value(v) = imm {
        ic::validate_range(RangeClass::LoadStoreOffset, v, c.line, c.source_line)?;
    }
    let mut u = mk(op, c.line);
    u.rd = rd;
    u.rs1 = rs1;
    u.imm = imm;
    Ok(u)
}

fn parse_store(c: &mut Cursor, op: Op, rs2_is_fp: bool) -> Result<IcUnit, Diagnostic> {
    let rs2 = if rs2_is_fp { c.expect_fpr()? } else { c.expect_gpr()? };
    c.expect_comma(&["<rs2>, <imm>(<gp>)"])?;
    let imm = c.expect_integer()?;
    c.expect_lparen()?;
    let rs1 = c.expect_gpr()?;
    c.expect_rparen()?;
    c.expect_end(&["<rs2>, <imm>(<gp>)"])?;
    ic::validate_range(RangeClass::LoadStoreOffset, imm, c.line, c.source_line)?;
    let mut u = mk(op, c.line);
    u.rs1 = rs1;
    u.rs2 = rs2;
    u.imm = ImmOperand::Value(imm);
    Ok(u)
}

fn parse_branch(c: &mut Cursor, op: Op) -> Result<IcUnit, Diagnostic> {
    let rs1 = c.expect_gpr()?;
    c.expect_comma(&["<gp>, <gp>, <label>"])?;
    let rs2 = c.expect_gpr()?;
    c.expect_comma(&["<gp>, <gp>, <label>"])?;
    let target = c.expect_integer_or_label()?;
    c.expect_end(&["<gp>, <gp>, <label>"])?;
    if let ImmOperand::Value(v) = target {
        ic::validate_range(RangeClass::Branch, v, c.line, c.source_line)?;
    }
    let mut u = mk(op, c.line);
    u.rs1 = rs1;
    u.rs2 = rs2;
    u.imm = target;
    Ok(u)
}

fn parse_upper(c: &mut Cursor, op: Op) -> Result<IcUnit, Diagnostic> {
    let rd = c.expect_gpr()?;
    c.expect_comma(&["<gp>, <imm>"])?;
    let imm = c.expect_integer()?;
    c.expect_end(&["<gp>, <imm>"])?;
    ic::validate_range(RangeClass::Upper20, imm, c.line, c.source_line)?;
    let mut u = mk(op, c.line);
    u.rd = rd;
    u.imm = ImmOperand::Value(imm);
    Ok(u)
}

fn parse_jal(c: &mut Cursor) -> Result<IcUnit, Diagnostic> {
    let rd = c.expect_gpr()?;
    c.expect_comma(&["<gp>, <label>"])?;
    let target = c.expect_integer_or_label()?;
    c.expect_end(&["<gp>, <label>"])?;
    if let ImmOperand::Value(v) = target {
        ic::validate_range(RangeClass::Jal, v, c.line, c.source_line)?;
    }
    let mut u = mk(Op::Jal, c.line);
    u.rd = rd;
    u.imm = target;
    Ok(u)
}

fn parse_jalr(c: &mut Cursor) -> Result<IcUnit, Diagnostic> {
    let rd = c.expect_gpr()?;
    c.expect_comma(&["<gp>, <imm>(<gp>)"])?;
    let imm = c.expect_integer()?;
    c.expect_lparen()?;
    let rs1 = c.expect_gpr()?;
    c.expect_rparen()?;
    c.expect_end(&["<gp>, <imm>(<gp>)"])?;
    ic::validate_range(RangeClass::LoadStoreOffset, imm, c.line, c.source_line)?;
    let mut u = mk(Op::Jalr, c.line);
    u.rd = rd;
    u.rs1 = rs1;
    u.imm = ImmOperand::Value(imm);
    Ok(u)
}

fn parse_csr(c: &mut Cursor, op: Op, uimm: bool) -> Result<IcUnit, Diagnostic> {
    let rd = c.expect_gpr()?;
    c.expect_comma(&["<gp>, <csr>, <gp|uimm>"])?;
    let csr = c.expect_integer()?;
    c.expect_comma(&["<gp>, <csr>, <gp|uimm>"])?;
    let rs1 = if uimm { c.expect_integer()? as u8 } else { c.expect_gpr()? };
    c.expect_end(&["<gp>, <csr>, <gp|uimm>"])?;
    let mut u = mk(op, c.line);
    u.rd = rd;
    u.rs1 = rs1;
    u.csr = csr as u16;
    Ok(u)
}

fn parse_fp_rrr_rm(c: &mut Cursor, op: Op) -> Result<IcUnit, Diagnostic> {
    let rd = c.expect_fpr()?;
    c.expect_comma(&["<fp>, <fp>, <fp>[, <rm>]"])?;
    let rs1 = c.expect_fpr()?;
    c.expect_comma(&["<fp>, <fp>, <fp>[, <rm>]"])?;
    let rs2 = c.expect_fpr()?;
    let rm = if let Some(TokenKind::Comma) = c.peek() {
        c.pos += 1;
        c.take_rounding_mode()
    } else {
        0b111
    };
    c.expect_end(&["<fp>, <fp>, <fp>[, <rm>]"])?;
    let mut u = mk(op, c.line);
    u.rd = rd;
    u.rs1 = rs1;
    u.rs2 = rs2;
    u.rm = rm;
    Ok(u)
}

fn parse_fp_rrr_no_rm(c: &mut Cursor, op: Op) -> Result<IcUnit, Diagnostic> {
    let rd = c.expect_fpr()?;
    c.expect_comma(&["<fp>, <fp>, <fp>"])?;
    let rs1 = c.expect_fpr()?;
    c.expect_comma(&["<fp>, <fp>, <fp>"])?;
    let rs2 = c.expect_fpr()?;
    c.expect_end(&["<fp>, <fp>, <fp>"])?;
    let mut u = mk(op, c.line);
    u.rd = rd;
    u.rs1 = rs1;
    u.rs2 = rs2;
    Ok(u)
}

fn parse_fp_unary_rm(c: &mut Cursor, op: Op, rd_fp: bool, rs1_fp: bool) -> Result<IcUnit, Diagnostic> {
    let rd = if rd_fp { c.expect_fpr()? } else { c.expect_gpr()? };
    c.expect_comma(&["<rd>, <rs1>[, <rm>]"])?;
    let rs1 = if rs1_fp { c.expect_fpr()? } else { c.expect_gpr()? };
    let rm = if let Some(TokenKind::Comma) = c.peek() {
        c.pos += 1;
        c.take_rounding_mode()
    } else {
        0b111
    };
    c.expect_end(&["<rd>, <rs1>[, <rm>]"])?;
    let mut u = mk(op, c.line);
    u.rd = rd;
    u.rs1 = rs1;
    u.rm = rm;
    Ok(u)
}

fn parse_fp_compare(c: &mut Cursor, op: Op) -> Result<IcUnit, Diagnostic> {
    let rd = c.expect_gpr()?;
    c.expect_comma(&["<gp>, <fp>, <fp>"])?;
    let rs1 = c.expect_fpr()?;
    c.expect_comma(&["<gp>, <fp>, <fp>"])?;
    let rs2 = c.expect_fpr()?;
    c.expect_end(&["<gp>, <fp>, <fp>"])?;
    let mut u = mk(op, c.line);
    u.rd = rd;
    u.rs1 = rs1;
    u.rs2 = rs2;
    Ok(u)
}

fn parse_fp_move(c: &mut Cursor, op: Op, rd_fp: bool, rs1_fp: bool) -> Result<IcUnit, Diagnostic> {
    let rd = if rd_fp { c.expect_fpr()? } else { c.expect_gpr()? };
    c.expect_comma(&["<rd>, <rs1>"])?;
    let rs1 = if rs1_fp { c.expect_fpr()? } else { c.expect_gpr()? };
    c.expect_end(&["<rd>, <rs1>"])?;
    let mut u = mk(op, c.line);
    u.rd = rd;
    u.rs1 = rs1;
    Ok(u)
}

fn parse_fp_fused(c: &mut Cursor, op: Op) -> Result<IcUnit, Diagnostic> {
    let rd = c.expect_fpr()?;
    c.expect_comma(&["<fp> x4 [, <rm>]"])?;
    let rs1 = c.expect_fpr()?;
    c.expect_comma(&["<fp> x4 [, <rm>]"])?;
    let rs2 = c.expect_fpr()?;
    c.expect_comma(&["<fp> x4 [, <rm>]"])?;
    let rs3 = c.expect_fpr()?;
    let rm = if let Some(TokenKind::Comma) = c.peek() {
        c.pos += 1;
        c.take_rounding_mode()
    } else {
        0b111
    };
    c.expect_end(&["<fp> x4 [, <rm>]"])?;
    let mut u = mk(op, c.line);
    u.rd = rd;
    u.rs1 = rs1;
    u.rs2 = rs2;
    u.rs3 = rs3;
    u.rm = rm;
    Ok(u)
}

fn parse_opcode(c: &mut Cursor, op: Op) -> Result<IcUnit, Diagnostic> {
    use Op::*;
    match op {
        Add | Sub | Sll | Slt | Sltu | Xor | Srl | Sra | Or | And | Addw | Subw | Sllw | Srlw
        | Sraw | Mul | Mulh | Mulhsu | Mulhu | Div | Divu | Rem | Remu | Mulw | Divw | Divuw
        | Remw | Remuw => parse_rrr(c, op),

        Addi | Xori | Ori | Andi | Slti | Sltiu | Addiw => parse_rri(c, op, RangeClass::ArithImmediate),
        Slli | Srli | Srai | Slliw | Srliw | Sraiw => parse_rri(c, op, RangeClass::Shamt5),

        Lb | Lh | Lw | Ld | Lbu | Lhu | Lwu => parse_load(c, op, false),
        Flw | Fld => parse_load(c, op, true),

        Sb | Sh | Sw | Sd => parse_store(c, op, false),
        Fsw | Fsd => parse_store(c, op, true),

        Beq | Bne | Blt | Bge | Bltu | Bgeu => parse_branch(c, op),

        Lui | Auipc => parse_upper(c, op),
        Jal => parse_jal(c),
        Jalr => parse_jalr(c),

        Ecall => {
            c.expect_end(&["ecall"])?;
            Ok(mk(Op::Ecall, c.line))
        }

        Csrrw | Csrrs | Csrrc => parse_csr(c, op, false),
        Csrrwi | Csrrsi | Csrrci => parse_csr(c, op, true),

        FaddS | FsubS | FmulS | FdivS | FaddD | FsubD | FmulD | FdivD => parse_fp_rrr_rm(c, op),

        FsgnjS | FsgnjnS | FsgnjxS | FminS | FmaxS | FsgnjD | FsgnjnD | FsgnjxD | FminD | FmaxD => {
            parse_fp_rrr_no_rm(c, op)
        }

        FsqrtS | FsqrtD | FcvtSD | FcvtDS => parse_fp_unary_rm(c, op, true, true),
        FcvtWS | FcvtWuS | FcvtLS | FcvtLuS | FcvtWD | FcvtWuD | FcvtLD | FcvtLuD => {
            parse_fp_unary_rm(c, op, false, true)
        }
        FcvtSW | FcvtSWu | FcvtSL | FcvtSLu | FcvtDW | FcvtDWu | FcvtDL | FcvtDLu => {
            parse_fp_unary_rm(c, op, true, false)
        }

        FeqS | FltS | FleS | FeqD | FltD | FleD => parse_fp_compare(c, op),

        FclassS | FclassD | FmvXW | FmvXD => parse_fp_move(c, op, false, true),
        FmvWX | FmvDX => parse_fp_move(c, op, true, false),

        FmaddS | FmsubS | FnmsubS | FnmaddS | FmaddD | FmsubD | FnmsubD | FnmaddD => {
            parse_fp_fused(c, op)
        }
    }
}

fn parse_pseudo(c: &mut Cursor, name: &str) -> Result<Vec<IcUnit>, Diagnostic> {
    let operands = match name {
        "nop" | "ret" => {
            c.expect_end(&[name])?;
            PseudoOperands::None
        }
        "li" => {
            let rd = c.expect_gpr()?;
            c.expect_comma(&["<gp>, <imm>"])?;
            let imm = c.expect_integer()?;
            c.expect_end(&["<gp>, <imm>"])?;
            PseudoOperands::OneRegImm(rd, imm)
        }
        "mv" | "not" | "neg" | "seqz" | "snez" | "sltz" | "sgtz" => {
            let rd = c.expect_gpr()?;
            c.expect_comma(&["<gp>, <gp>"])?;
            let rs = c.expect_gpr()?;
            c.expect_end(&["<gp>, <gp>"])?;
            PseudoOperands::TwoReg(rd, rs)
        }
        "beqz" | "bnez" | "blez" | "bgez" | "bltz" | "bgtz" => {
            let rs = c.expect_gpr()?;
            c.expect_comma(&["<gp>, <label>"])?;
            let target = c.expect_integer_or_label()?;
            c.expect_end(&["<gp>, <label>"])?;
            PseudoOperands::OneRegLabel(rs, target)
        }
        "bgt" | "ble" | "bgtu" | "bleu" => {
            let rs = c.expect_gpr()?;
            c.expect_comma(&["<gp>, <gp>, <label>"])?;
            let rt = c.expect_gpr()?;
            c.expect_comma(&["<gp>, <gp>, <label>"])?;
            let target = c.expect_integer_or_label()?;
            c.expect_end(&["<gp>, <gp>, <label>"])?;
            PseudoOperands::TwoRegLabel(rs, rt, target)
        }
        "j" | "tail" | "call" | "la" => {
            let target = c.expect_integer_or_label()?;
            c.expect_end(&["<label>"])?;
            PseudoOperands::Label(target)
        }
        "jr" => {
            let rs = c.expect_gpr()?;
            c.expect_end(&["<gp>"])?;
            PseudoOperands::OneReg(rs)
        }
        _ => return Err(c.unexpected(&[])),
    };
    pseudo::expand(name, operands, c.line, c.source_line)
}

fn data_directive_width(name: &str) -> Option<u32> {
    match name {
        "dword" => Some(8),
        "word" => Some(4),
        "halfword" => Some(2),
        "byte" => Some(1),
        "string" => Some(0),
        _ => None,
    }
}

pub struct Parsed {
    pub text_words: Vec<u32>,
    pub data_bytes: Vec<u8>,
    pub source_map: SourceMap,
}

pub fn parse(input: &str, data_offset: u32) -> Result<Parsed, Vec<Diagnostic>> {
    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    let mut section = Section::Text;
    let mut text_units: Vec<IcUnit> = Vec::new();
    let mut data_bytes: Vec<u8> = Vec::new();
    let mut text_labels: HashMap<String, u32> = HashMap::new();
    let mut data_labels: HashMap<String, u32> = HashMap::new();
    let mut label_def_lines: HashMap<String, u32> = HashMap::new();
    let mut source_map: SourceMap = Vec::new();

    for (idx, raw_line) in input.lines().enumerate() {
        let line_no = (idx + 1) as u32;
        let tokens = match lexer::lex_line(raw_line, line_no) {
            Ok(t) => t,
            Err(d) => {
                diagnostics.push(d);
                continue;
            }
        };
        if tokens.is_empty() {
            continue;
        }

        let mut c = Cursor::new(&tokens, line_no, raw_line);

        if let Some(TokenKind::Directive(name)) = c.peek() {
            match name.as_str() {
                "data" => {
                    section = Section::Data;
                    continue;
                }
                "text" => {
                    section = Section::Text;
                    continue;
                }
                "bss" => {
                    section = Section::Data;
                    continue;
                }
                dname => {
                    if section != Section::Data {
                        diagnostics.push(Diagnostic::new(
                            line_no,
                            1,
                            raw_line,
                            format!("data directive '.{}' used outside a .data/.bss section", dname),
                            DiagnosticKind::UnexpectedToken,
                        ));
                        continue;
                    }
                    let width = match data_directive_width(dname) {
                        Some(w) => w,
                        None => {
                            diagnostics.push(Diagnostic::new(
                                line_no,
                                1,
                                raw_line,
                                format!("unknown data directive '.{}'", dname),
                                DiagnosticKind::UnexpectedToken,
                            ));
                            continue;
                        }
                    };
                    c.pos += 1;
                    let mut ok = true;
                    loop {
                        match c.peek() {
                            Some(&TokenKind::Integer(v)) if width > 0 => {
                                c.pos += 1;
                                data_bytes.extend_from_slice(&v.to_le_bytes()[..width as usize]);
                            }
                            Some(TokenKind::Str(s)) if width == 0 => {
                                data_bytes.extend_from_slice(s.as_bytes());
                                c.pos += 1;
                            }
                            _ => {
                                diagnostics.push(c.unexpected(&["<literal>"]));
                                ok = false;
                                break;
                            }
                        }
                        match c.peek() {
                            Some(TokenKind::Comma) => {
                                c.pos += 1;
                                continue;
                            }
                            None => break,
                            _ => {
                                diagnostics.push(c.unexpected(&[","]));
                                ok = false;
                                break;
                            }
                        }
                    }
                    if !ok {
                        continue;
                    }
                    continue;
                }
            }
        }

        if let Some(TokenKind::LabelDef(name)) = c.peek() {
            let name = name.clone();
            c.pos += 1;
            if let Some(&prior) = label_def_lines.get(&name) {
                diagnostics.push(Diagnostic::new(
                    line_no,
                    1,
                    raw_line,
                    format!("label '{}' is already defined", name),
                    DiagnosticKind::LabelRedefinition { first_line: prior },
                ));
            } else {
                label_def_lines.insert(name.clone(), line_no);
                match section {
                    Section::Text => {
                        text_labels.insert(name, (text_units.len() as u32) * 4);
                    }
                    Section::Data => {
                        data_labels.insert(name, data_offset + data_bytes.len() as u32);
                    }
                }
            }
            if c.finished() {
                continue;
            }
        }

        if section == Section::Data {
            if !c.finished() {
                diagnostics.push(c.unexpected(&["<data directive>"]));
            }
            continue;
        }

        match c.advance() {
            Some(&TokenKind::Opcode(op)) => match parse_opcode(&mut c, op) {
                Ok(unit) => {
                    source_map.push(SourceMapItem { start_line: line_no, line_count: 1 });
                    text_units.push(unit);
                }
                Err(d) => diagnostics.push(d),
            },
            Some(TokenKind::Pseudo(name)) => {
                let name = name.clone();
                match parse_pseudo(&mut c, &name) {
                    Ok(units) => {
                        for unit in units {
                            source_map.push(SourceMapItem { start_line: line_no, line_count: 1 });
                            text_units.push(unit);
                        }
                    }
                    Err(d) => diagnostics.push(d),
                }
            }
            _ => diagnostics.push(Diagnostic::new(
                line_no,
                1,
                raw_line,
                "expected an opcode, pseudo-instruction, or label",
                DiagnosticKind::UnexpectedToken,
            )),
        }
    }

    if !diagnostics.is_empty() {
        return Err(diagnostics);
    }

    fn is_branch_class(op: Op) -> bool {
        matches!(op, Op::Beq | Op::Bne | Op::Blt | Op::Bge | Op::Bltu | Op::Bgeu)
    }
    fn is_load_class(op: Op) -> bool {
        matches!(op, Op::Lb | Op::Lh | Op::Lw | Op::Ld | Op::Lbu | Op::Lhu | Op::Lwu | Op::Flw | Op::Fld)
    }

    let source_lines: Vec<&str> = input.lines().collect();
    let mut words = Vec::with_capacity(text_units.len());
    for (i, unit) in text_units.iter().enumerate() {
        let src = source_lines.get((unit.line.saturating_sub(1)) as usize).copied().unwrap_or("");
        let resolved = match &unit.imm {
            ImmOperand::Value(v) => *v,
            ImmOperand::Label(name) => {
                if is_branch_class(unit.op) || unit.op == Op::Jal {
                    match text_labels.get(name) {
                        Some(&addr) => {
                            let offset = addr as i64 - (i as i64) * 4;
                            let class = if unit.op == Op::Jal { RangeClass::Jal } else { RangeClass::Branch };
                            if let Err(d) = ic::validate_range(class, offset, unit.line, src) {
                                diagnostics.push(d);
                                continue;
                            }
                            offset
                        }
                        None => {
                            if data_labels.contains_key(name) {
                                diagnostics.push(Diagnostic::new(
                                    unit.line,
                                    1,
                                    src,
                                    format!("'{}' names a data label; a branch/jump target must be a text label", name),
                                    DiagnosticKind::InvalidLabelRef,
                                ));
                            } else {
                                diagnostics.push(Diagnostic::new(
                                    unit.line,
                                    1,
                                    src,
                                    format!("undefined label '{}'", name),
                                    DiagnosticKind::InvalidLabelRef,
                                ));
                            }
                            continue;
                        }
                    }
                } else if is_load_class(unit.op) {
                    match data_labels.get(name) {
                        Some(&addr) => {
                            if let Err(d) = ic::validate_range(RangeClass::LoadStoreOffset, addr as i64, unit.line, src) {
                                diagnostics.push(d);
                                continue;
                            }
                            addr as i64
                        }
                        None => {
                            diagnostics.push(Diagnostic::new(
                                unit.line,
                                1,
                                src,
                                format!("undefined data label '{}'", name),
                                DiagnosticKind::InvalidLabelRef,
                            ));
                            continue;
                        }
                    }
                } else {
                    diagnostics.push(Diagnostic::new(
                        unit.line,
                        1,
                        src,
                        format!("'{}' cannot be used as an operand here", name),
                        DiagnosticKind::InvalidLabelRef,
                    ));
                    continue;
                }
            }
        };
        words.push(ic::encode_word(unit, resolved));
    }

    if !diagnostics.is_empty() {
        return Err(diagnostics);
    }

    Ok(Parsed { text_words: words, data_bytes, source_map })
}
