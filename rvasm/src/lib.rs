//! Assembler for the RV64IMFD simulator's assembly language.
//!
//! The main entry points are [`assemble`] and [`assemble_addressed`], which
//! accept a source string and produce an [`rvx::Executable`] plus a
//! [`SourceMap`] associating each emitted instruction word with the source
//! line(s) that produced it.
//!
//! Assembly proceeds in three stages: the [`lexer`] (4.E) turns each line
//! into a token list; the [`parser`] (4.F) matches opcodes/pseudo-ops
//! against their operand shapes, expands pseudo-instructions via
//! [`pseudo`], and runs the forward-label back-patch pass; [`ic`] holds the
//! intermediate instruction representation and the bit-exact word encoder.
//! Failures are reported as a `Vec<`[`Diagnostic`]`>` rather than a single
//! `std::error::Error`, since one assembly run surfaces every bad line it
//! finds, not just the first.

pub mod diagnostics;
pub mod ic;
pub mod lexer;
pub mod parser;
pub mod pseudo;
pub mod source_map;

pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use source_map::{SourceMap, SourceMapItem};

/// Assembles `input`, placing the `.data` section at address 0.
pub fn assemble(input: &str) -> Result<(rvx::Executable, SourceMap), Vec<Diagnostic>> {
    assemble_addressed(input, 0)
}

/// Assembles `input`, placing the `.data` section at `data_offset`.
pub fn assemble_addressed(
    input: &str,
    data_offset: u32,
) -> Result<(rvx::Executable, SourceMap), Vec<Diagnostic>> {
    log::debug!("assembling {} line(s), data_offset={:#x}", input.lines().count(), data_offset);

    let parsed = parser::parse(input, data_offset).map_err(|diags| {
        log::error!("assembly failed with {} diagnostic(s)", diags.len());
        diags
    })?;

    let mut instructions = Vec::with_capacity(parsed.text_words.len() * 4);
    for word in &parsed.text_words {
        instructions.extend_from_slice(&word.to_le_bytes());
    }

    log::info!(
        "assembled {} instruction(s), {} byte(s) of data",
        parsed.text_words.len(),
        parsed.data_bytes.len()
    );

    let executable = rvx::Executable::from(data_offset, instructions, parsed.data_bytes);
    Ok((executable, parsed.source_map))
}

#[cfg(test)]
mod test {
    use super::*;

    fn words(input: &str) -> Vec<u32> {
        let (exe, _) = assemble(input).unwrap();
        exe.instructions()
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    #[test]
    fn assembles_arithmetic_and_branch() {
        let src = "\
addi x5, x0, 10
addi x6, x0, 0
loop:
beq x6, x5, end
addi x6, x6, 1
j loop
end:
addi x0, x0, 0
";
        let w = words(src);
        assert_eq!(w.len(), 6);
        let branch = rvcore::decode::decode(w[2]).unwrap();
        assert_eq!(branch.op, rvcore::isa::Op::Beq);
        assert_eq!(branch.imm, 12);
        let jump = rvcore::decode::decode(w[4]).unwrap();
        assert_eq!(jump.op, rvcore::isa::Op::Jal);
        assert_eq!(jump.imm, -8);
    }

    #[test]
    fn call_targets_forward_label_with_return_address_in_ra() {
        let src = "\
call helper
addi x0, x0, 0
helper:
jalr x0, 0(x1)
";
        let w = words(src);
        let call = rvcore::decode::decode(w[0]).unwrap();
        assert_eq!(call.op, rvcore::isa::Op::Jal);
        assert_eq!(call.rd, 1);
        assert_eq!(call.imm, 8);
    }

    #[test]
    fn li_expands_to_lui_addi_pair() {
        let w = words("li x5, 0x12345\n");
        assert_eq!(w.len(), 2);
        let lui = rvcore::decode::decode(w[0]).unwrap();
        assert_eq!(lui.op, rvcore::isa::Op::Lui);
        assert_eq!(lui.imm, 0x12000);
        let addi = rvcore::decode::decode(w[1]).unwrap();
        assert_eq!(addi.op, rvcore::isa::Op::Addi);
        assert_eq!(addi.imm, 0x345);
    }

    #[test]
    fn li_small_immediate_is_a_single_addi() {
        let w = words("li x5, 7\n");
        assert_eq!(w.len(), 1);
        assert_eq!(rvcore::decode::decode(w[0]).unwrap().op, rvcore::isa::Op::Addi);
    }

    #[test]
    fn loads_fp_value_from_data_label() {
        let src = "\
.data
pi:
.word 0x40490fdb
.text
flw fa0, pi(x0)
fdiv.s fa0, fa0, fa0
";
        let (exe, _) = assemble(src).unwrap();
        assert_eq!(exe.data(), &0x40490fdbu32.to_le_bytes());
        let instrs: Vec<u32> = exe
            .instructions()
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        let flw = rvcore::decode::decode(instrs[0]).unwrap();
        assert_eq!(flw.op, rvcore::isa::Op::Flw);
        assert_eq!(flw.imm, 0);
        let fdiv = rvcore::decode::decode(instrs[1]).unwrap();
        assert_eq!(fdiv.op, rvcore::isa::Op::FdivS);
    }

    #[test]
    fn rejects_out_of_range_branch_offset() {
        let mut src = String::from("top:\n");
        for _ in 0..2000 {
            src.push_str("addi x0, x0, 0\n");
        }
        src.push_str("beq x0, x0, top\n");
        assert!(assemble(&src).is_err());
    }

    #[test]
    fn rejects_undefined_label() {
        let diags = assemble("j nowhere\n").unwrap_err();
        assert!(diags.iter().any(|d| d.kind == DiagnosticKind::InvalidLabelRef));
    }

    #[test]
    fn rejects_la_pseudo_instruction() {
        assert!(assemble("la x5, somewhere\n").is_err());
    }

    #[test]
    fn rejects_branch_to_data_label() {
        let src = "\
.data
value:
.word 1
.text
beq x0, x0, value
";
        assert!(assemble(src).is_err());
    }
}
