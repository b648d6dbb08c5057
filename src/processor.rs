//! Execution driver (4.H/4.I): the fetch-decode-execute-memory-writeback
//! cycle, run/step/undo/redo, and breakpoint management.
//!
//! Grounded on the teacher's `Processor`/`Core` split (load a program,
//! drive a `run()` loop by ticking a core, report an exit reason) and on
//! `original_source/src/vm/core.h`'s instruction-limit-bounded run loop,
//! generalized from the toy fixed-width ISA to RV64IMFD by delegating
//! operand gathering and writeback to `decode`/`alu`/`fpu`/`registers` and
//! delta bookkeeping to `history`.

use std::collections::HashSet;
use std::thread;
use std::time::Duration;

use log::{debug, info};

use crate::alu::{self, AluOp};
use crate::constants::*;
use crate::decode::{self, Decoded, DecodeError};
use crate::fpu::{self, FpOp, RoundingMode};
use crate::history::{History, RegisterBank, StepDelta};
use crate::isa::Op;
use crate::memory::{Memory, MemoryError, Storage, StorageMut};
use crate::registers::RegisterFile;
use crate::syscall::{self, InputQueue, SyscallError, SyscallOutcome};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StopReason {
    EndOfText,
    StopRequested,
    Exited(i64),
    InstructionLimitReached,
    BreakpointHit(u64),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, thiserror::Error)]
pub enum StepError {
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("memory access failed: {0}")]
    Memory(#[from] MemoryError),
    #[error("syscall failed: {0}")]
    Syscall(#[from] SyscallError),
}

/// A structured point-in-time view of architectural state, for the
/// registers/VM-state dumps persisted by the command shell.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub pc: u64,
    pub cycles: u64,
    pub instructions_retired: u64,
    pub gpr: [u64; NUM_GPR],
    pub fpr: [u64; NUM_FPR],
    pub fflags: u64,
    pub frm: u64,
}

fn alu_op_for(op: Op) -> Option<AluOp> {
    use Op::*;
    Some(match op {
        Add | Addi => AluOp::Add,
        Sub => AluOp::Sub,
        Sll | Slli => AluOp::Sll,
        Slt | Slti => AluOp::Slt,
        Sltu | Sltiu => AluOp::Sltu,
        Xor | Xori => AluOp::Xor,
        Srl | Srli => AluOp::Srl,
        Sra | Srai => AluOp::Sra,
        Or | Ori => AluOp::Or,
        And | Andi => AluOp::And,
        Addw | Addiw => AluOp::Addw,
        Subw => AluOp::Subw,
        Sllw | Slliw => AluOp::Sllw,
        Srlw | Srliw => AluOp::Srlw,
        Sraw | Sraiw => AluOp::Sraw,
        Mul => AluOp::Mul,
        Mulh => AluOp::Mulh,
        Mulhsu => AluOp::Mulhsu,
        Mulhu => AluOp::Mulhu,
        Div => AluOp::Div,
        Divu => AluOp::Divu,
        Rem => AluOp::Rem,
        Remu => AluOp::Remu,
        Mulw => AluOp::Mulw,
        Divw => AluOp::Divw,
        Divuw => AluOp::Divuw,
        Remw => AluOp::Remw,
        Remuw => AluOp::Remuw,
        _ => return None,
    })
}

fn uses_immediate(op: Op) -> bool {
    use Op::*;
    matches!(
        op,
        Addi | Xori | Ori | Andi | Slti | Sltiu | Addiw | Slli | Srli | Srai | Slliw | Srliw | Sraiw
    )
}

fn fp_op_for(op: Op) -> Option<(FpOp, bool)> {
    use Op::*;
    Some(match op {
        FaddS => (FpOp::Fadd, false),
        FsubS => (FpOp::Fsub, false),
        FmulS => (FpOp::Fmul, false),
        FdivS => (FpOp::Fdiv, false),
        FsqrtS => (FpOp::Fsqrt, false),
        FsgnjS => (FpOp::Fsgnj, false),
        FsgnjnS => (FpOp::Fsgnjn, false),
        FsgnjxS => (FpOp::Fsgnjx, false),
        FminS => (FpOp::Fmin, false),
        FmaxS => (FpOp::Fmax, false),
        FmaddS => (FpOp::Fmadd, false),
        FmsubS => (FpOp::Fmsub, false),
        FnmsubS => (FpOp::Fnmsub, false),
        FnmaddS => (FpOp::Fnmadd, false),
        FaddD => (FpOp::Fadd, true),
        FsubD => (FpOp::Fsub, true),
        FmulD => (FpOp::Fmul, true),
        FdivD => (FpOp::Fdiv, true),
        FsqrtD => (FpOp::Fsqrt, true),
        FsgnjD => (FpOp::Fsgnj, true),
        FsgnjnD => (FpOp::Fsgnjn, true),
        FsgnjxD => (FpOp::Fsgnjx, true),
        FminD => (FpOp::Fmin, true),
        FmaxD => (FpOp::Fmax, true),
        FmaddD => (FpOp::Fmadd, true),
        FmsubD => (FpOp::Fmsub, true),
        FnmsubD => (FpOp::Fnmsub, true),
        FnmaddD => (FpOp::Fnmadd, true),
        _ => return None,
    })
}

pub struct Processor {
    regs: RegisterFile,
    memory: Memory,
    history: History,
    input: InputQueue,
    pc: u64,
    text_base: u64,
    text_len: u64,
    cycles: u64,
    instructions_retired: u64,
    instruction_execution_limit: u64,
    run_step_delay: Duration,
    breakpoints: HashSet<u64>,
    stop_requested: bool,
    exit_code: Option<i64>,
}

impl Processor {
    pub fn new(memory: Memory) -> Processor {
        Processor {
            regs: RegisterFile::new(),
            memory,
            history: History::new(),
            input: InputQueue::new(),
            pc: DEFAULT_TEXT_SECTION_START,
            text_base: DEFAULT_TEXT_SECTION_START,
            text_len: 0,
            cycles: 0,
            instructions_retired: 0,
            instruction_execution_limit: DEFAULT_INSTRUCTION_EXECUTION_LIMIT,
            run_step_delay: Duration::from_millis(0),
            breakpoints: HashSet::new(),
            stop_requested: false,
            exit_code: None,
        }
    }

    pub fn set_instruction_execution_limit(&mut self, limit: u64) {
        self.instruction_execution_limit = limit;
    }

    pub fn set_run_step_delay(&mut self, delay: Duration) {
        self.run_step_delay = delay;
    }

    /// A cloneable handle the external command shell uses to feed lines to
    /// the blocking read-line syscall.
    pub fn input_queue(&self) -> InputQueue {
        self.input.clone()
    }

    /// Loads an assembled program's text words starting at `base`, and
    /// resets the program counter to it.
    pub fn load_text(&mut self, base: u64, words: &[u32]) -> Result<(), MemoryError> {
        for (i, &word) in words.iter().enumerate() {
            self.memory.write_word(base + (i as u64) * WORD_BYTES as u64, word)?;
        }
        self.text_base = base;
        self.text_len = words.len() as u64 * WORD_BYTES as u64;
        self.pc = base;
        info!("loaded {} words of text at {:#x}", words.len(), base);
        Ok(())
    }

    pub fn pc(&self) -> u64 {
        self.pc
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.regs
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn instructions_retired(&self) -> u64 {
        self.instructions_retired
    }

    /// Consumes the exit code left by an `ecall` exit, if `step()` just
    /// retired one. `run()`/`debug_run()` consume this internally; a
    /// caller driving `step()` one instruction at a time needs it too.
    pub fn take_exit_code(&mut self) -> Option<i64> {
        self.exit_code.take()
    }

    pub fn request_stop(&mut self) {
        self.stop_requested = true;
    }

    pub fn clear_stop(&mut self) {
        self.stop_requested = false;
    }

    pub fn add_breakpoint(&mut self, address: u64) {
        self.breakpoints.insert(address);
    }

    pub fn remove_breakpoint(&mut self, address: u64) {
        self.breakpoints.remove(&address);
    }

    pub fn has_breakpoint(&self, address: u64) -> bool {
        self.breakpoints.contains(&address)
    }

    pub fn modify_register(&mut self, name: &str, value: u64) -> bool {
        self.regs.modify_by_name(name, value)
    }

    pub fn reset(&mut self) {
        self.regs.reset();
        self.memory.reset();
        self.history.clear();
        self.pc = self.text_base;
        self.cycles = 0;
        self.instructions_retired = 0;
        self.stop_requested = false;
        self.exit_code = None;
        info!("processor reset");
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            pc: self.pc,
            cycles: self.cycles,
            instructions_retired: self.instructions_retired,
            gpr: self.regs.gpr_snapshot(),
            fpr: self.regs.fpr_snapshot(),
            fflags: self.regs.read_csr(CSR_FFLAGS as usize),
            frm: self.regs.read_csr(CSR_FRM as usize),
        }
    }

    fn resolve_rm(&self, field: u8) -> RoundingMode {
        if field == 0b111 {
            RoundingMode::from_bits(self.regs.read_csr(CSR_FRM as usize) as u8)
        } else {
            RoundingMode::from_bits(field)
        }
    }

    fn track_gpr(&mut self, delta: &mut StepDelta, index: usize, value: u64) {
        let old = self.regs.read_gpr(index);
        self.regs.write_gpr(index, value);
        let new = self.regs.read_gpr(index);
        delta.push_register_change(RegisterBank::Gpr, index, old, new);
    }

    fn track_fpr(&mut self, delta: &mut StepDelta, index: usize, value: u64) {
        let old = self.regs.read_fpr(index);
        self.regs.write_fpr(index, value);
        delta.push_register_change(RegisterBank::Fpr, index, old, value);
    }

    fn track_fpr_f32(&mut self, delta: &mut StepDelta, index: usize, value: f32) {
        let old = self.regs.read_fpr(index);
        self.regs.write_fpr_f32(index, value);
        let new = self.regs.read_fpr(index);
        delta.push_register_change(RegisterBank::Fpr, index, old, new);
    }

    fn track_fpr_f64(&mut self, delta: &mut StepDelta, index: usize, value: f64) {
        self.track_fpr(delta, index, value.to_bits());
    }

    fn track_csr(&mut self, delta: &mut StepDelta, addr: usize, value: u64) {
        let old = self.regs.read_csr(addr);
        self.regs.write_csr(addr, value);
        delta.push_register_change(RegisterBank::Csr, addr, old, value);
    }

    fn accrue_fflags(&mut self, delta: &mut StepDelta, flags: u64) {
        if flags == 0 {
            return;
        }
        let addr = CSR_FFLAGS as usize;
        let old = self.regs.read_csr(addr);
        let new = old | flags;
        if new != old {
            self.track_csr(delta, addr, new);
        }
    }

    fn store_tracked(&mut self, address: u64, bytes: &[u8], delta: &mut StepDelta) -> Result<(), StepError> {
        let old = self.memory.read_bytes(address, bytes.len() as u64)?;
        self.memory.write_bytes(address, bytes)?;
        delta.push_memory_change(address, old, bytes.to_vec());
        Ok(())
    }

    fn load_int(&self, op: Op, address: u64) -> Result<u64, StepError> {
        use Op::*;
        Ok(match op {
            Lb => ((self.memory.read_byte(address)? as i8) as i64) as u64,
            Lh => ((self.memory.read_half(address)? as i16) as i64) as u64,
            Lw => ((self.memory.read_word(address)? as i32) as i64) as u64,
            Ld => self.memory.read_double(address)?,
            Lbu => self.memory.read_byte(address)? as u64,
            Lhu => self.memory.read_half(address)? as u64,
            Lwu => self.memory.read_word(address)? as u64,
            _ => unreachable!(),
        })
    }

    /// One cycle of 4.H: fetch, decode, execute, and commit a delta onto
    /// the undo stack, clearing the redo stack.
    pub fn step(&mut self) -> Result<StepDelta, StepError> {
        let old_pc = self.pc;
        let word = self.memory.read_word(old_pc)?;
        let decoded = decode::decode(word)?;
        let mut next_pc = old_pc.wrapping_add(WORD_BYTES as u64);
        let mut delta = StepDelta::new(old_pc, next_pc);

        self.execute(decoded, old_pc, &mut next_pc, &mut delta)?;

        delta.new_pc = next_pc;
        self.pc = next_pc;
        self.cycles += 1;
        self.instructions_retired += 1;
        debug!("retired instruction at {:#x}, pc now {:#x}", old_pc, next_pc);
        self.history.commit(delta.clone());
        Ok(delta)
    }

    fn execute(&mut self, d: Decoded, old_pc: u64, next_pc: &mut u64, delta: &mut StepDelta) -> Result<(), StepError> {
        if let Some(op) = alu_op_for(d.op) {
            let a = self.regs.read_gpr(d.rs1 as usize);
            let b = if uses_immediate(d.op) {
                d.imm as u64
            } else {
                self.regs.read_gpr(d.rs2 as usize)
            };
            let (result, _overflow) = alu::execute(op, a, b);
            self.track_gpr(delta, d.rd as usize, result);
            return Ok(());
        }

        if let Some((fpop, is_double)) = fp_op_for(d.op) {
            let rm = self.resolve_rm(d.rm);
            if is_double {
                let a = self.regs.read_fpr_f64(d.rs1 as usize);
                let b = self.regs.read_fpr_f64(d.rs2 as usize);
                let c = self.regs.read_fpr_f64(d.rs3 as usize);
                let r = fpu::execute_f64(fpop, a, b, c, rm);
                self.track_fpr_f64(delta, d.rd as usize, r.value);
                self.accrue_fflags(delta, r.flags);
            } else {
                let a = self.regs.read_fpr_f32(d.rs1 as usize);
                let b = self.regs.read_fpr_f32(d.rs2 as usize);
                let c = self.regs.read_fpr_f32(d.rs3 as usize);
                let r = fpu::execute_f32(fpop, a, b, c, rm);
                self.track_fpr_f32(delta, d.rd as usize, r.value);
                self.accrue_fflags(delta, r.flags);
            }
            return Ok(());
        }

        use Op::*;
        match d.op {
            Lb | Lh | Lw | Ld | Lbu | Lhu | Lwu => {
                let address = self.regs.read_gpr(d.rs1 as usize).wrapping_add(d.imm as u64);
                let value = self.load_int(d.op, address)?;
                self.track_gpr(delta, d.rd as usize, value);
            }
            Sb | Sh | Sw | Sd => {
                let address = self.regs.read_gpr(d.rs1 as usize).wrapping_add(d.imm as u64);
                let value = self.regs.read_gpr(d.rs2 as usize);
                let le = value.to_le_bytes();
                let bytes: &[u8] = match d.op {
                    Sb => &le[..1],
                    Sh => &le[..2],
                    Sw => &le[..4],
                    Sd => &le[..8],
                    _ => unreachable!(),
                };
                self.store_tracked(address, bytes, delta)?;
            }
            Flw => {
                let address = self.regs.read_gpr(d.rs1 as usize).wrapping_add(d.imm as u64);
                let bits = self.memory.read_word(address)?;
                self.track_fpr_f32(delta, d.rd as usize, f32::from_bits(bits));
            }
            Fld => {
                let address = self.regs.read_gpr(d.rs1 as usize).wrapping_add(d.imm as u64);
                let bits = self.memory.read_double(address)?;
                self.track_fpr(delta, d.rd as usize, bits);
            }
            Fsw => {
                let address = self.regs.read_gpr(d.rs1 as usize).wrapping_add(d.imm as u64);
                let bits = self.regs.read_fpr(d.rs2 as usize) as u32;
                self.store_tracked(address, &bits.to_le_bytes(), delta)?;
            }
            Fsd => {
                let address = self.regs.read_gpr(d.rs1 as usize).wrapping_add(d.imm as u64);
                let bits = self.regs.read_fpr(d.rs2 as usize);
                self.store_tracked(address, &bits.to_le_bytes(), delta)?;
            }
            Beq | Bne | Blt | Bge | Bltu | Bgeu => {
                let a = self.regs.read_gpr(d.rs1 as usize);
                let b = self.regs.read_gpr(d.rs2 as usize);
                let taken = match d.op {
                    Beq => a == b,
                    Bne => a != b,
                    Blt => (a as i64) < (b as i64),
                    Bge => (a as i64) >= (b as i64),
                    Bltu => a < b,
                    Bgeu => a >= b,
                    _ => unreachable!(),
                };
                if taken {
                    *next_pc = old_pc.wrapping_add(d.imm as u64);
                }
            }
            Jal => {
                let return_addr = *next_pc;
                self.track_gpr(delta, d.rd as usize, return_addr);
                *next_pc = old_pc.wrapping_add(d.imm as u64);
            }
            Jalr => {
                let return_addr = *next_pc;
                let target = self.regs.read_gpr(d.rs1 as usize).wrapping_add(d.imm as u64) & !1u64;
                self.track_gpr(delta, d.rd as usize, return_addr);
                *next_pc = target;
            }
            Lui => {
                self.track_gpr(delta, d.rd as usize, d.imm as u64);
            }
            Auipc => {
                self.track_gpr(delta, d.rd as usize, old_pc.wrapping_add(d.imm as u64));
            }
            Csrrw | Csrrs | Csrrc | Csrrwi | Csrrsi | Csrrci => {
                let addr = d.csr as usize;
                let old = self.regs.read_csr(addr);
                let is_immediate = matches!(d.op, Csrrwi | Csrrsi | Csrrci);
                let src = if is_immediate {
                    d.rs1 as u64
                } else {
                    self.regs.read_gpr(d.rs1 as usize)
                };
                let (new_value, suppress_write) = match d.op {
                    Csrrw | Csrrwi => (src, false),
                    Csrrs | Csrrsi => (old | src, src == 0),
                    Csrrc | Csrrci => (old & !src, src == 0),
                    _ => unreachable!(),
                };
                if !suppress_write {
                    self.track_csr(delta, addr, new_value);
                }
                self.track_gpr(delta, d.rd as usize, old);
            }
            FeqS | FltS | FleS => {
                let a = self.regs.read_fpr_f32(d.rs1 as usize);
                let b = self.regs.read_fpr_f32(d.rs2 as usize);
                let (result, flags) = fpu::compare_f32(d.op == FltS, d.op == FleS, d.op == FeqS, a, b);
                self.track_gpr(delta, d.rd as usize, result);
                self.accrue_fflags(delta, flags);
            }
            FeqD | FltD | FleD => {
                let a = self.regs.read_fpr_f64(d.rs1 as usize);
                let b = self.regs.read_fpr_f64(d.rs2 as usize);
                let (result, flags) = fpu::compare_f64(d.op == FltD, d.op == FleD, d.op == FeqD, a, b);
                self.track_gpr(delta, d.rd as usize, result);
                self.accrue_fflags(delta, flags);
            }
            FclassS => {
                let a = self.regs.read_fpr_f32(d.rs1 as usize);
                self.track_gpr(delta, d.rd as usize, fpu::classify_f32(a));
            }
            FclassD => {
                let a = self.regs.read_fpr_f64(d.rs1 as usize);
                self.track_gpr(delta, d.rd as usize, fpu::classify_f64(a));
            }
            FcvtWS | FcvtWuS | FcvtLS | FcvtLuS => {
                let a = self.regs.read_fpr_f32(d.rs1 as usize) as f64;
                let rm = self.resolve_rm(d.rm);
                let bits = if matches!(d.op, FcvtWS | FcvtWuS) { 32 } else { 64 };
                let (value, flags) = if matches!(d.op, FcvtWS | FcvtLS) {
                    fpu::cvt_to_signed(a, bits, rm)
                } else {
                    fpu::cvt_to_unsigned(a, bits, rm)
                };
                self.track_gpr(delta, d.rd as usize, value);
                self.accrue_fflags(delta, flags);
            }
            FcvtWD | FcvtWuD | FcvtLD | FcvtLuD => {
                let a = self.regs.read_fpr_f64(d.rs1 as usize);
                let rm = self.resolve_rm(d.rm);
                let bits = if matches!(d.op, FcvtWD | FcvtWuD) { 32 } else { 64 };
                let (value, flags) = if matches!(d.op, FcvtWD | FcvtLD) {
                    fpu::cvt_to_signed(a, bits, rm)
                } else {
                    fpu::cvt_to_unsigned(a, bits, rm)
                };
                self.track_gpr(delta, d.rd as usize, value);
                self.accrue_fflags(delta, flags);
            }
            FcvtSW | FcvtSWu | FcvtSL | FcvtSLu => {
                let rm = self.resolve_rm(d.rm);
                let raw = self.regs.read_gpr(d.rs1 as usize);
                let widened: i128 = match d.op {
                    FcvtSW => (raw as i32) as i128,
                    FcvtSWu => (raw as u32) as i128,
                    FcvtSL => (raw as i64) as i128,
                    FcvtSLu => raw as i128,
                    _ => unreachable!(),
                };
                let r = fpu::cvt_int_to_f32(widened, rm);
                self.track_fpr_f32(delta, d.rd as usize, r.value);
                self.accrue_fflags(delta, r.flags);
            }
            FcvtDW | FcvtDWu | FcvtDL | FcvtDLu => {
                let rm = self.resolve_rm(d.rm);
                let raw = self.regs.read_gpr(d.rs1 as usize);
                let widened: i128 = match d.op {
                    FcvtDW => (raw as i32) as i128,
                    FcvtDWu => (raw as u32) as i128,
                    FcvtDL => (raw as i64) as i128,
                    FcvtDLu => raw as i128,
                    _ => unreachable!(),
                };
                let r = fpu::cvt_int_to_f64(widened, rm);
                self.track_fpr_f64(delta, d.rd as usize, r.value);
                self.accrue_fflags(delta, r.flags);
            }
            FcvtSD => {
                let a = self.regs.read_fpr_f64(d.rs1 as usize);
                let rm = self.resolve_rm(d.rm);
                let r = fpu::narrow_to_f32(a, rm);
                self.track_fpr_f32(delta, d.rd as usize, r.value);
                self.accrue_fflags(delta, r.flags);
            }
            FcvtDS => {
                let a = self.regs.read_fpr_f32(d.rs1 as usize);
                let r = fpu::widen_to_f64(a);
                self.track_fpr_f64(delta, d.rd as usize, r.value);
                self.accrue_fflags(delta, r.flags);
            }
            FmvXW => {
                let bits = self.regs.read_fpr(d.rs1 as usize) as u32;
                self.track_gpr(delta, d.rd as usize, (bits as i32 as i64) as u64);
            }
            FmvWX => {
                let bits = self.regs.read_gpr(d.rs1 as usize) as u32;
                self.track_fpr_f32(delta, d.rd as usize, f32::from_bits(bits));
            }
            FmvXD => {
                let bits = self.regs.read_fpr(d.rs1 as usize);
                self.track_gpr(delta, d.rd as usize, bits);
            }
            FmvDX => {
                let bits = self.regs.read_gpr(d.rs1 as usize);
                self.track_fpr(delta, d.rd as usize, bits);
            }
            Ecall => {
                let outcome = syscall::dispatch(&mut self.regs, &mut self.memory, &self.input, delta)?;
                if let SyscallOutcome::Exit(code) = outcome {
                    info!("program exited with code {}", code);
                    self.exit_code = Some(code);
                }
            }
            _ => unreachable!("{:?} is handled by alu_op_for/fp_op_for", d.op),
        }
        Ok(())
    }

    fn write_bank(&mut self, bank: RegisterBank, index: usize, value: u64) {
        match bank {
            RegisterBank::Gpr => {
                if index != 0 {
                    self.regs.write_gpr(index, value);
                }
            }
            RegisterBank::Fpr => self.regs.write_fpr(index, value),
            RegisterBank::Csr => self.regs.write_csr(index, value),
        }
    }

    pub fn undo(&mut self) -> Option<StepDelta> {
        let delta = self.history.pop_undo()?;
        for rc in delta.register_changes.iter().rev() {
            self.write_bank(rc.bank, rc.index, rc.old_value);
        }
        for mc in delta.memory_changes.iter().rev() {
            let _ = self.memory.write_bytes(mc.address, &mc.old_bytes);
        }
        self.pc = delta.old_pc;
        self.instructions_retired = self.instructions_retired.saturating_sub(1);
        Some(delta)
    }

    pub fn redo(&mut self) -> Option<StepDelta> {
        let delta = self.history.pop_redo()?;
        for rc in &delta.register_changes {
            self.write_bank(rc.bank, rc.index, rc.new_value);
        }
        for mc in &delta.memory_changes {
            let _ = self.memory.write_bytes(mc.address, &mc.new_bytes);
        }
        self.pc = delta.new_pc;
        self.instructions_retired += 1;
        Some(delta)
    }

    fn past_end_of_text(&self) -> bool {
        self.text_len != 0 && self.pc >= self.text_base + self.text_len
    }

    /// Repeated `step()` until end-of-text, a stop request, an exit
    /// syscall, or the instruction-execution limit.
    pub fn run(&mut self) -> Result<StopReason, StepError> {
        let mut retired_this_call = 0u64;
        loop {
            if self.stop_requested {
                self.stop_requested = false;
                return Ok(StopReason::StopRequested);
            }
            if self.past_end_of_text() {
                return Ok(StopReason::EndOfText);
            }
            if retired_this_call >= self.instruction_execution_limit {
                return Ok(StopReason::InstructionLimitReached);
            }
            self.step()?;
            retired_this_call += 1;
            if let Some(code) = self.exit_code.take() {
                return Ok(StopReason::Exited(code));
            }
        }
    }

    /// Like `run()`, but halts before executing a breakpointed instruction
    /// and sleeps `run_step_delay` between steps.
    pub fn debug_run(&mut self) -> Result<StopReason, StepError> {
        let mut retired_this_call = 0u64;
        loop {
            if self.stop_requested {
                self.stop_requested = false;
                return Ok(StopReason::StopRequested);
            }
            if self.past_end_of_text() {
                return Ok(StopReason::EndOfText);
            }
            if self.breakpoints.contains(&self.pc) {
                info!("breakpoint hit at {:#x}", self.pc);
                return Ok(StopReason::BreakpointHit(self.pc));
            }
            if retired_this_call >= self.instruction_execution_limit {
                return Ok(StopReason::InstructionLimitReached);
            }
            self.step()?;
            retired_this_call += 1;
            if let Some(code) = self.exit_code.take() {
                return Ok(StopReason::Exited(code));
            }
            if !self.run_step_delay.is_zero() {
                thread::sleep(self.run_step_delay);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::isa::encoding;

    fn encode_r(op: Op, rd: u8, rs1: u8, rs2: u8) -> u32 {
        let e = encoding(op);
        (e.funct7.unwrap() << 25) | ((rs2 as u32) << 20) | ((rs1 as u32) << 15) | (e.funct3.unwrap() << 12) | ((rd as u32) << 7) | e.opcode
    }

    fn encode_i(op: Op, rd: u8, rs1: u8, imm: u32) -> u32 {
        let e = encoding(op);
        ((imm & 0xFFF) << 20) | ((rs1 as u32) << 15) | (e.funct3.unwrap() << 12) | ((rd as u32) << 7) | e.opcode
    }

    fn encode_b(op: Op, rs1: u8, rs2: u8, imm: i32) -> u32 {
        let e = encoding(op);
        let imm = imm as u32;
        let b12 = (imm >> 12) & 1;
        let b11 = (imm >> 11) & 1;
        let b10_5 = (imm >> 5) & 0b111111;
        let b4_1 = (imm >> 1) & 0b1111;
        (b12 << 31) | (b10_5 << 25) | ((rs2 as u32) << 20) | ((rs1 as u32) << 15) | (e.funct3.unwrap() << 12) | (b4_1 << 8) | (b11 << 7) | e.opcode
    }

    fn encode_j(op: Op, rd: u8, imm: i32) -> u32 {
        let e = encoding(op);
        let imm = imm as u32;
        let b20 = (imm >> 20) & 1;
        let b19_12 = (imm >> 12) & 0xFF;
        let b11 = (imm >> 11) & 1;
        let b10_1 = (imm >> 1) & 0x3FF;
        (b20 << 31) | (b10_1 << 21) | (b11 << 20) | (b19_12 << 12) | ((rd as u32) << 7) | e.opcode
    }

    fn new_processor(words: &[u32]) -> Processor {
        let mut p = Processor::new(Memory::new(1 << 20));
        p.load_text(0, words).unwrap();
        p
    }

    #[test]
    fn arithmetic_and_branch_scenario() {
        // addi x10,x0,3 / addi x11,x0,4 / add x12,x10,x11 / beq x12,x12,END / addi x13,x0,99 / END:
        let words = [
            encode_i(Op::Addi, 10, 0, 3),
            encode_i(Op::Addi, 11, 0, 4),
            encode_r(Op::Add, 12, 10, 11),
            encode_b(Op::Beq, 12, 12, 8),
            encode_i(Op::Addi, 13, 0, 99),
        ];
        let mut p = new_processor(&words);
        p.set_instruction_execution_limit(100);
        let reason = p.run().unwrap();
        assert_eq!(reason, StopReason::EndOfText);
        assert_eq!(p.registers().read_gpr(12), 7);
        assert_eq!(p.registers().read_gpr(13), 0);
        assert_eq!(p.instructions_retired(), 4);
    }

    #[test]
    fn load_store_round_trip_scenario() {
        // lui x10,0x10000 / addi x11,x0,-1 / sd x11,0(x10) / ld x12,0(x10)
        let words = [
            (0x10000u32 << 12) | (10 << 7) | encoding(Op::Lui).opcode,
            encode_i(Op::Addi, 11, 0, 0xFFF),
            {
                let e = encoding(Op::Sd);
                (11u32 << 20) | (10 << 15) | (e.funct3.unwrap() << 12) | e.opcode
            },
            encode_i(Op::Ld, 12, 10, 0),
        ];
        let mut p = Processor::new(Memory::new(0x2000_0000));
        p.load_text(0, &words).unwrap();
        let reason = p.run().unwrap();
        assert_eq!(reason, StopReason::EndOfText);
        assert_eq!(p.registers().read_gpr(12), u64::MAX);
    }

    #[test]
    fn jal_sets_return_address() {
        // jal x1, +8 / addi x10,x0,1 / addi x10,x0,2
        let jal_word = encode_j(Op::Jal, 1, 8);
        let words = [jal_word, encode_i(Op::Addi, 10, 0, 1), encode_i(Op::Addi, 10, 0, 2)];
        let mut p = new_processor(&words);
        p.run().unwrap();
        assert_eq!(p.registers().read_gpr(1), 4);
        assert_eq!(p.registers().read_gpr(10), 2);
    }

    #[test]
    fn undo_then_redo_restores_state() {
        let words = [encode_i(Op::Addi, 5, 0, 42)];
        let mut p = new_processor(&words);
        p.step().unwrap();
        assert_eq!(p.registers().read_gpr(5), 42);
        p.undo();
        assert_eq!(p.registers().read_gpr(5), 0);
        assert_eq!(p.pc(), 0);
        p.redo();
        assert_eq!(p.registers().read_gpr(5), 42);
        assert_eq!(p.pc(), 4);
    }

    #[test]
    fn ten_step_undo_redo_consistency() {
        let words: Vec<u32> = (0..10).map(|i| encode_i(Op::Addi, i + 1, 0, i as u32 + 1)).collect();
        let mut p = new_processor(&words);
        p.run().unwrap();
        for i in 1..=10u64 {
            assert_eq!(p.registers().read_gpr(i as usize), i);
        }
        for _ in 0..10 {
            p.undo();
        }
        for i in 1..=10usize {
            assert_eq!(p.registers().read_gpr(i), 0);
        }
        assert_eq!(p.pc(), 0);
        for _ in 0..10 {
            p.redo();
        }
        for i in 1..=10u64 {
            assert_eq!(p.registers().read_gpr(i as usize), i);
        }
        assert_eq!(p.pc(), 40);
    }

    #[test]
    fn instruction_execution_limit_stops_run_early() {
        let words: Vec<u32> = (0..5).map(|i| encode_i(Op::Addi, i + 1, 0, 1)).collect();
        let mut p = new_processor(&words);
        p.set_instruction_execution_limit(2);
        let reason = p.run().unwrap();
        assert_eq!(reason, StopReason::InstructionLimitReached);
        assert_eq!(p.instructions_retired(), 2);
    }

    #[test]
    fn breakpoint_halts_debug_run_before_executing() {
        let words: Vec<u32> = (0..3).map(|i| encode_i(Op::Addi, i + 1, 0, 1)).collect();
        let mut p = new_processor(&words);
        p.add_breakpoint(4);
        let reason = p.debug_run().unwrap();
        assert_eq!(reason, StopReason::BreakpointHit(4));
        assert_eq!(p.instructions_retired(), 1);
    }

    #[test]
    fn exit_syscall_reports_exit_code() {
        let e = encoding(Op::Ecall);
        let words = [
            encode_i(Op::Addi, 17, 0, 93), // a7 = 93 (exit)
            encode_i(Op::Addi, 10, 0, 5),  // a0 = 5
            e.opcode,
        ];
        let mut p = new_processor(&words);
        let reason = p.run().unwrap();
        assert_eq!(reason, StopReason::Exited(5));
    }
}
