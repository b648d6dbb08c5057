//! Session state for the interactive shell: owns the (optional) loaded
//! `Processor`, the assembler's source map, and the fixed state
//! directory persisted state is written to. One [`Session::dispatch`]
//! call per [`Command`](crate::command::Command), one `VM_*` status tag
//! printed per effect (§6 "Status events").
//!
//! Grounded on `rvcore::processor::Processor`'s own `run`/`debug_run`
//! loop (4.H/4.I) for the run/debug/step semantics, generalized here so
//! the command layer can also bracket the `step` command's syscall IO
//! with `VM_STDOUT_START/END`/`VM_STDIN_START/END` by peeking the next
//! decoded instruction before executing it — `run`/`debug_run` execute
//! many instructions per call and don't offer that peek point, so this
//! bracketing is only attempted at the single-instruction granularity.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use rvcore::isa::Op;
use rvcore::{Processor, Storage, StopReason};
use rvconfig::VmConfig;

const ROW_WIDTH: u64 = 16;
const REG_A7: usize = 17;

fn render_diagnostics(diagnostics: &[rvasm::Diagnostic]) -> String {
    diagnostics.iter().map(|d| d.to_string()).collect::<Vec<_>>().join("\n")
}

fn format_row(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect::<Vec<_>>().join(" ")
}

/// Resolves a breakpoint argument: a `0x`-prefixed literal is a text
/// address; anything else is a source line, translated via the
/// assembler's source map (one entry per emitted word).
fn resolve_breakpoint_arg(arg: &str, source_map: &[rvasm::SourceMapItem], text_base: u64) -> Option<u64> {
    if let Some(hex) = arg.strip_prefix("0x") {
        return u64::from_str_radix(hex, 16).ok();
    }
    let line: u32 = arg.parse().ok()?;
    source_map
        .iter()
        .position(|item| line >= item.start_line && line < item.start_line + item.line_count.max(1))
        .map(|index| text_base + (index as u64) * 4)
}

pub struct Session {
    processor: Option<Processor>,
    source_map: Vec<rvasm::SourceMapItem>,
    text_base: u64,
    config: VmConfig,
    state_dir: PathBuf,
    last_load_errors: String,
}

impl Session {
    pub fn new(config: VmConfig, state_dir: PathBuf) -> Session {
        Session {
            processor: None,
            source_map: Vec::new(),
            text_base: config.text_section_start,
            config,
            state_dir,
            last_load_errors: String::new(),
        }
    }

    fn processor_mut(&mut self) -> Result<&mut Processor> {
        self.processor.as_mut().ok_or_else(|| anyhow::anyhow!("no program loaded"))
    }

    pub fn load(&mut self, path: &str) -> Result<()> {
        let path = Path::new(path);
        let (executable, source_map) = if path.extension().map_or(false, |e| e == "rvx") {
            let exe = rvx::read_file(path).with_context(|| format!("reading {}", path.display()))?;
            (exe, Vec::new())
        } else {
            let source = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            let data_offset = self.config.data_section_start as u32;
            match rvasm::assemble_addressed(&source, data_offset) {
                Ok((exe, map)) => (exe, map),
                Err(diagnostics) => {
                    self.last_load_errors = render_diagnostics(&diagnostics);
                    anyhow::bail!("assembly of \"{}\" failed:\n{}", path.display(), self.last_load_errors);
                }
            }
        };

        let memory = rvcore::Memory::with_block_size(self.config.memory_size, self.config.memory_block_size);
        let mut processor = Processor::new(memory);
        processor.set_instruction_execution_limit(self.config.instruction_execution_limit);
        processor.set_run_step_delay(Duration::from_millis(self.config.run_step_delay_ms));

        let words: Vec<u32> = executable
            .instructions()
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        processor.load_text(self.config.text_section_start, &words)?;
        if !executable.data().is_empty() {
            processor.memory_mut().write_bytes(executable.data_offset() as u64, executable.data())?;
        }

        self.processor = Some(processor);
        self.source_map = source_map;
        self.text_base = self.config.text_section_start;
        self.last_load_errors.clear();
        println!("VM_STARTED");
        Ok(())
    }

    fn report_stop(&self, reason: StopReason) {
        match reason {
            StopReason::EndOfText => println!("VM_PROGRAM_END"),
            StopReason::InstructionLimitReached => println!("VM_LAST_INSTRUCTION_STEPPED"),
            StopReason::BreakpointHit(addr) => println!("VM_BREAKPOINT_HIT {:#x}", addr),
            StopReason::Exited(code) => println!("VM_EXIT {}", code),
            StopReason::StopRequested => println!("VM_PROGRAM_END"),
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let reason = self.processor_mut()?.run()?;
        self.report_stop(reason);
        Ok(())
    }

    pub fn debug(&mut self) -> Result<()> {
        let reason = self.processor_mut()?.debug_run()?;
        self.report_stop(reason);
        Ok(())
    }

    /// Executes exactly one instruction, bracketing host-visible syscall
    /// IO with `VM_STDOUT_START/END`/`VM_STDIN_START/END` when the
    /// about-to-execute word is an `ecall`.
    pub fn step(&mut self) -> Result<()> {
        let processor = self.processor_mut()?;
        let pc = processor.pc();
        let peeked = processor.memory().read_word(pc).ok().and_then(|w| rvcore::decode::decode(w).ok());
        let syscall_number =
            peeked.filter(|d| d.op == Op::Ecall).map(|_| processor.registers().read_gpr(REG_A7));

        let wraps_stdin = syscall_number == Some(5);
        let wraps_stdout = matches!(syscall_number, Some(1) | Some(2) | Some(3) | Some(4) | Some(6));
        if wraps_stdin {
            println!("VM_STDIN_START");
        } else if wraps_stdout {
            println!("VM_STDOUT_START");
        }

        processor.step()?;

        if wraps_stdin {
            println!("VM_STDIN_END");
        } else if wraps_stdout {
            println!("VM_STDOUT_END");
        }

        if let Some(code) = processor.take_exit_code() {
            println!("VM_EXIT {}", code);
        } else {
            println!("VM_STEP_COMPLETED");
        }
        Ok(())
    }

    pub fn undo(&mut self) -> Result<()> {
        match self.processor_mut()?.undo() {
            Some(_) => println!("VM_UNDO_COMPLETED"),
            None => println!("VM_NO_MORE_UNDO"),
        }
        Ok(())
    }

    pub fn redo(&mut self) -> Result<()> {
        match self.processor_mut()?.redo() {
            Some(_) => println!("VM_UNDO_COMPLETED"),
            None => println!("VM_NO_MORE_REDO"),
        }
        Ok(())
    }

    pub fn reset(&mut self) -> Result<()> {
        self.processor_mut()?.reset();
        Ok(())
    }

    pub fn add_breakpoint(&mut self, arg: &str) -> Result<()> {
        let text_base = self.text_base;
        let source_map = self.source_map.clone();
        let address = resolve_breakpoint_arg(arg, &source_map, text_base)
            .ok_or_else(|| anyhow::anyhow!("\"{}\" is not a valid address or source line", arg))?;
        self.processor_mut()?.add_breakpoint(address);
        println!("breakpoint set at {:#x}", address);
        Ok(())
    }

    pub fn remove_breakpoint(&mut self, arg: &str) -> Result<()> {
        let text_base = self.text_base;
        let source_map = self.source_map.clone();
        let address = resolve_breakpoint_arg(arg, &source_map, text_base)
            .ok_or_else(|| anyhow::anyhow!("\"{}\" is not a valid address or source line", arg))?;
        self.processor_mut()?.remove_breakpoint(address);
        println!("breakpoint removed at {:#x}", address);
        Ok(())
    }

    pub fn modify_register(&mut self, name: &str, value: u64) -> Result<()> {
        if !self.processor_mut()?.modify_register(name, value) {
            anyhow::bail!("\"{}\" is not a valid register name", name);
        }
        Ok(())
    }

    pub fn dump_mem(&mut self, address: u64, rows: u64) -> Result<()> {
        let rendered = {
            let processor = self.processor_mut()?;
            processor
                .memory()
                .snapshot_rows(address, rows, ROW_WIDTH)
                .into_iter()
                .enumerate()
                .map(|(i, row)| format!("{:#010x}  {}", address + i as u64 * ROW_WIDTH, format_row(&row)))
                .collect::<Vec<_>>()
                .join("\n")
        };
        self.write_state_file("memory.dump", &rendered)
    }

    pub fn print_mem(&mut self, windows: &[(u64, u64)]) -> Result<()> {
        let processor = self.processor_mut()?;
        for &(address, rows) in windows {
            for (i, row) in processor.memory().snapshot_rows(address, rows, ROW_WIDTH).into_iter().enumerate() {
                println!("{:#010x}  {}", address + i as u64 * ROW_WIDTH, format_row(&row));
            }
        }
        Ok(())
    }

    fn write_state_file(&self, name: &str, contents: &str) -> Result<()> {
        fs::create_dir_all(&self.state_dir)
            .with_context(|| format!("creating state directory {}", self.state_dir.display()))?;
        let path = self.state_dir.join(name);
        let mut file = fs::File::create(&path).with_context(|| format!("writing {}", path.display()))?;
        file.write_all(contents.as_bytes())?;
        Ok(())
    }

    /// Persists the fixed-directory dump set (§6 "Persisted state") on
    /// `exit`: configuration, the last load's errors (if any), a
    /// registers dump, a coarse memory summary, an (empty, per the
    /// MMU-cache non-goal) cache dump, and an overall VM-state dump.
    pub fn persist_vm_state(&mut self) -> Result<()> {
        self.write_state_file("config.dump", &format!("{:#?}", self.config))?;
        let errors = self.last_load_errors.clone();
        self.write_state_file("errors.dump", &errors)?;
        self.write_state_file("cache.dump", "")?;

        if let Some(processor) = &self.processor {
            let snapshot = processor.snapshot();
            let registers = format!(
                "pc={:#x}\ngpr={:?}\nfpr={:?}\nfflags={:#x}\nfrm={:#x}\n",
                snapshot.pc, snapshot.gpr, snapshot.fpr, snapshot.fflags, snapshot.frm
            );
            self.write_state_file("registers.dump", &registers)?;

            let memory = format!(
                "allocated_blocks={}\nmemory_size={}\nblock_size={}\n",
                processor.memory().allocated_blocks(),
                self.config.memory_size,
                self.config.memory_block_size
            );
            self.write_state_file("memory.dump", &memory)?;

            let vmstate = format!(
                "pc={:#x}\ncycles={}\ninstructions_retired={}\nstatus_tag=VM_EXIT\n",
                snapshot.pc, snapshot.cycles, snapshot.instructions_retired
            );
            self.write_state_file("vmstate.dump", &vmstate)
        } else {
            self.write_state_file("registers.dump", "")?;
            self.write_state_file("memory.dump", "")?;
            self.write_state_file("vmstate.dump", "status_tag=VM_EXIT\n")
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("rvsim-test-{}-{}", name, std::process::id()))
    }

    fn write_source(dir: &Path, name: &str, body: &str) -> String {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        path.to_str().unwrap().to_string()
    }

    #[test]
    fn breakpoint_arg_accepts_hex_address_and_source_line() {
        let map = vec![
            rvasm::SourceMapItem { start_line: 1, line_count: 1 },
            rvasm::SourceMapItem { start_line: 2, line_count: 1 },
        ];
        assert_eq!(resolve_breakpoint_arg("0x8", &map, 0), Some(8));
        assert_eq!(resolve_breakpoint_arg("2", &map, 0), Some(4));
        assert_eq!(resolve_breakpoint_arg("bogus", &map, 0), None);
    }

    #[test]
    fn load_run_and_exit_round_trip_through_a_state_dir() {
        let dir = temp_dir("load-run-exit");
        fs::create_dir_all(&dir).unwrap();
        let program = write_source(&dir, "prog.s", "addi x5, x0, 7\naddi x17, x0, 93\naddi x10, x0, 0\necall\n");

        let mut session = Session::new(VmConfig::default(), dir.join("state"));
        session.load(&program).unwrap();
        session.run().unwrap();
        session.persist_vm_state().unwrap();

        assert!(dir.join("state").join("vmstate.dump").exists());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn commands_before_load_report_no_program_loaded() {
        let dir = temp_dir("no-program");
        let mut session = Session::new(VmConfig::default(), dir.clone());
        assert!(session.run().is_err());
        assert!(session.step().is_err());
        fs::remove_dir_all(&dir).ok();
    }
}
