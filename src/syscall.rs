//! Syscall layer (4.J): the small, fixed table of host-mediated services
//! a running program can invoke via `ecall`.
//!
//! Grounded on `original_source/src/vm/syscalls.h`'s dispatch-by-`a7`
//! shape, narrowed to the seven numbers this core actually supports.

use crate::history::StepDelta;
use crate::memory::StorageMut;
use crate::registers::RegisterFile;
use log::warn;
use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Arc, Condvar, Mutex};

const REG_A0: usize = 10;
const REG_A1: usize = 11;
const REG_A2: usize = 12;
const REG_A7: usize = 17;

#[derive(Clone, Copy, PartialEq, Eq, Debug, thiserror::Error)]
pub enum SyscallError {
    #[error("syscall number {0} is not recognized")]
    UnknownSyscall(u64),
    #[error("syscall {0} does not support file descriptor {1}")]
    UnsupportedFd(&'static str, u64),
    #[error("syscall touched memory out of range")]
    BadMemoryAccess,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SyscallOutcome {
    Continue,
    Exit(i64),
}

/// Bounded FIFO of host-submitted input lines, with a blocking `take()`.
/// The external command shell calls `submit`; the read-line syscall
/// calls `take`, which parks the execution thread until a line arrives.
#[derive(Clone)]
pub struct InputQueue {
    inner: Arc<(Mutex<VecDeque<String>>, Condvar)>,
}

impl InputQueue {
    pub fn new() -> InputQueue {
        InputQueue {
            inner: Arc::new((Mutex::new(VecDeque::new()), Condvar::new())),
        }
    }

    pub fn submit(&self, line: String) {
        let (lock, condvar) = &*self.inner;
        lock.lock().unwrap().push_back(line);
        condvar.notify_one();
    }

    pub fn take(&self) -> String {
        let (lock, condvar) = &*self.inner;
        let mut queue = lock.lock().unwrap();
        while queue.is_empty() {
            queue = condvar.wait(queue).unwrap();
        }
        queue.pop_front().unwrap()
    }
}

impl Default for InputQueue {
    fn default() -> InputQueue {
        InputQueue::new()
    }
}

fn read_cstring(mem: &dyn crate::memory::Storage, address: u64) -> Result<Vec<u8>, SyscallError> {
    let mut bytes = Vec::new();
    let mut addr = address;
    loop {
        let b = mem.read_byte(addr).map_err(|_| SyscallError::BadMemoryAccess)?;
        if b == 0 {
            return Ok(bytes);
        }
        bytes.push(b);
        addr += 1;
    }
}

fn write_bytes_tracked(
    mem: &mut dyn StorageMut,
    address: u64,
    bytes: &[u8],
    delta: &mut StepDelta,
) -> Result<(), SyscallError> {
    let old = mem
        .read_bytes(address, bytes.len() as u64)
        .map_err(|_| SyscallError::BadMemoryAccess)?;
    mem.write_bytes(address, bytes)
        .map_err(|_| SyscallError::BadMemoryAccess)?;
    delta.push_memory_change(address, old, bytes.to_vec());
    Ok(())
}

/// Executes the syscall named by `a7`, mutating registers and memory in
/// place and recording every memory write into `delta` for undo.
pub fn dispatch(
    regs: &mut RegisterFile,
    mem: &mut dyn StorageMut,
    input: &InputQueue,
    delta: &mut StepDelta,
) -> Result<SyscallOutcome, SyscallError> {
    let number = regs.read_gpr(REG_A7);
    let a0 = regs.read_gpr(REG_A0);

    match number {
        1 => {
            println!("{}", a0 as i64);
            Ok(SyscallOutcome::Continue)
        }
        2 => {
            println!("{}", f32::from_bits(a0 as u32));
            Ok(SyscallOutcome::Continue)
        }
        3 => {
            println!("{}", f64::from_bits(a0));
            Ok(SyscallOutcome::Continue)
        }
        4 => {
            let bytes = read_cstring(mem, a0)?;
            io::stdout().write_all(&bytes).ok();
            Ok(SyscallOutcome::Continue)
        }
        5 => {
            let fd = a0;
            if fd != 0 {
                warn!("read line syscall given unsupported fd {}", fd);
                return Err(SyscallError::UnsupportedFd("read line", fd));
            }
            let buffer_addr = regs.read_gpr(REG_A1);
            let max_len = regs.read_gpr(REG_A2) as usize;
            let line = input.take();
            let mut bytes: Vec<u8> = line.into_bytes();
            bytes.truncate(max_len.saturating_sub(1).max(0));
            let written = bytes.len();
            if written < max_len {
                bytes.push(0);
            }
            write_bytes_tracked(mem, buffer_addr, &bytes, delta)?;
            regs.write_gpr(REG_A0, written as u64);
            Ok(SyscallOutcome::Continue)
        }
        6 => {
            let fd = a0;
            if fd != 1 {
                warn!("write syscall given unsupported fd {}", fd);
                return Err(SyscallError::UnsupportedFd("write", fd));
            }
            let buffer_addr = regs.read_gpr(REG_A1);
            let len = regs.read_gpr(REG_A2);
            let bytes = mem
                .read_bytes(buffer_addr, len)
                .map_err(|_| SyscallError::BadMemoryAccess)?;
            io::stdout().write_all(&bytes).ok();
            regs.write_gpr(REG_A0, bytes.len() as u64);
            Ok(SyscallOutcome::Continue)
        }
        93 => Ok(SyscallOutcome::Exit(a0 as i64)),
        other => {
            warn!("unknown syscall number {}", other);
            Err(SyscallError::UnknownSyscall(other))
        }
    }
}

/// Reads one line from the process's real standard input. A convenience
/// for a CLI front end that wires `InputQueue` straight to the terminal
/// rather than an interactive shell's own command loop.
pub fn pump_stdin_once(input: &InputQueue) -> io::Result<()> {
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    input.submit(line);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::memory::Memory;

    fn regs_with_syscall(number: u64, a0: u64, a1: u64, a2: u64) -> RegisterFile {
        let mut r = RegisterFile::new();
        r.write_gpr(REG_A7, number);
        r.write_gpr(REG_A0, a0);
        r.write_gpr(REG_A1, a1);
        r.write_gpr(REG_A2, a2);
        r
    }

    #[test]
    fn exit_syscall_reports_exit_code() {
        let mut regs = regs_with_syscall(93, 7, 0, 0);
        let mut mem = Memory::new(4096);
        let input = InputQueue::new();
        let mut delta = StepDelta::new(0, 4);
        let outcome = dispatch(&mut regs, &mut mem, &input, &mut delta).unwrap();
        assert_eq!(outcome, SyscallOutcome::Exit(7));
    }

    #[test]
    fn read_line_blocks_until_submitted_and_records_memory_change() {
        let input = InputQueue::new();
        input.submit("hi".to_string());
        let mut regs = regs_with_syscall(5, 0, 100, 16);
        let mut mem = Memory::new(4096);
        let mut delta = StepDelta::new(0, 4);
        let outcome = dispatch(&mut regs, &mut mem, &input, &mut delta).unwrap();
        assert_eq!(outcome, SyscallOutcome::Continue);
        assert_eq!(regs.read_gpr(REG_A0), 2);
        assert_eq!(mem.read_byte(100).unwrap(), b'h');
        assert_eq!(mem.read_byte(101).unwrap(), b'i');
        assert_eq!(mem.read_byte(102).unwrap(), 0);
        assert_eq!(delta.memory_changes.len(), 1);
    }

    #[test]
    fn write_syscall_rejects_non_stdout_fd() {
        let mut regs = regs_with_syscall(6, 2, 0, 0);
        let mut mem = Memory::new(4096);
        let input = InputQueue::new();
        let mut delta = StepDelta::new(0, 4);
        assert!(dispatch(&mut regs, &mut mem, &input, &mut delta).is_err());
    }

    #[test]
    fn unknown_syscall_number_is_an_error() {
        let mut regs = regs_with_syscall(999, 0, 0, 0);
        let mut mem = Memory::new(4096);
        let input = InputQueue::new();
        let mut delta = StepDelta::new(0, 4);
        assert!(dispatch(&mut regs, &mut mem, &input, &mut delta).is_err());
    }
}
