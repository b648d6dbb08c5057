#[macro_use]
extern crate clap;

mod command;
mod session;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Arg;

use command::{parse_line, Command};
use session::Session;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let matches = app_from_crate!()
        .arg(
            Arg::with_name("program")
                .help("Assembly source (.s) or assembled object (.rvx) to load at startup")
                .index(1),
        )
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .takes_value(true)
                .value_name("FILE")
                .help("INI-style VmConfig file (§4.L)"),
        )
        .arg(
            Arg::with_name("state_dir")
                .short("s")
                .long("state-dir")
                .takes_value(true)
                .value_name("DIR")
                .help("Directory for persisted dumps (default: ./vm-state)"),
        )
        .arg(
            Arg::with_name("limit")
                .long("limit")
                .takes_value(true)
                .value_name("COUNT")
                .help("Instruction execution limit"),
        )
        .arg(
            Arg::with_name("block_size")
                .long("block-size")
                .takes_value(true)
                .value_name("BYTES")
                .help("Memory block size"),
        )
        .arg(
            Arg::with_name("data_base")
                .long("data-base")
                .takes_value(true)
                .value_name("ADDR")
                .help("Data section base address"),
        )
        .arg(
            Arg::with_name("batch")
                .long("batch")
                .help("Load the program, run it to completion, and exit (skips the interactive shell)"),
        )
        .get_matches();

    let mut config = match matches.value_of("config") {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("reading config {}", path))?;
            rvconfig::parse_ini(&text).with_context(|| format!("parsing config {}", path))?
        }
        None => rvconfig::VmConfig::default(),
    };
    if let Some(limit) = matches.value_of("limit") {
        config.instruction_execution_limit = limit.parse().with_context(|| "parsing --limit")?;
    }
    if let Some(block_size) = matches.value_of("block_size") {
        config.memory_block_size = block_size.parse().with_context(|| "parsing --block-size")?;
    }
    if let Some(data_base) = matches.value_of("data_base") {
        config.data_section_start = parse_addr(data_base).with_context(|| "parsing --data-base")?;
    }

    let state_dir = matches.value_of("state_dir").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("vm-state"));
    let mut session = Session::new(config, state_dir);

    if let Some(program) = matches.value_of("program") {
        session.load(program)?;
    }

    if matches.is_present("batch") {
        session.run()?;
        return Ok(());
    }

    run_shell(&mut session)
}

fn parse_addr(text: &str) -> anyhow::Result<u64> {
    if let Some(hex) = text.strip_prefix("0x") {
        Ok(u64::from_str_radix(hex, 16)?)
    } else {
        Ok(text.parse()?)
    }
}

/// The interactive command surface (§6): one line of input per command,
/// one `VM_*` status tag (or plain diagnostic text) of output per
/// effect. Runs until `exit` or end-of-input.
fn run_shell(session: &mut Session) -> anyhow::Result<()> {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("reading command")?;
        let command = match parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };

        let is_exit = command == Command::Exit;
        if let Err(e) = dispatch(session, command) {
            eprintln!("{}", e);
        }
        io::stdout().flush().ok();
        if is_exit {
            break;
        }
    }
    Ok(())
}

fn dispatch(session: &mut Session, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Load(path) => session.load(&path),
        Command::Run => session.run(),
        Command::Debug => session.debug(),
        Command::Step => session.step(),
        Command::Undo => session.undo(),
        Command::Redo => session.redo(),
        Command::Reset => session.reset(),
        Command::AddBreakpoint(arg) => session.add_breakpoint(&arg),
        Command::RemoveBreakpoint(arg) => session.remove_breakpoint(&arg),
        Command::ModifyRegister(name, value) => session.modify_register(&name, value),
        Command::DumpMem(address, rows) => session.dump_mem(address, rows),
        Command::PrintMem(windows) => session.print_mem(&windows),
        Command::Exit => {
            session.persist_vm_state()?;
            println!("VM_EXIT");
            Ok(())
        }
    }
}
