//! Command-line grammar for the interactive shell (§6 "Command surface").
//! One line in, one [`Command`] out; arity and integer-literal mistakes
//! are reported as a [`CommandError`] rather than panicking, since a
//! malformed line from the external shell shouldn't kill the session.

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Load(String),
    Run,
    Debug,
    Step,
    Undo,
    Redo,
    Reset,
    AddBreakpoint(String),
    RemoveBreakpoint(String),
    ModifyRegister(String, u64),
    DumpMem(u64, u64),
    PrintMem(Vec<(u64, u64)>),
    Exit,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command \"{0}\"")]
    Unknown(String),
    #[error("\"{0}\" expects {1}")]
    WrongArity(String, &'static str),
    #[error("\"{0}\" is not a valid integer")]
    InvalidInteger(String),
}

fn parse_int(token: &str) -> Result<u64, CommandError> {
    let t = token.trim();
    let parsed = if let Some(hex) = t.strip_prefix("0x") {
        u64::from_str_radix(hex, 16)
    } else {
        t.parse::<u64>()
    };
    parsed.map_err(|_| CommandError::InvalidInteger(token.to_string()))
}

fn arg<'a>(args: &[&'a str], index: usize, name: &str, usage: &'static str) -> Result<&'a str, CommandError> {
    args.get(index).copied().ok_or_else(|| CommandError::WrongArity(name.to_string(), usage))
}

/// Parses one line of shell input. Blank lines (and comment-only lines
/// starting with `#`) yield `Ok(None)` so the caller can skip them
/// silently rather than reporting "unknown command \"\"".
pub fn parse_line(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.split('#').next().unwrap_or("").trim();
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let (name, args) = match tokens.split_first() {
        Some((n, a)) => (*n, a),
        None => return Ok(None),
    };

    Ok(Some(match name {
        "load" => Command::Load(arg(args, 0, name, "a path")?.to_string()),
        "run" => Command::Run,
        "debug" => Command::Debug,
        "step" => Command::Step,
        "undo" => Command::Undo,
        "redo" => Command::Redo,
        "reset" => Command::Reset,
        "add_breakpoint" => Command::AddBreakpoint(arg(args, 0, name, "an address or line")?.to_string()),
        "remove_breakpoint" => Command::RemoveBreakpoint(arg(args, 0, name, "an address or line")?.to_string()),
        "modify_register" => {
            let reg = arg(args, 0, name, "a register name and value")?;
            let value = parse_int(arg(args, 1, name, "a register name and value")?)?;
            Command::ModifyRegister(reg.to_string(), value)
        }
        "dump_mem" => {
            let address = parse_int(arg(args, 0, name, "an address and row count")?)?;
            let rows = parse_int(arg(args, 1, name, "an address and row count")?)?;
            Command::DumpMem(address, rows)
        }
        "print_mem" => {
            if args.is_empty() || args.len() % 2 != 0 {
                return Err(CommandError::WrongArity(name.to_string(), "one or more address/row-count pairs"));
            }
            let windows = args
                .chunks_exact(2)
                .map(|pair| Ok((parse_int(pair[0])?, parse_int(pair[1])?)))
                .collect::<Result<Vec<_>, CommandError>>()?;
            Command::PrintMem(windows)
        }
        "exit" => Command::Exit,
        other => return Err(CommandError::Unknown(other.to_string())),
    }))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn blank_and_comment_lines_are_ignored() {
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line("   ").unwrap(), None);
        assert_eq!(parse_line("# just a comment").unwrap(), None);
    }

    #[test]
    fn load_requires_a_path() {
        assert_eq!(parse_line("load prog.s").unwrap(), Some(Command::Load("prog.s".to_string())));
        assert!(parse_line("load").is_err());
    }

    #[test]
    fn modify_register_parses_hex_and_decimal() {
        assert_eq!(
            parse_line("modify_register a0 0x2a").unwrap(),
            Some(Command::ModifyRegister("a0".to_string(), 42))
        );
        assert_eq!(
            parse_line("modify_register a0 42").unwrap(),
            Some(Command::ModifyRegister("a0".to_string(), 42))
        );
    }

    #[test]
    fn print_mem_accepts_repeated_windows() {
        let cmd = parse_line("print_mem 0x0 4 0x100 2").unwrap().unwrap();
        assert_eq!(cmd, Command::PrintMem(vec![(0, 4), (0x100, 2)]));
    }

    #[test]
    fn print_mem_rejects_odd_argument_count() {
        assert!(parse_line("print_mem 0x0 4 0x100").is_err());
    }

    #[test]
    fn unknown_command_is_an_error() {
        assert!(parse_line("frobnicate").is_err());
    }
}
