//! Diagnostics (§7): every assembler failure is collected here rather than
//! aborting the first pass, so one run reports every bad line at once.

use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiagnosticKind {
    Syntax { expected: Vec<&'static str> },
    UnexpectedToken,
    UnexpectedOperand,
    ImmediateOutOfRange { low: i64, high: i64 },
    MisalignedImmediate { multiple_of: i64 },
    InvalidRegister,
    InvalidLabelRef,
    LabelRedefinition { first_line: u32 },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: u32,
    pub column: u32,
    pub source_line_text: String,
    pub main_message: String,
    pub sub_message: Option<String>,
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn new(
        line: u32,
        column: u32,
        source_line_text: &str,
        main_message: impl Into<String>,
        kind: DiagnosticKind,
    ) -> Diagnostic {
        Diagnostic {
            line,
            column,
            source_line_text: source_line_text.to_string(),
            main_message: main_message.into(),
            sub_message: None,
            kind,
        }
    }

    pub fn with_sub_message(mut self, sub_message: impl Into<String>) -> Diagnostic {
        self.sub_message = Some(sub_message.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "line {}: {}", self.line, self.main_message)?;
        writeln!(f, " {}", self.source_line_text)?;
        let caret_offset = self.column.saturating_sub(1) as usize;
        writeln!(f, " {}^", " ".repeat(caret_offset))?;
        if let Some(sub) = &self.sub_message {
            writeln!(f, " {}", sub)?;
        }
        Ok(())
    }
}
