//! Lexer (4.E): a line-oriented reader that turns one source line into a
//! flat token list, classifying identifiers into opcode/register/rounding-
//! mode/label-reference buckets up front so the parser never re-inspects
//! raw text.

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use rvcore::isa;

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Directive(String),
    Opcode(isa::Op),
    Pseudo(String),
    GpRegister(u8),
    FpRegister(u8),
    RoundingMode(u8),
    LabelDef(String),
    LabelRef(String),
    Integer(i64),
    Str(String),
    Comma,
    LParen,
    RParen,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub column: u32,
}

const PSEUDO_MNEMONICS: &[&str] = &[
    "nop", "li", "mv", "not", "neg", "seqz", "snez", "sltz", "sgtz", "beqz", "bnez", "blez",
    "bgez", "bltz", "bgtz", "bgt", "ble", "bgtu", "bleu", "j", "jr", "ret", "call", "tail", "la",
];

fn rounding_mode_bits(name: &str) -> Option<u8> {
    match name {
        "rne" => Some(0b000),
        "rtz" => Some(0b001),
        "rdn" => Some(0b010),
        "rup" => Some(0b011),
        "rmm" => Some(0b100),
        "dyn" => Some(0b111),
        _ => None,
    }
}

fn classify_identifier(ident: &str) -> TokenKind {
    if let Some(r) = isa::resolve_gpr_name(ident) {
        return TokenKind::GpRegister(r);
    }
    if let Some(r) = isa::resolve_fpr_name(ident) {
        return TokenKind::FpRegister(r);
    }
    if let Some(rm) = rounding_mode_bits(ident) {
        return TokenKind::RoundingMode(rm);
    }
    if let Some(op) = isa::op_from_mnemonic(ident) {
        return TokenKind::Opcode(op);
    }
    if PSEUDO_MNEMONICS.contains(&ident) {
        return TokenKind::Pseudo(ident.to_string());
    }
    TokenKind::LabelRef(ident.to_string())
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

fn parse_integer(text: &str) -> Option<i64> {
    let (sign, rest) = match text.strip_prefix('-') {
        Some(r) => (-1i64, r),
        None => (1i64, text),
    };
    let magnitude = if let Some(h) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        i64::from_str_radix(h, 16).ok()?
    } else if let Some(o) = rest.strip_prefix("0o").or_else(|| rest.strip_prefix("0O")) {
        i64::from_str_radix(o, 8).ok()?
    } else if let Some(b) = rest.strip_prefix("0b").or_else(|| rest.strip_prefix("0B")) {
        i64::from_str_radix(b, 2).ok()?
    } else {
        rest.parse::<i64>().ok()?
    };
    Some(sign * magnitude)
}

fn unescape(text: &str, line: u32, column: u32, source_line: &str) -> Result<String, Diagnostic> {
    let mut out = String::new();
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('0') => out.push('\0'),
            _ => {
                return Err(Diagnostic::new(
                    line,
                    column,
                    source_line,
                    "invalid escape sequence in string literal",
                    DiagnosticKind::Syntax { expected: vec!["\\n", "\\t", "\\\\", "\\\"", "\\0"] },
                ))
            }
        }
    }
    Ok(out)
}

/// Lexes one source line (with comments and trailing whitespace already
/// present in `text`) into a flat token list. Stops at the first invalid
/// token and reports it; the caller abandons the rest of the line.
pub fn lex_line(text: &str, line_no: u32) -> Result<Vec<Token>, Diagnostic> {
    let source_line = text;
    let bytes: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0usize;

    while i < bytes.len() {
        let c = bytes[i];
        let column = (i + 1) as u32;

        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c == '#' || c == ';' {
            break;
        }
        if c == ',' {
            tokens.push(Token { kind: TokenKind::Comma, column });
            i += 1;
            continue;
        }
        if c == '(' {
            tokens.push(Token { kind: TokenKind::LParen, column });
            i += 1;
            continue;
        }
        if c == ')' {
            tokens.push(Token { kind: TokenKind::RParen, column });
            i += 1;
            continue;
        }
        if c == '.' {
            let start = i + 1;
            let mut j = start;
            while j < bytes.len() && is_ident_continue(bytes[j]) {
                j += 1;
            }
            if j == start {
                return Err(Diagnostic::new(
                    line_no,
                    column,
                    source_line,
                    "expected a directive name after '.'",
                    DiagnosticKind::UnexpectedToken,
                ));
            }
            let name: String = bytes[start..j].iter().collect();
            tokens.push(Token { kind: TokenKind::Directive(name), column });
            i = j;
            continue;
        }
        if c == '"' {
            let start = i + 1;
            let mut j = start;
            let mut closed = false;
            while j < bytes.len() {
                if bytes[j] == '"' {
                    closed = true;
                    break;
                }
                if bytes[j] == '\\' {
                    j += 2;
                    continue;
                }
                j += 1;
            }
            if !closed {
                return Err(Diagnostic::new(
                    line_no,
                    column,
                    source_line,
                    "unterminated string literal",
                    DiagnosticKind::UnexpectedToken,
                ));
            }
            let raw: String = bytes[start..j].iter().collect();
            let value = unescape(&raw, line_no, column, source_line)?;
            tokens.push(Token { kind: TokenKind::Str(value), column });
            i = j + 1;
            continue;
        }
        if c.is_ascii_digit() || (c == '-' && bytes.get(i + 1).map_or(false, |n| n.is_ascii_digit())) {
            let start = i;
            let mut j = if c == '-' { i + 1 } else { i };
            while j < bytes.len() && (bytes[j].is_ascii_alphanumeric()) {
                j += 1;
            }
            let text: String = bytes[start..j].iter().collect();
            let value = parse_integer(&text).ok_or_else(|| {
                Diagnostic::new(
                    line_no,
                    column,
                    source_line,
                    format!("'{}' is not a valid integer literal", text),
                    DiagnosticKind::UnexpectedToken,
                )
            })?;
            tokens.push(Token { kind: TokenKind::Integer(value), column });
            i = j;
            continue;
        }
        if is_ident_start(c) {
            let start = i;
            let mut j = i;
            while j < bytes.len() && is_ident_continue(bytes[j]) {
                j += 1;
            }
            let ident: String = bytes[start..j].iter().collect();
            let has_dot = ident.contains('.');
            if !has_dot && bytes.get(j) == Some(&':') {
                tokens.push(Token { kind: TokenKind::LabelDef(ident), column });
                i = j + 1;
                continue;
            }
            tokens.push(Token { kind: classify_identifier(&ident), column });
            i = j;
            continue;
        }

        return Err(Diagnostic::new(
            line_no,
            column,
            source_line,
            format!("unexpected character '{}'", c),
            DiagnosticKind::UnexpectedToken,
        ));
    }

    Ok(tokens)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lexes_instruction_with_registers_and_comma() {
        let tokens = lex_line("addi x10, x0, 3", 1).unwrap();
        assert_eq!(tokens.len(), 5);
        assert!(matches!(tokens[0].kind, TokenKind::Opcode(isa::Op::Addi)));
        assert!(matches!(tokens[1].kind, TokenKind::GpRegister(10)));
        assert!(matches!(tokens[3].kind, TokenKind::GpRegister(0)));
    }

    #[test]
    fn lexes_label_definition() {
        let tokens = lex_line("END: addi x0, x0, 0", 1).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::LabelDef("END".to_string()));
    }

    #[test]
    fn lexes_offset_base_shape() {
        let tokens = lex_line("lw x10, -4(x2)", 1).unwrap();
        assert!(matches!(tokens[1].kind, TokenKind::GpRegister(10)));
        assert_eq!(tokens[2].kind, TokenKind::Integer(-4));
        assert_eq!(tokens[3].kind, TokenKind::LParen);
        assert!(matches!(tokens[4].kind, TokenKind::GpRegister(2)));
    }

    #[test]
    fn lexes_directive_and_hex_literal() {
        let tokens = lex_line(".word 0xFF", 1).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Directive("word".to_string()));
        assert_eq!(tokens[1].kind, TokenKind::Integer(0xFF));
    }

    #[test]
    fn stops_at_comment() {
        let tokens = lex_line("addi x0, x0, 0 # comment", 1).unwrap();
        assert_eq!(tokens.len(), 5);
    }

    #[test]
    fn rejects_unterminated_string() {
        assert!(lex_line(".string \"oops", 1).is_err());
    }

    #[test]
    fn unknown_identifier_is_a_label_ref() {
        let tokens = lex_line("j my_label", 1).unwrap();
        assert_eq!(tokens[1].kind, TokenKind::LabelRef("my_label".to_string()));
    }
}
