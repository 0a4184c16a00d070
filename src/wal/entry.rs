//! WAL Entry definitions
//!
//! One line of the WAL and its text encoding.

use crate::error::{LedgerError, Result};
use crate::record::Command;

/// A single WAL line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalEntry {
    /// `SET key value`
    Set { key: String, value: String },

    /// `RM key`
    Rm { key: String },
}

impl WalEntry {
    /// Render as a line, without the trailing newline
    pub fn to_line(&self) -> String {
        match self {
            WalEntry::Set { key, value } => format!("SET {} {}", escape(key), escape(value)),
            WalEntry::Rm { key } => format!("RM {}", escape(key)),
        }
    }

    /// Parse a line (trailing `\n` or `\r\n` tolerated)
    pub fn parse_line(line: &str) -> Result<Self> {
        let line = line.strip_suffix('\n').unwrap_or(line);
        let line = line.strip_suffix('\r').unwrap_or(line);
        let parts: Vec<&str> = line.split(' ').collect();

        match parts.as_slice() {
            ["SET", key, value] => Ok(WalEntry::Set {
                key: unescape(key)?,
                value: unescape(value)?,
            }),
            ["RM", key] => Ok(WalEntry::Rm { key: unescape(key)? }),
            _ => Err(LedgerError::Wal(format!("malformed line: {:?}", line))),
        }
    }

    pub fn key(&self) -> &str {
        match self {
            WalEntry::Set { key, .. } | WalEntry::Rm { key } => key,
        }
    }
}

impl From<&Command> for WalEntry {
    fn from(command: &Command) -> Self {
        match command {
            Command::Set { key, value } => WalEntry::Set {
                key: key.clone(),
                value: value.clone(),
            },
            Command::Remove { key } => WalEntry::Rm { key: key.clone() },
        }
    }
}

fn escape(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    for c in field.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ' ' => out.push_str("\\s"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

fn unescape(field: &str) -> Result<String> {
    let mut out = String::with_capacity(field.len());
    let mut chars = field.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('s') => out.push(' '),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            other => {
                return Err(LedgerError::Wal(format!(
                    "bad escape sequence \\{} in {:?}",
                    other.map(String::from).unwrap_or_default(),
                    field
                )))
            }
        }
    }
    Ok(out)
}
