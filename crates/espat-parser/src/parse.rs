//! Grammar for a single AT command line.
//!
//! A line stripped of its terminator is classified into one of four
//! operation forms:
//!
//! ```text
//! AT+<NAME>                    -> Execute
//! AT+<NAME>?                   -> Read
//! AT+<NAME>=?                  -> Test
//! AT+<NAME>=<arg1>[,<arg2>...] -> Write
//! ```
//!
//! The bare `AT` echo is not a command for this grammar; the driver answers
//! it before dispatch.

use crate::error::{AtError, AtResult};

/// Marker every dispatchable command line starts with.
pub const AT_COMMAND_MARKER: &str = "AT+";

/// Maximum accepted line length, shared with the line accumulator.
///
/// A longer line never reaches the parser: the accumulator rejects it with
/// [`AtError::Overflow`] and resets.
pub const AT_MAX_LINE_LENGTH: usize = 512;

/// The four operation slots a command can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `AT+NAME?` - query a value.
    Read,
    /// `AT+NAME=<args>` - set a value.
    Write,
    /// `AT+NAME=?` - probe the accepted argument shape.
    Test,
    /// `AT+NAME` - run with no arguments.
    Execute,
}

/// A command line parsed into its (name, operation, arguments) triple.
///
/// Borrowed from the input line; built per line and discarded after
/// dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedCommand<'a> {
    /// The bare command name, without marker or arguments.
    pub name: &'a str,
    /// The operation classified from the characters after the name.
    pub op: Operation,
    /// The argument string after `=` (empty for non-Write forms).
    pub args: &'a str,
}

/// Parse one terminator-stripped line into a [`ParsedCommand`].
pub fn parse_line(line: &str) -> AtResult<ParsedCommand<'_>> {
    let rest = line
        .strip_prefix(AT_COMMAND_MARKER)
        .ok_or(AtError::NotACommand)?;

    // The name runs up to the first '?' or '=' (or end of line).
    let name_end = rest
        .find(|c| c == '?' || c == '=')
        .unwrap_or(rest.len());
    let name = &rest[..name_end];
    if name.is_empty() {
        return Err(AtError::ArgumentError("empty command name".to_string()));
    }

    let tail = &rest[name_end..];
    match tail.as_bytes().first() {
        None => Ok(ParsedCommand {
            name,
            op: Operation::Execute,
            args: "",
        }),
        Some(b'?') => {
            if tail.len() > 1 {
                return Err(AtError::ArgumentError(format!(
                    "trailing input after read query: {:?}",
                    &tail[1..]
                )));
            }
            Ok(ParsedCommand {
                name,
                op: Operation::Read,
                args: "",
            })
        }
        Some(b'=') => {
            let args = &tail[1..];
            if args == "?" {
                Ok(ParsedCommand {
                    name,
                    op: Operation::Test,
                    args: "",
                })
            } else {
                Ok(ParsedCommand {
                    name,
                    op: Operation::Write,
                    args,
                })
            }
        }
        // name_end stopped at '?' or '='; nothing else is reachable.
        Some(_) => unreachable!("name scan stopped at an unexpected byte"),
    }
}
