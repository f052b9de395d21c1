//! ESPAT AT Command Parser
//!
//! This crate provides the command registry and line-parsing core of the
//! ESPAT firmware: a line-based text protocol in the classic AT style.
//!
//! # Protocol Overview
//!
//! Commands arrive as ASCII lines terminated with `\r` or `;`. Every command
//! except the bare `AT` echo starts with the `AT+` marker and takes one of
//! four forms:
//!
//! - **Execute**: `AT+NAME` - runs the command with no arguments
//! - **Read**: `AT+NAME?` - queries a value
//! - **Test**: `AT+NAME=?` - probes the accepted argument shape
//! - **Write**: `AT+NAME=<arg1>[,<arg2>...]` - sets a value
//!
//! Responses are an optional payload line produced by the handler (e.g.
//! `+CWMODE:1`) followed by a status line: `OK` on success, `ERROR` on
//! failure.
//!
//! # Dispatch
//!
//! Registered commands live in a fixed-capacity [`CommandTable`]. Lookup is
//! by a hash of the bare command name; hash equality is treated as identity
//! (no secondary string compare), which trades a small residual collision
//! risk for speed on a bounded, known vocabulary. A debug-time assertion at
//! registration catches vocabulary growth that would violate the assumption.
//!
//! # Example
//!
//! ```rust,ignore
//! use espat_parser::{Command, CommandTable, dispatch};
//!
//! let mut table = CommandTable::new();
//! table.register(Command::new("CWMODE").read(get_mode).write(set_mode))?;
//!
//! let payload = dispatch(&table, &mut ctx, "AT+CWMODE?")?;
//! assert_eq!(payload, "+CWMODE:1");
//! ```

mod accumulator;
mod dispatch;
mod error;
mod hash;
mod parse;
mod table;

pub use accumulator::*;
pub use dispatch::*;
pub use error::*;
pub use hash::*;
pub use parse::*;
pub use table::*;
