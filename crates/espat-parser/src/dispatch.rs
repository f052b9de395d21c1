//! One-line dispatch: parse, look up, invoke, collect the payload.

use crate::error::{AtError, CommandError};
use crate::parse::parse_line;
use crate::table::CommandTable;

/// Protocol status line emitted after a successful command.
pub const AT_OK: &str = "OK";

/// Protocol status line emitted after any failure.
pub const AT_ERROR: &str = "ERROR";

/// Dispatch one terminator-stripped line against the table.
///
/// On success returns the handler's payload text (possibly empty, possibly
/// multi-line with `\n` separators); the caller emits it followed by `OK`.
/// Any failure maps to a single `ERROR` on the wire; the returned error kind
/// is for logging and tests.
pub fn dispatch<C>(
    table: &CommandTable<C>,
    ctx: &mut C,
    line: &str,
) -> Result<String, CommandError> {
    let parsed = parse_line(line)?;

    let entry = table
        .lookup(parsed.name)
        .ok_or_else(|| AtError::UnknownCommand(parsed.name.to_string()))?;

    let handler = entry
        .handler(parsed.op)
        .ok_or_else(|| AtError::OperationNotSupported {
            name: entry.name().to_string(),
            operation: parsed.op,
        })?;

    log::trace!("dispatching {} ({:?})", entry.name(), parsed.op);

    let mut out = String::new();
    handler(ctx, parsed.args, &mut out)?;
    Ok(out)
}
