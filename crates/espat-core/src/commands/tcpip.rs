//! TCP/IP command set: server control, link inspection, buffered receive
//! and the send-mode relay trigger.

use std::fmt::Write as _;

use espat_parser::{AtResult, Command, CommandError, CommandTable, HandlerResult};

use crate::commands::{expect_args, parse_int, split_args};
use crate::context::FirmwareContext;

/// Default listen port when `CIPSERVER=1` omits one.
pub const DEFAULT_SERVER_PORT: u16 = 333;

/// Register the TCP/IP command set.
pub fn register_tcpip_commands(table: &mut CommandTable<FirmwareContext>) -> AtResult<()> {
    table.register(
        Command::new("CIPSERVER")
            .read(read_server)
            .write(write_server),
    )?;
    table.register(Command::new("CIPSTATE").read(read_link_state))?;
    table.register(Command::new("CIPRECVLEN").read(read_buffered_lengths))?;
    table.register(Command::new("CIPRECVDATA").write(write_receive_data))?;
    table.register(Command::new("CIPSEND").write(write_send))?;
    Ok(())
}

/// `AT+CIPSERVER?` -> `+CIPSERVER:<mode>,<port>`
fn read_server(ctx: &mut FirmwareContext, _args: &str, out: &mut String) -> HandlerResult {
    let _ = write!(
        out,
        "+CIPSERVER:{},{}",
        u8::from(ctx.server.running),
        ctx.server.port
    );
    Ok(())
}

/// `AT+CIPSERVER=<mode>[,<port>]`
///
/// Only records intent; the embedder binds or releases the real listener.
fn write_server(ctx: &mut FirmwareContext, args: &str, _out: &mut String) -> HandlerResult {
    let fields = split_args(args)?;
    let mode: u8 = match fields.first() {
        Some(field) => parse_int(field)?,
        None => return Err(CommandError::msg("missing mode")),
    };
    match (mode, fields.len()) {
        (0, 1) => {
            tracing::info!("server stopped");
            ctx.server.running = false;
        }
        (1, 1 | 2) => {
            let port = match fields.get(1) {
                Some(field) => parse_int(field)?,
                None => DEFAULT_SERVER_PORT,
            };
            tracing::info!(port, "server started");
            ctx.server.running = true;
            ctx.server.port = port;
        }
        _ => return Err(CommandError::msg(format!("invalid server request: {:?}", args))),
    }
    Ok(())
}

/// `AT+CIPSTATE?` -> `+CIPSTATE:<link>,<remote ip>,<remote port>,<local port>`
/// per active link.
fn read_link_state(ctx: &mut FirmwareContext, _args: &str, out: &mut String) -> HandlerResult {
    let links: Vec<_> = ctx.mux.active_links().collect();
    for (index, link) in links.into_iter().enumerate() {
        let (Some(remote), Some(local_port)) = (ctx.mux.remote(link), ctx.mux.local_port(link))
        else {
            continue;
        };
        if index > 0 {
            out.push('\n');
        }
        let _ = write!(
            out,
            "+CIPSTATE:{},{},{},{}",
            link, remote.addr, remote.port, local_port
        );
    }
    Ok(())
}

/// `AT+CIPRECVLEN?` -> `+CIPRECVLEN:<link>,<buffered>` per active link.
fn read_buffered_lengths(ctx: &mut FirmwareContext, _args: &str, out: &mut String) -> HandlerResult {
    let links: Vec<_> = ctx.mux.active_links().collect();
    for (index, link) in links.into_iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        let _ = write!(out, "+CIPRECVLEN:{},{}", link, ctx.mux.buffered_len(link));
    }
    Ok(())
}

/// `AT+CIPRECVDATA=<link>,<len>` ->
/// `+CIPRECVDATA:<link>,<actual>,<remote ip>,<remote port>,<payload>`
///
/// The buffered count resets to zero even when `len` is smaller than it;
/// the remainder is discarded, not retained for a later read.
fn write_receive_data(ctx: &mut FirmwareContext, args: &str, out: &mut String) -> HandlerResult {
    let fields = expect_args(args, 2)?;
    let link: usize = parse_int(&fields[0])?;
    let requested: usize = parse_int(&fields[1])?;

    let (data, remote) = ctx.mux.consume(link, requested)?;
    let _ = write!(
        out,
        "+CIPRECVDATA:{},{},{},{},",
        link,
        data.len(),
        remote.addr,
        remote.port
    );
    out.push_str(&String::from_utf8_lossy(&data));
    Ok(())
}

/// `AT+CIPSEND=<link>,<len>`
///
/// Arms the relay; the engine switches to raw byte collection after the
/// `OK` and prompts with `>`.
fn write_send(ctx: &mut FirmwareContext, args: &str, _out: &mut String) -> HandlerResult {
    let fields = expect_args(args, 2)?;
    let link: usize = parse_int(&fields[0])?;
    let expected: usize = parse_int(&fields[1])?;

    ctx.relay.begin(&ctx.mux, link, expected)?;
    Ok(())
}
