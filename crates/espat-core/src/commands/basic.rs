//! Basic system commands: `RST`, `GMR`, `CMD`.

use std::fmt::Write as _;

use espat_parser::{AtResult, Command, CommandTable, HandlerResult};

use crate::context::FirmwareContext;

/// Register the basic command set.
pub fn register_basic_commands(table: &mut CommandTable<FirmwareContext>) -> AtResult<()> {
    table.register(Command::new("RST").execute(execute_reset))?;
    table.register(Command::new("GMR").execute(execute_version))?;
    table.register(
        Command::new("CMD")
            .read(read_command_listing)
            .execute(read_command_listing),
    )?;
    Ok(())
}

/// Restart the device.
///
/// `AT+RST`
fn execute_reset(ctx: &mut FirmwareContext, _args: &str, _out: &mut String) -> HandlerResult {
    tracing::info!("reset requested");
    ctx.reset_requested = true;
    Ok(())
}

/// Report version information.
///
/// `AT+GMR`
fn execute_version(ctx: &mut FirmwareContext, _args: &str, out: &mut String) -> HandlerResult {
    let _ = write!(
        out,
        "AT version:{}\nBin version:{}",
        ctx.config.at_version, ctx.config.firmware_version
    );
    Ok(())
}

/// List every registered command and its populated handler slots.
///
/// `AT+CMD` or `AT+CMD?` ->
/// `+CMD:<index>,<name>,<test?>,<read?>,<write?>,<execute?>`
fn read_command_listing(ctx: &mut FirmwareContext, _args: &str, out: &mut String) -> HandlerResult {
    for (index, info) in ctx.commands.iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        let _ = write!(
            out,
            "+CMD:{},{},{},{},{},{}",
            index,
            info.name,
            u8::from(info.test),
            u8::from(info.read),
            u8::from(info.write),
            u8::from(info.execute),
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FirmwareConfig;
    use crate::context::CommandInfo;
    use crate::wireless::MockWireless;
    use espat_parser::dispatch;

    fn context() -> FirmwareContext {
        FirmwareContext::new(FirmwareConfig::default(), Box::new(MockWireless::new()))
    }

    #[test]
    fn test_reset_sets_flag() {
        let mut table = CommandTable::new();
        register_basic_commands(&mut table).unwrap();
        let mut ctx = context();

        let payload = dispatch(&table, &mut ctx, "AT+RST").unwrap();
        assert!(payload.is_empty());
        assert!(ctx.reset_requested);
    }

    #[test]
    fn test_version_lines() {
        let mut table = CommandTable::new();
        register_basic_commands(&mut table).unwrap();
        let mut ctx = context();

        let payload = dispatch(&table, &mut ctx, "AT+GMR").unwrap();
        let lines: Vec<_> = payload.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("AT version:"));
        assert!(lines[1].starts_with("Bin version:"));
    }

    #[test]
    fn test_command_listing_in_table_order() {
        let mut table = CommandTable::new();
        register_basic_commands(&mut table).unwrap();
        let mut ctx = context();
        ctx.commands = vec![
            CommandInfo {
                name: "RST",
                test: false,
                read: false,
                write: false,
                execute: true,
            },
            CommandInfo {
                name: "CMD",
                test: false,
                read: true,
                write: false,
                execute: false,
            },
        ];

        let payload = dispatch(&table, &mut ctx, "AT+CMD?").unwrap();
        assert_eq!(payload, "+CMD:0,RST,0,0,0,1\n+CMD:1,CMD,0,1,0,0");
    }
}
