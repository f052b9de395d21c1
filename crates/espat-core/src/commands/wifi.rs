//! Wi-Fi command set: thin translation between the AT grammar and the
//! platform [`WirelessStack`](crate::wireless::WirelessStack).

use std::fmt::Write as _;

use espat_parser::{AtError, AtResult, Command, CommandError, CommandTable, HandlerResult};

use crate::commands::{expect_args, parse_int};
use crate::context::FirmwareContext;
use crate::wireless::{Encryption, SoftApConfig, WifiMode};

/// Register the Wi-Fi command set.
pub fn register_wifi_commands(table: &mut CommandTable<FirmwareContext>) -> AtResult<()> {
    table.register(Command::new("CWMODE").read(read_mode).write(write_mode))?;
    table.register(Command::new("CWSTATE").read(read_state))?;
    table.register(
        Command::new("CWJAP")
            .read(read_station)
            .write(write_join)
            .execute(execute_rejoin),
    )?;
    table.register(
        Command::new("CWRECONNCFG")
            .read(read_reconnect)
            .write(write_reconnect),
    )?;
    table.register(Command::new("CWLAP").execute(execute_scan))?;
    table.register(Command::new("CWQAP").execute(execute_disconnect))?;
    table.register(Command::new("CWSAP").read(read_soft_ap).write(write_soft_ap))?;
    table.register(Command::new("CWLIF").execute(execute_list_stations))?;
    table.register(Command::new("CWQIF").execute(execute_kick_stations))?;
    table.register(Command::new("CWDHCP").read(read_dhcp).write(write_dhcp))?;
    table.register(
        Command::new("CWHOSTNAME")
            .read(read_hostname)
            .write(write_hostname),
    )?;
    Ok(())
}

/// `AT+CWMODE?` -> `+CWMODE:<mode>`
fn read_mode(ctx: &mut FirmwareContext, _args: &str, out: &mut String) -> HandlerResult {
    let _ = write!(out, "+CWMODE:{}", ctx.wireless.mode() as u8);
    Ok(())
}

/// `AT+CWMODE=<mode>`
fn write_mode(ctx: &mut FirmwareContext, args: &str, _out: &mut String) -> HandlerResult {
    let mode = WifiMode::from_u8(parse_int(args)?)
        .ok_or_else(|| AtError::ArgumentError(format!("invalid mode: {:?}", args)))?;
    if !ctx.wireless.set_mode(mode) {
        return Err(CommandError::msg("mode change refused"));
    }
    Ok(())
}

/// `AT+CWSTATE?` -> `+CWSTATE:<state>,<ssid>`
fn read_state(ctx: &mut FirmwareContext, _args: &str, out: &mut String) -> HandlerResult {
    if ctx.wireless.mode() != WifiMode::Station {
        return Err(CommandError::msg("not in station mode"));
    }
    let status = ctx.wireless.status();
    let (code, with_ssid) = status
        .cwstate_code()
        .ok_or_else(|| CommandError::msg(format!("no state mapping for {:?}", status)))?;
    let ssid = if with_ssid {
        ctx.wireless
            .station_info()
            .map(|info| info.ssid)
            .unwrap_or_default()
    } else {
        String::new()
    };
    let _ = write!(out, "+CWSTATE:{},{}", code, ssid);
    Ok(())
}

/// `AT+CWJAP?` -> `+CWJAP:<ssid>,<bssid>,<channel>,<rssi>`
fn read_station(ctx: &mut FirmwareContext, _args: &str, out: &mut String) -> HandlerResult {
    let info = ctx
        .wireless
        .station_info()
        .ok_or_else(|| CommandError::msg("station not connected"))?;
    let _ = write!(
        out,
        "+CWJAP:{},{},{},{}",
        info.ssid, info.bssid, info.channel, info.rssi
    );
    Ok(())
}

/// `AT+CWJAP="<ssid>","<pwd>"`
fn write_join(ctx: &mut FirmwareContext, args: &str, out: &mut String) -> HandlerResult {
    let fields = expect_args(args, 2)?;
    ctx.wireless.set_mode(WifiMode::Station);
    let status = ctx.wireless.join(&fields[0], &fields[1]);
    out.push_str(status.label());
    if status.is_connected() {
        Ok(())
    } else {
        Err(CommandError::msg(format!("join failed: {}", status.label())))
    }
}

/// `AT+CWJAP` - reconnect with the stored credentials.
fn execute_rejoin(ctx: &mut FirmwareContext, _args: &str, out: &mut String) -> HandlerResult {
    let status = ctx.wireless.rejoin();
    out.push_str(status.label());
    if status.is_connected() {
        Ok(())
    } else {
        Err(CommandError::msg(format!(
            "reconnect failed: {}",
            status.label()
        )))
    }
}

/// `AT+CWRECONNCFG?` -> `+CWRECONNCFG:<enabled>`
fn read_reconnect(ctx: &mut FirmwareContext, _args: &str, out: &mut String) -> HandlerResult {
    let _ = write!(out, "+CWRECONNCFG:{}", u8::from(ctx.wireless.auto_reconnect()));
    Ok(())
}

/// `AT+CWRECONNCFG=<enabled>`
fn write_reconnect(ctx: &mut FirmwareContext, args: &str, _out: &mut String) -> HandlerResult {
    let enabled: u8 = parse_int(args)?;
    ctx.wireless.set_auto_reconnect(enabled != 0);
    Ok(())
}

/// `AT+CWLAP` -> `+CWLAP:<ecn>,<ssid>,<rssi>,<mac>,<channel>` per network.
fn execute_scan(ctx: &mut FirmwareContext, _args: &str, out: &mut String) -> HandlerResult {
    for (index, ap) in ctx.wireless.scan().iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        let _ = write!(
            out,
            "+CWLAP:{},{},{},{},{}",
            ap.encryption as u8, ap.ssid, ap.rssi, ap.bssid, ap.channel
        );
    }
    Ok(())
}

/// `AT+CWQAP`
fn execute_disconnect(ctx: &mut FirmwareContext, _args: &str, _out: &mut String) -> HandlerResult {
    if ctx.wireless.disconnect() {
        Ok(())
    } else {
        Err(CommandError::msg("disconnect refused"))
    }
}

/// `AT+CWSAP?` -> `+CWSAP:<ssid>,<pwd>,<channel>`
fn read_soft_ap(ctx: &mut FirmwareContext, _args: &str, out: &mut String) -> HandlerResult {
    let ap = ctx
        .wireless
        .soft_ap()
        .ok_or_else(|| CommandError::msg("soft AP not configured"))?;
    let _ = write!(out, "+CWSAP:{},{},{}", ap.ssid, ap.password, ap.channel);
    Ok(())
}

/// `AT+CWSAP="<ssid>","<pwd>",<chl>,<ecn>,<max conn>,<hidden>`
fn write_soft_ap(ctx: &mut FirmwareContext, args: &str, _out: &mut String) -> HandlerResult {
    let fields = expect_args(args, 6)?;
    let encryption = match parse_int::<u8>(&fields[3])? {
        0 => Encryption::Open,
        1 => Encryption::Wep,
        2 => Encryption::Tkip,
        3 => Encryption::Ccmp,
        4 => Encryption::Auto,
        other => {
            return Err(
                AtError::ArgumentError(format!("invalid encryption: {}", other)).into(),
            )
        }
    };
    let config = SoftApConfig {
        ssid: fields[0].clone(),
        password: fields[1].clone(),
        channel: parse_int(&fields[2])?,
        encryption,
        max_connections: parse_int(&fields[4])?,
        hidden: parse_int::<u8>(&fields[5])? != 0,
    };
    tracing::debug!(ssid = %config.ssid, channel = config.channel, "configuring soft AP");
    if ctx.wireless.configure_soft_ap(&config) {
        Ok(())
    } else {
        Err(CommandError::msg("soft AP configuration refused"))
    }
}

/// `AT+CWLIF` -> `+CWLIF:<ip addr>,<mac>` per attached station.
fn execute_list_stations(ctx: &mut FirmwareContext, _args: &str, out: &mut String) -> HandlerResult {
    for (index, station) in ctx.wireless.connected_stations().iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        let _ = write!(out, "+CWLIF:{},{}", station.addr, station.mac);
    }
    Ok(())
}

/// `AT+CWQIF`
fn execute_kick_stations(ctx: &mut FirmwareContext, _args: &str, _out: &mut String) -> HandlerResult {
    if ctx.wireless.kick_stations() {
        Ok(())
    } else {
        Err(CommandError::msg("station disconnect refused"))
    }
}

/// `AT+CWDHCP?` -> `+CWDHCP:<state>` (bit 0 station, bit 1 soft AP).
fn read_dhcp(ctx: &mut FirmwareContext, _args: &str, out: &mut String) -> HandlerResult {
    let dhcp = ctx.wireless.dhcp();
    let state = u8::from(dhcp.station) | (u8::from(dhcp.soft_ap) << 1);
    let _ = write!(out, "+CWDHCP:{}", state);
    Ok(())
}

/// `AT+CWDHCP=<operate>,<mode>` - mode 0 is station, 1 is soft AP.
fn write_dhcp(ctx: &mut FirmwareContext, args: &str, _out: &mut String) -> HandlerResult {
    let fields = expect_args(args, 2)?;
    let operate: u8 = parse_int(&fields[0])?;
    let station_mode = match parse_int::<u8>(&fields[1])? {
        0 => true,
        1 => false,
        other => return Err(AtError::ArgumentError(format!("invalid mode: {}", other)).into()),
    };
    ctx.wireless.set_dhcp(station_mode, operate == 1);
    Ok(())
}

/// `AT+CWHOSTNAME?` -> `+CWHOSTNAME:<hostname>`
fn read_hostname(ctx: &mut FirmwareContext, _args: &str, out: &mut String) -> HandlerResult {
    let _ = write!(out, "+CWHOSTNAME:{}", ctx.wireless.hostname());
    Ok(())
}

/// `AT+CWHOSTNAME=<hostname>`
fn write_hostname(ctx: &mut FirmwareContext, args: &str, _out: &mut String) -> HandlerResult {
    if ctx.wireless.set_hostname(args) {
        Ok(())
    } else {
        Err(CommandError::msg("hostname refused"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FirmwareConfig;
    use crate::wireless::{AccessPoint, MockWireless};
    use espat_parser::dispatch;

    fn context_with_network() -> FirmwareContext {
        let mut wifi = MockWireless::new();
        wifi.add_network(
            AccessPoint {
                encryption: Encryption::Ccmp,
                ssid: "home".to_string(),
                rssi: -55,
                bssid: "aa:bb:cc:dd:ee:ff".to_string(),
                channel: 6,
            },
            Some("secret"),
        );
        FirmwareContext::new(FirmwareConfig::default(), Box::new(wifi))
    }

    fn wifi_table() -> CommandTable<FirmwareContext> {
        let mut table = CommandTable::new();
        register_wifi_commands(&mut table).unwrap();
        table
    }

    #[test]
    fn test_mode_write_then_read() {
        let table = wifi_table();
        let mut ctx = context_with_network();

        assert!(dispatch(&table, &mut ctx, "AT+CWMODE=3").is_ok());
        let payload = dispatch(&table, &mut ctx, "AT+CWMODE?").unwrap();
        assert_eq!(payload, "+CWMODE:3");
    }

    #[test]
    fn test_mode_rejects_garbage() {
        let table = wifi_table();
        let mut ctx = context_with_network();
        assert!(dispatch(&table, &mut ctx, "AT+CWMODE=9").is_err());
        assert!(dispatch(&table, &mut ctx, "AT+CWMODE=abc").is_err());
    }

    #[test]
    fn test_join_and_query_station() {
        let table = wifi_table();
        let mut ctx = context_with_network();

        let payload = dispatch(&table, &mut ctx, "AT+CWJAP=\"home\",\"secret\"").unwrap();
        assert_eq!(payload, "GOT IP");

        let payload = dispatch(&table, &mut ctx, "AT+CWJAP?").unwrap();
        assert_eq!(payload, "+CWJAP:home,aa:bb:cc:dd:ee:ff,6,-55");
    }

    #[test]
    fn test_join_wrong_password_fails() {
        let table = wifi_table();
        let mut ctx = context_with_network();
        assert!(dispatch(&table, &mut ctx, "AT+CWJAP=\"home\",\"nope\"").is_err());
    }

    #[test]
    fn test_join_bad_argument_shape() {
        let table = wifi_table();
        let mut ctx = context_with_network();
        let err = dispatch(&table, &mut ctx, "AT+CWJAP=\"home\"").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AtError>(),
            Some(AtError::ArgumentError(_))
        ));
    }

    #[test]
    fn test_scan_listing() {
        let table = wifi_table();
        let mut ctx = context_with_network();
        let payload = dispatch(&table, &mut ctx, "AT+CWLAP").unwrap();
        assert_eq!(payload, "+CWLAP:3,home,-55,aa:bb:cc:dd:ee:ff,6");
    }

    #[test]
    fn test_state_after_join() {
        let table = wifi_table();
        let mut ctx = context_with_network();
        dispatch(&table, &mut ctx, "AT+CWJAP=\"home\",\"secret\"").unwrap();
        let payload = dispatch(&table, &mut ctx, "AT+CWSTATE?").unwrap();
        assert_eq!(payload, "+CWSTATE:2,home");
    }

    #[test]
    fn test_soft_ap_round_trip() {
        let table = wifi_table();
        let mut ctx = context_with_network();

        dispatch(&table, &mut ctx, "AT+CWSAP=\"ap\",\"pw12345\",6,3,4,0").unwrap();
        let payload = dispatch(&table, &mut ctx, "AT+CWSAP?").unwrap();
        assert_eq!(payload, "+CWSAP:ap,pw12345,6");
    }

    #[test]
    fn test_dhcp_write_and_read() {
        let table = wifi_table();
        let mut ctx = context_with_network();

        // Both on by default.
        assert_eq!(dispatch(&table, &mut ctx, "AT+CWDHCP?").unwrap(), "+CWDHCP:3");
        // Stop the station client.
        dispatch(&table, &mut ctx, "AT+CWDHCP=0,0").unwrap();
        assert_eq!(dispatch(&table, &mut ctx, "AT+CWDHCP?").unwrap(), "+CWDHCP:2");
    }

    #[test]
    fn test_hostname_round_trip() {
        let table = wifi_table();
        let mut ctx = context_with_network();
        dispatch(&table, &mut ctx, "AT+CWHOSTNAME=node7").unwrap();
        assert_eq!(
            dispatch(&table, &mut ctx, "AT+CWHOSTNAME?").unwrap(),
            "+CWHOSTNAME:node7"
        );
    }

    #[test]
    fn test_reconnect_config() {
        let table = wifi_table();
        let mut ctx = context_with_network();
        dispatch(&table, &mut ctx, "AT+CWRECONNCFG=0").unwrap();
        assert_eq!(
            dispatch(&table, &mut ctx, "AT+CWRECONNCFG?").unwrap(),
            "+CWRECONNCFG:0"
        );
    }
}
