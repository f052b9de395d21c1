//! The dispatch engine: one cooperative loop over serial input, command
//! dispatch, link polling and the send relay.

use espat_link::{LinkEvent, Listener};
use espat_parser::{
    dispatch, AtResult, CommandTable, LineAccumulator, Operation, AT_ERROR, AT_OK,
};

use crate::commands::{register_basic_commands, register_tcpip_commands, register_wifi_commands};
use crate::config::FirmwareConfig;
use crate::context::{CommandInfo, FirmwareContext};
use crate::wireless::WirelessStack;

/// Prompt emitted after `CIPSEND` switches the input to raw collection.
pub const AT_SEND_PROMPT: &str = ">";

/// Final line of a successful send relay.
pub const SEND_OK: &str = "SEND OK";

/// The firmware core: command table, line accumulator and all owned state.
///
/// The embedder calls [`service`](Self::service) once per outer loop
/// iteration with whatever serial bytes arrived (possibly none); the
/// returned strings are the response lines for the serial side, in order.
/// The link multiplexer is polled exactly once per call whether or not a
/// command line arrived.
pub struct AtEngine {
    table: CommandTable<FirmwareContext>,
    accumulator: LineAccumulator,
    ctx: FirmwareContext,
}

impl AtEngine {
    /// Build the engine, registering the basic, Wi-Fi and TCP/IP command
    /// sets in that fixed order.
    pub fn new(config: FirmwareConfig, wireless: Box<dyn WirelessStack>) -> AtResult<Self> {
        let mut table = CommandTable::new();
        register_basic_commands(&mut table)?;
        register_wifi_commands(&mut table)?;
        register_tcpip_commands(&mut table)?;

        let mut ctx = FirmwareContext::new(config, wireless);
        // Snapshot the table for the CMD listing; the table itself is fixed
        // from here on.
        ctx.commands = table
            .entries()
            .iter()
            .map(|entry| CommandInfo {
                name: entry.name(),
                test: entry.supports(Operation::Test),
                read: entry.supports(Operation::Read),
                write: entry.supports(Operation::Write),
                execute: entry.supports(Operation::Execute),
            })
            .collect();

        tracing::info!(commands = table.len(), "engine initialized");
        Ok(AtEngine {
            table,
            accumulator: LineAccumulator::new(),
            ctx,
        })
    }

    /// Greeting line emitted once at startup.
    pub fn greeting(&self) -> &str {
        &self.ctx.config.greeting
    }

    /// Whether a `RST` command asked for a restart.
    pub fn reset_requested(&self) -> bool {
        self.ctx.reset_requested
    }

    /// Shared state, read-only.
    pub fn context(&self) -> &FirmwareContext {
        &self.ctx
    }

    /// Shared state, mutable (test and embedder hook).
    pub fn context_mut(&mut self) -> &mut FirmwareContext {
        &mut self.ctx
    }

    /// One loop iteration: advance the relay or parse lines, then poll the
    /// links once.
    ///
    /// The listener is only offered to the multiplexer while `CIPSERVER` has
    /// the server running; connection events surface as `<id>,CONNECT` /
    /// `<id>,CLOSED` lines.
    pub fn service(
        &mut self,
        input: &[u8],
        listener: Option<&mut dyn Listener>,
    ) -> Vec<String> {
        let mut responses = Vec::new();
        let mut input = input;

        // Send-mode: the relay owns the input stream until it is satisfied,
        // fails or times out. Stray bytes past the promised count are
        // discarded, not parsed as commands.
        if self.ctx.relay.is_active() {
            let consumed = self.ctx.relay.push(input);
            input = &input[consumed..];
            self.settle_relay(&mut responses);
            if !self.ctx.relay.is_active() {
                input = &[];
            }
        }

        if !input.is_empty() {
            self.accumulator.push(input);
        }
        if !self.ctx.relay.is_active() {
            self.drain_lines(&mut responses);
        }

        let listener = if self.ctx.server.running {
            listener
        } else {
            None
        };
        for event in self.ctx.mux.poll(listener) {
            match event {
                LinkEvent::Connected { link } => responses.push(format!("{},CONNECT", link)),
                LinkEvent::Closed { link } => responses.push(format!("{},CLOSED", link)),
                LinkEvent::Rejected => {}
            }
        }

        responses
    }

    /// Parse and dispatch every complete buffered line.
    fn drain_lines(&mut self, responses: &mut Vec<String>) {
        while let Some(line) = self.accumulator.next_line() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    tracing::warn!(%err, "input line rejected");
                    responses.push(AT_ERROR.to_string());
                    continue;
                }
            };

            // The bare echo is answered before dispatch; it is not in the
            // table.
            if line == "AT" {
                responses.push(AT_OK.to_string());
                continue;
            }

            match dispatch(&self.table, &mut self.ctx, &line) {
                Ok(payload) => {
                    responses.extend(payload.lines().map(str::to_string));
                    responses.push(AT_OK.to_string());
                }
                Err(err) => {
                    tracing::debug!(%err, %line, "command failed");
                    responses.push(AT_ERROR.to_string());
                }
            }

            // CIPSEND armed the relay: leave line mode. Bytes already
            // buffered behind the command line are the start of the raw
            // payload.
            if self.ctx.relay.is_active() {
                responses.push(AT_SEND_PROMPT.to_string());
                let buffered = self.accumulator.buffered_len();
                if buffered > 0 {
                    let raw = self.accumulator.take_raw(buffered);
                    self.ctx.relay.push(&raw);
                }
                self.settle_relay(responses);
                if !self.ctx.relay.is_active() {
                    // Completed in place; anything left over is stray.
                    self.accumulator.clear();
                }
                break;
            }
        }
    }

    /// Finish a satisfied collection or abort an expired one.
    fn settle_relay(&mut self, responses: &mut Vec<String>) {
        if self.ctx.relay.is_complete() {
            match self.ctx.relay.finish(&mut self.ctx.mux) {
                Ok(sent) => {
                    responses.push(format!("Recv {} bytes", sent));
                    responses.push(SEND_OK.to_string());
                }
                Err(err) => {
                    tracing::warn!(%err, "send relay failed");
                    responses.push(AT_ERROR.to_string());
                }
            }
        } else if let Err(err) = self.ctx.relay.check_deadline() {
            tracing::warn!(%err, "send relay timed out");
            responses.push(AT_ERROR.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wireless::MockWireless;
    use espat_link::testing::{connection, MemListener, MemPeer};

    fn engine() -> AtEngine {
        AtEngine::new(FirmwareConfig::default(), Box::new(MockWireless::new())).unwrap()
    }

    /// Start the server and admit one connection, returning its peer end.
    fn engine_with_link() -> (AtEngine, MemPeer) {
        let mut engine = engine();
        assert_eq!(engine.service(b"AT+CIPSERVER=1,333\r", None), vec!["OK"]);

        let mut listener = MemListener::new();
        let (conn, peer) = connection(50000);
        listener.push(conn);
        let responses = engine.service(b"", Some(&mut listener));
        assert_eq!(responses, vec!["0,CONNECT"]);
        (engine, peer)
    }

    #[test]
    fn test_bare_at_echo() {
        let mut engine = engine();
        assert_eq!(engine.service(b"AT\r", None), vec!["OK"]);
    }

    #[test]
    fn test_unknown_command() {
        let mut engine = engine();
        assert_eq!(engine.service(b"AT+NOPE\r", None), vec!["ERROR"]);
    }

    #[test]
    fn test_payload_then_status() {
        let mut engine = engine();
        let responses = engine.service(b"AT+CWMODE?\r", None);
        assert_eq!(responses, vec!["+CWMODE:1", "OK"]);
    }

    #[test]
    fn test_multiple_lines_one_call() {
        let mut engine = engine();
        let responses = engine.service(b"AT\rAT+CWMODE=3\rAT+CWMODE?\r", None);
        assert_eq!(responses, vec!["OK", "OK", "+CWMODE:3", "OK"]);
    }

    #[test]
    fn test_overflow_then_recovery() {
        let mut engine = engine();
        let responses = engine.service(&[b'A'; 600], None);
        assert_eq!(responses, vec!["ERROR"]);

        // The bad line's tail is discarded through its terminator.
        let responses = engine.service(b"AAAA\rAT\r", None);
        assert_eq!(responses, vec!["OK"]);
    }

    #[test]
    fn test_listener_gated_on_server_state() {
        let mut engine = engine();
        let mut listener = MemListener::new();
        let (conn, _peer) = connection(50000);
        listener.push(conn);

        // Server not started: the waiting connection is not admitted.
        assert!(engine.service(b"", Some(&mut listener)).is_empty());

        engine.service(b"AT+CIPSERVER=1,333\r", None);
        let responses = engine.service(b"", Some(&mut listener));
        assert_eq!(responses, vec!["0,CONNECT"]);
    }

    #[test]
    fn test_closed_notification() {
        let (mut engine, peer) = engine_with_link();
        peer.close();
        assert_eq!(engine.service(b"", None), vec!["0,CLOSED"]);
    }

    #[test]
    fn test_send_relay_roundtrip() {
        let (mut engine, peer) = engine_with_link();

        let responses = engine.service(b"AT+CIPSEND=0,5\r", None);
        assert_eq!(responses, vec!["OK", ">"]);

        // Partial payload keeps the collection open.
        assert!(engine.service(b"he", None).is_empty());

        let responses = engine.service(b"llo", None);
        assert_eq!(responses, vec!["Recv 5 bytes", "SEND OK"]);
        assert_eq!(peer.received(), b"hello");

        // Line mode is restored.
        assert_eq!(engine.service(b"AT\r", None), vec!["OK"]);
    }

    #[test]
    fn test_send_payload_in_same_buffer() {
        let (mut engine, peer) = engine_with_link();
        let responses = engine.service(b"AT+CIPSEND=0,5\rhello", None);
        assert_eq!(responses, vec!["OK", ">", "Recv 5 bytes", "SEND OK"]);
        assert_eq!(peer.received(), b"hello");
    }

    #[test]
    fn test_send_stray_trailing_bytes_discarded() {
        let (mut engine, peer) = engine_with_link();
        engine.service(b"AT+CIPSEND=0,5\r", None);
        let responses = engine.service(b"helloXYZ", None);
        assert_eq!(responses, vec!["Recv 5 bytes", "SEND OK"]);
        assert_eq!(peer.received(), b"hello");

        // The stray bytes did not survive as a partial command line.
        assert_eq!(engine.service(b"AT\r", None), vec!["OK"]);
    }

    #[test]
    fn test_send_short_write_reports_error_and_resumes() {
        let (mut engine, peer) = engine_with_link();
        peer.limit_write(3);

        engine.service(b"AT+CIPSEND=0,5\r", None);
        let responses = engine.service(b"hello", None);
        assert_eq!(responses, vec!["ERROR"]);
        assert!(!engine.context().relay.is_active());

        // Dispatch resumes normally after the failure.
        assert_eq!(engine.service(b"AT\r", None), vec!["OK"]);
    }

    #[test]
    fn test_send_to_unconnected_link_fails_in_line_mode() {
        let mut engine = engine();
        let responses = engine.service(b"AT+CIPSEND=2,5\r", None);
        assert_eq!(responses, vec!["ERROR"]);
        assert!(!engine.context().relay.is_active());
    }

    #[test]
    fn test_reset_flag_surfaces() {
        let mut engine = engine();
        assert!(!engine.reset_requested());
        assert_eq!(engine.service(b"AT+RST\r", None), vec!["OK"]);
        assert!(engine.reset_requested());
    }

    #[test]
    fn test_command_listing_covers_all_sets() {
        let mut engine = engine();
        let responses = engine.service(b"AT+CMD?\r", None);
        let listing = responses.join("\n");
        for name in ["RST", "GMR", "CMD", "CWMODE", "CWJAP", "CIPSERVER", "CIPSEND"] {
            assert!(listing.contains(&format!(",{},", name)), "missing {}", name);
        }
        assert_eq!(responses.last().map(String::as_str), Some("OK"));
    }
}
