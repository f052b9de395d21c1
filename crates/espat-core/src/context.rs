//! Shared firmware state threaded through every command handler.

use std::time::Duration;

use espat_link::{ChannelMux, MuxConfig, SendRelay};

use crate::config::FirmwareConfig;
use crate::wireless::WirelessStack;

/// TCP server listening state, toggled by `CIPSERVER`.
///
/// The engine only records intent here; binding and releasing the actual
/// listener is the embedder's job, which passes (or withholds) the listener
/// on each service call accordingly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerState {
    /// Whether inbound connections should be admitted.
    pub running: bool,
    /// Configured listen port.
    pub port: u16,
}

/// Slot presence of one registered command, snapshotted for the `CMD`
/// listing in registration order.
#[derive(Debug, Clone, Copy)]
pub struct CommandInfo {
    /// Registered command name.
    pub name: &'static str,
    /// `AT+NAME=?` handler present.
    pub test: bool,
    /// `AT+NAME?` handler present.
    pub read: bool,
    /// `AT+NAME=<args>` handler present.
    pub write: bool,
    /// `AT+NAME` handler present.
    pub execute: bool,
}

/// The single top-level state object.
///
/// Constructed once at startup and passed by mutable reference through every
/// handler invocation; there are no process-wide globals. The multiplexer
/// exclusively owns all link state, the relay owns the suspend flag.
pub struct FirmwareContext {
    /// Fixed configuration.
    pub config: FirmwareConfig,
    /// Platform wireless stack.
    pub wireless: Box<dyn WirelessStack>,
    /// Link multiplexer.
    pub mux: ChannelMux,
    /// Send-mode relay.
    pub relay: SendRelay,
    /// TCP server intent.
    pub server: ServerState,
    /// Set by `RST`; the embedder observes it and restarts the firmware.
    pub reset_requested: bool,
    /// Registration-order command listing for `CMD`.
    pub commands: Vec<CommandInfo>,
}

impl FirmwareContext {
    /// Build the context from configuration and a wireless stack.
    pub fn new(config: FirmwareConfig, wireless: Box<dyn WirelessStack>) -> Self {
        let mux = ChannelMux::new(MuxConfig {
            max_links: config.max_links,
            recv_capacity: config.recv_buffer_size,
        });
        let relay = SendRelay::with_limits(
            config.tx_buffer_size,
            Duration::from_secs(config.relay_timeout_secs),
        );
        FirmwareContext {
            config,
            wireless,
            mux,
            relay,
            server: ServerState::default(),
            reset_requested: false,
            commands: Vec::new(),
        }
    }
}
