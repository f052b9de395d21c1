//! # espat-core
//!
//! The ESPAT firmware core: wires the AT command parser, the three command
//! sets (basic, Wi-Fi, TCP/IP) and the link layer into one cooperative
//! engine.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use espat_core::{AtEngine, FirmwareConfig, MockWireless};
//!
//! let mut engine = AtEngine::new(FirmwareConfig::default(), Box::new(MockWireless::new()))?;
//! for line in engine.service(b"AT+GMR\r", None) {
//!     println!("{}", line);
//! }
//! # Ok::<(), espat_parser::AtError>(())
//! ```
//!
//! The embedder drives [`AtEngine::service`] once per outer loop iteration
//! with whatever serial bytes arrived (possibly none) and the platform's
//! inbound-connection listener; the engine returns the response lines to put
//! on the serial side. There is exactly one logical thread of control: line
//! dispatch, channel polling and the send relay all advance inside that one
//! call.

pub mod commands;
mod config;
mod context;
mod engine;
mod wireless;

pub use config::*;
pub use context::*;
pub use engine::*;
pub use wireless::*;
