//! The registered command sets.
//!
//! Three groups, registered in a fixed order at startup (basic, Wi-Fi,
//! TCP/IP); the order is externally observable through the `CMD` listing.

mod args;
mod basic;
mod tcpip;
mod wifi;

pub use basic::register_basic_commands;
pub use tcpip::register_tcpip_commands;
pub use wifi::register_wifi_commands;

pub(crate) use args::{expect_args, parse_int, split_args};
