//! Firmware configuration.

use espat_link::{MAX_LINKS, RECV_BUFFER_SIZE, TX_BUFFER_SIZE};
use serde::{Deserialize, Serialize};

/// Fixed configuration decided at startup.
///
/// All buffer sizes and link counts are set here once; nothing grows at
/// runtime, which bounds worst-case memory use on a constrained target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FirmwareConfig {
    /// Banner printed when the engine comes up.
    pub greeting: String,
    /// AT protocol version reported by `AT+GMR`.
    pub at_version: String,
    /// Firmware build version reported by `AT+GMR`.
    pub firmware_version: String,
    /// Maximum concurrently admitted links.
    pub max_links: usize,
    /// Receive buffer capacity per link, in bytes.
    pub recv_buffer_size: usize,
    /// Transmit buffer capacity for the send relay, in bytes.
    pub tx_buffer_size: usize,
    /// Send relay collection deadline, in seconds.
    pub relay_timeout_secs: u64,
}

impl Default for FirmwareConfig {
    fn default() -> Self {
        FirmwareConfig {
            greeting: "Ready".to_string(),
            at_version: "2.2.0".to_string(),
            firmware_version: "0.1.0".to_string(),
            max_links: MAX_LINKS,
            recv_buffer_size: RECV_BUFFER_SIZE,
            tx_buffer_size: TX_BUFFER_SIZE,
            relay_timeout_secs: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let config = FirmwareConfig::default();
        assert_eq!(config.max_links, 4);
        assert_eq!(config.recv_buffer_size, 2048);
        assert_eq!(config.tx_buffer_size, 2048);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: FirmwareConfig =
            serde_json::from_str(r#"{"greeting":"Hello","max_links":2}"#).unwrap();
        assert_eq!(config.greeting, "Hello");
        assert_eq!(config.max_links, 2);
        assert_eq!(config.recv_buffer_size, 2048);
    }
}
