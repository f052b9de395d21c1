//! Link layer error types.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::mux::LinkId;

/// Errors that can occur in the channel multiplexer and send relay.
#[derive(Debug, Error)]
pub enum LinkError {
    /// All link slots are occupied.
    #[error("no free link slot: all {0} in use")]
    CapacityError(usize),

    /// The target link is absent or disconnected.
    #[error("link {0} is not connected")]
    ChannelUnavailable(LinkId),

    /// A relay request promised no bytes at all.
    #[error("invalid request: length must be non-zero")]
    EmptyRequest,

    /// A requested payload length exceeds the transmit buffer capacity.
    #[error("payload length {requested} exceeds transmit capacity {capacity}")]
    RequestTooLarge {
        /// Bytes the caller asked to relay.
        requested: usize,
        /// Fixed transmit buffer capacity.
        capacity: usize,
    },

    /// The transport accepted fewer bytes than requested.
    #[error("short write: {sent} of {expected} bytes accepted")]
    ShortWrite {
        /// Bytes the transport accepted.
        sent: usize,
        /// Bytes that were to be sent.
        expected: usize,
    },

    /// The send relay did not receive its promised byte count in time.
    #[error("send relay timed out after {0:?}")]
    Timeout(Duration),

    /// Transport I/O failure.
    #[error("transport error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias for link operations.
pub type LinkResult<T> = Result<T, LinkError>;
