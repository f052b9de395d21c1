//! Send-mode relay.
//!
//! The `CIPSEND` path temporarily repurposes the input stream: instead of
//! line parsing, raw bytes are collected into a fixed transmit buffer until
//! a promised length is reached, then forwarded to the target link in one
//! piece.
//!
//! The relay is an explicit sub-state of the outer dispatch loop, advanced
//! one chunk per iteration rather than blocking inside a handler, so the
//! rest of the system keeps its cooperative scheduling. A deadline bounds
//! the wait: a caller that never supplies the promised byte count aborts
//! with [`LinkError::Timeout`] instead of stalling the engine forever.

use std::time::{Duration, Instant};

use bytes::BytesMut;

use crate::error::{LinkError, LinkResult};
use crate::mux::{ChannelMux, LinkId};

/// Fixed transmit buffer capacity in bytes.
pub const TX_BUFFER_SIZE: usize = 2048;

/// Default collection deadline.
pub const RELAY_TIMEOUT: Duration = Duration::from_secs(10);

enum RelayState {
    Idle,
    Collecting {
        link: LinkId,
        expected: usize,
        collected: BytesMut,
        deadline: Instant,
    },
}

/// Collects a fixed-length raw payload and forwards it to one link.
///
/// While a collection is active, the dispatch engine suspends line parsing;
/// `is_active` is the suspend flag. Every exit path, success or failure,
/// leaves the relay idle again.
pub struct SendRelay {
    state: RelayState,
    capacity: usize,
    timeout: Duration,
}

impl SendRelay {
    /// Create a relay with the default buffer capacity and deadline.
    pub fn new() -> Self {
        Self::with_limits(TX_BUFFER_SIZE, RELAY_TIMEOUT)
    }

    /// Create a relay with explicit limits.
    pub fn with_limits(capacity: usize, timeout: Duration) -> Self {
        SendRelay {
            state: RelayState::Idle,
            capacity,
            timeout,
        }
    }

    /// Whether a collection is in progress (the dispatch suspend flag).
    pub fn is_active(&self) -> bool {
        matches!(self.state, RelayState::Collecting { .. })
    }

    /// Bytes still needed to reach the promised length.
    pub fn remaining(&self) -> usize {
        match &self.state {
            RelayState::Idle => 0,
            RelayState::Collecting {
                expected,
                collected,
                ..
            } => expected - collected.len(),
        }
    }

    /// Whether the promised length has been collected.
    pub fn is_complete(&self) -> bool {
        matches!(
            &self.state,
            RelayState::Collecting { expected, collected, .. } if collected.len() == *expected
        )
    }

    /// Arm the relay for `expected` bytes to `link`.
    ///
    /// Validates before any mode switch: the length must be non-zero and
    /// fit the transmit buffer, and the link must be active and connected.
    pub fn begin(&mut self, mux: &ChannelMux, link: LinkId, expected: usize) -> LinkResult<()> {
        if expected == 0 {
            return Err(LinkError::EmptyRequest);
        }
        if expected > self.capacity {
            return Err(LinkError::RequestTooLarge {
                requested: expected,
                capacity: self.capacity,
            });
        }
        if !mux.is_connected(link) {
            return Err(LinkError::ChannelUnavailable(link));
        }

        log::debug!("send relay armed: {} bytes to link {}", expected, link);
        self.state = RelayState::Collecting {
            link,
            expected,
            collected: BytesMut::with_capacity(expected),
            deadline: Instant::now() + self.timeout,
        };
        Ok(())
    }

    /// Feed raw input bytes; returns how many were consumed. Bytes past the
    /// promised length are left to the caller to discard.
    pub fn push(&mut self, data: &[u8]) -> usize {
        let RelayState::Collecting {
            expected,
            collected,
            ..
        } = &mut self.state
        else {
            return 0;
        };
        let take = data.len().min(*expected - collected.len());
        collected.extend_from_slice(&data[..take]);
        take
    }

    /// Abort the collection if its deadline has passed.
    pub fn check_deadline(&mut self) -> LinkResult<()> {
        let RelayState::Collecting { deadline, .. } = &self.state else {
            return Ok(());
        };
        if Instant::now() < *deadline {
            return Ok(());
        }
        self.state = RelayState::Idle;
        Err(LinkError::Timeout(self.timeout))
    }

    /// Forward the collected payload to its target link.
    ///
    /// Must only be called once [`is_complete`](Self::is_complete) holds.
    /// The relay is idle afterward no matter the outcome; a transport that
    /// accepts fewer bytes than promised is a [`LinkError::ShortWrite`].
    pub fn finish(&mut self, mux: &mut ChannelMux) -> LinkResult<usize> {
        let state = std::mem::replace(&mut self.state, RelayState::Idle);
        let RelayState::Collecting {
            link,
            expected,
            collected,
            ..
        } = state
        else {
            return Err(LinkError::ChannelUnavailable(0));
        };

        let sent = mux.send(link, &collected)?;
        if sent != expected {
            log::warn!(
                "link {}: short write, {} of {} bytes accepted",
                link,
                sent,
                expected
            );
            return Err(LinkError::ShortWrite { sent, expected });
        }
        log::debug!("link {}: relayed {} bytes", link, sent);
        Ok(sent)
    }

    /// Drop any collection in progress.
    pub fn abort(&mut self) {
        self.state = RelayState::Idle;
    }
}

impl Default for SendRelay {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mux::MuxConfig;
    use crate::transport::testing::{connection, MemListener, MemPeer};
    use crate::transport::Listener;

    fn mux_with_link() -> (ChannelMux, LinkId, MemPeer) {
        let mut mux = ChannelMux::new(MuxConfig::default());
        let mut listener = MemListener::new();
        let (conn, peer) = connection(50000);
        listener.push(conn);
        mux.poll(Some(&mut listener as &mut dyn Listener));
        (mux, 0, peer)
    }

    #[test]
    fn test_collect_exact_and_forward() {
        let (mut mux, link, peer) = mux_with_link();
        let mut relay = SendRelay::new();

        relay.begin(&mux, link, 5).unwrap();
        assert!(relay.is_active());
        assert_eq!(relay.remaining(), 5);

        assert_eq!(relay.push(b"he"), 2);
        assert!(!relay.is_complete());
        // Only the promised 5 bytes are consumed; the rest is stray input.
        assert_eq!(relay.push(b"lloXYZ"), 3);
        assert!(relay.is_complete());

        assert_eq!(relay.finish(&mut mux).unwrap(), 5);
        assert!(!relay.is_active());
        assert_eq!(peer.received(), b"hello");
    }

    #[test]
    fn test_begin_rejects_oversized_length() {
        let (mux, link, _peer) = mux_with_link();
        let mut relay = SendRelay::with_limits(8, RELAY_TIMEOUT);

        let err = relay.begin(&mux, link, 9).unwrap_err();
        assert!(matches!(
            err,
            LinkError::RequestTooLarge {
                requested: 9,
                capacity: 8
            }
        ));
        assert!(!relay.is_active());
    }

    #[test]
    fn test_begin_rejects_zero_length() {
        let (mux, link, _peer) = mux_with_link();
        let mut relay = SendRelay::new();
        let err = relay.begin(&mux, link, 0).unwrap_err();
        assert!(matches!(err, LinkError::EmptyRequest));
        assert!(!relay.is_active());
    }

    #[test]
    fn test_begin_rejects_dead_link() {
        let (mut mux, link, peer) = mux_with_link();
        peer.close();
        mux.poll(None);

        let mut relay = SendRelay::new();
        let err = relay.begin(&mux, link, 5).unwrap_err();
        assert!(matches!(err, LinkError::ChannelUnavailable(_)));
    }

    #[test]
    fn test_short_write_fails_and_clears() {
        let (mut mux, link, peer) = mux_with_link();
        peer.limit_write(3);

        let mut relay = SendRelay::new();
        relay.begin(&mux, link, 5).unwrap();
        relay.push(b"hello");

        let err = relay.finish(&mut mux).unwrap_err();
        assert!(matches!(
            err,
            LinkError::ShortWrite {
                sent: 3,
                expected: 5
            }
        ));
        // The suspend state is cleared even on failure.
        assert!(!relay.is_active());
    }

    #[test]
    fn test_deadline_aborts_collection() {
        let (mux, link, _peer) = mux_with_link();
        let mut relay = SendRelay::with_limits(TX_BUFFER_SIZE, Duration::from_millis(0));

        relay.begin(&mux, link, 5).unwrap();
        relay.push(b"he");

        let err = relay.check_deadline().unwrap_err();
        assert!(matches!(err, LinkError::Timeout(_)));
        assert!(!relay.is_active());
    }

    #[test]
    fn test_deadline_not_expired() {
        let (mux, link, _peer) = mux_with_link();
        let mut relay = SendRelay::new();
        relay.begin(&mux, link, 5).unwrap();
        assert!(relay.check_deadline().is_ok());
        assert!(relay.is_active());
    }
}
