//! Channel multiplexer.
//!
//! Owns the bounded set of active links and all their receive buffers. All
//! access to link state, including from command handlers, goes through the
//! operations here; nothing else mutates a link.
//!
//! The multiplexer is polled once per outer loop iteration, independent of
//! whether a command line arrived, to advance retirement, receive buffering
//! and admission.

use crate::error::{LinkError, LinkResult};
use crate::transport::{Connection, Listener, RemoteInfo};

/// Default maximum number of concurrently admitted links.
pub const MAX_LINKS: usize = 4;

/// Default per-link receive buffer capacity in bytes.
pub const RECV_BUFFER_SIZE: usize = 2048;

/// External identity of a link: its slot index, stable for the lifetime of
/// the connection occupying it.
pub type LinkId = usize;

/// Fixed multiplexer limits, decided at construction. No dynamic growth:
/// worst-case memory is `max_links * recv_capacity`.
#[derive(Debug, Clone)]
pub struct MuxConfig {
    /// Number of link slots.
    pub max_links: usize,
    /// Receive buffer capacity per link.
    pub recv_capacity: usize,
}

impl Default for MuxConfig {
    fn default() -> Self {
        MuxConfig {
            max_links: MAX_LINKS,
            recv_capacity: RECV_BUFFER_SIZE,
        }
    }
}

/// Events produced by one [`ChannelMux::poll`] pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// A new inbound connection was admitted into the given slot.
    Connected {
        /// Slot the connection was assigned.
        link: LinkId,
    },
    /// A link's connection reported closed and its slot was retired.
    Closed {
        /// Slot that was freed.
        link: LinkId,
    },
    /// An inbound connection was refused (all slots occupied) and actively
    /// closed.
    Rejected,
}

struct Link {
    conn: Box<dyn Connection>,
    /// Fixed-size receive buffer; `len` bytes at the front are buffered but
    /// not yet consumed.
    buf: Vec<u8>,
    len: usize,
}

struct Slot {
    link: Option<Link>,
    /// Incremented each time the slot is retired; makes reuse observable.
    generation: u32,
}

/// The bounded collection of active links.
pub struct ChannelMux {
    slots: Vec<Slot>,
    config: MuxConfig,
}

impl ChannelMux {
    /// Create a multiplexer with the given fixed limits.
    pub fn new(config: MuxConfig) -> Self {
        let slots = (0..config.max_links)
            .map(|_| Slot {
                link: None,
                generation: 0,
            })
            .collect();
        ChannelMux { slots, config }
    }

    /// One cooperative scheduling pass: retire closed links, receive into
    /// free buffer space, then admit at most one waiting connection.
    pub fn poll(&mut self, mut listener: Option<&mut dyn Listener>) -> Vec<LinkEvent> {
        let mut events = Vec::new();
        let capacity = self.config.recv_capacity;

        // Retirement first, so a freed slot is available for admission in
        // the same pass. Retiring is idempotent: the slot is emptied, so a
        // second poll produces no duplicate event.
        for (id, slot) in self.slots.iter_mut().enumerate() {
            if let Some(link) = &slot.link {
                if !link.conn.connected() {
                    log::debug!("link {}: connection closed, retiring", id);
                    slot.link = None;
                    slot.generation = slot.generation.wrapping_add(1);
                    events.push(LinkEvent::Closed { link: id });
                }
            }
        }

        // Receive pass with pure backpressure: either the whole available
        // amount fits in free space, or nothing is copied this poll and the
        // bytes stay in the transport's own buffer.
        for (id, slot) in self.slots.iter_mut().enumerate() {
            let Some(link) = slot.link.as_mut() else {
                continue;
            };
            let available = link.conn.available();
            if available == 0 {
                continue;
            }
            let free = capacity - link.len;
            if available > free {
                log::warn!(
                    "link {}: deferring receive of {} bytes, only {} free",
                    id,
                    available,
                    free
                );
                continue;
            }
            match link.conn.read(&mut link.buf[link.len..link.len + available]) {
                Ok(n) => {
                    link.len += n;
                    log::trace!("link {}: buffered {} bytes ({} total)", id, n, link.len);
                }
                Err(e) => {
                    log::warn!("link {}: receive failed: {}", id, e);
                }
            }
        }

        // Admission: one waiting connection per pass. A full table closes
        // the connection actively rather than leaving it dangling.
        if let Some(listener) = listener.as_deref_mut() {
            if let Some(mut conn) = listener.accept() {
                match self.slots.iter_mut().position(|s| s.link.is_none()) {
                    Some(id) => {
                        log::debug!("admitted connection from {:?} as link {}", conn.remote(), id);
                        self.slots[id].link = Some(Link {
                            conn,
                            buf: vec![0u8; capacity],
                            len: 0,
                        });
                        events.push(LinkEvent::Connected { link: id });
                    }
                    None => {
                        log::warn!(
                            "rejecting connection from {:?}: all {} slots in use",
                            conn.remote(),
                            self.config.max_links
                        );
                        conn.close();
                        events.push(LinkEvent::Rejected);
                    }
                }
            }
        }

        events
    }

    /// Bytes buffered but not yet consumed on a link. Zero for free slots.
    pub fn buffered_len(&self, link: LinkId) -> usize {
        self.slots
            .get(link)
            .and_then(|s| s.link.as_ref())
            .map_or(0, |l| l.len)
    }

    /// Whether a slot currently holds a connected link.
    pub fn is_connected(&self, link: LinkId) -> bool {
        self.slots
            .get(link)
            .and_then(|s| s.link.as_ref())
            .is_some_and(|l| l.conn.connected())
    }

    /// Remote endpoint of an active link.
    pub fn remote(&self, link: LinkId) -> Option<RemoteInfo> {
        self.slots
            .get(link)
            .and_then(|s| s.link.as_ref())
            .map(|l| l.conn.remote())
    }

    /// Local port an active link arrived on.
    pub fn local_port(&self, link: LinkId) -> Option<u16> {
        self.slots
            .get(link)
            .and_then(|s| s.link.as_ref())
            .map(|l| l.conn.local_port())
    }

    /// Slot ids currently occupied, in slot order.
    pub fn active_links(&self) -> impl Iterator<Item = LinkId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.link.is_some())
            .map(|(id, _)| id)
    }

    /// Reuse generation of a slot, advanced on every retirement.
    pub fn generation(&self, link: LinkId) -> Option<u32> {
        self.slots.get(link).map(|s| s.generation)
    }

    /// Take up to `requested` buffered bytes from the front of a link's
    /// buffer, together with its remote endpoint.
    ///
    /// The buffered count is reset to zero regardless of `requested`: bytes
    /// past the request are discarded, not retained.
    pub fn consume(
        &mut self,
        link: LinkId,
        requested: usize,
    ) -> LinkResult<(Vec<u8>, RemoteInfo)> {
        let slot = self
            .slots
            .get_mut(link)
            .ok_or(LinkError::ChannelUnavailable(link))?;
        let l = slot
            .link
            .as_mut()
            .ok_or(LinkError::ChannelUnavailable(link))?;

        let actual = requested.min(l.len);
        let data = l.buf[..actual].to_vec();
        if actual < l.len {
            log::debug!(
                "link {}: discarding {} unconsumed bytes",
                link,
                l.len - actual
            );
        }
        l.len = 0;
        Ok((data, l.conn.remote()))
    }

    /// Write bytes to a link's connection, returning how many the transport
    /// accepted. The caller compares against the requested length to detect
    /// a short write.
    pub fn send(&mut self, link: LinkId, data: &[u8]) -> LinkResult<usize> {
        let slot = self
            .slots
            .get_mut(link)
            .ok_or(LinkError::ChannelUnavailable(link))?;
        let l = slot
            .link
            .as_mut()
            .ok_or(LinkError::ChannelUnavailable(link))?;
        if !l.conn.connected() {
            return Err(LinkError::ChannelUnavailable(link));
        }
        Ok(l.conn.write(data)?)
    }

    /// Number of link slots.
    pub fn max_links(&self) -> usize {
        self.config.max_links
    }

    /// Per-link receive buffer capacity.
    pub fn recv_capacity(&self) -> usize {
        self.config.recv_capacity
    }
}
