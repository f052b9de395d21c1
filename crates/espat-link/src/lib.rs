//! ESPAT Link Layer
//!
//! Application-level framing and buffering for several concurrent TCP-like
//! client connections, multiplexed through a small set of fixed-capacity
//! per-link buffers.
//!
//! The link layer does not implement TCP or TLS itself: it consumes an
//! abstract [`Connection`] capability from the platform transport and
//! manages admission, receive buffering with explicit backpressure, and a
//! raw-byte relay for bulk send.
//!
//! # Links
//!
//! Each admitted connection occupies one slot of the [`ChannelMux`]. A
//! link's external id is its slot index and stays stable for the lifetime of
//! that connection; retired slots are reused for later admissions, tracked
//! by a per-slot generation counter.
//!
//! # Backpressure
//!
//! The receive path never partially copies: if a poll finds more bytes
//! available than a link's buffer has free, the whole receive is deferred
//! and the bytes stay in the transport's own buffer until capacity frees up.

mod error;
mod mux;
mod relay;
mod transport;

pub use error::*;
pub use mux::*;
pub use relay::*;
pub use transport::*;
