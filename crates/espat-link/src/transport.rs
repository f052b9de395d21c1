//! Transport boundary.
//!
//! The link layer manages framing and buffering on top of an assumed
//! reliable byte-stream transport. The platform supplies that transport
//! through these traits; the crate never opens sockets itself.

use std::io;
use std::net::IpAddr;

/// Remote endpoint metadata for an accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteInfo {
    /// Remote IP address.
    pub addr: IpAddr,
    /// Remote port.
    pub port: u16,
}

/// One reliable byte-stream connection.
pub trait Connection {
    /// Number of bytes ready to read without blocking.
    fn available(&mut self) -> usize;

    /// Read up to `buf.len()` bytes. Never blocks.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write bytes, returning how many the transport accepted.
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Whether the connection is still established.
    fn connected(&self) -> bool;

    /// Remote endpoint metadata.
    fn remote(&self) -> RemoteInfo;

    /// Local port the connection arrived on.
    fn local_port(&self) -> u16;

    /// Actively close the connection.
    fn close(&mut self);
}

/// Accept side of the transport: hands out new inbound connections.
pub trait Listener {
    /// Take the next waiting inbound connection, if any. Never blocks.
    fn accept(&mut self) -> Option<Box<dyn Connection>>;
}

pub mod testing {
    //! In-memory transport used by unit tests and the runner's loopback
    //! mode. A [`MemConnection`] is the device end; the paired [`MemPeer`]
    //! plays the remote client.

    use std::collections::VecDeque;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::{Arc, Mutex};

    use super::{Connection, Listener, RemoteInfo};

    #[derive(Debug, Default)]
    struct Shared {
        to_device: VecDeque<u8>,
        from_device: VecDeque<u8>,
        open: bool,
        /// Cap on how many bytes a single device write may accept.
        write_limit: Option<usize>,
    }

    /// Device end of an in-memory connection pair.
    pub struct MemConnection {
        shared: Arc<Mutex<Shared>>,
        remote: RemoteInfo,
        local_port: u16,
    }

    /// Remote end of an in-memory connection pair.
    pub struct MemPeer {
        shared: Arc<Mutex<Shared>>,
    }

    /// Create a connected pair. `remote_port` shows up in the device end's
    /// [`RemoteInfo`].
    pub fn connection(remote_port: u16) -> (MemConnection, MemPeer) {
        let shared = Arc::new(Mutex::new(Shared {
            open: true,
            ..Shared::default()
        }));
        let conn = MemConnection {
            shared: shared.clone(),
            remote: RemoteInfo {
                addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
                port: remote_port,
            },
            local_port: 333,
        };
        let peer = MemPeer { shared };
        (conn, peer)
    }

    impl MemPeer {
        /// Queue bytes for the device to receive.
        pub fn send(&self, data: &[u8]) {
            self.shared.lock().unwrap().to_device.extend(data);
        }

        /// Drain everything the device has written so far.
        pub fn received(&self) -> Vec<u8> {
            self.shared.lock().unwrap().from_device.drain(..).collect()
        }

        /// Drop the connection from the remote side.
        pub fn close(&self) {
            self.shared.lock().unwrap().open = false;
        }

        /// Whether the connection is still open.
        pub fn is_open(&self) -> bool {
            self.shared.lock().unwrap().open
        }

        /// Make each device write accept at most `limit` bytes, to exercise
        /// short-write handling.
        pub fn limit_write(&self, limit: usize) {
            self.shared.lock().unwrap().write_limit = Some(limit);
        }
    }

    impl Connection for MemConnection {
        fn available(&mut self) -> usize {
            self.shared.lock().unwrap().to_device.len()
        }

        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let mut shared = self.shared.lock().unwrap();
            let n = buf.len().min(shared.to_device.len());
            for slot in buf.iter_mut().take(n) {
                *slot = shared.to_device.pop_front().unwrap();
            }
            Ok(n)
        }

        fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
            let mut shared = self.shared.lock().unwrap();
            if !shared.open {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::NotConnected,
                    "peer closed",
                ));
            }
            let n = shared.write_limit.map_or(data.len(), |l| l.min(data.len()));
            shared.from_device.extend(&data[..n]);
            Ok(n)
        }

        fn connected(&self) -> bool {
            self.shared.lock().unwrap().open
        }

        fn remote(&self) -> RemoteInfo {
            self.remote
        }

        fn local_port(&self) -> u16 {
            self.local_port
        }

        fn close(&mut self) {
            self.shared.lock().unwrap().open = false;
        }
    }

    /// In-memory listener: connections are queued by hand.
    #[derive(Default)]
    pub struct MemListener {
        pending: VecDeque<Box<dyn Connection>>,
    }

    impl MemListener {
        /// Create an empty listener.
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue an inbound connection for the next poll.
        pub fn push(&mut self, conn: MemConnection) {
            self.pending.push_back(Box::new(conn));
        }
    }

    impl Listener for MemListener {
        fn accept(&mut self) -> Option<Box<dyn Connection>> {
            self.pending.pop_front()
        }
    }

}
