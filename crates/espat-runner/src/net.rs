//! TCP transport for the link layer.
//!
//! Wraps non-blocking `std::net` sockets behind the link layer's
//! [`Connection`] and [`Listener`] traits. Each accepted stream keeps a
//! small staging buffer so `available` can answer without consuming from
//! the kernel more than once per poll.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};

use espat_link::{Connection, Listener, RemoteInfo};

/// One accepted inbound TCP stream.
pub struct TcpLink {
    stream: TcpStream,
    staged: VecDeque<u8>,
    remote: RemoteInfo,
    local_port: u16,
    open: bool,
}

impl TcpLink {
    fn new(stream: TcpStream, peer: SocketAddr, local_port: u16) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        Ok(TcpLink {
            stream,
            staged: VecDeque::new(),
            remote: RemoteInfo {
                addr: peer.ip(),
                port: peer.port(),
            },
            local_port,
            open: true,
        })
    }

    /// Pull whatever the kernel has into the staging buffer.
    fn stage(&mut self) {
        if !self.open {
            return;
        }
        let mut chunk = [0u8; 1024];
        loop {
            match self.stream.read(&mut chunk) {
                // Orderly shutdown from the remote side.
                Ok(0) => {
                    self.open = false;
                    return;
                }
                Ok(n) => self.staged.extend(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return,
                Err(e) => {
                    tracing::debug!(%e, "socket read failed, dropping link");
                    self.open = false;
                    return;
                }
            }
        }
    }
}

impl Connection for TcpLink {
    fn available(&mut self) -> usize {
        self.stage();
        self.staged.len()
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.staged.len());
        for slot in buf.iter_mut().take(n) {
            // The length check above guarantees a byte is present.
            if let Some(byte) = self.staged.pop_front() {
                *slot = byte;
            }
        }
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        match self.stream.write(data) {
            Ok(n) => Ok(n),
            // A saturated socket accepted nothing; the caller sees a short
            // write.
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
            Err(e) => Err(e),
        }
    }

    fn connected(&self) -> bool {
        self.open
    }

    fn remote(&self) -> RemoteInfo {
        self.remote
    }

    fn local_port(&self) -> u16 {
        self.local_port
    }

    fn close(&mut self) {
        if self.open {
            let _ = self.stream.shutdown(Shutdown::Both);
            self.open = false;
        }
    }
}

/// Accept side: a non-blocking TCP listener on the `CIPSERVER` port.
pub struct TcpGateway {
    listener: TcpListener,
    port: u16,
}

impl TcpGateway {
    /// Bind the listener. Fails if the port is taken.
    pub fn bind(port: u16) -> io::Result<Self> {
        let listener = TcpListener::bind(("0.0.0.0", port))?;
        listener.set_nonblocking(true)?;
        tracing::info!(port, "listening");
        Ok(TcpGateway { listener, port })
    }

    /// The bound port.
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Listener for TcpGateway {
    fn accept(&mut self) -> Option<Box<dyn Connection>> {
        match self.listener.accept() {
            Ok((stream, peer)) => match TcpLink::new(stream, peer, self.port) {
                Ok(link) => Some(Box::new(link)),
                Err(e) => {
                    tracing::warn!(%e, "could not set up accepted stream");
                    None
                }
            },
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => None,
            Err(e) => {
                tracing::warn!(%e, "accept failed");
                None
            }
        }
    }
}
