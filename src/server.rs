// SPDX-License-Identifier: BSD-3-Clause

//! The server acceptor and per-connection handler.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, trace, warn};

use crate::error::RpcError;
use crate::framing::{self, FLAG_CALL, FLAG_CONSISTENT, FLAG_FIND, FLAG_FOUND, FLAG_INCONSISTENT, FLAG_NOT_FOUND};
use crate::payload::PayloadRecord;
use crate::registry::{Handler, ProcedureId, Registry};

/// A server hosting named procedures, reachable over a single persistent stream connection per
/// client.
///
/// No read/write deadline is applied by default, matching the source's observable behavior: a
/// stuck peer blocks its worker thread indefinitely. [`Server::with_read_timeout`] opts a server
/// into a bounded deadline instead, per the design notes' advisory "add an optional read timeout"
/// open question.
pub struct Server {
    listener: TcpListener,
    registry: Arc<Registry>,
    /// Applied as both the read and write deadline of each accepted socket.
    read_timeout: Option<Duration>,
}

impl Server {
    /// Binds a passive IPv6 stream socket to `port` with address reuse enabled and a listen
    /// backlog of 5, matching the source's `rpc_init_server`. IPv4-mapped connections are
    /// acceptable; `TcpListener::bind` on `[::]:port` already accepts both on platforms where
    /// dual-stack sockets default to enabled.
    pub fn bind(port: u16) -> Result<Self, RpcError> {
        let listener = TcpListener::bind(("::", port)).map_err(|_| RpcError::SocketCreation)?;

        Ok(Self {
            listener,
            registry: Arc::new(Registry::new()),
            read_timeout: None,
        })
    }

    /// Returns the port this server is actually bound to (useful when binding to port 0 for an
    /// OS-assigned ephemeral port in tests).
    pub fn local_port(&self) -> u16 {
        self.listener
            .local_addr()
            .expect("a bound listener always has a local address")
            .port()
    }

    /// Opts every future connection into a read/write deadline: a peer that goes silent mid-unit
    /// for longer than `timeout` fails that connection's worker with a network failure instead of
    /// blocking it forever. `None` restores the default no-timeout behavior. Must be called before
    /// [`Server::serve`]; it has no effect on connections already being served.
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Registers `handler` under `name`, returning its procedure id.
    ///
    /// A duplicate name replaces the handler but keeps the existing id (see the registry's
    /// duplicate-register rule).
    pub fn register<F>(&self, name: &str, handler: F) -> Result<ProcedureId, RpcError>
    where
        F: Fn(&PayloadRecord) -> Option<PayloadRecord> + Send + Sync + 'static,
    {
        self.registry.register(name, Arc::new(handler) as Arc<Handler>)
    }

    /// Accepts connections forever, spawning one worker thread per accepted socket. A worker
    /// failure (a network error or a malformed request) terminates only that connection; the
    /// acceptor loop itself never stops.
    pub fn serve(&self) -> ! {
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    debug!("accepted connection from {peer}");
                    if let Some(timeout) = self.read_timeout {
                        if let Err(e) = stream.set_read_timeout(Some(timeout)) {
                            warn!("failed to set read timeout on {peer}: {e}");
                        }
                        if let Err(e) = stream.set_write_timeout(Some(timeout)) {
                            warn!("failed to set write timeout on {peer}: {e}");
                        }
                    }
                    let registry = Arc::clone(&self.registry);
                    if thread::Builder::new()
                        .spawn(move || {
                            if let Err(e) = handle_connection(stream, &registry) {
                                warn!("connection worker exited: {e}");
                            }
                        })
                        .is_err()
                    {
                        warn!("{}", RpcError::Thread);
                    }
                }
                Err(e) => warn!("accept failed: {e}"),
            }
        }
    }
}

/// Serially reads request units from `stream` and dispatches each to FIND or CALL until the peer
/// closes the connection or a network failure occurs.
fn handle_connection(mut stream: TcpStream, registry: &Registry) -> Result<(), RpcError> {
    loop {
        let flag = match framing::try_read_flag(&mut stream)? {
            Some(flag) => flag,
            None => return Ok(()),
        };

        match flag {
            FLAG_FIND => handle_find(&mut stream, registry)?,
            FLAG_CALL => handle_call(&mut stream, registry)?,
            _ => return Err(RpcError::Protocol),
        }
    }
}

fn handle_find(stream: &mut TcpStream, registry: &Registry) -> Result<(), RpcError> {
    let len = framing::read_size(stream)?;
    if len > framing::MAX_NAME_LEN {
        return Err(RpcError::InvalidName);
    }
    let name_bytes = framing::read_bytes(stream, len)?;
    let name = String::from_utf8(name_bytes).map_err(|_| RpcError::InvalidName)?;

    trace!("FIND {name}");

    match registry.find(&name) {
        Some(id) => {
            framing::write_flag(stream, FLAG_FOUND)?;
            framing::write_id(stream, id.value())
        }
        None => {
            warn!("{}: {name}", RpcError::HandlerNotFound);
            framing::write_flag(stream, FLAG_NOT_FOUND)
        }
    }
}

fn handle_call(stream: &mut TcpStream, registry: &Registry) -> Result<(), RpcError> {
    let id = ProcedureId(framing::read_id(stream)?);
    let request = PayloadRecord::decode(stream)?;

    trace!("CALL {}", id.value());

    // If the id was never resolved by a prior FIND (a fabricated id, or a FIND that raced a
    // replacement), the source would invoke a null handler. This rewrite rejects the call as
    // inconsistent instead, per the documented unknown-id rule.
    let response = registry
        .resolve(id)
        .and_then(|handler| handler(&request));

    match response {
        Some(payload) if payload.is_consistent() => {
            framing::write_flag(stream, FLAG_CONSISTENT)?;
            payload.encode(stream)
        }
        _ => framing::write_flag(stream, FLAG_INCONSISTENT),
    }
}

// End-to-end FIND/CALL scenarios (including concurrent clients) live in `tests/rpc_integration.rs`
// since they need the public API only. The test below is white-box: it fabricates a procedure id
// that was never produced by a FIND, which `Handle::new` only lets crate-internal code do.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Client, Handle};
    use std::thread;
    use std::time::Duration;

    fn connect_with_retry(port: u16) -> Client {
        for _ in 0..50 {
            if let Ok(client) = Client::connect("127.0.0.1", port) {
                return client;
            }
            thread::sleep(Duration::from_millis(10));
        }
        panic!("server never became connectable");
    }

    #[test]
    fn unknown_procedure_id_is_rejected_as_inconsistent() {
        let server = Server::bind(0).unwrap();
        let port = server.local_port();
        server
            .register("add2", |payload| Some(payload.clone()))
            .unwrap();
        thread::spawn(move || server.serve());

        let mut client = connect_with_retry(port);
        let fabricated = Handle::new(ProcedureId(u32::MAX));
        assert!(client
            .call(&fabricated, &PayloadRecord::new(0, None))
            .is_none());
    }

    #[test]
    fn idle_connection_is_dropped_once_the_read_timeout_elapses() {
        let server = Server::bind(0).unwrap().with_read_timeout(Some(Duration::from_millis(50)));
        let port = server.local_port();
        thread::spawn(move || server.serve());

        let mut idle = TcpStream::connect(("127.0.0.1", port)).unwrap();
        idle.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

        // Send nothing. The worker's read times out and the connection closes from the server
        // side, which this end observes as an orderly EOF well before our own 2s read deadline.
        let mut buf = [0u8; 1];
        let n = idle.read(&mut buf).unwrap();
        assert_eq!(n, 0);
    }
}
