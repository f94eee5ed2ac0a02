// SPDX-License-Identifier: BSD-3-Clause

//! The client session: one persistent socket issuing FIND then CALL requests in strict order.

use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};

use log::warn;

use crate::error::RpcError;
use crate::framing::{self, FLAG_CALL, FLAG_CONSISTENT, FLAG_FIND, FLAG_FOUND, FLAG_NOT_FOUND};
use crate::payload::PayloadRecord;
use crate::registry::{is_valid_name, ProcedureId};

/// A resolved handle to a remote procedure, opaque to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handle(ProcedureId);

impl Handle {
    pub(crate) fn new(id: ProcedureId) -> Self {
        Self(id)
    }
}

/// A client session. Not safe for concurrent use from multiple callers: `find` and `call` expect
/// to be serialized by the caller, the same way the source's single-socket client does.
pub struct Client {
    stream: TcpStream,
}

impl Client {
    /// Resolves `addr`, preferring an IPv6 result, and connects a single stream socket that is
    /// reused for the session's whole lifetime.
    pub fn connect(addr: &str, port: u16) -> Result<Self, RpcError> {
        let mut candidates: Vec<SocketAddr> = (addr, port)
            .to_socket_addrs()
            .map_err(|_| RpcError::AddressInfo)?
            .collect();

        if candidates.is_empty() {
            return Err(RpcError::AddressInfo);
        }

        // IPv4-mapped addresses are acceptable, but IPv6 is preferred, matching the source's
        // `AF_INET6` resolution hint.
        candidates.sort_by_key(|a| !a.is_ipv6());

        for candidate in &candidates {
            if let Ok(stream) = TcpStream::connect(candidate) {
                return Ok(Self { stream });
            }
        }

        Err(RpcError::NetworkFailure(std::io::Error::new(
            std::io::ErrorKind::NotConnected,
            "no candidate address accepted a connection",
        )))
    }

    /// Looks up `name` on the server. Returns `None` on an unknown name, an invalid name, or any
    /// network failure; the session remains usable afterward either way.
    pub fn find(&mut self, name: &str) -> Option<Handle> {
        if !is_valid_name(name) {
            warn!("{}: {name}", RpcError::InvalidName);
            return None;
        }

        self.try_find(name).unwrap_or_else(|e| {
            warn!("find failed: {e}");
            None
        })
    }

    fn try_find(&mut self, name: &str) -> Result<Option<Handle>, RpcError> {
        framing::write_flag(&mut self.stream, FLAG_FIND)?;
        framing::write_size(&mut self.stream, name.len())?;
        framing::write_bytes(&mut self.stream, name.as_bytes())?;

        match framing::read_flag(&mut self.stream)? {
            FLAG_FOUND => {
                let id = framing::read_id(&mut self.stream)?;
                Ok(Some(Handle::new(ProcedureId(id))))
            }
            FLAG_NOT_FOUND => Ok(None),
            _ => Err(RpcError::Protocol),
        }
    }

    /// Calls the procedure named by `handle` with `payload`. Returns `None` if `payload` violates
    /// the consistency invariant, if the server reports the result as inconsistent, or on any
    /// network failure; the session remains usable afterward either way.
    pub fn call(&mut self, handle: &Handle, payload: &PayloadRecord) -> Option<PayloadRecord> {
        if !payload.is_consistent() {
            warn!("{}", RpcError::InconsistentData);
            return None;
        }

        self.try_call(handle, payload).unwrap_or_else(|e| {
            warn!("call failed: {e}");
            None
        })
    }

    fn try_call(
        &mut self,
        handle: &Handle,
        payload: &PayloadRecord,
    ) -> Result<Option<PayloadRecord>, RpcError> {
        framing::write_flag(&mut self.stream, FLAG_CALL)?;
        framing::write_id(&mut self.stream, handle.0.value())?;
        payload.encode(&mut self.stream)?;

        match framing::read_flag(&mut self.stream)? {
            FLAG_CONSISTENT => Ok(Some(PayloadRecord::decode(&mut self.stream)?)),
            _ => Ok(None),
        }
    }

    /// Closes the socket and releases session state. Equivalent to dropping the client; exposed
    /// explicitly to mirror `rpc_close_client`.
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}
