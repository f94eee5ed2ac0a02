// SPDX-License-Identifier: BSD-3-Clause

use std::fmt;
use std::io;

/// Errors surfaced by the RPC runtime.
///
/// Replaces the source implementation's "-1 / null / zero-bytes" sentinel triad with a typed
/// result: every fallible operation in this crate returns `Result<_, RpcError>` instead of an
/// out-of-band disposition code.
#[derive(Debug)]
pub enum RpcError {
    /// A required argument was missing or empty (e.g. an empty procedure name).
    InvalidArguments,

    /// A procedure name contained a byte outside the printable ASCII range 32-126, or exceeded
    /// the maximum name length.
    InvalidName,

    /// Resolving the peer address failed.
    AddressInfo,

    /// Creating or binding the listening socket failed.
    SocketCreation,

    /// A `send`/`write` failed, or a `recv`/`read` returned an error.
    NetworkFailure(io::Error),

    /// A `recv`/`read` returned zero bytes before the declared frame length was reached.
    ConnectionLost,

    /// A size or integer field exceeded the range its wire representation permits on this host.
    Overlength,

    /// The payload consistency invariant (`data2_len == 0` iff `data2` absent) was violated.
    InconsistentData,

    /// A `find` request named a procedure this server never registered.
    HandlerNotFound,

    /// Spawning a connection worker thread failed.
    Thread,

    /// A unit began with a byte that matches none of the known request/response flags.
    Protocol,
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArguments => write!(f, "invalid arguments"),
            Self::InvalidName => write!(f, "invalid procedure name"),
            Self::AddressInfo => write!(f, "address resolution failed"),
            Self::SocketCreation => write!(f, "socket creation failed"),
            Self::NetworkFailure(e) => write!(f, "network failure: {e}"),
            Self::ConnectionLost => write!(f, "connection lost"),
            Self::Overlength => write!(f, "value exceeds the range its wire representation permits"),
            Self::InconsistentData => write!(f, "inconsistent data"),
            Self::HandlerNotFound => write!(f, "handler not found"),
            Self::Thread => write!(f, "worker thread creation failed"),
            Self::Protocol => write!(f, "unknown protocol flag"),
        }
    }
}

impl std::error::Error for RpcError {}

impl From<io::Error> for RpcError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Self::ConnectionLost
        } else {
            Self::NetworkFailure(e)
        }
    }
}
