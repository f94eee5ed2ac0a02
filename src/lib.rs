// SPDX-License-Identifier: BSD-3-Clause

//! A minimal RPC runtime: a server that hosts named procedures and a client that discovers and
//! invokes them over a single persistent stream connection.
//!
//! Procedures exchange a [`PayloadRecord`]: one machine integer plus an opaque byte buffer of
//! declared length. A server binds with [`Server::bind`], registers handlers with
//! [`Server::register`], and serves forever with [`Server::serve`]. A client connects with
//! [`Client::connect`], resolves a procedure name with [`Client::find`], and invokes it with
//! [`Client::call`].

pub mod client;
pub mod error;
pub mod framing;
pub mod keyed_map;
pub mod payload;
pub mod registry;
pub mod server;

pub use client::{Client, Handle};
pub use error::RpcError;
pub use payload::PayloadRecord;
pub use registry::ProcedureId;
pub use server::Server;
