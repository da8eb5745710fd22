//! Framed request/reply transport and connection pooling.
//!
//! This crate owns the one opaque thing the rest of the controller talks
//! through: a [`Transport`] addressed by [`voltra_types::NodeRef`]. Nothing
//! above this layer knows about sockets, framing, or connection reuse; it
//! only knows how to serialize a request and wait for a typed reply.

mod error;
mod framing;
mod pool;
mod tcp;
mod transport;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use error::TransportError;
pub use pool::ConnectionPool;
pub use tcp::TcpTransport;
pub use transport::{request, send, Transport};
