//! TTL-memoized metadata caching with coalesced concurrent refresh.
//!
//! This is the only layer of the controller permitted to serve stale data
//! (§4.E); every mutating operation bypasses it and goes straight through
//! `voltra-cluster`'s runtime proxy.

mod metadata;
mod ttl_cache;

pub use metadata::{CachedMetadata, DEFAULT_TTL};
pub use ttl_cache::{Cached, TtlCache};
