//! Response caching.
//!
//! [`ResponseCache`] sits in front of the upstream client. It holds two
//! independently typed key-spaces, search results and served subtitle
//! files, so a value of one shape can never be read back as the other.
//! See the [`response`] module docs for keys, expiry and single-flight
//! behavior.

mod keyspace;
pub mod response;

pub use response::{CacheConfig, ResponseCache};
