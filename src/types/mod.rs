//! Public types for the gateway API.

mod account;
mod lookup;
mod query;
mod subtitle;

pub use account::{Credentials, Session};
pub use lookup::{CacheStatus, Lookup};
pub use query::SubtitleQuery;
pub use subtitle::{SubtitleFile, SubtitleFormat, SubtitleItem, SubtitleResult};
