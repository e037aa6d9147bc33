//! Seam between the gateway and the upstream index

use async_trait::async_trait;
use bytes::Bytes;

use crate::Result;
use crate::types::{Credentials, SubtitleQuery, SubtitleResult};

/// A subtitle index the gateway can search and download from.
///
/// Implemented by [`TitloviClient`](crate::upstream::TitloviClient); tests
/// substitute in-memory sources.
#[async_trait]
pub trait SubtitleSource: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &str;

    /// Search on behalf of an account.
    async fn search(
        &self,
        query: &SubtitleQuery,
        credentials: &Credentials,
    ) -> Result<Vec<SubtitleResult>>;

    /// Fetch the raw archive for a subtitle.
    async fn download(&self, media_type: &str, media_id: &str) -> Result<Bytes>;
}
