//! Cache-aside search and download

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use tracing::{debug, instrument};

use super::GatewayBuilder;
use crate::cache::ResponseCache;
use crate::pipeline::SubtitlePipeline;
use crate::traits::SubtitleSource;
use crate::types::{Credentials, Lookup, SubtitleFile, SubtitleItem, SubtitleQuery};
use crate::{GatewayError, Result};

/// The gateway core: validates requests, consults the response cache, and
/// on a miss calls the upstream and the subtitle pipeline.
pub struct SubtitleGateway {
    pub(super) source: Arc<dyn SubtitleSource>,
    pub(super) cache: ResponseCache,
    pub(super) pipeline: SubtitlePipeline,
    pub(super) public_url: String,
    pub(super) languages: Vec<String>,
    pub(super) language_suffix: Option<String>,
}

impl SubtitleGateway {
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::new()
    }

    /// Subtitles for a video id (`tt0111161` or `tt0944947:1:2`) in the
    /// configured languages.
    ///
    /// Results are cached per video id. Each item's URL points at this
    /// gateway's download route.
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn search(
        &self,
        video_id: &str,
        credentials: &Credentials,
    ) -> Result<Lookup<Arc<Vec<SubtitleItem>>>> {
        if !credentials.is_complete() {
            return Err(GatewayError::InvalidInput(
                "username and password are required".into(),
            ));
        }
        let query = SubtitleQuery::from_video_id(video_id)?.languages(self.languages.iter().cloned());
        let key = video_id.trim();

        // Set when this caller's own credentials ran the shared computation.
        let started = AtomicBool::new(false);
        let shared = self
            .cache
            .search_or_fetch(key, async {
                started.store(true, Ordering::Relaxed);
                self.fetch_items(&query, credentials).await
            })
            .await;

        match shared {
            // A login failure belongs to the account that started the shared
            // lookup; this caller runs again with its own credentials.
            Err(e) if e.is_caller_scoped() && !started.load(Ordering::Relaxed) => {
                debug!(error = %e, "shared search failed for another account, fetching with own credentials");
                let items = self.fetch_items(&query, credentials).await?;
                self.cache.set_search(key, items.clone()).await;
                Ok(Lookup::miss(items))
            }
            other => other,
        }
    }

    async fn fetch_items(
        &self,
        query: &SubtitleQuery,
        credentials: &Credentials,
    ) -> Result<Arc<Vec<SubtitleItem>>> {
        let results = self.source.search(query, credentials).await?;
        let items: Vec<SubtitleItem> = results
            .iter()
            .map(|result| SubtitleItem::from_result(result, &self.public_url, self.language_suffix.as_deref()))
            .collect();
        debug!(source = self.source.name(), count = items.len(), "search results fetched");
        Ok(Arc::new(items))
    }

    /// A processed subtitle file for an upstream type and id.
    ///
    /// The archive is downloaded, the first subtitle entry extracted,
    /// decoded to UTF-8 and converted to the configured format. Cached per
    /// `{type}-{id}`; `fetched_at` is the time of the upstream download.
    #[instrument(skip(self))]
    pub async fn download(&self, media_type: &str, media_id: &str) -> Result<Lookup<SubtitleFile>> {
        let media_type = media_type.trim();
        let media_id = media_id.trim();
        if media_type.is_empty() || media_id.is_empty() {
            return Err(GatewayError::InvalidInput(
                "subtitle type and id are required".into(),
            ));
        }
        let key = ResponseCache::subtitle_key(media_type, media_id);

        self.cache
            .subtitle_or_fetch(&key, async {
                let archive = self.source.download(media_type, media_id).await?;
                self.pipeline.process(&archive, Utc::now())
            })
            .await
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn pipeline(&self) -> &SubtitlePipeline {
        &self.pipeline
    }

    pub fn public_url(&self) -> &str {
        &self.public_url
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }
}
