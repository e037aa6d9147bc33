//! Builder for configuring gateway instances

use std::sync::Arc;

use super::{DEFAULT_LANGUAGES, DEFAULT_LANGUAGE_SUFFIX, SubtitleGateway};
use crate::cache::{CacheConfig, ResponseCache};
use crate::pipeline::{PipelineConfig, SubtitlePipeline};
use crate::traits::SubtitleSource;
use crate::upstream::{TitloviClient, UpstreamConfig};
use crate::{GatewayError, Result};

/// Builder for [`SubtitleGateway`].
///
/// ```rust,no_run
/// # use titlovi_gateway::{SubtitleGateway, UpstreamConfig};
/// # fn main() -> titlovi_gateway::Result<()> {
/// let gateway = SubtitleGateway::builder()
///     .upstream(UpstreamConfig::new())
///     .public_url("https://subs.example.com")
///     .languages(["English", "Hrvatski"])
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct GatewayBuilder {
    upstream: Option<UpstreamConfig>,
    source: Option<Arc<dyn SubtitleSource>>,
    cache: CacheConfig,
    pipeline: PipelineConfig,
    public_url: Option<String>,
    languages: Vec<String>,
    language_suffix: Option<String>,
}

impl GatewayBuilder {
    pub fn new() -> Self {
        Self {
            upstream: None,
            source: None,
            cache: CacheConfig::default(),
            pipeline: PipelineConfig::default(),
            public_url: None,
            languages: DEFAULT_LANGUAGES.iter().map(|l| l.to_string()).collect(),
            language_suffix: Some(DEFAULT_LANGUAGE_SUFFIX.to_string()),
        }
    }

    /// Talk to Titlovi.com with this configuration.
    pub fn upstream(mut self, config: UpstreamConfig) -> Self {
        self.upstream = Some(config);
        self
    }

    /// Use a custom subtitle source instead of the Titlovi.com client.
    /// Takes precedence over [`upstream`](Self::upstream).
    pub fn source(mut self, source: Arc<dyn SubtitleSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn cache(mut self, config: CacheConfig) -> Self {
        self.cache = config;
        self
    }

    pub fn pipeline(mut self, config: PipelineConfig) -> Self {
        self.pipeline = config;
        self
    }

    /// Externally reachable base URL, used to build download links.
    pub fn public_url(mut self, url: impl Into<String>) -> Self {
        self.public_url = Some(url.into());
        self
    }

    pub fn languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = languages.into_iter().map(Into::into).collect();
        self
    }

    /// Attribution appended to language tags; `None` leaves them bare.
    pub fn language_suffix(mut self, suffix: Option<String>) -> Self {
        self.language_suffix = suffix;
        self
    }

    /// Build the gateway.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Configuration`] when the public URL or the
    /// language list is missing, or a component configuration is invalid.
    pub fn build(self) -> Result<SubtitleGateway> {
        let public_url = self
            .public_url
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| GatewayError::Configuration("public URL is required".into()))?;

        let languages: Vec<String> = self
            .languages
            .into_iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        if languages.is_empty() {
            return Err(GatewayError::Configuration(
                "at least one language is required".into(),
            ));
        }

        let source: Arc<dyn SubtitleSource> = match (self.source, self.upstream) {
            (Some(source), _) => source,
            (None, upstream) => Arc::new(TitloviClient::new(&upstream.unwrap_or_default())?),
        };

        Ok(SubtitleGateway {
            source,
            cache: ResponseCache::new(&self.cache),
            pipeline: SubtitlePipeline::new(&self.pipeline)?,
            public_url,
            languages,
            language_suffix: self.language_suffix.filter(|s| !s.is_empty()),
        })
    }
}

impl Default for GatewayBuilder {
    fn default() -> Self {
        Self::new()
    }
}
