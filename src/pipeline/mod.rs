//! Subtitle pipeline: archive → UTF-8 text → served format.
//!
//! Every stage is terminal on failure. A missing subtitle, undecodable text
//! or malformed cue syntax means the upstream payload had an unexpected
//! shape, and the request fails rather than serving partial output.

pub mod archive;
pub mod convert;
pub mod encoding;

pub use archive::extract_subtitle;
pub use convert::{convert_format, parse_srt, render_webvtt, Cue};
pub use encoding::{encoding_for_label, normalize_encoding, DEFAULT_FALLBACK_ENCODING};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use encoding_rs::Encoding;
use tracing::debug;

use crate::types::{SubtitleFile, SubtitleFormat};
use crate::{GatewayError, Result};

/// Pipeline settings.
///
/// ```rust
/// # use titlovi_gateway::PipelineConfig;
/// # use titlovi_gateway::types::SubtitleFormat;
/// let config = PipelineConfig::new()
///     .fallback_encoding("windows-1251")
///     .target_format(Some(SubtitleFormat::Srt));
/// ```
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Archive entry suffix to extract. Default: `.srt`.
    pub extension: String,
    /// Encoding label used when detection is inconclusive. Default: `windows-1250`.
    pub fallback_encoding: String,
    /// Served format; `None` serves the source SRT as-is. Default: WebVTT.
    pub target_format: Option<SubtitleFormat>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            extension: ".srt".into(),
            fallback_encoding: DEFAULT_FALLBACK_ENCODING.into(),
            target_format: Some(SubtitleFormat::WebVtt),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn fallback_encoding(mut self, label: impl Into<String>) -> Self {
        self.fallback_encoding = label.into();
        self
    }

    pub fn target_format(mut self, format: Option<SubtitleFormat>) -> Self {
        self.target_format = format;
        self
    }
}

/// Turns downloaded archives into servable subtitle files.
#[derive(Debug, Clone)]
pub struct SubtitlePipeline {
    extension: String,
    fallback: &'static Encoding,
    target: Option<SubtitleFormat>,
}

impl SubtitlePipeline {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        if config.extension.trim().is_empty() {
            return Err(GatewayError::Configuration(
                "subtitle extension must not be empty".into(),
            ));
        }
        Ok(Self {
            extension: config.extension.clone(),
            fallback: encoding_for_label(&config.fallback_encoding)?,
            target: config.target_format,
        })
    }

    /// Format of the files this pipeline produces.
    pub fn output_format(&self) -> SubtitleFormat {
        self.target.unwrap_or(SubtitleFormat::Srt)
    }

    pub fn extract(&self, archive: &[u8]) -> Result<Vec<u8>> {
        extract_subtitle(archive, &self.extension)
    }

    pub fn normalize_encoding(&self, subtitle: &[u8]) -> Result<String> {
        normalize_encoding(subtitle, self.fallback)
    }

    pub fn convert(&self, text: &str) -> Result<String> {
        match self.target {
            Some(target) => convert_format(text, target),
            None => Ok(text.to_string()),
        }
    }

    /// Run all stages over a downloaded archive.
    pub fn process(&self, archive: &[u8], fetched_at: DateTime<Utc>) -> Result<SubtitleFile> {
        let raw = self.extract(archive)?;
        let text = self.normalize_encoding(&raw)?;
        let converted = self.convert(&text)?;
        debug!(
            archive_bytes = archive.len(),
            subtitle_bytes = converted.len(),
            format = self.output_format().extension(),
            "subtitle processed"
        );
        Ok(SubtitleFile {
            content: Bytes::from(converted),
            format: self.output_format(),
            fetched_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_fallback_encoding_is_rejected() {
        let err = SubtitlePipeline::new(&PipelineConfig::new().fallback_encoding("nope")).unwrap_err();
        assert!(matches!(err, GatewayError::Configuration(_)));
    }

    #[test]
    fn passthrough_serves_srt() {
        let pipeline = SubtitlePipeline::new(&PipelineConfig::new().target_format(None)).unwrap();
        assert_eq!(pipeline.output_format(), SubtitleFormat::Srt);
        assert_eq!(pipeline.convert("anything").unwrap(), "anything");
    }
}
