//! Subtitle search results and served subtitle files

use std::str::FromStr;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::GatewayError;

/// One search hit as returned by the upstream index.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubtitleResult {
    #[serde(rename = "Id")]
    pub id: u64,
    /// Numeric content type code, passed back verbatim on download.
    #[serde(rename = "Type", default)]
    pub media_type: u32,
    #[serde(rename = "Lang", default)]
    pub language: String,
    #[serde(rename = "Link", default)]
    pub download_link: String,
    #[serde(rename = "Title", default, deserialize_with = "null_as_empty")]
    pub title: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Caller-facing search entry: a callback URL into the download route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleItem {
    pub id: String,
    pub url: String,
    pub lang: String,
}

impl SubtitleItem {
    /// Derive the caller-facing entry for an upstream result.
    ///
    /// `public_url` is the externally reachable base of this gateway;
    /// `suffix` is appended to the language as `lang|suffix` when present.
    pub fn from_result(result: &SubtitleResult, public_url: &str, suffix: Option<&str>) -> Self {
        let id = result.id.to_string();
        let url = format!(
            "{}/serve-subtitle/{}/{}",
            public_url.trim_end_matches('/'),
            result.media_type,
            id
        );
        let lang = match suffix {
            Some(suffix) if !suffix.is_empty() => format!("{}|{}", result.language, suffix),
            _ => result.language.clone(),
        };
        Self { id, url, lang }
    }
}

/// Text subtitle markup formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleFormat {
    Srt,
    #[serde(rename = "vtt", alias = "webvtt")]
    WebVtt,
}

impl SubtitleFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SubtitleFormat::Srt => "srt",
            SubtitleFormat::WebVtt => "vtt",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            SubtitleFormat::Srt => "application/x-subrip; charset=utf-8",
            SubtitleFormat::WebVtt => "text/vtt; charset=utf-8",
        }
    }
}

impl FromStr for SubtitleFormat {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "srt" | "subrip" => Ok(SubtitleFormat::Srt),
            "vtt" | "webvtt" => Ok(SubtitleFormat::WebVtt),
            other => Err(GatewayError::Configuration(format!(
                "unknown subtitle format '{other}'"
            ))),
        }
    }
}

/// A normalized subtitle ready to be served.
#[derive(Debug, Clone)]
pub struct SubtitleFile {
    /// UTF-8 subtitle text.
    pub content: Bytes,
    pub format: SubtitleFormat,
    /// When the payload was fetched from the upstream.
    pub fetched_at: DateTime<Utc>,
}

impl SubtitleFile {
    pub fn file_name(&self) -> String {
        format!("file.{}", self.format.extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result() -> SubtitleResult {
        SubtitleResult {
            id: 42,
            media_type: 1,
            language: "English".into(),
            download_link: "https://titlovi.com/download/?type=1&mediaid=42".into(),
            title: "The Shawshank Redemption".into(),
        }
    }

    #[test]
    fn item_url_points_at_download_route() {
        let item = SubtitleItem::from_result(&result(), "http://127.0.0.1:8080/", None);
        assert_eq!(item.id, "42");
        assert_eq!(item.url, "http://127.0.0.1:8080/serve-subtitle/1/42");
        assert_eq!(item.lang, "English");
    }

    #[test]
    fn item_lang_carries_suffix() {
        let item = SubtitleItem::from_result(&result(), "http://x", Some("Titlovi.com"));
        assert_eq!(item.lang, "English|Titlovi.com");
    }

    #[test]
    fn result_deserializes_upstream_shape() {
        let json = r#"{"Id": 7, "Title": null, "Link": "l", "Lang": "Srpski", "Type": 2, "Year": 1994}"#;
        let r: SubtitleResult = serde_json::from_str(json).unwrap();
        assert_eq!(r.id, 7);
        assert_eq!(r.media_type, 2);
        assert_eq!(r.language, "Srpski");
        assert_eq!(r.title, "");
    }

    #[test]
    fn format_parses_labels() {
        assert_eq!("VTT".parse::<SubtitleFormat>().unwrap(), SubtitleFormat::WebVtt);
        assert_eq!("srt".parse::<SubtitleFormat>().unwrap(), SubtitleFormat::Srt);
        assert!("ass".parse::<SubtitleFormat>().is_err());
    }
}
