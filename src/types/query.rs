//! Subtitle search queries

use crate::{GatewayError, Result};

/// One incoming subtitle lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleQuery {
    /// IMDb identifier, e.g. `tt0111161`.
    pub media_id: String,
    pub season: Option<String>,
    pub episode: Option<String>,
    /// Upstream language names, queried in this order.
    pub languages: Vec<String>,
}

impl SubtitleQuery {
    pub fn new(media_id: impl Into<String>) -> Self {
        Self {
            media_id: media_id.into(),
            season: None,
            episode: None,
            languages: Vec::new(),
        }
    }

    /// Parse a player video id.
    ///
    /// Series episodes arrive as `imdb:season:episode`; anything else is
    /// taken verbatim as the media identifier.
    pub fn from_video_id(video_id: &str) -> Result<Self> {
        let video_id = video_id.trim();
        if video_id.is_empty() {
            return Err(GatewayError::InvalidInput("empty video id".into()));
        }

        let parts: Vec<&str> = video_id.split(':').collect();
        let query = match parts.as_slice() {
            [media, season, episode] if !media.is_empty() => Self::new(*media)
                .season(*season)
                .episode(*episode),
            _ => Self::new(video_id),
        };
        Ok(query)
    }

    pub fn season(mut self, season: impl Into<String>) -> Self {
        self.season = Some(season.into()).filter(|s: &String| !s.is_empty());
        self
    }

    pub fn episode(mut self, episode: impl Into<String>) -> Self {
        self.episode = Some(episode.into()).filter(|s: &String| !s.is_empty());
        self
    }

    /// Replace the requested languages, dropping duplicates but keeping order.
    pub fn languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages.clear();
        for lang in languages {
            let lang = lang.into();
            if !self.languages.contains(&lang) {
                self.languages.push(lang);
            }
        }
        self
    }

    /// Pipe-delimited language list as the upstream expects it.
    pub fn language_param(&self) -> String {
        self.languages.join("|")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_imdb_id() {
        let q = SubtitleQuery::from_video_id("tt0111161").unwrap();
        assert_eq!(q.media_id, "tt0111161");
        assert!(q.season.is_none());
        assert!(q.episode.is_none());
    }

    #[test]
    fn series_episode_id() {
        let q = SubtitleQuery::from_video_id("tt0944947:3:9").unwrap();
        assert_eq!(q.media_id, "tt0944947");
        assert_eq!(q.season.as_deref(), Some("3"));
        assert_eq!(q.episode.as_deref(), Some("9"));
    }

    #[test]
    fn two_part_id_is_kept_verbatim() {
        let q = SubtitleQuery::from_video_id("tt1:2").unwrap();
        assert_eq!(q.media_id, "tt1:2");
    }

    #[test]
    fn empty_id_is_invalid() {
        assert!(matches!(
            SubtitleQuery::from_video_id("  "),
            Err(GatewayError::InvalidInput(_))
        ));
    }

    #[test]
    fn languages_are_deduplicated_in_order() {
        let q = SubtitleQuery::new("tt1").languages(["English", "Hrvatski", "English"]);
        assert_eq!(q.languages, vec!["English", "Hrvatski"]);
        assert_eq!(q.language_param(), "English|Hrvatski");
    }
}
