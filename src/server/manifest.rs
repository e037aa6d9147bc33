//! Add-on manifest served to Stremio

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub id: &'static str,
    pub version: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub types: &'static [&'static str],
    pub resources: &'static [&'static str],
    pub id_prefixes: &'static [&'static str],
    pub behaviour_hints: BehaviourHints,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviourHints {
    pub configurable: bool,
    pub configuration_required: bool,
}

impl Manifest {
    /// The manifest, marked as needing configuration until the request
    /// carries account credentials.
    pub fn new(configured: bool) -> Self {
        Self {
            id: "com.github.titlovi-unofficial.stremio",
            version: crate::PKG_VERSION,
            name: "Titlovi.com Unofficial",
            description: "Unofficial addon for fetching subtitles from Titlovi.com.",
            types: &["movie", "series"],
            resources: &["subtitles"],
            id_prefixes: &["tt"],
            behaviour_hints: BehaviourHints {
                configurable: true,
                configuration_required: !configured,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_stremio_field_names() {
        let json = serde_json::to_value(Manifest::new(false)).unwrap();
        assert_eq!(json["idPrefixes"][0], "tt");
        assert_eq!(json["behaviourHints"]["configurationRequired"], true);
        assert_eq!(json["resources"][0], "subtitles");
    }
}
