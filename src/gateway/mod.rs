//! Gateway orchestration

mod builder;
mod service;

pub use builder::GatewayBuilder;
pub use service::SubtitleGateway;

/// Languages queried when none are configured.
pub const DEFAULT_LANGUAGES: &[&str] = &[
    "Bosanski",
    "Hrvatski",
    "Srpski",
    "Cirilica",
    "English",
    "Makedonski",
    "Slovenski",
];

/// Attribution appended to every language tag by default.
pub const DEFAULT_LANGUAGE_SUFFIX: &str = "Titlovi.com";
