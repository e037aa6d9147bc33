//! Titlovi.com subtitle gateway.
//!
//! This crate sits between subtitle-consuming players and the Titlovi.com
//! index. It authenticates against the upstream on behalf of configured
//! accounts, searches and downloads subtitles with bounded retry, caches
//! responses, rate limits inbound clients, and turns downloaded archives
//! into UTF-8 WebVTT or SRT.
//!
//! # Example
//!
//! ```rust,no_run
//! use titlovi_gateway::{SubtitleGateway, UpstreamConfig};
//! use titlovi_gateway::types::Credentials;
//!
//! #[tokio::main]
//! async fn main() -> titlovi_gateway::Result<()> {
//!     let gateway = SubtitleGateway::builder()
//!         .upstream(UpstreamConfig::new())
//!         .public_url("http://127.0.0.1:8080")
//!         .languages(["English"])
//!         .build()?;
//!
//!     let credentials = Credentials::new("username", "password");
//!     let found = gateway.search("tt0111161", &credentials).await?;
//!     for item in found.value.iter() {
//!         println!("{} {}", item.lang, item.url);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `server` (default): the `titlovid` binary, TOML configuration and the
//!   axum router in [`server`].

pub mod cache;
pub mod credentials;
pub mod error;
pub mod gateway;
pub mod pipeline;
pub mod ratelimit;
#[cfg(feature = "server")]
pub mod server;
pub mod session;
pub mod telemetry;
pub mod traits;
pub mod types;
pub mod upstream;
pub mod version;

// Re-export main types at crate root
pub use cache::{CacheConfig, ResponseCache};
pub use error::{GatewayError, Result};
pub use gateway::{GatewayBuilder, SubtitleGateway};
pub use pipeline::{PipelineConfig, SubtitlePipeline};
pub use ratelimit::{RateLimitConfig, RateLimiter};
pub use session::{Authenticator, SessionManager};
pub use traits::SubtitleSource;
pub use upstream::{RetryConfig, TitloviApi, TitloviClient, UpstreamConfig};
pub use version::{PKG_VERSION, version_string};
