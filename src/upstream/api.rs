//! Raw HTTP calls against the Titlovi.com API.
//!
//! One method per upstream operation, one HTTP request per call. Retry and
//! session handling live in [`TitloviClient`](super::TitloviClient).

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Deserializer};
use tracing::debug;

use super::UpstreamConfig;
use crate::session::Authenticator;
use crate::telemetry;
use crate::types::{Credentials, Session, SubtitleQuery, SubtitleResult};
use crate::{GatewayError, Result, version};

/// Thin HTTP client for the three upstream operations.
#[derive(Clone)]
pub struct TitloviApi {
    http: Client,
    api_url: String,
    download_url: String,
}

impl TitloviApi {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(version::user_agent())
            .build()
            .map_err(|e| GatewayError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            download_url: config.download_url.trim_end_matches('/').to_string(),
        })
    }

    /// Exchange credentials for a session token.
    pub async fn login(&self, credentials: &Credentials) -> Result<Session> {
        let url = format!("{}/gettoken", self.api_url);
        let response = self
            .http
            .post(&url)
            .query(&[
                ("username", credentials.username.as_str()),
                ("password", credentials.password.as_str()),
            ])
            .header(reqwest::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .send()
            .await;
        let response = record("login", response)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(GatewayError::AuthenticationFailed(format!(
                "upstream refused login for '{}' ({status})",
                credentials.username
            )));
        }
        let response = check_status(response)?;

        let login: LoginResponse = response.json().await?;
        if login.token.is_empty() {
            return Err(GatewayError::AuthenticationFailed(
                "upstream returned an empty token".into(),
            ));
        }
        Ok(Session {
            username: credentials.username.clone(),
            token: login.token,
            user_id: login.user_id,
            expires_at: login.expiration_date,
        })
    }

    /// Run one search with the given session.
    ///
    /// A 401 maps to [`GatewayError::Unauthorized`] so the caller can
    /// refresh the session and try again.
    pub async fn search(&self, session: &Session, query: &SubtitleQuery) -> Result<Vec<SubtitleResult>> {
        let url = format!("{}/search", self.api_url);
        let mut params = vec![
            ("token", session.token.clone()),
            ("userid", session.user_id.to_string()),
            ("query", query.media_id.clone()),
            ("lang", query.language_param()),
        ];
        if let Some(season) = &query.season {
            params.push(("season", season.clone()));
        }
        if let Some(episode) = &query.episode {
            params.push(("episode", episode.clone()));
        }

        let response = self.http.get(&url).query(&params).send().await;
        let response = record("search", response)?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(GatewayError::Unauthorized);
        }
        let response = check_status(response)?;

        let body: SearchResponse = response.json().await?;
        debug!(
            query = %query.media_id,
            results = body.results.len(),
            "upstream search answered"
        );
        Ok(body.results)
    }

    /// Fetch the archive for one subtitle.
    pub async fn download(&self, media_type: &str, media_id: &str) -> Result<Bytes> {
        let url = format!("{}/", self.download_url);
        let response = self
            .http
            .get(&url)
            .query(&[("type", media_type), ("mediaid", media_id)])
            .send()
            .await;
        let response = record("download", response)?;
        let response = check_status(response)?;
        Ok(response.bytes().await?)
    }
}

#[async_trait]
impl Authenticator for TitloviApi {
    async fn login(&self, credentials: &Credentials) -> Result<Session> {
        TitloviApi::login(self, credentials).await
    }
}

/// Count the attempt and map transport failures.
fn record(operation: &'static str, response: reqwest::Result<Response>) -> Result<Response> {
    let status = match &response {
        Ok(r) if r.status().is_success() => "ok",
        Ok(r) if r.status() == StatusCode::UNAUTHORIZED => "unauthorized",
        _ => "error",
    };
    metrics::counter!(telemetry::UPSTREAM_REQUESTS_TOTAL,
        "operation" => operation,
        "status" => status,
    )
    .increment(1);
    response.map_err(|e| GatewayError::Http(e.to_string()))
}

fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(GatewayError::Api {
        status: status.as_u16(),
        message: format!("Titlovi.com responded with {status}"),
    })
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(rename = "Token")]
    token: String,
    #[serde(rename = "UserId", deserialize_with = "number_or_string")]
    user_id: u64,
    #[serde(rename = "ExpirationDate", default, deserialize_with = "lenient_datetime")]
    expiration_date: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(rename = "SubtitleResults", default, deserialize_with = "null_as_empty")]
    results: Vec<SubtitleResult>,
}

/// The upstream has sent the account id both as a number and as a string.
fn number_or_string<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Number(u64),
        Text(String),
    }

    match Id::deserialize(deserializer)? {
        Id::Number(n) => Ok(n),
        Id::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Expiry is informational only; an unparseable value is dropped rather
/// than failing the login. Naive timestamps are taken as UTC.
fn lenient_datetime<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    Ok(NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc()))
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<SubtitleResult>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<SubtitleResult>>::deserialize(deserializer)?.unwrap_or_default())
}
