//! Session-aware, retrying upstream client

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use super::retry::{RetryConfig, with_retry};
use super::{TitloviApi, UpstreamConfig};
use crate::session::SessionManager;
use crate::traits::SubtitleSource;
use crate::types::{Credentials, Session, SubtitleQuery, SubtitleResult};
use crate::{GatewayError, Result};

/// Upstream client used by the gateway.
///
/// Searches run inside the bounded retry loop. An unauthorized answer forces
/// a session refresh and fails the attempt, so the loop re-issues the search
/// with the new token; the refresh spends one of the bounded attempts rather
/// than opening a budget of its own. A 401 on the last attempt is returned
/// without a login, since no attempt is left to use the new token.
pub struct TitloviClient {
    api: Arc<TitloviApi>,
    sessions: SessionManager,
    retry: RetryConfig,
}

impl TitloviClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        config.retry.validate()?;
        let api = Arc::new(TitloviApi::new(config)?);
        Ok(Self {
            sessions: SessionManager::new(api.clone()),
            api,
            retry: config.retry.clone(),
        })
    }

    /// Log in and store the resulting session, replacing any existing one.
    pub async fn login(&self, credentials: &Credentials) -> Result<Session> {
        self.sessions.get_session(credentials, true).await
    }

    /// Search the upstream index on behalf of `credentials`.
    pub async fn search(
        &self,
        query: &SubtitleQuery,
        credentials: &Credentials,
    ) -> Result<Vec<SubtitleResult>> {
        with_retry(&self.retry, "search", |attempt| {
            self.search_attempt(query, credentials, attempt.is_last())
        })
        .await
    }

    /// Fetch the raw archive for one subtitle. No session is involved.
    pub async fn download(&self, media_type: &str, media_id: &str) -> Result<Bytes> {
        with_retry(&self.retry, "download", |_| self.api.download(media_type, media_id)).await
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    async fn search_attempt(
        &self,
        query: &SubtitleQuery,
        credentials: &Credentials,
        last_attempt: bool,
    ) -> Result<Vec<SubtitleResult>> {
        let session = self.sessions.get_session(credentials, false).await?;
        match self.api.search(&session, query).await {
            Err(GatewayError::Unauthorized) if !last_attempt => {
                debug!(username = %credentials.username, "session token rejected, re-authenticating");
                self.sessions.refresh(credentials, &session.token).await?;
                Err(GatewayError::Unauthorized)
            }
            other => other,
        }
    }
}

#[async_trait]
impl SubtitleSource for TitloviClient {
    fn name(&self) -> &str {
        "titlovi"
    }

    async fn search(
        &self,
        query: &SubtitleQuery,
        credentials: &Credentials,
    ) -> Result<Vec<SubtitleResult>> {
        TitloviClient::search(self, query, credentials).await
    }

    async fn download(&self, media_type: &str, media_id: &str) -> Result<Bytes> {
        TitloviClient::download(self, media_type, media_id).await
    }
}
