//! Blocking HTTP transport for the D1 REST API.

use crate::config::RemoteConfig;
use crate::envelope::Envelope;
use crate::error::{Error, Result};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

/// Sends authenticated JSON requests for one account.
pub(super) struct Transport {
    agent: ureq::Agent,
    database_root: String,
    authorization: String,
}

impl Transport {
    pub(super) fn new(config: &RemoteConfig) -> Self {
        let agent_config = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout()))
            .timeout_connect(Some(config.connect_timeout()))
            // The service reports failures inside the envelope, whatever the status.
            .http_status_as_error(false)
            .build();
        let agent: ureq::Agent = agent_config.into();

        Self {
            agent,
            database_root: format!(
                "{}/accounts/{}/d1/database",
                config.base_url.trim_end_matches('/'),
                config.account_id
            ),
            authorization: format!("Bearer {}", config.api_token),
        }
    }

    /// `.../d1/database`
    pub(super) fn databases_url(&self) -> String {
        self.database_root.clone()
    }

    /// `.../d1/database/{id}` plus an optional trailing segment.
    pub(super) fn database_url(&self, id: Uuid, suffix: Option<&str>) -> String {
        match suffix {
            Some(suffix) => format!("{}/{id}/{suffix}", self.database_root),
            None => format!("{}/{id}", self.database_root),
        }
    }

    /// Performs one request and decodes the envelope.
    ///
    /// Bodiless methods ignore `body`.
    pub(super) fn send<T>(
        &self,
        method: Method,
        url: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Envelope<T>>
    where
        T: for<'de> Deserialize<'de> + Default,
    {
        let context = format!("{} {url}", method.as_str());
        debug!(method = method.as_str(), url, "Sending D1 API request");

        let body = body.unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()));
        let auth = self.authorization.as_str();
        let response = match method {
            Method::Get => self.agent.get(url).header("Authorization", auth).call(),
            Method::Delete => self.agent.delete(url).header("Authorization", auth).call(),
            Method::Post => self
                .agent
                .post(url)
                .header("Authorization", auth)
                .send_json(&body),
            Method::Patch => self
                .agent
                .patch(url)
                .header("Authorization", auth)
                .send_json(&body),
        };

        let mut response = response.map_err(|e| Error::transport(context.clone(), e))?;
        let status = response.status().as_u16();
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|e| Error::transport(context, e))?;

        debug!(status, bytes = text.len(), "Received D1 API response");
        serde_json::from_str(&text).map_err(|source| Error::MalformedResponse { status, source })
    }
}
