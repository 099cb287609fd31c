//! Content-versioning sink: create-or-update a file by path through the
//! GitHub contents API. Overwrites carry the current blob sha, so re-sending
//! an identical bundle is an idempotent update.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde_json::json;
use tracing::{debug, info};

use crate::config::GithubDestination;
use crate::transport::{Delivery, SendContext, Transport, TransportError, REQUEST_DEADLINE};

const DEFAULT_API_BASE: &str = "https://api.github.com";
const ACCEPT_JSON: &str = "application/vnd.github+json";
const AGENT: &str = "photo-bundle";

pub struct GithubTransport {
    client: Client,
    api_base: String,
    dest: GithubDestination,
}

impl GithubTransport {
    pub fn new(dest: GithubDestination) -> Self {
        Self::with_api_base(dest, DEFAULT_API_BASE)
    }

    /// Point the sink at a different API host (tests).
    pub fn with_api_base(dest: GithubDestination, api_base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into(),
            dest,
        }
    }

    fn contents_url(&self, target_name: &str) -> String {
        let prefix = self.dest.base_path.trim_matches('/');
        if prefix.is_empty() {
            format!(
                "{}/repos/{}/{}/contents/{}",
                self.api_base, self.dest.owner, self.dest.repo, target_name
            )
        } else {
            format!(
                "{}/repos/{}/{}/contents/{}/{}",
                self.api_base, self.dest.owner, self.dest.repo, prefix, target_name
            )
        }
    }

    /// Revision marker (blob sha) of an existing file at the target path.
    /// Required by the API when overwriting; absent for new files.
    async fn existing_sha(&self, url: &str) -> Result<Option<String>, TransportError> {
        let response = self
            .client
            .get(url)
            .query(&[("ref", self.dest.branch.as_str())])
            .header(AUTHORIZATION, format!("Bearer {}", self.dest.token))
            .header(ACCEPT, ACCEPT_JSON)
            .header(USER_AGENT, AGENT)
            .timeout(REQUEST_DEADLINE)
            .send()
            .await?;
        let status = response.status();
        if status == StatusCode::OK {
            let body: serde_json::Value = response.json().await?;
            Ok(body.get("sha").and_then(|s| s.as_str()).map(str::to_string))
        } else if status == StatusCode::NOT_FOUND {
            Ok(None)
        } else {
            Err(TransportError::Remote {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            })
        }
    }
}

#[async_trait]
impl Transport for GithubTransport {
    async fn send(
        &self,
        payload: &[u8],
        target_name: &str,
        ctx: &SendContext,
    ) -> Result<Delivery, TransportError> {
        if self.dest.token.is_empty() {
            return Err(TransportError::Config(
                "github token is empty".to_string(),
            ));
        }
        let url = self.contents_url(target_name);
        let sha = self.existing_sha(&url).await?;
        if sha.is_some() {
            debug!(url = %url, "target exists, updating in place");
        }

        let mut body = json!({
            "message": format!("Fotos {}: {}", ctx.identifier, target_name),
            "content": BASE64.encode(payload),
            "branch": self.dest.branch,
        });
        if let Some(sha) = sha {
            body["sha"] = serde_json::Value::String(sha);
        }

        let response = self
            .client
            .put(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.dest.token))
            .header(ACCEPT, ACCEPT_JSON)
            .header(USER_AGENT, AGENT)
            .timeout(REQUEST_DEADLINE)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if status == StatusCode::OK || status == StatusCode::CREATED {
            let parsed: serde_json::Value = response.json().await?;
            let location = parsed
                .pointer("/content/html_url")
                .and_then(|v| v.as_str())
                .unwrap_or(url.as_str())
                .to_string();
            info!(location = %location, "bundle committed");
            Ok(Delivery { location })
        } else {
            Err(TransportError::Remote {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            })
        }
    }
}
