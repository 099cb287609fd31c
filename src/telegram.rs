//! Document-upload sink: single-shot `sendDocument` with a hard payload
//! ceiling checked before any network I/O.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::{info, warn};

use crate::config::TelegramDestination;
use crate::transport::{
    Delivery, SendContext, Transport, TransportError, DOCUMENT_UPLOAD_LIMIT, REQUEST_DEADLINE,
};

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

pub struct TelegramTransport {
    client: Client,
    api_base: String,
    dest: TelegramDestination,
}

impl TelegramTransport {
    pub fn new(dest: TelegramDestination) -> Self {
        Self::with_api_base(dest, DEFAULT_API_BASE)
    }

    /// Point the sink at a different API host (tests).
    pub fn with_api_base(dest: TelegramDestination, api_base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into(),
            dest,
        }
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send(
        &self,
        payload: &[u8],
        target_name: &str,
        ctx: &SendContext,
    ) -> Result<Delivery, TransportError> {
        if self.dest.token.is_empty() {
            return Err(TransportError::Config(
                "telegram bot token is empty".to_string(),
            ));
        }
        let size = payload.len() as u64;
        if size > DOCUMENT_UPLOAD_LIMIT {
            warn!(size, limit = DOCUMENT_UPLOAD_LIMIT, "payload rejected before upload");
            return Err(TransportError::Oversize {
                size,
                limit: DOCUMENT_UPLOAD_LIMIT,
            });
        }

        let document = Part::bytes(payload.to_vec())
            .file_name(target_name.to_string())
            .mime_str("application/zip")?;
        let mut form = Form::new()
            .text("chat_id", self.dest.chat_id.clone())
            .part("document", document);
        if let Some(caption) = ctx.caption.as_deref().filter(|c| !c.is_empty()) {
            form = form.text("caption", caption.to_string());
        }

        let url = format!("{}/bot{}/sendDocument", self.api_base, self.dest.token);
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .timeout(REQUEST_DEADLINE)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Remote {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let body: serde_json::Value = response.json().await?;
        if body.get("ok").and_then(|v| v.as_bool()) != Some(true) {
            return Err(TransportError::Remote {
                status: status.as_u16(),
                body: body.to_string(),
            });
        }
        let message_id = body
            .pointer("/result/message_id")
            .and_then(|v| v.as_i64())
            .unwrap_or_default();
        info!(message_id, chat_id = %self.dest.chat_id, "document delivered");
        Ok(Delivery {
            location: format!("telegram message {message_id}"),
        })
    }
}
