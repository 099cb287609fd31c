//! Drive-style sink: a per-identifier subfolder ensured under a configured
//! root folder, files uploaded with an explicit MIME type.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use serde_json::json;
use tracing::{debug, info};

use crate::config::DriveDestination;
use crate::sanitize::sanitize;
use crate::transport::{Delivery, SendContext, Transport, TransportError, REQUEST_DEADLINE};

const DEFAULT_API_BASE: &str = "https://www.googleapis.com/drive/v3";
const DEFAULT_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";
const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

pub struct DriveTransport {
    client: Client,
    api_base: String,
    upload_base: String,
    dest: DriveDestination,
}

impl DriveTransport {
    pub fn new(dest: DriveDestination) -> Self {
        Self::with_api_bases(dest, DEFAULT_API_BASE, DEFAULT_UPLOAD_BASE)
    }

    /// Point the sink at different API hosts (tests).
    pub fn with_api_bases(
        dest: DriveDestination,
        api_base: impl Into<String>,
        upload_base: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into(),
            upload_base: upload_base.into(),
            dest,
        }
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.dest.access_token)
    }

    /// Folder id for `name` directly under the root folder, creating the
    /// folder when none of that exact name exists yet.
    async fn ensure_folder(&self, name: &str) -> Result<String, TransportError> {
        let query = format!(
            "name = '{}' and '{}' in parents and mimeType = '{FOLDER_MIME}' and trashed = false",
            name, self.dest.root_folder_id
        );
        let response = self
            .client
            .get(format!("{}/files", self.api_base))
            .header(AUTHORIZATION, self.bearer())
            .query(&[("q", query.as_str()), ("fields", "files(id,name)")])
            .timeout(REQUEST_DEADLINE)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(remote(status, response).await);
        }
        let body: serde_json::Value = response.json().await?;
        if let Some(id) = body.pointer("/files/0/id").and_then(|v| v.as_str()) {
            debug!(folder = name, id, "re-using existing folder");
            return Ok(id.to_string());
        }

        let response = self
            .client
            .post(format!("{}/files", self.api_base))
            .header(AUTHORIZATION, self.bearer())
            .json(&json!({
                "name": name,
                "mimeType": FOLDER_MIME,
                "parents": [self.dest.root_folder_id],
            }))
            .timeout(REQUEST_DEADLINE)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(remote(status, response).await);
        }
        let body: serde_json::Value = response.json().await?;
        body.get("id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| TransportError::Remote {
                status: status.as_u16(),
                body: "folder creation response carried no id".to_string(),
            })
    }

    /// Create the file entry inside `folder_id`, then upload its content
    /// under the MIME type derived from the file name.
    pub async fn upload_file(
        &self,
        name: &str,
        data: &[u8],
        folder_id: &str,
    ) -> Result<String, TransportError> {
        let response = self
            .client
            .post(format!("{}/files", self.api_base))
            .header(AUTHORIZATION, self.bearer())
            .json(&json!({ "name": name, "parents": [folder_id] }))
            .timeout(REQUEST_DEADLINE)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(remote(status, response).await);
        }
        let body: serde_json::Value = response.json().await?;
        let file_id = body
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| TransportError::Remote {
                status: status.as_u16(),
                body: "file creation response carried no id".to_string(),
            })?
            .to_string();

        let response = self
            .client
            .patch(format!(
                "{}/files/{}?uploadType=media",
                self.upload_base, file_id
            ))
            .header(AUTHORIZATION, self.bearer())
            .header(CONTENT_TYPE, mime_for(name))
            .body(data.to_vec())
            .timeout(REQUEST_DEADLINE)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(remote(status, response).await);
        }
        debug!(file = name, id = %file_id, "content uploaded");
        Ok(file_id)
    }
}

/// MIME type by file extension; unknown extensions upload as octet streams.
pub fn mime_for(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("heic") | Some("heif") => "image/heic",
        Some("zip") => "application/zip",
        Some("csv") => "text/csv",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

async fn remote(status: StatusCode, response: Response) -> TransportError {
    TransportError::Remote {
        status: status.as_u16(),
        body: response.text().await.unwrap_or_default(),
    }
}

#[async_trait]
impl Transport for DriveTransport {
    async fn send(
        &self,
        payload: &[u8],
        target_name: &str,
        ctx: &SendContext,
    ) -> Result<Delivery, TransportError> {
        if self.dest.access_token.is_empty() {
            return Err(TransportError::Config(
                "drive access token is empty".to_string(),
            ));
        }
        let folder = self.ensure_folder(&sanitize(&ctx.identifier)).await?;
        let file_id = self.upload_file(target_name, payload, &folder).await?;
        info!(file_id = %file_id, folder = %folder, "bundle uploaded to drive folder");
        Ok(Delivery {
            location: format!("drive file {file_id}"),
        })
    }
}
