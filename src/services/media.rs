//! Media host client.
//!
//! Speaks the Cloudinary upload API: signed multipart uploads that return a
//! public URL plus a public id, and signed destroy calls by public id.

use crate::config::MediaConfig;
use crate::error::AppError;
use crate::services::upload::UploadedFile;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Image,
    Video,
}

impl ResourceKind {
    fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Image => "image",
            ResourceKind::Video => "video",
        }
    }
}

/// Where an uploaded asset lives and how to delete it later.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedMedia {
    #[serde(rename = "secure_url")]
    pub url: String,
    pub public_id: String,
    #[serde(default)]
    pub duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

pub struct MediaHost {
    client: reqwest::Client,
    config: MediaConfig,
}

impl MediaHost {
    pub fn new(config: MediaConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self, kind: ResourceKind, action: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.cloud_name,
            kind.as_str(),
            action
        )
    }

    /// Request signature: sorted `key=value` pairs joined by `&`, followed by
    /// the API secret, hashed with SHA-256.
    fn sign(&self, params: &BTreeMap<&str, String>) -> String {
        let joined = params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        let digest = Sha256::digest(format!("{joined}{}", self.config.api_secret).as_bytes());
        format!("{digest:x}")
    }

    fn signed_params(&self, mut params: BTreeMap<&'static str, String>) -> BTreeMap<&'static str, String> {
        params.insert("timestamp", Utc::now().timestamp().to_string());
        let signature = self.sign(&params);
        params.insert("signature", signature);
        params.insert("signature_algorithm", "sha256".to_string());
        params.insert("api_key", self.config.api_key.clone());
        params
    }

    pub async fn upload(
        &self,
        file: UploadedFile,
        kind: ResourceKind,
        folder: Option<&str>,
    ) -> Result<UploadedMedia, AppError> {
        let mut params = BTreeMap::new();
        if let Some(folder) = folder.or(self.config.folder.as_deref()) {
            params.insert("folder", folder.to_string());
        }

        let mut part = Part::bytes(file.data).file_name(file.filename);
        if let Some(content_type) = file.content_type.as_deref() {
            part = part.mime_str(content_type)?;
        }

        let form = self
            .signed_params(params)
            .into_iter()
            .fold(Form::new(), |form, (k, v)| form.text(k, v))
            .part("file", part);

        let response = self
            .client
            .post(self.endpoint(kind, "upload"))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Media(format!("upload failed with {status}: {body}")));
        }

        let uploaded = response.json::<UploadedMedia>().await?;
        log::info!("Uploaded {} asset {}", kind.as_str(), uploaded.public_id);
        Ok(uploaded)
    }

    /// Deletes an asset. Blank ids are a no-op.
    pub async fn destroy(&self, public_id: &str, kind: ResourceKind) -> Result<(), AppError> {
        if public_id.trim().is_empty() {
            return Ok(());
        }

        let mut params = BTreeMap::new();
        params.insert("public_id", public_id.to_string());

        let response = self
            .client
            .post(self.endpoint(kind, "destroy"))
            .form(&self.signed_params(params))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::Media(format!(
                "destroy of {public_id} failed with {}",
                response.status()
            )));
        }

        let outcome = response.json::<DestroyResponse>().await?;
        if outcome.result != "ok" {
            log::warn!("Media host reported '{}' deleting {}", outcome.result, public_id);
        }
        Ok(())
    }

    /// Best effort delete for assets that are orphaned or replaced.
    pub async fn discard(&self, public_id: &str, kind: ResourceKind) {
        if let Err(e) = self.destroy(public_id, kind).await {
            log::warn!("Failed to discard asset {}: {}", public_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> MediaHost {
        MediaHost::new(MediaConfig {
            api_base_url: "https://media.example.com/v1_1/".into(),
            cloud_name: "tube".into(),
            api_key: "key".into(),
            api_secret: "secret".into(),
            folder: None,
        })
    }

    #[test]
    fn endpoints_include_cloud_and_kind() {
        let host = host();
        assert_eq!(
            host.endpoint(ResourceKind::Video, "upload"),
            "https://media.example.com/v1_1/tube/video/upload"
        );
        assert_eq!(
            host.endpoint(ResourceKind::Image, "destroy"),
            "https://media.example.com/v1_1/tube/image/destroy"
        );
    }

    #[test]
    fn signature_is_sorted_sha256_with_secret() {
        let host = host();
        let mut params = BTreeMap::new();
        params.insert("timestamp", "1315060510".to_string());
        params.insert("public_id", "sample".to_string());

        let expected = format!(
            "{:x}",
            Sha256::digest(b"public_id=sample&timestamp=1315060510secret")
        );
        assert_eq!(host.sign(&params), expected);
        assert_eq!(host.sign(&params).len(), 64);
    }

    #[test]
    fn signed_params_leave_key_out_of_signature() {
        let host = host();
        let params = host.signed_params(BTreeMap::new());
        assert_eq!(params["api_key"], "key");
        assert_eq!(params["signature_algorithm"], "sha256");

        let mut signed = BTreeMap::new();
        signed.insert("timestamp", params["timestamp"].clone());
        assert_eq!(params["signature"], host.sign(&signed));
    }

    #[test]
    fn upload_response_parses() {
        let body = r#"{"secure_url":"https://cdn/x.mp4","public_id":"x","duration":12.5,"bytes":10}"#;
        let uploaded: UploadedMedia = serde_json::from_str(body).unwrap();
        assert_eq!(uploaded.url, "https://cdn/x.mp4");
        assert_eq!(uploaded.duration, Some(12.5));

        let image: UploadedMedia =
            serde_json::from_str(r#"{"secure_url":"https://cdn/a.png","public_id":"a"}"#).unwrap();
        assert_eq!(image.duration, None);
    }

    #[actix_web::test]
    async fn blank_public_id_is_not_sent() {
        assert!(host().destroy("  ", ResourceKind::Image).await.is_ok());
    }
}
