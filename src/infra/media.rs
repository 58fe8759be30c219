//! Signed direct uploads to the media asset CDN.
//!
//! The browser uploads straight to the CDN with parameters we sign; only the
//! resulting delivery URL comes back to this service.

use crate::crypto::signing::sign_params;
use crate::infra::config::CdnConfig;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;
use uuid::Uuid;

const UPLOAD_API: &str = "https://api.cloudinary.com/v1_1";
const DELIVERY_HOST: &str = "https://res.cloudinary.com";
const ROOT_FOLDER: &str = "musicstream";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UploadKind {
    Audio,
    Cover,
    Avatar,
}

impl UploadKind {
    fn folder_name(&self) -> &'static str {
        match self {
            UploadKind::Audio => "audio",
            UploadKind::Cover => "cover",
            UploadKind::Avatar => "avatar",
        }
    }

    /// CDN resource type; audio is stored under the video pipeline.
    fn resource_type(&self) -> &'static str {
        match self {
            UploadKind::Audio => "video",
            UploadKind::Cover | UploadKind::Avatar => "image",
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SignedUpload {
    pub upload_url: String,
    pub api_key: String,
    pub timestamp: i64,
    pub folder: String,
    pub signature: String,
    pub signature_algorithm: String,
}

pub struct MediaSigner {
    config: CdnConfig,
}

impl MediaSigner {
    pub fn new(config: CdnConfig) -> Self {
        Self { config }
    }

    pub fn sign_upload(&self, kind: UploadKind, owner_id: Uuid) -> SignedUpload {
        self.sign_upload_at(kind, owner_id, Utc::now().timestamp())
    }

    fn sign_upload_at(&self, kind: UploadKind, owner_id: Uuid, timestamp: i64) -> SignedUpload {
        let folder = format!("{}/{}/{}", ROOT_FOLDER, kind.folder_name(), owner_id);
        let mut params = BTreeMap::new();
        params.insert("folder".to_string(), folder.clone());
        params.insert("timestamp".to_string(), timestamp.to_string());

        SignedUpload {
            upload_url: format!(
                "{}/{}/{}/upload",
                UPLOAD_API,
                self.config.cloud_name,
                kind.resource_type()
            ),
            api_key: self.config.api_key.clone(),
            timestamp,
            folder,
            signature: sign_params(&params, &self.config.api_secret),
            signature_algorithm: "sha256".to_string(),
        }
    }

    /// True if `url` is a delivery URL of our cloud.
    pub fn is_cdn_url(&self, url: &str) -> bool {
        let prefix = format!("{}/{}/", DELIVERY_HOST, self.config.cloud_name);
        url.starts_with(&prefix) && url.len() > prefix.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> MediaSigner {
        MediaSigner::new(CdnConfig {
            cloud_name: "demo".to_string(),
            api_key: "key".to_string(),
            api_secret: "secret".to_string(),
        })
    }

    #[test]
    fn audio_upload_targets_video_pipeline() {
        let owner = Uuid::new_v4();
        let signed = signer().sign_upload_at(UploadKind::Audio, owner, 1_700_000_000);
        assert_eq!(
            signed.upload_url,
            "https://api.cloudinary.com/v1_1/demo/video/upload"
        );
        assert_eq!(signed.folder, format!("musicstream/audio/{}", owner));
        assert_eq!(signed.signature.len(), 64);
        assert_eq!(signed.signature_algorithm, "sha256");
    }

    #[test]
    fn signature_depends_on_timestamp() {
        let owner = Uuid::new_v4();
        let a = signer().sign_upload_at(UploadKind::Cover, owner, 1);
        let b = signer().sign_upload_at(UploadKind::Cover, owner, 2);
        assert_ne!(a.signature, b.signature);
    }

    #[test]
    fn only_our_cloud_urls_are_accepted() {
        let s = signer();
        assert!(s.is_cdn_url("https://res.cloudinary.com/demo/video/upload/v1/a.mp3"));
        assert!(!s.is_cdn_url("https://res.cloudinary.com/other/video/upload/a.mp3"));
        assert!(!s.is_cdn_url("https://evil.example.com/demo/a.mp3"));
        assert!(!s.is_cdn_url("https://res.cloudinary.com/demo/"));
    }
}
