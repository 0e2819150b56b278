use bytes::Bytes;
use tracing::info;
use uuid::Uuid;

use crate::{error::ApiError, storage::StorageClient};

pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
}

/// Stores one image under `users/{owner}/{uuid}.{ext}` and returns its public URL.
pub async fn upload_image(
    storage: &dyn StorageClient,
    owner_id: i64,
    item: UploadItem,
) -> Result<String, ApiError> {
    if item.body.is_empty() {
        return Err(ApiError::invalid_input("image is empty"));
    }
    let ext = ext_from_mime(&item.content_type).ok_or_else(|| {
        ApiError::invalid_input(format!("unsupported image type '{}'", item.content_type))
    })?;

    let key = format!("users/{}/{}.{}", owner_id, Uuid::new_v4(), ext);
    let size = item.body.len();
    storage
        .put_object(&key, item.body, &item.content_type)
        .await
        .map_err(ApiError::UploadFailed)?;

    info!(owner_id, %key, size, "image uploaded");
    Ok(storage.public_url(&key))
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

#[cfg(test)]
mod image_tests {
    use super::*;
    use crate::memory::{FailingStorage, FakeStorage};

    fn png(bytes: &'static [u8]) -> UploadItem {
        UploadItem {
            body: Bytes::from_static(bytes),
            content_type: "image/png".into(),
        }
    }

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(ext_from_mime("image/gif"), Some("gif"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
    }

    #[tokio::test]
    async fn upload_returns_public_url_under_owner_prefix() {
        let storage = FakeStorage::default();
        let url = upload_image(&storage, 42, png(b"\x89PNG")).await.unwrap();

        assert!(url.starts_with("https://fake.local/users/42/"));
        assert!(url.ends_with(".png"));
        assert_eq!(storage.keys().len(), 1);
    }

    #[tokio::test]
    async fn unsupported_type_is_rejected_before_upload() {
        let storage = FakeStorage::default();
        let item = UploadItem {
            body: Bytes::from_static(b"%PDF"),
            content_type: "application/pdf".into(),
        };
        let err = upload_image(&storage, 1, item).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
        assert!(storage.keys().is_empty());
    }

    #[tokio::test]
    async fn provider_failure_surfaces_as_upload_failed() {
        let err = upload_image(&FailingStorage, 1, png(b"\x89PNG"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::UploadFailed(_)));
        assert_eq!(err.code(), "UPLOAD_FAILED");
    }
}
