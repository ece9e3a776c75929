//! Drive tier backend.
//!
//! A thin client over an OAuth drive API: refresh-token exchange, multipart
//! upload, folder lookup-or-create, and the account quota endpoint. Unlike
//! the object and local backends, this backend returns opaque file ids; the
//! logical path's directory components are mirrored as a folder hierarchy.

use crate::traits::{
    ContainerRef, ObjectMeta, ProviderAdapter, ProviderError, ProviderResult, PutOutcome,
    StoredObject, UsageSnapshot,
};
use async_trait::async_trait;
use fotofest_core::StorageTier;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
const TOKEN_EXPIRY_SLACK: Duration = Duration::from_secs(30);
const UPLOAD_BOUNDARY: &str = "fotofest_drive_upload";

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Drive tier backend
pub struct DriveProvider {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    token_url: String,
    api_base: String,
    root_folder: Option<String>,
    capacity_fallback: u64,
    token: Mutex<Option<CachedToken>>,
    // Resolved logical-directory -> folder id, so repeated uploads into the
    // same album cost one lookup.
    folders: Mutex<HashMap<String, String>>,
}

#[derive(serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    #[serde(default)]
    web_view_link: Option<String>,
    #[serde(default)]
    size: Option<String>,
}

#[derive(serde::Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct StorageQuota {
    #[serde(default)]
    usage: Option<String>,
    #[serde(default)]
    limit: Option<String>,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct AboutResponse {
    storage_quota: StorageQuota,
}

/// Escape a value for embedding in a drive query expression.
fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Split a logical path into its directory chain and filename.
fn split_logical_path(logical_path: &str) -> (Vec<&str>, &str) {
    let mut parts: Vec<&str> = logical_path.split('/').filter(|p| !p.is_empty()).collect();
    let name = parts.pop().unwrap_or("file");
    (parts, name)
}

impl DriveProvider {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client_id: String,
        client_secret: String,
        refresh_token: String,
        token_url: String,
        api_base: String,
        root_folder: Option<String>,
        capacity_fallback: u64,
    ) -> ProviderResult<Self> {
        if client_id.is_empty() || client_secret.is_empty() || refresh_token.is_empty() {
            return Err(ProviderError::Unavailable(
                "Drive credentials not configured".to_string(),
            ));
        }

        Ok(DriveProvider {
            http: reqwest::Client::new(),
            client_id,
            client_secret,
            refresh_token,
            token_url,
            api_base: api_base.trim_end_matches('/').to_string(),
            root_folder,
            capacity_fallback,
            token: Mutex::new(None),
            folders: Mutex::new(HashMap::new()),
        })
    }

    /// Exchange the refresh token for an access token, caching it until
    /// shortly before expiry.
    async fn access_token(&self) -> ProviderResult<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.access_token.clone());
            }
        }

        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", self.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("Token refresh failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!(status = %status, "Drive token refresh rejected");
            return Err(ProviderError::Unavailable(format!(
                "Token refresh rejected with status {}",
                status
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("Malformed token response: {}", e)))?;

        let access_token = token.access_token.clone();
        *cached = Some(CachedToken {
            access_token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in)
                - TOKEN_EXPIRY_SLACK,
        });

        Ok(access_token)
    }

    /// Find a folder by name under a parent, creating it when absent.
    /// Lookup-before-create plus re-query on a failed create makes this
    /// idempotent across concurrent callers.
    async fn ensure_folder(&self, name: &str, parent: Option<&str>) -> ProviderResult<String> {
        if let Some(id) = self.lookup_folder(name, parent).await? {
            return Ok(id);
        }

        let token = self.access_token().await?;
        let mut body = serde_json::json!({
            "name": name,
            "mimeType": FOLDER_MIME,
        });
        if let Some(parent) = parent {
            body["parents"] = serde_json::json!([parent]);
        }

        let response = self
            .http
            .post(format!("{}/drive/v3/files", self.api_base))
            .bearer_auth(&token)
            .query(&[("fields", "id")])
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::WriteFailed(format!("Folder creation failed: {}", e)))?;

        if response.status().is_success() {
            let file: DriveFile = response.json().await.map_err(|e| {
                ProviderError::WriteFailed(format!("Malformed folder response: {}", e))
            })?;
            tracing::info!(folder = %name, folder_id = %file.id, "Drive folder created");
            return Ok(file.id);
        }

        // Another writer may have created it between lookup and create.
        if let Some(id) = self.lookup_folder(name, parent).await? {
            return Ok(id);
        }

        Err(ProviderError::WriteFailed(format!(
            "Folder creation for '{}' failed with status {}",
            name,
            response.status()
        )))
    }

    async fn lookup_folder(&self, name: &str, parent: Option<&str>) -> ProviderResult<Option<String>> {
        let token = self.access_token().await?;
        let mut query = format!(
            "name = '{}' and mimeType = '{}' and trashed = false",
            escape_query(name),
            FOLDER_MIME
        );
        if let Some(parent) = parent {
            query.push_str(&format!(" and '{}' in parents", escape_query(parent)));
        }

        let response = self
            .http
            .get(format!("{}/drive/v3/files", self.api_base))
            .bearer_auth(&token)
            .query(&[("q", query.as_str()), ("fields", "files(id)")])
            .send()
            .await
            .map_err(|e| ProviderError::ReadFailed(format!("Folder lookup failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ProviderError::ReadFailed(format!(
                "Folder lookup failed with status {}",
                response.status()
            )));
        }

        let list: FileList = response
            .json()
            .await
            .map_err(|e| ProviderError::ReadFailed(format!("Malformed lookup response: {}", e)))?;

        Ok(list.files.into_iter().next().map(|f| f.id))
    }

    /// Resolve the folder chain for a logical path, creating missing levels.
    async fn resolve_folder_chain(&self, dirs: &[&str]) -> ProviderResult<Option<String>> {
        let mut parent = self.root_folder.clone();
        let mut cache_key = String::new();

        for dir in dirs {
            cache_key = if cache_key.is_empty() {
                (*dir).to_string()
            } else {
                format!("{}/{}", cache_key, dir)
            };

            let cached = self.folders.lock().await.get(&cache_key).cloned();
            let id = match cached {
                Some(id) => id,
                None => {
                    let id = self.ensure_folder(dir, parent.as_deref()).await?;
                    self.folders
                        .lock()
                        .await
                        .insert(cache_key.clone(), id.clone());
                    id
                }
            };
            parent = Some(id);
        }

        Ok(parent)
    }

    /// Build a multipart/related upload body: a JSON metadata part followed
    /// by the media part.
    fn multipart_body(metadata: &serde_json::Value, content_type: &str, data: &[u8]) -> Vec<u8> {
        let mut body = Vec::with_capacity(data.len() + 512);
        body.extend_from_slice(format!("--{}\r\n", UPLOAD_BOUNDARY).as_bytes());
        body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
        body.extend_from_slice(metadata.to_string().as_bytes());
        body.extend_from_slice(format!("\r\n--{}\r\n", UPLOAD_BOUNDARY).as_bytes());
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{}--\r\n", UPLOAD_BOUNDARY).as_bytes());
        body
    }
}

impl DriveProvider {
    /// Upload bytes as a file under a parent folder.
    async fn upload_multipart(
        &self,
        data: Vec<u8>,
        file_name: &str,
        parent: Option<&str>,
        meta: &ObjectMeta,
        log_key: &str,
    ) -> ProviderResult<PutOutcome> {
        let token = self.access_token().await?;

        let size = data.len() as u64;
        let start = std::time::Instant::now();

        let mut metadata = serde_json::json!({ "name": file_name });
        if let Some(parent) = parent {
            metadata["parents"] = serde_json::json!([parent]);
        }
        let mut properties = serde_json::Map::new();
        if let Some(uploader) = &meta.uploader_name {
            properties.insert("uploader".to_string(), serde_json::json!(uploader));
        }
        if let Some(album) = &meta.album_name {
            properties.insert("album".to_string(), serde_json::json!(album));
        }
        if !properties.is_empty() {
            metadata["appProperties"] = serde_json::Value::Object(properties);
        }

        let content_type = if meta.content_type.is_empty() {
            "application/octet-stream"
        } else {
            &meta.content_type
        };
        let body = Self::multipart_body(&metadata, content_type, &data);

        let response = self
            .http
            .post(format!("{}/upload/drive/v3/files", self.api_base))
            .bearer_auth(&token)
            .query(&[("uploadType", "multipart"), ("fields", "id,webViewLink")])
            .header(
                "Content-Type",
                format!("multipart/related; boundary={}", UPLOAD_BOUNDARY),
            )
            .body(body)
            .send()
            .await
            .map_err(|e| ProviderError::WriteFailed(format!("Drive upload failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!(
                status = %status,
                key = %log_key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Drive upload failed"
            );
            return Err(ProviderError::WriteFailed(format!(
                "Drive upload failed with status {}",
                status
            )));
        }

        let file: DriveFile = response
            .json()
            .await
            .map_err(|e| ProviderError::WriteFailed(format!("Malformed upload response: {}", e)))?;

        tracing::info!(
            key = %log_key,
            file_id = %file.id,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Drive upload successful"
        );

        let url = file
            .web_view_link
            .unwrap_or_else(|| format!("{}/drive/v3/files/{}?alt=media", self.api_base, file.id));

        Ok(PutOutcome {
            url,
            provider_path: file.id,
            etag: None,
        })
    }
}

#[async_trait]
impl ProviderAdapter for DriveProvider {
    async fn put(
        &self,
        data: Vec<u8>,
        logical_path: &str,
        meta: &ObjectMeta,
    ) -> ProviderResult<PutOutcome> {
        let (dirs, file_name) = split_logical_path(logical_path);
        let parent = self.resolve_folder_chain(&dirs).await?;
        self.upload_multipart(data, file_name, parent.as_deref(), meta, logical_path)
            .await
    }

    async fn put_in_container(
        &self,
        data: Vec<u8>,
        name: &str,
        container: &ContainerRef,
        meta: &ObjectMeta,
    ) -> ProviderResult<PutOutcome> {
        self.upload_multipart(data, name, Some(&container.id), meta, name)
            .await
    }

    async fn get(&self, provider_path: &str) -> ProviderResult<Vec<u8>> {
        let token = self.access_token().await?;
        let start = std::time::Instant::now();

        let response = self
            .http
            .get(format!("{}/drive/v3/files/{}", self.api_base, provider_path))
            .bearer_auth(&token)
            .query(&[("alt", "media")])
            .send()
            .await
            .map_err(|e| ProviderError::ReadFailed(format!("Drive download failed: {}", e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(provider_path.to_string()));
        }
        if !response.status().is_success() {
            return Err(ProviderError::ReadFailed(format!(
                "Drive download failed with status {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::ReadFailed(e.to_string()))?;

        tracing::info!(
            file_id = %provider_path,
            size_bytes = bytes.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Drive download successful"
        );

        Ok(bytes.to_vec())
    }

    async fn delete(&self, provider_path: &str) -> ProviderResult<bool> {
        let token = self.access_token().await?;

        let response = self
            .http
            .delete(format!("{}/drive/v3/files/{}", self.api_base, provider_path))
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| ProviderError::WriteFailed(format!("Drive delete failed: {}", e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !response.status().is_success() {
            return Err(ProviderError::WriteFailed(format!(
                "Drive delete failed with status {}",
                response.status()
            )));
        }

        tracing::info!(file_id = %provider_path, "Drive delete successful");
        Ok(true)
    }

    async fn list(&self, prefix: &str) -> ProviderResult<Vec<StoredObject>> {
        let token = self.access_token().await?;
        let folder = if prefix.is_empty() {
            self.root_folder.as_deref().unwrap_or("root")
        } else {
            prefix
        };
        let query = format!("'{}' in parents and trashed = false", escape_query(folder));

        let response = self
            .http
            .get(format!("{}/drive/v3/files", self.api_base))
            .bearer_auth(&token)
            .query(&[("q", query.as_str()), ("fields", "files(id,name,size)")])
            .send()
            .await
            .map_err(|e| ProviderError::ReadFailed(format!("Drive list failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ProviderError::ReadFailed(format!(
                "Drive list failed with status {}",
                response.status()
            )));
        }

        let list: FileList = response
            .json()
            .await
            .map_err(|e| ProviderError::ReadFailed(format!("Malformed list response: {}", e)))?;

        Ok(list
            .files
            .into_iter()
            .map(|f| StoredObject {
                path: f.id,
                size_bytes: f.size.and_then(|s| s.parse().ok()).unwrap_or(0),
            })
            .collect())
    }

    async fn usage_snapshot(&self) -> ProviderResult<UsageSnapshot> {
        let token = self.access_token().await?;

        let response = self
            .http
            .get(format!("{}/drive/v3/about", self.api_base))
            .bearer_auth(&token)
            .query(&[("fields", "storageQuota")])
            .send()
            .await
            .map_err(|e| ProviderError::ReadFailed(format!("Drive quota query failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ProviderError::ReadFailed(format!(
                "Drive quota query failed with status {}",
                response.status()
            )));
        }

        let about: AboutResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ReadFailed(format!("Malformed quota response: {}", e)))?;

        let used_bytes = about
            .storage_quota
            .usage
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        // Accounts without a hard quota report no limit; fall back to the
        // configured ceiling.
        let capacity_bytes = about
            .storage_quota
            .limit
            .and_then(|s| s.parse().ok())
            .unwrap_or(self.capacity_fallback);

        Ok(UsageSnapshot {
            used_bytes,
            capacity_bytes,
        })
    }

    async fn create_container(
        &self,
        name: &str,
        parent: Option<&str>,
    ) -> ProviderResult<ContainerRef> {
        let parent = parent.or(self.root_folder.as_deref());
        let id = self.ensure_folder(name, parent).await?;
        Ok(ContainerRef {
            url: Some(format!("https://drive.google.com/drive/folders/{}", id)),
            id,
        })
    }

    fn tier(&self) -> StorageTier {
        StorageTier::Drive
    }

    fn provider_name(&self) -> &'static str {
        "drive"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_escaping() {
        assert_eq!(escape_query("Bob's album"), "Bob\\'s album");
        assert_eq!(escape_query(r"a\b"), r"a\\b");
    }

    #[test]
    fn test_split_logical_path() {
        let (dirs, name) = split_logical_path("events/gala/Ceremony/1_a_x.jpg");
        assert_eq!(dirs, vec!["events", "gala", "Ceremony"]);
        assert_eq!(name, "1_a_x.jpg");

        let (dirs, name) = split_logical_path("hero.jpg");
        assert!(dirs.is_empty());
        assert_eq!(name, "hero.jpg");
    }

    #[test]
    fn test_quota_response_parsing() {
        let about: AboutResponse = serde_json::from_str(
            r#"{"storageQuota": {"usage": "1048576", "limit": "16106127360"}}"#,
        )
        .unwrap();
        assert_eq!(about.storage_quota.usage.as_deref(), Some("1048576"));
        assert_eq!(about.storage_quota.limit.as_deref(), Some("16106127360"));

        let unlimited: AboutResponse =
            serde_json::from_str(r#"{"storageQuota": {"usage": "42"}}"#).unwrap();
        assert!(unlimited.storage_quota.limit.is_none());
    }

    #[test]
    fn test_missing_credentials_fail_fast() {
        let result = DriveProvider::new(
            String::new(),
            "secret".to_string(),
            "token".to_string(),
            "https://oauth2.googleapis.com/token".to_string(),
            "https://www.googleapis.com".to_string(),
            None,
            15 * 1024 * 1024 * 1024,
        );
        assert!(matches!(result, Err(ProviderError::Unavailable(_))));
    }

    #[test]
    fn test_multipart_body_shape() {
        let metadata = serde_json::json!({ "name": "x.jpg" });
        let body = DriveProvider::multipart_body(&metadata, "image/jpeg", b"DATA");
        let text = String::from_utf8_lossy(&body);
        assert!(text.starts_with(&format!("--{}", UPLOAD_BOUNDARY)));
        assert!(text.contains("Content-Type: application/json"));
        assert!(text.contains("Content-Type: image/jpeg"));
        assert!(text.contains("DATA"));
        assert!(text.trim_end().ends_with(&format!("--{}--", UPLOAD_BOUNDARY)));
    }
}
