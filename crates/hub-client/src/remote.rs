//! HTTP implementations of the storage and function boundaries.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;
use serde_json::Value;
use tracing::debug;

use hub_shared::{BackendError, BlobStorage, Functions};

fn request(client: &reqwest::Client, url: impl reqwest::IntoUrl, api_key: Option<&str>) -> reqwest::RequestBuilder {
    let builder = client.post(url);
    match api_key {
        Some(key) => builder.bearer_auth(key).header("apikey", key),
        None => builder,
    }
}

/// Read the body of a failed response as the error message.
async fn failure(response: reqwest::Response) -> String {
    let status = response.status();
    match response.text().await {
        Ok(body) if !body.trim().is_empty() => format!("{status}: {body}"),
        _ => status.to_string(),
    }
}

/// Invokes remote functions at `{base}/functions/v1/{name}`.
#[derive(Debug, Clone)]
pub struct HttpFunctions {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpFunctions {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    pub fn function_url(&self, name: &str) -> String {
        format!("{}/functions/v1/{}", self.base_url, name)
    }
}

#[async_trait]
impl Functions for HttpFunctions {
    async fn invoke(&self, name: &str, body: Value) -> Result<Value, BackendError> {
        let url = self.function_url(name);
        debug!(function = name, "invoking remote function");

        let response = request(&self.client, &url, self.api_key.as_deref())
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Function(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BackendError::Function(failure(response).await));
        }

        response
            .json()
            .await
            .map_err(|e| BackendError::Malformed(format!("{name}: {e}")))
    }
}

/// Uploads objects to `{base}/storage/v1/object/{bucket}/{path}`.
#[derive(Debug, Clone)]
pub struct HttpStorage {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpStorage {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    pub fn upload_url(&self, bucket: &str, path: &str) -> Result<Url, BackendError> {
        self.object_url(&["storage", "v1", "object", bucket], path)
    }

    pub fn public_url(&self, bucket: &str, path: &str) -> Result<Url, BackendError> {
        self.object_url(&["storage", "v1", "object", "public", bucket], path)
    }

    /// `base` plus `prefix` plus each segment of `path`, percent-encoded.
    fn object_url(&self, prefix: &[&str], path: &str) -> Result<Url, BackendError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| BackendError::Storage(format!("{}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| BackendError::Storage(format!("{} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(prefix)
            .extend(path.split('/'));
        Ok(url)
    }
}

#[async_trait]
impl BlobStorage for HttpStorage {
    async fn upload(&self, bucket: &str, path: &str, data: Bytes) -> Result<String, BackendError> {
        let url = self.upload_url(bucket, path)?;
        let public = self.public_url(bucket, path)?;
        debug!(bucket, path, size = data.len(), "uploading object");

        let response = request(&self.client, url, self.api_key.as_deref())
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(data)
            .send()
            .await
            .map_err(|e| BackendError::Storage(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BackendError::Storage(failure(response).await));
        }

        Ok(public.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_urls() {
        let functions = HttpFunctions::new("https://hub.example.com/", None);
        assert_eq!(
            functions.function_url("get-analytics"),
            "https://hub.example.com/functions/v1/get-analytics"
        );
    }

    #[test]
    fn storage_urls() {
        let storage = HttpStorage::new("http://localhost:8000", Some("key".into()));
        assert_eq!(
            storage.upload_url("post-media", "u1/1700000000000-a.png").unwrap().as_str(),
            "http://localhost:8000/storage/v1/object/post-media/u1/1700000000000-a.png"
        );
        assert_eq!(
            storage.public_url("post-media", "u1/a.png").unwrap().as_str(),
            "http://localhost:8000/storage/v1/object/public/post-media/u1/a.png"
        );
    }

    #[test]
    fn storage_urls_keep_the_whole_file_name() {
        let storage = HttpStorage::new("https://cdn.test/", None);
        let url = storage
            .upload_url("post-media", "me/1700000000000-summer #1?.png")
            .unwrap();
        assert_eq!(url.path(), "/storage/v1/object/post-media/me/1700000000000-summer%20%231%3F.png");
        assert!(url.query().is_none());
        assert!(url.fragment().is_none());

        let public = storage
            .public_url("post-media", "me/1700000000000-100%.png")
            .unwrap();
        assert_eq!(
            public.as_str(),
            "https://cdn.test/storage/v1/object/public/post-media/me/1700000000000-100%25.png"
        );
    }

    #[test]
    fn invalid_base_is_a_storage_error() {
        let storage = HttpStorage::new("not a url", None);
        assert!(matches!(
            storage.upload_url("post-media", "k"),
            Err(BackendError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_function_is_a_function_error() {
        let functions = HttpFunctions::new("http://127.0.0.1:9", None);
        let err = functions.invoke("get-analytics", serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, BackendError::Function(_)));
    }
}
