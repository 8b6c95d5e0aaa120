//! Client configuration loaded from environment variables.
//!
//! All settings have defaults so the dashboard core can run against a local
//! backend with zero configuration.

use std::path::PathBuf;

use hub_shared::constants::MAX_MEDIA_SIZE;

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Directory for the local database and blob store.
    /// Env: `HUB_DATA_DIR`
    /// Default: the platform data directory.
    pub data_dir: Option<PathBuf>,

    /// Base URL under which uploaded media are publicly served.
    /// Env: `HUB_PUBLIC_URL`
    /// Default: `http://localhost:8000`
    pub public_url: String,

    /// Remote function endpoint. Unset keeps functions local.
    /// Env: `HUB_FUNCTIONS_URL`
    pub functions_url: Option<String>,

    /// Remote blob storage endpoint. Unset keeps blobs local.
    /// Env: `HUB_STORAGE_URL`
    pub storage_url: Option<String>,

    /// Bearer token sent to remote endpoints.
    /// Env: `HUB_API_KEY`
    pub api_key: Option<String>,

    /// Largest media file accepted for upload, in bytes.
    /// Env: `HUB_MAX_MEDIA_SIZE`
    /// Default: 50 MiB
    pub max_media_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            public_url: "http://localhost:8000".to_string(),
            functions_url: None,
            storage_url: None,
            api_key: None,
            max_media_size: MAX_MEDIA_SIZE,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = non_empty("HUB_DATA_DIR") {
            config.data_dir = Some(PathBuf::from(dir));
        }

        if let Some(url) = non_empty("HUB_PUBLIC_URL") {
            config.public_url = url.trim_end_matches('/').to_string();
        }

        config.functions_url = non_empty("HUB_FUNCTIONS_URL");
        config.storage_url = non_empty("HUB_STORAGE_URL");
        config.api_key = non_empty("HUB_API_KEY");

        if let Some(val) = non_empty("HUB_MAX_MEDIA_SIZE") {
            match val.trim().parse::<usize>() {
                Ok(n) if n > 0 => config.max_media_size = n,
                _ => tracing::warn!(value = %val, "Invalid HUB_MAX_MEDIA_SIZE, using default"),
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::from_lookup(|_| None);
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.max_media_size, MAX_MEDIA_SIZE);
    }

    #[test]
    fn test_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("HUB_DATA_DIR", "/tmp/hub"),
            ("HUB_PUBLIC_URL", "https://media.example.com/"),
            ("HUB_FUNCTIONS_URL", "https://fn.example.com"),
            ("HUB_API_KEY", "k"),
            ("HUB_MAX_MEDIA_SIZE", "1024"),
        ]));
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/hub")));
        assert_eq!(config.public_url, "https://media.example.com");
        assert_eq!(config.functions_url.as_deref(), Some("https://fn.example.com"));
        assert!(config.storage_url.is_none());
        assert_eq!(config.api_key.as_deref(), Some("k"));
        assert_eq!(config.max_media_size, 1024);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = ClientConfig::from_lookup(lookup(&[("HUB_MAX_MEDIA_SIZE", "lots"), ("HUB_API_KEY", "  ")]));
        assert_eq!(config.max_media_size, MAX_MEDIA_SIZE);
        assert!(config.api_key.is_none());
    }
}
