//! JSON data sources
//!
//! Widget data is published as small JSON files, either next to the kiosk or
//! behind an HTTP endpoint. [`Source`] reads both.

use serde::de::DeserializeOwned;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors fetching widget data
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {reason}")]
    Http { url: String, reason: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid data from {location}: {reason}")]
    Decode { location: String, reason: String },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Location of a widget data resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Http(String),
    File(PathBuf),
}

impl Source {
    /// Resolve `reference` against `base_dir`. HTTP(S) URLs and absolute
    /// paths are kept as they are.
    pub fn resolve(reference: &str, base_dir: &Path) -> Self {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            Source::Http(reference.to_string())
        } else {
            Source::File(base_dir.join(reference))
        }
    }

    /// Fetch the raw resource body.
    pub async fn fetch_bytes(&self) -> Result<Vec<u8>, FetchError> {
        match self {
            Source::Http(url) => {
                let url = url.clone();
                let task_url = url.clone();
                tokio::task::spawn_blocking(move || fetch_http(&task_url))
                    .await
                    .map_err(|e| FetchError::Http {
                        url,
                        reason: e.to_string(),
                    })?
            }
            Source::File(path) => tokio::fs::read(path).await.map_err(|source| FetchError::Io {
                path: path.clone(),
                source,
            }),
        }
    }

    /// Fetch the resource and decode it as JSON.
    pub async fn fetch_json<T: DeserializeOwned>(&self) -> Result<T, FetchError> {
        let bytes = self.fetch_bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode {
            location: self.to_string(),
            reason: e.to_string(),
        })
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Http(url) => f.write_str(url),
            Source::File(path) => write!(f, "{}", path.display()),
        }
    }
}

fn fetch_http(url: &str) -> Result<Vec<u8>, FetchError> {
    let agent = ureq::agent();
    let response = agent
        .get(url)
        .set("Accept", "application/json")
        .set("User-Agent", "pdf-kiosk")
        .call()
        .map_err(|e| FetchError::Http {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let body = response.into_string().map_err(|e| FetchError::Http {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    Ok(body.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::fs;
    use tempfile::TempDir;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Message {
        infos: String,
    }

    #[test]
    fn test_resolve() {
        let base = Path::new("/srv/kiosk");
        assert_eq!(
            Source::resolve("output/infos.json", base),
            Source::File(PathBuf::from("/srv/kiosk/output/infos.json"))
        );
        assert_eq!(
            Source::resolve("https://example.com/infos.json", base),
            Source::Http("https://example.com/infos.json".to_string())
        );
        assert_eq!(
            Source::resolve("/tmp/infos.json", base),
            Source::File(PathBuf::from("/tmp/infos.json"))
        );
    }

    #[tokio::test]
    async fn test_fetch_json_from_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("infos.json"), r#"{"infos": "Willkommen"}"#).unwrap();

        let source = Source::resolve("infos.json", dir.path());
        let message: Message = source.fetch_json().await.unwrap();
        assert_eq!(message.infos, "Willkommen");
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let source = Source::resolve("missing.json", dir.path());

        let err = source.fetch_json::<Message>().await.unwrap_err();
        assert!(matches!(err, FetchError::Io { .. }));
    }

    #[tokio::test]
    async fn test_malformed_json_is_decode_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("infos.json"), "{not json").unwrap();

        let source = Source::resolve("infos.json", dir.path());
        let err = source.fetch_json::<Message>().await.unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }));
        assert!(err.to_string().contains("infos.json"));
    }
}
