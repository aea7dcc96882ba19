use std::path::{Path, PathBuf};
use std::fs;
use std::io;
use std::sync::Arc;
use std::env;
use tokio::sync::Mutex;
use sha2::{Sha256, Digest};

/// Environment variable overriding the download cache location
pub const CACHE_ENV: &str = "INCIDENT_CLASSIFIER_CACHE";

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model artifact not found: {0}")]
    NotFound(String),
    #[error("Download error: {0}")]
    DownloadError(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Model verification failed")]
    VerificationFailed,
    #[error("Hash mismatch: expected {expected}, got {actual}")]
    HashMismatch {
        expected: String,
        actual: String,
    },
}

/// Where a model artifact comes from, plus an optional SHA-256 to check it
/// against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSource {
    pub url: String,
    pub sha256: Option<String>,
}

/// A model URL split into the two cases the manager handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactLocation {
    Local(PathBuf),
    Remote(String),
}

impl ModelSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), sha256: None }
    }

    pub fn with_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.sha256 = Some(sha256.into().to_lowercase());
        self
    }

    pub fn location(&self) -> ArtifactLocation {
        if self.url.starts_with("http://") || self.url.starts_with("https://") {
            ArtifactLocation::Remote(self.url.clone())
        } else if let Some(path) = self.url.strip_prefix("file://") {
            ArtifactLocation::Local(PathBuf::from(path))
        } else {
            ArtifactLocation::Local(PathBuf::from(&self.url))
        }
    }
}

/// Resolves model URLs to files on disk, downloading remote artifacts once
/// into a cache directory.
#[derive(Clone, Debug)]
pub struct ModelManager {
    models_dir: PathBuf,
    download_lock: Arc<Mutex<()>>,
}

impl ModelManager {
    /// Creates a new ModelManager with the default models directory
    pub fn new_default() -> io::Result<Self> {
        Self::new(Self::get_default_models_dir())
    }

    /// Returns the default models directory path
    pub fn get_default_models_dir() -> PathBuf {
        if let Ok(path) = env::var(CACHE_ENV) {
            return PathBuf::from(path).join("models");
        }

        if let Some(cache_dir) = dirs::cache_dir() {
            return cache_dir.join("incident-classifier").join("models");
        }

        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(".cache").join("incident-classifier").join("models");
        }

        env::temp_dir().join("incident-classifier").join("models")
    }

    pub fn new<P: AsRef<Path>>(models_dir: P) -> io::Result<Self> {
        let models_dir = models_dir.as_ref().to_path_buf();
        fs::create_dir_all(&models_dir)?;
        Ok(Self {
            models_dir,
            download_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Cache location for a remote artifact; keyed by a digest of its URL
    pub fn get_model_path(&self, url: &str) -> PathBuf {
        let key = hex_digest(url.as_bytes());
        self.models_dir.join(&key[..16]).join("model.onnx")
    }

    pub fn is_model_downloaded(&self, url: &str) -> bool {
        let model_path = self.get_model_path(url);
        log::debug!("Model path: {:?} (exists: {})", model_path, model_path.exists());
        model_path.exists()
    }

    /// Returns a local path for `source`, downloading it first if it is
    /// remote and not yet cached (or cached but failing verification).
    ///
    /// # Errors
    /// - `NotFound` if a local path does not exist
    /// - `DownloadError` / `HashMismatch` / `IoError` for remote artifacts
    pub async fn resolve(&self, source: &ModelSource) -> Result<PathBuf, ModelError> {
        match source.location() {
            ArtifactLocation::Local(path) => {
                if !path.exists() {
                    return Err(ModelError::NotFound(path.display().to_string()));
                }
                if let Some(expected) = &source.sha256 {
                    if !self.verify_file(&path, expected)? {
                        return Err(ModelError::VerificationFailed);
                    }
                }
                Ok(path)
            }
            ArtifactLocation::Remote(url) => {
                self.ensure_model_downloaded(&url, source.sha256.as_deref()).await?;
                Ok(self.get_model_path(&url))
            }
        }
    }

    /// Ensures that a remote model is downloaded and, when a hash is given,
    /// verified. A cached file that fails verification is downloaded again.
    pub async fn ensure_model_downloaded(&self, url: &str, expected_hash: Option<&str>) -> Result<(), ModelError> {
        let _lock = self.download_lock.lock().await;
        let model_path = self.get_model_path(url);

        if model_path.exists() {
            match expected_hash {
                None => {
                    log::info!("Using cached model at {:?}", model_path);
                    return Ok(());
                }
                Some(expected) if self.verify_file(&model_path, expected)? => {
                    log::info!("Existing model file verified successfully");
                    return Ok(());
                }
                Some(_) => log::warn!("Model file verification failed, redownloading"),
            }
        }

        match self.download_and_verify_file(url, &model_path, expected_hash).await {
            Ok(()) => Ok(()),
            Err(e) => {
                log::error!("Failed to download model from {}: {}", url, e);
                let _ = self.remove_download(url);
                Err(e)
            }
        }
    }

    fn verify_file(&self, path: &Path, expected_hash: &str) -> Result<bool, ModelError> {
        let bytes = fs::read(path)?;
        let hash = hex_digest(&bytes);
        log::debug!("Calculated hash: {}", hash);
        log::debug!("Expected hash:   {}", expected_hash);
        Ok(hash.eq_ignore_ascii_case(expected_hash))
    }

    /// Checks a cached remote artifact against `expected_hash`; `false` when
    /// it is not cached at all
    pub fn verify_model(&self, url: &str, expected_hash: &str) -> Result<bool, ModelError> {
        let model_path = self.get_model_path(url);
        if !model_path.exists() {
            return Ok(false);
        }
        self.verify_file(&model_path, expected_hash)
    }

    async fn download_and_verify_file(
        &self,
        url: &str,
        path: &Path,
        expected_hash: Option<&str>,
    ) -> Result<(), ModelError> {
        log::info!("Downloading model from {} to {:?}", url, path);
        let response = reqwest::get(url).await?.error_for_status()?;
        let bytes = response.bytes().await?;
        log::info!("Downloaded {} bytes", bytes.len());

        if let Some(expected) = expected_hash {
            let hash = hex_digest(&bytes);
            if !hash.eq_ignore_ascii_case(expected) {
                return Err(ModelError::HashMismatch {
                    expected: expected.to_string(),
                    actual: hash,
                });
            }
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, &bytes)?;

        if let Some(expected) = expected_hash {
            if !self.verify_file(path, expected)? {
                return Err(ModelError::VerificationFailed);
            }
        }

        log::info!("Model downloaded successfully");
        Ok(())
    }

    pub fn remove_download(&self, url: &str) -> Result<(), ModelError> {
        let model_path = self.get_model_path(url);
        if model_path.exists() {
            fs::remove_file(&model_path)?;
        }
        Ok(())
    }
}

fn hex_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = env::temp_dir().join("incident-classifier-tests").join(name);
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_locations() {
        assert_eq!(
            ModelSource::new("https://example.com/model.onnx").location(),
            ArtifactLocation::Remote("https://example.com/model.onnx".into())
        );
        assert_eq!(
            ModelSource::new("file:///opt/model.onnx").location(),
            ArtifactLocation::Local(PathBuf::from("/opt/model.onnx"))
        );
        assert_eq!(
            ModelSource::new("assets/model.onnx").location(),
            ArtifactLocation::Local(PathBuf::from("assets/model.onnx"))
        );
    }

    #[test]
    fn test_model_path_is_stable_per_url() {
        let manager = ModelManager::new(scratch_dir("paths")).unwrap();
        let a = manager.get_model_path("https://example.com/a.onnx");
        let b = manager.get_model_path("https://example.com/b.onnx");
        assert_eq!(a, manager.get_model_path("https://example.com/a.onnx"));
        assert_ne!(a, b);
        assert!(a.ends_with("model.onnx"));
        assert!(a.starts_with(manager.models_dir()));
    }

    #[tokio::test]
    async fn test_resolve_local() -> Result<(), Box<dyn std::error::Error>> {
        let dir = scratch_dir("local");
        let manager = ModelManager::new(&dir)?;
        let model_path = dir.join("model.onnx");
        fs::write(&model_path, b"not really onnx")?;

        let source = ModelSource::new(model_path.to_string_lossy());
        assert_eq!(manager.resolve(&source).await?, model_path);

        let expected = hex_digest(b"not really onnx");
        let verified = source.clone().with_sha256(expected.to_uppercase());
        assert_eq!(manager.resolve(&verified).await?, model_path);

        let wrong = source.with_sha256("00");
        assert!(matches!(
            manager.resolve(&wrong).await,
            Err(ModelError::VerificationFailed)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_resolve_missing_local() {
        let manager = ModelManager::new(scratch_dir("missing")).unwrap();
        let result = manager.resolve(&ModelSource::new("/nonexistent/model.onnx")).await;
        assert!(matches!(result, Err(ModelError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_cached_remote_is_not_redownloaded() -> Result<(), Box<dyn std::error::Error>> {
        let manager = ModelManager::new(scratch_dir("cached"))?;
        // Unroutable: any network access would fail the test.
        let url = "http://127.0.0.1:9/model.onnx";
        let cached = manager.get_model_path(url);
        fs::create_dir_all(cached.parent().unwrap())?;
        fs::write(&cached, b"cached bytes")?;

        assert!(manager.is_model_downloaded(url));
        let source = ModelSource::new(url).with_sha256(hex_digest(b"cached bytes"));
        assert_eq!(manager.resolve(&source).await?, cached);
        assert!(manager.verify_model(url, &hex_digest(b"cached bytes"))?);

        manager.remove_download(url)?;
        assert!(!manager.is_model_downloaded(url));
        assert!(!manager.verify_model(url, "00")?);
        Ok(())
    }

    #[test]
    fn test_default_models_dir() {
        env::set_var(CACHE_ENV, "/tmp/test-cache");
        let path = ModelManager::get_default_models_dir();
        assert!(path.to_str().unwrap().contains("/tmp/test-cache/models"));
        env::remove_var(CACHE_ENV);

        let path = ModelManager::get_default_models_dir();
        assert!(path.to_str().unwrap().contains("models"));
    }
}
