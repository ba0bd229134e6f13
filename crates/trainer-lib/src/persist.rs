//! Model persistence
//!
//! Models are bincode-encoded inside a small versioned envelope, written to
//! a temp file and renamed over the target path.

use crate::classifier::AttackClassifier;
use crate::error::{PipelineError, Result};
use crate::models::ArtifactInfo;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default artifact path, relative to the working directory
pub const DEFAULT_MODEL_PATH: &str = "attack_classifier.pkl";

/// Envelope format written by this version
pub const MODEL_FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct ModelEnvelopeRef<'a> {
    format_version: u32,
    model: &'a AttackClassifier,
}

#[derive(Deserialize)]
struct ModelEnvelope {
    format_version: u32,
    model: AttackClassifier,
}

/// Reads and writes the classifier artifact at a fixed path
#[derive(Debug, Clone)]
pub struct ModelStore {
    path: PathBuf,
}

impl Default for ModelStore {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL_PATH)
    }
}

impl ModelStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize the model, replacing any existing artifact
    pub fn save(&self, model: &AttackClassifier) -> Result<ArtifactInfo> {
        let envelope = ModelEnvelopeRef {
            format_version: MODEL_FORMAT_VERSION,
            model,
        };
        let bytes = bincode::serialize(&envelope)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| PipelineError::persist(parent, e))?;
        }

        // Write to temp file first
        let temp_path = self.path.with_extension("tmp");
        if let Err(e) = write_and_replace(&temp_path, &self.path, &bytes) {
            if let Err(cleanup) = fs::remove_file(&temp_path) {
                if cleanup.kind() != ErrorKind::NotFound {
                    warn!(path = ?temp_path, error = %cleanup, "Failed to remove temp model file");
                }
            }
            return Err(e);
        }

        let checksum = compute_checksum(&bytes);
        debug!(path = ?self.path, size = bytes.len(), checksum = %checksum, "Model written");

        Ok(ArtifactInfo {
            path: self.path.clone(),
            size_bytes: bytes.len() as u64,
            checksum,
        })
    }

    /// Load a previously saved model
    pub fn load(&self) -> Result<AttackClassifier> {
        let bytes = fs::read(&self.path).map_err(|e| PipelineError::persist(&self.path, e))?;
        let envelope: ModelEnvelope = bincode::deserialize(&bytes)?;

        if envelope.format_version != MODEL_FORMAT_VERSION {
            return Err(PipelineError::UnsupportedFormat {
                path: self.path.clone(),
                found: envelope.format_version,
                expected: MODEL_FORMAT_VERSION,
            });
        }

        Ok(envelope.model)
    }

    /// Describe the artifact on disk without decoding it
    pub fn artifact_info(&self) -> Result<ArtifactInfo> {
        let bytes = fs::read(&self.path).map_err(|e| PipelineError::persist(&self.path, e))?;
        Ok(ArtifactInfo {
            path: self.path.clone(),
            size_bytes: bytes.len() as u64,
            checksum: compute_checksum(&bytes),
        })
    }
}

fn write_and_replace(temp_path: &Path, target: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = File::create(temp_path).map_err(|e| PipelineError::persist(temp_path, e))?;
    file.write_all(bytes)
        .map_err(|e| PipelineError::persist(temp_path, e))?;
    file.sync_all()
        .map_err(|e| PipelineError::persist(temp_path, e))?;
    fs::rename(temp_path, target).map_err(|e| PipelineError::persist(target, e))
}

/// SHA256 hex digest
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ForestParams;
    use crate::models::FeatureVector;
    use tempfile::TempDir;

    fn trained_model() -> AttackClassifier {
        let features: Vec<FeatureVector> = (0..20)
            .map(|i| FeatureVector {
                hour: i,
                is_brute_force: u8::from(i < 10),
            })
            .collect();
        let labels: Vec<Option<String>> = (0..20)
            .map(|i| Some(if i < 10 { "brute_force" } else { "port_scan" }.to_string()))
            .collect();
        let params = ForestParams {
            n_trees: 5,
            max_depth: Some(4),
            seed: Some(1),
        };
        AttackClassifier::fit(&params, &features, &labels).unwrap()
    }

    #[test]
    fn test_compute_checksum() {
        let checksum = compute_checksum(b"test model weights");
        assert_eq!(checksum.len(), 64);
        assert_eq!(checksum, compute_checksum(b"test model weights"));
    }

    #[test]
    fn test_default_path() {
        assert_eq!(ModelStore::default().path(), Path::new("attack_classifier.pkl"));
    }

    #[test]
    fn test_save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = ModelStore::new(temp_dir.path().join("attack_classifier.pkl"));
        let model = trained_model();

        let info = store.save(&model).unwrap();
        assert!(info.size_bytes > 0);
        assert_eq!(fs::metadata(&info.path).unwrap().len(), info.size_bytes);
        assert!(!temp_dir.path().join("attack_classifier.tmp").exists());

        let loaded = store.load().unwrap();
        assert_eq!(loaded.labels(), model.labels());
        assert_eq!(loaded.n_trees(), 5);
        let probe = FeatureVector {
            hour: 2,
            is_brute_force: 1,
        };
        assert_eq!(loaded.predict(&probe).unwrap(), model.predict(&probe).unwrap());

        assert_eq!(store.artifact_info().unwrap().checksum, info.checksum);
    }

    #[test]
    fn test_save_overwrites_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("attack_classifier.pkl");
        fs::write(&path, b"stale").unwrap();

        let store = ModelStore::new(&path);
        let info = store.save(&trained_model()).unwrap();
        assert_ne!(info.checksum, compute_checksum(b"stale"));
        assert!(store.load().is_ok());
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let store = ModelStore::new(temp_dir.path().join("models/ai/attack_classifier.pkl"));
        assert!(store.save(&trained_model()).is_ok());
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = ModelStore::new(temp_dir.path().join("absent.pkl"));
        assert!(matches!(store.load(), Err(PipelineError::Persist { .. })));
    }

    #[test]
    fn test_failed_save_removes_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("attack_classifier.pkl");
        // A directory at the target makes the final rename fail
        fs::create_dir(&path).unwrap();

        let err = ModelStore::new(&path).save(&trained_model()).unwrap_err();

        assert!(matches!(err, PipelineError::Persist { .. }));
        assert!(!temp_dir.path().join("attack_classifier.tmp").exists());
        assert!(path.is_dir());
    }

    #[test]
    fn test_unknown_format_version_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("attack_classifier.pkl");
        let model = trained_model();
        let envelope = ModelEnvelopeRef {
            format_version: MODEL_FORMAT_VERSION + 1,
            model: &model,
        };
        fs::write(&path, bincode::serialize(&envelope).unwrap()).unwrap();

        let err = ModelStore::new(&path).load().unwrap_err();

        match &err {
            PipelineError::UnsupportedFormat {
                found, expected, ..
            } => {
                assert_eq!(*found, MODEL_FORMAT_VERSION + 1);
                assert_eq!(*expected, MODEL_FORMAT_VERSION);
            }
            other => panic!("expected unsupported format, got {:?}", other),
        }
        assert_eq!(err.stage(), "persist");
    }

    #[test]
    fn test_load_garbage_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("garbage.pkl");
        fs::write(&path, b"not a model").unwrap();
        assert!(ModelStore::new(path).load().is_err());
    }
}
